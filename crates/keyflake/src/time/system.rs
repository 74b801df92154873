use core::time::Duration;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{Error, Result, TimeSource};

/// Default epoch: Tuesday, November 1, 2016 00:00:00 UTC
pub const DEFAULT_EPOCH: Duration = Duration::from_millis(1_477_958_400_000);

/// Twitter epoch: Thursday, November 4, 2010 1:42:54.657 UTC
pub const TWITTER_EPOCH: Duration = Duration::from_millis(1_288_834_974_657);

/// A wall-clock time source anchored to a custom epoch.
///
/// Unlike a monotonic timer, the wall clock follows NTP corrections and manual
/// adjustments, so it may step backwards. Generators detect that and apply
/// their [`RollbackPolicy`]. A wall clock that reads earlier than the epoch
/// itself reports `0`.
///
/// [`RollbackPolicy`]: crate::RollbackPolicy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SystemClock {
    epoch_millis: u64,
}

impl SystemClock {
    /// Constructs a clock whose `t = 0` is `epoch`, given as a [`Duration`]
    /// since 1970-01-01 UTC.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the epoch is zero or lies in the
    /// future.
    ///
    /// # Example
    ///
    /// ```
    /// use keyflake::{DEFAULT_EPOCH, SystemClock, TimeSource};
    ///
    /// let clock = SystemClock::with_epoch(DEFAULT_EPOCH).unwrap();
    /// assert!(clock.current_millis() > 0);
    /// ```
    pub fn with_epoch(epoch: Duration) -> Result<Self> {
        let epoch_millis = u64::try_from(epoch.as_millis())
            .map_err(|_| Error::configuration("epoch does not fit in 64-bit milliseconds"))?;
        if epoch_millis == 0 {
            return Err(Error::configuration("epoch must be positive"));
        }
        let now = unix_millis();
        if epoch_millis > now {
            return Err(Error::configuration(format!(
                "epoch {epoch_millis} lies in the future (now is {now})"
            )));
        }
        Ok(Self { epoch_millis })
    }

    pub const fn epoch(&self) -> Duration {
        Duration::from_millis(self.epoch_millis)
    }
}

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        unix_millis().saturating_sub(self.epoch_millis)
    }
}

/// Milliseconds since the Unix epoch; a clock set before 1970 reads `0`.
fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_epoch() {
        assert_eq!(
            SystemClock::with_epoch(Duration::ZERO),
            Err(Error::Configuration {
                reason: "epoch must be positive".into()
            })
        );
    }

    #[test]
    fn rejects_future_epoch() {
        let future = Duration::from_millis(unix_millis() + 86_400_000);
        assert!(matches!(
            SystemClock::with_epoch(future),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn reports_millis_since_epoch() {
        let clock = SystemClock::with_epoch(DEFAULT_EPOCH).unwrap();
        let expected = unix_millis() - 1_477_958_400_000;
        let actual = clock.current_millis();
        // the two reads are taken a moment apart
        assert!(actual >= expected && actual - expected < 1_000);
        assert_eq!(clock.epoch(), DEFAULT_EPOCH);
    }
}
