use crate::{Error, Result};

/// What a generator does when the clock reads earlier than the last issued
/// timestamp.
///
/// Small regressions (NTP slews, VM pauses) are usually best waited out;
/// large ones (a reset clock, operator error) should surface. Either way the
/// generator never issues an ID lower than one it already returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "policy", rename_all = "snake_case"))]
pub enum RollbackPolicy {
    /// Wait for the clock to catch up as long as it is at most
    /// `max_drift_millis` behind; fail beyond that.
    Wait { max_drift_millis: u64 },
    /// Fail immediately with [`Error::ClockRolledBack`].
    Fail,
}

impl RollbackPolicy {
    /// Largest drift the default policy waits out.
    pub const DEFAULT_MAX_DRIFT_MILLIS: u64 = 2_000;

    /// Decides how to handle a clock that is `drift_millis` behind.
    ///
    /// Returns the number of milliseconds to wait before retrying.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClockRolledBack`] if the policy does not tolerate the
    /// drift.
    pub fn tolerate(&self, drift_millis: u64) -> Result<u64> {
        match *self {
            Self::Wait { max_drift_millis } if drift_millis <= max_drift_millis => {
                Ok(drift_millis)
            }
            Self::Wait { .. } | Self::Fail => Err(Error::ClockRolledBack { drift_millis }),
        }
    }
}

impl Default for RollbackPolicy {
    fn default() -> Self {
        Self::Wait {
            max_drift_millis: Self::DEFAULT_MAX_DRIFT_MILLIS,
        }
    }
}
