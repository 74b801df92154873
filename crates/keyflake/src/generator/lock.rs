#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    GeneratorConfig, Layout, Poll, Result, SnowflakeGenerator, TimeSource,
    generator::{GeneratorState, Mutex, Outcome, Rules, mutex},
};

/// A lock-based Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// Each poll reads the clock and advances the state inside one critical
/// section, so concurrent callers get distinct IDs in the order they acquired
/// the lock. The mutex comes from `std`, or from `parking_lot` with the
/// `parking-lot` feature.
///
/// ## Recommended When
/// - You're in a multi-threaded environment
/// - Fair access across threads is important
///
/// ## See Also
/// - [`AtomicSnowflakeGenerator`]
///
/// [`AtomicSnowflakeGenerator`]: crate::AtomicSnowflakeGenerator
pub struct LockSnowflakeGenerator<T>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<Mutex<GeneratorState>>,
    #[cfg(not(feature = "cache-padded"))]
    state: Mutex<GeneratorState>,
    rules: Rules,
    time: T,
}

impl<T> LockSnowflakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates a generator for `worker_id` that has not issued any ID yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an invalid `config` and
    /// [`Error::InvalidWorkerId`] if `worker_id` does not fit the layout.
    ///
    /// # Example
    /// ```
    /// use keyflake::{GeneratorConfig, LockSnowflakeGenerator, SnowflakeGenerator};
    ///
    /// let config = GeneratorConfig::default();
    /// let generator = LockSnowflakeGenerator::new(&config, 7, config.system_clock().unwrap()).unwrap();
    /// let id = generator.next_id().unwrap();
    /// assert_eq!(config.layout.machine_id(id), 7);
    /// ```
    ///
    /// [`Error::Configuration`]: crate::Error::Configuration
    /// [`Error::InvalidWorkerId`]: crate::Error::InvalidWorkerId
    pub fn new(config: &GeneratorConfig, worker_id: i64, time: T) -> Result<Self> {
        Ok(Self::resume(
            Rules::new(config, worker_id)?,
            GeneratorState::FRESH,
            time,
        ))
    }

    /// Creates a generator that behaves as if it had just issued
    /// `(timestamp, sequence)`.
    ///
    /// Useful for restoring a generator after a restart when the last issued
    /// ID is known.
    ///
    /// # Errors
    ///
    /// Same as [`Self::new`], plus [`Error::EncodingRange`] if `timestamp` or
    /// `sequence` do not fit the layout.
    ///
    /// [`Error::EncodingRange`]: crate::Error::EncodingRange
    pub fn from_components(
        config: &GeneratorConfig,
        worker_id: i64,
        timestamp: u64,
        sequence: u64,
        time: T,
    ) -> Result<Self> {
        let rules = Rules::new(config, worker_id)?;
        let state = rules.restore(timestamp, sequence)?;
        Ok(Self::resume(rules, state, time))
    }

    pub(crate) fn resume(rules: Rules, state: GeneratorState, time: T) -> Self {
        Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(Mutex::new(state)),
            #[cfg(not(feature = "cache-padded"))]
            state: Mutex::new(state),
            rules,
            time,
        }
    }

    pub const fn layout(&self) -> Layout {
        self.rules.layout
    }

    /// A copy of the last committed state.
    pub(crate) fn snapshot(&self) -> Result<GeneratorState> {
        Ok(*mutex::lock(&self.state)?)
    }

    /// Attempts to generate the next ID without blocking.
    ///
    /// Returns [`Poll::Pending`] when the sequence is exhausted for the
    /// current tick or the clock is behind within the tolerated drift.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockRolledBack`] if the clock is further behind than the
    ///   rollback policy tolerates
    /// - [`Error::EncodingRange`] once the epoch is exhausted
    /// - [`Error::LockPoisoned`] if the lock was poisoned (std mutex only)
    ///
    /// [`Error::ClockRolledBack`]: crate::Error::ClockRolledBack
    /// [`Error::EncodingRange`]: crate::Error::EncodingRange
    /// [`Error::LockPoisoned`]: crate::Error
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<Poll> {
        let mut state = mutex::lock(&self.state)?;
        // read under the lock: a reading taken before it could be older than
        // the state another thread just committed
        let now = self.time.current_millis();
        let outcome = self.rules.step(&state, now)?;
        if let Outcome::Commit { state: next, .. } = outcome {
            *state = next;
        }
        Ok(outcome.into())
    }
}

impl<T> SnowflakeGenerator<T> for LockSnowflakeGenerator<T>
where
    T: TimeSource,
{
    fn new(config: &GeneratorConfig, worker_id: i64, time: T) -> Result<Self> {
        Self::new(config, worker_id, time)
    }

    fn machine_id(&self) -> u64 {
        self.rules.machine_id
    }

    fn try_poll_id(&self) -> Result<Poll> {
        self.try_poll_id()
    }
}
