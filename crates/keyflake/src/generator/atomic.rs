use portable_atomic::{AtomicU64, Ordering};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    GeneratorConfig, Layout, Poll, Result, SnowflakeGenerator, TimeSource,
    generator::{GeneratorState, Outcome, Rules},
};

/// A lock-free Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// The state lives in a single [`AtomicU64`] and is advanced with a
/// compare-and-swap. A thread that loses the race gets [`Poll::Pending`] with
/// `yield_for == 0` and retries immediately.
///
/// ## Recommended When
/// - You're in a multi-threaded environment
/// - Fair access is sacrificed for higher throughput
///
/// ## See Also
/// - [`LockSnowflakeGenerator`]
///
/// [`LockSnowflakeGenerator`]: crate::LockSnowflakeGenerator
pub struct AtomicSnowflakeGenerator<T>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<AtomicU64>,
    #[cfg(not(feature = "cache-padded"))]
    state: AtomicU64,
    rules: Rules,
    time: T,
}

impl<T> AtomicSnowflakeGenerator<T>
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
    /// use keyflake::{AtomicSnowflakeGenerator, GeneratorConfig, SnowflakeGenerator};
    ///
    /// let config = GeneratorConfig::default();
    /// let generator = AtomicSnowflakeGenerator::new(&config, 3, config.system_clock().unwrap()).unwrap();
    /// let first = generator.next_id().unwrap();
    /// let second = generator.next_id().unwrap();
    /// assert!(first < second);
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

    fn resume(rules: Rules, state: GeneratorState, time: T) -> Self {
        let raw = state.pack(rules.layout.sequence_bits());
        Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(AtomicU64::new(raw)),
            #[cfg(not(feature = "cache-padded"))]
            state: AtomicU64::new(raw),
            rules,
            time,
        }
    }

    pub const fn layout(&self) -> Layout {
        self.rules.layout
    }

    /// Attempts to generate the next ID without blocking.
    ///
    /// Returns [`Poll::Pending`] when the sequence is exhausted, the clock is
    /// behind within the tolerated drift, or another thread won the CAS.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockRolledBack`] if the clock is further behind than the
    ///   rollback policy tolerates
    /// - [`Error::EncodingRange`] once the epoch is exhausted
    ///
    /// [`Error::ClockRolledBack`]: crate::Error::ClockRolledBack
    /// [`Error::EncodingRange`]: crate::Error::EncodingRange
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<Poll> {
        let sequence_bits = self.rules.layout.sequence_bits();
        // load before reading the clock so the reading is never older than
        // the state it is compared against
        let current_raw = self.state.load(Ordering::Acquire);
        let current = GeneratorState::unpack(current_raw, sequence_bits);
        let now = self.time.current_millis();

        match self.rules.step(&current, now)? {
            Outcome::Commit { state, id } => {
                if self
                    .state
                    .compare_exchange(
                        current_raw,
                        state.pack(sequence_bits),
                        Ordering::AcqRel,
                        Ordering::Relaxed,
                    )
                    .is_ok()
                {
                    Ok(Poll::Ready { id })
                } else {
                    // CAS failed - another thread won the race. Yield 0 to retry
                    // immediately.
                    Ok(Poll::Pending { yield_for: 0 })
                }
            }
            Outcome::Pending { yield_for } => Ok(Poll::Pending { yield_for }),
        }
    }
}

impl<T> SnowflakeGenerator<T> for AtomicSnowflakeGenerator<T>
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
