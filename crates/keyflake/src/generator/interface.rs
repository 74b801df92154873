use crate::{GeneratorConfig, Poll, Result, SnowflakeId, TimeSource, generator::park};

/// A thread-safe Snowflake ID generator bound to one worker ID.
pub trait SnowflakeGenerator<T>: Sized
where
    T: TimeSource,
{
    /// Creates a generator for `worker_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an invalid `config` and
    /// [`Error::InvalidWorkerId`] if `worker_id` does not fit the layout.
    ///
    /// [`Error::Configuration`]: crate::Error::Configuration
    /// [`Error::InvalidWorkerId`]: crate::Error::InvalidWorkerId
    fn new(config: &GeneratorConfig, worker_id: i64, time: T) -> Result<Self>;

    /// The validated worker ID encoded into every ID.
    fn machine_id(&self) -> u64;

    /// Attempts to generate an ID without blocking.
    ///
    /// # Errors
    ///
    /// Returns an error if the clock moved back further than the rollback
    /// policy tolerates, the epoch is exhausted, or a lock was poisoned. The
    /// generator state is left untouched in every case.
    fn try_poll_id(&self) -> Result<Poll>;

    /// Generates the next ID, calling `f` with the number of milliseconds to
    /// back off whenever the generator is pending.
    ///
    /// # Errors
    ///
    /// Returns the first error of [`Self::try_poll_id`].
    fn try_next_id(&self, mut f: impl FnMut(u64)) -> Result<SnowflakeId> {
        loop {
            match self.try_poll_id()? {
                Poll::Ready { id } => break Ok(id),
                Poll::Pending { yield_for } => f(yield_for),
            }
        }
    }

    /// Generates the next ID, backing off with [`park`].
    ///
    /// # Errors
    ///
    /// Returns the first error of [`Self::try_poll_id`].
    fn next_id(&self) -> Result<SnowflakeId> {
        self.try_next_id(park)
    }
}
