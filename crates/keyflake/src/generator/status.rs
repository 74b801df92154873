use crate::SnowflakeId;

/// The result of one non-blocking generation attempt.
///
/// - [`Poll::Ready`] carries a newly generated ID.
/// - [`Poll::Pending`] means no ID can be issued right now: the sequence is
///   exhausted for the current tick, the clock is behind within the tolerated
///   drift, or another thread won a CAS race. Retry after `yield_for`
///   milliseconds (`0` means retry immediately).
///
/// # Example
///
/// ```
/// use keyflake::{GeneratorConfig, LockSnowflakeGenerator, Poll, SnowflakeGenerator};
///
/// struct FixedTime;
/// impl keyflake::TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1
///     }
/// }
///
/// let generator = LockSnowflakeGenerator::new(&GeneratorConfig::default(), 0, FixedTime).unwrap();
/// match generator.try_poll_id().unwrap() {
///     Poll::Ready { id } => println!("ID: {id}"),
///     Poll::Pending { yield_for } => println!("Back off for {yield_for}ms"),
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The generated ID.
        id: SnowflakeId,
    },
    /// No ID could be generated yet.
    Pending {
        /// Milliseconds to wait before polling again.
        yield_for: u64,
    },
}
