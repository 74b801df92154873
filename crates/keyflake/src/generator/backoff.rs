use core::time::Duration;

/// Waits up to this many milliseconds by yielding the thread; longer waits
/// sleep.
pub const YIELD_THRESHOLD_MILLIS: u64 = 10;

/// The default backoff used by [`SnowflakeGenerator::next_id`].
///
/// Retries immediately after a lost race, yields the thread while the wait is
/// short (sequence exhaustion, small clock corrections), and sleeps for longer
/// clock regressions.
///
/// [`SnowflakeGenerator::next_id`]: crate::SnowflakeGenerator::next_id
pub fn park(yield_for: u64) {
    match yield_for {
        0 => core::hint::spin_loop(),
        1..=YIELD_THRESHOLD_MILLIS => std::thread::yield_now(),
        _ => std::thread::sleep(Duration::from_millis(yield_for)),
    }
}
