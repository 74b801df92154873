use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread::scope;

use rand::Rng;

use crate::{
    AtomicSnowflakeGenerator, Error, Field, GeneratorConfig, Layout, LockSnowflakeGenerator, Poll,
    RollbackPolicy, SequenceReset, SnowflakeGenerator, SnowflakeId, SystemClock, TimeSource,
};

struct MockTime {
    millis: u64,
}

impl TimeSource for MockTime {
    fn current_millis(&self) -> u64 {
        self.millis
    }
}

/// A clock the test moves by hand.
#[derive(Default)]
struct ManualTime {
    millis: AtomicU64,
}

impl ManualTime {
    fn at(millis: u64) -> Arc<Self> {
        Arc::new(Self {
            millis: AtomicU64::new(millis),
        })
    }

    fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTime {
    fn current_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Returns the scripted readings in order, then repeats the last one.
struct ScriptedTime {
    values: Vec<u64>,
    reads: AtomicUsize,
}

impl ScriptedTime {
    fn new(values: Vec<u64>) -> Arc<Self> {
        Arc::new(Self {
            values,
            reads: AtomicUsize::new(0),
        })
    }
}

impl TimeSource for ScriptedTime {
    fn current_millis(&self) -> u64 {
        let read = self.reads.fetch_add(1, Ordering::SeqCst);
        self.values[read.min(self.values.len() - 1)]
    }
}

/// Advances by one millisecond on every reading.
#[derive(Default)]
struct TickingTime {
    next: AtomicU64,
}

impl TimeSource for TickingTime {
    fn current_millis(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

/// The system clock, read up to 3ms late at random.
struct JitterTime {
    clock: SystemClock,
}

impl TimeSource for JitterTime {
    fn current_millis(&self) -> u64 {
        let lag = rand::rng().random_range(0..=3);
        self.clock.current_millis().saturating_sub(lag)
    }
}

trait PollExt {
    fn unwrap_ready(self) -> SnowflakeId;
    fn unwrap_pending(self) -> u64;
}

impl PollExt for Poll {
    fn unwrap_ready(self) -> SnowflakeId {
        match self {
            Self::Ready { id } => id,
            Self::Pending { yield_for } => {
                panic!("unexpected pending (yield for: {yield_for})")
            }
        }
    }

    fn unwrap_pending(self) -> u64 {
        match self {
            Self::Ready { id } => panic!("unexpected ready ({id})"),
            Self::Pending { yield_for } => yield_for,
        }
    }
}

fn config_with(rollback: RollbackPolicy, sequence_reset: SequenceReset) -> GeneratorConfig {
    GeneratorConfig {
        rollback,
        sequence_reset,
        ..GeneratorConfig::default()
    }
}

fn parts(id: SnowflakeId) -> (u64, u64, u64) {
    let c = Layout::DEFAULT.decode(id);
    (c.timestamp, c.machine_id, c.sequence)
}

fn run_id_sequence_increments_within_same_tick<G>()
where
    G: SnowflakeGenerator<MockTime>,
{
    let generator = G::new(&GeneratorConfig::default(), 0, MockTime { millis: 42 }).unwrap();

    let id1 = generator.try_poll_id().unwrap().unwrap_ready();
    let id2 = generator.try_poll_id().unwrap().unwrap_ready();
    let id3 = generator.try_poll_id().unwrap().unwrap_ready();

    assert_eq!(parts(id1), (42, 0, 0));
    assert_eq!(parts(id2), (42, 0, 1));
    assert_eq!(parts(id3), (42, 0, 2));
    assert!(id1 < id2 && id2 < id3);
}

fn run_generator_returns_pending_when_sequence_exhausted<G>()
where
    G: SnowflakeGenerator<MockTime>,
{
    let generator = G::new(&GeneratorConfig::default(), 5, MockTime { millis: 7 }).unwrap();
    for _ in 0..=Layout::DEFAULT.max_sequence() {
        generator.try_poll_id().unwrap().unwrap_ready();
    }
    assert_eq!(generator.try_poll_id().unwrap().unwrap_pending(), 1);
    // still pending, the clock has not moved
    assert_eq!(generator.try_poll_id().unwrap().unwrap_pending(), 1);
}

fn run_generator_handles_rollover<G>()
where
    G: SnowflakeGenerator<Arc<ManualTime>>,
{
    let time = ManualTime::at(42);
    let generator = G::new(&GeneratorConfig::default(), 1, Arc::clone(&time)).unwrap();

    for i in 0..=Layout::DEFAULT.max_sequence() {
        let id = generator.try_poll_id().unwrap().unwrap_ready();
        assert_eq!(parts(id), (42, 1, i));
    }

    assert_eq!(generator.try_poll_id().unwrap().unwrap_pending(), 1);

    time.set(43);

    let id = generator.try_poll_id().unwrap().unwrap_ready();
    assert_eq!(parts(id), (43, 1, 0));
}

fn run_generator_waits_out_small_rollback<G>()
where
    G: SnowflakeGenerator<Arc<ScriptedTime>>,
{
    let time = ScriptedTime::new(vec![10, 10, 8, 9, 10, 11]);
    let config = config_with(
        RollbackPolicy::Wait {
            max_drift_millis: 5,
        },
        SequenceReset::EveryTick,
    );
    let generator = G::new(&config, 3, time).unwrap();

    let mut waits = Vec::new();
    let id1 = generator.try_next_id(|w| waits.push(w)).unwrap();
    let id2 = generator.try_next_id(|w| waits.push(w)).unwrap();
    let id3 = generator.try_next_id(|w| waits.push(w)).unwrap();

    assert_eq!(parts(id1), (10, 3, 0));
    assert_eq!(parts(id2), (10, 3, 1));
    assert_eq!(parts(id3), (10, 3, 2));
    // drift is measured again on every retry
    assert_eq!(waits, vec![2, 1]);
}

fn run_generator_fails_on_rollback<G>()
where
    G: SnowflakeGenerator<Arc<ScriptedTime>>,
{
    let time = ScriptedTime::new(vec![10, 8, 11]);
    let config = config_with(RollbackPolicy::Fail, SequenceReset::EveryTick);
    let generator = G::new(&config, 0, time).unwrap();

    let first = generator.next_id().unwrap();
    assert_eq!(
        generator.next_id(),
        Err(Error::ClockRolledBack { drift_millis: 2 })
    );
    let third = generator.next_id().unwrap();
    assert_eq!(parts(third), (11, 0, 0));
    assert!(third > first);
}

fn run_generator_fails_beyond_max_drift<G>()
where
    G: SnowflakeGenerator<Arc<ScriptedTime>>,
{
    let time = ScriptedTime::new(vec![100, 10]);
    let config = config_with(
        RollbackPolicy::Wait {
            max_drift_millis: 5,
        },
        SequenceReset::EveryTick,
    );
    let generator = G::new(&config, 0, time).unwrap();

    generator.next_id().unwrap();
    assert_eq!(
        generator.next_id(),
        Err(Error::ClockRolledBack { drift_millis: 90 })
    );
}

fn run_generator_reports_exhausted_epoch<G>()
where
    G: SnowflakeGenerator<Arc<ManualTime>>,
{
    let layout = Layout::new(4, 2, 2).unwrap();
    let config = GeneratorConfig {
        layout,
        ..GeneratorConfig::default()
    };
    let time = ManualTime::at(15);
    let generator = G::new(&config, 1, Arc::clone(&time)).unwrap();

    let id = generator.next_id().unwrap();
    assert_eq!(layout.sequence(id), 0);

    time.set(16);
    assert_eq!(
        generator.next_id(),
        Err(Error::EncodingRange {
            field: Field::Timestamp,
            value: 16,
            max: 15
        })
    );

    // the failed call left the state alone
    time.set(15);
    let id = generator.next_id().unwrap();
    assert_eq!(layout.sequence(id), 1);
}

fn run_generator_resets_sequence_at_threshold<G>()
where
    G: SnowflakeGenerator<TickingTime>,
{
    let config = config_with(RollbackPolicy::default(), SequenceReset::Threshold(3));
    let generator = G::new(&config, 0, TickingTime::default()).unwrap();

    let sequences: Vec<u64> = (0..9)
        .map(|_| Layout::DEFAULT.sequence(generator.next_id().unwrap()))
        .collect();
    assert_eq!(sequences, vec![0, 1, 2, 3, 0, 1, 2, 3, 0]);
}

fn run_generator_spreads_low_bits<G>()
where
    G: SnowflakeGenerator<TickingTime>,
{
    const TOTAL: usize = 99_999;
    // allowed deviation of each residue's share from 1/4
    const TOLERANCE: f64 = 0.0015;

    let layout = Layout::DEFAULT;
    let config = config_with(RollbackPolicy::default(), SequenceReset::half_range(&layout));
    let generator = G::new(&config, 0, TickingTime::default()).unwrap();

    let mut buckets = [0_usize; 4];
    for _ in 0..TOTAL {
        let id = generator.next_id().unwrap();
        buckets[(id.to_raw() % 4) as usize] += 1;
    }
    for count in buckets {
        let share = count as f64 / TOTAL as f64;
        assert!(
            (share - 0.25).abs() < TOLERANCE,
            "uneven buckets: {buckets:?}"
        );
    }
}

fn run_generator_every_tick_concentrates_low_bits<G>()
where
    G: SnowflakeGenerator<TickingTime>,
{
    let config = config_with(RollbackPolicy::default(), SequenceReset::EveryTick);
    let generator = G::new(&config, 0, TickingTime::default()).unwrap();
    for _ in 0..1_000 {
        assert_eq!(generator.next_id().unwrap().to_raw() % 4, 0);
    }
}

fn run_generator_monotonic<G>()
where
    G: SnowflakeGenerator<SystemClock>,
{
    const TOTAL_IDS: usize = 4096 * 64;

    let config = config_with(RollbackPolicy::default(), SequenceReset::EveryTick);
    let generator = G::new(&config, 1, config.system_clock().unwrap()).unwrap();

    let mut last_timestamp = 0;
    let mut sequence = 0;
    let mut last_id = SnowflakeId::default();

    for _ in 0..TOTAL_IDS {
        let id = generator.next_id().unwrap();
        let (ts, machine_id, seq) = parts(id);
        if ts > last_timestamp {
            sequence = 0;
        }

        assert!(ts >= last_timestamp);
        assert!(id > last_id);
        assert_eq!(machine_id, 1);
        assert_eq!(seq, sequence);

        last_timestamp = ts;
        last_id = id;
        sequence += 1;
    }
}

fn run_generator_monotonic_threaded<G, T>(make_generator: impl Fn() -> G)
where
    G: SnowflakeGenerator<T> + Send + Sync,
    T: TimeSource,
{
    const IDS_PER_THREAD: usize = 4096 * 16;

    let threads = num_cpus::get().clamp(2, 8);
    let generator = make_generator();

    let per_thread: Vec<Vec<SnowflakeId>> = scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                s.spawn(|| {
                    (0..IDS_PER_THREAD)
                        .map(|_| generator.next_id().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut seen = HashSet::with_capacity(threads * IDS_PER_THREAD);
    for ids in &per_thread {
        assert!(
            ids.windows(2).all(|w| w[0] < w[1]),
            "a thread observed a decreasing ID"
        );
        for id in ids {
            assert!(seen.insert(*id), "duplicate ID {id:?}");
        }
    }
    assert_eq!(seen.len(), threads * IDS_PER_THREAD);
}

#[test]
fn lock_generator_sequence_test() {
    run_id_sequence_increments_within_same_tick::<LockSnowflakeGenerator<_>>();
}

#[test]
fn atomic_generator_sequence_test() {
    run_id_sequence_increments_within_same_tick::<AtomicSnowflakeGenerator<_>>();
}

#[test]
fn lock_generator_pending_test() {
    run_generator_returns_pending_when_sequence_exhausted::<LockSnowflakeGenerator<_>>();
}

#[test]
fn atomic_generator_pending_test() {
    run_generator_returns_pending_when_sequence_exhausted::<AtomicSnowflakeGenerator<_>>();
}

#[test]
fn lock_generator_from_components_pending_test() {
    let generator = LockSnowflakeGenerator::from_components(
        &GeneratorConfig::default(),
        0,
        0,
        Layout::DEFAULT.max_sequence(),
        MockTime { millis: 0 },
    )
    .unwrap();
    assert_eq!(generator.try_poll_id().unwrap().unwrap_pending(), 1);
}

#[test]
fn atomic_generator_from_components_pending_test() {
    let generator = AtomicSnowflakeGenerator::from_components(
        &GeneratorConfig::default(),
        0,
        0,
        Layout::DEFAULT.max_sequence(),
        MockTime { millis: 0 },
    )
    .unwrap();
    assert_eq!(generator.try_poll_id().unwrap().unwrap_pending(), 1);
}

#[test]
fn from_components_rejects_out_of_range_state() {
    let result = LockSnowflakeGenerator::from_components(
        &GeneratorConfig::default(),
        0,
        0,
        Layout::DEFAULT.max_sequence() + 1,
        MockTime { millis: 0 },
    );
    assert!(matches!(
        result,
        Err(Error::EncodingRange {
            field: Field::Sequence,
            ..
        })
    ));
}

#[test]
fn lock_generator_rollover_test() {
    run_generator_handles_rollover::<LockSnowflakeGenerator<_>>();
}

#[test]
fn atomic_generator_rollover_test() {
    run_generator_handles_rollover::<AtomicSnowflakeGenerator<_>>();
}

#[test]
fn lock_generator_rollback_wait_test() {
    run_generator_waits_out_small_rollback::<LockSnowflakeGenerator<_>>();
}

#[test]
fn atomic_generator_rollback_wait_test() {
    run_generator_waits_out_small_rollback::<AtomicSnowflakeGenerator<_>>();
}

#[test]
fn lock_generator_rollback_fail_test() {
    run_generator_fails_on_rollback::<LockSnowflakeGenerator<_>>();
}

#[test]
fn atomic_generator_rollback_fail_test() {
    run_generator_fails_on_rollback::<AtomicSnowflakeGenerator<_>>();
}

#[test]
fn lock_generator_max_drift_test() {
    run_generator_fails_beyond_max_drift::<LockSnowflakeGenerator<_>>();
}

#[test]
fn atomic_generator_max_drift_test() {
    run_generator_fails_beyond_max_drift::<AtomicSnowflakeGenerator<_>>();
}

#[test]
fn lock_generator_exhausted_epoch_test() {
    run_generator_reports_exhausted_epoch::<LockSnowflakeGenerator<_>>();
}

#[test]
fn atomic_generator_exhausted_epoch_test() {
    run_generator_reports_exhausted_epoch::<AtomicSnowflakeGenerator<_>>();
}

#[test]
fn lock_generator_threshold_test() {
    run_generator_resets_sequence_at_threshold::<LockSnowflakeGenerator<_>>();
}

#[test]
fn atomic_generator_threshold_test() {
    run_generator_resets_sequence_at_threshold::<AtomicSnowflakeGenerator<_>>();
}

#[test]
fn lock_generator_low_bits_uniform() {
    run_generator_spreads_low_bits::<LockSnowflakeGenerator<_>>();
}

#[test]
fn atomic_generator_low_bits_uniform() {
    run_generator_spreads_low_bits::<AtomicSnowflakeGenerator<_>>();
}

#[test]
fn lock_generator_every_tick_low_bits() {
    run_generator_every_tick_concentrates_low_bits::<LockSnowflakeGenerator<_>>();
}

#[test]
fn atomic_generator_every_tick_low_bits() {
    run_generator_every_tick_concentrates_low_bits::<AtomicSnowflakeGenerator<_>>();
}

#[test]
fn lock_generator_system_clock_sequence_increments() {
    run_generator_monotonic::<LockSnowflakeGenerator<_>>();
}

#[test]
fn atomic_generator_system_clock_sequence_increments() {
    run_generator_monotonic::<AtomicSnowflakeGenerator<_>>();
}

#[test]
fn lock_generator_threaded_monotonic() {
    let config = GeneratorConfig::default();
    let clock = config.system_clock().unwrap();
    run_generator_monotonic_threaded(|| LockSnowflakeGenerator::new(&config, 0, clock).unwrap());
}

#[test]
fn atomic_generator_threaded_monotonic() {
    let config = GeneratorConfig::default();
    let clock = config.system_clock().unwrap();
    run_generator_monotonic_threaded(|| AtomicSnowflakeGenerator::new(&config, 0, clock).unwrap());
}

#[test]
fn lock_generator_threaded_jittered_clock() {
    let config = GeneratorConfig::default();
    let clock = config.system_clock().unwrap();
    run_generator_monotonic_threaded(|| {
        LockSnowflakeGenerator::new(&config, 0, JitterTime { clock }).unwrap()
    });
}

#[test]
fn atomic_generator_threaded_jittered_clock() {
    let config = GeneratorConfig::default();
    let clock = config.system_clock().unwrap();
    run_generator_monotonic_threaded(|| {
        AtomicSnowflakeGenerator::new(&config, 0, JitterTime { clock }).unwrap()
    });
}

#[test]
fn constructors_reject_bad_worker_ids() {
    let config = GeneratorConfig::default();
    for worker_id in [-1, 1024] {
        assert_eq!(
            LockSnowflakeGenerator::new(&config, worker_id, MockTime { millis: 0 }).err(),
            Some(Error::InvalidWorkerId {
                worker_id,
                max: 1023
            })
        );
        assert!(AtomicSnowflakeGenerator::new(&config, worker_id, MockTime { millis: 0 }).is_err());
    }
}

#[test]
fn constructors_reject_zero_epoch() {
    let config = GeneratorConfig {
        epoch_millis: 0,
        ..GeneratorConfig::default()
    };
    assert!(matches!(
        LockSnowflakeGenerator::new(&config, 0, MockTime { millis: 0 }),
        Err(Error::Configuration { .. })
    ));
}
