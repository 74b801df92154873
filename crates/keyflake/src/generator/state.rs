use core::cmp::Ordering;

use crate::{
    Error, GeneratorConfig, Layout, Poll, Result, RollbackPolicy, SnowflakeId, validate_worker_id,
};

/// How the sequence starts on a new tick.
///
/// Within one tick the sequence always counts up from where it stood and never
/// wraps; the policies only differ in what happens when the clock advances.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SequenceReset {
    /// Every new tick starts at sequence `0`.
    EveryTick,
    /// A new tick continues from the previous sequence plus one, and starts
    /// over at `0` once the previous sequence reached the threshold.
    ///
    /// With sparse traffic `EveryTick` puts almost every ID at sequence `0`,
    /// which makes the low bits useless for sharding (`id % n`). A threshold
    /// spreads them evenly.
    Threshold(u64),
    /// A threshold at half of whatever sequence range the layout has, so the
    /// same setting fits every layout. See [`SequenceReset::half_range`].
    #[default]
    HalfRange,
}

impl SequenceReset {
    /// A threshold at half the sequence range, e.g. `2047` for 12 sequence
    /// bits. Equivalent to [`SequenceReset::HalfRange`] on `layout`.
    pub const fn half_range(layout: &Layout) -> Self {
        Self::Threshold((1 << (layout.sequence_bits() - 1)) - 1)
    }

    /// Checks the threshold against the sequence width of `layout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the threshold is not below
    /// `2^sequence_bits`.
    pub fn validate(&self, layout: &Layout) -> Result<()> {
        match *self {
            Self::Threshold(threshold) if threshold > layout.max_sequence() => {
                Err(Error::configuration(format!(
                    "sequence reset threshold {threshold} exceeds the maximum sequence {}",
                    layout.max_sequence()
                )))
            }
            _ => Ok(()),
        }
    }

    /// First sequence of a new tick, given the last sequence issued.
    const fn first_of_tick(&self, previous: u64, max_sequence: u64) -> u64 {
        let threshold = match *self {
            Self::EveryTick => return 0,
            Self::Threshold(threshold) => threshold,
            Self::HalfRange => max_sequence >> 1,
        };
        if previous >= threshold { 0 } else { previous + 1 }
    }
}

/// The mutable part of a generator: the last issued timestamp and sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct GeneratorState {
    started: bool,
    timestamp: u64,
    sequence: u64,
}

/// What [`GeneratorState::advance`] decided for one clock reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    Issue(GeneratorState),
    Exhausted,
    Behind { drift: u64 },
}

impl GeneratorState {
    /// A generator that has not issued anything yet.
    pub(crate) const FRESH: Self = Self {
        started: false,
        timestamp: 0,
        sequence: 0,
    };

    pub(crate) const fn issued(timestamp: u64, sequence: u64) -> Self {
        Self {
            started: true,
            timestamp,
            sequence,
        }
    }

    /// The same tick with no sequence room left, so the next ID lands on a
    /// later tick. Used when a generator is rebuilt under a new worker ID.
    pub(crate) const fn exhausted(&self, max_sequence: u64) -> Self {
        if self.started {
            Self::issued(self.timestamp, max_sequence)
        } else {
            *self
        }
    }

    pub(crate) fn advance(&self, now: u64, max_sequence: u64, reset: SequenceReset) -> Step {
        if !self.started {
            return Step::Issue(Self::issued(now, 0));
        }
        match now.cmp(&self.timestamp) {
            Ordering::Equal if self.sequence < max_sequence => {
                Step::Issue(Self::issued(now, self.sequence + 1))
            }
            Ordering::Equal => Step::Exhausted,
            Ordering::Greater => Step::Issue(Self::issued(now, reset.first_of_tick(self.sequence, max_sequence))),
            Ordering::Less => Step::Behind {
                drift: self.timestamp - now,
            },
        }
    }

    /// Packs the state into one word: the started flag in bit 63, then the
    /// timestamp above `sequence_bits` sequence bits. A layout leaves at least
    /// the top bit free, so this never overlaps.
    pub(crate) const fn pack(&self, sequence_bits: u8) -> u64 {
        ((self.started as u64) << 63) | (self.timestamp << sequence_bits) | self.sequence
    }

    pub(crate) const fn unpack(raw: u64, sequence_bits: u8) -> Self {
        let body = raw & !(1 << 63);
        Self {
            started: raw >> 63 == 1,
            timestamp: body >> sequence_bits,
            sequence: body & ((1 << sequence_bits) - 1),
        }
    }
}

/// The immutable part of a generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Rules {
    pub(crate) layout: Layout,
    pub(crate) machine_id: u64,
    pub(crate) rollback: RollbackPolicy,
    pub(crate) reset: SequenceReset,
}

/// The decision for one poll: commit a new state and hand out `id`, or back
/// off.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    Commit {
        state: GeneratorState,
        id: SnowflakeId,
    },
    Pending {
        yield_for: u64,
    },
}

impl Rules {
    pub(crate) fn new(config: &GeneratorConfig, worker_id: i64) -> Result<Self> {
        config.validate()?;
        let machine_id = validate_worker_id(worker_id, &config.layout)?;
        Ok(Self {
            layout: config.layout,
            machine_id,
            rollback: config.rollback,
            reset: config.sequence_reset,
        })
    }

    /// A state that has already issued `(timestamp, sequence)`.
    pub(crate) fn restore(&self, timestamp: u64, sequence: u64) -> Result<GeneratorState> {
        self.layout.encode(timestamp, self.machine_id, sequence)?;
        Ok(GeneratorState::issued(timestamp, sequence))
    }

    /// Decides what to do for a clock reading of `now` given the last
    /// committed `state`. Nothing is committed on error.
    pub(crate) fn step(&self, state: &GeneratorState, now: u64) -> Result<Outcome> {
        match state.advance(now, self.layout.max_sequence(), self.reset) {
            Step::Issue(next) => {
                let id = self
                    .layout
                    .encode(next.timestamp, self.machine_id, next.sequence)?;
                Ok(Outcome::Commit { state: next, id })
            }
            Step::Exhausted => Ok(Outcome::Pending { yield_for: 1 }),
            Step::Behind { drift } => self.cold_clock_behind(drift),
        }
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(&self, drift: u64) -> Result<Outcome> {
        match self.rollback.tolerate(drift) {
            Ok(yield_for) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    drift_millis = drift,
                    machine_id = self.machine_id,
                    "clock moved backwards, waiting for it to catch up"
                );
                Ok(Outcome::Pending { yield_for })
            }
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::error!(
                    drift_millis = drift,
                    machine_id = self.machine_id,
                    policy = ?self.rollback,
                    "clock moved backwards beyond tolerance"
                );
                Err(e)
            }
        }
    }
}

impl From<Outcome> for Poll {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Commit { id, .. } => Self::Ready { id },
            Outcome::Pending { yield_for } => Self::Pending { yield_for },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u64 = 4_095;

    #[test]
    fn fresh_state_issues_sequence_zero() {
        assert_eq!(
            GeneratorState::FRESH.advance(7, MAX, SequenceReset::EveryTick),
            Step::Issue(GeneratorState::issued(7, 0))
        );
        // even at t = 0, which would otherwise look like the same tick
        assert_eq!(
            GeneratorState::FRESH.advance(0, MAX, SequenceReset::EveryTick),
            Step::Issue(GeneratorState::issued(0, 0))
        );
    }

    #[test]
    fn same_tick_increments_until_exhausted() {
        let state = GeneratorState::issued(7, 3);
        assert_eq!(
            state.advance(7, MAX, SequenceReset::EveryTick),
            Step::Issue(GeneratorState::issued(7, 4))
        );
        assert_eq!(
            GeneratorState::issued(7, MAX).advance(7, MAX, SequenceReset::EveryTick),
            Step::Exhausted
        );
    }

    #[test]
    fn new_tick_follows_reset_policy() {
        let state = GeneratorState::issued(7, 3);
        assert_eq!(
            state.advance(9, MAX, SequenceReset::EveryTick),
            Step::Issue(GeneratorState::issued(9, 0))
        );
        assert_eq!(
            state.advance(9, MAX, SequenceReset::Threshold(10)),
            Step::Issue(GeneratorState::issued(9, 4))
        );
        assert_eq!(
            GeneratorState::issued(7, 10).advance(8, MAX, SequenceReset::Threshold(10)),
            Step::Issue(GeneratorState::issued(8, 0))
        );
    }

    #[test]
    fn half_range_tracks_the_layout() {
        // 12 bits: continue up to 2047, then start over
        assert_eq!(
            GeneratorState::issued(7, 2_046).advance(8, MAX, SequenceReset::HalfRange),
            Step::Issue(GeneratorState::issued(8, 2_047))
        );
        assert_eq!(
            GeneratorState::issued(7, 2_047).advance(8, MAX, SequenceReset::HalfRange),
            Step::Issue(GeneratorState::issued(8, 0))
        );
        // 4 bits: threshold 7
        assert_eq!(
            GeneratorState::issued(7, 6).advance(8, 15, SequenceReset::HalfRange),
            Step::Issue(GeneratorState::issued(8, 7))
        );
        assert_eq!(
            GeneratorState::issued(7, 7).advance(8, 15, SequenceReset::HalfRange),
            Step::Issue(GeneratorState::issued(8, 0))
        );
        assert!(SequenceReset::HalfRange.validate(&Layout::new(41, 10, 1).unwrap()).is_ok());
    }

    #[test]
    fn earlier_clock_reports_drift() {
        assert_eq!(
            GeneratorState::issued(10, 0).advance(7, MAX, SequenceReset::EveryTick),
            Step::Behind { drift: 3 }
        );
    }

    #[test]
    fn exhausted_keeps_fresh_state_fresh() {
        assert_eq!(GeneratorState::FRESH.exhausted(MAX), GeneratorState::FRESH);
        assert_eq!(
            GeneratorState::issued(5, 1).exhausted(MAX),
            GeneratorState::issued(5, MAX)
        );
    }

    #[test]
    fn pack_unpack() {
        let layout = Layout::default();
        for state in [
            GeneratorState::FRESH,
            GeneratorState::issued(0, 0),
            GeneratorState::issued(layout.max_timestamp(), layout.max_sequence()),
            GeneratorState::issued(123_456, 17),
        ] {
            let raw = state.pack(layout.sequence_bits());
            assert_eq!(GeneratorState::unpack(raw, layout.sequence_bits()), state);
        }
        assert_ne!(
            GeneratorState::FRESH.pack(12),
            GeneratorState::issued(0, 0).pack(12)
        );
    }

    #[test]
    fn half_range_threshold() {
        assert_eq!(
            SequenceReset::half_range(&Layout::default()),
            SequenceReset::Threshold(2_047)
        );
        let one_bit = Layout::new(41, 10, 1).unwrap();
        assert_eq!(SequenceReset::half_range(&one_bit), SequenceReset::Threshold(0));
    }

    #[test]
    fn threshold_must_fit_sequence() {
        let layout = Layout::default();
        assert!(SequenceReset::Threshold(4_095).validate(&layout).is_ok());
        assert!(matches!(
            SequenceReset::Threshold(4_096).validate(&layout),
            Err(Error::Configuration { .. })
        ));
        assert!(SequenceReset::EveryTick.validate(&layout).is_ok());
    }

    #[test]
    fn rules_reject_exhausted_epoch_without_committing() {
        let rules = Rules {
            layout: Layout::new(4, 2, 2).unwrap(),
            machine_id: 1,
            rollback: RollbackPolicy::Fail,
            reset: SequenceReset::EveryTick,
        };
        assert!(matches!(
            rules.step(&GeneratorState::FRESH, 16),
            Err(Error::EncodingRange {
                field: crate::Field::Timestamp,
                ..
            })
        ));
        assert!(matches!(
            rules.step(&GeneratorState::FRESH, 15),
            Ok(Outcome::Commit { .. })
        ));
    }

    #[test]
    fn rules_apply_rollback_policy() {
        let mut rules = Rules {
            layout: Layout::default(),
            machine_id: 0,
            rollback: RollbackPolicy::Wait {
                max_drift_millis: 5,
            },
            reset: SequenceReset::EveryTick,
        };
        let state = GeneratorState::issued(100, 0);
        assert_eq!(
            rules.step(&state, 97),
            Ok(Outcome::Pending { yield_for: 3 })
        );
        assert_eq!(
            rules.step(&state, 90),
            Err(Error::ClockRolledBack { drift_millis: 10 })
        );
        rules.rollback = RollbackPolicy::Fail;
        assert_eq!(
            rules.step(&state, 99),
            Err(Error::ClockRolledBack { drift_millis: 1 })
        );
    }
}
