use crate::base62::Base62Error;

/// A result type whose error defaults to [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors that `keyflake` can produce.
///
/// Construction-time variants ([`Error::Configuration`],
/// [`Error::InvalidWorkerId`]) are fatal for the generator being built.
/// Per-call variants abort only that call and never leave the generator state
/// half-updated.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The generator configuration is invalid (epoch, bit widths, policies).
    #[error("invalid configuration: {reason}")]
    Configuration {
        /// Human readable description of the offending setting.
        reason: String,
    },

    /// A worker id outside `[0, max]` was supplied.
    #[error("worker id {worker_id} is out of range (expected 0..={max})")]
    InvalidWorkerId {
        /// The rejected value, as handed to the gate.
        worker_id: i64,
        /// The largest worker id the layout can hold.
        max: u64,
    },

    /// A key was requested before a worker id was bound.
    #[error("worker id is not bound yet")]
    UnboundWorkerId,

    /// The external worker id provider failed.
    #[error("worker id provider failed: {0}")]
    WorkerIdProvider(String),

    /// The clock moved backwards further than the rollback policy tolerates.
    #[error("clock moved backwards by {drift_millis}ms")]
    ClockRolledBack {
        /// How far behind the last issued timestamp the clock reads.
        drift_millis: u64,
    },

    /// A field does not fit its bit width. For the timestamp field this means
    /// the epoch is exhausted.
    #[error("{field} value {value} exceeds its maximum of {max}")]
    EncodingRange {
        /// Name of the overflowing field.
        field: Field,
        /// The value that did not fit.
        value: u64,
        /// The largest value the field can hold.
        max: u64,
    },

    /// A radix-62 key could not be decoded.
    #[error("malformed key: {0}")]
    DecodingFormat(#[from] Base62Error),

    /// The generator lock was poisoned by a panicking thread.
    ///
    /// `parking_lot` mutexes do not poison, so this variant is not available
    /// with the `parking-lot` feature.
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    #[error("generator lock poisoned")]
    LockPoisoned,
}

impl Error {
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}

/// The bit field an [`Error::EncodingRange`] refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Timestamp,
    MachineId,
    Sequence,
}

impl core::fmt::Display for Field {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Timestamp => "timestamp",
            Self::MachineId => "machine id",
            Self::Sequence => "sequence",
        })
    }
}

// Convert all poisoned lock errors to a simplified `LockPoisoned`
#[cfg(not(feature = "parking-lot"))]
impl<G> From<std::sync::PoisonError<G>> for Error {
    fn from(_: std::sync::PoisonError<G>) -> Self {
        Self::LockPoisoned
    }
}
