use core::fmt;

use crate::{Error, Layout, Result};

/// Checks that `worker_id` fits the machine field of `layout`.
///
/// Negative values and values at or above `2^machine_bits` are configuration
/// mistakes and are never retried.
///
/// # Errors
///
/// Returns [`Error::InvalidWorkerId`] if the value is out of range.
///
/// # Example
///
/// ```
/// use keyflake::{Layout, validate_worker_id};
///
/// let layout = Layout::default();
/// assert_eq!(validate_worker_id(1023, &layout), Ok(1023));
/// assert!(validate_worker_id(1024, &layout).is_err());
/// assert!(validate_worker_id(-1, &layout).is_err());
/// ```
pub fn validate_worker_id(worker_id: i64, layout: &Layout) -> Result<u64> {
    let max = layout.max_machine_id();
    match u64::try_from(worker_id) {
        Ok(id) if id <= max => Ok(id),
        _ => Err(Error::InvalidWorkerId { worker_id, max }),
    }
}

/// The external collaborator that hands out worker IDs.
///
/// Implementations typically lease an ID from a coordination service. The
/// generator only consumes the result; keeping IDs disjoint across the
/// cluster is the provider's job.
pub trait WorkerIdProvider {
    /// The error type returned when no ID could be obtained.
    type Error: fmt::Display;

    /// Returns the worker ID this process should use.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if no ID is available.
    fn worker_id(&self) -> Result<i64, Self::Error>;
}

/// A provider that always returns the same, pre-assigned ID.
///
/// Suitable for deployments that assign IDs statically through configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StaticWorkerId(pub i64);

impl WorkerIdProvider for StaticWorkerId {
    type Error = core::convert::Infallible;

    fn worker_id(&self) -> Result<i64, Self::Error> {
        Ok(self.0)
    }
}

/// Binding state of a [`KeyGenerator`]: either no worker ID yet, or a bound
/// generator.
///
/// [`KeyGenerator`]: crate::KeyGenerator
#[derive(Debug)]
pub(crate) enum WorkerSlot<G> {
    Unbound,
    Bound(G),
}

impl<G> WorkerSlot<G> {
    pub(crate) fn bound(&self) -> Result<&G> {
        match self {
            Self::Bound(generator) => Ok(generator),
            Self::Unbound => Err(Error::UnboundWorkerId),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingProvider;

    impl WorkerIdProvider for FailingProvider {
        type Error = &'static str;

        fn worker_id(&self) -> Result<i64, Self::Error> {
            Err("lease expired")
        }
    }

    #[test]
    fn accepts_full_range() {
        let layout = Layout::default();
        assert_eq!(validate_worker_id(0, &layout), Ok(0));
        assert_eq!(validate_worker_id(1023, &layout), Ok(1023));
    }

    #[test]
    fn rejects_negative_and_ceiling() {
        let layout = Layout::default();
        assert_eq!(
            validate_worker_id(-1, &layout),
            Err(Error::InvalidWorkerId {
                worker_id: -1,
                max: 1023
            })
        );
        assert_eq!(
            validate_worker_id(1024, &layout),
            Err(Error::InvalidWorkerId {
                worker_id: 1024,
                max: 1023
            })
        );
        assert!(validate_worker_id(i64::MIN, &layout).is_err());
    }

    #[test]
    fn narrow_layout_ceiling() {
        let layout = Layout::new(41, 2, 12).unwrap();
        assert_eq!(validate_worker_id(3, &layout), Ok(3));
        assert!(validate_worker_id(4, &layout).is_err());
    }

    #[test]
    fn providers() {
        assert_eq!(StaticWorkerId(9).worker_id(), Ok(9));
        assert_eq!(FailingProvider.worker_id(), Err("lease expired"));
    }

    #[test]
    fn unbound_slot_refuses() {
        let slot: WorkerSlot<()> = WorkerSlot::Unbound;
        assert_eq!(slot.bound().err(), Some(Error::UnboundWorkerId));
        assert!(WorkerSlot::Bound(()).bound().is_ok());
    }
}
