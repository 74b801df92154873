use core::time::Duration;

use crate::{
    DEFAULT_EPOCH, Error, Layout, Result, RollbackPolicy, SequenceReset, SnowflakeId, SystemClock,
};

/// Everything that shapes generated IDs apart from the worker ID.
///
/// A configuration is plain data; [`GeneratorConfig::validate`] runs when a
/// generator is built from it. With the `serde` feature, missing fields fall
/// back to their defaults.
///
/// # Example
///
/// ```
/// use keyflake::{GeneratorConfig, Layout};
///
/// let config = GeneratorConfig {
///     layout: Layout::new(41, 8, 14).unwrap(),
///     as_string: true,
///     ..GeneratorConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GeneratorConfig {
    /// Start of time for the timestamp field, in milliseconds since
    /// 1970-01-01 UTC. Must be positive.
    pub epoch_millis: u64,
    pub layout: Layout,
    /// Whether [`KeyGenerator::generate_key`] returns radix-62 strings.
    ///
    /// [`KeyGenerator::generate_key`]: crate::KeyGenerator::generate_key
    pub as_string: bool,
    pub rollback: RollbackPolicy,
    pub sequence_reset: SequenceReset,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            epoch_millis: DEFAULT_EPOCH.as_millis() as u64,
            layout: Layout::DEFAULT,
            as_string: false,
            rollback: RollbackPolicy::default(),
            sequence_reset: SequenceReset::HalfRange,
        }
    }
}

impl GeneratorConfig {
    /// Checks the settings that the individual types cannot check on their
    /// own.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the epoch is zero, if the latest
    /// timestamp the layout can hold would overflow `u64` once re-anchored to
    /// the Unix epoch, or if the sequence reset threshold does not fit the
    /// layout.
    pub fn validate(&self) -> Result<()> {
        if self.epoch_millis == 0 {
            return Err(Error::configuration("epoch must be positive"));
        }
        self.unix_millis(self.layout.max_timestamp())?;
        self.sequence_reset.validate(&self.layout)
    }

    pub const fn epoch(&self) -> Duration {
        Duration::from_millis(self.epoch_millis)
    }

    /// A wall clock anchored to this configuration's epoch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the epoch is zero or in the future.
    pub fn system_clock(&self) -> Result<SystemClock> {
        SystemClock::with_epoch(self.epoch())
    }

    /// Decodes `id` and re-anchors its timestamp to the Unix epoch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EncodingRange`] if `id` has bits set above the layout,
    /// or [`Error::Configuration`] if its timestamp cannot be expressed in
    /// Unix milliseconds, which [`GeneratorConfig::validate`] rules out.
    pub fn parse(&self, id: SnowflakeId) -> Result<IdState> {
        let parts = self.layout.decode(self.layout.validate_id(id)?);
        Ok(IdState {
            unix_millis: self.unix_millis(parts.timestamp)?,
            machine_id: parts.machine_id,
            sequence: parts.sequence,
        })
    }

    fn unix_millis(&self, timestamp: u64) -> Result<u64> {
        self.epoch_millis.checked_add(timestamp).ok_or_else(|| {
            Error::configuration(format!(
                "epoch {} plus timestamp {timestamp} overflows u64",
                self.epoch_millis
            ))
        })
    }
}

/// A decoded ID with its timestamp expressed in Unix time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IdState {
    /// Milliseconds since 1970-01-01 UTC at which the ID was generated.
    pub unix_millis: u64,
    pub machine_id: u64,
    pub sequence: u64,
}

impl IdState {
    pub const fn unix_time(&self) -> Duration {
        Duration::from_millis(self.unix_millis)
    }
}

impl core::fmt::Display for IdState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {} {}", self.unix_millis, self.machine_id, self.sequence)
    }
}
