use core::fmt;

/// A packed Snowflake ID.
///
/// The value carries no layout; decode it with the [`Layout`] that produced
/// it. IDs compare numerically, which for a fixed layout means by timestamp,
/// then machine ID, then sequence.
///
/// [`Layout`]: crate::Layout
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SnowflakeId {
    id: u64,
}

impl SnowflakeId {
    /// Wraps a raw integer without validating it against any layout.
    pub const fn from_raw(raw: u64) -> Self {
        Self { id: raw }
    }

    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    /// Returns the ID as a zero-padded 20-digit string.
    pub fn to_padded_string(&self) -> String {
        format!("{:020}", self.id)
    }
}

impl From<SnowflakeId> for u64 {
    fn from(id: SnowflakeId) -> Self {
        id.id
    }
}

impl From<SnowflakeId> for i64 {
    /// The reserved sign bit is always clear, so the cast never goes negative
    /// for IDs produced by a generator.
    fn from(id: SnowflakeId) -> Self {
        id.id as i64
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SnowflakeId({:#018x})", self.id)
    }
}

/// A generated key in the representation the generator is configured for.
///
/// Numeric keys are the packed integer; text keys are its fixed-width radix-62
/// form. Both orders agree for keys of the same layout.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Identifier {
    Numeric(SnowflakeId),
    Text(String),
}

impl Identifier {
    pub const fn as_numeric(&self) -> Option<SnowflakeId> {
        match self {
            Self::Numeric(id) => Some(*id),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Numeric(_) => None,
            Self::Text(s) => Some(s),
        }
    }
}

impl From<SnowflakeId> for Identifier {
    fn from(id: SnowflakeId) -> Self {
        Self::Numeric(id)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => fmt::Display::fmt(id, f),
            Self::Text(s) => f.write_str(s),
        }
    }
}
