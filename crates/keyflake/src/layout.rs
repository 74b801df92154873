use crate::{Error, Field, Result, SnowflakeId, base62};

/// Bit layout of a Snowflake ID, chosen at runtime.
///
/// The packed `u64` reserves its most significant bit (always zero) and lays
/// out the remaining fields from most to least significant:
///
/// ```text
///  Bit Index:  63           63 62                              0
///              +--------------+-----------+---------+----------+
///  Field:      | reserved (1) | timestamp | machine | sequence |
///              +--------------+-----------+---------+----------+
///              |<----- MSB ------- 64 bits ------- LSB ------->|
/// ```
///
/// When the three widths sum to less than 63, the unused high bits below the
/// reserved bit are zero as well.
///
/// # Example
///
/// ```
/// use keyflake::Layout;
///
/// let layout = Layout::default();
/// let id = layout.encode(1_000, 2, 1).unwrap();
/// let parts = layout.decode(id);
/// assert_eq!((parts.timestamp, parts.machine_id, parts.sequence), (1_000, 2, 1));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "LayoutRepr", into = "LayoutRepr"))]
pub struct Layout {
    timestamp_bits: u8,
    machine_bits: u8,
    sequence_bits: u8,
}

/// The three fields of a decoded [`SnowflakeId`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Components {
    /// Milliseconds since the generator's epoch.
    pub timestamp: u64,
    pub machine_id: u64,
    pub sequence: u64,
}

impl Default for Layout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Layout {
    /// Number of usable bits; the sign bit is never used.
    pub const USABLE_BITS: u8 = 63;

    /// The classic layout: 41 bits timestamp, 10 bits machine ID and 12 bits
    /// sequence.
    pub const DEFAULT: Self = Self {
        timestamp_bits: 41,
        machine_bits: 10,
        sequence_bits: 12,
    };

    /// Creates a layout, checking that every field is at least one bit wide
    /// and that the fields fit in [`Self::USABLE_BITS`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a width is zero or the widths do not
    /// fit.
    pub fn new(timestamp_bits: u8, machine_bits: u8, sequence_bits: u8) -> Result<Self> {
        if timestamp_bits == 0 || machine_bits == 0 || sequence_bits == 0 {
            return Err(Error::configuration(format!(
                "bit widths must be positive (timestamp={timestamp_bits}, \
                 machine={machine_bits}, sequence={sequence_bits})"
            )));
        }
        let used = u16::from(timestamp_bits) + u16::from(machine_bits) + u16::from(sequence_bits);
        if used > u16::from(Self::USABLE_BITS) {
            return Err(Error::configuration(format!(
                "layout uses {} bits but only {} are available",
                used + 1,
                Self::USABLE_BITS + 1
            )));
        }
        Ok(Self {
            timestamp_bits,
            machine_bits,
            sequence_bits,
        })
    }

    pub const fn timestamp_bits(&self) -> u8 {
        self.timestamp_bits
    }

    pub const fn machine_bits(&self) -> u8 {
        self.machine_bits
    }

    pub const fn sequence_bits(&self) -> u8 {
        self.sequence_bits
    }

    /// Total width including the reserved sign bit.
    pub const fn total_bits(&self) -> u8 {
        1 + self.timestamp_bits + self.machine_bits + self.sequence_bits
    }

    /// Largest timestamp delta the layout can hold before the epoch is
    /// exhausted.
    pub const fn max_timestamp(&self) -> u64 {
        mask(self.timestamp_bits)
    }

    pub const fn max_machine_id(&self) -> u64 {
        mask(self.machine_bits)
    }

    pub const fn max_sequence(&self) -> u64 {
        mask(self.sequence_bits)
    }

    const fn machine_shift(&self) -> u8 {
        self.sequence_bits
    }

    const fn timestamp_shift(&self) -> u8 {
        self.sequence_bits + self.machine_bits
    }

    /// Packs the three fields into an ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EncodingRange`] if any field exceeds its width.
    pub fn encode(&self, timestamp: u64, machine_id: u64, sequence: u64) -> Result<SnowflakeId> {
        check(Field::Timestamp, timestamp, self.max_timestamp())?;
        check(Field::MachineId, machine_id, self.max_machine_id())?;
        check(Field::Sequence, sequence, self.max_sequence())?;
        Ok(SnowflakeId::from_raw(
            (timestamp << self.timestamp_shift())
                | (machine_id << self.machine_shift())
                | sequence,
        ))
    }

    /// Unpacks an ID into its fields. Bits above the layout are ignored; use
    /// [`Self::validate_id`] first for untrusted input.
    pub const fn decode(&self, id: SnowflakeId) -> Components {
        Components {
            timestamp: self.timestamp(id),
            machine_id: self.machine_id(id),
            sequence: self.sequence(id),
        }
    }

    pub const fn timestamp(&self, id: SnowflakeId) -> u64 {
        (id.to_raw() >> self.timestamp_shift()) & self.max_timestamp()
    }

    pub const fn machine_id(&self, id: SnowflakeId) -> u64 {
        (id.to_raw() >> self.machine_shift()) & self.max_machine_id()
    }

    pub const fn sequence(&self, id: SnowflakeId) -> u64 {
        id.to_raw() & self.max_sequence()
    }

    /// Returns `true` if no bit above the layout's fields is set.
    pub const fn is_valid(&self, id: SnowflakeId) -> bool {
        id.to_raw() >> (self.total_bits() - 1) == 0
    }

    /// Passes `id` through if it fits the layout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EncodingRange`] for the timestamp field when bits above
    /// the layout are set.
    pub fn validate_id(&self, id: SnowflakeId) -> Result<SnowflakeId> {
        if self.is_valid(id) {
            Ok(id)
        } else {
            Err(Error::EncodingRange {
                field: Field::Timestamp,
                value: id.to_raw() >> self.timestamp_shift(),
                max: self.max_timestamp(),
            })
        }
    }

    /// Width of the radix-62 form of IDs in this layout.
    pub const fn str_width(&self) -> usize {
        base62::width_for_bits(self.total_bits())
    }

    /// Encodes `id` as a fixed-width radix-62 string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EncodingRange`] if `id` does not fit the layout.
    pub fn encode_str(&self, id: SnowflakeId) -> Result<String> {
        let id = self.validate_id(id)?;
        Ok(base62::encode(id.to_raw(), self.str_width()))
    }

    /// Decodes a fixed-width radix-62 string produced by [`Self::encode_str`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DecodingFormat`] if the string has the wrong length,
    /// contains a symbol outside the alphabet, or decodes to a value outside
    /// the layout.
    pub fn decode_str(&self, s: &str) -> Result<SnowflakeId> {
        let raw = base62::decode(s, self.str_width())?;
        let id = SnowflakeId::from_raw(raw);
        if !self.is_valid(id) {
            return Err(base62::Base62Error::Overflow.into());
        }
        Ok(id)
    }
}

const fn mask(bits: u8) -> u64 {
    (1 << bits) - 1
}

fn check(field: Field, value: u64, max: u64) -> Result<()> {
    if value > max {
        return Err(Error::EncodingRange { field, value, max });
    }
    Ok(())
}

#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct LayoutRepr {
    timestamp_bits: u8,
    machine_bits: u8,
    sequence_bits: u8,
}

#[cfg(feature = "serde")]
impl TryFrom<LayoutRepr> for Layout {
    type Error = Error;

    fn try_from(repr: LayoutRepr) -> Result<Self> {
        Self::new(repr.timestamp_bits, repr.machine_bits, repr.sequence_bits)
    }
}

#[cfg(feature = "serde")]
impl From<Layout> for LayoutRepr {
    fn from(layout: Layout) -> Self {
        Self {
            timestamp_bits: layout.timestamp_bits,
            machine_bits: layout.machine_bits,
            sequence_bits: layout.sequence_bits,
        }
    }
}
