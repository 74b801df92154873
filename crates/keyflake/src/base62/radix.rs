use super::Base62Error;

/// Digits, then upper case, then lower case: ASCII order, so fixed-width keys
/// sort the same way as the integers they encode.
const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const RADIX: u64 = 62;
const NO_VALUE: u8 = 255;

/// Lookup table for radix-62 decoding
const LOOKUP: [u8; 256] = {
    let mut lut = [NO_VALUE; 256];
    let mut i = 0_u8;
    while i < 62 {
        lut[ALPHABET[i as usize] as usize] = i;
        i += 1;
    }
    lut
};

/// Smallest number of radix-62 symbols that can represent every value of a
/// `bits`-wide integer, i.e. `ceil(bits / log2(62))`.
pub(crate) const fn width_for_bits(bits: u8) -> usize {
    let limit = 1_u128 << bits;
    let mut capacity = 1_u128;
    let mut width = 0;
    while capacity < limit {
        capacity *= RADIX as u128;
        width += 1;
    }
    width
}

/// Encodes `value` left-padded with `'0'` to `width` symbols.
///
/// The caller guarantees `value` fits in `width` symbols.
pub(crate) fn encode(mut value: u64, width: usize) -> String {
    let mut buf = vec![ALPHABET[0]; width];
    for slot in buf.iter_mut().rev() {
        if value == 0 {
            break;
        }
        *slot = ALPHABET[(value % RADIX) as usize];
        value /= RADIX;
    }
    debug_assert_eq!(value, 0, "value does not fit in {width} symbols");
    buf.into_iter().map(char::from).collect()
}

/// Decodes a fixed-width radix-62 string.
pub(crate) fn decode(encoded: &str, width: usize) -> Result<u64, Base62Error> {
    if encoded.len() != width {
        return Err(Base62Error::InvalidLength {
            expected: width,
            len: encoded.len(),
        });
    }
    let mut acc = 0_u64;
    for (index, byte) in encoded.bytes().enumerate() {
        let digit = LOOKUP[byte as usize];
        if digit == NO_VALUE {
            return Err(Base62Error::InvalidSymbol { byte, index });
        }
        acc = acc
            .checked_mul(RADIX)
            .and_then(|acc| acc.checked_add(u64::from(digit)))
            .ok_or(Base62Error::Overflow)?;
    }
    Ok(acc)
}
