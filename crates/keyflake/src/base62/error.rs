/// Errors that can occur while decoding a radix-62 key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum Base62Error {
    /// The key does not have the fixed width of the layout.
    #[error("invalid length: expected {expected}, got {len}")]
    InvalidLength { expected: usize, len: usize },

    /// The key contains a byte outside `0-9A-Za-z`.
    #[error("invalid symbol {byte:#04x} at index {index}")]
    InvalidSymbol { byte: u8, index: usize },

    /// The key decodes to a value that does not fit the layout.
    #[error("decoded value does not fit the layout")]
    Overflow,
}
