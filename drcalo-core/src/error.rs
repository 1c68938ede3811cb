//! Error types for drcalo-core.

use thiserror::Error;

/// Result type alias for drcalo-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for identifier and bit-field operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed encoding string.
    #[error("invalid encoding string: {0}")]
    InvalidEncoding(String),

    /// Field name not present in the coder schema.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// Value does not fit in the field width.
    #[error("value {value} overflows field '{field}' ({width} bits)")]
    FieldOverflow {
        /// Field name.
        field: String,
        /// Offending value.
        value: u64,
        /// Field width in bits.
        width: u8,
    },
}
