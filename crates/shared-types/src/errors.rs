//! # Error Types
//!
//! Errors raised while parsing the text forms of shared primitives.

use thiserror::Error;

/// Errors that can occur while decoding addresses and identifiers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodingError {
    /// Text is not valid unpadded base32.
    #[error("invalid base32: {0}")]
    InvalidBase32(String),

    /// Decoded byte length does not match the expected length.
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Address checksum does not match the public key.
    #[error("address checksum mismatch")]
    ChecksumMismatch,
}
