//! # Error Types
//!
//! All errors raised by ABI type parsing, method resolution and the codec.

use thiserror::Error;

/// Errors from the ABI layer.
///
/// Every variant is a caller error: nothing here is retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AbiError {
    /// A type string does not follow the ABI type grammar.
    #[error("invalid ABI type `{input}`: {reason}")]
    TypeParse { input: String, reason: String },

    /// No unique method with this name exists in the interface.
    #[error("method `{name}` not found: {reason}")]
    MethodNotFound { name: String, reason: String },

    /// Wrong number of arguments for the resolved method.
    #[error("method `{method}` takes {expected} arguments, got {actual}")]
    ArgumentCount {
        method: String,
        expected: usize,
        actual: usize,
    },

    /// Argument at `position` is not compatible with its declared type.
    #[error("method `{method}` argument {position}: expected {expected}, {reason}")]
    ArgumentType {
        method: String,
        position: usize,
        expected: String,
        reason: String,
    },

    /// Value cannot be encoded as the given type.
    #[error("cannot encode value as {ty}: {reason}")]
    Encode { ty: String, reason: String },

    /// Bytes cannot be decoded as the given type.
    #[error("cannot decode {ty}: {reason}")]
    Decode { ty: String, reason: String },

    /// Contract interface document is malformed.
    #[error("invalid contract interface: {0}")]
    InvalidContract(String),
}

impl AbiError {
    pub(crate) fn encode(ty: impl ToString, reason: impl Into<String>) -> Self {
        Self::Encode {
            ty: ty.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn decode(ty: impl ToString, reason: impl Into<String>) -> Self {
        Self::Decode {
            ty: ty.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn parse(input: &str, reason: impl Into<String>) -> Self {
        Self::TypeParse {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}
