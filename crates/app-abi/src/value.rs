//! # ABI Values
//!
//! Dynamically-typed argument and return values. A value carries no type of
//! its own; it is checked against an [`AbiType`] before encoding.

use crate::types::{AbiType, ADDRESS_BYTES};
use primitive_types::U512;
use shared_types::Address;

/// A value that can be encoded by some [`AbiType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    /// `uint<N>`, or the raw integer behind `ufixed<N>x<M>`.
    Uint(U512),
    /// `bool`.
    Bool(bool),
    /// `byte`.
    Byte(u8),
    /// `address`.
    Address(Address),
    /// `string`.
    String(String),
    /// `byte[]` / `byte[N]`; decoding always yields this form for byte arrays.
    Bytes(Vec<u8>),
    /// `T[]` / `T[N]`.
    Array(Vec<AbiValue>),
    /// `(T1,...,Tn)`.
    Tuple(Vec<AbiValue>),
}

impl AbiValue {
    /// Short name of the value's shape, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Uint(_) => "integer",
            Self::Bool(_) => "bool",
            Self::Byte(_) => "byte",
            Self::Address(_) => "address",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Array(_) => "array",
            Self::Tuple(_) => "tuple",
        }
    }

    /// Returns the integer as u64 if it fits.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Uint(v) if v.bits() <= 64 => Some(v.low_u64()),
            _ => None,
        }
    }

    /// Returns the integer value.
    #[must_use]
    pub fn as_uint(&self) -> Option<U512> {
        match self {
            Self::Uint(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the bool value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the bytes of a byte array value.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl From<u64> for AbiValue {
    fn from(v: u64) -> Self {
        Self::Uint(U512::from(v))
    }
}

impl From<u32> for AbiValue {
    fn from(v: u32) -> Self {
        Self::Uint(U512::from(v))
    }
}

impl From<u128> for AbiValue {
    fn from(v: u128) -> Self {
        Self::Uint(U512::from(v))
    }
}

impl From<U512> for AbiValue {
    fn from(v: U512) -> Self {
        Self::Uint(v)
    }
}

impl From<bool> for AbiValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for AbiValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for AbiValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Address> for AbiValue {
    fn from(v: Address) -> Self {
        Self::Address(v)
    }
}

impl From<Vec<u8>> for AbiValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl AbiType {
    /// Checks that `value` is structurally compatible with this type.
    ///
    /// Returns a human-readable reason on mismatch. Encoding performs the
    /// same checks, so a value that passes here always encodes.
    pub fn check(&self, value: &AbiValue) -> Result<(), String> {
        match (self, value) {
            (Self::Uint(bits) | Self::Ufixed { bits, .. }, AbiValue::Uint(v)) => {
                if v.bits() > usize::from(*bits) {
                    Err(format!("integer does not fit in {bits} bits"))
                } else {
                    Ok(())
                }
            }
            (Self::Bool, AbiValue::Bool(_)) | (Self::Byte, AbiValue::Byte(_)) => Ok(()),
            (Self::Byte, AbiValue::Uint(v)) if v.bits() <= 8 => Ok(()),
            (Self::Address, AbiValue::Address(_)) => Ok(()),
            (Self::Address, AbiValue::Bytes(b)) => {
                if b.len() == ADDRESS_BYTES {
                    Ok(())
                } else {
                    Err(format!("address needs {ADDRESS_BYTES} bytes, got {}", b.len()))
                }
            }
            (Self::String, AbiValue::String(s)) => check_length(s.len()),
            (Self::StaticArray(elem, len), AbiValue::Bytes(b)) if **elem == Self::Byte => {
                if b.len() == *len {
                    Ok(())
                } else {
                    Err(format!("expected {len} bytes, got {}", b.len()))
                }
            }
            (Self::DynamicArray(elem), AbiValue::Bytes(b)) if **elem == Self::Byte => {
                check_length(b.len())
            }
            (Self::StaticArray(elem, len), AbiValue::Array(items)) => {
                if items.len() != *len {
                    return Err(format!("expected {len} elements, got {}", items.len()));
                }
                check_all(items.iter().map(|item| (elem.as_ref(), item)))
            }
            (Self::DynamicArray(elem), AbiValue::Array(items)) => {
                check_length(items.len())?;
                check_all(items.iter().map(|item| (elem.as_ref(), item)))
            }
            (Self::Tuple(elems), AbiValue::Tuple(items)) => {
                if items.len() != elems.len() {
                    return Err(format!(
                        "expected {} tuple elements, got {}",
                        elems.len(),
                        items.len()
                    ));
                }
                check_all(elems.iter().zip(items))
            }
            (ty, value) => Err(format!("got {} for {ty}", value.kind())),
        }
    }
}

fn check_length(len: usize) -> Result<(), String> {
    if len > usize::from(u16::MAX) {
        Err(format!("length {len} exceeds {}", u16::MAX))
    } else {
        Ok(())
    }
}

fn check_all<'a>(pairs: impl Iterator<Item = (&'a AbiType, &'a AbiValue)>) -> Result<(), String> {
    for (i, (ty, value)) in pairs.enumerate() {
        ty.check(value).map_err(|reason| format!("element {i}: {reason}"))?;
    }
    Ok(())
}
