//! # ABI Types
//!
//! The value-type grammar of the ABI:
//!
//! ```text
//! uint<N>        8 <= N <= 512, N % 8 == 0
//! ufixed<N>x<M>  same N, 1 <= M <= 160
//! bool | byte | address | string
//! <T>[<N>]       static array
//! <T>[]          dynamic array
//! (<T1>,...,<Tn>) tuple
//! ```

use crate::errors::AbiError;
use std::fmt;
use std::str::FromStr;

/// Largest supported integer width in bits.
pub const MAX_UINT_BITS: u16 = 512;

/// Largest supported `ufixed` precision.
pub const MAX_UFIXED_PRECISION: u8 = 160;

/// Length prefix width for `string` and `T[]`, and offset width in tuple heads.
pub const LENGTH_PREFIX_BYTES: usize = 2;

/// Byte length of an `address`.
pub const ADDRESS_BYTES: usize = 32;

/// An ABI value type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbiType {
    /// Unsigned integer of the given bit width.
    Uint(u16),
    /// Unsigned fixed-point decimal: `bits` wide with `precision` decimal places.
    Ufixed { bits: u16, precision: u8 },
    /// Boolean, packed with neighbouring bools inside tuples.
    Bool,
    /// A single byte.
    Byte,
    /// A 32-byte account address.
    Address,
    /// UTF-8 string with a u16 length prefix.
    String,
    /// Fixed-length array.
    StaticArray(Box<AbiType>, usize),
    /// Variable-length array with a u16 length prefix.
    DynamicArray(Box<AbiType>),
    /// Heterogeneous tuple.
    Tuple(Vec<AbiType>),
}

impl AbiType {
    /// Convenience constructor for `T[N]`.
    #[must_use]
    pub fn static_array(elem: AbiType, len: usize) -> Self {
        Self::StaticArray(Box::new(elem), len)
    }

    /// Convenience constructor for `T[]`.
    #[must_use]
    pub fn dynamic_array(elem: AbiType) -> Self {
        Self::DynamicArray(Box::new(elem))
    }

    /// Returns true if the encoded length depends on the value.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        match self {
            Self::String | Self::DynamicArray(_) => true,
            Self::StaticArray(elem, _) => elem.is_dynamic(),
            Self::Tuple(elems) => elems.iter().any(AbiType::is_dynamic),
            _ => false,
        }
    }

    /// Encoded byte length of a static type, or None for dynamic types and
    /// lengths that overflow `usize`.
    #[must_use]
    pub fn static_len(&self) -> Option<usize> {
        match self {
            Self::Uint(bits) | Self::Ufixed { bits, .. } => Some(usize::from(*bits) / 8),
            Self::Bool | Self::Byte => Some(1),
            Self::Address => Some(ADDRESS_BYTES),
            Self::String | Self::DynamicArray(_) => None,
            Self::StaticArray(elem, len) => {
                if **elem == Self::Bool {
                    Some(len.div_ceil(8))
                } else {
                    elem.static_len()?.checked_mul(*len)
                }
            }
            Self::Tuple(elems) => {
                let mut total = 0;
                let mut i = 0;
                while i < elems.len() {
                    if elems[i] == Self::Bool {
                        let run = bool_run(elems, i);
                        total += run.div_ceil(8);
                        i += run;
                    } else {
                        total = elems[i].static_len()?.checked_add(total)?;
                        i += 1;
                    }
                }
                Some(total)
            }
        }
    }

    /// Element types of a static array or tuple, as the tuple they encode like.
    pub(crate) fn tuple_children(&self, len: usize) -> Vec<AbiType> {
        match self {
            Self::StaticArray(elem, n) => vec![(**elem).clone(); *n],
            Self::DynamicArray(elem) => vec![(**elem).clone(); len],
            Self::Tuple(elems) => elems.clone(),
            _ => Vec::new(),
        }
    }
}

/// Length of the run of consecutive `bool` types starting at `start`.
pub(crate) fn bool_run(types: &[AbiType], start: usize) -> usize {
    types[start..]
        .iter()
        .take_while(|t| **t == AbiType::Bool)
        .count()
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint(bits) => write!(f, "uint{bits}"),
            Self::Ufixed { bits, precision } => write!(f, "ufixed{bits}x{precision}"),
            Self::Bool => f.write_str("bool"),
            Self::Byte => f.write_str("byte"),
            Self::Address => f.write_str("address"),
            Self::String => f.write_str("string"),
            Self::StaticArray(elem, len) => write!(f, "{elem}[{len}]"),
            Self::DynamicArray(elem) => write!(f, "{elem}[]"),
            Self::Tuple(elems) => {
                f.write_str("(")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{elem}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl FromStr for AbiType {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_type(s)
    }
}

fn parse_type(s: &str) -> Result<AbiType, AbiError> {
    if s.is_empty() {
        return Err(AbiError::parse(s, "empty type"));
    }

    // Array suffixes bind loosest, so peel them off from the right first.
    if let Some(elem) = s.strip_suffix("[]") {
        return Ok(AbiType::dynamic_array(parse_type(elem)?));
    }
    if s.ends_with(']') {
        let open = s
            .rfind('[')
            .ok_or_else(|| AbiError::parse(s, "unbalanced `]`"))?;
        let len_text = &s[open + 1..s.len() - 1];
        if len_text.is_empty() || !len_text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AbiError::parse(s, "array length must be a decimal number"));
        }
        if len_text.len() > 1 && len_text.starts_with('0') {
            return Err(AbiError::parse(s, "array length has leading zeros"));
        }
        let len = len_text
            .parse::<u16>()
            .map_err(|_| AbiError::parse(s, format!("array length exceeds {}", u16::MAX)))?;
        return Ok(AbiType::static_array(parse_type(&s[..open])?, usize::from(len)));
    }

    if s.starts_with('(') {
        if !s.ends_with(')') {
            return Err(AbiError::parse(s, "unbalanced `(`"));
        }
        let elems = split_tuple(&s[1..s.len() - 1])
            .map_err(|reason| AbiError::parse(s, reason))?
            .into_iter()
            .map(parse_type)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(AbiType::Tuple(elems));
    }

    match s {
        "bool" => return Ok(AbiType::Bool),
        "byte" => return Ok(AbiType::Byte),
        "address" => return Ok(AbiType::Address),
        "string" => return Ok(AbiType::String),
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("ufixed") {
        let (bits_text, precision_text) = rest
            .split_once('x')
            .ok_or_else(|| AbiError::parse(s, "ufixed needs <N>x<M>"))?;
        let bits = parse_uint_bits(s, bits_text)?;
        let precision = parse_decimal(s, precision_text)?;
        if precision == 0 || precision > u64::from(MAX_UFIXED_PRECISION) {
            return Err(AbiError::parse(
                s,
                format!("precision must be in 1..={MAX_UFIXED_PRECISION}"),
            ));
        }
        return Ok(AbiType::Ufixed {
            bits,
            precision: precision as u8,
        });
    }

    if let Some(bits_text) = s.strip_prefix("uint") {
        return Ok(AbiType::Uint(parse_uint_bits(s, bits_text)?));
    }

    Err(AbiError::parse(s, "unknown type"))
}

fn parse_decimal(input: &str, text: &str) -> Result<u64, AbiError> {
    if text.is_empty()
        || !text.bytes().all(|b| b.is_ascii_digit())
        || (text.len() > 1 && text.starts_with('0'))
    {
        return Err(AbiError::parse(input, format!("`{text}` is not a decimal number")));
    }
    text.parse::<u64>()
        .map_err(|e| AbiError::parse(input, e.to_string()))
}

fn parse_uint_bits(input: &str, text: &str) -> Result<u16, AbiError> {
    let bits = parse_decimal(input, text)?;
    if bits < 8 || bits > u64::from(MAX_UINT_BITS) || bits % 8 != 0 {
        return Err(AbiError::parse(
            input,
            format!("bit width must be a multiple of 8 in 8..={MAX_UINT_BITS}"),
        ));
    }
    Ok(bits as u16)
}

/// Splits a tuple body on top-level commas.
pub(crate) fn split_tuple(body: &str) -> Result<Vec<&str>, String> {
    if body.is_empty() {
        return Ok(Vec::new());
    }
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "unbalanced `)`".to_string())?;
            }
            ',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err("unbalanced `(`".to_string());
    }
    parts.push(&body[start..]);
    if parts.iter().any(|p| p.is_empty()) {
        return Err("empty tuple element".to_string());
    }
    Ok(parts)
}
