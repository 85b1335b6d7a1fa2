//! # Canonical ABI Codec
//!
//! - integers: fixed-width big-endian
//! - `bool`: `0x80` / `0x00`; runs of up to 8 adjacent bools in a tuple share
//!   one byte, most significant bit first
//! - `string`, `T[]`: big-endian u16 length prefix
//! - tuples (and `T[N]`, which encode as N-tuples): head/tail layout, dynamic
//!   elements contribute a u16 offset to the head and their bytes to the tail
//!
//! Decoding is the exact inverse and rejects short or trailing input.

use crate::errors::AbiError;
use crate::types::{bool_run, AbiType, ADDRESS_BYTES, LENGTH_PREFIX_BYTES};
use crate::value::AbiValue;
use primitive_types::U512;
use shared_types::Address;

const BOOL_TRUE: u8 = 0x80;

/// Encodes `value` as `ty`.
pub fn encode(ty: &AbiType, value: &AbiValue) -> Result<Vec<u8>, AbiError> {
    ty.check(value).map_err(|reason| AbiError::encode(ty, reason))?;
    encode_checked(ty, value)
}

/// Decodes exactly `data` as `ty`.
pub fn decode(ty: &AbiType, data: &[u8]) -> Result<AbiValue, AbiError> {
    match ty {
        AbiType::Uint(bits) | AbiType::Ufixed { bits, .. } => {
            let len = usize::from(*bits) / 8;
            expect_len(ty, data, len)?;
            Ok(AbiValue::Uint(U512::from_big_endian(data)))
        }
        AbiType::Bool => {
            expect_len(ty, data, 1)?;
            match data[0] {
                BOOL_TRUE => Ok(AbiValue::Bool(true)),
                0 => Ok(AbiValue::Bool(false)),
                other => Err(AbiError::decode(ty, format!("invalid bool byte 0x{other:02x}"))),
            }
        }
        AbiType::Byte => {
            expect_len(ty, data, 1)?;
            Ok(AbiValue::Byte(data[0]))
        }
        AbiType::Address => {
            expect_len(ty, data, ADDRESS_BYTES)?;
            Address::from_slice(data)
                .map(AbiValue::Address)
                .ok_or_else(|| AbiError::decode(ty, "bad address length"))
        }
        AbiType::String => {
            let body = length_prefixed(ty, data)?;
            let text = std::str::from_utf8(body)
                .map_err(|e| AbiError::decode(ty, format!("invalid utf-8: {e}")))?;
            Ok(AbiValue::String(text.to_string()))
        }
        AbiType::StaticArray(elem, len) if **elem == AbiType::Byte => {
            expect_len(ty, data, *len)?;
            Ok(AbiValue::Bytes(data.to_vec()))
        }
        AbiType::DynamicArray(elem) if **elem == AbiType::Byte => {
            Ok(AbiValue::Bytes(length_prefixed(ty, data)?.to_vec()))
        }
        AbiType::StaticArray(_, len) => {
            decode_tuple(&ty.tuple_children(*len), data).map(AbiValue::Array)
        }
        AbiType::DynamicArray(_) => {
            let count = read_u16(ty, data, 0)?;
            let children = ty.tuple_children(count);
            decode_tuple(&children, &data[LENGTH_PREFIX_BYTES..]).map(AbiValue::Array)
        }
        AbiType::Tuple(elems) => decode_tuple(elems, data).map(AbiValue::Tuple),
    }
}

fn encode_checked(ty: &AbiType, value: &AbiValue) -> Result<Vec<u8>, AbiError> {
    match (ty, value) {
        (AbiType::Uint(bits) | AbiType::Ufixed { bits, .. }, AbiValue::Uint(v)) => {
            let mut buf = [0u8; 64];
            v.to_big_endian(&mut buf);
            Ok(buf[64 - usize::from(*bits) / 8..].to_vec())
        }
        (AbiType::Bool, AbiValue::Bool(b)) => Ok(vec![if *b { BOOL_TRUE } else { 0 }]),
        (AbiType::Byte, AbiValue::Byte(b)) => Ok(vec![*b]),
        (AbiType::Byte, AbiValue::Uint(v)) => Ok(vec![v.low_u64() as u8]),
        (AbiType::Address, AbiValue::Address(a)) => Ok(a.as_bytes().to_vec()),
        (AbiType::Address | AbiType::StaticArray(..), AbiValue::Bytes(b)) => Ok(b.clone()),
        (AbiType::String, AbiValue::String(s)) => Ok(with_length_prefix(s.len(), s.as_bytes())),
        (AbiType::DynamicArray(_), AbiValue::Bytes(b)) => Ok(with_length_prefix(b.len(), b)),
        (AbiType::StaticArray(_, len), AbiValue::Array(items)) => {
            encode_tuple(ty, &ty.tuple_children(*len), items)
        }
        (AbiType::DynamicArray(_), AbiValue::Array(items)) => {
            let body = encode_tuple(ty, &ty.tuple_children(items.len()), items)?;
            Ok(with_length_prefix(items.len(), &body))
        }
        (AbiType::Tuple(elems), AbiValue::Tuple(items)) => encode_tuple(ty, elems, items),
        (ty, value) => Err(AbiError::encode(ty, format!("got {}", value.kind()))),
    }
}

fn encode_tuple(
    parent: &AbiType,
    types: &[AbiType],
    values: &[AbiValue],
) -> Result<Vec<u8>, AbiError> {
    let mut heads: Vec<Vec<u8>> = Vec::with_capacity(types.len());
    let mut tails: Vec<Option<Vec<u8>>> = Vec::with_capacity(types.len());

    let mut i = 0;
    while i < types.len() {
        let ty = &types[i];
        if ty.is_dynamic() {
            heads.push(vec![0; LENGTH_PREFIX_BYTES]);
            tails.push(Some(encode_checked(ty, &values[i])?));
            i += 1;
        } else if *ty == AbiType::Bool {
            let run = bool_run(types, i).min(8);
            let mut packed = 0u8;
            for (bit, value) in values[i..i + run].iter().enumerate() {
                if let AbiValue::Bool(true) = value {
                    packed |= BOOL_TRUE >> bit;
                }
            }
            heads.push(vec![packed]);
            tails.push(None);
            i += run;
        } else {
            heads.push(encode_checked(ty, &values[i])?);
            tails.push(None);
            i += 1;
        }
    }

    let head_len: usize = heads.iter().map(Vec::len).sum();
    let mut offset = head_len;
    for (head, tail) in heads.iter_mut().zip(&tails) {
        if let Some(tail) = tail {
            let encoded = u16::try_from(offset).map_err(|_| {
                AbiError::encode(parent, format!("tail offset {offset} exceeds u16"))
            })?;
            head.copy_from_slice(&encoded.to_be_bytes());
            offset += tail.len();
        }
    }

    let mut out = Vec::with_capacity(offset);
    for head in &heads {
        out.extend_from_slice(head);
    }
    for tail in tails.into_iter().flatten() {
        out.extend_from_slice(&tail);
    }
    Ok(out)
}

fn decode_tuple(types: &[AbiType], data: &[u8]) -> Result<Vec<AbiValue>, AbiError> {
    let tuple_ty = AbiType::Tuple(types.to_vec());
    let mut values: Vec<Option<AbiValue>> = vec![None; types.len()];
    let mut dynamic: Vec<(usize, usize)> = Vec::new();

    let mut pos = 0;
    let mut i = 0;
    while i < types.len() {
        let ty = &types[i];
        if ty.is_dynamic() {
            dynamic.push((i, read_u16(&tuple_ty, data, pos)?));
            pos += LENGTH_PREFIX_BYTES;
            i += 1;
        } else if *ty == AbiType::Bool {
            let run = bool_run(types, i).min(8);
            let packed = *data
                .get(pos)
                .ok_or_else(|| AbiError::decode(&tuple_ty, "input too short for bool"))?;
            if packed & (0xFFu8.checked_shr(run as u32).unwrap_or(0)) != 0 {
                return Err(AbiError::decode(&tuple_ty, "non-zero padding bits after bools"));
            }
            for bit in 0..run {
                values[i + bit] = Some(AbiValue::Bool(packed & (BOOL_TRUE >> bit) != 0));
            }
            pos += 1;
            i += run;
        } else {
            let len = ty
                .static_len()
                .ok_or_else(|| AbiError::decode(ty, "expected static type"))?;
            let slice = data
                .get(pos..)
                .and_then(|rest| rest.get(..len))
                .ok_or_else(|| AbiError::decode(&tuple_ty, format!("input too short for {ty}")))?;
            values[i] = Some(decode(ty, slice)?);
            pos += len;
            i += 1;
        }
    }

    if dynamic.is_empty() {
        if pos != data.len() {
            return Err(AbiError::decode(
                &tuple_ty,
                format!("{} trailing bytes", data.len().saturating_sub(pos)),
            ));
        }
    } else {
        if dynamic[0].1 != pos {
            return Err(AbiError::decode(
                &tuple_ty,
                format!("first tail offset {} does not follow head of {pos} bytes", dynamic[0].1),
            ));
        }
        for (k, &(index, start)) in dynamic.iter().enumerate() {
            let end = dynamic.get(k + 1).map_or(data.len(), |&(_, next)| next);
            if end < start || end > data.len() {
                return Err(AbiError::decode(
                    &tuple_ty,
                    format!("tail offsets out of order ({start}..{end})"),
                ));
            }
            values[index] = Some(decode(&types[index], &data[start..end])?);
        }
    }

    values
        .into_iter()
        .map(|v| v.ok_or_else(|| AbiError::decode(&tuple_ty, "missing element")))
        .collect()
}

fn with_length_prefix(len: usize, body: &[u8]) -> Vec<u8> {
    // Lengths are bounded by `AbiType::check`.
    let mut out = Vec::with_capacity(LENGTH_PREFIX_BYTES + body.len());
    out.extend_from_slice(&(len as u16).to_be_bytes());
    out.extend_from_slice(body);
    out
}

fn length_prefixed<'a>(ty: &AbiType, data: &'a [u8]) -> Result<&'a [u8], AbiError> {
    let len = read_u16(ty, data, 0)?;
    let body = &data[LENGTH_PREFIX_BYTES..];
    if body.len() != len {
        return Err(AbiError::decode(
            ty,
            format!("length prefix {len} but {} bytes follow", body.len()),
        ));
    }
    Ok(body)
}

fn read_u16(ty: &AbiType, data: &[u8], pos: usize) -> Result<usize, AbiError> {
    data.get(pos..pos + LENGTH_PREFIX_BYTES)
        .map(|b| usize::from(u16::from_be_bytes([b[0], b[1]])))
        .ok_or_else(|| AbiError::decode(ty, "input too short for u16"))
}

fn expect_len(ty: &AbiType, data: &[u8], len: usize) -> Result<(), AbiError> {
    if data.len() == len {
        Ok(())
    } else {
        Err(AbiError::decode(
            ty,
            format!("expected {len} bytes, got {}", data.len()),
        ))
    }
}
