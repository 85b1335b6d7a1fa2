//! # Core Identifiers
//!
//! ## Clusters
//!
//! - **Accounts**: `Address` (Ed25519 public key with checksummed text form)
//! - **Transactions**: `TransactionId`
//! - **Applications**: `ApplicationId`, `AssetId`

use crate::errors::EncodingError;
use crate::hashing::{hash_with_prefix, sha512_256, Digest, APP_ID_PREFIX};
use data_encoding::BASE32_NOPAD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length of the address checksum appended before base32 encoding.
pub const CHECKSUM_LEN: usize = 4;

/// Length of an address in its text form.
pub const ADDRESS_TEXT_LEN: usize = 58;

// =============================================================================
// ADDRESS
// =============================================================================

/// A 32-byte account address (the account's Ed25519 public key).
///
/// The text form is `base32(public_key || checksum)` without padding, where the
/// checksum is the last four bytes of `SHA-512/256(public_key)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// The zero address.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Creates an address from a 32-byte public key.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Creates an address from a slice. Returns None if wrong length.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; 32]>::try_from(slice).ok().map(Self)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns true if this is the zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        let digest = sha512_256(&self.0);
        let mut out = [0u8; CHECKSUM_LEN];
        out.copy_from_slice(&digest.0[32 - CHECKSUM_LEN..]);
        out
    }

    /// Renders the checksummed base32 text form.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut raw = Vec::with_capacity(32 + CHECKSUM_LEN);
        raw.extend_from_slice(&self.0);
        raw.extend_from_slice(&self.checksum());
        BASE32_NOPAD.encode(&raw)
    }
}

impl FromStr for Address {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = BASE32_NOPAD
            .decode(s.as_bytes())
            .map_err(|e| EncodingError::InvalidBase32(e.to_string()))?;
        if raw.len() != 32 + CHECKSUM_LEN {
            return Err(EncodingError::InvalidLength {
                expected: 32 + CHECKSUM_LEN,
                actual: raw.len(),
            });
        }
        let address = Self::from_slice(&raw[..32]).ok_or(EncodingError::InvalidLength {
            expected: 32,
            actual: raw.len(),
        })?;
        if raw[32..] != address.checksum() {
            return Err(EncodingError::ChecksumMismatch);
        }
        Ok(address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.encode())
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<Address> for [u8; 32] {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// TRANSACTION ID
// =============================================================================

/// Content-derived transaction identifier: `SHA-512/256("TX" || txn)`.
///
/// Rendered as 52 characters of unpadded base32.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct TransactionId(pub Digest);

impl TransactionId {
    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl FromStr for TransactionId {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = BASE32_NOPAD
            .decode(s.as_bytes())
            .map_err(|e| EncodingError::InvalidBase32(e.to_string()))?;
        Digest::from_slice(&raw)
            .map(Self)
            .ok_or(EncodingError::InvalidLength {
                expected: 32,
                actual: raw.len(),
            })
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&BASE32_NOPAD.encode(self.0.as_bytes()))
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({self})")
    }
}

impl From<Digest> for TransactionId {
    fn from(digest: Digest) -> Self {
        Self(digest)
    }
}

impl Serialize for TransactionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TransactionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// APPLICATION / ASSET IDS
// =============================================================================

/// Identifier of a deployed application.
///
/// Zero only ever appears inside a create transaction; the network assigns
/// the real id on confirmation.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Debug, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ApplicationId(pub u64);

impl ApplicationId {
    /// Placeholder id carried by create transactions.
    pub const NONE: Self = Self(0);

    /// Returns true for the create placeholder.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// Escrow address controlled by the application: `SHA-512/256("appID" || be64(id))`.
    #[must_use]
    pub fn address(&self) -> Address {
        Address(hash_with_prefix(APP_ID_PREFIX, &self.0.to_be_bytes()).0)
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ApplicationId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Identifier of an asset.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Debug, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AssetId(pub u64);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AssetId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A network round number.
pub type Round = u64;

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO_ADDRESS_TEXT: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ";

    #[test]
    fn test_zero_address_text_form() {
        assert_eq!(Address::ZERO.to_string(), ZERO_ADDRESS_TEXT);
        assert_eq!(Address::ZERO.to_string().len(), ADDRESS_TEXT_LEN);
    }

    #[test]
    fn test_address_round_trip() {
        let address = Address::new([0x5A; 32]);
        let text = address.to_string();
        assert_eq!(text.len(), ADDRESS_TEXT_LEN);
        assert_eq!(text.parse::<Address>().unwrap(), address);
    }

    #[test]
    fn test_address_checksum_rejected() {
        let mut text = Address::new([9u8; 32]).to_string();
        // Flip the final character to corrupt the checksum.
        let last = text.pop().unwrap();
        text.push(if last == 'A' { 'B' } else { 'A' });
        assert!(text.parse::<Address>().is_err());
    }

    #[test]
    fn test_address_wrong_length_rejected() {
        let err = "AAAA".parse::<Address>().unwrap_err();
        assert!(matches!(
            err,
            EncodingError::InvalidLength { .. } | EncodingError::InvalidBase32(_)
        ));
    }

    #[test]
    fn test_address_serde_as_string() {
        let json = serde_json::to_string(&Address::ZERO).unwrap();
        assert_eq!(json, format!("\"{ZERO_ADDRESS_TEXT}\""));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Address::ZERO);
    }

    #[test]
    fn test_transaction_id_text_form() {
        let id = TransactionId(Digest::new([0xAB; 32]));
        let text = id.to_string();
        assert_eq!(text.len(), 52);
        assert_eq!(text.parse::<TransactionId>().unwrap(), id);
    }

    #[test]
    fn test_application_address_is_stable() {
        let app = ApplicationId(721_920_807);
        assert_eq!(app.address(), app.address());
        assert_ne!(app.address(), ApplicationId(1).address());
        assert!(ApplicationId::NONE.is_none());
    }
}
