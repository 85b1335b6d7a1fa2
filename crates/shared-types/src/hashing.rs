//! # Hashing
//!
//! Every identifier on the network is a SHA-512/256 digest over a
//! domain-separated message: a short ASCII prefix followed by the payload.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha512_256};
use std::fmt;

/// Prefix for transaction identifiers and signing payloads.
pub const TX_PREFIX: &[u8] = b"TX";

/// Prefix for atomic group identifiers.
pub const TX_GROUP_PREFIX: &[u8] = b"TG";

/// Prefix for application escrow addresses.
pub const APP_ID_PREFIX: &[u8] = b"appID";

/// Prefix for compiled program hashes (logic-signature addresses).
pub const PROGRAM_PREFIX: &[u8] = b"Program";

/// A 32-byte SHA-512/256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// The all-zero digest.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Creates a digest from a 32-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Creates a digest from a slice. Returns None if wrong length.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; 32]>::try_from(slice).ok().map(Self)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns true if this is the zero digest.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 32]> for Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Plain SHA-512/256.
#[must_use]
pub fn sha512_256(data: &[u8]) -> Digest {
    let mut hasher = Sha512_256::new();
    hasher.update(data);
    Digest(hasher.finalize().into())
}

/// SHA-512/256 over `prefix || data`.
#[must_use]
pub fn hash_with_prefix(prefix: &[u8], data: &[u8]) -> Digest {
    let mut hasher = Sha512_256::new();
    hasher.update(prefix);
    hasher.update(data);
    Digest(hasher.finalize().into())
}
