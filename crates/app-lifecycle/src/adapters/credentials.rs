//! # Static Credentials
//!
//! Key material handed over at construction, with an optional check that it
//! derives the account the caller expects.

use crate::domain::signer::Account;
use crate::errors::CredentialError;
use crate::ports::outbound::CredentialSource;
use shared_types::Address;
use zeroize::Zeroizing;

/// A fixed secret seed.
pub struct StaticCredentials {
    seed: Zeroizing<[u8; 32]>,
    expected: Option<Address>,
}

impl StaticCredentials {
    /// Seed plus the address it must derive, if known.
    #[must_use]
    pub fn new(seed: [u8; 32], expected: Option<Address>) -> Self {
        Self {
            seed: Zeroizing::new(seed),
            expected,
        }
    }

    /// Hex-encoded seed and optional address text.
    pub fn from_hex(seed_hex: &str, expected: Option<&str>) -> Result<Self, CredentialError> {
        let raw = Zeroizing::new(
            hex::decode(seed_hex.trim()).map_err(|e| CredentialError::InvalidKey(e.to_string()))?,
        );
        let seed = <[u8; 32]>::try_from(raw.as_slice()).map_err(|_| {
            CredentialError::InvalidKey(format!("seed is {} bytes, need 32", raw.len()))
        })?;
        let expected = expected
            .map(|text| {
                text.parse::<Address>()
                    .map_err(|e| CredentialError::InvalidKey(format!("expected address: {e}")))
            })
            .transpose()?;
        Ok(Self::new(seed, expected))
    }
}

impl CredentialSource for StaticCredentials {
    fn load(&self) -> Result<Account, CredentialError> {
        let account = Account::from_seed(&self.seed);
        match self.expected {
            Some(expected) if expected != account.address() => {
                Err(CredentialError::AddressMismatch {
                    expected,
                    derived: account.address(),
                })
            }
            _ => Ok(account),
        }
    }
}
