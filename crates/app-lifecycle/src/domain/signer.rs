//! # Signer
//!
//! Ed25519 signatures over `"TX" || canonical bytes`. Ed25519 nonces are
//! derived from the message, so signing the same envelope twice yields the
//! same signature.

use crate::domain::encoding;
use crate::domain::entities::{SignedEnvelope, TransactionEnvelope};
use crate::errors::SignerError;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use shared_types::{Address, TransactionId};
use std::fmt;
use zeroize::Zeroizing;

/// A signing account: secret key plus the address derived from it.
pub struct Account {
    signing_key: SigningKey,
    address: Address,
}

impl Account {
    /// Random account.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_key(SigningKey::generate(&mut rand::thread_rng()))
    }

    /// Account from a 32-byte secret seed.
    #[must_use]
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::from_key(SigningKey::from_bytes(seed))
    }

    fn from_key(signing_key: SigningKey) -> Self {
        let address = Address(signing_key.verifying_key().to_bytes());
        Self {
            signing_key,
            address,
        }
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Secret seed, wiped when the returned buffer drops.
    #[must_use]
    pub fn seed(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signing_key.to_bytes())
    }

    fn sign_bytes(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Signs `envelope` with `account`.
///
/// The account must be the envelope's sender.
pub fn sign(
    envelope: &TransactionEnvelope,
    account: &Account,
) -> Result<(TransactionId, SignedEnvelope), SignerError> {
    if envelope.sender() != account.address() {
        return Err(SignerError::KeyMismatch {
            expected: envelope.sender(),
            actual: account.address(),
        });
    }
    let id = envelope.id();
    let signature = account.sign_bytes(&encoding::signing_bytes(envelope));
    Ok((
        id,
        SignedEnvelope {
            envelope: envelope.clone(),
            signature,
            id,
        },
    ))
}

/// Checks the signature against the sender's public key.
pub fn verify(signed: &SignedEnvelope) -> Result<(), SignerError> {
    let invalid = || SignerError::InvalidSignature(signed.id);
    let key = VerifyingKey::from_bytes(signed.envelope.sender().as_bytes()).map_err(|_| invalid())?;
    key.verify(
        &encoding::signing_bytes(&signed.envelope),
        &Signature::from_bytes(&signed.signature),
    )
    .map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{AppCallFields, TransactionBody, TransactionHeader};

    fn envelope_for(sender: Address) -> TransactionEnvelope {
        TransactionEnvelope {
            header: TransactionHeader {
                sender,
                fee: 1000,
                first_valid: 1,
                last_valid: 100,
                ..TransactionHeader::default()
            },
            body: TransactionBody::ApplicationCall(AppCallFields {
                app_id: 9.into(),
                ..AppCallFields::default()
            }),
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let account = Account::from_seed(&[11u8; 32]);
        let tx = envelope_for(account.address());
        let (id, signed) = sign(&tx, &account).unwrap();
        assert_eq!(id, tx.id());
        assert_eq!(signed.id, id);
        assert!(verify(&signed).is_ok());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let account = Account::from_seed(&[11u8; 32]);
        let tx = envelope_for(account.address());
        let (_, a) = sign(&tx, &account).unwrap();
        let (_, b) = sign(&tx, &account).unwrap();
        assert_eq!(a.signature, b.signature);
    }

    #[test]
    fn test_key_mismatch() {
        let account = Account::generate();
        let other = Account::generate();
        let tx = envelope_for(other.address());
        let err = sign(&tx, &account).unwrap_err();
        assert_eq!(
            err,
            SignerError::KeyMismatch {
                expected: other.address(),
                actual: account.address(),
            }
        );
    }

    #[test]
    fn test_tampered_envelope_fails_verification() {
        let account = Account::generate();
        let (_, mut signed) = sign(&envelope_for(account.address()), &account).unwrap();
        signed.envelope.header.fee = 2000;
        assert!(matches!(
            verify(&signed),
            Err(SignerError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_seed_round_trip() {
        let account = Account::generate();
        let again = Account::from_seed(&account.seed());
        assert_eq!(account.address(), again.address());
        assert!(format!("{account:?}").contains("address"));
    }
}
