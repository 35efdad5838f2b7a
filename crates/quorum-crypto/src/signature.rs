//! Signature operations

use crate::keys::{KeyScheme, PrivateKey, PublicKey};
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey as EcdsaPubKey};
use parity_scale_codec::{Decode, Encode};
use quorum_errors::{Error, Result};
use quorum_types::{blake2_256, AccountId32};
use signature::{Signer as _, Verifier as _};
use std::fmt;

/// Signature tagged with its scheme, SCALE encoded as a `MultiSignature`
#[derive(Clone, PartialEq, Eq, Encode, Decode)]
pub enum MultiSignature {
    Ed25519([u8; 64]),
    Sr25519([u8; 64]),
    Ecdsa([u8; 65]),
}

impl MultiSignature {
    /// Wrap raw signature bytes, checking the scheme's length
    pub fn from_raw(scheme: KeyScheme, bytes: &[u8]) -> Result<Self> {
        let mismatch = || Error::SignatureLengthMismatch {
            scheme: scheme.to_string(),
            expected: scheme.signature_len(),
            actual: bytes.len(),
        };
        Ok(match scheme {
            KeyScheme::Ed25519 => MultiSignature::Ed25519(bytes.try_into().map_err(|_| mismatch())?),
            KeyScheme::Sr25519 => MultiSignature::Sr25519(bytes.try_into().map_err(|_| mismatch())?),
            KeyScheme::Ecdsa => MultiSignature::Ecdsa(bytes.try_into().map_err(|_| mismatch())?),
        })
    }

    pub fn scheme(&self) -> KeyScheme {
        match self {
            MultiSignature::Ed25519(_) => KeyScheme::Ed25519,
            MultiSignature::Sr25519(_) => KeyScheme::Sr25519,
            MultiSignature::Ecdsa(_) => KeyScheme::Ecdsa,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            MultiSignature::Ed25519(sig) | MultiSignature::Sr25519(sig) => sig.as_slice(),
            MultiSignature::Ecdsa(sig) => sig.as_slice(),
        }
    }
}

impl fmt::Debug for MultiSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{})", self.scheme(), hex::encode(self.as_bytes()))
    }
}

/// Sign a message with a private key
///
/// ECDSA signs the blake2_256 of the message and appends the recovery id.
pub fn sign_message(key: &PrivateKey, message: &[u8]) -> Result<MultiSignature> {
    match key {
        PrivateKey::Ed25519(k) => {
            let sig: ed25519_dalek::Signature = k.sign(message);
            Ok(MultiSignature::Ed25519(sig.to_bytes()))
        }
        PrivateKey::Ecdsa(k) => {
            let (sig, recovery_id) = k
                .sign_prehash_recoverable(&blake2_256(message))
                .map_err(|e| Error::SignatureInvalid(format!("ecdsa signing failed: {e}")))?;
            let mut bytes = [0u8; 65];
            bytes[..64].copy_from_slice(&sig.to_bytes());
            bytes[64] = recovery_id.to_byte();
            Ok(MultiSignature::Ecdsa(bytes))
        }
    }
}

/// Verify a signature with a public key
pub fn verify_signature(key: &PublicKey, message: &[u8], signature: &MultiSignature) -> Result<()> {
    match (key, signature) {
        (PublicKey::Ed25519(k), MultiSignature::Ed25519(bytes)) => {
            let sig = ed25519_dalek::Signature::from_bytes(bytes);
            k.verify(message, &sig)
                .map_err(|_| Error::SignatureInvalid(key.account_id().to_hex()))
        }
        (PublicKey::Ecdsa(k), MultiSignature::Ecdsa(bytes)) => {
            let recovered = recover_ecdsa(message, bytes)
                .map_err(|_| Error::SignatureInvalid(key.account_id().to_hex()))?;
            if &recovered == k {
                Ok(())
            } else {
                Err(Error::SignatureInvalid(key.account_id().to_hex()))
            }
        }
        (PublicKey::Sr25519(_), MultiSignature::Sr25519(_)) => Err(Error::UnsupportedScheme(
            "sr25519 verification".to_string(),
        )),
        (key, signature) => Err(Error::SignatureInvalid(format!(
            "{} signature for a {} key",
            signature.scheme(),
            key.scheme()
        ))),
    }
}

/// Verify a signature against the account id that produced it
///
/// Ed25519 account ids are the public key. ECDSA keys are recovered from the
/// signature and matched by their blake2_256 account id.
pub fn verify_account_signature(
    account: &AccountId32,
    message: &[u8],
    signature: &MultiSignature,
) -> Result<()> {
    match signature {
        MultiSignature::Ed25519(_) => {
            let key = PublicKey::from_bytes(KeyScheme::Ed25519, account.as_bytes())?;
            verify_signature(&key, message, signature)
        }
        MultiSignature::Ecdsa(bytes) => {
            let recovered = recover_ecdsa(message, bytes)
                .map_err(|_| Error::SignatureInvalid(account.to_hex()))?;
            if PublicKey::Ecdsa(recovered).account_id() == *account {
                Ok(())
            } else {
                Err(Error::SignatureInvalid(account.to_hex()))
            }
        }
        MultiSignature::Sr25519(_) => Err(Error::UnsupportedScheme(
            "sr25519 verification".to_string(),
        )),
    }
}

fn recover_ecdsa(message: &[u8], bytes: &[u8; 65]) -> Result<EcdsaPubKey> {
    let sig = EcdsaSignature::from_slice(&bytes[..64])
        .map_err(|e| Error::SignatureInvalid(format!("ecdsa signature: {e}")))?;
    let recovery_id = RecoveryId::from_byte(bytes[64])
        .ok_or_else(|| Error::SignatureInvalid(format!("ecdsa recovery id {}", bytes[64])))?;
    EcdsaPubKey::recover_from_prehash(&blake2_256(message), &sig, recovery_id)
        .map_err(|e| Error::SignatureInvalid(format!("ecdsa recovery: {e}")))
}
