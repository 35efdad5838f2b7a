//! Key representations using static enum dispatch

use ed25519_dalek::{SigningKey as Ed25519PrivKey, VerifyingKey as Ed25519PubKey};
use k256::ecdsa::{SigningKey as EcdsaPrivKey, VerifyingKey as EcdsaPubKey};
use quorum_errors::{Error, Result};
use quorum_types::{blake2_256, encode_address, AccountId32};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Signature scheme, in `MultiSignature` variant order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyScheme {
    Ed25519,
    Sr25519,
    Ecdsa,
}

impl KeyScheme {
    /// Byte length of a signature in this scheme
    pub fn signature_len(&self) -> usize {
        match self {
            KeyScheme::Ed25519 | KeyScheme::Sr25519 => 64,
            KeyScheme::Ecdsa => 65,
        }
    }

    /// Byte length of a public key in this scheme
    pub fn public_key_len(&self) -> usize {
        match self {
            KeyScheme::Ed25519 | KeyScheme::Sr25519 => 32,
            KeyScheme::Ecdsa => 33,
        }
    }

    /// `MultiSignature` discriminant
    pub fn variant_index(&self) -> u8 {
        match self {
            KeyScheme::Ed25519 => 0,
            KeyScheme::Sr25519 => 1,
            KeyScheme::Ecdsa => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            KeyScheme::Ed25519 => "ed25519",
            KeyScheme::Sr25519 => "sr25519",
            KeyScheme::Ecdsa => "ecdsa",
        }
    }
}

impl fmt::Display for KeyScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KeyScheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ed25519" => Ok(KeyScheme::Ed25519),
            "sr25519" => Ok(KeyScheme::Sr25519),
            "ecdsa" | "secp256k1" => Ok(KeyScheme::Ecdsa),
            other => Err(Error::UnsupportedScheme(other.to_string())),
        }
    }
}

/// All supported public key types
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicKey {
    Ed25519(Ed25519PubKey),
    /// Raw ristretto point; only used for addressing
    Sr25519([u8; 32]),
    Ecdsa(EcdsaPubKey),
}

impl PublicKey {
    pub fn scheme(&self) -> KeyScheme {
        match self {
            PublicKey::Ed25519(_) => KeyScheme::Ed25519,
            PublicKey::Sr25519(_) => KeyScheme::Sr25519,
            PublicKey::Ecdsa(_) => KeyScheme::Ecdsa,
        }
    }

    /// Raw key bytes; compressed SEC1 for ECDSA
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            PublicKey::Ed25519(key) => key.as_bytes().to_vec(),
            PublicKey::Sr25519(key) => key.to_vec(),
            PublicKey::Ecdsa(key) => key.to_encoded_point(true).as_bytes().to_vec(),
        }
    }

    pub fn from_bytes(scheme: KeyScheme, bytes: &[u8]) -> Result<Self> {
        let invalid = |reason: String| Error::UnknownSigner(format!("{scheme} public key: {reason}"));
        match scheme {
            KeyScheme::Ed25519 => {
                let arr: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| invalid(format!("expected 32 bytes, got {}", bytes.len())))?;
                let key = Ed25519PubKey::from_bytes(&arr).map_err(|e| invalid(e.to_string()))?;
                Ok(PublicKey::Ed25519(key))
            }
            KeyScheme::Sr25519 => {
                let arr: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| invalid(format!("expected 32 bytes, got {}", bytes.len())))?;
                Ok(PublicKey::Sr25519(arr))
            }
            KeyScheme::Ecdsa => {
                let key = EcdsaPubKey::from_sec1_bytes(bytes).map_err(|e| invalid(e.to_string()))?;
                Ok(PublicKey::Ecdsa(key))
            }
        }
    }

    /// Account id the chain associates with this key
    pub fn account_id(&self) -> AccountId32 {
        match self {
            PublicKey::Ed25519(key) => AccountId32::new(key.to_bytes()),
            PublicKey::Sr25519(key) => AccountId32::new(*key),
            PublicKey::Ecdsa(_) => AccountId32::new(blake2_256(&self.to_bytes())),
        }
    }

    pub fn to_ss58(&self, format: u16) -> String {
        encode_address(&self.account_id(), format)
    }
}

/// All supported private key types
#[derive(Clone)]
pub enum PrivateKey {
    Ed25519(Ed25519PrivKey),
    Ecdsa(EcdsaPrivKey),
}

impl PrivateKey {
    /// Build from a 32-byte secret seed
    pub fn from_seed(scheme: KeyScheme, seed: &[u8; 32]) -> Result<Self> {
        match scheme {
            KeyScheme::Ed25519 => Ok(PrivateKey::Ed25519(Ed25519PrivKey::from_bytes(seed))),
            KeyScheme::Ecdsa => EcdsaPrivKey::from_slice(seed)
                .map(PrivateKey::Ecdsa)
                .map_err(|e| Error::UnknownSigner(format!("ecdsa secret: {e}"))),
            KeyScheme::Sr25519 => Err(Error::UnsupportedScheme(
                "sr25519 signing keys".to_string(),
            )),
        }
    }

    /// Parse a hex seed, with or without `0x`
    pub fn from_hex(scheme: KeyScheme, seed: &str) -> Result<Self> {
        let bytes = hex::decode(seed.trim().trim_start_matches("0x"))
            .map_err(|e| Error::UnknownSigner(format!("secret seed: {e}")))?;
        let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            Error::UnknownSigner(format!("secret seed must be 32 bytes, got {}", bytes.len()))
        })?;
        Self::from_seed(scheme, &seed)
    }

    /// Fresh random key
    pub fn generate(scheme: KeyScheme) -> Result<Self> {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::from_seed(scheme, &seed)
    }

    pub fn scheme(&self) -> KeyScheme {
        match self {
            PrivateKey::Ed25519(_) => KeyScheme::Ed25519,
            PrivateKey::Ecdsa(_) => KeyScheme::Ecdsa,
        }
    }

    /// Get the corresponding public key
    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::Ed25519(key) => PublicKey::Ed25519(key.verifying_key()),
            PrivateKey::Ecdsa(key) => PublicKey::Ecdsa(*key.verifying_key()),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({}, {})", self.scheme(), self.public_key().account_id().to_hex())
    }
}

// Custom serialization for PublicKey
impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        #[derive(Serialize)]
        struct PublicKeyData {
            #[serde(rename = "type")]
            key_type: KeyScheme,
            value: String,
        }

        let data = PublicKeyData {
            key_type: self.scheme(),
            value: format!("0x{}", hex::encode(self.to_bytes())),
        };

        data.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct PublicKeyData {
            #[serde(rename = "type")]
            key_type: KeyScheme,
            value: String,
        }

        let data = PublicKeyData::deserialize(deserializer)?;
        let bytes =
            hex::decode(data.value.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;

        PublicKey::from_bytes(data.key_type, &bytes).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ed25519_account_is_public_key() {
        let key = PrivateKey::from_seed(KeyScheme::Ed25519, &[1u8; 32]).unwrap();
        let public = key.public_key();
        assert_eq!(public.account_id().as_bytes().to_vec(), public.to_bytes());
    }

    #[test]
    fn test_ecdsa_account_is_hashed() {
        let key = PrivateKey::from_seed(KeyScheme::Ecdsa, &[2u8; 32]).unwrap();
        let public = key.public_key();
        assert_eq!(public.to_bytes().len(), 33);
        assert_eq!(
            public.account_id(),
            AccountId32::new(blake2_256(&public.to_bytes()))
        );
    }

    #[test]
    fn test_sr25519_has_no_private_key() {
        assert!(matches!(
            PrivateKey::from_seed(KeyScheme::Sr25519, &[3u8; 32]),
            Err(Error::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_from_hex_seed_length() {
        assert!(PrivateKey::from_hex(KeyScheme::Ed25519, "0x0102").is_err());
        let seed = format!("0x{}", "ab".repeat(32));
        assert!(PrivateKey::from_hex(KeyScheme::Ed25519, &seed).is_ok());
    }

    #[test]
    fn test_public_key_serde() {
        let key = PrivateKey::generate(KeyScheme::Ecdsa).unwrap().public_key();
        let json = serde_json::to_string(&key).unwrap();
        assert!(json.contains("\"type\":\"ecdsa\""));
        let back: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_public_key_wrong_length() {
        assert!(matches!(
            PublicKey::from_bytes(KeyScheme::Sr25519, &[0u8; 31]),
            Err(Error::UnknownSigner(_))
        ));
    }

    #[test]
    fn test_scheme_parsing() {
        assert_eq!("Ed25519".parse::<KeyScheme>().unwrap(), KeyScheme::Ed25519);
        assert_eq!("secp256k1".parse::<KeyScheme>().unwrap(), KeyScheme::Ecdsa);
        assert!("bls".parse::<KeyScheme>().is_err());
    }
}
