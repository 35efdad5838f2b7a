//! Signer capability

use crate::keys::{PrivateKey, PublicKey};
use crate::signature::{sign_message, MultiSignature};
use quorum_errors::Result;
use quorum_types::AccountId32;

/// Anything that can sign a payload on behalf of one account
///
/// Hardware wallets, remote keystores and local keys all fit behind this
/// trait; the transaction pipeline only ever sees these three methods.
pub trait Signer: Send + Sync {
    fn public_key(&self) -> PublicKey;

    fn sign(&self, payload: &[u8]) -> Result<MultiSignature>;

    fn account_id(&self) -> AccountId32 {
        self.public_key().account_id()
    }

    fn address(&self, ss58_format: u16) -> String {
        self.public_key().to_ss58(ss58_format)
    }
}

/// Signer backed by an in-memory private key
#[derive(Clone, Debug)]
pub struct LocalSigner {
    key: PrivateKey,
}

impl LocalSigner {
    pub fn new(key: PrivateKey) -> Self {
        Self { key }
    }
}

impl From<PrivateKey> for LocalSigner {
    fn from(key: PrivateKey) -> Self {
        Self::new(key)
    }
}

impl Signer for LocalSigner {
    fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }

    fn sign(&self, payload: &[u8]) -> Result<MultiSignature> {
        sign_message(&self.key, payload)
    }
}
