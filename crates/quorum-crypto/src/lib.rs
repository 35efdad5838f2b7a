//! Cryptographic primitives for quorum
//!
//! This crate derives multisig account identities and provides the key,
//! signature and signer types used when attaching signatures to extrinsics.
//! Ed25519 and ECDSA use the RustCrypto / dalek implementations; Sr25519 is
//! supported for addressing and wire encoding only.

pub mod keys;
pub mod multisig;
pub mod signature;
pub mod signer;

pub use keys::{KeyScheme, PrivateKey, PublicKey};
pub use multisig::{derive_multisig_account, derive_multisig_address, MULTISIG_PREFIX};
pub use signature::{sign_message, verify_account_signature, verify_signature, MultiSignature};
pub use signer::{LocalSigner, Signer};
