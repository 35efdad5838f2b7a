//! Client library for building and tracking multisig extrinsics.
//!
//! This crate assembles unsigned extrinsics, derives the exact bytes a signer
//! must sign, reattaches signatures, and mirrors the approval state of a
//! pending multisig call locally. Chain data is obtained through the
//! [`Transport`] collaborator; everything else is offline computation.

pub mod extrinsic;
pub mod multisig;
pub mod signing;
pub mod transport;
pub mod tx_builder;

pub use extrinsic::{decode_extrinsic, DecodedExtrinsic, ExtrinsicSignature, SignedExtrinsic};
pub use multisig::{
    Cancellation, ExecutedCall, MultisigState, MultisigTracker, NextAction, SubmitOutcome,
};
pub use signing::{
    attach_signature, compute_tx_hash, decode_signing_payload, sign_extrinsic,
    to_signing_payload, verify_signed, DecodedPayload, SigningConfig,
};
pub use transport::{next_nonce, submit_extrinsic, ChainInfo, HttpTransport, RuntimeVersion, Transport};
pub use tx_builder::{
    build_approve_as_multi, build_cancel_as_multi, build_multisig_call, build_unsigned,
    other_signatories, ExtrinsicBuilder, TxMeta, UnsignedExtrinsic,
};

use thiserror::Error;

/// Client error types
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request error
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("json parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// RPC error
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(#[from] quorum_types::ConfigError),

    /// Local validation failure
    #[error(transparent)]
    Core(#[from] quorum_errors::Error),
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
