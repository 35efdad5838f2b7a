//! Error handling types for the quorum multisig transaction engine.
//!
//! Every failure is a local validation failure reported synchronously to the
//! caller. Nothing here is retried internally; [`Error::requires_refresh`]
//! tells an orchestrator when re-reading chain state is the right reaction.

use thiserror::Error;

/// Core error type shared by all quorum crates
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Threshold outside `2..=signatories`
    #[error("invalid threshold:: {threshold} for {signatories} signatories")]
    InvalidThreshold { threshold: usize, signatories: usize },

    /// The same signatory appears twice in a signer set
    #[error("duplicate signatory:: {0}")]
    DuplicateSignatory(String),

    /// Call tag or argument shape not described by the schema
    #[error("schema mismatch:: {0}")]
    SchemaMismatch(String),

    /// Fewer bytes than the layout demands
    #[error("truncated input:: {context} needs {needed} bytes, {remaining} remaining")]
    TruncatedInput {
        context: String,
        needed: usize,
        remaining: usize,
    },

    /// Bytes left over after a complete decode
    #[error("trailing input:: {remaining} bytes left after {context}")]
    TrailingInput { context: String, remaining: usize },

    /// Malformed discriminant, compact integer or version byte
    #[error("invalid encoding:: {0}")]
    InvalidEncoding(String),

    /// `other_signatories` not strictly ascending by account bytes
    #[error("unsorted signatories:: {current} at position {position} does not sort after {previous}")]
    UnsortedSignatories {
        position: usize,
        previous: String,
        current: String,
    },

    /// Signature byte length does not match its scheme
    #[error("signature length mismatch:: {scheme} expects {expected} bytes, got {actual}")]
    SignatureLengthMismatch {
        scheme: String,
        expected: usize,
        actual: usize,
    },

    /// Address or public key that cannot be resolved to a signer identity
    #[error("unknown signer:: {0}")]
    UnknownSigner(String),

    /// Signer already present in the approvals of a pending call
    #[error("signer already approved:: {0}")]
    SignerAlreadyApproved(String),

    /// Inner call hash differs from the tracked one
    #[error("call hash mismatch:: expected {expected}, got {actual}")]
    CallHashMismatch { expected: String, actual: String },

    /// Timepoint differs from the one recorded for the pending call
    #[error("timepoint mismatch:: expected {expected}, got {actual}")]
    TimepointMismatch { expected: String, actual: String },

    /// Only the depositor may cancel a pending call
    #[error("not depositor:: {signer} cannot cancel a call deposited by {depositor}")]
    NotDepositor { signer: String, depositor: String },

    /// SS58 string or raw account bytes that fail to decode
    #[error("invalid address:: {0}")]
    InvalidAddress(String),

    /// Era period or phase out of range
    #[error("invalid era:: {0}")]
    InvalidEra(String),

    /// A required builder input was never supplied
    #[error("missing field:: {0}")]
    MissingField(String),

    /// Signature scheme without a local implementation for the operation
    #[error("unsupported scheme:: {0}")]
    UnsupportedScheme(String),

    /// Signature does not verify against the signing payload
    #[error("signature invalid:: {0}")]
    SignatureInvalid(String),
}

/// Result type alias for quorum operations
pub type Result<T> = std::result::Result<T, Error>;

/// Stable numeric codes for each error kind
pub mod codes {
    pub const INVALID_THRESHOLD: u32 = 1;
    pub const DUPLICATE_SIGNATORY: u32 = 2;
    pub const SCHEMA_MISMATCH: u32 = 3;
    pub const TRUNCATED_INPUT: u32 = 4;
    pub const TRAILING_INPUT: u32 = 5;
    pub const INVALID_ENCODING: u32 = 6;
    pub const UNSORTED_SIGNATORIES: u32 = 7;
    pub const SIGNATURE_LENGTH_MISMATCH: u32 = 8;
    pub const UNKNOWN_SIGNER: u32 = 9;
    pub const SIGNER_ALREADY_APPROVED: u32 = 10;
    pub const CALL_HASH_MISMATCH: u32 = 11;
    pub const TIMEPOINT_MISMATCH: u32 = 12;
    pub const NOT_DEPOSITOR: u32 = 13;
    pub const INVALID_ADDRESS: u32 = 14;
    pub const INVALID_ERA: u32 = 15;
    pub const MISSING_FIELD: u32 = 16;
    pub const UNSUPPORTED_SCHEME: u32 = 17;
    pub const SIGNATURE_INVALID: u32 = 18;
}

impl Error {
    /// Numeric code of this error kind
    pub fn code(&self) -> u32 {
        match self {
            Error::InvalidThreshold { .. } => codes::INVALID_THRESHOLD,
            Error::DuplicateSignatory(_) => codes::DUPLICATE_SIGNATORY,
            Error::SchemaMismatch(_) => codes::SCHEMA_MISMATCH,
            Error::TruncatedInput { .. } => codes::TRUNCATED_INPUT,
            Error::TrailingInput { .. } => codes::TRAILING_INPUT,
            Error::InvalidEncoding(_) => codes::INVALID_ENCODING,
            Error::UnsortedSignatories { .. } => codes::UNSORTED_SIGNATORIES,
            Error::SignatureLengthMismatch { .. } => codes::SIGNATURE_LENGTH_MISMATCH,
            Error::UnknownSigner(_) => codes::UNKNOWN_SIGNER,
            Error::SignerAlreadyApproved(_) => codes::SIGNER_ALREADY_APPROVED,
            Error::CallHashMismatch { .. } => codes::CALL_HASH_MISMATCH,
            Error::TimepointMismatch { .. } => codes::TIMEPOINT_MISMATCH,
            Error::NotDepositor { .. } => codes::NOT_DEPOSITOR,
            Error::InvalidAddress(_) => codes::INVALID_ADDRESS,
            Error::InvalidEra(_) => codes::INVALID_ERA,
            Error::MissingField(_) => codes::MISSING_FIELD,
            Error::UnsupportedScheme(_) => codes::UNSUPPORTED_SCHEME,
            Error::SignatureInvalid(_) => codes::SIGNATURE_INVALID,
        }
    }

    /// Whether local multisig state is stale and should be re-read from the
    /// chain before the caller gives up
    pub fn requires_refresh(&self) -> bool {
        matches!(self, Error::TimepointMismatch { .. })
    }

    /// Shorthand for a truncation failure
    pub fn truncated(context: impl Into<String>, needed: usize, remaining: usize) -> Self {
        Error::TruncatedInput {
            context: context.into(),
            needed,
            remaining,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CallHashMismatch {
            expected: "0x01".to_string(),
            actual: "0x02".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "call hash mismatch:: expected 0x01, got 0x02"
        );
    }

    #[test]
    fn test_only_timepoint_mismatch_requires_refresh() {
        let stale = Error::TimepointMismatch {
            expected: "100-1".to_string(),
            actual: "99-1".to_string(),
        };
        assert!(stale.requires_refresh());
        assert!(!Error::SchemaMismatch("x".to_string()).requires_refresh());
        assert!(!Error::truncated("call", 2, 1).requires_refresh());
    }

    #[test]
    fn test_codes_are_distinct() {
        let errors = vec![
            Error::InvalidThreshold {
                threshold: 1,
                signatories: 3,
            },
            Error::SchemaMismatch(String::new()),
            Error::truncated("x", 1, 0),
            Error::UnknownSigner(String::new()),
            Error::SignerAlreadyApproved(String::new()),
            Error::MissingField(String::new()),
        ];
        let mut codes: Vec<u32> = errors.iter().map(Error::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
