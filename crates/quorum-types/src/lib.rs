//! Core types for quorum
//!
//! This crate provides the fundamental chain-facing data structures used by
//! the rest of the workspace: account identities and their SS58 form,
//! hashes, transaction eras, multisig timepoints and configuration.

pub mod address;
pub mod config;
pub mod era;
pub mod hashing;
pub mod multisig;

pub use address::{decode_address, encode_address, sort_addresses, AccountId32, MultiAddress};
pub use config::{ChainConfig, ClientConfig, Config, ConfigError, MultisigConfig};
pub use era::Era;
pub use hashing::{blake2_256, blake2_512, H256};
pub use multisig::{describe_timepoint, PendingMultisigCall, Timepoint};

/// SS58 format of the Polkadot relay chain
pub const POLKADOT_SS58_FORMAT: u16 = 0;

/// SS58 format of Kusama
pub const KUSAMA_SS58_FORMAT: u16 = 2;

/// Generic Substrate SS58 format
pub const SUBSTRATE_SS58_FORMAT: u16 = 42;
