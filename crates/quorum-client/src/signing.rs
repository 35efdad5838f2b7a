//! Signing payload derivation and signature attachment

use crate::extrinsic::{decode_era, decode_nonce, encode_signed, SignedExtrinsic};
use crate::tx_builder::{TxMeta, UnsignedExtrinsic};
use parity_scale_codec::{Compact, Encode};
use quorum_codec::{CallCodec, OpaqueCall, Reader, Schema};
use quorum_crypto::{verify_account_signature, KeyScheme, MultiSignature, Signer};
use quorum_errors::{Error, Result};
use quorum_log::{debug, info};
use quorum_types::{blake2_256, decode_address, Era, H256};
use serde::{Deserialize, Serialize};

/// Payloads longer than this are signed by hash
pub const DEFAULT_PAYLOAD_HASH_THRESHOLD: usize = 256;

/// Transaction signing configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningConfig {
    /// Whether to verify signatures when attaching them
    pub verify_signatures: bool,
    /// Signing payloads longer than this many bytes are replaced by their hash
    pub payload_hash_threshold: usize,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            verify_signatures: true,
            payload_hash_threshold: DEFAULT_PAYLOAD_HASH_THRESHOLD,
        }
    }
}

impl SigningConfig {
    pub fn from_chain_config(chain: &quorum_types::ChainConfig) -> Self {
        Self {
            payload_hash_threshold: chain.payload_hash_threshold,
            ..Self::default()
        }
    }
}

fn encode_payload(call_data: &[u8], meta: &TxMeta) -> Vec<u8> {
    let mut payload = Vec::with_capacity(call_data.len() + 100);
    payload.extend_from_slice(call_data);
    meta.era.encode_to(&mut payload);
    Compact(meta.nonce).encode_to(&mut payload);
    Compact(meta.tip).encode_to(&mut payload);
    meta.spec_version.encode_to(&mut payload);
    meta.transaction_version.encode_to(&mut payload);
    payload.extend_from_slice(meta.genesis_hash.as_bytes());
    payload.extend_from_slice(meta.checkpoint().as_bytes());
    payload
}

fn finalize_payload(payload: Vec<u8>, threshold: usize) -> Vec<u8> {
    if payload.len() > threshold {
        debug!("signing payload of {} bytes replaced by its hash", payload.len());
        blake2_256(&payload).to_vec()
    } else {
        payload
    }
}

/// Exact bytes the signer must sign
///
/// `call ++ era ++ nonce ++ tip ++ spec_version ++ transaction_version ++
/// genesis_hash ++ checkpoint`, or its blake2_256 when longer than the
/// configured threshold.
pub fn to_signing_payload(unsigned: &UnsignedExtrinsic, config: &SigningConfig) -> Vec<u8> {
    finalize_payload(
        encode_payload(&unsigned.call_data, &unsigned.meta),
        config.payload_hash_threshold,
    )
}

/// Combine an unsigned extrinsic with a signature over its signing payload
pub fn attach_signature(
    unsigned: &UnsignedExtrinsic,
    scheme: KeyScheme,
    signature: &[u8],
    config: &SigningConfig,
) -> Result<SignedExtrinsic> {
    let (signer, _) = decode_address(&unsigned.address)
        .map_err(|_| Error::UnknownSigner(unsigned.address.clone()))?;
    let signature = MultiSignature::from_raw(scheme, signature)?;

    let tx_bytes = encode_signed(&signer, &signature, &unsigned.meta, &unsigned.call_data);
    let signed = SignedExtrinsic {
        signer,
        signature,
        call: unsigned.call.clone(),
        call_data: unsigned.call_data.clone(),
        meta: unsigned.meta.clone(),
        tx_hash: compute_tx_hash(&tx_bytes),
        tx_bytes,
    };

    if config.verify_signatures && signed.signature.scheme() != KeyScheme::Sr25519 {
        verify_signed(&signed, config)?;
    }
    debug!(
        "attached {} signature from {}, tx hash {}",
        scheme, unsigned.address, signed.tx_hash
    );
    Ok(signed)
}

/// Derive the payload, sign it with `signer` and attach the result
pub fn sign_extrinsic(
    unsigned: &UnsignedExtrinsic,
    signer: &dyn Signer,
    config: &SigningConfig,
) -> Result<SignedExtrinsic> {
    let (expected, _) = decode_address(&unsigned.address)
        .map_err(|_| Error::UnknownSigner(unsigned.address.clone()))?;
    if signer.account_id() != expected {
        return Err(Error::UnknownSigner(format!(
            "signer {} cannot sign for {}",
            signer.account_id(),
            unsigned.address
        )));
    }

    let payload = to_signing_payload(unsigned, config);
    let signature = signer.sign(&payload)?;
    let signed = attach_signature(unsigned, signature.scheme(), signature.as_bytes(), config)?;
    info!("signed extrinsic {}", signed.tx_hash);
    Ok(signed)
}

/// Check a signed extrinsic's signature against the payload it commits to
pub fn verify_signed(signed: &SignedExtrinsic, config: &SigningConfig) -> Result<()> {
    let payload = finalize_payload(
        encode_payload(&signed.call_data, &signed.meta),
        config.payload_hash_threshold,
    );
    verify_account_signature(&signed.signer, &payload, &signed.signature)
}

/// `blake2_256` of the signed extrinsic bytes, as the chain computes it
pub fn compute_tx_hash(tx_bytes: &[u8]) -> H256 {
    H256::hash_of(tx_bytes)
}

/// Fields recovered from a full-length signing payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedPayload {
    pub call: OpaqueCall,
    pub era: Era,
    pub nonce: u64,
    pub tip: u128,
    pub spec_version: u32,
    pub transaction_version: u32,
    pub genesis_hash: H256,
    pub checkpoint: H256,
}

/// Decode an unhashed signing payload
pub fn decode_signing_payload(bytes: &[u8], schema: &Schema) -> Result<DecodedPayload> {
    let mut reader = Reader::new(bytes);
    let call = CallCodec::new(schema).decode_from(&mut reader)?;

    let era = decode_era(&mut reader)?;
    let nonce = decode_nonce(&mut reader)?;
    let tip = reader.read_compact("tip")?;
    let spec_version = reader.read_uint(4, "spec_version")? as u32;
    let transaction_version = reader.read_uint(4, "transaction_version")? as u32;
    let genesis_hash = H256(reader.read_array("genesis_hash")?);
    let checkpoint = H256(reader.read_array("checkpoint")?);
    reader.finish("signing payload")?;

    Ok(DecodedPayload {
        call,
        era,
        nonce,
        tip,
        spec_version,
        transaction_version,
        genesis_hash,
        checkpoint,
    })
}
