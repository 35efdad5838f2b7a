//! Signed extrinsics and the extrinsic decoder

use crate::tx_builder::{TxMeta, SIGNED_VERSION_BYTE, UNSIGNED_VERSION_BYTE};
use parity_scale_codec::{Compact, Decode, Encode};
use quorum_codec::{CallCodec, OpaqueCall, Reader, Schema};
use quorum_crypto::{KeyScheme, MultiSignature};
use quorum_errors::{Error, Result};
use quorum_types::{AccountId32, Era, MultiAddress, H256};

/// Fully signed transaction, ready for submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedExtrinsic {
    pub signer: AccountId32,
    pub signature: MultiSignature,
    pub call: OpaqueCall,
    pub call_data: Vec<u8>,
    /// Metadata the signature commits to
    pub meta: TxMeta,
    /// Canonical encoding, length prefix included
    pub tx_bytes: Vec<u8>,
    /// `blake2_256(tx_bytes)`
    pub tx_hash: H256,
}

impl SignedExtrinsic {
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.tx_bytes))
    }
}

/// Encode `compact(len) ++ 0x84 ++ signer ++ signature ++ era ++ nonce ++
/// tip ++ call`
pub(crate) fn encode_signed(
    signer: &AccountId32,
    signature: &MultiSignature,
    meta: &TxMeta,
    call_data: &[u8],
) -> Vec<u8> {
    let mut body = vec![SIGNED_VERSION_BYTE];
    MultiAddress::Id(*signer).encode_to(&mut body);
    signature.encode_to(&mut body);
    meta.era.encode_to(&mut body);
    Compact(meta.nonce).encode_to(&mut body);
    Compact(meta.tip).encode_to(&mut body);
    body.extend_from_slice(call_data);

    let mut out = Compact(body.len() as u32).encode();
    out.extend_from_slice(&body);
    out
}

/// Signature section of a decoded signed extrinsic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtrinsicSignature {
    pub signer: MultiAddress,
    pub signature: MultiSignature,
    pub era: Era,
    pub nonce: u64,
    pub tip: u128,
}

/// Structured view of extrinsic bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedExtrinsic {
    pub signature: Option<ExtrinsicSignature>,
    pub call: OpaqueCall,
}

/// Decode an unsigned or signed extrinsic, nested calls included
pub fn decode_extrinsic(bytes: &[u8], schema: &Schema) -> Result<DecodedExtrinsic> {
    let mut reader = Reader::new(bytes);
    let len = reader.read_len("extrinsic length")?;
    if reader.remaining() < len {
        return Err(Error::truncated("extrinsic", len, reader.remaining()));
    }
    if reader.remaining() > len {
        return Err(Error::TrailingInput {
            context: "extrinsic".to_string(),
            remaining: reader.remaining() - len,
        });
    }

    let signature = match reader.read_u8("extrinsic version")? {
        UNSIGNED_VERSION_BYTE => None,
        SIGNED_VERSION_BYTE => Some(decode_signature_section(&mut reader)?),
        other => {
            return Err(Error::InvalidEncoding(format!(
                "unsupported extrinsic version byte {other:#04x}"
            )))
        }
    };

    let call = CallCodec::new(schema).decode_from(&mut reader)?;
    reader.finish("extrinsic call")?;
    Ok(DecodedExtrinsic { signature, call })
}

fn decode_signature_section(reader: &mut Reader<'_>) -> Result<ExtrinsicSignature> {
    let signer = decode_signer(reader)?;
    let signature = decode_multi_signature(reader)?;
    let era = decode_era(reader)?;
    let nonce = decode_nonce(reader)?;
    let tip = reader.read_compact("tip")?;
    Ok(ExtrinsicSignature {
        signer,
        signature,
        era,
        nonce,
        tip,
    })
}

fn decode_signer(reader: &mut Reader<'_>) -> Result<MultiAddress> {
    // signed extrinsics built here always carry `MultiAddress::Id`
    match reader.read_u8("signer address")? {
        0 => Ok(MultiAddress::Id(AccountId32::new(
            reader.read_array("signer address")?,
        ))),
        other => Err(Error::UnknownSigner(format!(
            "unsupported signer address variant {other}"
        ))),
    }
}

fn decode_multi_signature(reader: &mut Reader<'_>) -> Result<MultiSignature> {
    let scheme = match reader.read_u8("signature")? {
        0 => KeyScheme::Ed25519,
        1 => KeyScheme::Sr25519,
        2 => KeyScheme::Ecdsa,
        other => {
            return Err(Error::InvalidEncoding(format!(
                "signature variant {other}"
            )))
        }
    };
    let bytes = reader.read_bytes(scheme.signature_len(), "signature")?;
    MultiSignature::from_raw(scheme, bytes)
}

pub(crate) fn decode_nonce(reader: &mut Reader<'_>) -> Result<u64> {
    let nonce = reader.read_compact("nonce")?;
    u64::try_from(nonce).map_err(|_| Error::InvalidEncoding(format!("nonce {nonce} overflows u64")))
}

pub(crate) fn decode_era(reader: &mut Reader<'_>) -> Result<Era> {
    let first = reader.read_u8("era")?;
    if first == 0 {
        return Ok(Era::Immortal);
    }
    let second = reader.read_u8("era")?;
    Era::decode(&mut &[first, second][..]).map_err(|e| Error::InvalidEra(e.to_string()))
}
