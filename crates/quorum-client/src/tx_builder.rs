//! Extrinsic builder and multisig call wrappers

use parity_scale_codec::{Compact, Encode};
use quorum_codec::{names, CallCodec, OpaqueCall, Schema, Value};
use quorum_errors::{Error, Result};
use quorum_log::debug;
use quorum_types::{decode_address, AccountId32, Era, Timepoint, H256};
use serde::{Deserialize, Serialize};

/// Extrinsic format version
pub const EXTRINSIC_VERSION: u8 = 4;

/// Version byte of an unsigned extrinsic
pub const UNSIGNED_VERSION_BYTE: u8 = EXTRINSIC_VERSION;

/// Version byte of a signed extrinsic
pub const SIGNED_VERSION_BYTE: u8 = EXTRINSIC_VERSION | 0b1000_0000;

/// Account and chain metadata that every signature commits to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxMeta {
    pub nonce: u64,
    pub era: Era,
    #[serde(default)]
    pub tip: u128,
    pub spec_version: u32,
    pub transaction_version: u32,
    pub genesis_hash: H256,
    /// Block the mortal era is anchored at
    pub block_hash: H256,
}

impl TxMeta {
    /// Hash that closes the signing payload: the anchor block for mortal
    /// eras, genesis for immortal ones
    pub fn checkpoint(&self) -> H256 {
        if self.era.is_immortal() {
            self.genesis_hash
        } else {
            self.block_hash
        }
    }
}

/// Transaction that has everything but a signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedExtrinsic {
    /// SS58 address of the account expected to sign
    pub address: String,
    pub call: OpaqueCall,
    /// Canonical encoding of `call`
    pub call_data: Vec<u8>,
    pub meta: TxMeta,
}

impl UnsignedExtrinsic {
    /// `compact(len) ++ 0x04 ++ call`
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(1 + self.call_data.len());
        body.push(UNSIGNED_VERSION_BYTE);
        body.extend_from_slice(&self.call_data);
        let mut out = Compact(body.len() as u32).encode();
        out.extend_from_slice(&body);
        out
    }

    pub fn call_hash(&self) -> H256 {
        H256::hash_of(&self.call_data)
    }
}

/// Assemble an unsigned extrinsic for `address` from a call and metadata
pub fn build_unsigned(
    codec: &CallCodec<'_>,
    call: OpaqueCall,
    meta: TxMeta,
    address: &str,
) -> Result<UnsignedExtrinsic> {
    decode_address(address).map_err(|_| Error::UnknownSigner(address.to_string()))?;
    let call_data = codec.encode(&call)?;
    debug!(
        "built unsigned {}.{} for {} with nonce {} ({} bytes of call data)",
        call.pallet,
        call.method,
        address,
        meta.nonce,
        call_data.len()
    );
    Ok(UnsignedExtrinsic {
        address: address.to_string(),
        call,
        call_data,
        meta,
    })
}

/// Builder over [`build_unsigned`] that collects the metadata piecewise
///
/// Nonce, era and versions have no defaults; the chain state they come from
/// changes between submissions.
#[derive(Debug, Clone)]
pub struct ExtrinsicBuilder<'a> {
    codec: CallCodec<'a>,
    address: Option<String>,
    call: Option<OpaqueCall>,
    nonce: Option<u64>,
    era: Option<Era>,
    tip: u128,
    spec_version: Option<u32>,
    transaction_version: Option<u32>,
    genesis_hash: Option<H256>,
    block_hash: Option<H256>,
}

impl<'a> ExtrinsicBuilder<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            codec: CallCodec::new(schema),
            address: None,
            call: None,
            nonce: None,
            era: None,
            tip: 0,
            spec_version: None,
            transaction_version: None,
            genesis_hash: None,
            block_hash: None,
        }
    }

    pub fn address<S: Into<String>>(mut self, address: S) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn call(mut self, call: OpaqueCall) -> Self {
        self.call = Some(call);
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn era(mut self, era: Era) -> Self {
        self.era = Some(era);
        self
    }

    pub fn tip(mut self, tip: u128) -> Self {
        self.tip = tip;
        self
    }

    pub fn spec_version(mut self, spec_version: u32) -> Self {
        self.spec_version = Some(spec_version);
        self
    }

    pub fn transaction_version(mut self, transaction_version: u32) -> Self {
        self.transaction_version = Some(transaction_version);
        self
    }

    pub fn genesis_hash(mut self, genesis_hash: H256) -> Self {
        self.genesis_hash = Some(genesis_hash);
        self
    }

    pub fn block_hash(mut self, block_hash: H256) -> Self {
        self.block_hash = Some(block_hash);
        self
    }

    /// Take every metadata field from `meta`
    pub fn meta(self, meta: TxMeta) -> Self {
        let builder = self
            .nonce(meta.nonce)
            .era(meta.era)
            .tip(meta.tip)
            .spec_version(meta.spec_version)
            .transaction_version(meta.transaction_version)
            .genesis_hash(meta.genesis_hash);
        builder.block_hash(meta.block_hash)
    }

    pub fn build(self) -> Result<UnsignedExtrinsic> {
        fn require<T>(value: Option<T>, field: &str) -> Result<T> {
            value.ok_or_else(|| Error::MissingField(field.to_string()))
        }

        let address = require(self.address, "address")?;
        let call = require(self.call, "call")?;
        let era = require(self.era, "era")?;
        let genesis_hash = require(self.genesis_hash, "genesis_hash")?;
        let block_hash = match (era, self.block_hash) {
            (_, Some(hash)) => hash,
            (Era::Immortal, None) => genesis_hash,
            (Era::Mortal { .. }, None) => return Err(Error::MissingField("block_hash".into())),
        };
        let meta = TxMeta {
            nonce: require(self.nonce, "nonce")?,
            era,
            tip: self.tip,
            spec_version: require(self.spec_version, "spec_version")?,
            transaction_version: require(self.transaction_version, "transaction_version")?,
            genesis_hash,
            block_hash,
        };
        build_unsigned(&self.codec, call, meta, &address)
    }
}

/// Full signer set minus `acting`, sorted ascending by account bytes
pub fn other_signatories(signatories: &[AccountId32], acting: &AccountId32) -> Result<Vec<AccountId32>> {
    if !signatories.contains(acting) {
        return Err(Error::UnknownSigner(acting.to_string()));
    }
    let mut others: Vec<AccountId32> = signatories.iter().filter(|s| *s != acting).copied().collect();
    others.sort();
    others.dedup();
    Ok(others)
}

/// `others` must be strictly ascending
pub(crate) fn check_sorted(others: &[AccountId32]) -> Result<()> {
    for (position, pair) in others.windows(2).enumerate() {
        if pair[0] == pair[1] {
            return Err(Error::DuplicateSignatory(pair[1].to_string()));
        }
        if pair[0] > pair[1] {
            return Err(Error::UnsortedSignatories {
                position: position + 1,
                previous: pair[0].to_string(),
                current: pair[1].to_string(),
            });
        }
    }
    Ok(())
}

fn check_signatories(threshold: u16, others: &[AccountId32]) -> Result<()> {
    check_sorted(others)?;
    let signatories = others.len() + 1;
    if threshold < 2 || threshold as usize > signatories {
        return Err(Error::InvalidThreshold {
            threshold: threshold as usize,
            signatories,
        });
    }
    Ok(())
}

fn account_seq(accounts: &[AccountId32]) -> Value {
    Value::Seq(accounts.iter().copied().map(Value::AccountId).collect())
}

/// Wrap `inner` in `multisig.as_multi`
///
/// `other_signatories` must already be in canonical ascending order; peers
/// computing the same call hash rely on it. The inner call is encoded once
/// here so schema errors surface before any signing happens.
pub fn build_multisig_call(
    codec: &CallCodec<'_>,
    threshold: u16,
    other_signatories: &[AccountId32],
    timepoint: Option<Timepoint>,
    inner: OpaqueCall,
    store_call: bool,
    max_weight: u64,
) -> Result<OpaqueCall> {
    check_signatories(threshold, other_signatories)?;
    codec.schema().require(names::MULTISIG, names::AS_MULTI)?;
    let call_hash = codec.call_hash(&inner)?;
    debug!(
        "wrapping {}.{} ({}) in as_multi with timepoint {:?}",
        inner.pallet, inner.method, call_hash, timepoint
    );

    Ok(OpaqueCall::new(
        names::MULTISIG,
        names::AS_MULTI,
        vec![
            Value::from(threshold),
            account_seq(other_signatories),
            Value::from(timepoint),
            Value::from(inner),
            Value::Bool(store_call),
            Value::from(max_weight),
        ],
    ))
}

/// `multisig.approve_as_multi`, approving by call hash without the body
pub fn build_approve_as_multi(
    codec: &CallCodec<'_>,
    threshold: u16,
    other_signatories: &[AccountId32],
    timepoint: Option<Timepoint>,
    call_hash: H256,
    max_weight: u64,
) -> Result<OpaqueCall> {
    check_signatories(threshold, other_signatories)?;
    codec.schema().require(names::MULTISIG, names::APPROVE_AS_MULTI)?;
    Ok(OpaqueCall::new(
        names::MULTISIG,
        names::APPROVE_AS_MULTI,
        vec![
            Value::from(threshold),
            account_seq(other_signatories),
            Value::from(timepoint),
            Value::from(call_hash),
            Value::from(max_weight),
        ],
    ))
}

/// `multisig.cancel_as_multi`; only the depositor can submit it on chain
pub fn build_cancel_as_multi(
    codec: &CallCodec<'_>,
    threshold: u16,
    other_signatories: &[AccountId32],
    timepoint: Timepoint,
    call_hash: H256,
) -> Result<OpaqueCall> {
    check_signatories(threshold, other_signatories)?;
    codec.schema().require(names::MULTISIG, names::CANCEL_AS_MULTI)?;
    Ok(OpaqueCall::new(
        names::MULTISIG,
        names::CANCEL_AS_MULTI,
        vec![
            Value::from(threshold),
            account_seq(other_signatories),
            Value::from(timepoint),
            Value::from(call_hash),
        ],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_types::MultiAddress;

    const ALICE: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
    const BOB: &str = "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty";
    const DAVE: &str = "5DAAnrj7VHTznn2AWBemMuyBwZWs6FNFjdyVXUeYum3PTXFy";
    const EVE: &str = "5HGjWAeFDfFCWPsjFQdVV2Msvz2XtMktvgocEZcCj68kUMaw";

    fn account(address: &str) -> AccountId32 {
        address.parse().unwrap()
    }

    fn transfer(amount: u128) -> OpaqueCall {
        OpaqueCall::new(
            names::BALANCES,
            names::TRANSFER_KEEP_ALIVE,
            vec![MultiAddress::Id(account(EVE)).into(), Value::UInt(amount)],
        )
    }

    fn meta() -> TxMeta {
        TxMeta {
            nonce: 3,
            era: Era::Immortal,
            tip: 0,
            spec_version: 9_430,
            transaction_version: 24,
            genesis_hash: H256([0x91; 32]),
            block_hash: H256([0x91; 32]),
        }
    }

    #[test]
    fn test_other_signatories_sorted_without_actor() {
        let set = [account(ALICE), account(BOB), account(DAVE)];
        let others = other_signatories(&set, &account(ALICE)).unwrap();
        assert_eq!(others, vec![account(DAVE), account(BOB)]);
        assert!(matches!(
            other_signatories(&set, &account(EVE)),
            Err(Error::UnknownSigner(_))
        ));
    }

    #[test]
    fn test_unsorted_signatories_rejected() {
        let schema = Schema::polkadot();
        let codec = CallCodec::new(&schema);
        let err = build_multisig_call(
            &codec,
            2,
            &[account(BOB), account(DAVE)],
            None,
            transfer(1),
            false,
            0,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsortedSignatories { position: 1, .. }));
    }

    #[test]
    fn test_threshold_checked_against_full_set() {
        let schema = Schema::polkadot();
        let codec = CallCodec::new(&schema);
        let others = [account(DAVE), account(BOB)];
        assert!(build_multisig_call(&codec, 3, &others, None, transfer(1), false, 0).is_ok());
        assert_eq!(
            build_multisig_call(&codec, 4, &others, None, transfer(1), false, 0),
            Err(Error::InvalidThreshold {
                threshold: 4,
                signatories: 3
            })
        );
        assert!(build_multisig_call(&codec, 1, &others, None, transfer(1), false, 0).is_err());
    }

    #[test]
    fn test_build_unsigned_and_decode() {
        let schema = Schema::polkadot();
        let codec = CallCodec::new(&schema);
        let wrapped = build_multisig_call(
            &codec,
            2,
            &[account(DAVE), account(BOB)],
            Some(Timepoint::new(100, 2)),
            transfer(10_000_000_000_000),
            false,
            640_000_000,
        )
        .unwrap();

        let unsigned = build_unsigned(&codec, wrapped.clone(), meta(), ALICE).unwrap();
        let bytes = unsigned.encode();
        let decoded = crate::extrinsic::decode_extrinsic(&bytes, &schema).unwrap();
        assert!(decoded.signature.is_none());
        assert_eq!(decoded.call, wrapped);
        assert_eq!(
            decoded.call.args[3].as_call(),
            Some(&transfer(10_000_000_000_000))
        );
    }

    #[test]
    fn test_builder_requires_nonce() {
        let schema = Schema::polkadot();
        let result = ExtrinsicBuilder::new(&schema)
            .address(ALICE)
            .call(transfer(1))
            .era(Era::Immortal)
            .spec_version(1)
            .transaction_version(1)
            .genesis_hash(H256([1; 32]))
            .build();
        assert_eq!(result, Err(Error::MissingField("nonce".to_string())));
    }

    #[test]
    fn test_builder_mortal_needs_block_hash() {
        let schema = Schema::polkadot();
        let builder = ExtrinsicBuilder::new(&schema)
            .address(ALICE)
            .call(transfer(1))
            .nonce(0)
            .era(Era::mortal(64, 1_000))
            .spec_version(1)
            .transaction_version(1)
            .genesis_hash(H256([1; 32]));
        assert_eq!(
            builder.clone().build(),
            Err(Error::MissingField("block_hash".to_string()))
        );
        let unsigned = builder.block_hash(H256([2; 32])).build().unwrap();
        assert_eq!(unsigned.meta.checkpoint(), H256([2; 32]));
    }

    #[test]
    fn test_builder_rejects_bad_address() {
        let schema = Schema::polkadot();
        let result = ExtrinsicBuilder::new(&schema)
            .address("nobody")
            .call(transfer(1))
            .meta(meta())
            .build();
        assert!(matches!(result, Err(Error::UnknownSigner(_))));
    }

    #[test]
    fn test_unsigned_envelope() {
        let schema = Schema::polkadot();
        let codec = CallCodec::new(&schema);
        let unsigned = build_unsigned(&codec, transfer(10_000_000_000_000), meta(), ALICE).unwrap();
        let bytes = unsigned.encode();
        // 42 bytes of call data plus the version byte
        assert_eq!(bytes[0], 43 << 2);
        assert_eq!(bytes[1], 0x04);
        assert_eq!(&bytes[2..], unsigned.call_data.as_slice());
        assert_eq!(
            unsigned.call_hash().to_string(),
            "0x0491847e080c5166ded52158d50e5123873156cbe39ca7ba5d1c896f3ab0b817"
        );
    }
}
