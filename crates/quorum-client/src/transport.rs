//! Node access over JSON-RPC
//!
//! Everything the library needs from a node goes through [`Transport`], so
//! offline tooling and tests can substitute their own implementation.

use crate::tx_builder::TxMeta;
use crate::{ClientError, Result};
use async_trait::async_trait;
use quorum_log::{debug, info, warn};
use quorum_types::{AccountId32, ClientConfig, Era, H256};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use url::Url;

/// JSON-RPC request
#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Vec<JsonValue>,
}

/// JSON-RPC response
#[derive(Deserialize)]
struct RpcResponse {
    result: Option<JsonValue>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Source of chain data and sink for signed extrinsics
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue one JSON-RPC call and return its `result`
    async fn rpc(&self, method: &str, params: Vec<JsonValue>) -> Result<JsonValue>;
}

/// [`Transport`] over HTTP JSON-RPC
pub struct HttpTransport {
    node_url: Url,
    http_client: HttpClient,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let node_url = Url::parse(&config.node_url)?;
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            node_url,
            http_client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn node_url(&self) -> &Url {
        &self.node_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn rpc(&self, method: &str, params: Vec<JsonValue>) -> Result<JsonValue> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!("rpc {} (id {})", method, request.id);

        let response = self
            .http_client
            .post(self.node_url.clone())
            .json(&request)
            .send()
            .await?;

        let rpc_response: RpcResponse = response.json().await?;

        if let Some(error) = rpc_response.error {
            return Err(ClientError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        rpc_response
            .result
            .ok_or_else(|| ClientError::InvalidResponse(format!("{method}: missing result field")))
    }
}

/// Versions a signature commits to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeVersion {
    #[serde(default)]
    pub spec_name: String,
    pub spec_version: u32,
    pub transaction_version: u32,
}

/// Snapshot of the chain data needed to build an extrinsic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainInfo {
    pub block_number: u64,
    pub block_hash: H256,
    pub genesis_hash: H256,
    pub runtime: RuntimeVersion,
    /// Raw runtime metadata, kept for callers that decode it themselves
    pub metadata: Vec<u8>,
}

impl ChainInfo {
    /// Query the best block, genesis, runtime version and metadata
    pub async fn fetch<T: Transport + ?Sized>(transport: &T) -> Result<Self> {
        let block_hash = parse_hash(transport.rpc("chain_getBlockHash", vec![]).await?)?;
        let header = transport
            .rpc("chain_getHeader", vec![json!(block_hash.to_string())])
            .await?;
        let block_number = header
            .get("number")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| ClientError::InvalidResponse("header without number".to_string()))
            .and_then(parse_hex_u64)?;
        let genesis_hash = parse_hash(transport.rpc("chain_getBlockHash", vec![json!(0)]).await?)?;
        let runtime: RuntimeVersion =
            serde_json::from_value(transport.rpc("state_getRuntimeVersion", vec![]).await?)?;
        let metadata = parse_hex_bytes(transport.rpc("state_getMetadata", vec![]).await?)?;

        info!(
            "chain at #{} ({}), spec {} tx {}",
            block_number, block_hash, runtime.spec_version, runtime.transaction_version
        );
        Ok(Self {
            block_number,
            block_hash,
            genesis_hash,
            runtime,
            metadata,
        })
    }

    /// Transaction metadata for a mortal transaction born at the fetched block
    pub fn tx_meta(&self, nonce: u64, era_period: u64, tip: u128) -> TxMeta {
        TxMeta {
            nonce,
            era: Era::mortal(era_period, self.block_number),
            tip,
            spec_version: self.runtime.spec_version,
            transaction_version: self.runtime.transaction_version,
            genesis_hash: self.genesis_hash,
            block_hash: self.block_hash,
        }
    }
}

/// Next usable nonce of `account`, pool included
pub async fn next_nonce<T: Transport + ?Sized>(transport: &T, account: &AccountId32) -> Result<u64> {
    let value = transport
        .rpc("system_accountNextIndex", vec![json!(account.to_string())])
        .await?;
    value
        .as_u64()
        .ok_or_else(|| ClientError::InvalidResponse(format!("nonce is not an integer: {value}")))
}

/// Submit signed extrinsic bytes; returns the hash reported by the node
pub async fn submit_extrinsic<T: Transport + ?Sized>(transport: &T, tx_bytes: &[u8]) -> Result<H256> {
    let expected = H256::hash_of(tx_bytes);
    let reported = parse_hash(
        transport
            .rpc("author_submitExtrinsic", vec![json!(format!("0x{}", hex::encode(tx_bytes)))])
            .await?,
    )?;
    if reported != expected {
        warn!("node reported tx hash {} but computed {}", reported, expected);
    }
    info!("submitted {}", reported);
    Ok(reported)
}

fn parse_hash(value: JsonValue) -> Result<H256> {
    let s = value
        .as_str()
        .ok_or_else(|| ClientError::InvalidResponse(format!("expected hash string, got {value}")))?;
    Ok(H256::from_hex(s)?)
}

fn parse_hex_u64(s: &str) -> Result<u64> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| ClientError::InvalidResponse(format!("block number {s}: {e}")))
}

fn parse_hex_bytes(value: JsonValue) -> Result<Vec<u8>> {
    let s = value
        .as_str()
        .ok_or_else(|| ClientError::InvalidResponse(format!("expected hex string, got {value}")))?;
    hex::decode(s.trim_start_matches("0x"))
        .map_err(|e| ClientError::InvalidResponse(format!("hex payload: {e}")))
}
