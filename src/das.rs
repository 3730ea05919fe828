//! DAS indexer client for compressed-NFT asset and proof lookups
//!
//! Speaks the JSON-RPC-shaped HTTP protocol of Digital Asset Standard
//! indexers (`getAsset` / `getAssetProof`). Responses are decoded into
//! typed structs here; transport and JSON errors never leave this module
//! undecoded.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use crate::config::IndexerSettings;
use crate::errors::TxEngineError;

/// HTTP client bound to one DAS endpoint
#[derive(Debug, Clone)]
pub struct DasClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

/// `getAsset` response subset the assembler needs
#[derive(Debug, Clone, Deserialize)]
pub struct DasAsset {
    pub compression: DasCompression,
    pub ownership: DasOwnership,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DasCompression {
    #[serde(default)]
    pub compressed: bool,
    pub data_hash: String,
    pub creator_hash: String,
    pub leaf_id: u64,
    pub tree: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DasOwnership {
    pub owner: String,
    #[serde(default)]
    pub delegate: Option<String>,
}

/// `getAssetProof` response
#[derive(Debug, Clone, Deserialize)]
pub struct DasAssetProof {
    pub root: String,
    pub proof: Vec<String>,
    pub tree_id: String,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

impl DasClient {
    /// Create a client from indexer settings
    pub fn new(settings: &IndexerSettings) -> Result<Self, TxEngineError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| TxEngineError::Internal(format!("http client init failed: {}", e)))?;

        Ok(Self {
            http,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    /// Fetch compression and ownership data for one asset
    pub async fn get_asset(&self, asset_id: &Pubkey) -> Result<DasAsset, TxEngineError> {
        self.rpc_call("getAsset", json!({ "id": asset_id.to_string() }))
            .await
            .map_err(|reason| TxEngineError::asset_resolution(asset_id, reason))
    }

    /// Fetch the merkle proof path for one asset
    pub async fn get_asset_proof(&self, asset_id: &Pubkey) -> Result<DasAssetProof, TxEngineError> {
        self.rpc_call("getAssetProof", json!({ "id": asset_id.to_string() }))
            .await
            .map_err(|reason| TxEngineError::asset_resolution(asset_id, reason))
    }

    async fn rpc_call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, String> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": "soltx",
            "method": method,
            "params": params,
        });

        let mut req = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("X-API-KEY", key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| format!("{} request failed: {}", method, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(format!("{} returned status {}", method, status));
        }

        let envelope: RpcEnvelope<T> = resp
            .json()
            .await
            .map_err(|e| format!("{} response parse failed: {}", method, e))?;

        if let Some(err) = envelope.error {
            return Err(format!(
                "{} indexer error {}: {}",
                method, err.code, err.message
            ));
        }

        debug!(method = method, "indexer call succeeded");
        envelope
            .result
            .ok_or_else(|| format!("{} returned no result", method))
    }
}
