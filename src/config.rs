//! Configuration module for the transaction construction engine
//!
//! Loads engine settings from TOML files with environment variable
//! overrides and provides structured configuration types with sane
//! mainnet defaults.

use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::CommitmentConfig;

/// Top-level engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Solana RPC connection settings
    pub rpc: RpcSettings,

    /// DAS indexer settings for compressed-NFT resolution
    pub indexer: IndexerSettings,

    /// Priority fee policy
    #[serde(default)]
    pub fees: FeeSettings,

    /// Quote backend routing
    #[serde(default)]
    pub router: RouterSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcSettings {
    /// RPC endpoint URL
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// Commitment level for reads and simulation
    #[serde(default = "default_commitment")]
    pub commitment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerSettings {
    /// DAS JSON-RPC endpoint URL
    pub endpoint: String,

    /// Optional API key sent as a request header
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeSettings {
    /// Percentile (0-100) requested from the prioritization-fee RPC
    #[serde(default = "default_percentile")]
    pub percentile: u8,

    /// Absolute ceiling on the per-unit price in micro-lamports
    #[serde(default = "default_priority_limit")]
    pub priority_limit_micro_lamports: u64,

    /// Minimum total priority fee target in lamports
    #[serde(default = "default_min_total_fee")]
    pub min_total_fee_lamports: u64,

    /// Per-unit price used when the cluster returns no fee samples
    #[serde(default = "default_price")]
    pub default_price_micro_lamports: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterSettings {
    /// Internal quoting backend; when unset every quote goes straight to
    /// the public upstream
    #[serde(default)]
    pub backend_url: Option<String>,

    /// Public upstream quote API
    #[serde(default = "default_public_quote_url")]
    pub public_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

// Default value functions
fn default_rpc_timeout() -> u64 {
    30
}
fn default_http_timeout() -> u64 {
    10
}
fn default_commitment() -> String {
    "confirmed".to_string()
}
fn default_percentile() -> u8 {
    50
}
fn default_priority_limit() -> u64 {
    20_000_000
}
fn default_min_total_fee() -> u64 {
    10_000
}
fn default_price() -> u64 {
    10_000
}
fn default_public_quote_url() -> String {
    "https://quote-api.jup.ag/v6".to_string()
}

impl Default for FeeSettings {
    fn default() -> Self {
        Self {
            percentile: default_percentile(),
            priority_limit_micro_lamports: default_priority_limit(),
            min_total_fee_lamports: default_min_total_fee(),
            default_price_micro_lamports: default_price(),
        }
    }
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            backend_url: None,
            public_url: default_public_quote_url(),
            timeout_secs: default_http_timeout(),
        }
    }
}

impl RpcSettings {
    /// Parse the configured commitment level, defaulting to confirmed on
    /// unknown values
    pub fn commitment(&self) -> CommitmentConfig {
        match self.commitment.as_str() {
            "processed" => CommitmentConfig::processed(),
            "finalized" => CommitmentConfig::finalized(),
            _ => CommitmentConfig::confirmed(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides applied
    /// through a local `.env` file
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_file(path)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rpc: RpcSettings {
                endpoint: "https://api.mainnet-beta.solana.com".to_string(),
                timeout_secs: default_rpc_timeout(),
                commitment: default_commitment(),
            },
            indexer: IndexerSettings {
                endpoint: "https://mainnet.helius-rpc.com".to_string(),
                api_key: None,
                timeout_secs: default_http_timeout(),
            },
            fees: FeeSettings::default(),
            router: RouterSettings::default(),
        }
    }
}
