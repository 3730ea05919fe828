//! Error taxonomy for the transaction construction engine
//!
//! Every network-originating failure is decoded into one of these variants
//! before it crosses a component boundary; raw transport or JSON errors are
//! never surfaced to callers.

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Error type covering the whole transaction construction pipeline
#[derive(Error, Debug)]
pub enum TxEngineError {
    /// Caller input rejected before any network activity
    ///
    /// Raised for an empty transfer list, an empty instruction list, an
    /// out-of-range percentile, or a caller-supplied compute-budget
    /// instruction (those are exclusively owned by the builder).
    #[error("validation error: {0}")]
    Validation(String),

    /// On-chain program failure observed during simulation, decoded into
    /// the offending program and its custom error code
    #[error("program {program} failed during simulation with code {code}")]
    ProgramFailure { program: Pubkey, code: u32 },

    /// Simulation could not be performed or returned a non-program error
    #[error("simulation failed: {0}")]
    Simulation(String),

    /// Simulation succeeded but reported no consumed-units figure
    ///
    /// Treated as "could not estimate", never as zero units.
    #[error("simulation returned no compute unit consumption")]
    EstimationUnavailable,

    /// Prioritization-fee samples could not be fetched
    ///
    /// Recoverable only when the caller supplies an override price, which
    /// skips fee estimation entirely.
    #[error("priority fee estimation failed: {0}")]
    FeeEstimation(String),

    /// Indexer or mint lookup failed for an NFT or token transfer
    #[error("asset resolution failed for {asset}: {reason}")]
    AssetResolution { asset: String, reason: String },

    /// Merkle canopy depth exceeds the proof returned by the indexer
    #[error("canopy depth {canopy} exceeds available proof length {proof_len}")]
    ProofTruncation { canopy: u32, proof_len: usize },

    /// Neither the primary backend nor the public fallback produced a route
    #[error("no route found after backend fallback")]
    RouteNotFound,

    /// RPC communication failure outside simulation and fee estimation
    #[error("rpc error: {0}")]
    Rpc(String),

    /// Internal invariant violation or unexpected state
    #[error("internal error: {0}")]
    Internal(String),
}

impl TxEngineError {
    /// Whether retrying the whole build might succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rpc(_) | Self::FeeEstimation(_) | Self::Simulation(_) => true,
            Self::EstimationUnavailable => true,
            Self::Validation(_)
            | Self::ProgramFailure { .. }
            | Self::AssetResolution { .. }
            | Self::ProofTruncation { .. }
            | Self::RouteNotFound
            | Self::Internal(_) => false,
        }
    }

    /// Stable category label for log fields and metrics
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::ProgramFailure { .. } => "program",
            Self::Simulation(_) => "simulation",
            Self::EstimationUnavailable => "estimation",
            Self::FeeEstimation(_) => "fee",
            Self::AssetResolution { .. } => "asset",
            Self::ProofTruncation { .. } => "proof",
            Self::RouteNotFound => "route",
            Self::Rpc(_) => "rpc",
            Self::Internal(_) => "internal",
        }
    }

    /// Create an asset resolution error for a specific asset
    pub fn asset_resolution(asset: impl ToString, reason: impl Into<String>) -> Self {
        Self::AssetResolution {
            asset: asset.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a validation error
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TxEngineError::ProgramFailure {
            program: spl_token::id(),
            code: 6001,
        };
        assert_eq!(
            err.to_string(),
            format!(
                "program {} failed during simulation with code 6001",
                spl_token::id()
            )
        );

        let err = TxEngineError::ProofTruncation {
            canopy: 14,
            proof_len: 10,
        };
        assert!(err.to_string().contains("canopy depth 14"));
    }

    #[test]
    fn test_error_retryability() {
        assert!(TxEngineError::Rpc("timeout".to_string()).is_retryable());
        assert!(TxEngineError::FeeEstimation("test".to_string()).is_retryable());

        assert!(!TxEngineError::validation("empty").is_retryable());
        assert!(!TxEngineError::RouteNotFound.is_retryable());
        assert!(!TxEngineError::asset_resolution("mint", "missing").is_retryable());
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(TxEngineError::validation("x").category(), "validation");
        assert_eq!(TxEngineError::EstimationUnavailable.category(), "estimation");
        assert_eq!(TxEngineError::RouteNotFound.category(), "route");
    }
}
