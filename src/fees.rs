//! Priority fee estimation from recent cluster data

use std::sync::Arc;

use serde_json::json;
use solana_client::{nonblocking::rpc_client::RpcClient, rpc_request::RpcRequest};
use solana_rpc_client_api::response::RpcPrioritizationFee;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use crate::errors::TxEngineError;
use crate::types::PriorityFeeSample;

/// Conservative floor added to the sampled median, in micro-lamports per
/// compute unit, guarding against stale samples
pub const FEE_OFFSET_MICRO_LAMPORTS: u64 = 100_000;

/// Derives a recommended per-compute-unit price from recent
/// prioritization fees
pub struct PriorityFeeEstimator {
    rpc: Arc<RpcClient>,
}

impl PriorityFeeEstimator {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self { rpc }
    }

    /// Recommend a price in micro-lamports per compute unit
    ///
    /// Queries recent prioritization fees scoped to `account_keys` at the
    /// requested percentile (0-100; the wire call expects a basis-scaled
    /// value, hence the x100). The recommendation is the local median of
    /// the samples plus a fixed offset. An empty sample set falls back to
    /// `default_micro_lamports` instead of dividing by zero.
    pub async fn estimate(
        &self,
        account_keys: &[Pubkey],
        percentile: u8,
        default_micro_lamports: u64,
    ) -> Result<u64, TxEngineError> {
        if percentile > 100 {
            return Err(TxEngineError::validation(format!(
                "percentile {} out of range 0-100",
                percentile
            )));
        }

        let keys: Vec<String> = account_keys.iter().map(|k| k.to_string()).collect();
        let params = json!([keys, { "percentile": (percentile as u64) * 100 }]);

        let raw: Vec<RpcPrioritizationFee> = self
            .rpc
            .send(RpcRequest::GetRecentPrioritizationFees, params)
            .await
            .map_err(|e| TxEngineError::FeeEstimation(format!("fee sample fetch failed: {}", e)))?;

        let samples: Vec<PriorityFeeSample> = raw
            .iter()
            .map(|fee| PriorityFeeSample {
                slot: fee.slot,
                fee_micro_lamports_per_cu: fee.prioritization_fee,
            })
            .collect();

        let recommended = match median_fee(&samples) {
            Some(median) => median + FEE_OFFSET_MICRO_LAMPORTS,
            None => default_micro_lamports,
        };

        debug!(
            samples = samples.len(),
            percentile, recommended, "priority fee estimated"
        );
        Ok(recommended)
    }
}

/// Median of the sampled fees: sort ascending, middle element for odd
/// counts, mean of the two central elements for even counts
pub(crate) fn median_fee(samples: &[PriorityFeeSample]) -> Option<u64> {
    if samples.is_empty() {
        return None;
    }

    let mut fees: Vec<u64> = samples
        .iter()
        .map(|s| s.fee_micro_lamports_per_cu)
        .collect();
    fees.sort_unstable();

    let mid = fees.len() / 2;
    Some(if fees.len() % 2 == 0 {
        (fees[mid - 1] + fees[mid]) / 2
    } else {
        fees[mid]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(fees: &[u64]) -> Vec<PriorityFeeSample> {
        fees.iter()
            .enumerate()
            .map(|(i, fee)| PriorityFeeSample {
                slot: 1000 + i as u64,
                fee_micro_lamports_per_cu: *fee,
            })
            .collect()
    }

    #[test]
    fn test_median_odd_count() {
        assert_eq!(median_fee(&samples(&[100, 200, 300])), Some(200));
        // Order of arrival does not matter
        assert_eq!(median_fee(&samples(&[300, 100, 200])), Some(200));
    }

    #[test]
    fn test_median_even_count() {
        assert_eq!(median_fee(&samples(&[100, 200])), Some(150));
        assert_eq!(median_fee(&samples(&[40, 10, 20, 30])), Some(25));
    }

    #[test]
    fn test_median_empty_is_none() {
        assert_eq!(median_fee(&[]), None);
    }

    #[test]
    fn test_median_single_sample() {
        assert_eq!(median_fee(&samples(&[777])), Some(777));
    }
}
