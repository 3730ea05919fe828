//! Smart transaction builder: validation, metering, fee pricing, serialization
//!
//! The builder owns the compute-budget instructions. Caller instructions are
//! validated, metered against the cluster, priced, wrapped with a recomputed
//! budget, and serialized as a legacy or version-0 transaction depending on
//! whether address-lookup tables are involved.

use std::sync::Arc;

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    address_lookup_table::AddressLookupTableAccount,
    compute_budget::ComputeBudgetInstruction,
    instruction::Instruction,
    message::{v0::Message as MessageV0, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    transaction::{Transaction, VersionedTransaction},
};
use tracing::{debug, info};

use crate::compute::ComputeUnitEstimator;
use crate::config::FeeSettings;
use crate::errors::TxEngineError;
use crate::fees::PriorityFeeEstimator;
use crate::telemetry::CorrelationId;
use crate::types::{ComputeBudgetPlan, TransactionPlan};

/// Floor on the production unit budget, covering trivial transfers whose
/// measured consumption is near zero
pub const UNIT_BUDGET_FLOOR: u32 = 1_000;

/// Margin applied to measured units, absorbing simulation-vs-execution
/// variance
pub const UNIT_BUDGET_MARGIN: f64 = 1.3;

/// Margin applied to the recommended market price
pub const PRICE_MARGIN: f64 = 1.2;

/// Per-build pricing inputs
#[derive(Debug, Clone)]
pub struct BuildParams {
    /// Accounts the prioritization-fee query is scoped to
    pub account_keys: Vec<Pubkey>,

    /// Percentile (0-100) requested from the fee RPC
    pub percentile: u8,

    /// Absolute ceiling on the per-unit price in micro-lamports
    pub priority_limit_micro_lamports: u64,

    /// Minimum total priority fee target in lamports
    pub min_total_fee_lamports: u64,

    /// Fallback per-unit price when the cluster returns no samples
    pub default_price_micro_lamports: u64,

    /// Caller-fixed per-unit price; skips fee estimation entirely and is
    /// used verbatim
    pub override_price_micro_lamports: Option<u64>,
}

impl BuildParams {
    /// Pricing inputs from configured fee policy
    pub fn from_fee_settings(settings: &FeeSettings, account_keys: Vec<Pubkey>) -> Self {
        Self {
            account_keys,
            percentile: settings.percentile,
            priority_limit_micro_lamports: settings.priority_limit_micro_lamports,
            min_total_fee_lamports: settings.min_total_fee_lamports,
            default_price_micro_lamports: settings.default_price_micro_lamports,
            override_price_micro_lamports: None,
        }
    }
}

impl Default for BuildParams {
    fn default() -> Self {
        Self::from_fee_settings(&FeeSettings::default(), Vec::new())
    }
}

/// Orchestrates one transaction build end to end
pub struct SmartTransactionBuilder {
    rpc: Arc<RpcClient>,
    compute: ComputeUnitEstimator,
    fees: PriorityFeeEstimator,
}

impl SmartTransactionBuilder {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self {
            compute: ComputeUnitEstimator::new(Arc::clone(&rpc)),
            fees: PriorityFeeEstimator::new(Arc::clone(&rpc)),
            rpc,
        }
    }

    /// Build and serialize an unsigned transaction, returned as base58
    ///
    /// Compute estimation failure aborts the build; no transaction is ever
    /// returned with a guessed budget. Fee estimation is skipped when an
    /// override price is supplied and otherwise runs concurrently with the
    /// compute measurement, failing the build on error.
    pub async fn build(
        &self,
        instructions: Vec<Instruction>,
        payer: &Pubkey,
        lookup_tables: Vec<AddressLookupTableAccount>,
        params: &BuildParams,
    ) -> Result<String, TxEngineError> {
        validate_no_compute_budget(&instructions)?;

        let correlation_id = CorrelationId::new();
        let recent_blockhash = self
            .rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| TxEngineError::Rpc(format!("blockhash fetch failed: {}", e)))?;

        let (units, recommended) = match params.override_price_micro_lamports {
            Some(_) => {
                let units = self
                    .compute
                    .estimate(&instructions, payer, &lookup_tables)
                    .await?;
                (units, None)
            }
            None => {
                let (units, recommended) = tokio::try_join!(
                    self.compute.estimate(&instructions, payer, &lookup_tables),
                    self.fees.estimate(
                        &params.account_keys,
                        params.percentile,
                        params.default_price_micro_lamports,
                    ),
                )?;
                (units, Some(recommended))
            }
        };

        let budget = plan_compute_budget(units, recommended, params);
        debug!(
            correlation_id = %correlation_id,
            measured_units = units,
            unit_limit = budget.unit_limit,
            unit_price = budget.unit_price_micro_lamports,
            "compute budget planned"
        );

        let plan = TransactionPlan {
            instructions: prepend_compute_budget(instructions, budget),
            fee_payer: *payer,
            recent_blockhash,
            lookup_tables,
        };
        let encoded = encode_transaction(plan)?;

        info!(
            correlation_id = %correlation_id,
            payer = %payer,
            unit_limit = budget.unit_limit,
            unit_price = budget.unit_price_micro_lamports,
            "transaction built"
        );
        Ok(encoded)
    }
}

/// Reject instruction lists the builder cannot take ownership of
///
/// Compute-budget instructions are exclusively owned by the builder; a
/// caller-supplied one would be double-prepended.
pub fn validate_no_compute_budget(instructions: &[Instruction]) -> Result<(), TxEngineError> {
    if instructions.is_empty() {
        return Err(TxEngineError::validation("instruction list is empty"));
    }
    if instructions
        .iter()
        .any(|ix| ix.program_id == solana_sdk::compute_budget::id())
    {
        return Err(TxEngineError::validation(
            "compute-budget instructions are owned by the builder",
        ));
    }
    Ok(())
}

/// Production unit budget for a measured consumption
pub fn unit_budget(measured_units: u64) -> u32 {
    let padded = (measured_units as f64 * UNIT_BUDGET_MARGIN).ceil() as u64;
    padded.max(UNIT_BUDGET_FLOOR as u64).min(u32::MAX as u64) as u32
}

/// Combine the market signal with the economic floor
///
/// `max(recommended x 1.2, min_total_fee / unit_limit x 1e6)` clamped to
/// the configured ceiling, so trivial transactions are never under-priced
/// relative to the minimum total fee target.
pub fn unit_price(
    recommended: u64,
    unit_limit: u32,
    min_total_fee_lamports: u64,
    priority_limit_micro_lamports: u64,
) -> u64 {
    let market = recommended as f64 * PRICE_MARGIN;
    let floor = min_total_fee_lamports as f64 / unit_limit.max(1) as f64 * 1e6;
    (market.max(floor) as u64).min(priority_limit_micro_lamports)
}

fn plan_compute_budget(
    measured_units: u64,
    recommended: Option<u64>,
    params: &BuildParams,
) -> ComputeBudgetPlan {
    let unit_limit = unit_budget(measured_units);
    let unit_price_micro_lamports = match (params.override_price_micro_lamports, recommended) {
        (Some(price), _) => price,
        (None, Some(recommended)) => unit_price(
            recommended,
            unit_limit,
            params.min_total_fee_lamports,
            params.priority_limit_micro_lamports,
        ),
        // Unreachable by construction: without an override the estimator ran
        (None, None) => params.default_price_micro_lamports,
    };
    ComputeBudgetPlan {
        unit_limit,
        unit_price_micro_lamports,
    }
}

/// Prefix the instruction list with the freshly planned compute budget
///
/// Final order is `[set_compute_unit_limit, set_compute_unit_price,
/// ...instructions]`.
pub fn prepend_compute_budget(
    instructions: Vec<Instruction>,
    budget: ComputeBudgetPlan,
) -> Vec<Instruction> {
    let mut out = Vec::with_capacity(instructions.len() + 2);
    out.push(ComputeBudgetInstruction::set_compute_unit_limit(
        budget.unit_limit,
    ));
    out.push(ComputeBudgetInstruction::set_compute_unit_price(
        budget.unit_price_micro_lamports,
    ));
    out.extend(instructions);
    out
}

/// Serialize the plan into unsigned transaction bytes, base58 encoded
///
/// Non-empty lookup tables compile a version-0 message against them;
/// otherwise a legacy transaction is built with fee payer and blockhash set
/// directly. Signatures stay as placeholders for the external signer.
pub fn encode_transaction(plan: TransactionPlan) -> Result<String, TxEngineError> {
    let bytes = if plan.lookup_tables.is_empty() {
        let mut tx = Transaction::new_with_payer(&plan.instructions, Some(&plan.fee_payer));
        tx.message.recent_blockhash = plan.recent_blockhash;
        bincode::serialize(&tx)
    } else {
        let message = MessageV0::try_compile(
            &plan.fee_payer,
            &plan.instructions,
            &plan.lookup_tables,
            plan.recent_blockhash,
        )
        .map_err(|e| TxEngineError::Internal(format!("message compile failed: {}", e)))?;
        let message = VersionedMessage::V0(message);
        let signature_count = message.header().num_required_signatures as usize;
        let tx = VersionedTransaction {
            signatures: vec![Signature::default(); signature_count],
            message,
        };
        bincode::serialize(&tx)
    }
    .map_err(|e| TxEngineError::Internal(format!("transaction serialization failed: {}", e)))?;

    Ok(bs58::encode(bytes).into_string())
}
