//! Compute unit measurement via cluster simulation

use std::sync::Arc;

use solana_client::{
    nonblocking::rpc_client::RpcClient, rpc_config::RpcSimulateTransactionConfig,
};
use solana_sdk::{
    address_lookup_table::AddressLookupTableAccount,
    compute_budget::ComputeBudgetInstruction,
    hash::Hash,
    instruction::{Instruction, InstructionError},
    message::{v0::Message as MessageV0, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    transaction::{TransactionError, VersionedTransaction},
};
use tracing::debug;

use crate::errors::TxEngineError;

/// Hard runtime ceiling on a transaction's compute units
pub const MAX_COMPUTE_UNIT_LIMIT: u32 = 1_400_000;

/// Measures real compute consumption of an instruction list
pub struct ComputeUnitEstimator {
    rpc: Arc<RpcClient>,
}

impl ComputeUnitEstimator {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self { rpc }
    }

    /// Simulate the instruction list and return the consumed compute units
    ///
    /// The throwaway transaction carries a maximum compute-limit
    /// instruction so program logic is never capped during measurement, a
    /// constant placeholder blockhash (the cluster substitutes a real one),
    /// and placeholder signatures with verification disabled.
    pub async fn estimate(
        &self,
        instructions: &[Instruction],
        payer: &Pubkey,
        lookup_tables: &[AddressLookupTableAccount],
    ) -> Result<u64, TxEngineError> {
        let probe = simulation_instructions(instructions);
        let message = MessageV0::try_compile(payer, &probe, lookup_tables, Hash::default())
            .map_err(|e| {
                TxEngineError::Simulation(format!("simulation message compile failed: {}", e))
            })?;
        let message = VersionedMessage::V0(message);
        let signature_count = message.header().num_required_signatures as usize;
        let transaction = VersionedTransaction {
            signatures: vec![Signature::default(); signature_count],
            message,
        };

        let config = RpcSimulateTransactionConfig {
            sig_verify: false,
            replace_recent_blockhash: true,
            commitment: Some(self.rpc.commitment()),
            ..RpcSimulateTransactionConfig::default()
        };

        let result = self
            .rpc
            .simulate_transaction_with_config(&transaction, config)
            .await
            .map_err(|e| TxEngineError::Simulation(format!("simulation rpc failed: {}", e)))?;

        if let Some(err) = result.value.err {
            return Err(decode_simulation_error(&err, instructions));
        }

        let units = result
            .value
            .units_consumed
            .ok_or(TxEngineError::EstimationUnavailable)?;
        debug!(units, "compute unit simulation succeeded");
        Ok(units)
    }
}

/// Instruction list submitted for measurement: an uncapping limit
/// instruction followed by the caller's instructions unchanged
pub(crate) fn simulation_instructions(instructions: &[Instruction]) -> Vec<Instruction> {
    let mut probe = Vec::with_capacity(instructions.len() + 1);
    probe.push(ComputeBudgetInstruction::set_compute_unit_limit(
        MAX_COMPUTE_UNIT_LIMIT,
    ));
    probe.extend_from_slice(instructions);
    probe
}

/// Map a simulated execution failure to the structured taxonomy
///
/// Custom program errors resolve the offending program through the
/// instruction index, shifted by one for the injected limit instruction.
fn decode_simulation_error(
    err: &TransactionError,
    instructions: &[Instruction],
) -> TxEngineError {
    if let TransactionError::InstructionError(index, InstructionError::Custom(code)) = err {
        let program = (*index as usize)
            .checked_sub(1)
            .and_then(|i| instructions.get(i))
            .map(|ix| ix.program_id)
            .unwrap_or_else(solana_sdk::compute_budget::id);
        return TxEngineError::ProgramFailure {
            program,
            code: *code,
        };
    }
    TxEngineError::Simulation(format!("transaction error: {:?}", err))
}
