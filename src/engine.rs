//! Wallet-facing facade wiring the pipeline together

use std::sync::Arc;
use std::time::Duration;

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    address_lookup_table::AddressLookupTableAccount, instruction::Instruction, pubkey::Pubkey,
};

use crate::assembler::InstructionAssembler;
use crate::builder::{BuildParams, SmartTransactionBuilder};
use crate::config::{EngineConfig, FeeSettings};
use crate::das::DasClient;
use crate::errors::TxEngineError;
use crate::types::AssetTransfer;

/// One engine instance per configured cluster
///
/// Holds the RPC connection handle explicitly; there is no ambient or
/// global connection state, and no caching between builds.
pub struct TransferEngine {
    assembler: InstructionAssembler,
    builder: SmartTransactionBuilder,
    fees: FeeSettings,
}

impl TransferEngine {
    pub fn new(config: &EngineConfig) -> Result<Self, TxEngineError> {
        let rpc = Arc::new(RpcClient::new_with_timeout_and_commitment(
            config.rpc.endpoint.clone(),
            Duration::from_secs(config.rpc.timeout_secs),
            config.rpc.commitment(),
        ));
        let indexer = DasClient::new(&config.indexer)?;

        Ok(Self {
            assembler: InstructionAssembler::new(Arc::clone(&rpc), indexer),
            builder: SmartTransactionBuilder::new(rpc),
            fees: config.fees.clone(),
        })
    }

    /// Assemble `transfers` from `from` and build the serialized
    /// transaction in one call
    ///
    /// The prioritization-fee query is scoped to the writable accounts of
    /// the assembled instructions. An override price skips fee estimation.
    pub async fn build_transfer_transaction(
        &self,
        from: &Pubkey,
        transfers: &[AssetTransfer],
        lookup_tables: Vec<AddressLookupTableAccount>,
        override_price_micro_lamports: Option<u64>,
    ) -> Result<String, TxEngineError> {
        let instructions = self.assembler.assemble(from, transfers).await?;

        let mut params =
            BuildParams::from_fee_settings(&self.fees, writable_account_keys(&instructions));
        params.override_price_micro_lamports = override_price_micro_lamports;

        self.builder
            .build(instructions, from, lookup_tables, &params)
            .await
    }

    /// Direct access to the assembler for callers that post-process
    /// instructions before building
    pub fn assembler(&self) -> &InstructionAssembler {
        &self.assembler
    }

    /// Direct access to the builder for callers with pre-assembled
    /// instructions
    pub fn builder(&self) -> &SmartTransactionBuilder {
        &self.builder
    }
}

/// Unique writable account keys of an instruction list, in first-seen order
pub(crate) fn writable_account_keys(instructions: &[Instruction]) -> Vec<Pubkey> {
    let mut keys = Vec::new();
    for ix in instructions {
        for meta in &ix.accounts {
            if meta.is_writable && !keys.contains(&meta.pubkey) {
                keys.push(meta.pubkey);
            }
        }
    }
    keys
}
