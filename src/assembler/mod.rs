//! Instruction assembly for logical asset transfers
//!
//! Turns a list of [`AssetTransfer`] descriptors into the ordered
//! instruction list the builder wraps into a transaction. Descriptors are
//! processed strictly in input order and their instructions concatenated;
//! nothing is reordered or batched across descriptors.
//!
//! Network reads happen only where resolution demands them: mint owner and
//! destination-account existence for fungible transfers, indexer asset and
//! proof plus the on-chain tree account for compressed NFTs, the asset
//! account for core NFTs. The native path is pure construction.

mod compressed;
mod core_nft;
mod fungible;
mod native;

pub use compressed::compressed_transfer_ix;
pub use core_nft::core_transfer_ix;
pub use fungible::fungible_transfer_ixs;
pub use native::native_transfer_ixs;

use std::sync::Arc;

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use tracing::debug;

use crate::das::DasClient;
use crate::errors::TxEngineError;
use crate::types::{AssetKind, AssetTransfer};

/// Assembles transfer descriptors into on-chain instructions
pub struct InstructionAssembler {
    rpc: Arc<RpcClient>,
    indexer: DasClient,
}

impl InstructionAssembler {
    pub fn new(rpc: Arc<RpcClient>, indexer: DasClient) -> Self {
        Self { rpc, indexer }
    }

    /// Build the full instruction list for `transfers` sent by `from`
    ///
    /// Fails with `Validation` on an empty descriptor list and with
    /// `AssetResolution` when NFT or mint data cannot be resolved.
    pub async fn assemble(
        &self,
        from: &Pubkey,
        transfers: &[AssetTransfer],
    ) -> Result<Vec<Instruction>, TxEngineError> {
        if transfers.is_empty() {
            return Err(TxEngineError::validation("transfer list is empty"));
        }

        let mut instructions = Vec::new();
        for transfer in transfers {
            match &transfer.kind {
                AssetKind::NativeCoin { lamports, wrapped } => {
                    instructions.extend(native::native_transfer_ixs(
                        from,
                        &transfer.recipient,
                        *lamports,
                        *wrapped,
                    )?);
                }
                AssetKind::FungibleToken {
                    mint,
                    token_program,
                    decimals,
                    amount,
                } => {
                    instructions.extend(
                        self.assemble_fungible(
                            from,
                            &transfer.recipient,
                            mint,
                            token_program.as_ref(),
                            *decimals,
                            *amount,
                        )
                        .await?,
                    );
                }
                AssetKind::CompressedNft { asset_id } => {
                    instructions.push(
                        compressed::resolve_compressed_transfer(
                            &self.rpc,
                            &self.indexer,
                            asset_id,
                            &transfer.recipient,
                        )
                        .await?,
                    );
                }
                AssetKind::CoreNft { asset } => {
                    instructions.push(
                        core_nft::resolve_core_transfer(
                            &self.rpc,
                            asset,
                            from,
                            &transfer.recipient,
                        )
                        .await?,
                    );
                }
            }
        }

        debug!(
            transfers = transfers.len(),
            instructions = instructions.len(),
            "assembled transfer instructions"
        );
        Ok(instructions)
    }

    async fn assemble_fungible(
        &self,
        from: &Pubkey,
        recipient: &Pubkey,
        mint: &Pubkey,
        token_program_hint: Option<&Pubkey>,
        decimals: u8,
        amount: u64,
    ) -> Result<Vec<Instruction>, TxEngineError> {
        let token_program = match token_program_hint {
            Some(program) => *program,
            None => fungible::resolve_token_program(&self.rpc, mint).await?,
        };

        let destination = spl_associated_token_account::get_associated_token_address_with_program_id(
            recipient,
            mint,
            &token_program,
        );
        let destination_exists = self
            .rpc
            .get_account_with_commitment(&destination, self.rpc.commitment())
            .await
            .map_err(|e| TxEngineError::Rpc(format!("destination account read failed: {}", e)))?
            .value
            .is_some();

        debug!(
            mint = %mint,
            token_program = %token_program,
            destination_exists,
            "fungible transfer resolved"
        );

        fungible::fungible_transfer_ixs(
            from,
            recipient,
            mint,
            &token_program,
            decimals,
            amount,
            destination_exists,
        )
    }
}
