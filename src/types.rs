//! Core data model for transfer descriptors and transaction planning

use solana_sdk::{
    address_lookup_table::AddressLookupTableAccount, hash::Hash, instruction::Instruction,
    pubkey::Pubkey,
};

use crate::errors::TxEngineError;

/// A logical "transfer asset X to B" request
///
/// The sender is supplied separately to [`crate::assembler::InstructionAssembler::assemble`],
/// so one call can carry transfers to several recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetTransfer {
    /// Wallet that receives the asset
    pub recipient: Pubkey,

    /// What is being transferred
    pub kind: AssetKind,
}

/// Closed set of asset shapes the assembler knows how to move
///
/// Matching on this enum is always exhaustive; there is no open-ended
/// "unknown asset" escape hatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetKind {
    /// Native SOL, optionally delivered as wrapped SOL into the
    /// recipient's associated token account
    NativeCoin { lamports: u64, wrapped: bool },

    /// SPL token (legacy or Token-2022) in integer base units
    ///
    /// `token_program` is an optional caller hint; when absent the owning
    /// program is resolved by reading the mint account. Plain NFT mints
    /// routed through this path use `amount: 1, decimals: 0`.
    FungibleToken {
        mint: Pubkey,
        token_program: Option<Pubkey>,
        decimals: u8,
        amount: u64,
    },

    /// Compressed NFT whose state lives in a concurrent merkle tree,
    /// identified by its asset id at the indexer
    CompressedNft { asset_id: Pubkey },

    /// Metaplex Core NFT held in a single on-chain account
    CoreNft { asset: Pubkey },
}

impl AssetTransfer {
    /// Plain SOL transfer
    pub fn native(recipient: Pubkey, lamports: u64) -> Self {
        Self {
            recipient,
            kind: AssetKind::NativeCoin {
                lamports,
                wrapped: false,
            },
        }
    }

    /// SOL delivered as wrapped SOL into the recipient's token account
    pub fn wrapped_native(recipient: Pubkey, lamports: u64) -> Self {
        Self {
            recipient,
            kind: AssetKind::NativeCoin {
                lamports,
                wrapped: true,
            },
        }
    }

    /// Fungible token transfer in base units
    pub fn fungible(recipient: Pubkey, mint: Pubkey, amount: u64, decimals: u8) -> Self {
        Self {
            recipient,
            kind: AssetKind::FungibleToken {
                mint,
                token_program: None,
                decimals,
                amount,
            },
        }
    }

    /// Compressed NFT transfer, always quantity 1
    pub fn compressed_nft(recipient: Pubkey, asset_id: Pubkey) -> Self {
        Self {
            recipient,
            kind: AssetKind::CompressedNft { asset_id },
        }
    }

    /// Core NFT transfer, always quantity 1
    pub fn core_nft(recipient: Pubkey, asset: Pubkey) -> Self {
        Self {
            recipient,
            kind: AssetKind::CoreNft { asset },
        }
    }
}

/// Compute budget derived for one build call
///
/// Both values are recomputed on every call and expressed as the first two
/// instructions of the final list, limit before price. Callers never supply
/// these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeBudgetPlan {
    /// Compute unit ceiling requested from the runtime
    pub unit_limit: u32,

    /// Price per compute unit in micro-lamports
    pub unit_price_micro_lamports: u64,
}

/// One recent prioritization-fee observation from the cluster
///
/// Consumed as an ordered sequence for the median computation, then dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityFeeSample {
    pub slot: u64,
    pub fee_micro_lamports_per_cu: u64,
}

/// Fully-assembled transaction awaiting serialization
///
/// Constructed once per build call and consumed exactly once by the
/// serializer. Non-empty `lookup_tables` forces version-0 encoding,
/// otherwise the legacy format is used.
#[derive(Debug, Clone)]
pub struct TransactionPlan {
    pub instructions: Vec<Instruction>,
    pub fee_payer: Pubkey,
    pub recent_blockhash: Hash,
    pub lookup_tables: Vec<AddressLookupTableAccount>,
}

/// Merkle proof material for one compressed-NFT leaf
///
/// Fetched from the indexer and truncated by the on-chain canopy depth
/// before the proof path is attached as remaining accounts.
#[derive(Debug, Clone)]
pub struct MerkleProofBundle {
    pub root: [u8; 32],
    pub proof: Vec<Pubkey>,
    pub canopy_depth: u32,
    pub data_hash: [u8; 32],
    pub creator_hash: [u8; 32],
    pub leaf_index: u64,
}

impl MerkleProofBundle {
    /// Proof path with the canopy-resident tail removed
    ///
    /// The kept length equals tree depth minus canopy depth. Asking to
    /// truncate more entries than the proof holds is a fatal error, not a
    /// silent empty proof.
    pub fn truncated_proof(&self) -> Result<&[Pubkey], TxEngineError> {
        let keep = self
            .proof
            .len()
            .checked_sub(self.canopy_depth as usize)
            .ok_or(TxEngineError::ProofTruncation {
                canopy: self.canopy_depth,
                proof_len: self.proof.len(),
            })?;
        Ok(&self.proof[..keep])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(proof_len: usize, canopy_depth: u32) -> MerkleProofBundle {
        MerkleProofBundle {
            root: [0u8; 32],
            proof: (0..proof_len).map(|_| Pubkey::new_unique()).collect(),
            canopy_depth,
            data_hash: [1u8; 32],
            creator_hash: [2u8; 32],
            leaf_index: 7,
        }
    }

    #[test]
    fn test_truncated_proof_keeps_depth_minus_canopy() {
        let b = bundle(14, 5);
        let truncated = b.truncated_proof().expect("valid truncation");
        assert_eq!(truncated.len(), 9);
        assert_eq!(truncated, &b.proof[..9]);
    }

    #[test]
    fn test_truncated_proof_zero_canopy_is_identity() {
        let b = bundle(14, 0);
        assert_eq!(b.truncated_proof().expect("valid").len(), 14);
    }

    #[test]
    fn test_truncated_proof_canopy_exceeds_proof() {
        let b = bundle(3, 4);
        match b.truncated_proof() {
            Err(TxEngineError::ProofTruncation { canopy, proof_len }) => {
                assert_eq!(canopy, 4);
                assert_eq!(proof_len, 3);
            }
            other => panic!("expected ProofTruncation, got {:?}", other),
        }
    }

    #[test]
    fn test_transfer_constructors() {
        let recipient = Pubkey::new_unique();
        let t = AssetTransfer::wrapped_native(recipient, 5000);
        assert!(matches!(
            t.kind,
            AssetKind::NativeCoin {
                lamports: 5000,
                wrapped: true
            }
        ));

        let mint = Pubkey::new_unique();
        let t = AssetTransfer::fungible(recipient, mint, 1_500_000, 6);
        match t.kind {
            AssetKind::FungibleToken {
                mint: m,
                token_program,
                decimals,
                amount,
            } => {
                assert_eq!(m, mint);
                assert!(token_program.is_none());
                assert_eq!(decimals, 6);
                assert_eq!(amount, 1_500_000);
            }
            _ => panic!("expected fungible"),
        }
    }
}
