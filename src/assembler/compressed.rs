//! Compressed NFT transfers: indexer resolution, canopy math, Bubblegum encoding

use std::str::FromStr;

use futures::future::try_join;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};
use tracing::debug;

use crate::das::DasClient;
use crate::errors::TxEngineError;
use crate::programs::{MPL_BUBBLEGUM_ID, SPL_ACCOUNT_COMPRESSION_ID, SPL_NOOP_ID};
use crate::types::MerkleProofBundle;

/// Anchor discriminator of the Bubblegum `transfer` instruction
const BUBBLEGUM_TRANSFER: [u8; 8] = [163, 52, 200, 231, 140, 3, 69, 186];

/// Serialized length of the concurrent-merkle-tree account header:
/// account type, header version, max buffer size, max depth, authority,
/// creation slot, padding
const TREE_HEADER_LEN: usize = 56;

/// Fixed part of the tree body: sequence number, active index, buffer size
const TREE_BODY_PREFIX_LEN: usize = 24;

/// Resolve one compressed transfer end to end
///
/// Asset metadata and proof are fetched from the indexer concurrently and
/// joined; a failure in either aborts the transfer. The canopy depth comes
/// from the on-chain tree account so the attached proof path is exactly as
/// long as the tree requires.
pub(crate) async fn resolve_compressed_transfer(
    rpc: &RpcClient,
    indexer: &DasClient,
    asset_id: &Pubkey,
    recipient: &Pubkey,
) -> Result<Instruction, TxEngineError> {
    let (asset, proof) = try_join(indexer.get_asset(asset_id), indexer.get_asset_proof(asset_id))
        .await?;

    if !asset.compression.compressed {
        return Err(TxEngineError::asset_resolution(
            asset_id,
            "asset is not compressed",
        ));
    }

    let tree = parse_key(asset_id, &proof.tree_id)?;
    let leaf_owner = parse_key(asset_id, &asset.ownership.owner)?;
    let leaf_delegate = match &asset.ownership.delegate {
        Some(delegate) => parse_key(asset_id, delegate)?,
        None => leaf_owner,
    };

    let tree_account = rpc.get_account(&tree).await.map_err(|e| {
        TxEngineError::asset_resolution(asset_id, format!("tree account read failed: {}", e))
    })?;
    let canopy_depth = canopy_depth(&tree_account.data).ok_or_else(|| {
        TxEngineError::asset_resolution(asset_id, "malformed concurrent merkle tree account")
    })?;

    let bundle = MerkleProofBundle {
        root: parse_key(asset_id, &proof.root)?.to_bytes(),
        proof: proof
            .proof
            .iter()
            .map(|node| parse_key(asset_id, node))
            .collect::<Result<Vec<_>, _>>()?,
        canopy_depth,
        data_hash: parse_key(asset_id, &asset.compression.data_hash)?.to_bytes(),
        creator_hash: parse_key(asset_id, &asset.compression.creator_hash)?.to_bytes(),
        leaf_index: asset.compression.leaf_id,
    };

    debug!(
        asset = %asset_id,
        tree = %tree,
        canopy_depth,
        proof_len = bundle.proof.len(),
        "compressed transfer resolved"
    );

    compressed_transfer_ix(&tree, &leaf_owner, &leaf_delegate, recipient, &bundle)
}

/// Build the Bubblegum transfer instruction for an already-resolved leaf
///
/// Fixed accounts first, then the canopy-truncated proof as read-only
/// non-signer remaining accounts.
pub fn compressed_transfer_ix(
    tree: &Pubkey,
    leaf_owner: &Pubkey,
    leaf_delegate: &Pubkey,
    new_leaf_owner: &Pubkey,
    bundle: &MerkleProofBundle,
) -> Result<Instruction, TxEngineError> {
    let (tree_authority, _) = Pubkey::find_program_address(&[tree.as_ref()], &MPL_BUBBLEGUM_ID);
    let proof = bundle.truncated_proof()?;

    let mut accounts = Vec::with_capacity(8 + proof.len());
    accounts.push(AccountMeta::new_readonly(tree_authority, false));
    accounts.push(AccountMeta::new_readonly(*leaf_owner, true));
    accounts.push(AccountMeta::new_readonly(*leaf_delegate, false));
    accounts.push(AccountMeta::new_readonly(*new_leaf_owner, false));
    accounts.push(AccountMeta::new(*tree, false));
    accounts.push(AccountMeta::new_readonly(SPL_NOOP_ID, false));
    accounts.push(AccountMeta::new_readonly(SPL_ACCOUNT_COMPRESSION_ID, false));
    accounts.push(AccountMeta::new_readonly(system_program::id(), false));
    accounts.extend(
        proof
            .iter()
            .map(|node| AccountMeta::new_readonly(*node, false)),
    );

    let mut data = Vec::with_capacity(8 + 32 * 3 + 8 + 4);
    data.extend_from_slice(&BUBBLEGUM_TRANSFER);
    data.extend_from_slice(&bundle.root);
    data.extend_from_slice(&bundle.data_hash);
    data.extend_from_slice(&bundle.creator_hash);
    data.extend_from_slice(&bundle.leaf_index.to_le_bytes());
    data.extend_from_slice(&(bundle.leaf_index as u32).to_le_bytes());

    Ok(Instruction {
        program_id: MPL_BUBBLEGUM_ID,
        accounts,
        data,
    })
}

/// Canopy depth of a concurrent merkle tree, from raw account data
///
/// The header stores max buffer size and max depth; everything past the
/// header and the sized tree body is canopy nodes, 32 bytes each, holding
/// `2^(depth+1) - 2` nodes for a canopy of `depth`.
pub(crate) fn canopy_depth(data: &[u8]) -> Option<u32> {
    if data.len() < TREE_HEADER_LEN {
        return None;
    }
    let max_buffer_size = u32::from_le_bytes(data[2..6].try_into().ok()?) as usize;
    let max_depth = u32::from_le_bytes(data[6..10].try_into().ok()?) as usize;
    if max_depth == 0 {
        return None;
    }

    // ChangeLog: root + path + index + padding; Path: proof + leaf + index + padding
    let change_log_len = 32 + 32 * max_depth + 8;
    let rightmost_path_len = 32 * max_depth + 32 + 8;
    let tree_body_len = TREE_BODY_PREFIX_LEN
        .checked_add(max_buffer_size.checked_mul(change_log_len)?)?
        .checked_add(rightmost_path_len)?;

    let canopy_bytes = data
        .len()
        .checked_sub(TREE_HEADER_LEN.checked_add(tree_body_len)?)?;
    let canopy_nodes = (canopy_bytes / 32) as u64;
    Some((canopy_nodes + 2).ilog2() - 1)
}

fn parse_key(asset_id: &Pubkey, value: &str) -> Result<Pubkey, TxEngineError> {
    Pubkey::from_str(value).map_err(|e| {
        TxEngineError::asset_resolution(asset_id, format!("invalid key {}: {}", value, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(proof_len: usize, canopy_depth: u32, leaf_index: u64) -> MerkleProofBundle {
        MerkleProofBundle {
            root: [3u8; 32],
            proof: (0..proof_len).map(|_| Pubkey::new_unique()).collect(),
            canopy_depth,
            data_hash: [4u8; 32],
            creator_hash: [5u8; 32],
            leaf_index,
        }
    }

    #[test]
    fn test_transfer_data_layout() {
        let tree = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let recipient = Pubkey::new_unique();

        let b = bundle(14, 0, 4242);
        let ix = compressed_transfer_ix(&tree, &owner, &owner, &recipient, &b).expect("build");

        assert_eq!(ix.program_id, MPL_BUBBLEGUM_ID);
        assert_eq!(&ix.data[..8], &BUBBLEGUM_TRANSFER);
        assert_eq!(&ix.data[8..40], &b.root);
        assert_eq!(&ix.data[40..72], &b.data_hash);
        assert_eq!(&ix.data[72..104], &b.creator_hash);
        assert_eq!(
            u64::from_le_bytes(ix.data[104..112].try_into().expect("u64")),
            4242
        );
        assert_eq!(
            u32::from_le_bytes(ix.data[112..116].try_into().expect("u32")),
            4242
        );
        assert_eq!(ix.data.len(), 116);
    }

    #[test]
    fn test_transfer_accounts_end_with_truncated_proof() {
        let tree = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let recipient = Pubkey::new_unique();

        let b = bundle(14, 5, 1);
        let ix = compressed_transfer_ix(&tree, &owner, &owner, &recipient, &b).expect("build");

        // 8 fixed accounts plus 9 proof nodes
        assert_eq!(ix.accounts.len(), 17);
        let remaining = &ix.accounts[8..];
        for (meta, node) in remaining.iter().zip(b.proof.iter()) {
            assert_eq!(meta.pubkey, *node);
            assert!(!meta.is_signer);
            assert!(!meta.is_writable);
        }

        let (expected_authority, _) =
            Pubkey::find_program_address(&[tree.as_ref()], &MPL_BUBBLEGUM_ID);
        assert_eq!(ix.accounts[0].pubkey, expected_authority);
        assert!(ix.accounts[1].is_signer);
        assert!(ix.accounts[4].is_writable);
    }

    #[test]
    fn test_transfer_rejects_over_truncation() {
        let tree = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let recipient = Pubkey::new_unique();

        let b = bundle(3, 9, 1);
        let result = compressed_transfer_ix(&tree, &owner, &owner, &recipient, &b);
        assert!(matches!(
            result,
            Err(TxEngineError::ProofTruncation { canopy: 9, proof_len: 3 })
        ));
    }

    /// Build synthetic tree account bytes for the given geometry
    fn tree_account_data(max_depth: u32, max_buffer_size: u32, canopy_depth: u32) -> Vec<u8> {
        let change_log_len = 32 + 32 * max_depth as usize + 8;
        let rightmost_path_len = 32 * max_depth as usize + 32 + 8;
        let tree_body = TREE_BODY_PREFIX_LEN
            + max_buffer_size as usize * change_log_len
            + rightmost_path_len;
        let canopy_nodes = if canopy_depth == 0 {
            0
        } else {
            (1usize << (canopy_depth + 1)) - 2
        };

        let mut data = vec![0u8; TREE_HEADER_LEN + tree_body + canopy_nodes * 32];
        data[0] = 1; // account type: concurrent merkle tree
        data[1] = 1; // header version
        data[2..6].copy_from_slice(&max_buffer_size.to_le_bytes());
        data[6..10].copy_from_slice(&max_depth.to_le_bytes());
        data
    }

    #[test]
    fn test_canopy_depth_zero() {
        let data = tree_account_data(14, 64, 0);
        assert_eq!(canopy_depth(&data), Some(0));
    }

    #[test]
    fn test_canopy_depth_nonzero() {
        for depth in [1u32, 5, 11] {
            let data = tree_account_data(20, 256, depth);
            assert_eq!(canopy_depth(&data), Some(depth), "canopy depth {}", depth);
        }
    }

    #[test]
    fn test_canopy_depth_rejects_truncated_account() {
        assert_eq!(canopy_depth(&[0u8; 10]), None);
        // Header claims a tree larger than the account data
        let mut data = vec![0u8; 100];
        data[2..6].copy_from_slice(&1024u32.to_le_bytes());
        data[6..10].copy_from_slice(&30u32.to_le_bytes());
        assert_eq!(canopy_depth(&data), None);
    }
}
