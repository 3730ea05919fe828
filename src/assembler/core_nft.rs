//! Metaplex Core NFT transfers

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};
use tracing::debug;

use crate::errors::TxEngineError;
use crate::programs::MPL_CORE_ID;

/// TransferV1 discriminator in the Core instruction set
const CORE_TRANSFER_V1: u8 = 14;

/// AssetV1 account key byte
const CORE_ASSET_KEY: u8 = 1;

/// Update-authority discriminant marking collection membership
const UPDATE_AUTHORITY_COLLECTION: u8 = 2;

/// Resolve the on-chain asset account and build its transfer
///
/// The account read both proves the asset exists and reveals whether it
/// belongs to a collection, which the transfer must name.
pub(crate) async fn resolve_core_transfer(
    rpc: &RpcClient,
    asset: &Pubkey,
    payer: &Pubkey,
    recipient: &Pubkey,
) -> Result<Instruction, TxEngineError> {
    let account = rpc.get_account(asset).await.map_err(|e| {
        TxEngineError::asset_resolution(asset, format!("asset account read failed: {}", e))
    })?;
    if account.owner != MPL_CORE_ID {
        return Err(TxEngineError::asset_resolution(
            asset,
            format!("account owned by {}, not a core asset", account.owner),
        ));
    }
    let collection = parse_collection(&account.data).ok_or_else(|| {
        TxEngineError::asset_resolution(asset, "malformed core asset account")
    })?;

    debug!(asset = %asset, collection = ?collection, "core transfer resolved");
    Ok(core_transfer_ix(asset, collection.as_ref(), payer, recipient))
}

/// Build the fixed-layout Core transfer instruction
///
/// The payer acts as the asset owner and sole signer. Optional accounts
/// not in play (authority, log wrapper, and collection when absent) follow
/// the Core convention of the program id as the empty placeholder. Data is
/// the discriminator followed by a `None` compression proof; compressed
/// Core assets are not produced by this path.
pub fn core_transfer_ix(
    asset: &Pubkey,
    collection: Option<&Pubkey>,
    payer: &Pubkey,
    recipient: &Pubkey,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new(*asset, false),
        AccountMeta::new_readonly(*collection.unwrap_or(&MPL_CORE_ID), false),
        AccountMeta::new(*payer, true),
        AccountMeta::new_readonly(MPL_CORE_ID, false),
        AccountMeta::new_readonly(*recipient, false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(MPL_CORE_ID, false),
    ];

    Instruction::new_with_bytes(MPL_CORE_ID, &[CORE_TRANSFER_V1, 0], accounts)
}

/// Collection address of an AssetV1 account, if it belongs to one
///
/// Layout prefix: key byte, owner pubkey, then the update-authority enum
/// whose collection variant carries the collection address. `None` means
/// the account is not an asset at all.
pub(crate) fn parse_collection(data: &[u8]) -> Option<Option<Pubkey>> {
    if data.len() < 34 || data[0] != CORE_ASSET_KEY {
        return None;
    }
    if data[33] != UPDATE_AUTHORITY_COLLECTION {
        return Some(None);
    }
    let bytes: [u8; 32] = data.get(34..66)?.try_into().ok()?;
    Some(Some(Pubkey::new_from_array(bytes)))
}
