//! SPL token transfers across both token program generations

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use spl_associated_token_account::{
    get_associated_token_address_with_program_id, instruction::create_associated_token_account,
};

use crate::errors::TxEngineError;

/// Read the mint account and return its owning token program
///
/// Both the legacy token program and Token-2022 are accepted; any other
/// owner means the address is not a token mint this engine can move.
pub(crate) async fn resolve_token_program(
    rpc: &RpcClient,
    mint: &Pubkey,
) -> Result<Pubkey, TxEngineError> {
    let account = rpc
        .get_account(mint)
        .await
        .map_err(|e| TxEngineError::asset_resolution(mint, format!("mint read failed: {}", e)))?;

    if account.owner == spl_token::id() || account.owner == spl_token_2022::id() {
        Ok(account.owner)
    } else {
        Err(TxEngineError::asset_resolution(
            mint,
            format!("unsupported token program {}", account.owner),
        ))
    }
}

/// Build the instructions for one fungible transfer
///
/// Emits the destination ATA creation only when the caller has established
/// the account is missing, then a single transfer-checked carrying the
/// mint's decimals. NFT mints routed through this path pass amount 1 and
/// decimals 0.
pub fn fungible_transfer_ixs(
    from: &Pubkey,
    recipient: &Pubkey,
    mint: &Pubkey,
    token_program: &Pubkey,
    decimals: u8,
    amount: u64,
    destination_exists: bool,
) -> Result<Vec<Instruction>, TxEngineError> {
    let source = get_associated_token_address_with_program_id(from, mint, token_program);
    let destination = get_associated_token_address_with_program_id(recipient, mint, token_program);

    let mut instructions = Vec::with_capacity(2);
    if !destination_exists {
        instructions.push(create_associated_token_account(
            from,
            recipient,
            mint,
            token_program,
        ));
    }

    // The Token-2022 builder accepts either token program id
    let transfer = spl_token_2022::instruction::transfer_checked(
        token_program,
        &source,
        mint,
        &destination,
        from,
        &[],
        amount,
        decimals,
    )
    .map_err(|e| TxEngineError::Internal(format!("transfer_checked build failed: {}", e)))?;
    instructions.push(transfer);

    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_destination_yields_single_transfer() {
        let from = Pubkey::new_unique();
        let to = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let ixs = fungible_transfer_ixs(&from, &to, &mint, &spl_token::id(), 6, 1_500_000, true)
            .expect("build");
        assert_eq!(ixs.len(), 1);
        assert_eq!(ixs[0].program_id, spl_token::id());
    }

    #[test]
    fn test_missing_destination_prepends_ata_creation() {
        let from = Pubkey::new_unique();
        let to = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let ixs = fungible_transfer_ixs(&from, &to, &mint, &spl_token::id(), 6, 1_500_000, false)
            .expect("build");
        assert_eq!(ixs.len(), 2);
        assert_eq!(ixs[0].program_id, spl_associated_token_account::id());
        // Non-idempotent create: discriminator 0 encoded as empty data
        assert!(ixs[0].data.is_empty() || ixs[0].data == vec![0]);
        assert_eq!(ixs[1].program_id, spl_token::id());
    }

    #[test]
    fn test_transfer_checked_payload() {
        let from = Pubkey::new_unique();
        let to = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let ixs = fungible_transfer_ixs(&from, &to, &mint, &spl_token::id(), 6, 1_500_000, true)
            .expect("build");
        let data = &ixs[0].data;
        // TransferChecked is token instruction 12: tag, u64 amount, u8 decimals
        assert_eq!(data[0], 12);
        assert_eq!(u64::from_le_bytes(data[1..9].try_into().expect("u64")), 1_500_000);
        assert_eq!(data[9], 6);
    }

    #[test]
    fn test_token_2022_program_is_threaded_through() {
        let from = Pubkey::new_unique();
        let to = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let ixs =
            fungible_transfer_ixs(&from, &to, &mint, &spl_token_2022::id(), 0, 1, false)
                .expect("build");
        assert_eq!(ixs.len(), 2);
        assert_eq!(ixs[1].program_id, spl_token_2022::id());

        // The created ATA must be derived against the same token program
        let expected =
            get_associated_token_address_with_program_id(&to, &mint, &spl_token_2022::id());
        assert!(ixs[0].accounts.iter().any(|m| m.pubkey == expected));
    }
}
