//! Native SOL transfers, plain and wrapped

use solana_sdk::{instruction::Instruction, pubkey::Pubkey, system_instruction};
use spl_associated_token_account::{
    get_associated_token_address_with_program_id,
    instruction::create_associated_token_account_idempotent,
};

use crate::errors::TxEngineError;

/// Build the instructions for one native transfer
///
/// Plain delivery is a single system transfer. Wrapped delivery is exactly
/// `[create-ata-idempotent, system-transfer, sync-native]`; a sync issued
/// before the transfer lands would be silently incorrect on-chain, so the
/// order here is load-bearing.
pub fn native_transfer_ixs(
    from: &Pubkey,
    recipient: &Pubkey,
    lamports: u64,
    wrapped: bool,
) -> Result<Vec<Instruction>, TxEngineError> {
    if !wrapped {
        return Ok(vec![system_instruction::transfer(from, recipient, lamports)]);
    }

    let wsol_mint = spl_token::native_mint::id();
    let token_program = spl_token::id();
    let recipient_ata =
        get_associated_token_address_with_program_id(recipient, &wsol_mint, &token_program);

    let sync = spl_token::instruction::sync_native(&token_program, &recipient_ata)
        .map_err(|e| TxEngineError::Internal(format!("sync_native build failed: {}", e)))?;

    Ok(vec![
        create_associated_token_account_idempotent(from, recipient, &wsol_mint, &token_program),
        system_instruction::transfer(from, &recipient_ata, lamports),
        sync,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::system_program;

    #[test]
    fn test_plain_transfer_is_single_system_instruction() {
        let from = Pubkey::new_unique();
        let to = Pubkey::new_unique();

        let ixs = native_transfer_ixs(&from, &to, 1_000_000, false).expect("build");
        assert_eq!(ixs.len(), 1);
        assert_eq!(ixs[0].program_id, system_program::id());
    }

    #[test]
    fn test_wrapped_transfer_order() {
        let from = Pubkey::new_unique();
        let to = Pubkey::new_unique();

        let ixs = native_transfer_ixs(&from, &to, 1_000_000, true).expect("build");
        assert_eq!(ixs.len(), 3);

        // create-ata-idempotent, then system transfer, then sync-native
        assert_eq!(ixs[0].program_id, spl_associated_token_account::id());
        assert_eq!(ixs[0].data, vec![1]);
        assert_eq!(ixs[1].program_id, system_program::id());
        assert_eq!(ixs[2].program_id, spl_token::id());
        // SyncNative is token instruction 17
        assert_eq!(ixs[2].data, vec![17]);
    }

    #[test]
    fn test_wrapped_transfer_targets_recipient_ata() {
        let from = Pubkey::new_unique();
        let to = Pubkey::new_unique();
        let ata = get_associated_token_address_with_program_id(
            &to,
            &spl_token::native_mint::id(),
            &spl_token::id(),
        );

        let ixs = native_transfer_ixs(&from, &to, 42, true).expect("build");
        // System transfer destination and sync target are the same ATA
        assert_eq!(ixs[1].accounts[1].pubkey, ata);
        assert_eq!(ixs[2].accounts[0].pubkey, ata);
    }
}
