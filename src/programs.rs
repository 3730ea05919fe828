//! Well-known program ids the engine targets
//!
//! Token program ids come from their SPL crates; the ids below are for
//! programs without a maintained Rust SDK in this dependency set.

use solana_sdk::{pubkey, pubkey::Pubkey};

/// Metaplex Bubblegum, owner of compressed-NFT merkle leaves
pub const MPL_BUBBLEGUM_ID: Pubkey = pubkey!("BGUMAp9Gq7iTEuizy4pqaxsTyUCBK68MDr8DVdpeG9n");

/// Metaplex Core, owner of single-account "core" NFT assets
pub const MPL_CORE_ID: Pubkey = pubkey!("CoREENxT6tW1HoK8ypY1SxRMZTcVPm7R94rH4PZNhX7d");

/// SPL account compression, executes merkle tree mutations
pub const SPL_ACCOUNT_COMPRESSION_ID: Pubkey =
    pubkey!("cmtDvXumGCrqC1Age74AVPhSRVXJMd8PJS91L8KbNCK");

/// SPL noop, the change log wrapper used by account compression
pub const SPL_NOOP_ID: Pubkey = pubkey!("noopb9bkMVfRPU8AsbpTUg8AQkHtKwMYZiFUjNRtMmV");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_ids_are_distinct() {
        let ids = [
            MPL_BUBBLEGUM_ID,
            MPL_CORE_ID,
            SPL_ACCOUNT_COMPRESSION_ID,
            SPL_NOOP_ID,
            spl_token::id(),
            spl_token_2022::id(),
        ];
        for (i, a) in ids.iter().enumerate() {
            for b in ids.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
