//! Solana smart-transaction construction engine
//!
//! Turns logical asset transfers (native SOL, SPL tokens, compressed NFTs,
//! core NFTs) into a serialized, unsigned Solana transaction: instruction
//! assembly with conditional account creation and merkle-proof resolution,
//! compute metering via cluster simulation, priority fee estimation from
//! recent validator data, and legacy or version-0 serialization depending
//! on address-lookup table usage.
//!
//! Signing and submission are external: the output is a base58 payload for
//! an Ed25519 signer and any Solana-compatible RPC endpoint.

pub mod assembler;
pub mod builder;
pub mod compute;
pub mod config;
pub mod das;
pub mod engine;
pub mod errors;
pub mod fees;
pub mod programs;
pub mod router;
pub mod telemetry;
pub mod types;

pub use builder::{BuildParams, SmartTransactionBuilder};
pub use config::EngineConfig;
pub use engine::TransferEngine;
pub use errors::TxEngineError;
pub use types::{AssetKind, AssetTransfer};

// Re-export commonly used types
pub use solana_sdk::{message::VersionedMessage, pubkey::Pubkey, signature::Signature};
