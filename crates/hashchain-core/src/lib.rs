//! Core of a single-node, append-only hash chain with proof-of-work.
//!
//! A [`Chain`] starts from an unmined genesis block. Every appended [`Block`]
//! references the hash of its predecessor and carries a nonce found by the
//! miner in [`mine`], so altering committed content is detectable with
//! [`Chain::validate`].

pub mod block;
pub mod chain;
pub mod config;
pub mod constants;
pub mod error;
pub mod hasher;
pub mod mine;
pub mod render;
pub mod transaction;

pub use block::Block;
pub use chain::{Chain, ChainSnapshot, Violation, ViolationKind};
pub use config::ChainConfig;
pub use error::{LedgerError, MiningAborted, Result};
pub use hasher::{meets_difficulty, Digest, HashAlgorithm};
pub use mine::{CancelToken, MineOptions, MiningOutcome};
pub use transaction::Transaction;

/// Milliseconds since the unix epoch. A clock set before 1970 reads as 0.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
