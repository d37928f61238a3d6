use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("mining aborted: {0}")]
    MiningAborted(#[from] MiningAborted),

    #[error("block index space exhausted")]
    IndexExhausted,

    #[error("failed to read config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    ConfigFormat(#[from] serde_json::Error),
}

/// Why a nonce search stopped without a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MiningAborted {
    #[error("cancelled after {trials} trials")]
    Cancelled { trials: u64 },

    #[error("no solution within {trials} trials")]
    TrialsExhausted { trials: u64 },
}
