//! Proof-of-work nonce search.
//!
//! A block satisfies difficulty `D` when its hex hash starts with `D` zero
//! characters, so each extra unit of difficulty multiplies the expected work
//! by 16. The search itself is pure: it reports a [`MiningOutcome`] and leaves
//! committing the nonce to the caller.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{hasher::digest_with_nonce, Block, MiningAborted};

/// Knobs for a single nonce search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MineOptions {
    /// Give up after this many hash trials. `None` searches until a nonce is found.
    pub max_trials: Option<u64>,
    /// Spread the search over the rayon pool. The winning nonce is the same
    /// one the sequential search returns.
    pub parallel: bool,
}

/// Cooperative cancellation flag, checked between nonce trials.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MiningOutcome {
    Found { nonce: u64, hash: String, trials: u64 },
    Cancelled { trials: u64 },
    TrialsExhausted { trials: u64 },
}

impl MiningOutcome {
    /// Hash computations performed before the search stopped.
    pub fn trials(&self) -> u64 {
        match self {
            MiningOutcome::Found { trials, .. }
            | MiningOutcome::Cancelled { trials }
            | MiningOutcome::TrialsExhausted { trials } => *trials,
        }
    }

    /// `(nonce, hash)` on success.
    pub fn into_result(self) -> Result<(u64, String), MiningAborted> {
        match self {
            MiningOutcome::Found { nonce, hash, .. } => Ok((nonce, hash)),
            MiningOutcome::Cancelled { trials } => Err(MiningAborted::Cancelled { trials }),
            MiningOutcome::TrialsExhausted { trials } => {
                Err(MiningAborted::TrialsExhausted { trials })
            }
        }
    }
}

/// Searches nonces upward from 0 for the smallest one whose hash has at
/// least `difficulty` leading zero hex digits. The block is not modified.
pub fn mine(
    block: &Block,
    difficulty: u32,
    options: &MineOptions,
    cancel: Option<&CancelToken>,
) -> MiningOutcome {
    let outcome = if options.parallel {
        search_parallel(block, difficulty, options, cancel)
    } else {
        search(block, difficulty, options, cancel)
    };

    match &outcome {
        MiningOutcome::Found { nonce, hash, trials } => info!(
            "Mined block {} with nonce {} and hash {} after {} trials",
            block.index(),
            nonce,
            hash,
            trials
        ),
        MiningOutcome::Cancelled { trials } => {
            warn!("Mining of block {} cancelled after {} trials", block.index(), trials)
        }
        MiningOutcome::TrialsExhausted { trials } => warn!(
            "Mining of block {} gave up after {} trials at difficulty {}",
            block.index(),
            trials,
            difficulty
        ),
    }
    outcome
}

fn search(
    block: &Block,
    difficulty: u32,
    options: &MineOptions,
    cancel: Option<&CancelToken>,
) -> MiningOutcome {
    let algorithm = block.algorithm();
    let prefix = block.canonical_prefix();
    let mut scratch = Vec::with_capacity(prefix.len() + 8);
    let limit = options.max_trials.unwrap_or(u64::MAX);

    for nonce in 0..limit {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return MiningOutcome::Cancelled { trials: nonce };
        }
        let digest = digest_with_nonce(algorithm, &prefix, nonce, &mut scratch);
        if digest.meets_difficulty(difficulty) {
            return MiningOutcome::Found {
                nonce,
                hash: digest.to_hex(),
                trials: nonce + 1,
            };
        }
    }
    MiningOutcome::TrialsExhausted { trials: limit }
}

fn search_parallel(
    block: &Block,
    difficulty: u32,
    options: &MineOptions,
    cancel: Option<&CancelToken>,
) -> MiningOutcome {
    let algorithm = block.algorithm();
    let prefix = block.canonical_prefix();
    let limit = options.max_trials.unwrap_or(u64::MAX);
    let trials = AtomicU64::new(0);

    // `find_map_first` resolves every lower nonce before settling, so a hit is
    // the smallest solving nonce and a cancellation marker wins over later hits.
    let hit = (0..limit)
        .into_par_iter()
        .map_init(
            || Vec::with_capacity(prefix.len() + 8),
            |scratch, nonce| {
                if cancel.is_some_and(CancelToken::is_cancelled) {
                    return Some(None);
                }
                trials.fetch_add(1, Ordering::Relaxed);
                let digest = digest_with_nonce(algorithm, &prefix, nonce, scratch);
                digest
                    .meets_difficulty(difficulty)
                    .then_some(Some((nonce, digest)))
            },
        )
        .find_map_first(|hit| hit);

    let trials = trials.into_inner();
    match hit {
        Some(Some((nonce, digest))) => MiningOutcome::Found {
            nonce,
            hash: digest.to_hex(),
            trials,
        },
        Some(None) => MiningOutcome::Cancelled { trials },
        None => MiningOutcome::TrialsExhausted { trials },
    }
}
