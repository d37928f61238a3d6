//! Content addressing for blocks.
//!
//! A block is hashed over an explicit, fixed-order byte encoding of its fields
//! (see [`canonical_prefix`]) so two blocks with the same logical content hash
//! identically on every run and platform.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256, Sha512_256};
use thiserror::Error;

use crate::{
    constants::{HASH_HEX_SIZE, HASH_SIZE},
    Transaction,
};

/// A 256-bit digest produced by one of the [`HashAlgorithm`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Digest([u8; HASH_SIZE]);

impl Digest {
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Number of leading `'0'` characters in the hex form.
    pub fn leading_zero_nibbles(&self) -> u32 {
        let mut total = 0u32;
        for b in self.0 {
            if b == 0 {
                total += 2;
            } else {
                if b >> 4 == 0 {
                    total += 1;
                }
                break;
            }
        }
        total
    }

    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        self.leading_zero_nibbles() >= difficulty
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// `hash.startswith('0' * difficulty)` over a hex-encoded hash.
pub fn meets_difficulty(hex_hash: &str, difficulty: u32) -> bool {
    let difficulty = difficulty as usize;
    difficulty <= hex_hash.len() && hex_hash.bytes().take(difficulty).all(|c| c == b'0')
}

/// Digest functions a chain can be configured with. All of them yield
/// [`HASH_SIZE`] bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha512_256,
    Blake3,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 3] = [
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha512_256,
        HashAlgorithm::Blake3,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512_256 => "sha512_256",
            HashAlgorithm::Blake3 => "blake3",
        }
    }

    /// The raw byte-sequence-to-digest primitive.
    pub fn digest(&self, bytes: &[u8]) -> Digest {
        let mut out = [0u8; HASH_SIZE];
        match self {
            HashAlgorithm::Sha256 => out.copy_from_slice(&Sha256::digest(bytes)),
            HashAlgorithm::Sha512_256 => out.copy_from_slice(&Sha512_256::digest(bytes)),
            HashAlgorithm::Blake3 => out = *blake3::hash(bytes).as_bytes(),
        }
        Digest(out)
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown hash algorithm `{0}` (expected sha256, sha512_256 or blake3)")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for HashAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HashAlgorithm::ALL
            .into_iter()
            .find(|alg| alg.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownAlgorithm(s.to_string()))
    }
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u64).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

/// Canonical encoding of every hashed block field except the nonce, which is
/// always the trailing 8 bytes. Field order: index, timestamp, transaction
/// count, transactions (sender, receiver, amount), previous hash.
pub fn canonical_prefix(
    index: u64,
    timestamp: u64,
    transactions: &[Transaction],
    previous_hash: &str,
) -> Vec<u8> {
    let tx_bytes: usize = transactions
        .iter()
        .map(|t| 24 + t.sender().len() + t.receiver().len())
        .sum();
    let mut buf = Vec::with_capacity(8 * 3 + tx_bytes + 8 + HASH_HEX_SIZE + 8);
    buf.extend_from_slice(&index.to_le_bytes());
    buf.extend_from_slice(&timestamp.to_le_bytes());
    buf.extend_from_slice(&(transactions.len() as u64).to_le_bytes());
    for tx in transactions {
        put_str(&mut buf, tx.sender());
        put_str(&mut buf, tx.receiver());
        buf.extend_from_slice(&tx.amount().to_le_bytes());
    }
    put_str(&mut buf, previous_hash);
    buf
}

/// Hashes a canonical prefix followed by `nonce`. `scratch` is reused across
/// calls so the mining loop does not allocate per trial.
pub fn digest_with_nonce(
    algorithm: HashAlgorithm,
    prefix: &[u8],
    nonce: u64,
    scratch: &mut Vec<u8>,
) -> Digest {
    scratch.clear();
    scratch.extend_from_slice(prefix);
    scratch.extend_from_slice(&nonce.to_le_bytes());
    algorithm.digest(scratch)
}
