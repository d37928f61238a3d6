use serde::{Deserialize, Serialize};

use crate::{
    hasher::{canonical_prefix, digest_with_nonce},
    HashAlgorithm, Transaction,
};

/// One link of the chain.
///
/// The stored `hash` is a cache of the digest over the other fields. It is
/// only ever rewritten when a mined nonce is committed, so validation always
/// recomputes it instead of trusting it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    index: u64,
    timestamp: u64,
    transactions: Vec<Transaction>,
    previous_hash: String,
    nonce: u64,
    hash: String,
    #[serde(default)]
    algorithm: HashAlgorithm,
}

impl Block {
    /// Builds a block hashed with the default algorithm.
    pub fn new(
        index: u64,
        timestamp: u64,
        transactions: Vec<Transaction>,
        previous_hash: impl Into<String>,
        nonce: u64,
    ) -> Self {
        Self::with_algorithm(
            HashAlgorithm::default(),
            index,
            timestamp,
            transactions,
            previous_hash,
            nonce,
        )
    }

    pub fn with_algorithm(
        algorithm: HashAlgorithm,
        index: u64,
        timestamp: u64,
        transactions: Vec<Transaction>,
        previous_hash: impl Into<String>,
        nonce: u64,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp,
            transactions,
            previous_hash: previous_hash.into(),
            nonce,
            hash: String::new(),
            algorithm,
        };
        block.hash = block.recompute_hash();
        block
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    /// Creation time in milliseconds since the unix epoch.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// The stored (committed) hash, hex encoded.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Digest over the current field values. Does not touch the stored hash.
    pub fn recompute_hash(&self) -> String {
        self.hash_with_nonce(self.nonce)
    }

    /// Digest the block would have with `nonce` in place of its own.
    pub fn hash_with_nonce(&self, nonce: u64) -> String {
        let mut scratch = Vec::new();
        digest_with_nonce(self.algorithm, &self.canonical_prefix(), nonce, &mut scratch).to_hex()
    }

    /// Encoding of every hashed field except the nonce.
    pub(crate) fn canonical_prefix(&self) -> Vec<u8> {
        canonical_prefix(
            self.index,
            self.timestamp,
            &self.transactions,
            &self.previous_hash,
        )
    }

    /// Stores a mined nonce together with its hash.
    pub(crate) fn commit(&mut self, nonce: u64, hash: String) {
        self.nonce = nonce;
        self.hash = hash;
    }
}

/// Deliberate mutation of committed content. Exists only so tamper detection
/// can be demonstrated; none of this is reachable through [`crate::Chain`]'s
/// normal API.
#[cfg(any(test, feature = "tamper"))]
impl Block {
    /// Replaces the transactions without touching the stored hash.
    pub fn tamper_transactions(&mut self, transactions: Vec<Transaction>) {
        self.transactions = transactions;
    }

    pub fn tamper_hash(&mut self, hash: impl Into<String>) {
        self.hash = hash.into();
    }

    pub fn tamper_previous_hash(&mut self, previous_hash: impl Into<String>) {
        self.previous_hash = previous_hash.into();
    }

    /// Overwrites the stored hash with the recomputed one and returns it.
    pub fn tamper_rehash(&mut self) -> String {
        self.hash = self.recompute_hash();
        self.hash.clone()
    }
}
