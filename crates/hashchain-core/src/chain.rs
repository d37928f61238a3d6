use std::{fmt, sync::Arc};

use tracing::{debug, info};

use crate::{
    constants::GENESIS_PREVIOUS_HASH,
    mine::{mine, CancelToken},
    now_millis, Block, ChainConfig, LedgerError, Result, Transaction,
};

/// What went wrong at a block found inconsistent by validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    /// Stored hash differs from the hash of the block's current content.
    HashMismatch { stored: String, computed: String },
    /// `previous_hash` does not equal the stored hash of the block before it.
    LinkMismatch { expected: String, found: String },
    /// Index is not one past its predecessor's. `expected` is `None` when the
    /// predecessor already sits at `u64::MAX`.
    IndexGap { expected: Option<u64>, found: u64 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// Position of the offending block in the chain.
    pub index: usize,
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ViolationKind::HashMismatch { stored, computed } => write!(
                f,
                "block {}: stored hash {stored} but content hashes to {computed}",
                self.index
            ),
            ViolationKind::LinkMismatch { expected, found } => write!(
                f,
                "block {}: previous hash {found} does not match predecessor hash {expected}",
                self.index
            ),
            ViolationKind::IndexGap {
                expected: Some(expected),
                found,
            } => write!(
                f,
                "block {}: index {found}, expected {expected}",
                self.index
            ),
            ViolationKind::IndexGap {
                expected: None,
                found,
            } => write!(
                f,
                "block {}: index {found} follows a block at the maximum index",
                self.index
            ),
        }
    }
}

/// Checks one block against its predecessor: hash, then link, then index.
fn check_pair(position: usize, previous: &Block, current: &Block) -> Vec<Violation> {
    let mut found = Vec::new();
    let computed = current.recompute_hash();
    if current.hash() != computed {
        found.push(ViolationKind::HashMismatch {
            stored: current.hash().to_string(),
            computed,
        });
    }
    if current.previous_hash() != previous.hash() {
        found.push(ViolationKind::LinkMismatch {
            expected: previous.hash().to_string(),
            found: current.previous_hash().to_string(),
        });
    }
    let expected = previous.index().checked_add(1);
    if expected != Some(current.index()) {
        found.push(ViolationKind::IndexGap {
            expected,
            found: current.index(),
        });
    }
    found
        .into_iter()
        .map(|kind| Violation {
            index: position,
            kind,
        })
        .collect()
}

/// Walks `blocks` from position 1 to the tip. Genesis is the trusted root and
/// is only checked as the predecessor of block 1.
fn violations_in(blocks: &[Block]) -> impl Iterator<Item = Violation> + '_ {
    blocks
        .windows(2)
        .enumerate()
        .flat_map(|(i, pair)| check_pair(i + 1, &pair[0], &pair[1]))
        .inspect(|v| debug!("chain violation: {v}"))
}

/// An append-only sequence of blocks rooted at an unmined genesis block.
///
/// Appends take `&mut self`, so at most one can be in flight. Readers that
/// need to outlive or run beside an append should take a [`ChainSnapshot`].
#[derive(Clone, Debug)]
pub struct Chain {
    blocks: Vec<Block>,
    config: ChainConfig,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new(ChainConfig::default())
    }
}

impl Chain {
    pub fn new(config: ChainConfig) -> Self {
        let genesis = Self::genesis_block(&config);
        info!(
            "Created chain with genesis hash {} (difficulty {}, {})",
            genesis.hash(),
            config.difficulty,
            config.algorithm
        );
        Self {
            blocks: vec![genesis],
            config,
        }
    }

    /// Block 0: no transactions, sentinel previous hash, nonce 0, not mined.
    fn genesis_block(config: &ChainConfig) -> Block {
        Block::with_algorithm(
            config.algorithm,
            0,
            now_millis(),
            vec![],
            GENESIS_PREVIOUS_HASH,
            0,
        )
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn difficulty(&self) -> u32 {
        self.config.difficulty
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false: genesis exists from construction.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn tip(&self) -> &Block {
        // Genesis is pushed in `new` and blocks are never removed.
        &self.blocks[self.blocks.len() - 1]
    }

    /// Mines a block holding `transactions` on top of the tip and appends it.
    pub fn append(&mut self, transactions: Vec<Transaction>) -> Result<&Block> {
        self.append_inner(transactions, None)
    }

    /// Like [`Chain::append`], but stops when `cancel` is triggered. A
    /// cancelled append leaves the chain unchanged.
    pub fn append_with_cancel(
        &mut self,
        transactions: Vec<Transaction>,
        cancel: &CancelToken,
    ) -> Result<&Block> {
        self.append_inner(transactions, Some(cancel))
    }

    fn append_inner(
        &mut self,
        transactions: Vec<Transaction>,
        cancel: Option<&CancelToken>,
    ) -> Result<&Block> {
        let tip = self.tip();
        let index = tip
            .index()
            .checked_add(1)
            .ok_or(LedgerError::IndexExhausted)?;
        let mut block = Block::with_algorithm(
            self.config.algorithm,
            index,
            now_millis(),
            transactions,
            tip.hash(),
            0,
        );

        let (nonce, hash) = mine(
            &block,
            self.config.difficulty,
            &self.config.mining,
            cancel,
        )
        .into_result()?;
        block.commit(nonce, hash);

        self.blocks.push(block);
        Ok(self.tip())
    }

    /// True when every block after genesis has a correct hash, links to its
    /// predecessor and carries the next index.
    pub fn validate(&self) -> bool {
        self.first_violation().is_none()
    }

    pub fn first_violation(&self) -> Option<Violation> {
        violations_in(&self.blocks).next()
    }

    pub fn violations(&self) -> Vec<Violation> {
        violations_in(&self.blocks).collect()
    }

    /// Immutable copy of the current blocks that can be shared across threads.
    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            blocks: Arc::from(self.blocks.as_slice()),
            difficulty: self.config.difficulty,
        }
    }

    /// Direct mutable access to a committed block, bypassing every invariant
    /// the chain maintains.
    #[cfg(any(test, feature = "tamper"))]
    pub fn tamper_block_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.blocks.get_mut(index)
    }
}

/// A frozen, cheaply clonable view of a chain.
#[derive(Clone, Debug)]
pub struct ChainSnapshot {
    blocks: Arc<[Block]>,
    difficulty: u32,
}

impl ChainSnapshot {
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn validate(&self) -> bool {
        self.first_violation().is_none()
    }

    pub fn first_violation(&self) -> Option<Violation> {
        violations_in(&self.blocks).next()
    }

    pub fn violations(&self) -> Vec<Violation> {
        violations_in(&self.blocks).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{hasher::meets_difficulty, HashAlgorithm, MineOptions, MiningAborted};

    fn batch_one() -> Vec<Transaction> {
        vec![
            Transaction::new("Alice", "Bob", 50),
            Transaction::new("Bob", "Charlie", 20),
        ]
    }

    fn batch_two() -> Vec<Transaction> {
        vec![
            Transaction::new("Charlie", "Dave", 30),
            Transaction::new("Dave", "Eve", 40),
        ]
    }

    fn three_block_chain() -> Chain {
        let mut chain = Chain::default();
        chain.append(batch_one()).unwrap();
        chain.append(batch_two()).unwrap();
        chain
    }

    #[test]
    fn genesis_block_example() {
        let chain = Chain::default();
        assert_eq!(chain.len(), 1);
        assert!(!chain.is_empty());
        let genesis = &chain.blocks()[0];
        assert_eq!(genesis.index(), 0);
        assert_eq!(genesis.previous_hash(), "0");
        assert!(genesis.transactions().is_empty());
        assert_eq!(genesis.nonce(), 0);
        assert_eq!(genesis.hash(), genesis.recompute_hash());
        assert_eq!(chain.difficulty(), 2);
        assert!(chain.validate());
    }

    #[test]
    fn append_mines_and_links() {
        let mut chain = Chain::default();
        let genesis_hash = chain.tip().hash().to_string();
        let block = chain.append(batch_one()).unwrap();
        assert_eq!(block.index(), 1);
        assert_eq!(block.previous_hash(), genesis_hash);
        assert_eq!(block.transactions(), batch_one().as_slice());
        assert!(meets_difficulty(block.hash(), 2));
        assert_eq!(block.recompute_hash(), block.hash());
    }

    #[test]
    fn append_accepts_empty_batch() {
        let mut chain = Chain::default();
        let block = chain.append(vec![]).unwrap();
        assert!(block.transactions().is_empty());
        assert!(chain.validate());
    }

    #[test]
    fn tamper_is_detected() {
        let mut chain = three_block_chain();
        assert!(chain.validate());

        chain
            .tamper_block_mut(1)
            .unwrap()
            .tamper_transactions(vec![Transaction::new("Alice", "Mallory", 1000)]);

        assert!(!chain.validate());
        let first = chain.first_violation().unwrap();
        assert_eq!(first.index, 1);
        assert!(matches!(first.kind, ViolationKind::HashMismatch { .. }));
    }

    #[test]
    fn rehashed_tamper_breaks_the_next_link() {
        let mut chain = three_block_chain();
        let block = chain.tamper_block_mut(1).unwrap();
        block.tamper_transactions(vec![Transaction::new("Alice", "Mallory", 1000)]);
        block.tamper_rehash();

        let violations = chain.violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].index, 2);
        assert!(matches!(violations[0].kind, ViolationKind::LinkMismatch { .. }));
    }

    #[test]
    fn cascading_repair_validates_again() {
        let mut chain = three_block_chain();
        chain
            .tamper_block_mut(1)
            .unwrap()
            .tamper_transactions(vec![Transaction::new("Alice", "Mallory", 1000)]);
        assert!(!chain.validate());

        let mut previous = chain.tamper_block_mut(1).unwrap().tamper_rehash();
        for i in 2..chain.len() {
            let block = chain.tamper_block_mut(i).unwrap();
            block.tamper_previous_hash(previous);
            previous = block.tamper_rehash();
        }
        // self-consistent forgery passes: validation checks consistency only
        assert!(chain.validate());
    }

    #[test]
    fn forged_fields_are_reported() {
        let mut chain = three_block_chain();
        chain.tamper_block_mut(2).unwrap().tamper_hash("ff");
        let violations = chain.violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].index, 2);

        let mut chain = three_block_chain();
        // moving the link target only is enough to produce a link mismatch at 1
        chain.tamper_block_mut(1).unwrap().tamper_previous_hash("0");
        let kinds: Vec<_> = chain.violations().into_iter().map(|v| v.kind).collect();
        assert!(kinds
            .iter()
            .any(|k| matches!(k, ViolationKind::LinkMismatch { found, .. } if found == "0")));
    }

    #[test]
    fn index_gap_detected() {
        let mut chain = Chain::default();
        chain.append(batch_one()).unwrap();
        let genesis_hash = chain.blocks()[0].hash().to_string();
        let forged = Block::new(5, 0, batch_one(), genesis_hash, 0);
        *chain.tamper_block_mut(1).unwrap() = forged;

        let violations = chain.violations();
        assert_eq!(
            violations,
            vec![Violation {
                index: 1,
                kind: ViolationKind::IndexGap {
                    expected: Some(1),
                    found: 5
                },
            }]
        );
        assert!(violations[0].to_string().contains("index 5, expected 1"));
    }

    #[test]
    fn max_index_is_reported_without_overflow() {
        let mut chain = Chain::new(ChainConfig {
            difficulty: 0,
            ..ChainConfig::default()
        });
        chain.append(batch_one()).unwrap();
        chain.append(batch_two()).unwrap();
        let genesis_hash = chain.blocks()[0].hash().to_string();
        *chain.tamper_block_mut(1).unwrap() = Block::new(u64::MAX, 0, vec![], genesis_hash, 0);

        let violations = chain.violations();
        let gaps: Vec<_> = violations
            .iter()
            .filter(|v| matches!(v.kind, ViolationKind::IndexGap { .. }))
            .collect();
        assert_eq!(gaps.len(), 2);
        assert_eq!(
            gaps[0].kind,
            ViolationKind::IndexGap {
                expected: Some(1),
                found: u64::MAX
            }
        );
        assert_eq!(gaps[1].index, 2);
        assert_eq!(
            gaps[1].kind,
            ViolationKind::IndexGap {
                expected: None,
                found: 2
            }
        );
        assert!(gaps[1].to_string().contains("maximum index"));
        assert!(!chain.validate());
    }

    #[test]
    fn append_after_max_index_is_an_error() {
        let mut chain = Chain::new(ChainConfig {
            difficulty: 0,
            ..ChainConfig::default()
        });
        *chain.tamper_block_mut(0).unwrap() = Block::new(u64::MAX, 0, vec![], "0", 0);
        let err = chain.append(batch_one()).unwrap_err();
        assert!(matches!(err, LedgerError::IndexExhausted));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn trial_cap_leaves_chain_unchanged() {
        let config = ChainConfig {
            difficulty: 64,
            mining: MineOptions {
                max_trials: Some(5),
                parallel: false,
            },
            ..ChainConfig::default()
        };
        let mut chain = Chain::new(config);
        let err = chain.append(batch_one()).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::MiningAborted(MiningAborted::TrialsExhausted { trials: 5 })
        ));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn cancelled_append_leaves_chain_unchanged() {
        let mut chain = Chain::new(ChainConfig {
            difficulty: 64,
            ..ChainConfig::default()
        });
        let token = CancelToken::new();
        token.cancel();
        let err = chain.append_with_cancel(batch_one(), &token).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::MiningAborted(MiningAborted::Cancelled { .. })
        ));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn configured_algorithm_is_used_throughout() {
        let mut chain = Chain::new(ChainConfig {
            algorithm: HashAlgorithm::Blake3,
            difficulty: 1,
            ..ChainConfig::default()
        });
        chain.append(batch_one()).unwrap();
        assert!(chain
            .blocks()
            .iter()
            .all(|b| b.algorithm() == HashAlgorithm::Blake3));
        assert!(chain.validate());
    }

    #[test]
    fn snapshot_is_frozen() {
        let mut chain = three_block_chain();
        let snapshot = chain.snapshot();
        chain
            .tamper_block_mut(1)
            .unwrap()
            .tamper_transactions(vec![]);
        assert!(!chain.validate());
        assert!(snapshot.validate());
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.difficulty(), 2);
    }
}
