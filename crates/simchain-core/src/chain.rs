//! Append-only block store with a single canonical head.

use crate::pow::hash_meets_target;
use crate::{Block, Digest, Error, Rejection, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, info};

struct ChainState {
    blocks: HashMap<Digest, Block>,
    head: Digest,
    size: usize,
}

/// Linear chain of blocks keyed by hash.
///
/// Readers share a read lock; `insert` checks and extends the head under the
/// write lock, so two candidates built on the same head can never both be
/// accepted.
pub struct Chain {
    difficulty: u8,
    state: RwLock<ChainState>,
}

impl Chain {
    /// Anchor a chain on an already-mined genesis block.
    ///
    /// The genesis must point at the empty-digest sentinel and its hash must
    /// meet its own `difficulty` field. `difficulty` is the target every later
    /// insert is checked against.
    pub fn new(genesis: Block, difficulty: u8) -> Result<Self> {
        let hash = genesis.hash();
        if genesis.prev_hash != Digest::empty() {
            return Err(Error::GenesisInvalid {
                hash,
                reason: format!(
                    "prev_hash {} is not the empty-input sentinel",
                    genesis.prev_hash
                ),
            });
        }
        if !hash_meets_target(&hash, genesis.difficulty) {
            return Err(Error::GenesisInvalid {
                hash,
                reason: format!("hash does not meet difficulty {}", genesis.difficulty),
            });
        }

        info!(%hash, difficulty, "chain created from genesis");
        let mut blocks = HashMap::new();
        blocks.insert(hash, genesis);
        Ok(Self {
            difficulty,
            state: RwLock::new(ChainState {
                blocks,
                head: hash,
                size: 1,
            }),
        })
    }

    pub fn difficulty(&self) -> u8 {
        self.difficulty
    }

    pub fn size(&self) -> usize {
        self.state.read().size
    }

    pub fn head(&self) -> Digest {
        self.state.read().head
    }

    pub fn contains(&self, hash: &Digest) -> bool {
        self.state.read().blocks.contains_key(hash)
    }

    pub fn get(&self, hash: &Digest) -> Result<Block> {
        self.state
            .read()
            .blocks
            .get(hash)
            .cloned()
            .ok_or(Error::NotFound(*hash))
    }

    /// Accept `block` as the new head if it carries enough work and extends
    /// the current head. Returns the block's hash.
    pub fn insert(&self, block: Block) -> Result<Digest> {
        let hash = block.hash();
        if !hash_meets_target(&hash, self.difficulty) {
            debug!(%hash, "rejected block without enough work");
            return Err(Error::NotCanonical {
                hash,
                reason: Rejection::InsufficientWork {
                    difficulty: self.difficulty,
                },
            });
        }

        let mut state = self.state.write();
        if block.prev_hash != state.head {
            debug!(%hash, head = %state.head, prev = %block.prev_hash, "rejected stale block");
            return Err(Error::NotCanonical {
                hash,
                reason: Rejection::StalePrevHash {
                    head: state.head,
                    prev_hash: block.prev_hash,
                },
            });
        }

        let txs = block.transactions.len();
        state.blocks.insert(hash, block);
        state.head = hash;
        state.size += 1;
        info!(%hash, size = state.size, txs, "block accepted");
        Ok(hash)
    }

    /// Every block from head back to genesis, as `(hash, block)` pairs.
    pub fn traverse(&self) -> Vec<(Digest, Block)> {
        let state = self.state.read();
        let mut out = Vec::with_capacity(state.size);
        let sentinel = Digest::empty();
        let mut cursor = state.head;
        while let Some(block) = state.blocks.get(&cursor) {
            let prev = block.prev_hash;
            out.push((cursor, block.clone()));
            if prev == sentinel {
                break;
            }
            cursor = prev;
        }
        out
    }
}
