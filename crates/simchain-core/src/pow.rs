//! Difficulty predicate and the nonce search.

use crate::{unix_now, Block, Digest, Error, Result};
use tracing::{debug, trace};

const PROGRESS_INTERVAL: u64 = 100_000;

/// True when the first `difficulty` hex characters of `hash` are `'0'`.
pub fn hash_meets_target(hash: &Digest, difficulty: u8) -> bool {
    hash.leading_zero_nibbles() >= u32::from(difficulty)
}

/// Nonce searcher bound to a single difficulty.
#[derive(Clone, Copy, Debug)]
pub struct Miner {
    difficulty: u8,
    max_attempts: Option<u64>,
}

impl Miner {
    pub fn new(difficulty: u8) -> Self {
        Self {
            difficulty,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u64>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn difficulty(&self) -> u8 {
        self.difficulty
    }

    /// Mine `block` on top of the head reported by `current_head`.
    ///
    /// The block's `prev_hash` is the head the caller built it against. Each
    /// attempt re-reads the head, refreshes the timestamp and bumps the nonce
    /// (starting after `nonce_offset`). Returns the block once its hash meets
    /// the difficulty with the head still unchanged; returns
    /// [`Error::StaleHead`] as soon as the head moves, and
    /// [`Error::NonceExhausted`] if a configured attempt cap runs out.
    /// A block built for another difficulty is refused with [`Error::Config`].
    pub fn mine<F>(&self, mut block: Block, current_head: F, nonce_offset: u64) -> Result<Block>
    where
        F: Fn() -> Digest,
    {
        if block.difficulty != self.difficulty {
            return Err(Error::Config(format!(
                "block difficulty {} does not match miner difficulty {}",
                block.difficulty, self.difficulty
            )));
        }
        let anchor = block.prev_hash;
        block.nonce = nonce_offset;

        let mut attempts = 0u64;
        loop {
            let head = current_head();
            if head != anchor {
                debug!(%anchor, %head, attempts, "head moved during search");
                return Err(Error::StaleHead {
                    expected: anchor,
                    found: head,
                });
            }

            block.prev_hash = head;
            block.timestamp = unix_now();
            block.nonce = block.nonce.wrapping_add(1);
            attempts += 1;

            let hash = block.hash();
            if hash_meets_target(&hash, self.difficulty) {
                let head = current_head();
                if head != anchor {
                    debug!(%anchor, %head, %hash, "solution found after head moved");
                    return Err(Error::StaleHead {
                        expected: anchor,
                        found: head,
                    });
                }
                debug!(%hash, nonce = block.nonce, attempts, "found block");
                return Ok(block);
            }

            if attempts % PROGRESS_INTERVAL == 0 {
                trace!(attempts, nonce = block.nonce, "still mining");
            }
            if self.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(Error::NonceExhausted { attempts });
            }
        }
    }

    /// Mine the genesis template for this difficulty. The head is fixed at
    /// the empty-digest sentinel, so the search can only end by success or
    /// exhaustion.
    pub fn mine_genesis(&self) -> Result<Block> {
        let template = Block::genesis(self.difficulty);
        let sentinel = template.prev_hash;
        self.mine(template, || sentinel, 0)
    }
}
