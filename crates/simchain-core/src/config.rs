//! Mining configuration

use crate::constants::{DEFAULT_DIFFICULTY, DEFAULT_WORKERS, MAX_DIFFICULTY, TRANSACTIONS_PER_BLOCK};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Parameters shared by the chain, the miner and the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Leading zero hex characters a block hash needs to be accepted
    pub difficulty: u8,

    /// Concurrent workers per round
    pub workers: usize,

    /// Upper bound on transactions selected into one block
    pub transactions_per_block: usize,

    /// Cap on nonces a worker tries per round; `None` searches until found
    pub max_nonce_attempts: Option<u64>,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            workers: DEFAULT_WORKERS,
            transactions_per_block: TRANSACTIONS_PER_BLOCK,
            max_nonce_attempts: None,
        }
    }
}

impl MiningConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config("mining.workers must be at least 1".into()));
        }
        if self.transactions_per_block == 0 {
            return Err(Error::Config(
                "mining.transactions_per_block must be at least 1".into(),
            ));
        }
        if self.difficulty > MAX_DIFFICULTY {
            return Err(Error::Config(format!(
                "mining.difficulty {} exceeds {MAX_DIFFICULTY}",
                self.difficulty
            )));
        }
        if self.max_nonce_attempts == Some(0) {
            return Err(Error::Config(
                "mining.max_nonce_attempts must be positive when set".into(),
            ));
        }
        Ok(())
    }
}
