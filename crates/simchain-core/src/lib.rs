pub mod chain;
pub mod config;
pub mod constants;
pub mod digest;
pub mod error;
pub mod mine;
pub mod pow;
pub mod simulate;
pub mod state;

pub use chain::Chain;
pub use config::MiningConfig;
pub use digest::{hash, Digest};
pub use error::{Error, Rejection, Result};
pub use mine::{MiningCoordinator, RoundOutcome};
pub use pow::Miner;
pub use state::LedgerState;

use constants::BLOCK_VERSION;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch; zero if the clock is before it.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub key: Digest,
    pub name: String,
    pub balance: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Digest,
    pub sender: Digest,
    pub receiver: Digest,
    pub amount: f64,
    pub timestamp: u64,
}

impl Transaction {
    /// Builds a transaction whose id is the digest of its contents.
    pub fn new(sender: Digest, receiver: Digest, amount: f64, timestamp: u64) -> Self {
        let mut tx = Self {
            id: Digest::default(),
            sender,
            receiver,
            amount,
            timestamp,
        };
        tx.id = tx.compute_id();
        tx
    }

    /// `sender ‖ receiver ‖ amount ‖ timestamp`, hex digests and decimal numbers.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        format!(
            "{}{}{}{}",
            self.sender, self.receiver, self.amount, self.timestamp
        )
        .into_bytes()
    }

    pub fn compute_id(&self) -> Digest {
        digest::hash(&self.canonical_bytes())
    }

    pub fn validate(&self) -> Result<()> {
        let computed = self.compute_id();
        if computed != self.id {
            return Err(Error::InvalidHash {
                id: self.id,
                computed,
            });
        }
        Ok(())
    }
}

/// A block. Its own hash is never stored; `hash()` recomputes it from the
/// canonical bytes every time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub prev_hash: Digest,
    pub timestamp: u64,
    pub version: String,
    pub merkle_root: Digest,
    pub transactions: Vec<Transaction>,
    pub nonce: u64,
    pub difficulty: u8,
}

impl Block {
    /// Unmined candidate with its Merkle root fixed over `transactions`.
    pub fn new(prev_hash: Digest, transactions: Vec<Transaction>, difficulty: u8) -> Self {
        let merkle_root = merkle_root(&transactions);
        Self {
            prev_hash,
            timestamp: unix_now(),
            version: BLOCK_VERSION.to_string(),
            merkle_root,
            transactions,
            nonce: 0,
            difficulty,
        }
    }

    /// Unmined genesis template: empty-digest `prev_hash`, no transactions.
    pub fn genesis(difficulty: u8) -> Self {
        Self::new(Digest::empty(), Vec::new(), difficulty)
    }

    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(160 + self.transactions.len() * 160);
        bytes.extend_from_slice(self.prev_hash.to_hex().as_bytes());
        bytes.extend_from_slice(format!("{:x}", self.timestamp).as_bytes());
        bytes.extend_from_slice(self.version.as_bytes());
        bytes.extend_from_slice(self.merkle_root.to_hex().as_bytes());
        for tx in &self.transactions {
            bytes.extend_from_slice(&tx.canonical_bytes());
        }
        bytes.extend_from_slice(format!("{:x}", self.nonce).as_bytes());
        bytes.push(self.difficulty);
        bytes
    }

    pub fn hash(&self) -> Digest {
        digest::hash(&self.canonical_bytes())
    }

    pub fn has_valid_merkle_root(&self) -> bool {
        self.merkle_root == merkle_root(&self.transactions)
    }
}

/// Root digest over a transaction set, independent of input order.
///
/// Leaves are the digests of each transaction's canonical bytes, taken in
/// descending id order. Odd levels duplicate their last node; parents hash
/// the concatenated hex of their two children.
pub fn merkle_root(txs: &[Transaction]) -> Digest {
    match txs {
        [] => Digest::empty(),
        [only] => digest::hash(&only.canonical_bytes()),
        _ => {
            let mut sorted: Vec<&Transaction> = txs.iter().collect();
            sorted.sort_by(|a, b| b.id.cmp(&a.id));

            let mut level: Vec<Digest> = sorted
                .iter()
                .map(|t| digest::hash(&t.canonical_bytes()))
                .collect();

            while level.len() > 1 {
                let mut next = Vec::with_capacity(level.len().div_ceil(2));
                for pair in level.chunks(2) {
                    let (a, b) = if pair.len() == 2 {
                        (&pair[0], &pair[1])
                    } else {
                        (&pair[0], &pair[0])
                    };
                    next.push(hash_pair(a, b));
                }
                level = next;
            }
            level[0]
        }
    }
}

fn hash_pair(left: &Digest, right: &Digest) -> Digest {
    let mut joined = String::with_capacity(constants::HASH_HEX_SIZE * 2);
    joined.push_str(&left.to_hex());
    joined.push_str(&right.to_hex());
    digest::hash(joined.as_bytes())
}
