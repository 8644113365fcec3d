//! Error types for the chain core

use crate::Digest;
use std::fmt;
use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why the chain refused a candidate block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The block hash has fewer leading zero hex characters than required.
    InsufficientWork { difficulty: u8 },
    /// The block does not extend the current head.
    StalePrevHash { head: Digest, prev_hash: Digest },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::InsufficientWork { difficulty } => {
                write!(f, "hash does not meet difficulty {difficulty}")
            }
            Rejection::StalePrevHash { head, prev_hash } => {
                write!(f, "prev_hash {prev_hash} is not the current head {head}")
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// Stored transaction id differs from the digest of its contents
    #[error("invalid transaction hash: stored {id}, computed {computed}")]
    InvalidHash { id: Digest, computed: Digest },

    /// Chain head advanced while a candidate was being mined
    #[error("stale head: mining against {expected} but chain head is now {found}")]
    StaleHead { expected: Digest, found: Digest },

    /// Bounded nonce search ran out of attempts
    #[error("nonce search exhausted after {attempts} attempts")]
    NonceExhausted { attempts: u64 },

    /// Candidate is not the canonical successor of the current head
    #[error("block {hash} rejected: {reason}")]
    NotCanonical { hash: Digest, reason: Rejection },

    /// Genesis block cannot anchor a chain
    #[error("invalid genesis block {hash}: {reason}")]
    GenesisInvalid { hash: Digest, reason: String },

    /// Unknown block hash
    #[error("block not found: {0}")]
    NotFound(Digest),

    /// Text that is not a 64-character lowercase hex digest
    #[error("malformed digest: {0:?}")]
    MalformedDigest(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Mining worker pool could not be started
    #[error("worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    /// Whether a caller can retry after this error (fresh snapshot, new
    /// candidate, different lookup). Genesis, configuration and pool
    /// failures leave nothing to retry against.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Error::GenesisInvalid { .. } | Error::Config(_) | Error::WorkerPool(_)
        )
    }

    /// Errors that mean "rebuild the candidate against the new head".
    pub fn is_lost_race(&self) -> bool {
        matches!(
            self,
            Error::StaleHead { .. } | Error::NonceExhausted { .. } | Error::NotCanonical { .. }
        )
    }
}
