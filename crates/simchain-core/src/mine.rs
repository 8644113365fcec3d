//! Round coordinator: N workers race to extend one shared chain.

use crate::{Block, Chain, Digest, Error, LedgerState, Miner, MiningConfig, Result};
use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A block that won its round.
#[derive(Clone, Debug)]
pub struct AcceptedBlock {
    pub worker: usize,
    pub hash: Digest,
    pub block: Block,
}

/// How one worker's attempt ended.
#[derive(Debug)]
pub struct WorkerReport {
    pub worker: usize,
    pub result: Result<Digest>,
}

#[derive(Debug)]
pub struct RoundOutcome {
    /// `None` only when every worker exhausted a bounded nonce search.
    pub accepted: Option<AcceptedBlock>,
    pub reports: Vec<WorkerReport>,
    pub dropped_invalid: usize,
}

/// Runs a fixed pool of mining workers against one shared chain.
pub struct MiningCoordinator {
    chain: Arc<Chain>,
    config: MiningConfig,
    pool: rayon::ThreadPool,
}

impl MiningCoordinator {
    pub fn new(chain: Arc<Chain>, config: MiningConfig) -> Result<Self> {
        config.validate()?;
        if config.difficulty != chain.difficulty() {
            return Err(Error::Config(format!(
                "mining.difficulty {} does not match chain difficulty {}",
                config.difficulty,
                chain.difficulty()
            )));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("miner-{i}"))
            .build()?;
        Ok(Self {
            chain,
            config,
            pool,
        })
    }

    pub fn chain(&self) -> &Arc<Chain> {
        &self.chain
    }

    pub fn config(&self) -> &MiningConfig {
        &self.config
    }

    /// Run one round: every worker builds, mines and offers a candidate on
    /// top of the head as it was when the round started. At most one insert
    /// succeeds; that worker's balances and shrunk pool replace `state`.
    /// Returns after all workers have finished.
    pub fn run_round(&self, state: &mut LedgerState, seed: u64) -> RoundOutcome {
        let dropped_invalid = state.prune_invalid();
        let head = self.chain.head();
        let snapshot: &LedgerState = &*state;

        let results: Vec<(WorkerReport, Option<(AcceptedBlock, LedgerState)>)> =
            self.pool.install(|| {
                (0..self.config.workers)
                    .into_par_iter()
                    .with_max_len(1)
                    .map(|worker| self.run_worker(worker, head, snapshot, seed))
                    .collect()
            });

        let mut accepted = None;
        let mut reports = Vec::with_capacity(results.len());
        for (report, won) in results {
            if let Some((block, local)) = won {
                *state = local;
                accepted = Some(block);
            }
            reports.push(report);
        }

        match &accepted {
            Some(a) => info!(
                worker = a.worker,
                hash = %a.hash,
                txs = a.block.transactions.len(),
                pending = state.pending.len(),
                size = self.chain.size(),
                "round won"
            ),
            None => warn!(%head, "round ended without an accepted block"),
        }

        RoundOutcome {
            accepted,
            reports,
            dropped_invalid,
        }
    }

    fn run_worker(
        &self,
        worker: usize,
        head: Digest,
        shared: &LedgerState,
        seed: u64,
    ) -> (WorkerReport, Option<(AcceptedBlock, LedgerState)>) {
        let mut local = shared.clone();
        let mut rng = StdRng::seed_from_u64(worker_seed(seed, worker));
        let txs = local.select_transactions(self.config.transactions_per_block, &mut rng);
        let candidate = Block::new(head, txs, self.config.difficulty);

        let miner = Miner::new(self.config.difficulty)
            .with_max_attempts(self.config.max_nonce_attempts);
        let offset = nonce_offset(worker, self.config.workers);

        let outcome = miner
            .mine(candidate, || self.chain.head(), offset)
            .and_then(|block| {
                let hash = self.chain.insert(block.clone())?;
                Ok((hash, block))
            });

        match outcome {
            Ok((hash, block)) => (
                WorkerReport {
                    worker,
                    result: Ok(hash),
                },
                Some((AcceptedBlock { worker, hash, block }, local)),
            ),
            Err(err) => {
                debug!(worker, %err, "candidate discarded");
                (
                    WorkerReport {
                        worker,
                        result: Err(err),
                    },
                    None,
                )
            }
        }
    }
}

/// Per-worker RNG seed derived from the round seed.
fn worker_seed(seed: u64, worker: usize) -> u64 {
    seed ^ (worker as u64 + 1).wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

/// Start of each worker's slice of the nonce space.
fn nonce_offset(worker: usize, workers: usize) -> u64 {
    (u64::MAX / workers as u64).wrapping_mul(worker as u64)
}
