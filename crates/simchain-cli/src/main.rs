mod config;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use config::SimConfig;
use rand::{rngs::StdRng, SeedableRng};
use simchain_core::simulate::{generate_transactions, generate_users};
use simchain_core::{unix_now, Chain, LedgerState, Miner, MiningCoordinator};
use simchain_store::block_log::BlockLog;
use simchain_store::flat_file::FlatFileStore;
use simchain_store::LedgerStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const BLOCK_LOG_FILE: &str = "chain.jsonl";

#[derive(Parser, Debug)]
#[command(name = "simchain")]
#[command(about = "Multi-worker proof-of-work chain simulator")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding users, pending transactions and the block log
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Seed for generation and transaction selection
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write random users and pending transactions to the data directory
    Generate(GenerateArgs),
    /// Mine rounds until the pending pool is empty, then print the chain
    Run(RunArgs),
    /// Print the block log of the last run
    Show,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Number of users
    #[arg(long)]
    users: Option<usize>,
    /// Number of pending transactions
    #[arg(long)]
    transactions: Option<usize>,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Leading zero hex characters required for each block
    #[arg(long)]
    difficulty: Option<u8>,
    /// Leading zero hex characters required for the genesis block
    #[arg(long)]
    genesis_difficulty: Option<u8>,
    /// Concurrent mining workers per round
    #[arg(long)]
    workers: Option<usize>,
    /// Transactions per block
    #[arg(long)]
    block_size: Option<usize>,
    /// Stop after this many rounds
    #[arg(long)]
    max_rounds: Option<u64>,
    /// Generate fresh data before mining
    #[arg(long)]
    generate: bool,
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut cfg = SimConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        cfg.simulation.data_dir = dir;
    }
    if let Some(seed) = cli.seed {
        cfg.simulation.seed = seed;
    }

    match cli.cmd {
        Command::Generate(args) => {
            if let Some(n) = args.users {
                cfg.simulation.users = n;
            }
            if let Some(n) = args.transactions {
                cfg.simulation.transactions = n;
            }
            cfg.validate()?;
            generate(&cfg)?;
        }
        Command::Run(args) => {
            if let Some(d) = args.difficulty {
                cfg.mining.difficulty = d;
            }
            if let Some(d) = args.genesis_difficulty {
                cfg.genesis.difficulty = d;
            }
            if let Some(n) = args.workers {
                cfg.mining.workers = n;
            }
            if let Some(n) = args.block_size {
                cfg.mining.transactions_per_block = n;
            }
            cfg.validate()?;
            if args.generate {
                generate(&cfg)?;
            }
            run(&cfg, args.max_rounds)?;
        }
        Command::Show => show(&cfg)?,
    }
    Ok(())
}

fn generate(cfg: &SimConfig) -> Result<LedgerState> {
    let sim = &cfg.simulation;
    let mut rng = StdRng::seed_from_u64(sim.seed);
    let users = generate_users(&mut rng, sim.users, sim.min_balance..sim.max_balance);
    let pending = generate_transactions(
        &mut rng,
        &users,
        sim.transactions,
        sim.min_amount..sim.max_amount,
        sim.max_age_secs,
        unix_now(),
    );
    let state = LedgerState::new(users, pending);

    let store = FlatFileStore::open(&sim.data_dir)?;
    store.save_state(&state)?;
    info!(
        users = state.users.len(),
        pending = state.pending.len(),
        dir = %sim.data_dir.display(),
        "generated simulation data"
    );
    Ok(state)
}

fn run(cfg: &SimConfig, max_rounds: Option<u64>) -> Result<()> {
    let sim = &cfg.simulation;
    let store = FlatFileStore::open(&sim.data_dir)?;
    let mut state = store.load_state()?;
    if state.users.is_empty() {
        bail!(
            "no users in {}; run `simchain generate` or pass --generate",
            sim.data_dir.display()
        );
    }

    let genesis = Miner::new(cfg.genesis.difficulty)
        .mine_genesis()
        .context("mining genesis")?;
    let genesis_hash = genesis.hash();
    let log = BlockLog::new(sim.data_dir.join(BLOCK_LOG_FILE));
    log.reset()?;
    log.append(&genesis_hash, &genesis)?;

    let chain = Arc::new(Chain::new(genesis, cfg.mining.difficulty)?);
    let coordinator = MiningCoordinator::new(chain.clone(), cfg.mining.clone())?;

    let mut round = 0u64;
    while !state.pending.is_empty() {
        if max_rounds.is_some_and(|max| round >= max) {
            warn!(round, pending = state.pending.len(), "round limit reached");
            break;
        }
        let outcome = coordinator.run_round(&mut state, sim.seed.wrapping_add(round));
        round += 1;

        match outcome.accepted {
            Some(accepted) => {
                log.append(&accepted.hash, &accepted.block)?;
                store.save_state(&state)?;
                info!(
                    round,
                    size = chain.size(),
                    remaining = state.pending.len(),
                    "remaining transactions"
                );
            }
            None => warn!(round, "no block this round, retrying"),
        }
    }

    let size = chain.size();
    for (i, (hash, block)) in chain.traverse().into_iter().enumerate() {
        println!(
            "Block {}: {} ({} transactions)",
            size - i,
            hash,
            block.transactions.len()
        );
    }
    Ok(())
}

fn show(cfg: &SimConfig) -> Result<()> {
    let log = BlockLog::new(cfg.simulation.data_dir.join(BLOCK_LOG_FILE));
    let entries = log.read_all()?;
    if entries.is_empty() {
        println!("no blocks logged in {}", log.path().display());
        return Ok(());
    }
    for (height, entry) in entries.iter().enumerate() {
        println!(
            "Block {}: {} prev {} nonce {} ({} transactions)",
            height + 1,
            entry.hash,
            entry.block.prev_hash,
            entry.block.nonce,
            entry.block.transactions.len()
        );
    }
    Ok(())
}
