//! Simulation configuration, read from an optional TOML file.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use simchain_core::constants::MAX_DIFFICULTY;
use simchain_core::MiningConfig;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub mining: MiningConfig,
    pub genesis: GenesisConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    pub difficulty: u8,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self { difficulty: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub data_dir: PathBuf,
    pub seed: u64,
    pub users: usize,
    pub transactions: usize,
    pub min_balance: f64,
    pub max_balance: f64,
    pub min_amount: f64,
    pub max_amount: f64,
    pub max_age_secs: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            seed: 0,
            users: 1_000,
            transactions: 10_000,
            min_balance: 100.0,
            max_balance: 1_000_000.0,
            min_amount: 1.0,
            max_amount: 10_000.0,
            max_age_secs: 7 * 3_600,
        }
    }
}

impl SimConfig {
    /// Defaults when no path is given; otherwise the file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        self.mining.validate()?;
        if self.genesis.difficulty > MAX_DIFFICULTY {
            bail!(
                "genesis.difficulty {} exceeds {MAX_DIFFICULTY}",
                self.genesis.difficulty
            );
        }
        let sim = &self.simulation;
        if !(sim.min_balance < sim.max_balance) {
            bail!("simulation.min_balance must be below simulation.max_balance");
        }
        if !(sim.min_amount < sim.max_amount) {
            bail!("simulation.min_amount must be below simulation.max_amount");
        }
        Ok(())
    }
}
