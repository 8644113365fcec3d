use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use simchain_core::{Block, Digest};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One accepted block as written to the log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoggedBlock {
    pub hash: Digest,
    pub block: Block,
}

/// Append-only JSON-lines record of accepted blocks, oldest first.
#[derive(Clone, Debug)]
pub struct BlockLog {
    path: PathBuf,
}

impl BlockLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start a fresh log, discarding any previous run.
    pub fn reset(&self) -> Result<()> {
        File::create(&self.path).with_context(|| format!("truncating {}", self.path.display()))?;
        Ok(())
    }

    pub fn append(&self, hash: &Digest, block: &Block) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        let entry = LoggedBlock {
            hash: *hash,
            block: block.clone(),
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        debug!(%hash, "block logged");
        Ok(())
    }

    /// Read every entry back, checking each stored hash against the block.
    pub fn read_all(&self) -> Result<Vec<LoggedBlock>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(fs::File::open(&self.path)?);
        let mut out = Vec::new();
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: LoggedBlock = serde_json::from_str(&line)
                .with_context(|| format!("{}:{}", self.path.display(), n + 1))?;
            let computed = entry.block.hash();
            if computed != entry.hash {
                bail!(
                    "{}:{}: stored hash {} does not match block ({})",
                    self.path.display(),
                    n + 1,
                    entry.hash,
                    computed
                );
            }
            out.push(entry);
        }
        Ok(out)
    }
}
