use crate::LedgerStore;
use anyhow::{anyhow, bail, Context, Result};
use simchain_core::{Digest, LedgerState, Transaction, User};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const USERS_FILE: &str = "users.dat";
const TRANSACTIONS_FILE: &str = "transactions.dat";
const NO_NAME: &str = "-";

/// Whitespace-separated text files, one record per line:
/// `key name balance` for users and
/// `id sender receiver amount timestamp` for pending transactions.
#[derive(Clone, Debug)]
pub struct FlatFileStore {
  users_path: PathBuf,
  transactions_path: PathBuf,
}

impl FlatFileStore {
  /// Store rooted at `dir`, created if missing.
  pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    info!(dir = %dir.display(), "flat-file store opened");
    Ok(Self::with_paths(dir.join(USERS_FILE), dir.join(TRANSACTIONS_FILE)))
  }

  pub fn with_paths(users_path: PathBuf, transactions_path: PathBuf) -> Self {
    Self {
      users_path,
      transactions_path,
    }
  }

  pub fn users_path(&self) -> &Path {
    &self.users_path
  }

  pub fn transactions_path(&self) -> &Path {
    &self.transactions_path
  }

  pub fn load_users(&self) -> Result<Vec<User>> {
    read_records(&self.users_path, parse_user)
  }

  pub fn load_transactions(&self) -> Result<Vec<Transaction>> {
    read_records(&self.transactions_path, parse_transaction)
  }

  pub fn save_users<'a>(&self, users: impl IntoIterator<Item = &'a User>) -> Result<()> {
    let mut out = String::new();
    for user in users {
      if user.name.contains(char::is_whitespace) {
        bail!("user name {:?} contains whitespace", user.name);
      }
      let name = if user.name.is_empty() { NO_NAME } else { &user.name };
      writeln!(out, "{} {} {}", user.key, name, user.balance)?;
    }
    write_atomic(&self.users_path, &out)
  }

  pub fn save_transactions(&self, txs: &[Transaction]) -> Result<()> {
    let mut out = String::new();
    for tx in txs {
      writeln!(
        out,
        "{} {} {} {} {}",
        tx.id, tx.sender, tx.receiver, tx.amount, tx.timestamp
      )?;
    }
    write_atomic(&self.transactions_path, &out)
  }
}

impl LedgerStore for FlatFileStore {
  fn load_state(&self) -> Result<LedgerState> {
    let users = self.load_users()?;
    let pending = self.load_transactions()?;
    debug!(users = users.len(), pending = pending.len(), "ledger state loaded");
    Ok(LedgerState::new(users, pending))
  }

  fn save_state(&self, state: &LedgerState) -> Result<()> {
    self.save_users(state.users.values())?;
    self.save_transactions(&state.pending)?;
    debug!(
      users = state.users.len(),
      pending = state.pending.len(),
      "ledger state saved"
    );
    Ok(())
  }
}

/// A missing file reads as empty; blank lines are skipped.
fn read_records<T>(path: &Path, parse: fn(&str) -> Result<T>) -> Result<Vec<T>> {
  let text = match fs::read_to_string(path) {
    Ok(text) => text,
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
    Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
  };
  text
    .lines()
    .enumerate()
    .filter(|(_, line)| !line.trim().is_empty())
    .map(|(n, line)| parse(line).with_context(|| format!("{}:{}", path.display(), n + 1)))
    .collect()
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
  let tmp = path.with_extension("tmp");
  fs::write(&tmp, contents).with_context(|| format!("writing {}", tmp.display()))?;
  fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
  Ok(())
}

fn field<'a>(fields: &mut impl Iterator<Item = &'a str>, name: &str) -> Result<&'a str> {
  fields.next().ok_or_else(|| anyhow!("missing {name}"))
}

fn digest_field<'a>(fields: &mut impl Iterator<Item = &'a str>, name: &str) -> Result<Digest> {
  let text = field(fields, name)?;
  text.parse().with_context(|| format!("bad {name}"))
}

pub fn parse_user(line: &str) -> Result<User> {
  let mut fields = line.split_whitespace();
  let key = digest_field(&mut fields, "key")?;
  let name = field(&mut fields, "name")?;
  let balance = field(&mut fields, "balance")?
    .parse::<f64>()
    .context("bad balance")?;
  if fields.next().is_some() {
    bail!("trailing fields in user record");
  }
  Ok(User {
    key,
    name: if name == NO_NAME { String::new() } else { name.to_string() },
    balance,
  })
}

/// The stored id is kept as-is; validity is checked by the core.
pub fn parse_transaction(line: &str) -> Result<Transaction> {
  let mut fields = line.split_whitespace();
  let id = digest_field(&mut fields, "id")?;
  let sender = digest_field(&mut fields, "sender")?;
  let receiver = digest_field(&mut fields, "receiver")?;
  let amount = field(&mut fields, "amount")?
    .parse::<f64>()
    .context("bad amount")?;
  if !(amount.is_finite() && amount > 0.0) {
    bail!("amount {amount} must be positive and finite");
  }
  let timestamp = field(&mut fields, "timestamp")?
    .parse::<u64>()
    .context("bad timestamp")?;
  if fields.next().is_some() {
    bail!("trailing fields in transaction record");
  }
  Ok(Transaction {
    id,
    sender,
    receiver,
    amount,
    timestamp,
  })
}
