pub mod block_log;
pub mod flat_file;

use anyhow::Result;
use simchain_core::LedgerState;

/// Persistence for balances and the pending pool between rounds.
pub trait LedgerStore: Send + Sync {
    fn load_state(&self) -> Result<LedgerState>;
    fn save_state(&self, state: &LedgerState) -> Result<()>;
}
