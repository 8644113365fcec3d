use rand::{rngs::StdRng, SeedableRng};
use simchain_core::simulate::{generate_transactions, generate_users};
use simchain_core::LedgerState;
use simchain_store::flat_file::FlatFileStore;
use tempfile::{tempdir, TempDir};

pub fn create_temp_store() -> (TempDir, FlatFileStore) {
    // Keep the TempDir alive for as long as the store is in use
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let store = FlatFileStore::open(temp_dir.path()).expect("Failed to open FlatFileStore");
    (temp_dir, store)
}

pub fn sample_state(seed: u64, users: usize, txs: usize) -> LedgerState {
    let mut rng = StdRng::seed_from_u64(seed);
    let users = generate_users(&mut rng, users, 100.0..10_000.0);
    let pending = generate_transactions(&mut rng, &users, txs, 0.5..5_000.0, 7 * 3_600, 1_700_000_000);
    LedgerState::new(users, pending)
}

pub fn teardown_store(temp_dir: TempDir) {
    let path = temp_dir.path().to_path_buf();
    temp_dir.close().expect("Failed to delete temp dir");
    assert!(!path.exists(), "Store directory should be removed");
}
