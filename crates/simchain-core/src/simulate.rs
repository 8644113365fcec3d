//! Seeded generation of users and transactions for simulation runs.

use crate::{digest, Transaction, User};
use rand::seq::SliceRandom;
use rand::Rng;
use std::ops::Range;

const NAMES: &[&str] = &[
    "Ada", "Basil", "Cora", "Dmitri", "Edith", "Felix", "Greta", "Hugo", "Ines", "Jonah",
    "Kira", "Lior", "Mona", "Nils", "Opal", "Pavel", "Quinn", "Rosa", "Soren", "Tess",
];

/// `count` users with random keys, names and balances in `balance`.
pub fn generate_users<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    balance: Range<f64>,
) -> Vec<User> {
    (0..count)
        .map(|_| {
            let seed: u32 = rng.gen();
            let name = NAMES.choose(rng).copied().unwrap_or("anon");
            User {
                key: digest::hash(seed.to_string().as_bytes()),
                name: name.to_string(),
                balance: rng.gen_range(balance.clone()),
            }
        })
        .collect()
}

/// `count` transactions between random users, stamped up to `max_age_secs`
/// before `now`. Empty if there are no users.
pub fn generate_transactions<R: Rng + ?Sized>(
    rng: &mut R,
    users: &[User],
    count: usize,
    amount: Range<f64>,
    max_age_secs: u64,
    now: u64,
) -> Vec<Transaction> {
    if users.is_empty() {
        return Vec::new();
    }
    (0..count)
        .map(|_| {
            let sender = &users[rng.gen_range(0..users.len())];
            let receiver = &users[rng.gen_range(0..users.len())];
            let age = rng.gen_range(0..=max_age_secs);
            Transaction::new(
                sender.key,
                receiver.key,
                rng.gen_range(amount.clone()),
                now.saturating_sub(age),
            )
        })
        .collect()
}
