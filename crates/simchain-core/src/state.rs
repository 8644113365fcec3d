//! Balances and pending transactions, shared between rounds and copied
//! privately by each mining worker.

use crate::{Digest, Transaction, User};
use rand::Rng;
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LedgerState {
    pub users: BTreeMap<Digest, User>,
    pub pending: Vec<Transaction>,
}

impl LedgerState {
    pub fn new(users: impl IntoIterator<Item = User>, pending: Vec<Transaction>) -> Self {
        Self {
            users: users.into_iter().map(|u| (u.key, u)).collect(),
            pending,
        }
    }

    pub fn balance(&self, key: &Digest) -> Option<f64> {
        self.users.get(key).map(|u| u.balance)
    }

    pub fn total_balance(&self) -> f64 {
        self.users.values().map(|u| u.balance).sum()
    }

    /// Drop pending transactions whose id does not match their contents.
    /// Returns how many were removed.
    pub fn prune_invalid(&mut self) -> usize {
        let before = self.pending.len();
        self.pending.retain(|tx| match tx.validate() {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "dropping invalid transaction");
                false
            }
        });
        before - self.pending.len()
    }

    /// Move `tx.amount` from sender to receiver if the sender can cover it.
    /// An unknown sender has no funds; an unknown receiver is opened with a
    /// zero balance. Amounts that are not finite and positive never apply.
    pub fn transfer(&mut self, tx: &Transaction) -> bool {
        if !(tx.amount.is_finite() && tx.amount > 0.0) {
            return false;
        }
        let covered = self
            .users
            .get(&tx.sender)
            .is_some_and(|u| u.balance >= tx.amount);
        if !covered {
            return false;
        }
        if let Some(sender) = self.users.get_mut(&tx.sender) {
            sender.balance -= tx.amount;
        }
        self.users
            .entry(tx.receiver)
            .or_insert_with(|| User {
                key: tx.receiver,
                name: String::new(),
                balance: 0.0,
            })
            .balance += tx.amount;
        true
    }

    /// Pick up to `limit` transactions at random from the pending pool.
    ///
    /// Every considered transaction leaves the pool; only those whose sender
    /// can pay at that point are applied to the balances and returned.
    pub fn select_transactions<R: Rng + ?Sized>(
        &mut self,
        limit: usize,
        rng: &mut R,
    ) -> Vec<Transaction> {
        let mut selected = Vec::new();
        while selected.len() < limit && !self.pending.is_empty() {
            let index = rng.gen_range(0..self.pending.len());
            let tx = self.pending.swap_remove(index);
            if self.transfer(&tx) {
                selected.push(tx);
            }
        }
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest;
    use rand::{rngs::StdRng, SeedableRng};

    fn user(name: &str, balance: f64) -> User {
        User {
            key: digest::hash(name.as_bytes()),
            name: name.to_string(),
            balance,
        }
    }

    fn tx(from: &User, to: &User, amount: f64, ts: u64) -> Transaction {
        Transaction::new(from.key, to.key, amount, ts)
    }

    #[test]
    fn transfer_respects_balance() {
        let alice = user("alice", 10.0);
        let bob = user("bob", 0.0);
        let mut state = LedgerState::new([alice.clone(), bob.clone()], vec![]);

        assert!(state.transfer(&tx(&alice, &bob, 7.0, 1)));
        assert_eq!(state.balance(&alice.key), Some(3.0));
        assert_eq!(state.balance(&bob.key), Some(7.0));

        assert!(!state.transfer(&tx(&alice, &bob, 7.0, 2)));
        assert_eq!(state.balance(&alice.key), Some(3.0));
    }

    #[test]
    fn non_positive_or_non_finite_amounts_are_refused() {
        let alice = user("alice", 0.0);
        let bob = user("bob", 0.0);
        let mut state = LedgerState::new([alice.clone(), bob.clone()], vec![]);

        for amount in [-50.0, 0.0, f64::NAN, f64::NEG_INFINITY] {
            assert!(!state.transfer(&tx(&alice, &bob, amount, 1)), "{amount}");
        }
        assert_eq!(state.balance(&alice.key), Some(0.0));
        assert_eq!(state.balance(&bob.key), Some(0.0));
    }

    #[test]
    fn unknown_sender_cannot_pay_and_unknown_receiver_is_opened() {
        let alice = user("alice", 10.0);
        let ghost = user("ghost", 0.0);
        let mut state = LedgerState::new([alice.clone()], vec![]);

        assert!(!state.transfer(&tx(&ghost, &alice, 1.0, 1)));
        assert!(state.transfer(&tx(&alice, &ghost, 4.0, 2)));
        assert_eq!(state.balance(&ghost.key), Some(4.0));
    }

    #[test]
    fn selection_drains_considered_transactions() {
        let alice = user("alice", 100.0);
        let bob = user("bob", 0.0);
        let pending: Vec<Transaction> = (0..10).map(|i| tx(&alice, &bob, 30.0, i)).collect();
        let mut state = LedgerState::new([alice.clone(), bob.clone()], pending);

        let mut rng = StdRng::seed_from_u64(7);
        let selected = state.select_transactions(100, &mut rng);

        assert_eq!(selected.len(), 3);
        assert!(state.pending.is_empty());
        assert_eq!(state.balance(&alice.key), Some(10.0));
        assert_eq!(state.balance(&bob.key), Some(90.0));
    }

    #[test]
    fn selection_stops_at_limit() {
        let alice = user("alice", 1_000.0);
        let bob = user("bob", 0.0);
        let pending: Vec<Transaction> = (0..10).map(|i| tx(&alice, &bob, 1.0, i)).collect();
        let mut state = LedgerState::new([alice, bob], pending);

        let mut rng = StdRng::seed_from_u64(1);
        let selected = state.select_transactions(4, &mut rng);
        assert_eq!(selected.len(), 4);
        assert_eq!(state.pending.len(), 6);
    }

    #[test]
    fn selection_is_reproducible_for_a_seed() {
        let alice = user("alice", 50.0);
        let bob = user("bob", 50.0);
        let pending: Vec<Transaction> = (0..20)
            .map(|i| {
                if i % 2 == 0 {
                    tx(&alice, &bob, 9.0, i)
                } else {
                    tx(&bob, &alice, 11.0, i)
                }
            })
            .collect();
        let state = LedgerState::new([alice, bob], pending);

        let mut a = state.clone();
        let mut b = state.clone();
        let picked_a = a.select_transactions(5, &mut StdRng::seed_from_u64(99));
        let picked_b = b.select_transactions(5, &mut StdRng::seed_from_u64(99));
        assert_eq!(picked_a, picked_b);
        assert_eq!(a, b);
    }

    #[test]
    fn selection_conserves_total_balance() {
        let users = [user("a", 40.0), user("b", 25.0), user("c", 5.0)];
        let mut pending = Vec::new();
        for i in 0..30u64 {
            let from = &users[(i % 3) as usize];
            let to = &users[((i + 1) % 3) as usize];
            pending.push(tx(from, to, (i % 7 + 1) as f64, i));
        }
        let mut state = LedgerState::new(users, pending);
        let before = state.total_balance();
        state.select_transactions(30, &mut StdRng::seed_from_u64(3));
        assert!((state.total_balance() - before).abs() < 1e-9);
    }

    #[test]
    fn prune_invalid_drops_tampered() {
        let alice = user("alice", 10.0);
        let bob = user("bob", 0.0);
        let good = tx(&alice, &bob, 1.0, 1);
        let mut bad = tx(&alice, &bob, 2.0, 2);
        bad.amount = 5.0;
        let mut state = LedgerState::new([alice, bob], vec![good.clone(), bad]);

        assert_eq!(state.prune_invalid(), 1);
        assert_eq!(state.pending, vec![good]);
    }
}
