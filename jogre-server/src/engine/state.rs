//! Account-state bookkeeper (§4.4) and the four-valued state comparator
//! used by the `/changes` and `/set` method generators (§4.5).
//!
//! Grounded on the `increment_seq_number_for_user`/
//! `fetch_seq_number_for_user` merge-operator counter in
//! `store/rocksdb.rs`, generalised from one counter per user to one
//! `(lowestModSeq, highestModSeq)` pair per `(accountId, type)`.

use std::collections::HashMap;

use crate::engine::error::StateError;

/// The retained modseq range for one `(accountId, type)` pair, plus any
/// bump pending commit of the current transaction.
#[derive(Debug, Clone, Copy)]
struct ModSeqRange {
    /// The oldest modseq for which `/changes` can still compute a diff.
    /// Below this, a client must resynchronise from scratch.
    lowest: u64,
    /// The modseq a `Foo/get` call right now would report as `state`.
    highest: u64,
}

/// Four-valued outcome of comparing a client's `sinceState` against an
/// account's retained history (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateComparison {
    /// `since == current`: nothing has changed.
    InSync,
    /// `lowest <= since < current`: a changes diff can be computed.
    Okay,
    /// `since < lowest`: history has been pruned past this point.
    Resync,
    /// `since` was never a state this account held.
    Bogus,
}

/// In-memory per-request view over an account's modseq rows, with
/// pending bumps localised to nested transaction scopes via
/// snapshot/restore over a single map (§4.4, §5).
#[derive(Debug, Clone, Default)]
pub struct AccountState {
    committed: HashMap<(String, String), ModSeqRange>,
    /// Bumps made so far in the currently open top-level transaction,
    /// keyed the same way. Not visible to `state_for`/`compare` until
    /// `commit()` folds them into `committed`.
    pending: HashMap<(String, String), u64>,
}

pub type NestedSnapshot = HashMap<(String, String), u64>;

impl AccountState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the persisted modseq range for `(account_id, type_name)`,
    /// seeding `committed` from storage. A never-before-seen pair starts
    /// at `(0, 0)`.
    pub fn load(&mut self, account_id: &str, type_name: &str, lowest: u64, highest: u64) {
        self.committed.insert(
            (account_id.to_string(), type_name.to_string()),
            ModSeqRange { lowest, highest },
        );
    }

    fn range(&self, account_id: &str, type_name: &str) -> ModSeqRange {
        self.committed
            .get(&(account_id.to_string(), type_name.to_string()))
            .copied()
            .unwrap_or(ModSeqRange { lowest: 0, highest: 0 })
    }

    /// The state string a `Foo/get` call would report right now,
    /// including any not-yet-committed pending bump from earlier in this
    /// same transaction.
    pub fn state_for(&self, account_id: &str, type_name: &str) -> u64 {
        let key = (account_id.to_string(), type_name.to_string());
        self.pending
            .get(&key)
            .copied()
            .unwrap_or_else(|| self.range(account_id, type_name).highest)
    }

    /// Ensures `(account_id, type_name)` has a bumped state pending for
    /// this transaction, returning the new state. Idempotent within a
    /// single top-level transaction: repeated calls for the same pair do
    /// not bump twice, matching the requirement that one `/set` call
    /// producing several mutations to the same type only advances the
    /// state once.
    pub fn ensure_state_bumped(&mut self, account_id: &str, type_name: &str) -> u64 {
        let key = (account_id.to_string(), type_name.to_string());
        if let Some(&state) = self.pending.get(&key) {
            return state;
        }
        let next = self.range(account_id, type_name).highest + 1;
        self.pending.insert(key, next);
        next
    }

    /// Snapshots `pending` before entering a nested transaction scope
    /// (e.g. one `/set` phase), so a failure in that scope can roll back
    /// only the bumps it made.
    pub fn enter_nested(&self) -> NestedSnapshot {
        self.pending.clone()
    }

    /// Restores `pending` to a prior snapshot after a nested scope
    /// fails. Bumps made before entering the scope are preserved; bumps
    /// made inside it are discarded.
    pub fn exit_nested_rollback(&mut self, snapshot: NestedSnapshot) {
        self.pending = snapshot;
    }

    /// Folds all pending bumps into `committed` as the outer transaction
    /// succeeds, returning the `(accountId, type)` pairs that changed so
    /// the caller can persist the new `highest` values.
    pub fn commit(&mut self) -> Vec<(String, String, u64)> {
        let mut bumped = Vec::with_capacity(self.pending.len());
        for ((account_id, type_name), new_highest) in self.pending.drain() {
            let entry = self
                .committed
                .entry((account_id.clone(), type_name.clone()))
                .or_insert(ModSeqRange { lowest: 0, highest: 0 });
            entry.highest = new_highest;
            bumped.push((account_id, type_name, new_highest));
        }
        bumped
    }

    /// Compares a client's `sinceState` (already parsed as a modseq)
    /// against the retained range (§4.5).
    pub fn compare(&self, account_id: &str, type_name: &str, since: u64) -> StateComparison {
        let range = self.range(account_id, type_name);
        let current = self.state_for(account_id, type_name);

        if since == current {
            StateComparison::InSync
        } else if since < range.lowest {
            StateComparison::Resync
        } else if since < current {
            StateComparison::Okay
        } else {
            StateComparison::Bogus
        }
    }

    pub fn try_compare(
        &self,
        account_id: &str,
        type_name: &str,
        since: u64,
    ) -> Result<StateComparison, StateError> {
        match self.compare(account_id, type_name, since) {
            StateComparison::Resync => Err(StateError::Resync),
            StateComparison::Bogus => Err(StateError::Bogus),
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_account_state_is_zero() {
        let state = AccountState::new();
        assert_eq!(state.state_for("acc1", "Cookie"), 0);
        assert_eq!(
            state.compare("acc1", "Cookie", 0),
            StateComparison::InSync
        );
    }

    #[test]
    fn ensure_state_bumped_is_idempotent_within_a_transaction() {
        let mut state = AccountState::new();
        let first = state.ensure_state_bumped("acc1", "Cookie");
        let second = state.ensure_state_bumped("acc1", "Cookie");
        assert_eq!(first, second);
        assert_eq!(first, 1);
    }

    #[test]
    fn commit_folds_pending_into_committed() {
        let mut state = AccountState::new();
        state.ensure_state_bumped("acc1", "Cookie");
        let bumped = state.commit();
        assert_eq!(bumped, vec![("acc1".to_string(), "Cookie".to_string(), 1)]);
        assert_eq!(state.state_for("acc1", "Cookie"), 1);
    }

    #[test]
    fn nested_rollback_discards_only_scoped_bumps() {
        let mut state = AccountState::new();
        state.ensure_state_bumped("acc1", "Cookie");
        let snapshot = state.enter_nested();
        state.ensure_state_bumped("acc1", "Pastry");
        state.exit_nested_rollback(snapshot);

        assert_eq!(state.state_for("acc1", "Cookie"), 1);
        assert_eq!(state.state_for("acc1", "Pastry"), 0);
    }

    #[test]
    fn compare_detects_resync_and_bogus() {
        let mut state = AccountState::new();
        state.load("acc1", "Cookie", 5, 10);

        assert_eq!(state.compare("acc1", "Cookie", 4), StateComparison::Resync);
        assert_eq!(state.compare("acc1", "Cookie", 7), StateComparison::Okay);
        assert_eq!(
            state.compare("acc1", "Cookie", 10),
            StateComparison::InSync
        );
        assert_eq!(state.compare("acc1", "Cookie", 11), StateComparison::Bogus);
    }
}
