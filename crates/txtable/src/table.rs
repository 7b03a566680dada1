//! The transaction table proper: allocation and lookup of transaction ids.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use mvcc_core::{TxId, TxStatus, Timestamp, RETURN_ERROR_CODE};

use crate::entry::TxTableEntry;
use crate::TxTableSnapshot;

/// Metadata for every in-flight (and, until reclaimed, every finished)
/// transaction.
///
/// Allocation of fresh transaction ids and lookup of existing entries are
/// served from a [`DashMap`], so distinct transactions never contend with
/// each other; only operations against the *same* `tx_id` share a lock, and
/// that lock (see [`TxTableEntry`]) is held only for the handful of integer
/// comparisons each operation needs.
pub struct TxTable {
    entries: DashMap<TxId, Arc<TxTableEntry>>,
    next_tx_id: AtomicI64,
}

impl TxTable {
    /// Create an empty transaction table. Transaction ids are allocated
    /// starting at 1 (0 is reserved as [`mvcc_core::NONE_TX`]).
    pub fn new() -> Self {
        TxTable {
            entries: DashMap::new(),
            next_tx_id: AtomicI64::new(1),
        }
    }

    /// Allocate a unique, positive transaction id and install its entry in
    /// state `Ongoing`, `commitTime = -1`, `commitLowerBound = 0`.
    pub fn insert_new_tx(&self) -> TxId {
        let tx_id = self.next_tx_id.fetch_add(1, Ordering::SeqCst);
        self.entries.insert(tx_id, Arc::new(TxTableEntry::new(tx_id)));
        tracing::debug!(tx_id, "allocated transaction");
        tx_id
    }

    /// Borrow the live entry for `tx_id`, if it still exists.
    ///
    /// This is the fast path used internally by the executor; callers that
    /// only want a read-only copy of the fields should prefer
    /// [`TxTable::get_tx_table_entry`].
    pub fn entry(&self, tx_id: TxId) -> Option<Arc<TxTableEntry>> {
        self.entries.get(&tx_id).map(|e| Arc::clone(e.value()))
    }

    /// `GetTxTableEntry`: a snapshot of the entry's fields, or `None` if
    /// `tx_id` was never allocated (or has since been reclaimed by
    /// [`TxTable::remove_tx`]).
    pub fn get_tx_table_entry(&self, tx_id: TxId) -> Option<TxTableSnapshot> {
        self.entry(tx_id).map(|e| e.snapshot())
    }

    /// `UpdateTxStatus`: apply a permitted transition. Unknown `tx_id`s are
    /// silently ignored, matching the "no-op" treatment of any other
    /// disallowed transition.
    pub fn update_tx_status(&self, tx_id: TxId, status: TxStatus) {
        if let Some(entry) = self.entry(tx_id) {
            entry.update_status(status);
            if matches!(status, TxStatus::Aborted) {
                tracing::warn!(tx_id, "transaction aborted");
            } else if matches!(status, TxStatus::Committed) {
                tracing::debug!(tx_id, "transaction committed");
            }
        }
    }

    /// `SetAndGetCommitTime`. Returns [`RETURN_ERROR_CODE`] if `tx_id` is
    /// unknown; otherwise delegates to the entry.
    pub fn set_and_get_commit_time(&self, tx_id: TxId, proposed: Timestamp) -> Timestamp {
        match self.entry(tx_id) {
            Some(entry) => entry.set_and_get_commit_time(proposed),
            None => RETURN_ERROR_CODE,
        }
    }

    /// `UpdateCommitLowerBound`. Returns [`RETURN_ERROR_CODE`] (`-2`) on an
    /// unknown `tx_id`; otherwise `-1` if the bound was accepted, or the
    /// transaction's (already fixed) commit time.
    pub fn update_commit_lower_bound(&self, tx_id: TxId, lower_bound: Timestamp) -> Timestamp {
        match self.entry(tx_id) {
            Some(entry) => entry.update_commit_lower_bound(lower_bound),
            None => RETURN_ERROR_CODE,
        }
    }

    /// Drop a finalized transaction's entry. Callers must only do this once
    /// every version entry that named `tx_id` as a pending writer has been
    /// patched or rolled back in post-process; the table does not verify
    /// this itself; it trusts the executor.
    pub fn remove_tx(&self, tx_id: TxId) -> bool {
        self.entries.remove(&tx_id).is_some()
    }

    /// Number of entries currently retained (including finished
    /// transactions not yet reclaimed).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TxTable {
    fn default() -> Self {
        Self::new()
    }
}
