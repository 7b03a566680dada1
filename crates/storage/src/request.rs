//! The operations a [`crate::partition::Partition`] serves, and their
//! responses, decoupled from the request/response channel plumbing.

use mvcc_core::{Timestamp, TxId, VersionEntry, VersionKey};

/// One `VersionTable` operation, addressed at a single key (all operations
/// that touch a key route to that key's partition; `Clear` is table-wide and
/// bypasses the queue entirely, see [`crate::table::VersionTable::clear`]).
pub enum Operation<K, V> {
    /// `GetVersionList`: hand back the key's current chain as-is. Does not
    /// install a sentinel head if none exists.
    GetVersionList(K),
    /// `InitializeAndGetVersionList`: install a sentinel empty head first if
    /// the key has never been seen, then hand back the chain.
    InitializeAndGetVersionList(K, V),
    /// `UploadNewVersionEntry`.
    UploadNewVersionEntry {
        /// Key the chain belongs to.
        key: K,
        /// Slot to claim.
        version_key: VersionKey,
        /// Entry to install if the slot is free.
        entry: VersionEntry<K, V>,
    },
    /// `ReplaceVersionEntry`'s compare-and-swap.
    ReplaceVersionEntry {
        /// Key the chain belongs to.
        key: K,
        /// Slot to update.
        version_key: VersionKey,
        /// Proposed new `begin_ts`.
        begin_ts: Timestamp,
        /// Proposed new `end_ts`.
        end_ts: Timestamp,
        /// Proposed new `tx_id` (the writer taking ownership of the slot).
        tx_id: TxId,
        /// Expected current `tx_id`; the CAS guard.
        read_tx_id: TxId,
        /// Expected current `end_ts`; the CAS guard.
        expected_end_ts: Timestamp,
    },
    /// `ReplaceWholeVersionEntry`: unconditional overwrite.
    ReplaceWholeVersionEntry {
        /// Key the chain belongs to.
        key: K,
        /// Slot to overwrite.
        version_key: VersionKey,
        /// Replacement entry.
        entry: VersionEntry<K, V>,
    },
    /// `UpdateVersionMaxCommitTs`.
    UpdateVersionMaxCommitTs {
        /// Key the chain belongs to.
        key: K,
        /// Slot to bump.
        version_key: VersionKey,
        /// Candidate timestamp; the slot keeps the larger of this and its
        /// current value.
        ts: Timestamp,
    },
    /// `GetVersionEntryByKey`, single-entry form.
    GetVersionEntryByKey {
        /// Key the chain belongs to.
        key: K,
        /// Slot to read.
        version_key: VersionKey,
    },
    /// `DeleteVersionEntry`: roll back an aborted insert.
    DeleteVersionEntry {
        /// Key the chain belongs to.
        key: K,
        /// Slot to remove.
        version_key: VersionKey,
    },
}

/// The result of executing one [`Operation`].
pub enum Response<K, V> {
    /// The full chain for a key (possibly including the sentinel head).
    List(Vec<VersionEntry<K, V>>),
    /// Whether an unconditional or guarded insert/overwrite succeeded.
    Applied(bool),
    /// A single entry, or `None` if the slot did not exist.
    Entry(Option<VersionEntry<K, V>>),
}

impl<K, V> Response<K, V> {
    /// Unwrap a [`Response::List`]; panics on any other variant. Used
    /// internally where the calling code already knows which operation it
    /// sent.
    pub fn into_list(self) -> Vec<VersionEntry<K, V>> {
        match self {
            Response::List(l) => l,
            _ => unreachable!("partition answered the wrong shape of response"),
        }
    }

    /// Unwrap a [`Response::Applied`]; panics on any other variant.
    pub fn into_applied(self) -> bool {
        match self {
            Response::Applied(b) => b,
            _ => unreachable!("partition answered the wrong shape of response"),
        }
    }

    /// Unwrap a [`Response::Entry`]; panics on any other variant.
    pub fn into_entry(self) -> Option<VersionEntry<K, V>> {
        match self {
            Response::Entry(e) => e,
            _ => unreachable!("partition answered the wrong shape of response"),
        }
    }
}
