//! The immutable version entry.

use crate::ids::{TxId, VersionKey};
use crate::{Timestamp, INFINITY, NONE_TX};

/// One version of one key, valid over `[begin_ts, end_ts)`.
///
/// A `VersionEntry` is never mutated in place; the version table expresses
/// updates as "replace entry E with E′" (see `ReplaceVersionEntry` /
/// `ReplaceWholeVersionEntry` on the version table). Equality is defined by
/// `(key, version_key)` alone, per the data model: two entries with the same
/// identity but different timestamps/payload still compare equal, which is
/// what lets a CAS compare "the slot I expect" against "the slot that is
/// there" without also comparing the fields being replaced.
#[derive(Debug, Clone)]
pub struct VersionEntry<K, V> {
    /// The record this version belongs to.
    pub key: K,
    /// Monotonically increasing within a version list; the newest entry has
    /// the largest `version_key`.
    pub version_key: VersionKey,
    /// Start of the validity interval.
    pub begin_ts: Timestamp,
    /// End of the validity interval. [`INFINITY`] means "open" (the only
    /// entry in a version list eligible to be overwritten).
    pub end_ts: Timestamp,
    /// The writer that produced this version, or [`NONE_TX`] once committed
    /// and stamped.
    pub tx_id: TxId,
    /// Floor raised by validators of transactions that read this version,
    /// used to detect write-after-read conflicts.
    pub max_commit_ts: Timestamp,
    /// Opaque record payload (the caller's record bytes/value).
    pub payload: V,
}

impl<K, V> VersionEntry<K, V> {
    /// Construct the sentinel "empty head" installed by
    /// `InitializeAndGetVersionList` when a key has no versions yet. Its
    /// `version_key` of `0` lets an inserter compute
    /// `new_version_key = largest_version_key + 1` uniformly, whether or not
    /// any real version exists.
    pub fn empty_head(key: K, payload: V) -> Self {
        VersionEntry {
            key,
            version_key: 0,
            begin_ts: 0,
            end_ts: 0,
            tx_id: NONE_TX,
            max_commit_ts: 0,
            payload,
        }
    }

    /// Construct the provisional entry uploaded by a writer: open on both
    /// ends, owned by `tx_id`.
    pub fn uploaded(key: K, version_key: VersionKey, tx_id: TxId, payload: V) -> Self {
        VersionEntry {
            key,
            version_key,
            begin_ts: INFINITY,
            end_ts: INFINITY,
            tx_id,
            max_commit_ts: 0,
            payload,
        }
    }

    /// True if this is the sentinel empty head (`version_key == 0`).
    pub fn is_sentinel(&self) -> bool {
        self.version_key == 0
    }

    /// True if this version has no closing timestamp yet.
    pub fn is_open(&self) -> bool {
        self.end_ts == INFINITY
    }
}

impl<K: PartialEq, V> PartialEq for VersionEntry<K, V> {
    /// Equality by `(key, version_key)` only, per the data model: this is
    /// identity, not value equality.
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.version_key == other.version_key
    }
}

impl<K: Eq, V> Eq for VersionEntry<K, V> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_timestamps_and_payload() {
        let a = VersionEntry { key: "k", version_key: 1, begin_ts: 0, end_ts: INFINITY, tx_id: 7, max_commit_ts: 0, payload: "x" };
        let b = VersionEntry { key: "k", version_key: 1, begin_ts: 9, end_ts: 20, tx_id: 99, max_commit_ts: 5, payload: "y" };
        assert_eq!(a, b);
    }

    #[test]
    fn sentinel_head_has_version_key_zero() {
        let head: VersionEntry<&str, ()> = VersionEntry::empty_head("k", ());
        assert!(head.is_sentinel());
        assert_eq!(head.version_key, 0);
    }

    #[test]
    fn uploaded_entry_is_open_on_both_ends() {
        let e = VersionEntry::uploaded("k", 1, 42, "payload");
        assert!(e.is_open());
        assert_eq!(e.begin_ts, INFINITY);
    }
}
