//! The version chain for a single key.

use mvcc_core::{Timestamp, VersionEntry, VersionKey};

/// An ordered sequence of [`VersionEntry`] for one key, strictly increasing
/// by `version_key`.
///
/// May begin with the sentinel empty head (`version_key == 0`) installed by
/// `InitializeAndGetVersionList`; the sentinel is never visible to readers
/// (see [`VersionList::visible_entries`]) but lets every inserter compute
/// `new_version_key = largest_version_key + 1` uniformly, whether or not a
/// real version exists yet.
#[derive(Debug, Clone, Default)]
pub struct VersionList<K, V> {
    entries: Vec<VersionEntry<K, V>>,
}

impl<K: Clone, V: Clone> VersionList<K, V> {
    /// An empty version list with no sentinel head installed yet.
    pub fn new() -> Self {
        VersionList { entries: Vec::new() }
    }

    /// Ensure a sentinel empty head is present, installing one if the list
    /// has nothing at all. Idempotent.
    pub fn ensure_initialized(&mut self, key: &K, blank_payload: V) {
        if self.entries.is_empty() {
            self.entries.push(VersionEntry::empty_head(key.clone(), blank_payload));
        }
    }

    /// The largest `version_key` currently present (`0` if only the
    /// sentinel, or nothing, is present).
    pub fn largest_version_key(&self) -> VersionKey {
        self.entries.last().map(|e| e.version_key).unwrap_or(0)
    }

    /// All entries, including the sentinel head if present. This is what
    /// `GetVersionList` / `InitializeAndGetVersionList` hand back; callers
    /// that want read-visible versions should use
    /// [`VersionList::visible_entries`].
    pub fn entries(&self) -> &[VersionEntry<K, V>] {
        &self.entries
    }

    /// Entries with `version_key > 0`, i.e. excluding the sentinel head.
    pub fn visible_entries(&self) -> impl Iterator<Item = &VersionEntry<K, V>> {
        self.entries.iter().filter(|e| !e.is_sentinel())
    }

    /// Look up one entry by `version_key`.
    pub fn get(&self, version_key: VersionKey) -> Option<&VersionEntry<K, V>> {
        self.entries.iter().find(|e| e.version_key == version_key)
    }

    fn position(&self, version_key: VersionKey) -> Option<usize> {
        self.entries.iter().position(|e| e.version_key == version_key)
    }

    /// `UploadNewVersionEntry`: install `entry` at `version_key` iff that
    /// slot is empty. Returns `false` (without mutating) if another writer
    /// already occupies it.
    pub fn insert_if_absent(&mut self, version_key: VersionKey, entry: VersionEntry<K, V>) -> bool {
        if self.position(version_key).is_some() {
            return false;
        }
        // Version keys are assigned by the executor as `head + 1` and are
        // strictly increasing, so in the common case this is an append;
        // handle the general case defensively to keep the invariant even
        // under out-of-order delivery.
        let idx = self.entries.partition_point(|e| e.version_key < version_key);
        self.entries.insert(idx, entry);
        true
    }

    /// `ReplaceVersionEntry`'s CAS: succeeds only if the current entry at
    /// `version_key` has `tx_id == read_tx_id` and `end_ts == expected_end_ts`.
    /// Returns the post-image on success, the current image on failure, or
    /// `None` if the slot does not exist.
    #[allow(clippy::too_many_arguments)]
    pub fn replace_if(
        &mut self,
        version_key: VersionKey,
        begin_ts: Timestamp,
        end_ts: Timestamp,
        tx_id: mvcc_core::TxId,
        read_tx_id: mvcc_core::TxId,
        expected_end_ts: Timestamp,
    ) -> Option<VersionEntry<K, V>> {
        let idx = self.position(version_key)?;
        let current = &self.entries[idx];
        if current.tx_id != read_tx_id || current.end_ts != expected_end_ts {
            return Some(current.clone());
        }
        let mut next = current.clone();
        next.begin_ts = begin_ts;
        next.end_ts = end_ts;
        next.tx_id = tx_id;
        self.entries[idx] = next.clone();
        Some(next)
    }

    /// `ReplaceWholeVersionEntry`: unconditional overwrite of an existing
    /// slot. Returns `false` if the slot does not exist.
    pub fn replace_whole(&mut self, version_key: VersionKey, entry: VersionEntry<K, V>) -> bool {
        match self.position(version_key) {
            Some(idx) => {
                self.entries[idx] = entry;
                true
            }
            None => false,
        }
    }

    /// `UpdateVersionMaxCommitTs`: `maxCommitTs := max(current, ts)`. Returns
    /// the updated entry, or `None` if the slot does not exist.
    pub fn bump_max_commit_ts(&mut self, version_key: VersionKey, ts: Timestamp) -> Option<VersionEntry<K, V>> {
        let idx = self.position(version_key)?;
        let entry = &mut self.entries[idx];
        entry.max_commit_ts = entry.max_commit_ts.max(ts);
        Some(entry.clone())
    }

    /// `DeleteVersionEntry`: remove a slot outright (used only to roll back
    /// an aborted insert). Returns whether anything was removed.
    pub fn delete(&mut self, version_key: VersionKey) -> bool {
        match self.position(version_key) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(vk: VersionKey, tx: mvcc_core::TxId, begin: Timestamp, end: Timestamp) -> VersionEntry<&'static str, &'static str> {
        VersionEntry {
            key: "k",
            version_key: vk,
            begin_ts: begin,
            end_ts: end,
            tx_id: tx,
            max_commit_ts: 0,
            payload: "v",
        }
    }

    #[test]
    fn ensure_initialized_installs_sentinel_once() {
        let mut list: VersionList<&str, &str> = VersionList::new();
        list.ensure_initialized(&"k", "");
        assert_eq!(list.entries().len(), 1);
        assert_eq!(list.largest_version_key(), 0);
        list.ensure_initialized(&"k", "");
        assert_eq!(list.entries().len(), 1);
    }

    #[test]
    fn insert_if_absent_rejects_duplicate_slot() {
        let mut list: VersionList<&str, &str> = VersionList::new();
        assert!(list.insert_if_absent(1, entry(1, 10, i64::MAX, i64::MAX)));
        assert!(!list.insert_if_absent(1, entry(1, 20, i64::MAX, i64::MAX)));
        assert_eq!(list.get(1).unwrap().tx_id, 10);
    }

    #[test]
    fn replace_if_checks_tx_id_and_end_ts() {
        let mut list: VersionList<&str, &str> = VersionList::new();
        list.insert_if_absent(1, entry(1, 10, i64::MAX, i64::MAX));
        // Wrong read_tx_id: fails, returns current image.
        let current = list.replace_if(1, 5, 99, 0, 999, i64::MAX).unwrap();
        assert_eq!(current.tx_id, 10);
        assert_eq!(current.end_ts, i64::MAX);
        // Correct CAS succeeds.
        let post = list.replace_if(1, 5, 99, 0, 10, i64::MAX).unwrap();
        assert_eq!(post.tx_id, 0);
        assert_eq!(post.end_ts, 99);
    }

    #[test]
    fn bump_max_commit_ts_never_decreases() {
        let mut list: VersionList<&str, &str> = VersionList::new();
        list.insert_if_absent(1, entry(1, 0, 0, i64::MAX));
        list.bump_max_commit_ts(1, 5);
        list.bump_max_commit_ts(1, 2);
        assert_eq!(list.get(1).unwrap().max_commit_ts, 5);
    }

    #[test]
    fn delete_rolls_back_an_insert() {
        let mut list: VersionList<&str, &str> = VersionList::new();
        list.insert_if_absent(1, entry(1, 10, i64::MAX, i64::MAX));
        assert!(list.delete(1));
        assert!(list.get(1).is_none());
        assert!(!list.delete(1));
    }

    #[test]
    fn visible_entries_excludes_sentinel() {
        let mut list: VersionList<&str, &str> = VersionList::new();
        list.ensure_initialized(&"k", "");
        list.insert_if_absent(1, entry(1, 10, 0, i64::MAX));
        assert_eq!(list.visible_entries().count(), 1);
        assert_eq!(list.entries().len(), 2);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn entry(vk: VersionKey, tx: mvcc_core::TxId) -> VersionEntry<&'static str, &'static str> {
        VersionEntry { key: "k", version_key: vk, begin_ts: 0, end_ts: i64::MAX, tx_id: tx, max_commit_ts: 0, payload: "v" }
    }

    proptest! {
        /// However many slots get inserted, in whatever order, the chain
        /// stays sorted by `version_key`: `insert_if_absent` is the only
        /// way new slots appear, and it always inserts at the sorted
        /// position rather than appending blindly.
        #[test]
        fn entries_stay_sorted_by_version_key(keys in prop::collection::vec(1i64..200, 0..50)) {
            let mut list: VersionList<&str, &str> = VersionList::new();
            for (i, vk) in keys.into_iter().enumerate() {
                list.insert_if_absent(vk, entry(vk, i as i64));
            }
            let version_keys: Vec<_> = list.entries().iter().map(|e| e.version_key).collect();
            let mut sorted = version_keys.clone();
            sorted.sort_unstable();
            prop_assert_eq!(version_keys, sorted);
        }

        /// `UpdateVersionMaxCommitTs` never lowers `max_commit_ts`, no
        /// matter what sequence of candidate timestamps it is called with.
        #[test]
        fn bump_max_commit_ts_is_monotone(candidates in prop::collection::vec(any::<i16>(), 0..100)) {
            let mut list: VersionList<&str, &str> = VersionList::new();
            list.insert_if_absent(1, entry(1, 1));
            let mut expected = 0i64;
            for c in candidates {
                let ts = c as i64;
                list.bump_max_commit_ts(1, ts);
                expected = expected.max(ts);
                prop_assert_eq!(list.get(1).unwrap().max_commit_ts, expected);
            }
        }

        /// `ReplaceVersionEntry`'s CAS only ever mutates the slot when both
        /// guards (`tx_id == read_tx_id`, `end_ts == expected_end_ts`)
        /// match what is actually stored; any mismatch leaves the slot
        /// byte-for-byte as it was.
        #[test]
        fn replace_if_is_a_true_compare_and_swap(
            guess_tx in 0i64..5,
            guess_end in prop::sample::select(vec![0i64, 1, i64::MAX]),
        ) {
            let mut list: VersionList<&str, &str> = VersionList::new();
            list.insert_if_absent(1, entry(1, 2));
            let before = list.get(1).cloned().unwrap();

            let result = list.replace_if(1, 10, 20, 99, guess_tx, guess_end);
            let guard_matches = before.tx_id == guess_tx && before.end_ts == guess_end;

            if guard_matches {
                prop_assert_eq!(result.unwrap().tx_id, 99);
                prop_assert_eq!(list.get(1).unwrap().tx_id, 99);
            } else {
                prop_assert_eq!(result.unwrap().tx_id, before.tx_id);
                prop_assert_eq!(list.get(1).unwrap().tx_id, before.tx_id);
                prop_assert_eq!(list.get(1).unwrap().end_ts, before.end_ts);
            }
        }
    }
}
