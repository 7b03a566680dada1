//! `VersionTable`: the partitioned, per-relation store of version chains.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use mvcc_core::{Timestamp, TxId, VersionEntry, VersionKey};
use rustc_hash::FxHasher;

use crate::partition::Partition;
use crate::request::Operation;

/// How a key is routed to one of a table's partitions. The default hashes
/// the key with `rustc_hash`, matching the partition-local lookup structure
/// each partition already uses; callers that need deterministic placement
/// (tests, or a scheme tied to an external shard key) can supply their own.
pub type PartitionFn<K> = Box<dyn Fn(&K, usize) -> usize + Send + Sync>;

fn default_partition_fn<K: Hash>(key: &K, partition_count: usize) -> usize {
    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    (hasher.finish() as usize) % partition_count
}

/// The version table for one relation: a fixed number of independently
/// draining [`Partition`]s plus the function that routes a key to one of
/// them.
pub struct VersionTable<K, V> {
    partitions: Vec<Partition<K, V>>,
    partition_fn: PartitionFn<K>,
}

impl<K, V> VersionTable<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// A table with `partition_count` partitions and the default hash-based
    /// routing function.
    pub fn new(partition_count: usize) -> Self {
        Self::with_partition_fn(partition_count, Box::new(default_partition_fn))
    }

    /// A table with `partition_count` partitions and a caller-supplied
    /// routing function (`LogicalPartitionByKey` composed with a physical
    /// mapping, or anything else a caller needs).
    pub fn with_partition_fn(partition_count: usize, partition_fn: PartitionFn<K>) -> Self {
        assert!(partition_count > 0, "a version table needs at least one partition");
        let partitions = (0..partition_count).map(|_| Partition::default()).collect();
        VersionTable { partitions, partition_fn }
    }

    fn route(&self, key: &K) -> &Partition<K, V> {
        let idx = (self.partition_fn)(key, self.partitions.len());
        &self.partitions[idx]
    }

    /// `GetVersionList`.
    pub fn get_version_list(&self, key: K) -> Vec<VersionEntry<K, V>> {
        self.route(&key).submit(Operation::GetVersionList(key)).into_list()
    }

    /// `InitializeAndGetVersionList`. `blank_payload` is only used if the
    /// key has no chain yet, to populate the sentinel head's payload slot.
    pub fn initialize_and_get_version_list(&self, key: K, blank_payload: V) -> Vec<VersionEntry<K, V>> {
        self.route(&key).submit(Operation::InitializeAndGetVersionList(key, blank_payload)).into_list()
    }

    /// `UploadNewVersionEntry`.
    pub fn upload_new_version_entry(&self, key: K, version_key: VersionKey, entry: VersionEntry<K, V>) -> bool {
        self.route(&key).submit(Operation::UploadNewVersionEntry { key, version_key, entry }).into_applied()
    }

    /// `ReplaceVersionEntry`'s compare-and-swap.
    #[allow(clippy::too_many_arguments)]
    pub fn replace_version_entry(
        &self,
        key: K,
        version_key: VersionKey,
        begin_ts: Timestamp,
        end_ts: Timestamp,
        tx_id: TxId,
        read_tx_id: TxId,
        expected_end_ts: Timestamp,
    ) -> Option<VersionEntry<K, V>> {
        self.route(&key)
            .submit(Operation::ReplaceVersionEntry { key, version_key, begin_ts, end_ts, tx_id, read_tx_id, expected_end_ts })
            .into_entry()
    }

    /// `ReplaceWholeVersionEntry`.
    pub fn replace_whole_version_entry(&self, key: K, version_key: VersionKey, entry: VersionEntry<K, V>) -> bool {
        self.route(&key).submit(Operation::ReplaceWholeVersionEntry { key, version_key, entry }).into_applied()
    }

    /// `UpdateVersionMaxCommitTs`.
    pub fn update_version_max_commit_ts(&self, key: K, version_key: VersionKey, ts: Timestamp) -> Option<VersionEntry<K, V>> {
        self.route(&key).submit(Operation::UpdateVersionMaxCommitTs { key, version_key, ts }).into_entry()
    }

    /// `GetVersionEntryByKey`, single-entry form.
    pub fn get_version_entry_by_key(&self, key: K, version_key: VersionKey) -> Option<VersionEntry<K, V>> {
        self.route(&key).submit(Operation::GetVersionEntryByKey { key, version_key }).into_entry()
    }

    /// `GetVersionEntryByKey`'s batch form: independent lookups, one per
    /// partition that actually holds a requested key, merged by the caller.
    pub fn get_version_entries_by_key(&self, keys: &[(K, VersionKey)]) -> HashMap<(K, VersionKey), VersionEntry<K, V>> {
        let mut out = HashMap::with_capacity(keys.len());
        for (key, version_key) in keys {
            if let Some(entry) = self.get_version_entry_by_key(key.clone(), *version_key) {
                out.insert((key.clone(), *version_key), entry);
            }
        }
        out
    }

    /// `DeleteVersionEntry`: roll back an aborted insert.
    pub fn delete_version_entry(&self, key: K, version_key: VersionKey) -> bool {
        self.route(&key).submit(Operation::DeleteVersionEntry { key, version_key }).into_applied()
    }

    /// `Clear`: drop every chain in every partition. Test-only; bypasses the
    /// request queue entirely rather than route through the visitor
    /// protocol, since it needs every partition regardless of key.
    pub fn clear(&self) {
        for partition in &self.partitions {
            partition.clear();
        }
    }

    /// Number of partitions this table was built with.
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &'static str, vk: VersionKey, tx: TxId) -> VersionEntry<&'static str, &'static str> {
        VersionEntry { key, version_key: vk, begin_ts: 0, end_ts: i64::MAX, tx_id: tx, max_commit_ts: 0, payload: "v" }
    }

    #[test]
    fn initialize_installs_sentinel_exactly_once() {
        let table: VersionTable<&str, &str> = VersionTable::new(4);
        let first = table.initialize_and_get_version_list("k", "");
        assert_eq!(first.len(), 1);
        assert!(first[0].is_sentinel());
        table.upload_new_version_entry("k", 1, entry("k", 1, 5));
        let second = table.initialize_and_get_version_list("k", "");
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn get_version_list_does_not_implicitly_initialize() {
        let table: VersionTable<&str, &str> = VersionTable::new(4);
        assert!(table.get_version_list("never-seen").is_empty());
    }

    #[test]
    fn replace_version_entry_cas_succeeds_once() {
        let table: VersionTable<&str, &str> = VersionTable::new(1);
        table.upload_new_version_entry("k", 1, entry("k", 1, 10));
        let first = table.replace_version_entry("k", 1, 0, 50, 20, 10, i64::MAX).unwrap();
        assert_eq!(first.tx_id, 20);
        // Replaying the same CAS with the stale expected_end_ts now fails.
        let second = table.replace_version_entry("k", 1, 0, 99, 30, 20, i64::MAX).unwrap();
        assert_eq!(second.tx_id, 20);
        assert_eq!(second.end_ts, 50);
    }

    #[test]
    fn delete_rolls_back_an_aborted_insert() {
        let table: VersionTable<&str, &str> = VersionTable::new(1);
        table.upload_new_version_entry("k", 1, entry("k", 1, 10));
        assert!(table.delete_version_entry("k", 1));
        assert!(table.get_version_entry_by_key("k", 1).is_none());
    }

    #[test]
    fn batch_lookup_spans_multiple_partitions() {
        let table: VersionTable<&str, &str> = VersionTable::new(8);
        table.upload_new_version_entry("a", 1, entry("a", 1, 1));
        table.upload_new_version_entry("b", 1, entry("b", 1, 2));
        let got = table.get_version_entries_by_key(&[("a", 1), ("b", 1), ("missing", 1)]);
        assert_eq!(got.len(), 2);
        assert_eq!(got[&("a", 1)].tx_id, 1);
    }

    #[test]
    fn clear_empties_every_partition() {
        let table: VersionTable<&str, &str> = VersionTable::new(4);
        for i in 0..20 {
            let key: &'static str = Box::leak(i.to_string().into_boxed_str());
            table.upload_new_version_entry(key, 1, entry(key, 1, i));
        }
        table.clear();
        for i in 0..20 {
            let key: &'static str = Box::leak(i.to_string().into_boxed_str());
            assert!(table.get_version_entry_by_key(key, 1).is_none());
        }
    }
}
