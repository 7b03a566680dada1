//! `VersionDb`: the root coordinator.
//!
//! Owns the named version tables, the transaction table, and the two
//! partition functions. Table-qualified calls from the executor route
//! through here to the right [`VersionTable`].

use std::sync::Arc;

use dashmap::DashMap;
use mvcc_core::{EngineError, Result, TableId};
use mvcc_storage::VersionTable;
use mvcc_txtable::TxTable;
use parking_lot::RwLock;

use crate::clock::LogicalClock;
use crate::record::Record;

/// The opaque record key. Partition functions and version tables are keyed
/// on this directly; the executor never interprets its contents.
pub type RecordKey = Vec<u8>;

/// `PhysicalPartitionByKey`: routes a key to a partition index within one
/// table.
pub type PhysicalPartitionFn = dyn Fn(&RecordKey, usize) -> usize + Send + Sync;

/// `LogicalPartitionByKey`: a process-wide routing function, independent of
/// any one table's partition count, used to give workers key affinity.
pub type LogicalPartitionFn = dyn Fn(&RecordKey) -> usize + Send + Sync;

fn default_hash_fn(key: &RecordKey) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = rustc_hash::FxHasher::default();
    key.hash(&mut hasher);
    hasher.finish()
}

fn default_physical_partition(key: &RecordKey, partition_count: usize) -> usize {
    (default_hash_fn(key) as usize) % partition_count
}

fn default_logical_partition(key: &RecordKey, worker_count: usize) -> usize {
    if worker_count == 0 {
        0
    } else {
        (default_hash_fn(key) as usize) % worker_count
    }
}

/// Builder for a [`VersionDb`], per the "partition functions are
/// configuration, pass them in at construction" design note.
pub struct VersionDbBuilder {
    default_partition_count: usize,
    physical_partition_fn: Arc<PhysicalPartitionFn>,
    logical_partition_fn: Arc<LogicalPartitionFn>,
    logical_worker_count: usize,
}

impl VersionDbBuilder {
    /// A builder with hash-based defaults for both partition functions and
    /// `partition_count` partitions for any table created without an
    /// explicit override.
    pub fn new(default_partition_count: usize) -> Self {
        VersionDbBuilder {
            default_partition_count,
            physical_partition_fn: Arc::new(default_physical_partition),
            logical_partition_fn: Arc::new(|_key: &RecordKey| 0),
            logical_worker_count: 1,
        }
    }

    /// Override `PhysicalPartitionByKey`.
    pub fn physical_partition_fn(mut self, f: Arc<PhysicalPartitionFn>) -> Self {
        self.physical_partition_fn = f;
        self
    }

    /// Use the hash-based default for `LogicalPartitionByKey`, scoped to
    /// `worker_count` logical buckets.
    pub fn logical_workers(mut self, worker_count: usize) -> Self {
        self.logical_worker_count = worker_count.max(1);
        let worker_count = self.logical_worker_count;
        self.logical_partition_fn = Arc::new(move |key: &RecordKey| default_logical_partition(key, worker_count));
        self
    }

    /// Override `LogicalPartitionByKey` entirely.
    pub fn logical_partition_fn(mut self, f: Arc<LogicalPartitionFn>) -> Self {
        self.logical_partition_fn = f;
        self
    }

    /// Build the database.
    pub fn build(self) -> VersionDb {
        VersionDb {
            tables: DashMap::new(),
            tx_table: Arc::new(TxTable::new()),
            default_partition_count: self.default_partition_count,
            physical_partition_fn: self.physical_partition_fn,
            logical_partition_fn: RwLock::new(self.logical_partition_fn),
            clock: LogicalClock::new(),
        }
    }
}

/// The root coordinator: table registry, transaction table, partition
/// functions, and the logical clock.
pub struct VersionDb {
    tables: DashMap<TableId, Arc<VersionTable<RecordKey, Record>>>,
    tx_table: Arc<TxTable>,
    default_partition_count: usize,
    physical_partition_fn: Arc<PhysicalPartitionFn>,
    logical_partition_fn: RwLock<Arc<LogicalPartitionFn>>,
    clock: LogicalClock,
}

impl VersionDb {
    /// A database with `default_partition_count` partitions per table and
    /// hash-based partition functions.
    pub fn new(default_partition_count: usize) -> Self {
        VersionDbBuilder::new(default_partition_count).build()
    }

    /// `CreateVersionTable`: idempotent — returns the existing table if
    /// `table_id` was already created, ignoring `partition_count` in that
    /// case.
    pub fn create_version_table(&self, table_id: impl Into<TableId>, partition_count: usize) -> Arc<VersionTable<RecordKey, Record>> {
        let table_id = table_id.into();
        let partition_count = if partition_count == 0 { self.default_partition_count } else { partition_count };
        Arc::clone(self.tables.entry(table_id).or_insert_with(|| {
            let physical = Arc::clone(&self.physical_partition_fn);
            Arc::new(VersionTable::with_partition_fn(partition_count, Box::new(move |k: &RecordKey, n| physical(k, n))))
        }).value())
    }

    /// `DeleteTable`: removes a table. Operations against a deleted table
    /// subsequently fail with [`EngineError::UnknownTable`].
    pub fn delete_table(&self, table_id: &TableId) -> bool {
        self.tables.remove(table_id).is_some()
    }

    /// Look up a table, or fail if it was never created (or has been
    /// deleted).
    pub fn table(&self, table_id: &TableId) -> Result<Arc<VersionTable<RecordKey, Record>>> {
        self.tables
            .get(table_id)
            .map(|t| Arc::clone(t.value()))
            .ok_or_else(|| EngineError::UnknownTable(table_id.to_string()))
    }

    /// The shared transaction table.
    pub fn tx_table(&self) -> &Arc<TxTable> {
        &self.tx_table
    }

    /// The logical clock backing snapshot-read timestamps and commit-time
    /// proposal floors.
    pub fn clock(&self) -> &LogicalClock {
        &self.clock
    }

    /// `LogicalPartitionByKey(key)`.
    pub fn logical_partition(&self, key: &RecordKey) -> usize {
        (self.logical_partition_fn.read())(key)
    }

    /// Reassign `LogicalPartitionByKey`. Per the design note resolving this
    /// open question: reassignment after any table has been created is a
    /// bug in the caller. Debug builds catch it with an assertion; release
    /// builds silently keep the old function instead of applying a change
    /// that would produce undefined routing for already-populated tables.
    pub fn set_logical_partition_fn(&self, f: Arc<LogicalPartitionFn>) {
        debug_assert!(self.tables.is_empty(), "LogicalPartitionByKey must not be reassigned once tables exist");
        if self.tables.is_empty() {
            *self.logical_partition_fn.write() = f;
        }
    }

    /// Number of tables currently registered.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}
