//! # mvccdb
//!
//! An in-memory, partitioned multi-version concurrency control (MVCC)
//! transaction engine, exercised through a TPC-C-style benchmark harness.
//!
//! The hard engineering lives in three crates this one re-exports and
//! wires together:
//!
//! - [`mvcc_storage`]'s `VersionTable` holds the version chain for every
//!   key in one relation, partitioned so that concurrent access to
//!   unrelated keys never contends.
//! - [`mvcc_txtable`]'s `TxTable` tracks every in-flight transaction's
//!   status, commit time, and commit lower bound.
//! - [`mvcc_engine`]'s `VersionDb` is the root coordinator over both, and
//!   its `TransactionExecutor` drives one transaction through the full
//!   read/upload/validate/commit/post-process protocol.
//!
//! ## Quick start
//!
//! ```
//! use mvccdb::Engine;
//!
//! let engine = Engine::new(16);
//! engine.create_table("accounts", 0);
//!
//! let mut tx = engine.executor();
//! tx.begin();
//! tx.write(&"accounts".into(), b"alice".to_vec(), b"100".to_vec()).unwrap();
//! assert_eq!(tx.commit(), mvccdb::TxFinalStatus::Committed);
//!
//! let mut reader = engine.executor();
//! reader.begin();
//! let balance = reader.read(&"accounts".into(), &b"alice".to_vec()).unwrap();
//! assert_eq!(balance, Some(b"100".to_vec()));
//! ```
//!
//! A reference TPC-C-style workload generator and multi-threaded driver
//! live in [`mvcc_bench`]; `mvccbench` (the `cli` crate) wraps it behind a
//! small flag set for ad hoc runs.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod prelude;

use std::sync::Arc;

pub use mvcc_core::{EngineError, Result, TableId, TxFinalStatus, INFINITY, NONE_TX, RETURN_ERROR_CODE, UNSET_COMMIT_TIME};
pub use mvcc_engine::{
    LogicalClock, LogicalPartitionFn, PhysicalPartitionFn, Record, RecordKey, TransactionExecutor, VersionDb, WorkerCounters,
};

/// The top-level facade: owns the shared [`VersionDb`] and hands out
/// [`TransactionExecutor`] handles, one per worker.
///
/// This is the "builder that also produces the VersionDb" described in
/// the engine's external interfaces: [`Engine::builder`] configures
/// partition functions once, `build()` installs the `VersionDb`, and
/// [`Engine::executor`] is called once per worker thread to obtain its
/// bound execution handle. An `Engine` is cheap to clone (it is a thin
/// wrapper over one `Arc`) and is the unit every worker thread shares.
#[derive(Clone)]
pub struct Engine {
    db: Arc<VersionDb>,
}

impl Engine {
    /// An engine with `default_partition_count` partitions for any table
    /// created without an explicit override, and hash-based partition
    /// functions.
    pub fn new(default_partition_count: usize) -> Self {
        Engine { db: Arc::new(VersionDb::new(default_partition_count)) }
    }

    /// Start building an engine with non-default partition functions.
    pub fn builder(default_partition_count: usize) -> EngineBuilder {
        EngineBuilder { inner: mvcc_engine::VersionDbBuilder::new(default_partition_count) }
    }

    /// `CreateVersionTable`: install a new table, or return silently if
    /// `table_id` already exists (idempotent). `partition_count == 0` uses
    /// the engine's default.
    pub fn create_table(&self, table_id: impl Into<TableId>, partition_count: usize) {
        self.db.create_version_table(table_id, partition_count);
    }

    /// `DeleteTable`: remove a table. Operations against it subsequently
    /// fail with [`EngineError::UnknownTable`].
    pub fn delete_table(&self, table_id: &TableId) -> bool {
        self.db.delete_table(table_id)
    }

    /// A fresh execution handle bound to one worker. Cheap: clones the
    /// shared `Arc<VersionDb>` and allocates fresh per-worker counters. Not
    /// `Sync` — exactly one thread drives each handle at a time.
    pub fn executor(&self) -> TransactionExecutor {
        mvcc_engine::ExecutorBuilder::new(Arc::clone(&self.db)).build()
    }

    /// The shared `VersionDb`, for callers that need direct access (the
    /// benchmark harness, tests).
    pub fn db(&self) -> &Arc<VersionDb> {
        &self.db
    }
}

/// Builder for an [`Engine`] with non-default partition functions. See the
/// design note on partition-function pluggability: both functions are
/// configuration fixed at construction, never reassigned once tables
/// exist.
pub struct EngineBuilder {
    inner: mvcc_engine::VersionDbBuilder,
}

impl EngineBuilder {
    /// Override `PhysicalPartitionByKey`.
    pub fn physical_partition_fn(mut self, f: Arc<PhysicalPartitionFn>) -> Self {
        self.inner = self.inner.physical_partition_fn(f);
        self
    }

    /// Use the hash-based default for `LogicalPartitionByKey`, scoped to
    /// `worker_count` logical buckets.
    pub fn logical_workers(mut self, worker_count: usize) -> Self {
        self.inner = self.inner.logical_workers(worker_count);
        self
    }

    /// Override `LogicalPartitionByKey` entirely.
    pub fn logical_partition_fn(mut self, f: Arc<LogicalPartitionFn>) -> Self {
        self.inner = self.inner.logical_partition_fn(f);
        self
    }

    /// Build the engine.
    pub fn build(self) -> Engine {
        Engine { db: Arc::new(self.inner.build()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_facade_round_trips_a_write_through_a_fresh_executor() {
        let engine = Engine::new(4);
        engine.create_table("t", 0);

        let mut writer = engine.executor();
        writer.begin();
        writer.write(&"t".into(), b"k".to_vec(), b"v".to_vec()).unwrap();
        assert_eq!(writer.commit(), TxFinalStatus::Committed);

        let mut reader = engine.executor();
        reader.begin();
        assert_eq!(reader.read(&"t".into(), &b"k".to_vec()).unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn builder_can_fix_a_custom_logical_worker_count_before_any_table_exists() {
        let engine = Engine::builder(4).logical_workers(8).build();
        engine.create_table("t", 0);
        assert_eq!(engine.db().table_count(), 1);
    }
}
