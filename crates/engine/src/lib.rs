//! The MVCC engine: `VersionDb` plus the `TransactionExecutor` that drives
//! transactions through it.
//!
//! This crate implements the protocol in full: begin assigns a
//! snapshot-read timestamp from [`VersionDb`]'s logical clock, reads select
//! the visible version of a key, writes stage locally and are reconciled
//! against the version table at commit time through upload, validate, and
//! post-process.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod clock;
mod counters;
mod db;
mod executor;
mod record;

pub use clock::LogicalClock;
pub use counters::WorkerCounters;
pub use db::{LogicalPartitionFn, PhysicalPartitionFn, RecordKey, VersionDb, VersionDbBuilder};
pub use executor::{ExecutorBuilder, TransactionExecutor};
pub use record::Record;
