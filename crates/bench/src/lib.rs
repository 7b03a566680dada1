//! Reference workload generator and multi-threaded benchmark driver.
//!
//! Stands in for the full TPC-C driver the core was extracted from: a
//! [`WorkloadGenerator`] produces [`TransactionPlan`]s, [`run_benchmark`]
//! spawns one OS thread per worker and drives each through a
//! [`mvcc_engine::TransactionExecutor`], and [`BenchmarkReport`] aggregates
//! the counters every executor already keeps. Real TPC-C parameter
//! generation, CSV ingestion, and multi-process coordination stay external.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod driver;
mod report;
mod workload;

pub use driver::{run_benchmark, BenchmarkConfig};
pub use report::BenchmarkReport;
pub use workload::{RandomKvWorkload, Step, TransactionPlan, WorkloadGenerator};
