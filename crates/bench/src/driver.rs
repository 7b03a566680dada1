//! The multi-threaded benchmark driver.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use mvcc_core::EngineError;
use mvcc_engine::{ExecutorBuilder, TransactionExecutor, VersionDb, WorkerCounters};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::report::BenchmarkReport;
use crate::workload::{Step, WorkloadGenerator};

/// Configuration for one [`run_benchmark`] call.
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Number of OS threads to spawn, one [`TransactionExecutor`] per
    /// thread: each worker is a parallel OS thread driving its own
    /// transaction at a time.
    pub workers: usize,
    /// Number of transactions each worker drives before the run ends.
    pub transactions_per_worker: usize,
    /// Base seed; worker `i` seeds its RNG with `seed + i` so repeated runs
    /// with the same config are reproducible.
    pub seed: u64,
}

impl BenchmarkConfig {
    /// A config requesting `workers` threads, each driving
    /// `transactions_per_worker` transactions, seeded from `seed`.
    pub fn new(workers: usize, transactions_per_worker: usize, seed: u64) -> Self {
        BenchmarkConfig { workers: workers.max(1), transactions_per_worker, seed }
    }
}

fn apply_step(executor: &mut TransactionExecutor, step: &Step) -> Result<(), EngineError> {
    match step {
        Step::Read(table, key) => {
            executor.read(table, key)?;
        }
        Step::Write(table, key, value) => {
            executor.write(table, key.clone(), value.clone())?;
        }
        Step::Insert(table, key, value) => {
            executor.insert(table, key.clone(), value.clone())?;
        }
        Step::Delete(table, key) => {
            executor.delete(table, key.clone())?;
        }
    }
    Ok(())
}

/// Spawn `config.workers` threads against the shared `db`, each looping
/// `config.transactions_per_worker` times over begin/execute-plan/commit,
/// then join and aggregate every worker's [`WorkerCounters`] into a
/// [`BenchmarkReport`].
///
/// A step that fails with an [`EngineError`] (an unknown table, for
/// example — a configuration mistake, not a protocol outcome) aborts that
/// worker's current transaction early via rollback and counts it as an
/// abort; it does not panic the worker thread, since a configuration
/// mistake discovered mid-run should not take down the whole benchmark.
pub fn run_benchmark(db: Arc<VersionDb>, workload: Arc<dyn WorkloadGenerator>, config: BenchmarkConfig) -> BenchmarkReport {
    let start = Instant::now();
    let handles: Vec<_> = (0..config.workers)
        .map(|worker_index| {
            let db = Arc::clone(&db);
            let workload = Arc::clone(&workload);
            let counters = Arc::new(WorkerCounters::new());
            let seed = config.seed.wrapping_add(worker_index as u64);
            let transactions = config.transactions_per_worker;
            let thread_counters = Arc::clone(&counters);
            let handle = thread::spawn(move || {
                let mut executor = ExecutorBuilder::new(db).counters(Arc::clone(&thread_counters)).build();
                let mut rng = StdRng::seed_from_u64(seed);
                thread_counters.mark_started();
                for _ in 0..transactions {
                    let plan = workload.next_transaction(&mut rng);
                    executor.begin();
                    for step in &plan.steps {
                        if apply_step(&mut executor, step).is_err() {
                            // A step against a table the caller never created
                            // is a configuration mistake, not a protocol
                            // outcome, but the transaction still cannot
                            // proceed: self-abort so commit() rolls back
                            // whatever was already staged.
                            executor.abort("step failed against an unknown or deleted table");
                            break;
                        }
                    }
                    executor.commit();
                }
                thread_counters.mark_finished();
            });
            (handle, counters)
        })
        .collect();

    let mut commits = 0u64;
    let mut aborts = 0u64;
    for (handle, counters) in handles {
        handle.join().expect("benchmark worker thread panicked");
        commits += counters.commits();
        aborts += counters.aborts();
    }

    BenchmarkReport { commits, aborts, elapsed: start.elapsed() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::RandomKvWorkload;

    #[test]
    fn runs_workers_and_aggregates_counters() {
        let db = Arc::new(VersionDb::new(4));
        db.create_version_table("accounts", 0);
        let workload: Arc<dyn WorkloadGenerator> = Arc::new(RandomKvWorkload::new("accounts", 50, 3, 0.5));
        let report = run_benchmark(db, workload, BenchmarkConfig::new(4, 25, 42));
        assert_eq!(report.total_transactions(), 100);
        assert!(report.commits > 0);
    }

    #[test]
    fn unknown_table_aborts_the_transaction_instead_of_panicking() {
        let db = Arc::new(VersionDb::new(4));
        // Note: table "missing" is never created.
        let workload: Arc<dyn WorkloadGenerator> = Arc::new(RandomKvWorkload::new("missing", 10, 2, 0.5));
        let report = run_benchmark(db, workload, BenchmarkConfig::new(2, 5, 1));
        assert_eq!(report.commits, 0);
        assert_eq!(report.aborts, 10);
    }
}
