//! `mvccbench` — a thin CLI driver for the reference benchmark harness.
//!
//! Spins up a [`VersionDb`], registers the requested tables, and runs
//! [`mvcc_bench::run_benchmark`] against a [`RandomKvWorkload`], printing a
//! throughput/abort summary. Stands in for a real TPC-C driver's launcher
//! and reporter; this binary is the only place in the workspace allowed to
//! print directly to stdout.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use mvcc_bench::{BenchmarkConfig, RandomKvWorkload, WorkloadGenerator};
use mvcc_engine::VersionDb;

/// Run the reference key-value benchmark against the in-memory MVCC engine.
#[derive(Debug, Parser)]
#[command(name = "mvccbench", author, version, about)]
struct Args {
    /// Number of worker threads, each driving one TransactionExecutor.
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Number of distinct keys in the key space.
    #[arg(long, default_value_t = 10_000)]
    keys: u64,

    /// Number of transactions each worker runs before the benchmark ends.
    #[arg(long, default_value_t = 10_000)]
    transactions: usize,

    /// Number of version tables to spread the key space across.
    #[arg(long, default_value_t = 1)]
    tables: usize,

    /// Number of partitions per version table.
    #[arg(long, default_value_t = 16)]
    partitions: usize,

    /// Operations staged per transaction.
    #[arg(long, default_value_t = 4)]
    ops_per_transaction: usize,

    /// Fraction of operations that are writes, in [0, 1].
    #[arg(long, default_value_t = 0.5)]
    write_ratio: f64,

    /// Base RNG seed; worker i seeds with seed + i.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    if args.workers == 0 || args.tables == 0 {
        eprintln!("error: --workers and --tables must both be at least 1");
        return ExitCode::FAILURE;
    }

    let db = Arc::new(VersionDb::new(args.partitions));
    let mut workloads: Vec<Arc<dyn WorkloadGenerator>> = Vec::with_capacity(args.tables);
    for i in 0..args.tables {
        let table_id = format!("table-{i}");
        db.create_version_table(table_id.clone(), args.partitions);
        workloads.push(Arc::new(RandomKvWorkload::new(table_id, args.keys, args.ops_per_transaction, args.write_ratio)));
    }

    // A single table drives one generator directly; multiple tables round
    // the worker's transactions across each in turn via a tiny composite
    // generator so every table actually sees traffic.
    let workload: Arc<dyn WorkloadGenerator> = if workloads.len() == 1 {
        workloads.remove(0)
    } else {
        Arc::new(RoundRobinWorkload::new(workloads))
    };

    let config = BenchmarkConfig::new(args.workers, args.transactions, args.seed);
    let report = mvcc_bench::run_benchmark(db, workload, config);

    println!("workers:            {}", args.workers);
    println!("tables:              {}", args.tables);
    println!("transactions run:    {}", report.total_transactions());
    println!("committed:           {}", report.commits);
    println!("aborted:             {}", report.aborts);
    println!("commit rate:         {:.2}%", report.commit_rate() * 100.0);
    println!("elapsed:             {:.3}s", report.elapsed.as_secs_f64());
    println!("throughput:          {:.0} commits/sec", report.throughput());

    ExitCode::SUCCESS
}

/// Dispatches each generated transaction to one of several underlying
/// generators in round-robin order, so a multi-table run exercises every
/// table instead of only the first.
struct RoundRobinWorkload {
    generators: Vec<Arc<dyn WorkloadGenerator>>,
    next: std::sync::atomic::AtomicUsize,
}

impl RoundRobinWorkload {
    fn new(generators: Vec<Arc<dyn WorkloadGenerator>>) -> Self {
        RoundRobinWorkload { generators, next: std::sync::atomic::AtomicUsize::new(0) }
    }
}

impl WorkloadGenerator for RoundRobinWorkload {
    fn next_transaction(&self, rng: &mut rand::rngs::StdRng) -> mvcc_bench::TransactionPlan {
        let idx = self.next.fetch_add(1, std::sync::atomic::Ordering::Relaxed) % self.generators.len();
        self.generators[idx].next_transaction(rng)
    }
}
