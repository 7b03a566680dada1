//! Runs the benchmark driver against a hot, narrow key space and checks the
//! invariants a correct MVCC chain must hold afterward, regardless of which
//! individual transactions happened to commit or abort.

use std::sync::Arc;

use mvcc_core::NONE_TX;
use mvcc_engine::VersionDb;

use mvcc_bench::{run_benchmark, BenchmarkConfig, RandomKvWorkload, WorkloadGenerator};

#[test]
fn committed_chains_stay_disjoint_and_covering_after_a_contended_run() {
    let db = Arc::new(VersionDb::new(8));
    db.create_version_table("accounts", 0);
    let table = db.table(&"accounts".into()).unwrap();

    // A narrow key space and a high write ratio maximize contention, so the
    // run exercises the predecessor-CAS race and the commit-lower-bound
    // push on nearly every transaction.
    let workload: Arc<dyn WorkloadGenerator> = Arc::new(RandomKvWorkload::new("accounts", 12, 4, 0.8));
    let report = run_benchmark(Arc::clone(&db), workload, BenchmarkConfig::new(8, 200, 99));
    assert!(report.total_transactions() > 0);
    assert!(report.commits > 0, "a contended run with no successful commits would indicate total livelock");

    for key in 0..12u64 {
        let key_bytes = key.to_be_bytes().to_vec();
        let mut chain: Vec<_> = table.get_version_list(key_bytes).into_iter().filter(|e| !e.is_sentinel()).collect();
        chain.sort_by_key(|e| e.version_key);

        // No version entry may be left pointing at a transaction that isn't
        // actually committed: post-process always patches tx_id back to
        // NONE_TX on commit, and rolls back (deletes, or restores the exact
        // prior image) on abort. A leftover entry with a live tx_id would
        // mean a transaction finished without completing post-process.
        for entry in &chain {
            assert_eq!(entry.tx_id, NONE_TX, "version {} of key {key} still names a pending transaction", entry.version_key);
        }

        // Every non-tail entry must be closed (end_ts != INFINITY) and the
        // chain's intervals must be contiguous: this entry's end is the
        // next one's begin. Only the newest entry may still be open.
        for pair in chain.windows(2) {
            let (older, newer) = (&pair[0], &pair[1]);
            assert!(!older.is_open(), "version {} of key {key} was superseded but never closed", older.version_key);
            assert_eq!(older.end_ts, newer.begin_ts, "gap or overlap between versions {} and {} of key {key}", older.version_key, newer.version_key);
        }
    }
}
