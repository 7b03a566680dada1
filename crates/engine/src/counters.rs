//! Per-worker commit/abort counters backing the benchmark harness report.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

/// Counters for one worker's lifetime. Updated only by the executor the
/// worker owns; read by the harness reporter after the run. Never consulted
/// by the protocol itself.
#[derive(Debug)]
pub struct WorkerCounters {
    commits: AtomicU64,
    aborts: AtomicU64,
    span: Mutex<(Option<Instant>, Option<Instant>)>,
}

impl Default for WorkerCounters {
    fn default() -> Self {
        WorkerCounters {
            commits: AtomicU64::new(0),
            aborts: AtomicU64::new(0),
            span: Mutex::new((None, None)),
        }
    }
}

impl WorkerCounters {
    /// Fresh, zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the worker starting work, if not already recorded.
    pub fn mark_started(&self) {
        let mut span = self.span.lock();
        span.0.get_or_insert_with(Instant::now);
    }

    /// Record the worker finishing. Idempotent; the first call wins.
    pub fn mark_finished(&self) {
        let mut span = self.span.lock();
        span.1.get_or_insert_with(Instant::now);
    }

    /// Increment the commit counter.
    pub fn record_commit(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the abort counter.
    pub fn record_abort(&self) {
        self.aborts.fetch_add(1, Ordering::Relaxed);
    }

    /// Total commits so far.
    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }

    /// Total aborts so far.
    pub fn aborts(&self) -> u64 {
        self.aborts.load(Ordering::Relaxed)
    }

    /// The worker's observed start/end instants, if both have been marked.
    pub fn elapsed(&self) -> Option<std::time::Duration> {
        let span = self.span.lock();
        match (span.0, span.1) {
            (Some(start), Some(end)) => Some(end.saturating_duration_since(start)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let c = WorkerCounters::new();
        assert_eq!(c.commits(), 0);
        assert_eq!(c.aborts(), 0);
        assert!(c.elapsed().is_none());
    }

    #[test]
    fn mark_started_is_idempotent() {
        let c = WorkerCounters::new();
        c.mark_started();
        let first = c.span.lock().0;
        c.mark_started();
        assert_eq!(c.span.lock().0, first);
    }

    #[test]
    fn elapsed_is_some_once_both_marks_are_set() {
        let c = WorkerCounters::new();
        c.mark_started();
        c.mark_finished();
        assert!(c.elapsed().is_some());
    }
}
