//! The transaction executor: drives one transaction through read, upload,
//! validate, commit-decision, and post-process.
//!
//! An executor is bound to one worker and is meant to be reused across many
//! transactions rather than recreated per-call: `begin()` resets its
//! internal read/write sets in place.

use std::sync::Arc;

use mvcc_core::{
    Result, TableId, Timestamp, TxFinalStatus, TxId, TxStatus, VersionEntry, VersionKey, INFINITY, NONE_TX,
    RETURN_ERROR_CODE,
};

use crate::counters::WorkerCounters;
use crate::db::{RecordKey, VersionDb};
use crate::record::Record;

/// One entry in a transaction's read set: enough to re-validate the read
/// without re-scanning the whole chain.
#[derive(Debug, Clone)]
struct ReadSetEntry {
    table_id: TableId,
    key: RecordKey,
    version_key: VersionKey,
    observed_max_commit_ts: Timestamp,
}

/// One staged write. `prior_head` is the version this write's new entry
/// will supersede, captured at staging time; `None` means this key has no
/// prior visible version (a pure insert with nothing to close).
#[derive(Debug, Clone)]
struct WriteSetEntry {
    table_id: TableId,
    key: RecordKey,
    new_version_key: VersionKey,
    record: Record,
    prior_head: Option<VersionEntry<RecordKey, Record>>,
    /// Filled in during the upload phase: whether the new entry was
    /// actually installed, and whether the predecessor was actually closed.
    /// Both drive post-process, since post-process must only undo what this
    /// transaction actually did.
    uploaded: bool,
    closed_predecessor: bool,
}

struct TxContext {
    tx_id: TxId,
    rts: Timestamp,
    read_set: Vec<ReadSetEntry>,
    write_set: Vec<WriteSetEntry>,
    aborted: bool,
    abort_reason: Option<&'static str>,
}

/// Drives one transaction at a time through the MVCC protocol. Not `Sync`;
/// one executor belongs to exactly one worker thread.
pub struct TransactionExecutor {
    db: Arc<VersionDb>,
    counters: Arc<WorkerCounters>,
    current: Option<TxContext>,
}

/// Builds a [`TransactionExecutor`] bound to a shared [`VersionDb`].
pub struct ExecutorBuilder {
    db: Arc<VersionDb>,
    counters: Arc<WorkerCounters>,
}

impl ExecutorBuilder {
    /// Start building an executor against `db`.
    pub fn new(db: Arc<VersionDb>) -> Self {
        ExecutorBuilder { db, counters: Arc::new(WorkerCounters::new()) }
    }

    /// Share an existing counters handle instead of allocating a fresh one
    /// (the harness driver uses this to keep a handle after handing the
    /// executor to a worker thread).
    pub fn counters(mut self, counters: Arc<WorkerCounters>) -> Self {
        self.counters = counters;
        self
    }

    /// Build the executor.
    pub fn build(self) -> TransactionExecutor {
        TransactionExecutor { db: self.db, counters: self.counters, current: None }
    }
}

impl TransactionExecutor {
    /// This executor's commit/abort counters.
    pub fn counters(&self) -> &Arc<WorkerCounters> {
        &self.counters
    }

    /// Begin a new transaction, discarding any previous one's state.
    /// Returns the freshly allocated transaction id.
    pub fn begin(&mut self) -> TxId {
        let tx_id = self.db.tx_table().insert_new_tx();
        let rts = self.db.clock().now();
        tracing::debug!(tx_id, rts, "begin");
        self.current = Some(TxContext {
            tx_id,
            rts,
            read_set: Vec::new(),
            write_set: Vec::new(),
            aborted: false,
            abort_reason: None,
        });
        tx_id
    }

    fn ctx(&mut self) -> &mut TxContext {
        self.current.as_mut().expect("read/write/commit called with no transaction in progress")
    }

    fn abort_now(ctx: &mut TxContext, reason: &'static str) {
        if !ctx.aborted {
            ctx.aborted = true;
            ctx.abort_reason = Some(reason);
        }
    }

    /// Self-abort the in-progress transaction at the caller's request. The
    /// transaction still must be finished with a call to [`Self::commit`],
    /// which will see the transaction already marked aborted and run
    /// post-process rollback instead of upload/validate. Idempotent; a
    /// second call is a no-op.
    pub fn abort(&mut self, reason: &'static str) {
        Self::abort_now(self.ctx(), reason);
    }

    /// Read `key` from `table_id` at this transaction's snapshot timestamp.
    /// Returns `None` if no version is visible (never written, or a
    /// tombstone).
    pub fn read(&mut self, table_id: &TableId, key: &RecordKey) -> Result<Option<Vec<u8>>> {
        if self.ctx().aborted {
            return Ok(None);
        }
        let table = self.db.table(table_id)?;
        let rts = self.ctx().rts;
        let list = table.get_version_list(key.clone());
        let visible = visible_version(&list, rts, &self.db);
        let ctx = self.ctx();
        match visible {
            Some(entry) => {
                ctx.read_set.push(ReadSetEntry {
                    table_id: table_id.clone(),
                    key: key.clone(),
                    version_key: entry.version_key,
                    observed_max_commit_ts: entry.max_commit_ts,
                });
                Ok(entry.payload.clone().into_value())
            }
            None => Ok(None),
        }
    }

    fn stage_write(&mut self, table_id: &TableId, key: RecordKey, record: Record) -> Result<()> {
        if self.ctx().aborted {
            return Ok(());
        }
        let table = self.db.table(table_id)?;
        let list = table.initialize_and_get_version_list(key.clone(), Record::Tombstone);
        let new_version_key = list.last().map(|e| e.version_key).unwrap_or(0) + 1;
        let prior_head = list.iter().rev().find(|e| !e.is_sentinel() && e.version_key == new_version_key - 1).cloned();
        self.ctx().write_set.push(WriteSetEntry {
            table_id: table_id.clone(),
            key,
            new_version_key,
            record,
            prior_head,
            uploaded: false,
            closed_predecessor: false,
        });
        Ok(())
    }

    /// Stage a write to an existing or new key.
    pub fn write(&mut self, table_id: &TableId, key: RecordKey, value: Vec<u8>) -> Result<()> {
        self.stage_write(table_id, key, Record::Value(value))
    }

    /// Stage an insert. Functionally identical to [`Self::write`]; kept as a
    /// distinct entry point because the external API names it separately.
    pub fn insert(&mut self, table_id: &TableId, key: RecordKey, value: Vec<u8>) -> Result<()> {
        self.stage_write(table_id, key, Record::Value(value))
    }

    /// Stage a deletion (a write whose payload is a tombstone).
    pub fn delete(&mut self, table_id: &TableId, key: RecordKey) -> Result<()> {
        self.stage_write(table_id, key, Record::Tombstone)
    }

    /// Run upload, validate, and commit-decision, then post-process, and
    /// return the final status. Always consumes the in-progress transaction
    /// (a subsequent call to `read`/`write` requires a new `begin()`).
    pub fn commit(&mut self) -> TxFinalStatus {
        let mut ctx = self.current.take().expect("commit() called with no transaction in progress");
        let tx_id = ctx.tx_id;

        if !ctx.aborted {
            self.upload_phase(&mut ctx);
        }
        if !ctx.aborted {
            self.validate_phase(&mut ctx);
        }

        let final_status = if ctx.aborted {
            self.db.tx_table().update_tx_status(tx_id, TxStatus::Aborted);
            self.post_process_rollback(&ctx);
            self.counters.record_abort();
            tracing::warn!(tx_id, reason = ctx.abort_reason.unwrap_or("unspecified"), "abort");
            TxFinalStatus::Aborted
        } else {
            self.db.tx_table().update_tx_status(tx_id, TxStatus::Committed);
            let commit_time = self.db.tx_table().get_tx_table_entry(tx_id).map(|s| s.commit_time).unwrap_or(0);
            self.post_process_commit(&ctx, commit_time);
            self.counters.record_commit();
            tracing::debug!(tx_id, commit_time, "commit");
            TxFinalStatus::Committed
        };

        self.db.tx_table().remove_tx(tx_id);
        final_status
    }

    fn upload_phase(&self, ctx: &mut TxContext) {
        let tx_id = ctx.tx_id;
        for w in ctx.write_set.iter_mut() {
            let table = match self.db.table(&w.table_id) {
                Ok(t) => t,
                Err(_) => {
                    ctx.aborted = true;
                    ctx.abort_reason = Some("table deleted mid-transaction");
                    return;
                }
            };
            let new_entry = VersionEntry::uploaded(w.key.clone(), w.new_version_key, tx_id, w.record.clone());
            if !table.upload_new_version_entry(w.key.clone(), w.new_version_key, new_entry) {
                ctx.aborted = true;
                ctx.abort_reason = Some("version-key slot already claimed");
                return;
            }
            w.uploaded = true;

            if let Some(head) = &w.prior_head {
                let result = table.replace_version_entry(
                    w.key.clone(),
                    head.version_key,
                    head.begin_ts,
                    tx_id,
                    tx_id,
                    head.tx_id,
                    head.end_ts,
                );
                match result {
                    Some(after) if after.tx_id == tx_id && after.end_ts == tx_id => {
                        w.closed_predecessor = true;
                    }
                    _ => {
                        ctx.aborted = true;
                        ctx.abort_reason = Some("predecessor CAS lost a race");
                        return;
                    }
                }
            }
        }
    }

    fn validate_phase(&self, ctx: &mut TxContext) {
        let tx_id = ctx.tx_id;
        let tx_table = self.db.tx_table();

        let mut proposed = tx_table.get_tx_table_entry(tx_id).map(|s| s.commit_lower_bound).unwrap_or(0);
        proposed = proposed.max(self.db.clock().tick());
        for r in &ctx.read_set {
            proposed = proposed.max(r.observed_max_commit_ts + 1);
        }
        for w in &ctx.write_set {
            if let Some(head) = &w.prior_head {
                proposed = proposed.max(head.max_commit_ts + 1);
            }
        }

        let commit_time = tx_table.set_and_get_commit_time(tx_id, proposed);
        if commit_time < 0 {
            ctx.aborted = true;
            ctx.abort_reason = Some("commit-time proposal rejected");
            return;
        }

        for r in &ctx.read_set {
            let table = match self.db.table(&r.table_id) {
                Ok(t) => t,
                Err(_) => {
                    ctx.aborted = true;
                    ctx.abort_reason = Some("table deleted mid-transaction");
                    return;
                }
            };
            let refreshed = table.update_version_max_commit_ts(r.key.clone(), r.version_key, commit_time);
            let Some(refreshed) = refreshed else {
                ctx.aborted = true;
                ctx.abort_reason = Some("read version vanished before validation");
                return;
            };
            let list = table.get_version_list(r.key.clone());
            let superseded = list.iter().any(|e| {
                e.version_key != refreshed.version_key
                    && e.tx_id == NONE_TX
                    && e.begin_ts > refreshed.begin_ts
                    && e.begin_ts <= commit_time
            });
            if superseded {
                ctx.aborted = true;
                ctx.abort_reason = Some("read was superseded by a newer committed version");
                return;
            }
        }

        for w in &ctx.write_set {
            let table = match self.db.table(&w.table_id) {
                Ok(t) => t,
                Err(_) => continue,
            };
            let list = table.get_version_list(w.key.clone());
            let concurrent_writers: Vec<TxId> = list
                .iter()
                .filter(|e| e.tx_id != NONE_TX && e.tx_id != tx_id)
                .filter(|e| matches!(tx_table.get_tx_table_entry(e.tx_id).map(|s| s.status), Some(TxStatus::Ongoing)))
                .map(|e| e.tx_id)
                .collect();
            for other in concurrent_writers {
                let pushed = tx_table.update_commit_lower_bound(other, commit_time + 1);
                if pushed == RETURN_ERROR_CODE {
                    ctx.aborted = true;
                    ctx.abort_reason = Some("commit-lower-bound push hit a protocol fault");
                    return;
                }
                if pushed >= 0 && pushed <= commit_time {
                    ctx.aborted = true;
                    ctx.abort_reason = Some("a concurrent writer already committed ahead of us");
                    return;
                }
            }
        }
    }

    fn post_process_commit(&self, ctx: &TxContext, commit_time: Timestamp) {
        let tx_id = ctx.tx_id;
        for w in &ctx.write_set {
            let Ok(table) = self.db.table(&w.table_id) else { continue };
            if w.uploaded {
                table.replace_version_entry(w.key.clone(), w.new_version_key, commit_time, INFINITY, NONE_TX, tx_id, INFINITY);
            }
            if w.closed_predecessor {
                if let Some(head) = &w.prior_head {
                    let mut patched = head.clone();
                    patched.end_ts = commit_time;
                    patched.tx_id = NONE_TX;
                    table.replace_whole_version_entry(w.key.clone(), head.version_key, patched);
                }
            }
        }
    }

    fn post_process_rollback(&self, ctx: &TxContext) {
        let tx_id = ctx.tx_id;
        for w in &ctx.write_set {
            let Ok(table) = self.db.table(&w.table_id) else { continue };
            if w.uploaded {
                table.delete_version_entry(w.key.clone(), w.new_version_key);
            }
            if w.closed_predecessor {
                if let Some(head) = &w.prior_head {
                    table.replace_version_entry(w.key.clone(), head.version_key, head.begin_ts, INFINITY, head.tx_id, tx_id, tx_id);
                }
            }
        }
    }
}

/// The visible version of a key's chain at `rts`, per the read phase's
/// visibility rule.
fn visible_version(
    list: &[VersionEntry<RecordKey, Record>],
    rts: Timestamp,
    db: &VersionDb,
) -> Option<VersionEntry<RecordKey, Record>> {
    list.iter()
        .filter(|e| !e.is_sentinel())
        .find_map(|e| {
            let (begin, end) = effective_interval(e, db, rts)?;
            if rts >= begin && rts < end {
                Some(e.clone())
            } else {
                None
            }
        })
}

/// The interval a reader should use for visibility, resolving the writer's
/// status where the raw fields don't already carry a final timestamp.
///
/// Two distinct placeholder shapes share the `tx_id != NONE_TX` condition:
/// a brand-new entry (`begin == end == INFINITY`) is not visible at all
/// until its writer commits; a predecessor mid-close has a real `begin` but
/// an `end` that is actually the closer's transaction id, not a timestamp,
/// until post-process patches it.
fn effective_interval(e: &VersionEntry<RecordKey, Record>, db: &VersionDb, rts: Timestamp) -> Option<(Timestamp, Timestamp)> {
    if e.tx_id == NONE_TX {
        return Some((e.begin_ts, e.end_ts));
    }
    let snapshot = db.tx_table().get_tx_table_entry(e.tx_id);
    if e.begin_ts == INFINITY {
        return match snapshot {
            Some(s) if s.status == TxStatus::Committed => Some((s.commit_time, INFINITY)),
            _ => None,
        };
    }
    match snapshot {
        Some(s) if s.status == TxStatus::Committed && s.commit_time <= rts => Some((e.begin_ts, s.commit_time)),
        _ => Some((e.begin_ts, INFINITY)),
    }
}
