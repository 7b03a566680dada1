//! A single transaction table entry.

use std::sync::atomic::{AtomicU8, Ordering};

use mvcc_core::{TxId, TxStatus, Timestamp, UNSET_COMMIT_TIME};
use parking_lot::Mutex;

/// `commitTime` and `commitLowerBound` are read and written together by the
/// validate phase, so they live behind one short-lived lock rather than two
/// independent atomics. The critical sections here are a handful of integer
/// comparisons — cheap enough that a `parking_lot::Mutex` costs nothing
/// observable next to the partition traffic in the version table.
struct TxTimes {
    commit_time: Timestamp,
    commit_lower_bound: Timestamp,
}

/// The transaction table's entry for one transaction.
///
/// Status is a separate atomic from `(commit_time, commit_lower_bound)`
/// because `UpdateTxStatus` and the commit-time machinery are never
/// validated together: a transaction's own executor is the only writer of
/// its status, while `commit_lower_bound` can be pushed by *other*
/// transactions' validate phases concurrently.
pub struct TxTableEntry {
    tx_id: TxId,
    status: AtomicU8,
    times: Mutex<TxTimes>,
}

impl TxTableEntry {
    pub(crate) fn new(tx_id: TxId) -> Self {
        TxTableEntry {
            tx_id,
            status: AtomicU8::new(TxStatus::Ongoing as u8),
            times: Mutex::new(TxTimes {
                commit_time: UNSET_COMMIT_TIME,
                commit_lower_bound: 0,
            }),
        }
    }

    /// This entry's transaction id.
    pub fn tx_id(&self) -> TxId {
        self.tx_id
    }

    /// The transaction's current status.
    pub fn status(&self) -> TxStatus {
        TxStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// The transaction's commit time, or [`mvcc_core::UNSET_COMMIT_TIME`] if
    /// it has not committed yet.
    pub fn commit_time(&self) -> Timestamp {
        self.times.lock().commit_time
    }

    /// The current commit lower bound.
    pub fn commit_lower_bound(&self) -> Timestamp {
        self.times.lock().commit_lower_bound
    }

    /// Apply one of the two permitted transitions out of `Ongoing`. Any
    /// other requested transition (including `Ongoing -> Ongoing`, or a
    /// request against an already-terminal entry) is a no-op, per the
    /// transaction state machine: `Ongoing -> Committed` and
    /// `Ongoing -> Aborted` are both terminal and irreversible.
    pub fn update_status(&self, target: TxStatus) {
        if !matches!(target, TxStatus::Committed | TxStatus::Aborted) {
            return;
        }
        let _ = self.status.compare_exchange(
            TxStatus::Ongoing as u8,
            target as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// `SetAndGetCommitTime`: see [`crate::TxTable::set_and_get_commit_time`]
    /// for the full contract. Operates on this entry directly once the
    /// table has resolved `tx_id` to it.
    pub fn set_and_get_commit_time(&self, proposed: Timestamp) -> Timestamp {
        let mut times = self.times.lock();
        if times.commit_time != UNSET_COMMIT_TIME {
            return times.commit_time;
        }
        if proposed < times.commit_lower_bound {
            return -1;
        }
        times.commit_time = proposed.max(times.commit_lower_bound);
        times.commit_time
    }

    /// `UpdateCommitLowerBound`: see
    /// [`crate::TxTable::update_commit_lower_bound`] for the full contract.
    pub fn update_commit_lower_bound(&self, lower_bound: Timestamp) -> Timestamp {
        let mut times = self.times.lock();
        if times.commit_time == UNSET_COMMIT_TIME {
            times.commit_lower_bound = times.commit_lower_bound.max(lower_bound);
            -1
        } else {
            times.commit_time
        }
    }

    /// A point-in-time copy of this entry's fields, for callers that just
    /// want to read without holding any lock afterward.
    pub fn snapshot(&self) -> TxTableSnapshot {
        let times = self.times.lock();
        TxTableSnapshot {
            tx_id: self.tx_id,
            status: self.status(),
            commit_time: times.commit_time,
            commit_lower_bound: times.commit_lower_bound,
        }
    }
}

/// `GetTxTableEntry`'s return value: a consistent snapshot of one entry's
/// fields at the moment it was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxTableSnapshot {
    /// The transaction this snapshot describes.
    pub tx_id: TxId,
    /// Status at the time of the snapshot.
    pub status: TxStatus,
    /// Commit time at the time of the snapshot ([`mvcc_core::UNSET_COMMIT_TIME`] if unset).
    pub commit_time: Timestamp,
    /// Commit lower bound at the time of the snapshot.
    pub commit_lower_bound: Timestamp,
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// `commit_lower_bound` never decreases across an arbitrary
        /// sequence of `update_commit_lower_bound` calls, whether or not
        /// any of them end up settling `commit_time` along the way.
        #[test]
        fn commit_lower_bound_never_decreases(bounds in prop::collection::vec(-10i64..100, 0..40)) {
            let e = TxTableEntry::new(1);
            let mut expected = 0i64;
            for b in bounds {
                e.update_commit_lower_bound(b);
                expected = expected.max(b);
                prop_assert_eq!(e.commit_lower_bound(), expected);
            }
        }

        /// Once `set_and_get_commit_time` succeeds, every later call -
        /// regardless of its proposal - returns that same first value.
        #[test]
        fn set_and_get_commit_time_is_idempotent_under_any_later_proposals(
            first in 0i64..1000,
            later in prop::collection::vec(-50i64..1000, 0..40),
        ) {
            let e = TxTableEntry::new(1);
            let fixed = e.set_and_get_commit_time(first);
            prop_assume!(fixed >= 0);
            for proposal in later {
                prop_assert_eq!(e.set_and_get_commit_time(proposal), fixed);
            }
        }
    }
}
