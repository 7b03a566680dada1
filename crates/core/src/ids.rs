//! Numeric conventions and table identifiers.
//!
//! Timestamps, version keys, and transaction ids are all 64-bit signed
//! integers, per the protocol's numeric conventions. `+∞` is represented by
//! [`i64::MAX`] rather than a dedicated sentinel type, so that begin/end
//! timestamps compare with ordinary integer comparisons.

use std::fmt;
use std::sync::Arc;

/// A 64-bit logical timestamp (begin/end timestamps, commit times, maxCommitTs).
pub type Timestamp = i64;

/// A per-key, strictly-increasing version number.
pub type VersionKey = i64;

/// A transaction identifier. Always positive for a real transaction.
pub type TxId = i64;

/// Reserved `txId` meaning "no writer holds this version".
pub const NONE_TX: TxId = 0;

/// The value used for an "open" (not yet closed) `endTimestamp`.
pub const INFINITY: Timestamp = i64::MAX;

/// The value of `commitTime` before a transaction has committed.
pub const UNSET_COMMIT_TIME: Timestamp = -1;

/// Sentinel returned from numeric protocol paths to signal an internal
/// error, distinct from the `-1` "not yet set" result. See
/// [`mvcc_txtable`](../mvcc_txtable/index.html)'s `update_commit_lower_bound`.
pub const RETURN_ERROR_CODE: i64 = -2;

/// The name of one logical relation (a version table).
///
/// Cheap to clone: internally an `Arc<str>`, since every table-qualified
/// operation carries one of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(Arc<str>);

impl TableId {
    /// Build a table id from any string-like value.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Borrow the underlying name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TableId {
    fn from(value: &str) -> Self {
        TableId::new(value)
    }
}

impl From<String> for TableId {
    fn from(value: String) -> Self {
        TableId(Arc::from(value))
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TableId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_id_equality_by_name() {
        assert_eq!(TableId::new("warehouse"), TableId::from("warehouse"));
        assert_ne!(TableId::new("warehouse"), TableId::new("district"));
    }

    #[test]
    fn table_id_cheap_clone_shares_name() {
        let a = TableId::new("customer");
        let b = a.clone();
        assert_eq!(a.as_str(), b.as_str());
    }
}
