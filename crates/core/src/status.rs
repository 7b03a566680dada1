//! Transaction status and final outcome.

/// The lifecycle state of a transaction in the transaction table.
///
/// Transitions are `Ongoing → Committed` or `Ongoing → Aborted`, both
/// terminal. There is no resurrection: once committed or aborted, a
/// transaction's status never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TxStatus {
    /// The transaction is still running (reading, writing, or validating).
    Ongoing = 0,
    /// The transaction committed. `commitTime` is fixed from this point.
    Committed = 1,
    /// The transaction aborted; none of its writes are visible.
    Aborted = 2,
}

impl TxStatus {
    /// Decode from the raw `u8` encoding used by the transaction table's
    /// atomic status cell. Panics on an out-of-range value, which would
    /// indicate memory corruption rather than a reachable protocol state.
    pub fn from_u8(raw: u8) -> Self {
        match raw {
            0 => TxStatus::Ongoing,
            1 => TxStatus::Committed,
            2 => TxStatus::Aborted,
            other => panic!("invalid TxStatus encoding: {other}"),
        }
    }
}

/// The outcome returned to the caller once a transaction's executor has
/// finished post-processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxFinalStatus {
    /// All writes are durable in the version chains; the executor can be
    /// dropped or reused for another transaction.
    Committed,
    /// All provisional versions were rolled back; no trace of this
    /// transaction remains in any version chain.
    Aborted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_u8() {
        assert_eq!(TxStatus::from_u8(TxStatus::Ongoing as u8), TxStatus::Ongoing);
        assert_eq!(TxStatus::from_u8(TxStatus::Committed as u8), TxStatus::Committed);
        assert_eq!(TxStatus::from_u8(TxStatus::Aborted as u8), TxStatus::Aborted);
    }

    #[test]
    #[should_panic]
    fn rejects_invalid_encoding() {
        TxStatus::from_u8(99);
    }
}
