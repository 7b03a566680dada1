//! Unified error type for the MVCC engine.
//!
//! Protocol-level aborts (a CAS losing a race, a rejected commit-time
//! proposal) are *not* represented here — they surface as the ordinary
//! `TxFinalStatus::Aborted` outcome of `commit()`. `EngineError` is reserved
//! for conditions the protocol itself does not anticipate: an unknown table
//! id, a misconfigured benchmark, a poisoned lock.

use thiserror::Error;

/// All errors that can cross a public entry point of the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A table-qualified operation named a table that was never created
    /// (or was since deleted).
    #[error("no version table registered for table id {0:?}")]
    UnknownTable(String),

    /// A table id was created twice under different partition counts, or
    /// some other DDL-level misuse.
    #[error("invalid table configuration: {0}")]
    InvalidTable(String),

    /// The engine observed a protocol invariant violation that should be
    /// unreachable in correct code (e.g. a transaction id with no
    /// transaction-table entry while a version still references it).
    #[error("internal invariant violation: {0}")]
    Internal(String),

    /// The benchmark harness was configured inconsistently (zero workers,
    /// zero keys, etc.).
    #[error("invalid benchmark configuration: {0}")]
    Configuration(String),
}

/// Result type for fallible engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
