//! Shared types for the MVCC transaction engine.
//!
//! This crate has no dependencies on the rest of the engine: it defines the
//! [`VersionEntry`] value type, the numeric sentinels used throughout the
//! protocol, transaction status enums, and the unified [`EngineError`] type.
//! Every other crate in the workspace depends on this one.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod entry;
mod error;
mod ids;
mod status;

pub use entry::VersionEntry;
pub use error::{EngineError, Result};
pub use ids::{TableId, Timestamp, TxId, VersionKey, INFINITY, NONE_TX, RETURN_ERROR_CODE, UNSET_COMMIT_TIME};
pub use status::{TxFinalStatus, TxStatus};
