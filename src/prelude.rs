//! Convenience re-exports for callers who just want the common types.
//!
//! ```
//! use mvccdb::prelude::*;
//!
//! let engine = Engine::new(8);
//! engine.create_table("warehouse", 0);
//! ```

pub use crate::{Engine, EngineBuilder, EngineError, Record, RecordKey, TableId, TransactionExecutor, TxFinalStatus};
