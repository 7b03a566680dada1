//! The version table: the partitioned storage and serialization point for
//! one relation's version chains.
//!
//! A table is split into a fixed number of [`Partition`](partition::Partition)s,
//! each independently draining a request queue so that one key's traffic
//! never blocks another key hashed to a different partition. See
//! [`VersionTable`] for the operation surface.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod list;
mod partition;
mod request;
mod table;

pub use list::VersionList;
pub use request::{Operation, Response};
pub use table::{PartitionFn, VersionTable};
