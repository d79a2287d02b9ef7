//! Cache inspection MCP tools.
//!
//! Partitions can be addressed by full name or, for the running version, by
//! kind (`static`, `dynamic`, `images`).

use spinezone_core::PartitionKind;
use spinezone_worker::ServiceWorker;

pub mod get;
pub mod list;
pub mod purge;

pub use get::{CacheGetParams, get_impl};
pub use list::list_impl;
pub use purge::{CachePurgeParams, purge_impl};

pub(crate) fn partition_name(worker: &ServiceWorker, partition: &str) -> String {
    PartitionKind::ALL
        .into_iter()
        .find(|kind| kind.as_str() == partition)
        .map_or_else(|| partition.to_string(), |kind| worker.names().name(kind).to_string())
}
