//! cache_list tool implementation.
//!
//! Lists every partition in the cache database with its size.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::Serialize;
use spinezone_worker::ServiceWorker;

use crate::tools::json_result;

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct PartitionSummary {
    pub name: String,
    pub entries: u64,
    pub body_bytes: u64,
    /// Whether the partition belongs to the running version.
    pub current: bool,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CacheListOutput {
    pub version: String,
    pub partitions: Vec<PartitionSummary>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let stats = worker.db().partition_stats().await?;
    let partitions = stats
        .into_iter()
        .map(|s| PartitionSummary {
            current: worker.names().is_current(&s.name),
            name: s.name,
            entries: s.entries,
            body_bytes: s.body_bytes,
        })
        .collect();

    json_result(&CacheListOutput { version: worker.config().version.clone(), partitions })
}
