//! cache_purge tool implementation.
//!
//! Purges entries of one partition by age or count, or drops the partition.

use chrono::{Duration, Utc};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use spinezone_worker::ServiceWorker;

use super::partition_name;
use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Partition name, or `static`, `dynamic` or `images` for the running version.
    pub partition: String,

    /// Purge entries cached more than this many days ago.
    #[serde(default)]
    pub older_than_days: Option<i64>,

    /// Keep only the N most recently used entries.
    #[serde(default)]
    pub max_entries: Option<usize>,

    /// Delete the whole partition.
    #[serde(default)]
    pub delete_partition: bool,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    pub partition: String,
    /// Number of entries deleted by age or count.
    pub deleted: u64,
    pub partition_deleted: bool,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(worker: &ServiceWorker, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.older_than_days.is_none() && params.max_entries.is_none() && !params.delete_partition {
        return Err(ToolError::InvalidInput(
            "At least one of older_than_days, max_entries, or delete_partition must be specified".to_string(),
        )
        .into());
    }
    if params.older_than_days.is_some_and(|days| days < 0) {
        return Err(ToolError::InvalidInput("older_than_days cannot be negative".to_string()).into());
    }

    let partition = partition_name(worker, &params.partition);
    let db = worker.db();
    let mut output = CachePurgeOutput { partition, deleted: 0, partition_deleted: false };

    if params.delete_partition {
        output.partition_deleted = db.delete_partition(&output.partition).await?;
        tracing::info!(partition = output.partition.as_str(), deleted = output.partition_deleted, "partition purge");
        return json_result(&output);
    }

    if let Some(days) = params.older_than_days {
        let cutoff = Duration::try_days(days)
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .ok_or_else(|| ToolError::InvalidInput(format!("older_than_days is out of range: {days}")))?;
        output.deleted += db.purge_entries_before(&output.partition, cutoff).await?;
    }

    if let Some(max_entries) = params.max_entries {
        output.deleted += db.trim_partition(&output.partition, max_entries).await?;
    }

    json_result(&output)
}
