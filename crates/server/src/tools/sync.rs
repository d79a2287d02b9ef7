//! sw_sync tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use spinezone_worker::ServiceWorker;

use super::json_result;

/// Input parameters for the sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncParams {
    /// Background sync tag. Only the configured tag replays submissions.
    pub tag: String,
}

pub async fn sync_impl(worker: &ServiceWorker, params: SyncParams) -> Result<CallToolResult, McpError> {
    let report = worker.handle_sync(&params.tag).await?;
    json_result(&report)
}
