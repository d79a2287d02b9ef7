//! sw_push and sw_notification_click tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use spinezone_worker::ServiceWorker;

use super::json_result;

/// Input parameters for the sw_push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PushParams {
    /// Raw push payload, normally JSON {"title": ..., "body": ...}.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Input parameters for the sw_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClickParams {
    /// Clicked action ("view" or "dismiss"); omit for a click on the notification body.
    #[serde(default)]
    pub action: Option<String>,
}

pub async fn push_impl(worker: &ServiceWorker, params: PushParams) -> Result<CallToolResult, McpError> {
    let notification = worker.handle_push(params.payload.as_deref().map(str::as_bytes));
    json_result(&notification)
}

pub async fn click_impl(worker: &ServiceWorker, params: ClickParams) -> Result<CallToolResult, McpError> {
    let outcome = worker.handle_notification_click(params.action.as_deref())?;
    json_result(&outcome)
}
