//! sw_install, sw_activate and sw_message tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use spinezone_worker::{ActivateReport, InstallReport, MessageOutcome, ServiceWorker, WorkerState, WorkerStatus};

use super::json_result;

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct InstallOutput {
    /// Absent when the worker was already installed.
    pub report: Option<InstallReport>,
    pub status: WorkerStatus,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ActivateOutput {
    /// Absent when the worker was already active.
    pub report: Option<ActivateReport>,
    pub status: WorkerStatus,
}

/// Input parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MessageParams {
    /// Message posted by a page, e.g. {"type": "CLEANUP_CACHES"}.
    pub message: serde_json::Value,
}

/// Install the worker, or report its status if installation already ran.
pub async fn install_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let report = match worker.state().await {
        WorkerState::Installing => Some(worker.install().await?),
        _ => None,
    };
    json_result(&InstallOutput { report, status: worker.status().await })
}

/// Activate the worker, or report its status if it is already active.
///
/// Activating a worker that never installed is still `INVALID_STATE`.
pub async fn activate_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let report = match worker.state().await {
        WorkerState::Active => None,
        _ => Some(worker.activate().await?),
    };
    json_result(&ActivateOutput { report, status: worker.status().await })
}

pub async fn message_impl(worker: &ServiceWorker, params: MessageParams) -> Result<CallToolResult, McpError> {
    let outcome: MessageOutcome = worker.handle_message(&params.message).await?;
    json_result(&outcome)
}
