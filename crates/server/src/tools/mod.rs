//! MCP tool implementations.
//!
//! Each worker event and each cache inspection command is one tool.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

pub mod cache;
pub mod fetch;
pub mod lifecycle;
pub mod push;
pub mod sync;

/// Pretty JSON text result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| ToolError::OutputFailed(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Parse the JSON text of the first content block. Test helper.
#[cfg(test)]
pub(crate) fn parse_output<T: serde::de::DeserializeOwned>(result: &CallToolResult) -> T {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    let text = content.get("text").and_then(|v| v.as_str()).expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}

/// An active worker on an in-memory cache with a scripted network. Test helper.
#[cfg(test)]
pub(crate) async fn test_worker(
    network: std::sync::Arc<spinezone_worker::testing::ScriptedNetwork>,
) -> spinezone_worker::ServiceWorker {
    let db = spinezone_core::CacheDb::open_in_memory().await.unwrap();
    let config = spinezone_core::AppConfig { origin: "https://spinezone.test".into(), ..Default::default() };
    let worker = spinezone_worker::ServiceWorker::new(config, db, network).unwrap();
    worker.install().await.unwrap();
    worker.activate().await.unwrap();
    worker
}
