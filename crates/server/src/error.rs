//! Tool-level errors for the worker server.
//!
//! Worker and cache failures arrive as `spinezone_core::Error`; these cover
//! problems with the tool call itself.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Tool arguments that cannot be turned into a worker event.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Tool output could not be encoded.
    #[error("OUTPUT_FAILED: {0}")]
    OutputFailed(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::OutputFailed(msg) => (-32000, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
