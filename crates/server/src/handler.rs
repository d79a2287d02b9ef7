//! MCP server handler implementation.
//!
//! Each worker event is a tool; the handler owns one `ServiceWorker` and
//! forwards tool calls to it.
use crate::tools::{
    cache::{self, CacheGetParams, CachePurgeParams},
    fetch::{self, FetchParams},
    lifecycle::{self, MessageParams},
    push::{self, ClickParams, PushParams},
    sync::{self, SyncParams},
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use spinezone_worker::ServiceWorker;

/// The MCP server handler for the SpineZone worker.
#[derive(Clone)]
pub struct SpineZoneServer {
    worker: ServiceWorker,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl SpineZoneServer {
    pub fn new(worker: ServiceWorker) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    #[tool(description = "Install the worker: open the static cache and pre-warm it with the precache manifest. The server installs at startup, so this normally just reports the current status.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        lifecycle::install_impl(&self.worker).await
    }

    #[tool(description = "Activate an installed worker: delete caches from other versions and take control of pages. An already active worker reports its current status.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        lifecycle::activate_impl(&self.worker).await
    }

    #[tool(description = "Post a message to the worker. {\"type\": \"CLEANUP_CACHES\"} deletes stale caches.")]
    async fn sw_message(&self, params: Parameters<MessageParams>) -> Result<CallToolResult, McpError> {
        lifecycle::message_impl(&self.worker, params.0).await
    }

    #[tool(
        description = "Dispatch a fetch event. Returns the response, the routing rule, and whether it came from the network, the cache, or the offline fallback."
    )]
    async fn sw_fetch(&self, params: Parameters<FetchParams>) -> Result<CallToolResult, McpError> {
        fetch::fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Dispatch a background sync event. The contact form tag replays queued submissions.")]
    async fn sw_sync(&self, params: Parameters<SyncParams>) -> Result<CallToolResult, McpError> {
        sync::sync_impl(&self.worker, params.0).await
    }

    #[tool(description = "Dispatch a push event and return the notification the worker would show.")]
    async fn sw_push(&self, params: Parameters<PushParams>) -> Result<CallToolResult, McpError> {
        push::push_impl(&self.worker, params.0).await
    }

    #[tool(description = "Dispatch a notification click. Returns the window to open, if any.")]
    async fn sw_notification_click(&self, params: Parameters<ClickParams>) -> Result<CallToolResult, McpError> {
        push::click_impl(&self.worker, params.0).await
    }

    #[tool(description = "List cache partitions with entry counts and whether they belong to the running version.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        cache::list_impl(&self.worker).await
    }

    #[tool(description = "Read one cached entry by partition and URL.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        cache::get_impl(&self.worker, params.0).await
    }

    #[tool(description = "Purge a cache partition by age or entry count, or delete it.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        cache::purge_impl(&self.worker, params.0).await
    }
}

impl ServerHandler for SpineZoneServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "spinezone-sw".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::tools::test_worker;
    use spinezone_worker::testing::ScriptedNetwork;

    #[tokio::test]
    async fn test_every_worker_event_is_a_tool() {
        let server = SpineZoneServer::new(test_worker(Arc::new(ScriptedNetwork::new())).await);
        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();

        assert_eq!(
            names,
            vec![
                "cache_get",
                "cache_list",
                "cache_purge",
                "sw_activate",
                "sw_fetch",
                "sw_install",
                "sw_message",
                "sw_notification_click",
                "sw_push",
                "sw_sync",
            ]
        );
    }

    #[tokio::test]
    async fn test_server_info() {
        let server = SpineZoneServer::new(test_worker(Arc::new(ScriptedNetwork::new())).await);
        let info = server.get_info();
        assert_eq!(info.server_info.name, "spinezone-sw");
        assert!(info.capabilities.tools.is_some());
    }
}
