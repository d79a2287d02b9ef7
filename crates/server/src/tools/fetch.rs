//! sw_fetch tool implementation.
//!
//! Dispatches a fetch event through the worker and reports where the response
//! came from.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use spinezone_core::{Destination, Method, Request};
use spinezone_worker::{Decision, ServiceWorker, Source, Strategy};

use super::json_result;
use crate::error::ToolError;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchParams {
    /// Absolute URL or a path relative to the site origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,

    /// Request destination: document, script, style, font, image, manifest or empty.
    #[serde(default)]
    pub destination: Destination,

    /// Request headers as name/value pairs.
    #[serde(default)]
    pub headers: Vec<HeaderParam>,

    /// Request body (UTF-8).
    #[serde(default)]
    pub body: Option<String>,

    /// Wait for background cache refreshes before returning.
    #[serde(default)]
    pub wait_for_refresh: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HeaderParam {
    pub name: String,
    pub value: String,
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FetchOutput {
    pub url: String,
    pub method: Method,
    /// Whether the worker intercepted the request.
    pub intercepted: bool,
    /// Name of the matching routing rule.
    pub rule: Option<String>,
    pub strategy: Option<Strategy>,
    pub partition: Option<String>,
    pub source: Source,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

fn build_request(worker: &ServiceWorker, params: FetchParams) -> Result<Request, McpError> {
    let method = match params.method.as_deref() {
        Some(m) => m.parse::<Method>()?,
        None => Method::Get,
    };
    let url = worker.resolve(&params.url)?;

    let mut request = Request::new(method, url).with_destination(params.destination);
    for header in params.headers {
        request = request.with_header(header.name, header.value);
    }
    if let Some(body) = params.body {
        request = request.with_body(body);
    }
    Ok(request)
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &ServiceWorker, params: FetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url cannot be empty".into()).into());
    }

    let wait = params.wait_for_refresh;
    let request = build_request(worker, params)?;

    let intercepted = worker.state().await.controls_pages();
    let (rule, strategy, partition) = match worker.router().classify(&request) {
        Decision::Route { rule, route } if intercepted => (
            Some(rule.to_string()),
            Some(route.strategy),
            Some(worker.names().name(route.partition).to_string()),
        ),
        _ => (None, None, None),
    };

    let served = worker.respond(&request).await?;
    if wait {
        worker.drain_background().await;
    }

    let output = FetchOutput {
        url: request.url.to_string(),
        method: request.method,
        intercepted: rule.is_some(),
        rule,
        strategy,
        partition,
        source: served.source,
        status: served.response.status,
        content_type: served.response.content_type().map(str::to_string),
        body: served.response.text(),
        headers: served.response.headers,
    };
    json_result(&output)
}
