//! cache_get tool implementation.
//!
//! Reads one stored entry without touching its access time.

use chrono::SecondsFormat;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use spinezone_core::{Error, Method};
use spinezone_worker::ServiceWorker;

use super::partition_name;
use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Partition name, or `static`, `dynamic` or `images` for the running version.
    pub partition: String,

    /// Absolute URL or a path relative to the site origin.
    pub url: String,

    /// HTTP method the entry was stored under (default: GET).
    #[serde(default)]
    pub method: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CacheGetOutput {
    pub partition: String,
    pub method: Method,
    pub url: String,
    /// A queued submission waiting for background sync.
    pub queued: bool,
    pub request_body: Option<String>,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// RFC 3339 timestamps.
    pub cached_at: String,
    pub last_accessed: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &ServiceWorker, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let method = match params.method.as_deref() {
        Some(m) => m.parse::<Method>()?,
        None => Method::Get,
    };
    let url = worker.resolve(&params.url)?;
    let partition = partition_name(worker, &params.partition);

    let entry = worker
        .db()
        .get_entry(&partition, method, &url)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{method} {url} in {partition}")))?;

    let request_body = entry
        .request
        .body
        .as_ref()
        .map(|b| String::from_utf8_lossy(b).into_owned());
    let output = CacheGetOutput {
        partition: entry.partition,
        method,
        url: url.to_string(),
        queued: entry.response.is_none(),
        request_body,
        status: entry.response.as_ref().map(|r| r.status),
        content_type: entry.response.as_ref().and_then(|r| r.content_type()).map(str::to_string),
        body: entry.response.as_ref().map(|r| r.text()),
        headers: entry.response.map(|r| r.headers).unwrap_or_default(),
        cached_at: entry.cached_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        last_accessed: entry.last_accessed.to_rfc3339_opts(SecondsFormat::Secs, true),
    };
    json_result(&output)
}
