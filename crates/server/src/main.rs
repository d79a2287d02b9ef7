//! spinezone-sw server entry point.
//!
//! Loads configuration, installs and activates the worker for the configured
//! cache version, then serves worker events as MCP tools on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use spinezone_core::{AppConfig, CacheDb};
use spinezone_worker::{HttpConfig, HttpNetwork, ServiceWorker};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    tracing::info!(version = config.version.as_str(), origin = config.origin.as_str(), "Starting spinezone-sw on stdio transport");

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open cache database {}", config.db_path.display()))?;
    let network = HttpNetwork::new(HttpConfig::from(&config))?;
    let worker = ServiceWorker::new(config, db, Arc::new(network))?;

    let installed = worker.install().await?;
    if !installed.failed.is_empty() {
        tracing::warn!(failed = ?installed.failed, "some precache assets were not cached");
    }
    worker.activate().await?;

    let handler = handler::SpineZoneServer::new(worker.clone());
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    worker.drain_background().await;

    Ok(())
}
