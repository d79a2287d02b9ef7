//! Network-first and cache-first read-through caching.
//!
//! Both strategies write ok responses into the target partition before
//! returning, so a served 2xx is always readable from the cache afterwards.
//! Write failures are logged and never fail the request. Non-ok responses are
//! returned to the caller but never stored.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use spinezone_core::config::PartitionsConfig;
use spinezone_core::{CacheDb, CacheNames, Error, PartitionKind, Request, Response};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::network::Network;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Network,
    Cache,
    Fallback,
}

/// A response together with its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Served {
    pub response: Response,
    pub source: Source,
}

impl Served {
    pub fn network(response: Response) -> Self {
        Self { response, source: Source::Network }
    }

    pub fn cache(response: Response) -> Self {
        Self { response, source: Source::Cache }
    }

    pub fn fallback(response: Response) -> Self {
        Self { response, source: Source::Fallback }
    }
}

/// Runs the caching strategies against one cache version's partitions.
#[derive(Clone)]
pub struct Executor {
    db: CacheDb,
    network: Arc<dyn Network>,
    names: CacheNames,
    policies: PartitionsConfig,
    background: Arc<Mutex<JoinSet<()>>>,
}

impl Executor {
    pub fn new(db: CacheDb, network: Arc<dyn Network>, names: CacheNames, policies: PartitionsConfig) -> Self {
        Self { db, network, names, policies, background: Arc::new(Mutex::new(JoinSet::new())) }
    }

    pub fn names(&self) -> &CacheNames {
        &self.names
    }

    /// Live fetch first; on a network error fall back to the cached copy.
    ///
    /// # Errors
    ///
    /// Propagates the network error when nothing is cached for the request.
    pub async fn network_first(&self, request: &Request, partition: PartitionKind) -> Result<Served, Error> {
        match self.network.fetch(request).await {
            Ok(response) => {
                if response.ok() {
                    self.store(partition, request, &response).await;
                }
                Ok(Served::network(response))
            }
            Err(err) if err.is_network() => match self.lookup(partition, request).await {
                Some(cached) => {
                    tracing::debug!(url = %request.url, "network failed, serving cached copy");
                    Ok(Served::cache(cached))
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    /// Serve from cache and refresh in the background; fetch on a miss.
    ///
    /// # Errors
    ///
    /// On a miss, propagates the live fetch error.
    pub async fn cache_first(&self, request: &Request, partition: PartitionKind) -> Result<Served, Error> {
        if let Some(cached) = self.lookup(partition, request).await {
            tracing::debug!(url = %request.url, partition = partition.as_str(), "cache hit");
            self.spawn_refresh(request.clone(), partition).await;
            return Ok(Served::cache(cached));
        }

        let response = self.network.fetch(request).await?;
        if response.ok() {
            self.store(partition, request, &response).await;
        }
        Ok(Served::network(response))
    }

    /// Cached response for `request`, honouring the partition's max age.
    ///
    /// Read failures are logged and reported as a miss.
    pub async fn lookup(&self, partition: PartitionKind, request: &Request) -> Option<Response> {
        let name = self.names.name(partition);
        let entry = match self.db.match_entry(name, request.method, &request.url).await {
            Ok(entry) => entry?,
            Err(e) => {
                tracing::warn!(url = %request.url, partition = name, "cache read failed: {e}");
                return None;
            }
        };

        if let Some(max_age) = self.policies.policy(partition).max_age_secs.and_then(max_age_duration)
            && entry.age(Utc::now()) > max_age
        {
            tracing::debug!(url = %request.url, partition = name, "cached entry expired");
            if let Err(e) = self.db.delete_entry(name, request.method, &request.url).await {
                tracing::warn!(url = %request.url, "failed to drop expired entry: {e}");
            }
            return None;
        }

        entry.response
    }

    /// Write an ok response into the partition, then apply its entry cap.
    ///
    /// Failures are logged and swallowed.
    pub async fn store(&self, partition: PartitionKind, request: &Request, response: &Response) {
        let name = self.names.name(partition);
        if let Err(e) = self.db.put_entry(name, request, Some(response)).await {
            tracing::warn!(url = %request.url, partition = name, "cache write failed: {e}");
            return;
        }

        if let Some(max_entries) = self.policies.policy(partition).max_entries {
            match self.db.trim_partition(name, max_entries).await {
                Ok(0) => {}
                Ok(evicted) => tracing::debug!(partition = name, evicted, "trimmed partition"),
                Err(e) => tracing::warn!(partition = name, "partition trim failed: {e}"),
            }
        }
    }

    async fn spawn_refresh(&self, request: Request, partition: PartitionKind) {
        let this = self.clone();
        let mut tasks = self.background.lock().await;
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move { this.refresh(&request, partition).await });
    }

    async fn refresh(&self, request: &Request, partition: PartitionKind) {
        match self.network.fetch(request).await {
            Ok(response) if response.ok() => self.store(partition, request, &response).await,
            Ok(response) => {
                tracing::debug!(url = %request.url, status = response.status, "background refresh not ok, keeping cached copy")
            }
            Err(e) => tracing::debug!(url = %request.url, "background refresh failed: {e}"),
        }
    }

    /// Wait for every background refresh spawned so far.
    pub async fn drain_background(&self) {
        let mut tasks = std::mem::take(&mut *self.background.lock().await);
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                tracing::warn!("background refresh task panicked or was cancelled: {e}");
            }
        }
    }
}

/// A max age beyond what `chrono` can represent never expires anything.
fn max_age_duration(secs: u64) -> Option<chrono::Duration> {
    i64::try_from(secs).ok().and_then(chrono::Duration::try_seconds)
}
