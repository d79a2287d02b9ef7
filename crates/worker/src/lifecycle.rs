//! Install, activate and message-triggered cache cleanup.

use std::fmt;

use serde::{Deserialize, Serialize};
use spinezone_core::{Error, PartitionKind, Request};

use crate::worker::ServiceWorker;

/// Worker lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    #[default]
    Installing,
    Installed,
    Activating,
    Active,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
        }
    }

    /// Only an active worker intercepts fetches.
    pub fn controls_pages(&self) -> bool {
        *self == WorkerState::Active
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    pub(crate) state: WorkerState,
    pub(crate) skip_waiting: bool,
    pub(crate) clients_claimed: bool,
}

/// Snapshot of the lifecycle flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct WorkerStatus {
    pub version: String,
    pub state: WorkerState,
    pub skip_waiting: bool,
    pub clients_claimed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct InstallReport {
    /// Pre-warmed URLs now in the static partition.
    pub cached: Vec<String>,
    /// Assets that could not be fetched or stored.
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct ActivateReport {
    /// Partitions deleted because they belong to another version.
    pub deleted: Vec<String>,
}

/// Messages posted to the worker by a page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerMessage {
    #[serde(rename = "CLEANUP_CACHES")]
    CleanupCaches,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MessageOutcome {
    CachesCleaned { deleted: Vec<String> },
    Ignored,
}

impl ServiceWorker {
    pub async fn state(&self) -> WorkerState {
        self.lifecycle.lock().await.state
    }

    pub async fn status(&self) -> WorkerStatus {
        let lifecycle = self.lifecycle.lock().await;
        WorkerStatus {
            version: self.config.version.clone(),
            state: lifecycle.state,
            skip_waiting: lifecycle.skip_waiting,
            clients_claimed: lifecycle.clients_claimed,
        }
    }

    /// Open the static partition and pre-warm it with the precache manifest.
    ///
    /// Fetch holds off until install returns. Individual asset failures are
    /// reported, not raised.
    ///
    /// # Errors
    ///
    /// `INVALID_STATE` unless the worker is installing; a cache error if the
    /// static partition cannot be opened.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.state != WorkerState::Installing {
            return Err(Error::InvalidState { event: "install", state: lifecycle.state.to_string() });
        }

        let partition = self.names().name(PartitionKind::Static);
        self.db.open_partition(partition).await?;

        let mut report = InstallReport::default();
        for asset in &self.config.precache {
            match self.prewarm(partition, asset).await {
                Ok(url) => report.cached.push(url),
                Err(e) => {
                    tracing::warn!(asset = asset.as_str(), "pre-warm failed: {e}");
                    report.failed.push(asset.clone());
                }
            }
        }

        lifecycle.state = WorkerState::Installed;
        lifecycle.skip_waiting = true;
        tracing::info!(
            version = self.config.version.as_str(),
            cached = report.cached.len(),
            failed = report.failed.len(),
            "installed"
        );
        Ok(report)
    }

    async fn prewarm(&self, partition: &str, asset: &str) -> Result<String, Error> {
        let request = Request::get(self.resolve(asset)?);
        let response = self.network.fetch(&request).await?;
        if !response.ok() {
            return Err(Error::Network(format!("{} answered {}", request.url, response.status)));
        }
        self.db.put_entry(partition, &request, Some(&response)).await?;
        Ok(request.url.to_string())
    }

    /// Delete every partition that is not one of this version's, then take
    /// control of pages.
    ///
    /// # Errors
    ///
    /// `INVALID_STATE` unless the worker is installed. A cache failure puts the
    /// worker back to installed so activation can be retried.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        {
            let mut lifecycle = self.lifecycle.lock().await;
            if lifecycle.state != WorkerState::Installed {
                return Err(Error::InvalidState { event: "activate", state: lifecycle.state.to_string() });
            }
            lifecycle.state = WorkerState::Activating;
        }

        // Fetches pass through while activating; the lock is not held here.
        let cleanup = self.cleanup_caches().await;

        let mut lifecycle = self.lifecycle.lock().await;
        let deleted = match cleanup {
            Ok(deleted) => deleted,
            Err(e) => {
                lifecycle.state = WorkerState::Installed;
                return Err(e);
            }
        };

        lifecycle.state = WorkerState::Active;
        lifecycle.clients_claimed = true;
        tracing::info!(version = self.config.version.as_str(), deleted = deleted.len(), "activated");
        Ok(ActivateReport { deleted })
    }

    /// Delete partitions that do not belong to this version.
    pub async fn cleanup_caches(&self) -> Result<Vec<String>, Error> {
        let deleted = self.db.delete_partitions_except(&self.names().all()).await?;
        for name in &deleted {
            tracing::info!(partition = name.as_str(), "deleted stale partition");
        }
        Ok(deleted)
    }

    /// Handle a page message. Anything that is not a known command is ignored.
    pub async fn handle_message(&self, message: &serde_json::Value) -> Result<MessageOutcome, Error> {
        match serde_json::from_value::<WorkerMessage>(message.clone()) {
            Ok(WorkerMessage::CleanupCaches) => {
                let deleted = self.cleanup_caches().await?;
                Ok(MessageOutcome::CachesCleaned { deleted })
            }
            Ok(WorkerMessage::Unknown) | Err(_) => {
                tracing::debug!(payload = %message, "ignoring message");
                Ok(MessageOutcome::Ignored)
            }
        }
    }
}
