//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SPINEZONE_SW_*, nested keys split on `__`)
//! 2. TOML config file (if SPINEZONE_SW_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheNames, PartitionKind};

mod validation;

pub use validation::{ConfigError, MAX_AGE_LIMIT_SECS};

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SPINEZONE_SW_*)
/// 2. TOML config file (if SPINEZONE_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cache version tag, bumped on every deploy.
    ///
    /// Set via SPINEZONE_SW_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Prefix of every partition name (`{prefix}-static-v{version}`).
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Path to SQLite cache database.
    ///
    /// Set via SPINEZONE_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Site origin that relative request paths resolve against.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body size in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Critical assets pre-warmed into the static partition at install.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Dedicated offline page served to documents when the network is down.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub partitions: PartitionsConfig,

    #[serde(default)]
    pub push: PushConfig,
}

/// Request classification knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Paths starting with this prefix are API calls.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Paths containing this marker are framework build assets.
    #[serde(default = "default_static_marker")]
    pub static_marker: String,

    /// Route images to the images partition instead of the dynamic one.
    ///
    /// Off by default so the partition layout matches previously deployed workers.
    #[serde(default)]
    pub dedicated_image_partition: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            api_prefix: default_api_prefix(),
            static_marker: default_static_marker(),
            dedicated_image_partition: false,
        }
    }
}

/// Deferred-submission replay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Background sync tag that triggers a replay.
    #[serde(default = "default_sync_tag")]
    pub tag: String,

    /// Form endpoint whose failed POSTs are queued.
    #[serde(default = "default_submission_endpoint")]
    pub submission_endpoint: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { tag: default_sync_tag(), submission_endpoint: default_submission_endpoint() }
    }
}

/// Per-partition retention policy. Both limits are off unless set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionPolicy {
    /// Keep at most this many entries, evicting the least recently used.
    #[serde(default)]
    pub max_entries: Option<usize>,

    /// Treat entries older than this as misses.
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartitionsConfig {
    #[serde(default, rename = "static")]
    pub static_assets: PartitionPolicy,
    #[serde(default)]
    pub dynamic: PartitionPolicy,
    #[serde(default)]
    pub images: PartitionPolicy,
}

impl PartitionsConfig {
    pub fn policy(&self, kind: PartitionKind) -> &PartitionPolicy {
        match kind {
            PartitionKind::Static => &self.static_assets,
            PartitionKind::Dynamic => &self.dynamic,
            PartitionKind::Images => &self.images,
        }
    }
}

/// Push notification defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default = "default_push_title")]
    pub default_title: String,
    #[serde(default = "default_push_body")]
    pub default_body: String,
    #[serde(default = "default_push_icon")]
    pub icon: String,
    #[serde(default = "default_push_badge")]
    pub badge: String,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            default_title: default_push_title(),
            default_body: default_push_body(),
            icon: default_push_icon(),
            badge: default_push_badge(),
        }
    }
}

fn default_version() -> String {
    "1.3.0".into()
}

fn default_cache_prefix() -> String {
    "spinezone".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./spinezone-sw-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_user_agent() -> String {
    "spinezone-sw/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_precache() -> Vec<String> {
    vec!["/".into(), "/manifest.json".into()]
}

fn default_offline_page() -> String {
    "/offline.html".into()
}

fn default_api_prefix() -> String {
    "/api/".into()
}

fn default_static_marker() -> String {
    "/_next/static/".into()
}

fn default_sync_tag() -> String {
    "contact-form-sync".into()
}

fn default_submission_endpoint() -> String {
    "/api/contact".into()
}

fn default_push_title() -> String {
    "SpineZone Physical Therapy".into()
}

fn default_push_body() -> String {
    "You have a new update from SpineZone.".into()
}

fn default_push_icon() -> String {
    "/icons/icon-192x192.png".into()
}

fn default_push_badge() -> String {
    "/icons/badge-72x72.png".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            cache_prefix: default_cache_prefix(),
            db_path: default_db_path(),
            origin: default_origin(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            precache: default_precache(),
            offline_page: default_offline_page(),
            routing: RoutingConfig::default(),
            sync: SyncConfig::default(),
            partitions: PartitionsConfig::default(),
            push: PushConfig::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Partition names for the configured version.
    pub fn cache_names(&self) -> CacheNames {
        CacheNames::new(&self.cache_prefix, &self.version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SPINEZONE_SW_`
    /// 2. TOML file from `SPINEZONE_SW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be read, or if
    /// validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SPINEZONE_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SPINEZONE_SW_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
