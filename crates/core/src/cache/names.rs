//! Partition naming.
//!
//! Partition names are the only persisted layout shared across deploys, so the
//! `{prefix}-{kind}-v{version}` format must stay stable.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The three partitions every cache version owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PartitionKind {
    /// Scripts, styles, fonts. Long-lived.
    Static,
    /// Documents and API responses. Short-lived.
    Dynamic,
    /// Image responses. Medium-lived.
    Images,
}

impl PartitionKind {
    pub const ALL: [PartitionKind; 3] = [PartitionKind::Static, PartitionKind::Dynamic, PartitionKind::Images];

    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionKind::Static => "static",
            PartitionKind::Dynamic => "dynamic",
            PartitionKind::Images => "images",
        }
    }
}

/// Partition names for one cache version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
    pub static_assets: String,
    pub dynamic: String,
    pub images: String,
}

impl CacheNames {
    pub fn new(prefix: &str, version: &str) -> Self {
        Self {
            static_assets: format!("{prefix}-static-v{version}"),
            dynamic: format!("{prefix}-dynamic-v{version}"),
            images: format!("{prefix}-images-v{version}"),
        }
    }

    pub fn name(&self, kind: PartitionKind) -> &str {
        match kind {
            PartitionKind::Static => &self.static_assets,
            PartitionKind::Dynamic => &self.dynamic,
            PartitionKind::Images => &self.images,
        }
    }

    /// All current names, in `PartitionKind::ALL` order.
    pub fn all(&self) -> [&str; 3] {
        [&self.static_assets, &self.dynamic, &self.images]
    }

    /// Whether `name` belongs to this version.
    pub fn is_current(&self, name: &str) -> bool {
        self.all().contains(&name)
    }
}
