//! SQLite-backed storage for versioned cache partitions.
//!
//! This module provides the worker's cache registry: named partitions holding
//! request/response snapshots, persisted with SQLite through tokio-rusqlite.
//! It supports:
//!
//! - Partition names derived from a cache version
//! - Per-key upserts (last write wins)
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - LRU trimming and age-based purges per partition

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod names;
pub mod partitions;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::StoredEntry;
pub use names::{CacheNames, PartitionKind};
pub use partitions::PartitionStats;
