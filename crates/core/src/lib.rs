//! Core types and shared functionality for the SpineZone cache worker.
//!
//! This crate provides:
//! - Versioned cache partitions with a SQLite backend
//! - Request/response snapshot types shared by the worker and server
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, CacheNames, PartitionKind, StoredEntry};
pub use config::AppConfig;
pub use error::Error;
pub use http::{Destination, Method, Request, Response};
