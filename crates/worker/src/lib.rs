//! The SpineZone service worker.
//!
//! This crate provides:
//! - Request classification into caching strategies
//! - Network-first and cache-first strategies with background refresh
//! - Install/activate lifecycle and stale version cleanup
//! - Deferred submission replay on background sync
//! - Push notification handling

pub mod lifecycle;
pub mod network;
pub mod push;
pub mod router;
pub mod strategy;
pub mod sync;
pub mod worker;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use lifecycle::{ActivateReport, InstallReport, MessageOutcome, WorkerState, WorkerStatus};
pub use network::{HttpConfig, HttpNetwork, Network};
pub use push::{ClickOutcome, Notification};
pub use router::{Decision, PassReason, Route, Router, Strategy};
pub use strategy::{Served, Source};
pub use sync::SyncReport;
pub use worker::{FetchOutcome, ServiceWorker};
