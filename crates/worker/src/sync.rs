//! Background-sync replay of queued submissions.

use serde::Serialize;
use spinezone_core::{Error, Method, PartitionKind};

use crate::worker::ServiceWorker;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct SyncReport {
    pub attempted: usize,
    pub replayed: usize,
    pub failed: usize,
}

impl ServiceWorker {
    /// Replay every queued submission once if `tag` is the configured sync tag.
    ///
    /// Entries are deleted only after a 2xx replay. Per-entry failures are
    /// logged and leave the entry queued for the next sync event.
    ///
    /// # Errors
    ///
    /// Only a failure to read the queue itself is returned.
    pub async fn handle_sync(&self, tag: &str) -> Result<SyncReport, Error> {
        let mut report = SyncReport::default();
        if tag != self.config.sync.tag {
            tracing::debug!(tag, "ignoring sync event");
            return Ok(report);
        }

        let partition = self.names().name(PartitionKind::Dynamic);
        let queued = self.db.entries_with_method(partition, Method::Post).await?;

        for entry in queued.into_iter().filter(|e| self.is_submission(&e.request)) {
            report.attempted += 1;
            let request = entry.request;
            match self.network.fetch(&request).await {
                Ok(response) if response.ok() => {
                    report.replayed += 1;
                    if let Err(e) = self.db.delete_entry(partition, request.method, &request.url).await {
                        tracing::warn!(url = %request.url, "replayed submission could not be dequeued: {e}");
                    }
                }
                Ok(response) => {
                    report.failed += 1;
                    tracing::warn!(url = %request.url, status = response.status, "submission replay rejected");
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(url = %request.url, "submission replay failed: {e}");
                }
            }
        }

        tracing::info!(tag, attempted = report.attempted, replayed = report.replayed, failed = report.failed, "sync done");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::ScriptedNetwork;
    use spinezone_core::{AppConfig, CacheDb, Request, Response};

    const ORIGIN: &str = "https://spinezone.test";
    const DYNAMIC: &str = "spinezone-dynamic-v1.3.0";

    async fn worker(network: Arc<ScriptedNetwork>) -> ServiceWorker {
        let db = CacheDb::open_in_memory().await.unwrap();
        let config = AppConfig { origin: ORIGIN.into(), ..Default::default() };
        let worker = ServiceWorker::new(config, db, network).unwrap();
        worker.install().await.unwrap();
        worker.activate().await.unwrap();
        worker
    }

    fn contact(worker: &ServiceWorker) -> Request {
        Request::new(Method::Post, worker.resolve("/api/contact").unwrap())
            .with_header("Content-Type", "application/json")
            .with_body(r#"{"name":"Pat","message":"Knee pain"}"#)
    }

    #[tokio::test]
    async fn test_offline_submission_replays_once() {
        let network = Arc::new(ScriptedNetwork::new());
        let worker = worker(network.clone()).await;
        let request = contact(&worker);

        network.set_online(false);
        assert!(worker.respond(&request).await.is_err());
        assert_eq!(worker.db().count_entries(DYNAMIC).await.unwrap(), 1);

        network.set_online(true);
        network.respond(&format!("{ORIGIN}/api/contact"), Response::new(200, "thanks"));
        let before = network.call_count(&format!("{ORIGIN}/api/contact"));

        let report = worker.handle_sync("contact-form-sync").await.unwrap();

        assert_eq!(report, SyncReport { attempted: 1, replayed: 1, failed: 0 });
        assert_eq!(network.call_count(&format!("{ORIGIN}/api/contact")), before + 1);
        assert_eq!(worker.db().count_entries(DYNAMIC).await.unwrap(), 0);

        let again = worker.handle_sync("contact-form-sync").await.unwrap();
        assert_eq!(again, SyncReport::default());
    }

    #[tokio::test]
    async fn test_failed_replay_stays_queued() {
        let network = Arc::new(ScriptedNetwork::new());
        let worker = worker(network.clone()).await;
        worker.queue_submission(&contact(&worker)).await.unwrap();

        network.set_online(false);
        let report = worker.handle_sync("contact-form-sync").await.unwrap();
        assert_eq!(report, SyncReport { attempted: 1, replayed: 0, failed: 1 });
        assert_eq!(worker.db().count_entries(DYNAMIC).await.unwrap(), 1);

        network.set_online(true);
        network.respond(&format!("{ORIGIN}/api/contact"), Response::new(500, "oops"));
        let report = worker.handle_sync("contact-form-sync").await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(worker.db().count_entries(DYNAMIC).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_other_tags_are_ignored() {
        let network = Arc::new(ScriptedNetwork::new());
        let worker = worker(network.clone()).await;
        worker.queue_submission(&contact(&worker)).await.unwrap();

        let report = worker.handle_sync("newsletter-sync").await.unwrap();

        assert_eq!(report, SyncReport::default());
        assert_eq!(worker.db().count_entries(DYNAMIC).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_only_submission_posts_are_replayed() {
        let network = Arc::new(ScriptedNetwork::new());
        let worker = worker(network.clone()).await;
        let other = Request::new(Method::Post, worker.resolve("/api/newsletter").unwrap());
        worker.db().put_entry(DYNAMIC, &other, None).await.unwrap();

        let report = worker.handle_sync("contact-form-sync").await.unwrap();

        assert_eq!(report.attempted, 0);
        assert_eq!(network.call_count(&format!("{ORIGIN}/api/newsletter")), 0);
    }

    #[tokio::test]
    async fn test_second_submission_replaces_first() {
        let network = Arc::new(ScriptedNetwork::new());
        let worker = worker(network.clone()).await;
        worker.queue_submission(&contact(&worker)).await.unwrap();
        worker.queue_submission(&contact(&worker).with_body("second")).await.unwrap();

        let queued = worker.db().entries_with_method(DYNAMIC, Method::Post).await.unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].request.body.as_deref(), Some(&b"second"[..]));
    }

    #[tokio::test]
    async fn test_entry_cap_does_not_drop_pending_submission() {
        let network = Arc::new(ScriptedNetwork::new());
        let db = CacheDb::open_in_memory().await.unwrap();
        let mut config = AppConfig { origin: ORIGIN.into(), ..Default::default() };
        config.partitions.dynamic.max_entries = Some(1);
        let worker = ServiceWorker::new(config, db, network.clone()).unwrap();
        worker.install().await.unwrap();
        worker.activate().await.unwrap();

        network.set_online(false);
        assert!(worker.respond(&contact(&worker)).await.is_err());

        network.set_online(true);
        network.respond(&format!("{ORIGIN}/api/hours"), Response::new(200, "9-5"));
        network.respond(&format!("{ORIGIN}/api/contact"), Response::new(200, "thanks"));
        worker.respond(&Request::get(worker.resolve("/api/hours").unwrap())).await.unwrap();

        let report = worker.handle_sync("contact-form-sync").await.unwrap();
        assert_eq!(report, SyncReport { attempted: 1, replayed: 1, failed: 0 });
    }
}
