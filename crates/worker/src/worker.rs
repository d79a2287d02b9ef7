//! The worker object the hosting runtime drives.
//!
//! A [`ServiceWorker`] is built once per cache version from explicit
//! configuration. Lifecycle events live in `lifecycle`, replay in `sync`, and
//! notifications in `push`; this module handles fetch events.

use std::sync::Arc;

use spinezone_core::{AppConfig, CacheDb, CacheNames, Error, Method, PartitionKind, Request, Response};
use tokio::sync::Mutex;
use url::Url;

use crate::lifecycle::Lifecycle;
use crate::network::{self, Network};
use crate::router::{Decision, PassReason, Route, Router, Strategy};
use crate::strategy::{Executor, Served};

/// Result of dispatching a fetch event.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The worker does not handle this request; the page talks to the network.
    Passthrough(PassReason),
    Served(Served),
}

#[derive(Clone)]
pub struct ServiceWorker {
    pub(crate) config: Arc<AppConfig>,
    pub(crate) origin: Url,
    pub(crate) router: Arc<Router>,
    pub(crate) executor: Executor,
    pub(crate) db: CacheDb,
    pub(crate) network: Arc<dyn Network>,
    pub(crate) lifecycle: Arc<Mutex<Lifecycle>>,
}

impl ServiceWorker {
    /// Build a worker for `config.version` on top of a shared cache database.
    ///
    /// The worker starts in the `installing` state and does not intercept
    /// requests until it has been installed and activated.
    pub fn new(config: AppConfig, db: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        let router = Router::from_config(&config.routing);
        let executor = Executor::new(db.clone(), network.clone(), config.cache_names(), config.partitions.clone());

        Ok(Self {
            config: Arc::new(config),
            origin,
            router: Arc::new(router),
            executor,
            db,
            network,
            lifecycle: Arc::new(Mutex::new(Lifecycle::default())),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn names(&self) -> &CacheNames {
        self.executor.names()
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Resolve a page-relative target against the site origin.
    pub fn resolve(&self, target: &str) -> Result<Url, Error> {
        network::resolve(&self.origin, target).map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    /// Dispatch a fetch event.
    ///
    /// # Errors
    ///
    /// Propagates network failures the strategies could not recover from.
    /// Document requests never fail with a network error; they get the offline
    /// page or the plain-text offline response instead.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome, Error> {
        if !self.lifecycle.lock().await.state.controls_pages() {
            return Ok(FetchOutcome::Passthrough(PassReason::Inactive));
        }

        let (rule, route) = match self.router.classify(request) {
            Decision::Passthrough(reason) => return Ok(FetchOutcome::Passthrough(reason)),
            Decision::Route { rule, route } => (rule, route),
        };
        tracing::debug!(url = %request.url, rule, strategy = ?route.strategy, partition = route.partition.as_str(), "intercepted");

        match self.run(request, route).await {
            Err(e) if e.is_network() && route.offline_fallback => {
                tracing::info!(url = %request.url, "document unavailable offline, serving fallback");
                Ok(FetchOutcome::Served(self.offline_fallback().await))
            }
            result => result.map(FetchOutcome::Served),
        }
    }

    async fn run(&self, request: &Request, route: Route) -> Result<Served, Error> {
        match route.strategy {
            Strategy::NetworkFirst => self.executor.network_first(request, route.partition).await,
            Strategy::CacheFirst => self.executor.cache_first(request, route.partition).await,
        }
    }

    /// Answer a request the way the page would observe it: intercepted
    /// requests go through the strategies, everything else is forwarded.
    ///
    /// A forwarded POST to the submission endpoint that fails on the network
    /// is queued for the next background sync; the failure still propagates.
    pub async fn respond(&self, request: &Request) -> Result<Served, Error> {
        match self.handle_fetch(request).await? {
            FetchOutcome::Served(served) => Ok(served),
            FetchOutcome::Passthrough(_) => self.forward(request).await,
        }
    }

    async fn forward(&self, request: &Request) -> Result<Served, Error> {
        match self.network.fetch(request).await {
            Ok(response) => Ok(Served::network(response)),
            Err(e) if e.is_network() && self.is_submission(request) => {
                if let Err(queue_err) = self.queue_submission(request).await {
                    tracing::warn!(url = %request.url, "failed to queue submission: {queue_err}");
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Whether `request` targets the deferred-submission endpoint.
    pub fn is_submission(&self, request: &Request) -> bool {
        request.method == Method::Post && request.url.path() == self.config.sync.submission_endpoint
    }

    /// Store a failed submission in the dynamic partition for replay.
    ///
    /// Identity is method + URL, so a newer submission replaces an older one.
    pub async fn queue_submission(&self, request: &Request) -> Result<(), Error> {
        let partition = self.names().name(PartitionKind::Dynamic);
        self.db.put_entry(partition, request, None).await?;
        tracing::info!(url = %request.url, partition, "queued submission for background sync");
        Ok(())
    }

    /// The dedicated offline page if any current partition holds it, otherwise
    /// the plain-text offline response.
    pub async fn offline_fallback(&self) -> Served {
        if let Ok(url) = self.resolve(&self.config.offline_page) {
            let request = Request::get(url);
            for kind in PartitionKind::ALL {
                if let Some(page) = self.executor.lookup(kind, &request).await {
                    return Served::fallback(page);
                }
            }
        }
        Served::fallback(Response::offline())
    }

    /// Wait for outstanding background refreshes.
    pub async fn drain_background(&self) {
        self.executor.drain_background().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::Source;
    use crate::testing::ScriptedNetwork;
    use spinezone_core::Destination;
    use spinezone_core::http::OFFLINE_MESSAGE;

    const ORIGIN: &str = "https://spinezone.test";

    fn config() -> AppConfig {
        AppConfig { origin: ORIGIN.into(), ..Default::default() }
    }

    async fn active_worker(network: Arc<ScriptedNetwork>) -> ServiceWorker {
        let db = CacheDb::open_in_memory().await.unwrap();
        let worker = ServiceWorker::new(config(), db, network).unwrap();
        worker.install().await.unwrap();
        worker.activate().await.unwrap();
        worker
    }

    fn get(worker: &ServiceWorker, path: &str) -> Request {
        Request::get(worker.resolve(path).unwrap())
    }

    fn served(outcome: FetchOutcome) -> Served {
        match outcome {
            FetchOutcome::Served(served) => served,
            other => panic!("expected a served response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_inactive_worker_passes_through() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let worker = ServiceWorker::new(config(), db, Arc::new(ScriptedNetwork::new())).unwrap();
        let request = get(&worker, "/api/contact");

        let outcome = worker.handle_fetch(&request).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Passthrough(PassReason::Inactive));
    }

    #[tokio::test]
    async fn test_static_chunk_scenario() {
        let network = Arc::new(ScriptedNetwork::new());
        let url = format!("{ORIGIN}/_next/static/chunks/main.js");
        network.respond(&url, Response::new(200, "main"));
        let worker = active_worker(network.clone()).await;
        let request = get(&worker, "/_next/static/chunks/main.js");

        let first = served(worker.handle_fetch(&request).await.unwrap());
        assert_eq!(first.source, Source::Network);
        assert_eq!(network.call_count(&url), 1);

        let second = served(worker.handle_fetch(&request).await.unwrap());
        assert_eq!(second.source, Source::Cache);
        assert_eq!(second.response, first.response);

        worker.drain_background().await;
        assert_eq!(network.call_count(&url), 2);

        let stored = worker
            .db()
            .get_entry("spinezone-static-v1.3.0", Method::Get, &request.url)
            .await
            .unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn test_api_offline_without_cache_rejects() {
        let network = Arc::new(ScriptedNetwork::new());
        let worker = active_worker(network.clone()).await;
        network.set_online(false);

        let err = worker.handle_fetch(&get(&worker, "/api/contact")).await.unwrap_err();
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn test_root_document_offline_gets_plain_fallback() {
        let network = Arc::new(ScriptedNetwork::new());
        let worker = active_worker(network.clone()).await;
        network.set_online(false);

        let request = get(&worker, "/").with_destination(Destination::Document);
        let result = served(worker.handle_fetch(&request).await.unwrap());

        assert_eq!(result.source, Source::Fallback);
        assert_eq!(result.response.status, 503);
        assert_eq!(result.response.text(), OFFLINE_MESSAGE);
    }

    #[tokio::test]
    async fn test_document_offline_prefers_cached_offline_page() {
        let network = Arc::new(ScriptedNetwork::new());
        network.respond(&format!("{ORIGIN}/offline.html"), Response::new(200, "<h1>You are offline</h1>"));
        let worker = active_worker(network.clone()).await;
        worker
            .handle_fetch(&get(&worker, "/offline.html").with_destination(Destination::Document))
            .await
            .unwrap();
        network.set_online(false);

        let request = get(&worker, "/locations").with_destination(Destination::Document);
        let result = served(worker.handle_fetch(&request).await.unwrap());

        assert_eq!(result.source, Source::Fallback);
        assert_eq!(result.response.text(), "<h1>You are offline</h1>");
    }

    #[tokio::test]
    async fn test_document_offline_prefers_own_cached_copy() {
        let network = Arc::new(ScriptedNetwork::new());
        network.respond(&format!("{ORIGIN}/about"), Response::new(200, "about us"));
        let worker = active_worker(network.clone()).await;
        let request = get(&worker, "/about").with_header("Accept", "text/html");

        worker.handle_fetch(&request).await.unwrap();
        network.set_online(false);
        let result = served(worker.handle_fetch(&request).await.unwrap());

        assert_eq!(result.source, Source::Cache);
        assert_eq!(result.response.text(), "about us");
    }

    #[tokio::test]
    async fn test_failed_responses_are_not_cached() {
        let network = Arc::new(ScriptedNetwork::new());
        let worker = active_worker(network).await;
        let request = get(&worker, "/api/missing");

        let result = served(worker.handle_fetch(&request).await.unwrap());
        assert_eq!(result.response.status, 404);

        let stored = worker
            .db()
            .get_entry("spinezone-dynamic-v1.3.0", Method::Get, &request.url)
            .await
            .unwrap();
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn test_post_is_forwarded_untouched() {
        let network = Arc::new(ScriptedNetwork::new());
        network.respond(&format!("{ORIGIN}/api/newsletter"), Response::new(201, "ok"));
        let worker = active_worker(network.clone()).await;
        let request = Request::new(Method::Post, worker.resolve("/api/newsletter").unwrap()).with_body("email=a@b.c");

        assert_eq!(
            worker.handle_fetch(&request).await.unwrap(),
            FetchOutcome::Passthrough(PassReason::Method)
        );

        let result = worker.respond(&request).await.unwrap();
        assert_eq!(result.response.status, 201);
        assert_eq!(worker.db().count_entries("spinezone-dynamic-v1.3.0").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_submission_is_queued() {
        let network = Arc::new(ScriptedNetwork::new());
        let worker = active_worker(network.clone()).await;
        network.set_online(false);
        let request = Request::new(Method::Post, worker.resolve("/api/contact").unwrap()).with_body("name=Pat");

        assert!(worker.respond(&request).await.unwrap_err().is_network());

        let queued = worker
            .db()
            .get_entry("spinezone-dynamic-v1.3.0", Method::Post, &request.url)
            .await
            .unwrap()
            .unwrap();
        assert!(queued.response.is_none());
        assert_eq!(queued.request.body.as_deref(), Some(&b"name=Pat"[..]));
    }

    #[tokio::test]
    async fn test_other_failed_posts_are_not_queued() {
        let network = Arc::new(ScriptedNetwork::new());
        let worker = active_worker(network.clone()).await;
        network.set_online(false);
        let request = Request::new(Method::Post, worker.resolve("/api/newsletter").unwrap());

        assert!(worker.respond(&request).await.is_err());
        assert_eq!(worker.db().count_entries("spinezone-dynamic-v1.3.0").await.unwrap(), 0);
    }
}
