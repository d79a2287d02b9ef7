//! The live network behind the worker.
//!
//! Strategies never talk to reqwest directly; they go through the [`Network`]
//! trait so the hosting runtime (or a test) decides what "the network" is.
//!
//! Error contract: a request that never produced a response (offline, DNS,
//! connect failure, timeout) is `Error::Network`. Any HTTP status, including
//! 4xx/5xx, is a successful fetch whose response is simply not `ok()`.

pub mod url;

use std::time::{Duration, Instant};

use reqwest::{Client, header};
use spinezone_core::{AppConfig, Error, Request, Response};

pub use self::url::{UrlError, resolve};

/// Something that can perform a live fetch.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the HTTP network.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// User agent string (default: "spinezone-sw/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "spinezone-sw/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for HttpConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed network.
pub struct HttpNetwork {
    http: Client,
    config: HttpConfig,
}

impl HttpNetwork {
    /// Create a new HTTP network with the given configuration.
    pub fn new(config: HttpConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }
}

fn to_reqwest_method(method: spinezone_core::Method) -> reqwest::Method {
    use spinezone_core::Method;
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

#[async_trait::async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();

        let mut builder = self
            .http
            .request(to_reqwest_method(request.method), request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(format!("{} {}: {}", request.method, request.url, e)))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter(|(name, _)| **name != header::SET_COOKIE)
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(Response { status: status.as_u16(), headers, body: bytes })
    }
}
