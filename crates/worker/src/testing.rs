//! Scripted in-memory network for tests.
//!
//! Responses are registered per absolute URL; unknown URLs answer 404. The
//! network can be switched offline, in which case every fetch fails with
//! `Error::Network`. Every fetch is recorded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use spinezone_core::{Error, Method, Request, Response};

use crate::network::Network;

#[derive(Default)]
pub struct ScriptedNetwork {
    responses: Mutex<HashMap<String, Response>>,
    offline: AtomicBool,
    calls: Mutex<Vec<(Method, String)>>,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `response` from now on.
    pub fn respond(&self, url: &str, response: Response) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), response);
    }

    pub fn set_online(&self, online: bool) {
        self.offline.store(!online, Ordering::SeqCst);
    }

    /// Every fetch attempted so far, online or not.
    pub fn calls(&self) -> Vec<(Method, String)> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls().iter().filter(|(_, u)| u == url).count()
    }
}

#[async_trait::async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let url = request.url.to_string();
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((request.method, url.clone()));

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {} {}", request.method, url)));
        }

        let response = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&url)
            .cloned();
        Ok(response.unwrap_or_else(|| Response::new(404, "Not Found")))
    }
}
