//! Test doubles shared by the unit tests of this crate.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use url::Url;

use crate::fetch::Network;
use offgrid_core::{Error, Request, Response};

/// Network serving canned responses; unknown URLs get a 404.
pub struct StubNetwork {
    pages: Mutex<HashMap<String, Response>>,
    online: AtomicBool,
    calls: AtomicUsize,
}

impl StubNetwork {
    pub fn new() -> Self {
        Self { pages: Mutex::new(HashMap::new()), online: AtomicBool::new(true), calls: AtomicUsize::new(0) }
    }

    /// Serve `body` as HTML at `origin` + `path`.
    pub fn page(self, origin: &str, path: &str, body: &str) -> Self {
        let url = Url::parse(origin).unwrap().join(path).unwrap();
        self.respond(url.as_str(), Response::new(200, vec![("content-type".into(), "text/html".into())], body.to_string()))
    }

    pub fn respond(self, url: &str, response: Response) -> Self {
        self.pages.lock().unwrap().insert(url.to_string(), response);
        self
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{}: connection refused", request.url)));
        }
        let pages = self.pages.lock().unwrap();
        Ok(pages
            .get(request.url.as_str())
            .cloned()
            .unwrap_or_else(|| Response::new(404, vec![], "not found")))
    }
}
