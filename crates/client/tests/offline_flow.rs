//! End-to-end behavior of the worker across connectivity changes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use offgrid_client::{
    ControlMessage, ControlReply, Event, EventOutcome, HostEvent, LocalHost, Network, Source, Worker, WorkerConfig,
};
use offgrid_core::cache::CacheStore;
use offgrid_core::{AppConfig, CacheDb, Error, Request, Response};

const ORIGIN: &str = "http://calendar.test";

/// A site that can be taken offline.
struct Site {
    pages: Mutex<HashMap<String, String>>,
    online: AtomicBool,
}

impl Site {
    fn new(pages: &[(&str, &str)]) -> Self {
        let pages = pages.iter().map(|(path, body)| (format!("{ORIGIN}{path}"), body.to_string())).collect();
        Self { pages: Mutex::new(pages), online: AtomicBool::new(true) }
    }

    fn go_offline(&self) {
        self.online.store(false, Ordering::SeqCst);
    }

    fn publish(&self, path: &str, body: &str) {
        self.pages.lock().unwrap().insert(format!("{ORIGIN}{path}"), body.to_string());
    }
}

#[async_trait]
impl Network for Site {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Network("offline".into()));
        }
        Ok(match self.pages.lock().unwrap().get(request.url.as_str()) {
            Some(body) => Response::new(200, vec![("Content-Type".into(), "text/html".into())], body.clone()),
            None => Response::new(404, vec![], "not found"),
        })
    }
}

struct Harness {
    worker: Worker,
    site: Arc<Site>,
    host: Arc<LocalHost>,
    store: Arc<dyn CacheStore>,
}

async fn harness(generation: &str, store: Option<Arc<dyn CacheStore>>) -> Harness {
    let site = Arc::new(Site::new(&[
        ("/", "<h1>Today</h1>"),
        ("/offline.html", "<h1>You are offline</h1>"),
        ("/assets/app.js", "boot()"),
    ]));
    let store = match store {
        Some(store) => store,
        None => Arc::new(CacheDb::open_in_memory().await.unwrap()),
    };
    let host = Arc::new(LocalHost::new());
    let app = AppConfig { origin: ORIGIN.into(), generation: generation.into(), ..Default::default() };

    let worker = Worker::new(WorkerConfig::try_from(&app).unwrap(), Arc::clone(&store), site.clone(), host.clone());
    Harness { worker, site, host, store }
}

fn url(path: &str) -> url::Url {
    url::Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

#[tokio::test]
async fn test_root_served_from_cache_once_offline() {
    let h = harness("calendar-v1", None).await;
    h.worker.start().await.unwrap();

    let online = h.worker.fetch(Request::navigate(url("/"))).await.unwrap();
    assert_eq!(online.source, Source::Network);

    h.site.go_offline();
    let offline = h.worker.fetch(Request::navigate(url("/"))).await.unwrap();

    assert_eq!(offline.source, Source::Cache);
    assert_eq!(offline.response.text(), online.response.text());
}

#[tokio::test]
async fn test_unknown_route_offline_gets_offline_document() {
    let h = harness("calendar-v1", None).await;
    h.worker.start().await.unwrap();
    h.site.go_offline();

    let served = h.worker.fetch(Request::navigate(url("/unknown-route"))).await.unwrap();

    assert_eq!(served.source, Source::OfflineDocument);
    assert_eq!(served.response.status, 200);
    assert_eq!(served.response.text(), "<h1>You are offline</h1>");
}

#[tokio::test]
async fn test_eligible_response_survives_going_offline() {
    let h = harness("calendar-v1", None).await;
    h.worker.start().await.unwrap();

    h.worker.fetch(Request::get(url("/assets/app.js"))).await.unwrap();
    h.worker.settle().await;
    h.site.go_offline();

    let served = h.worker.fetch(Request::get(url("/assets/app.js"))).await.unwrap();
    assert_eq!(served.source, Source::Cache);
    assert_eq!(served.response.text(), "boot()");

    let missing = h.worker.fetch(Request::get(url("/api/today"))).await.unwrap();
    assert_eq!(missing.source, Source::Fallback);
    assert_eq!(missing.response.status, 503);
}

#[tokio::test]
async fn test_version_bump_retires_old_generation() {
    let old = harness("calendar-v1", None).await;
    old.worker.start().await.unwrap();

    let new = harness("calendar-v2", Some(Arc::clone(&old.store))).await;
    new.site.publish("/", "<h1>Today v2</h1>");
    let deleted = new.worker.start().await.unwrap();

    assert_eq!(deleted, vec!["calendar-v1".to_string()]);
    assert_eq!(new.store.keys().await.unwrap(), vec!["calendar-v2".to_string()]);
    assert_eq!(new.host.events(), vec![HostEvent::SkipWaiting, HostEvent::ClaimClients]);
}

#[tokio::test]
async fn test_control_round_trip() {
    let h = harness("calendar-v1", None).await;
    h.worker.start().await.unwrap();

    let reply = h.worker.message(ControlMessage::GetVersion).await;
    assert_eq!(reply, Some(ControlReply::Version { version: "calendar-v1".into() }));

    for _ in 0..2 {
        let reply = h.worker.message(ControlMessage::ClearCache).await;
        assert_eq!(reply, Some(ControlReply::CacheCleared { success: true, error: None }));
    }
    assert!(h.store.keys().await.unwrap().is_empty());

    let outcome = h.worker.dispatch(Event::Message(ControlMessage::SkipWaiting)).await.unwrap();
    assert_eq!(outcome, EventOutcome::Reply(None));
}
