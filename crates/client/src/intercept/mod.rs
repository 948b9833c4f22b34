//! Per-request control loop.
//!
//! Network first, cache second, synthesized fallback last:
//!
//! 1. One network attempt. Any response (whatever its status) is returned
//!    as-is; an ok response to a `CacheEligible` request is also written
//!    back on a detached task.
//! 2. On transport failure, look the request up in the current generation.
//!    Navigations that miss get the offline document instead.
//! 3. Otherwise answer with a synthetic 503 JSON body.
//!
//! There are no retries beyond the single network attempt.

pub mod writeback;

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Serialize;
use serde_json::json;

use crate::classify::{self, Classifier, Verdict};
use crate::fetch::Network;
use offgrid_core::cache::CacheStore;
use offgrid_core::{Error, Request, RequestKey, Response};

pub use writeback::WriteBack;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Not intercepted; forwarded to the network untouched.
    Passthrough,
    Network,
    Cache,
    OfflineDocument,
    Fallback,
}

/// A response together with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: Response,
    pub source: Source,
}

impl Served {
    fn new(response: Response, source: Source) -> Self {
        Self { response, source }
    }
}

/// Build the synthetic offline response.
pub fn offline_response(message: &str) -> Response {
    let body = json!({ "error": "Offline", "message": message }).to_string();
    Response::new(503, vec![("Content-Type".to_string(), "application/json".to_string())], body)
}

pub struct FetchInterceptor {
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    classifier: Classifier,
    writeback: WriteBack,
    generation: String,
    offline_key: RequestKey,
    offline_message: String,
}

impl FetchInterceptor {
    pub fn new(
        store: Arc<dyn CacheStore>, network: Arc<dyn Network>, classifier: Classifier, generation: String,
        offline_key: RequestKey, offline_message: String,
    ) -> Self {
        let writeback = WriteBack::new(Arc::clone(&store));
        Self { store, network, classifier, writeback, generation, offline_key, offline_message }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn writeback(&self) -> &WriteBack {
        &self.writeback
    }

    /// Handle one request.
    ///
    /// # Errors
    ///
    /// Only pass-through requests can fail, with the network's own error.
    /// Intercepted requests always produce a response.
    pub async fn handle(&self, request: &Request) -> Result<Served, Error> {
        if !classify::intercepts(&request.method, &request.url) {
            let response = self.network.fetch(request).await?;
            return Ok(Served::new(response, Source::Passthrough));
        }

        let verdict = self.classifier.classify(&request.method, &request.url, request.navigation);

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() && verdict.writes_back() {
                    self.writeback.spawn(&self.generation, request.key(), response.clone());
                }
                Ok(Served::new(response, Source::Network))
            }
            Err(err) => {
                tracing::info!(url = %request.url, error = %err, "network request failed, trying cache");
                Ok(self.recover(request, verdict).await)
            }
        }
    }

    /// Cache lookup, then offline document, then synthetic fallback.
    async fn recover(&self, request: &Request, verdict: Verdict) -> Served {
        if let Some(cached) = self.lookup(&request.key()).await {
            return Served::new(cached, Source::Cache);
        }

        if request.navigation {
            if let Some(document) = self.lookup(&self.offline_key).await {
                return Served::new(document, Source::OfflineDocument);
            }
            tracing::debug!(url = %request.url, ?verdict, "no offline document cached");
        }

        Served::new(offline_response(&self.offline_message), Source::Fallback)
    }

    /// A store failure during recovery counts as a miss.
    async fn lookup(&self, key: &RequestKey) -> Option<Response> {
        match self.store.match_entry(&self.generation, key).await {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(url = %key.url, error = %err, "cache lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubNetwork;
    use offgrid_core::CacheDb;
    use proptest::prelude::*;
    use url::Url;

    const ORIGIN: &str = "http://app.test";

    fn url(path: &str) -> Url {
        Url::parse(ORIGIN).unwrap().join(path).unwrap()
    }

    async fn setup(network: Arc<StubNetwork>) -> (FetchInterceptor, Arc<dyn CacheStore>) {
        let store: Arc<dyn CacheStore> = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let interceptor = FetchInterceptor::new(
            Arc::clone(&store),
            network,
            Classifier::new(["/assets/", "/api/", ".js", ".css"]),
            "v1".into(),
            RequestKey::new("GET", &url("/offline.html")),
            "offline right now".into(),
        );
        (interceptor, store)
    }

    #[test]
    fn test_offline_response_shape() {
        let response = offline_response("no network");
        assert_eq!(response.status, 503);
        assert_eq!(response.content_type(), Some("application/json"));
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body, json!({"error": "Offline", "message": "no network"}));
    }

    #[tokio::test]
    async fn test_network_success_eligible_is_written_back() {
        let network = Arc::new(StubNetwork::new().page(ORIGIN, "/main.js", "main()"));
        let (interceptor, store) = setup(Arc::clone(&network)).await;
        let request = Request::get(url("/main.js"));

        let served = interceptor.handle(&request).await.unwrap();
        interceptor.writeback().settle().await;

        assert_eq!(served.source, Source::Network);
        assert_eq!(served.response.text(), "main()");
        assert_eq!(store.match_entry("v1", &request.key()).await.unwrap(), Some(served.response));
    }

    #[tokio::test]
    async fn test_network_success_ineligible_not_written() {
        let network = Arc::new(StubNetwork::new().page(ORIGIN, "/calendar", "<html>"));
        let (interceptor, store) = setup(network).await;

        let served = interceptor.handle(&Request::navigate(url("/calendar"))).await.unwrap();
        interceptor.writeback().settle().await;

        assert_eq!(served.source, Source::Network);
        assert_eq!(store.entry_count("v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_non_ok_response_returned_not_cached() {
        let network = Arc::new(StubNetwork::new());
        let (interceptor, store) = setup(network).await;

        let served = interceptor.handle(&Request::get(url("/api/missing"))).await.unwrap();
        interceptor.writeback().settle().await;

        assert_eq!(served.source, Source::Network);
        assert_eq!(served.response.status, 404);
        assert_eq!(store.entry_count("v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_network_failure_serves_cache() {
        let network = Arc::new(StubNetwork::new());
        network.set_online(false);
        let (interceptor, store) = setup(network).await;
        let request = Request::get(url("/manifest.json"));
        let cached = Response::new(200, vec![("ETag".into(), "\"abc\"".into())], "{\"name\":\"app\"}");
        store.put("v1", &request.key(), &cached).await.unwrap();

        let served = interceptor.handle(&request).await.unwrap();

        assert_eq!(served.source, Source::Cache);
        assert_eq!(served.response, cached);
    }

    #[tokio::test]
    async fn test_navigation_miss_serves_offline_document() {
        let network = Arc::new(StubNetwork::new());
        network.set_online(false);
        let (interceptor, store) = setup(network).await;
        let offline = Response::new(200, vec![], "<h1>offline</h1>");
        store.put("v1", &RequestKey::new("GET", &url("/offline.html")), &offline).await.unwrap();

        let served = interceptor.handle(&Request::navigate(url("/unknown-route"))).await.unwrap();

        assert_eq!(served.source, Source::OfflineDocument);
        assert_eq!(served.response, offline);
    }

    #[tokio::test]
    async fn test_navigation_miss_without_offline_document() {
        let network = Arc::new(StubNetwork::new());
        network.set_online(false);
        let (interceptor, _store) = setup(network).await;

        let served = interceptor.handle(&Request::navigate(url("/unknown-route"))).await.unwrap();

        assert_eq!(served.source, Source::Fallback);
        assert_eq!(served.response, offline_response("offline right now"));
    }

    #[tokio::test]
    async fn test_subresource_miss_never_gets_offline_document() {
        let network = Arc::new(StubNetwork::new());
        network.set_online(false);
        let (interceptor, store) = setup(network).await;
        store.put("v1", &RequestKey::new("GET", &url("/offline.html")), &Response::new(200, vec![], "x")).await.unwrap();

        let served = interceptor.handle(&Request::get(url("/api/events"))).await.unwrap();
        assert_eq!(served.source, Source::Fallback);
        assert_eq!(served.response.status, 503);
    }

    #[tokio::test]
    async fn test_other_generations_not_consulted() {
        let network = Arc::new(StubNetwork::new());
        network.set_online(false);
        let (interceptor, store) = setup(network).await;
        let request = Request::get(url("/main.js"));
        store.put("v0", &request.key(), &Response::new(200, vec![], "stale")).await.unwrap();

        let served = interceptor.handle(&request).await.unwrap();
        assert_eq!(served.source, Source::Fallback);
    }

    #[tokio::test]
    async fn test_passthrough_propagates_network_error() {
        let network = Arc::new(StubNetwork::new());
        network.set_online(false);
        let (interceptor, _store) = setup(Arc::clone(&network)).await;

        let result = interceptor.handle(&Request::new("POST", url("/api/events"))).await;
        assert!(result.unwrap_err().is_network());
        assert_eq!(network.calls(), 1);
    }

    #[tokio::test]
    async fn test_single_network_attempt_before_fallback() {
        let network = Arc::new(StubNetwork::new());
        network.set_online(false);
        let (interceptor, _store) = setup(Arc::clone(&network)).await;

        interceptor.handle(&Request::navigate(url("/calendar"))).await.unwrap();
        assert_eq!(network.calls(), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn entry_stored_iff_eligible(
            path in "/(api/|assets/|calendar/)?[a-z0-9]{1,12}(\\.js|\\.css|\\.png|\\.html)?",
            navigation in any::<bool>(),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            rt.block_on(async {
                let network = Arc::new(StubNetwork::new().page(ORIGIN, &path, "ok"));
                let (interceptor, store) = setup(network).await;
                let request = Request { navigation, ..Request::get(url(&path)) };
                let verdict = interceptor.classifier().classify(&request.method, &request.url, request.navigation);

                let served = interceptor.handle(&request).await.unwrap();
                interceptor.writeback().settle().await;

                assert_eq!(served.source, Source::Network);
                assert_eq!(store.entry_count("v1").await.unwrap(), u64::from(verdict.writes_back()));
            });
        }

        #[test]
        fn non_get_never_touches_cache(
            method in prop::sample::select(vec!["POST", "PUT", "DELETE", "PATCH"]),
            path in "/(api/|assets/)?[a-z0-9]{1,12}(\\.js|\\.css)?",
            online in any::<bool>(),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            rt.block_on(async {
                let network = Arc::new(StubNetwork::new().page(ORIGIN, &path, "ok"));
                network.set_online(online);
                let (interceptor, store) = setup(network).await;
                let request = Request::new(method, url(&path));
                store.put("v1", &request.key(), &Response::new(200, vec![], "cached")).await.unwrap();

                let result = interceptor.handle(&request).await;
                interceptor.writeback().settle().await;

                match result {
                    Ok(served) => {
                        assert_eq!(served.source, Source::Passthrough);
                        assert_ne!(served.response.text(), "cached");
                    }
                    Err(err) => assert!(!online && err.is_network()),
                }
                assert_eq!(store.entry_count("v1").await.unwrap(), 1);
            });
        }
    }
}
