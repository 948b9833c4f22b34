//! fetch tool implementation.
//!
//! Routes one request through the worker's network-first interceptor.

use std::collections::BTreeMap;

use offgrid_client::{Served, Source, Worker};
use offgrid_core::{Error, Request};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input parameters for the fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET requests are intercepted.
    #[serde(default = "default_method")]
    pub method: String,

    /// Treat the request as a top-level page navigation.
    #[serde(default)]
    pub navigate: bool,

    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the fetch tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FetchOutput {
    /// The resolved request URL.
    pub url: String,
    /// Where the response came from.
    pub source: Source,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
}

impl FetchOutput {
    fn new(url: String, served: Served) -> Self {
        let Served { response, source } = served;
        Self {
            url,
            source,
            status: response.status,
            content_type: response.content_type().map(str::to_string),
            body: response.text(),
            headers: response.headers,
        }
    }
}

/// Implementation of the fetch tool.
pub async fn fetch_impl(worker: &Worker, params: FetchParams) -> Result<CallToolResult, McpError> {
    if params.method.trim().is_empty() {
        return Err(Error::InvalidInput("method cannot be empty".into()).into());
    }

    let url = worker.resolve(&params.url)?;
    let mut request = Request::new(params.method.trim(), url);
    request.navigation = params.navigate;
    for (name, value) in params.headers {
        request = request.with_header(name, value);
    }

    let served = worker.fetch(request.clone()).await?;
    tracing::debug!(url = %request.url, source = ?served.source, status = served.response.status, "fetch served");

    let output = FetchOutput::new(request.url.to_string(), served);
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_worker;

    fn text(result: &CallToolResult) -> serde_json::Value {
        let content = serde_json::to_value(&result.content[0]).unwrap();
        serde_json::from_str(content["text"].as_str().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_offline_returns_fallback() {
        let worker = test_worker().await;
        let params = FetchParams {
            url: "/api/events".into(),
            method: default_method(),
            navigate: false,
            headers: BTreeMap::new(),
        };

        let result = fetch_impl(&worker, params).await.unwrap();
        let output = text(&result);

        assert_eq!(output["source"], "fallback");
        assert_eq!(output["status"], 503);
        assert_eq!(output["url"], "http://127.0.0.1:9/api/events");
    }

    #[tokio::test]
    async fn test_fetch_passthrough_error_propagates() {
        let worker = test_worker().await;
        let params = FetchParams {
            url: "/api/events".into(),
            method: "POST".into(),
            navigate: false,
            headers: BTreeMap::new(),
        };

        assert!(fetch_impl(&worker, params).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_rejects_empty_url() {
        let worker = test_worker().await;
        let params = FetchParams { url: "  ".into(), method: default_method(), navigate: true, headers: BTreeMap::new() };

        let err = fetch_impl(&worker, params).await.unwrap_err();
        assert_eq!(err.code.0, -32003);
    }
}
