//! MCP tool implementations.
//!
//! This module contains all tools exposed by the offgrid server. Each tool
//! turns its parameters into a worker event and renders the outcome as JSON.

pub mod control;
pub mod fetch;
pub mod signals;

pub use control::{ControlParams, control_impl, status_impl};
pub use fetch::{FetchParams, fetch_impl};
pub use signals::{PushParams, SyncParams, click_impl, push_impl, sync_impl};

/// Worker over an in-memory store whose origin refuses connections.
#[cfg(test)]
pub(crate) async fn test_worker() -> offgrid_client::Worker {
    use std::sync::Arc;
    use std::time::Duration;

    use offgrid_client::{FetchClient, FetchConfig, LocalHost, Worker, WorkerConfig};
    use offgrid_core::{AppConfig, CacheDb};

    let app = AppConfig { origin: "http://127.0.0.1:9".into(), generation: "tools-v1".into(), ..Default::default() };
    let network = FetchClient::new(FetchConfig { timeout: Duration::from_secs(2), ..Default::default() }).unwrap();

    Worker::new(
        WorkerConfig::try_from(&app).unwrap(),
        Arc::new(CacheDb::open_in_memory().await.unwrap()),
        Arc::new(network),
        Arc::new(LocalHost::new()),
    )
}
