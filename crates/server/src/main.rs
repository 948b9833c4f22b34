//! offgrid server entry point.
//!
//! Boots the worker (install, then activate) and serves it as an MCP server
//! on stdio transport. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use offgrid_client::{FetchClient, FetchConfig, LocalHost, Worker, WorkerConfig};
use offgrid_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    tracing::info!(generation = %config.generation, origin = %config.origin, "starting offgrid server on stdio transport");

    let store = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open cache at {}", config.db_path.display()))?;
    let network = FetchClient::new(FetchConfig::from(&config))?;
    let worker = Worker::new(WorkerConfig::try_from(&config)?, Arc::new(store), Arc::new(network), Arc::new(LocalHost::new()));

    // A failed install leaves the previous generations in place.
    let deleted = worker.start().await.context("install failed, not activating")?;
    tracing::info!(deleted = deleted.len(), "worker active");

    let worker = Arc::new(worker);
    let server = serve_server(handler::OffgridServer::new(Arc::clone(&worker)), stdio()).await?;
    server.waiting().await?;

    worker.settle().await;
    Ok(())
}
