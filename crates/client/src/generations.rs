//! Generation lifecycle: install, activate, purge and prime.
//!
//! Exactly one generation is current. Install fills it from the manifest,
//! activation deletes every other generation, and a version bump is the
//! only way to retire what was cached before.

use std::sync::Arc;

use futures_util::future::try_join_all;
use url::Url;

use crate::fetch::{Network, resolve_all};
use crate::host::Host;
use offgrid_core::cache::{CacheStore, Entry};
use offgrid_core::{Error, Request};

/// Resources pre-populated at install time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Must all be cached or installation fails.
    pub core: Vec<String>,
    /// Cached on a best-effort basis.
    pub auxiliary: Vec<String>,
}

/// Owner of the current generation name and its lifecycle.
pub struct GenerationManager {
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    generation: String,
    origin: Url,
}

impl GenerationManager {
    pub fn new(store: Arc<dyn CacheStore>, network: Arc<dyn Network>, generation: String, origin: Url) -> Self {
        Self { store, network, generation, origin }
    }

    /// Name of the current generation.
    pub fn current(&self) -> &str {
        &self.generation
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Open the current generation and fill it from `manifest`.
    ///
    /// # Errors
    ///
    /// Fails when the core batch cannot be fetched and stored; nothing from
    /// that batch is written. A failing auxiliary batch is only logged.
    pub async fn install(&self, manifest: &Manifest, host: &dyn Host) -> Result<(), Error> {
        tracing::info!(generation = %self.generation, core = manifest.core.len(), "installing");

        self.store.open(&self.generation).await?;

        if let Err(err) = self.add_all(&manifest.core).await {
            tracing::error!(generation = %self.generation, error = %err, "failed to cache core resources");
            return Err(err);
        }
        tracing::info!(count = manifest.core.len(), "core resources cached");

        if !manifest.auxiliary.is_empty() {
            match self.add_all(&manifest.auxiliary).await {
                Ok(()) => tracing::info!(count = manifest.auxiliary.len(), "auxiliary resources cached"),
                Err(err) => tracing::warn!(error = %err, "failed to cache auxiliary resources"),
            }
        }

        host.skip_waiting();
        Ok(())
    }

    /// Delete every generation but the current one, then claim clients.
    ///
    /// Best-effort: each failure is logged and activation carries on.
    /// Returns the names that were deleted.
    pub async fn activate(&self, host: &dyn Host) -> Vec<String> {
        tracing::info!(generation = %self.generation, "activating");

        if let Err(err) = self.store.open(&self.generation).await {
            tracing::error!(error = %err, "failed to open current generation");
        }

        let mut deleted = Vec::new();
        match self.store.keys().await {
            Ok(names) => {
                for name in names.into_iter().filter(|name| name != &self.generation) {
                    tracing::info!(generation = %name, "deleting old generation");
                    match self.store.delete(&name).await {
                        Ok(_) => deleted.push(name),
                        Err(err) => tracing::error!(generation = %name, error = %err, "failed to delete generation"),
                    }
                }
            }
            Err(err) => tracing::error!(error = %err, "failed to list generations"),
        }

        match host.claim_clients().await {
            Ok(()) => tracing::info!(deleted = deleted.len(), "activated"),
            Err(err) => tracing::error!(error = %err, "failed to claim clients"),
        }

        deleted
    }

    /// Delete every generation, the current one included.
    ///
    /// Returns how many generations were removed.
    pub async fn purge_all(&self) -> Result<usize, Error> {
        let names = self.store.keys().await?;
        let results = try_join_all(names.iter().map(|name| self.store.delete(name))).await?;
        let removed = results.into_iter().filter(|existed| *existed).count();
        tracing::info!(removed, "all generations cleared");
        Ok(removed)
    }

    /// Fetch and store exactly `urls` into the current generation.
    pub async fn prime_urls(&self, urls: &[String]) -> Result<(), Error> {
        self.store.open(&self.generation).await?;
        self.add_all(urls).await?;
        tracing::info!(count = urls.len(), "urls cached");
        Ok(())
    }

    /// Fetch every URL concurrently and store them as one atomic batch.
    ///
    /// Any transport failure or non-ok status fails the whole batch before
    /// anything is written.
    async fn add_all(&self, urls: &[String]) -> Result<(), Error> {
        let resolved = resolve_all(&self.origin, urls).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let entries = try_join_all(resolved.into_iter().map(|url| self.fetch_entry(url))).await?;

        self.store.put_all(&self.generation, entries).await
    }

    async fn fetch_entry(&self, url: Url) -> Result<Entry, Error> {
        let request = Request::get(url);
        let response = self.network.fetch(&request).await?;
        if !response.is_ok() {
            return Err(Error::HttpError(format!("{}: status {}", request.url, response.status)));
        }
        Ok((request.key(), response))
    }
}
