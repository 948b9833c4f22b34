//! Cache store adapter.
//!
//! The worker only ever talks to a `CacheStore`; the SQLite-backed
//! `CacheDb` is the production implementation. Puts on the same key are
//! last-write-wins, so concurrent handlers need no extra locking.

use async_trait::async_trait;

use super::connection::CacheDb;
use super::entries::Entry;
use super::key::RequestKey;
use crate::Error;
use crate::http::Response;

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the named generation if absent.
    async fn open(&self, generation: &str) -> Result<(), Error>;

    /// Find the entry for `key` in `generation`.
    async fn match_entry(&self, generation: &str, key: &RequestKey) -> Result<Option<Response>, Error>;

    /// Store one entry, creating the generation if needed.
    async fn put(&self, generation: &str, key: &RequestKey, response: &Response) -> Result<(), Error>;

    /// Store a batch atomically.
    async fn put_all(&self, generation: &str, entries: Vec<Entry>) -> Result<(), Error>;

    /// Delete a generation with all its entries. Returns whether it existed.
    async fn delete(&self, generation: &str) -> Result<bool, Error>;

    /// All generation names, oldest first.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Number of entries in `generation` (zero if it does not exist).
    async fn entry_count(&self, generation: &str) -> Result<u64, Error>;
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn open(&self, generation: &str) -> Result<(), Error> {
        self.open_generation(generation).await
    }

    async fn match_entry(&self, generation: &str, key: &RequestKey) -> Result<Option<Response>, Error> {
        self.get_entry(generation, key).await
    }

    async fn put(&self, generation: &str, key: &RequestKey, response: &Response) -> Result<(), Error> {
        self.put_entry(generation, key, response).await
    }

    async fn put_all(&self, generation: &str, entries: Vec<Entry>) -> Result<(), Error> {
        self.put_entries(generation, entries).await
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        self.delete_generation(generation).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.generation_names().await
    }

    async fn entry_count(&self, generation: &str) -> Result<u64, Error> {
        self.count_entries(generation).await
    }
}
