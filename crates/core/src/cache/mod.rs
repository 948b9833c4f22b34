//! SQLite-backed store of versioned cache generations.
//!
//! This module provides a persistent, generation-scoped response cache
//! using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Named generations owning their entries
//! - Entries keyed by a SHA-256 digest of the normalized request identity
//! - Atomic batch writes for manifest pre-population
//! - Automatic schema migrations and WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod key;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::Entry;
pub use key::RequestKey;
pub use store::CacheStore;
