//! Core types and shared functionality for offgrid.
//!
//! This crate provides:
//! - The generation-scoped cache store with its SQLite backend
//! - The request/response model
//! - Unified error types
//! - Layered configuration

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, CacheStore, RequestKey};
pub use config::AppConfig;
pub use error::Error;
pub use http::{Request, Response};
