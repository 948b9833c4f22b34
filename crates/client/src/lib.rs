//! Offline cache engine for offgrid.
//!
//! This crate provides the worker that intercepts requests network-first,
//! the generation lifecycle, the control channel and the HTTP fetch
//! pipeline shared by the server and CLI.

pub mod classify;
pub mod control;
pub mod fetch;
pub mod generations;
pub mod host;
pub mod intercept;
pub mod worker;

#[cfg(test)]
mod testing;

pub use classify::{Classifier, Verdict};
pub use control::push::{Notification, NotificationClick};
pub use control::sync::{ClientMessage, NoopSync, SyncTask};
pub use control::{ControlChannel, ControlMessage, ControlReply};
pub use fetch::{FetchClient, FetchConfig, Network};
pub use generations::{GenerationManager, Manifest};
pub use host::{Host, HostEvent, LocalHost};
pub use intercept::{FetchInterceptor, Served, Source};
pub use worker::{Event, EventKind, EventOutcome, Worker, WorkerConfig};
