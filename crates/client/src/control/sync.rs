//! Background synchronization envelope.
//!
//! What actually gets synchronized is supplied by the embedding
//! application as a [`SyncTask`]; the worker only triggers it for the
//! recognized tag and tells clients when it finished.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use offgrid_core::Error;

/// Messages pushed from the worker to connected clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Sent after a background sync completed; `timestamp` is Unix milliseconds.
    BackgroundSyncComplete { timestamp: i64 },
}

impl ClientMessage {
    pub fn sync_complete_now() -> Self {
        ClientMessage::BackgroundSyncComplete { timestamp: chrono::Utc::now().timestamp_millis() }
    }
}

/// The synchronization work run on a background-sync signal.
#[async_trait]
pub trait SyncTask: Send + Sync {
    async fn run(&self) -> Result<(), Error>;
}

/// Default task: nothing to synchronize.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSync;

#[async_trait]
impl SyncTask for NoopSync {
    async fn run(&self) -> Result<(), Error> {
        Ok(())
    }
}
