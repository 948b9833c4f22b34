//! Out-of-band control of the worker.
//!
//! Commands are plain calls returning an optional reply rather than
//! messages answered over a port. Push, notification and sync signals have
//! no reply at all; their failures are logged and never escape.

pub mod push;
pub mod sync;

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::generations::GenerationManager;
use crate::host::Host;
use push::{Notification, NotificationClick, ROOT_URL};
use sync::{ClientMessage, SyncTask};

/// Inbound command envelope: `{ "type": ..., "urls"?: [...] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    SkipWaiting,
    GetVersion,
    ClearCache,
    CacheUrls {
        #[serde(default)]
        urls: Option<Vec<String>>,
    },
    #[serde(other)]
    Unknown,
}

impl ControlMessage {
    /// Parse an envelope; anything unparseable is the no-op `Unknown`.
    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value(value) {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(error = %err, "unrecognized control message");
                ControlMessage::Unknown
            }
        }
    }
}

/// Reply to a command: `{ "type": ..., ...fields }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlReply {
    Version {
        version: String,
    },
    CacheCleared {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    UrlsCached {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// Handles commands and asynchronous signals for one worker.
pub struct ControlChannel {
    generations: Arc<GenerationManager>,
    host: Arc<dyn Host>,
    sync_task: Arc<dyn SyncTask>,
    sync_tag: String,
    notification_defaults: Notification,
}

impl ControlChannel {
    pub fn new(
        generations: Arc<GenerationManager>, host: Arc<dyn Host>, sync_task: Arc<dyn SyncTask>, sync_tag: String,
    ) -> Self {
        Self { generations, host, sync_task, sync_tag, notification_defaults: Notification::default() }
    }

    pub fn with_notification_defaults(mut self, defaults: Notification) -> Self {
        self.notification_defaults = defaults;
        self
    }

    /// Handle one command. Failures come back inside the reply.
    pub async fn handle(&self, message: ControlMessage) -> Option<ControlReply> {
        tracing::debug!(?message, "control message");

        match message {
            ControlMessage::SkipWaiting => {
                self.host.skip_waiting();
                None
            }
            ControlMessage::GetVersion => {
                Some(ControlReply::Version { version: self.generations.current().to_string() })
            }
            ControlMessage::ClearCache => {
                let result = self.generations.purge_all().await;
                if let Err(err) = &result {
                    tracing::error!(error = %err, "failed to clear caches");
                }
                Some(ControlReply::CacheCleared { success: result.is_ok(), error: result.err().map(|e| e.to_string()) })
            }
            ControlMessage::CacheUrls { urls: Some(urls) } => {
                let result = self.generations.prime_urls(&urls).await;
                if let Err(err) = &result {
                    tracing::error!(error = %err, "failed to cache urls");
                }
                Some(ControlReply::UrlsCached { success: result.is_ok(), error: result.err().map(|e| e.to_string()) })
            }
            ControlMessage::CacheUrls { urls: None } => {
                tracing::debug!("CACHE_URLS without urls ignored");
                None
            }
            ControlMessage::Unknown => None,
        }
    }

    /// Display a notification for an inbound push.
    ///
    /// Returns what was shown.
    pub async fn push(&self, payload: Option<&str>) -> Notification {
        let notification = self.notification_defaults.for_push(payload);
        if let Err(err) = self.host.show_notification(&notification).await {
            tracing::error!(error = %err, "failed to show notification");
        }
        notification
    }

    /// React to a click on a displayed notification.
    pub async fn notification_click(&self, click: &NotificationClick) {
        tracing::debug!(action = ?click.action, "notification clicked");
        self.host.close_notification(click.tag.as_deref());

        if click.opens_window()
            && let Err(err) = self.host.open_window(ROOT_URL).await
        {
            tracing::error!(error = %err, "failed to open window");
        }
    }

    /// Run background sync for `tag`. Returns whether it completed.
    ///
    /// Other tags are ignored. Failures are logged; the host's own sync
    /// scheduling retries them.
    pub async fn background_sync(&self, tag: &str) -> bool {
        if tag != self.sync_tag {
            tracing::debug!(tag, "ignoring unrecognized sync tag");
            return false;
        }

        tracing::info!(tag, "performing background sync");
        if let Err(err) = self.sync_task.run().await {
            tracing::error!(error = %err, "background sync failed");
            return false;
        }

        match self.host.broadcast(&ClientMessage::sync_complete_now()).await {
            Ok(delivered) => {
                tracing::info!(delivered, "background sync completed");
                true
            }
            Err(err) => {
                tracing::error!(error = %err, "background sync failed");
                false
            }
        }
    }
}
