//! Capabilities the hosting runtime lends to the worker.
//!
//! The worker never reaches for process globals: activation handoff,
//! notification display, window management and client messaging all go
//! through an injected [`Host`].

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;

use crate::control::push::Notification;
use crate::control::sync::ClientMessage;
use offgrid_core::Error;

#[async_trait]
pub trait Host: Send + Sync {
    /// Activate the installed generation without waiting for older instances.
    fn skip_waiting(&self);

    /// Take control of already-open clients so they are served without a reload.
    async fn claim_clients(&self) -> Result<(), Error>;

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error>;

    fn close_notification(&self, tag: Option<&str>);

    /// Open (or focus) an application window at `url`.
    async fn open_window(&self, url: &str) -> Result<(), Error>;

    /// Send `message` to every connected client. Returns how many received it.
    async fn broadcast(&self, message: &ClientMessage) -> Result<usize, Error>;
}

/// Something a [`LocalHost`] was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    SkipWaiting,
    ClaimClients,
    ShowNotification(Notification),
    CloseNotification(Option<String>),
    OpenWindow(String),
    Broadcast(ClientMessage),
}

/// Most recent calls a [`LocalHost`] remembers.
pub const HISTORY_LIMIT: usize = 256;

/// In-process host: logs every call, keeps a bounded history of the latest
/// [`HISTORY_LIMIT`] calls, and fans broadcasts out to subscribed clients.
pub struct LocalHost {
    events: Mutex<VecDeque<HostEvent>>,
    clients: broadcast::Sender<ClientMessage>,
}

impl Default for LocalHost {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalHost {
    pub fn new() -> Self {
        let (clients, _) = broadcast::channel(64);
        Self { events: Mutex::new(VecDeque::new()), clients }
    }

    /// Connect a client; it receives every later broadcast.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientMessage> {
        self.clients.subscribe()
    }

    /// Recent requests, oldest first.
    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).iter().cloned().collect()
    }

    fn record(&self, event: HostEvent) {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        if events.len() == HISTORY_LIMIT {
            events.pop_front();
        }
        events.push_back(event);
    }
}

#[async_trait]
impl Host for LocalHost {
    fn skip_waiting(&self) {
        tracing::info!("skip waiting: new generation takes over immediately");
        self.record(HostEvent::SkipWaiting);
    }

    async fn claim_clients(&self) -> Result<(), Error> {
        tracing::info!(clients = self.clients.receiver_count(), "claiming clients");
        self.record(HostEvent::ClaimClients);
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        tracing::info!(title = %notification.title, tag = ?notification.tag, "showing notification");
        self.record(HostEvent::ShowNotification(notification.clone()));
        Ok(())
    }

    fn close_notification(&self, tag: Option<&str>) {
        tracing::debug!(tag, "closing notification");
        self.record(HostEvent::CloseNotification(tag.map(str::to_string)));
    }

    async fn open_window(&self, url: &str) -> Result<(), Error> {
        tracing::info!(url, "opening window");
        self.record(HostEvent::OpenWindow(url.to_string()));
        Ok(())
    }

    async fn broadcast(&self, message: &ClientMessage) -> Result<usize, Error> {
        self.record(HostEvent::Broadcast(message.clone()));
        // send only fails when nobody is subscribed.
        let delivered = self.clients.send(message.clone()).unwrap_or(0);
        tracing::debug!(delivered, "broadcast to clients");
        Ok(delivered)
    }
}
