//! The worker: one entry point dispatching typed events.
//!
//! Handlers are looked up in a table built once when the worker is
//! constructed. Every collaborator (store, network, host, sync task) is
//! injected; nothing is reached through process-wide state.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use url::Url;

use crate::classify::Classifier;
use crate::control::push::{Notification, NotificationClick};
use crate::control::sync::{NoopSync, SyncTask};
use crate::control::{ControlChannel, ControlMessage, ControlReply};
use crate::fetch::{Network, resolve};
use crate::generations::{GenerationManager, Manifest};
use crate::host::Host;
use crate::intercept::{FetchInterceptor, Served};
use offgrid_core::cache::CacheStore;
use offgrid_core::{AppConfig, Error, Request, RequestKey};

/// Settings the worker needs, resolved from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub generation: String,
    pub origin: Url,
    pub manifest: Manifest,
    pub offline_url: Url,
    pub offline_message: String,
    pub cache_markers: Vec<String>,
    pub sync_tag: String,
}

impl TryFrom<&AppConfig> for WorkerConfig {
    type Error = Error;

    fn try_from(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("origin: {e}")))?;
        let offline_url =
            resolve(&origin, &config.offline_url).map_err(|e| Error::InvalidUrl(format!("offline_url: {e}")))?;

        Ok(Self {
            generation: config.generation.clone(),
            manifest: Manifest { core: config.core_resources.clone(), auxiliary: config.auxiliary_resources.clone() },
            origin,
            offline_url,
            offline_message: config.offline_message.clone(),
            cache_markers: config.cache_markers.clone(),
            sync_tag: config.sync_tag.clone(),
        })
    }
}

/// Everything the worker reacts to.
#[derive(Debug, Clone)]
pub enum Event {
    Install,
    Activate,
    Fetch(Request),
    Message(ControlMessage),
    Push(Option<String>),
    NotificationClick(NotificationClick),
    Sync(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Install,
    Activate,
    Fetch,
    Message,
    Push,
    NotificationClick,
    Sync,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Install => EventKind::Install,
            Event::Activate => EventKind::Activate,
            Event::Fetch(_) => EventKind::Fetch,
            Event::Message(_) => EventKind::Message,
            Event::Push(_) => EventKind::Push,
            Event::NotificationClick(_) => EventKind::NotificationClick,
            Event::Sync(_) => EventKind::Sync,
        }
    }
}

/// What handling an event produced.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Installed,
    Activated { deleted: Vec<String> },
    Response(Served),
    Reply(Option<ControlReply>),
    Notified(Notification),
    Handled,
    Synced(bool),
}

type Handler = for<'a> fn(&'a Worker, Event) -> BoxFuture<'a, Result<EventOutcome, Error>>;

fn mismatched(kind: EventKind) -> Error {
    Error::InvalidInput(format!("handler for {kind:?} received a different event"))
}

fn on_install<'a>(worker: &'a Worker, _event: Event) -> BoxFuture<'a, Result<EventOutcome, Error>> {
    Box::pin(async move {
        worker.generations.install(&worker.manifest, worker.host.as_ref()).await?;
        Ok(EventOutcome::Installed)
    })
}

fn on_activate<'a>(worker: &'a Worker, _event: Event) -> BoxFuture<'a, Result<EventOutcome, Error>> {
    Box::pin(async move {
        let deleted = worker.generations.activate(worker.host.as_ref()).await;
        Ok(EventOutcome::Activated { deleted })
    })
}

fn on_fetch<'a>(worker: &'a Worker, event: Event) -> BoxFuture<'a, Result<EventOutcome, Error>> {
    Box::pin(async move {
        let Event::Fetch(request) = event else {
            return Err(mismatched(EventKind::Fetch));
        };
        Ok(EventOutcome::Response(worker.interceptor.handle(&request).await?))
    })
}

fn on_message<'a>(worker: &'a Worker, event: Event) -> BoxFuture<'a, Result<EventOutcome, Error>> {
    Box::pin(async move {
        let Event::Message(message) = event else {
            return Err(mismatched(EventKind::Message));
        };
        Ok(EventOutcome::Reply(worker.control.handle(message).await))
    })
}

fn on_push<'a>(worker: &'a Worker, event: Event) -> BoxFuture<'a, Result<EventOutcome, Error>> {
    Box::pin(async move {
        let Event::Push(payload) = event else {
            return Err(mismatched(EventKind::Push));
        };
        Ok(EventOutcome::Notified(worker.control.push(payload.as_deref()).await))
    })
}

fn on_notification_click<'a>(worker: &'a Worker, event: Event) -> BoxFuture<'a, Result<EventOutcome, Error>> {
    Box::pin(async move {
        let Event::NotificationClick(click) = event else {
            return Err(mismatched(EventKind::NotificationClick));
        };
        worker.control.notification_click(&click).await;
        Ok(EventOutcome::Handled)
    })
}

fn on_sync<'a>(worker: &'a Worker, event: Event) -> BoxFuture<'a, Result<EventOutcome, Error>> {
    Box::pin(async move {
        let Event::Sync(tag) = event else {
            return Err(mismatched(EventKind::Sync));
        };
        Ok(EventOutcome::Synced(worker.control.background_sync(&tag).await))
    })
}

fn handler_table() -> HashMap<EventKind, Handler> {
    let mut handlers: HashMap<EventKind, Handler> = HashMap::new();
    handlers.insert(EventKind::Install, on_install);
    handlers.insert(EventKind::Activate, on_activate);
    handlers.insert(EventKind::Fetch, on_fetch);
    handlers.insert(EventKind::Message, on_message);
    handlers.insert(EventKind::Push, on_push);
    handlers.insert(EventKind::NotificationClick, on_notification_click);
    handlers.insert(EventKind::Sync, on_sync);
    handlers
}

pub struct Worker {
    config: WorkerConfig,
    manifest: Manifest,
    host: Arc<dyn Host>,
    generations: Arc<GenerationManager>,
    interceptor: FetchInterceptor,
    control: ControlChannel,
    handlers: HashMap<EventKind, Handler>,
}

impl Worker {
    /// Build the worker with a no-op sync task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        config: WorkerConfig, store: Arc<dyn CacheStore>, network: Arc<dyn Network>, host: Arc<dyn Host>,
    ) -> Self {
        Self::with_sync_task(config, store, network, host, Arc::new(NoopSync))
    }

    pub fn with_sync_task(
        config: WorkerConfig, store: Arc<dyn CacheStore>, network: Arc<dyn Network>, host: Arc<dyn Host>,
        sync_task: Arc<dyn SyncTask>,
    ) -> Self {
        let generations = Arc::new(GenerationManager::new(
            Arc::clone(&store),
            Arc::clone(&network),
            config.generation.clone(),
            config.origin.clone(),
        ));

        let interceptor = FetchInterceptor::new(
            store,
            network,
            Classifier::new(config.cache_markers.iter().cloned()),
            config.generation.clone(),
            RequestKey::new("GET", &config.offline_url),
            config.offline_message.clone(),
        );

        let control =
            ControlChannel::new(Arc::clone(&generations), Arc::clone(&host), sync_task, config.sync_tag.clone());

        Self {
            manifest: config.manifest.clone(),
            config,
            host,
            generations,
            interceptor,
            control,
            handlers: handler_table(),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn generations(&self) -> &GenerationManager {
        &self.generations
    }

    /// Resolve a possibly relative URL against the configured origin.
    pub fn resolve(&self, input: &str) -> Result<Url, Error> {
        resolve(&self.config.origin, input).map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    /// Route `event` to its handler.
    ///
    /// # Errors
    ///
    /// Only a failed install and a failed pass-through fetch are errors;
    /// every other handler degrades to a logged warning.
    pub async fn dispatch(&self, event: Event) -> Result<EventOutcome, Error> {
        let kind = event.kind();
        let handler = self
            .handlers
            .get(&kind)
            .ok_or_else(|| Error::InvalidInput(format!("no handler registered for {kind:?}")))?;
        handler(self, event).await
    }

    /// Install then activate. Activation is skipped if installation fails.
    pub async fn start(&self) -> Result<Vec<String>, Error> {
        self.dispatch(Event::Install).await?;
        match self.dispatch(Event::Activate).await? {
            EventOutcome::Activated { deleted } => Ok(deleted),
            _ => Ok(Vec::new()),
        }
    }

    /// Convenience wrapper over [`Event::Fetch`].
    pub async fn fetch(&self, request: Request) -> Result<Served, Error> {
        match self.dispatch(Event::Fetch(request)).await? {
            EventOutcome::Response(served) => Ok(served),
            other => Err(Error::InvalidInput(format!("unexpected fetch outcome: {other:?}"))),
        }
    }

    /// Convenience wrapper over [`Event::Message`].
    pub async fn message(&self, message: ControlMessage) -> Option<ControlReply> {
        match self.dispatch(Event::Message(message)).await {
            Ok(EventOutcome::Reply(reply)) => reply,
            _ => None,
        }
    }

    /// Wait for background cache writes to finish.
    pub async fn settle(&self) {
        self.interceptor.writeback().settle().await;
    }
}
