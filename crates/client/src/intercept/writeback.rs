//! Detached cache writes.
//!
//! Returning a network response never waits for its cache write. Each write
//! runs on its own task; failures go to an error sink that logs them and is
//! never joined by the response path.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::sync::{Notify, mpsc};

use offgrid_core::cache::CacheStore;
use offgrid_core::{RequestKey, Response};

/// A write that did not make it into the store.
#[derive(Debug)]
pub struct WriteFailure {
    pub generation: String,
    pub url: String,
    pub error: String,
}

#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    failed: AtomicU64,
    idle: Notify,
}

impl InFlight {
    fn begin(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    fn end(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Spawns background cache writes and owns their error sink.
pub struct WriteBack {
    store: Arc<dyn CacheStore>,
    failures: mpsc::UnboundedSender<WriteFailure>,
    in_flight: Arc<InFlight>,
}

impl WriteBack {
    /// Create the write-back and spawn its error sink.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        let (failures, mut rx) = mpsc::unbounded_channel::<WriteFailure>();
        let in_flight = Arc::new(InFlight::default());

        let sink = Arc::clone(&in_flight);
        tokio::spawn(async move {
            while let Some(failure) = rx.recv().await {
                sink.failed.fetch_add(1, Ordering::SeqCst);
                tracing::warn!(
                    generation = %failure.generation,
                    url = %failure.url,
                    error = %failure.error,
                    "background cache write failed"
                );
            }
        });

        Self { store, failures, in_flight }
    }

    /// Store `response` under `key` without waiting for it.
    pub fn spawn(&self, generation: &str, key: RequestKey, response: Response) {
        let store = Arc::clone(&self.store);
        let failures = self.failures.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let generation = generation.to_string();

        in_flight.begin();
        tokio::spawn(async move {
            match store.put(&generation, &key, &response).await {
                Ok(()) => tracing::debug!(generation = %generation, url = %key.url, "cached response"),
                Err(err) => {
                    let _ = failures.send(WriteFailure { generation, url: key.url, error: err.to_string() });
                }
            }
            in_flight.end();
        });
    }

    /// Writes spawned but not yet finished.
    pub fn pending(&self) -> usize {
        self.in_flight.count.load(Ordering::SeqCst)
    }

    /// Failures the sink has logged so far.
    pub fn failed(&self) -> u64 {
        self.in_flight.failed.load(Ordering::SeqCst)
    }

    /// Wait until every spawned write has finished.
    pub async fn settle(&self) {
        loop {
            let idle = self.in_flight.idle.notified();
            if self.pending() == 0 {
                return;
            }
            idle.await;
        }
    }
}
