//! Fire-and-forget event delivery.
//!
//! Events are pushed onto a bounded queue without ever blocking the caller
//! and a single worker task delivers them through an [`EventSink`]. There is
//! no retry: an event that cannot be queued or delivered is counted and
//! discarded with a warning.

use super::event::TrackedEvent;
use crate::api::{ApiClient, ApiError};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

/// Destination for serialized event payloads.
pub trait EventSink: Send + Sync + 'static {
    fn deliver(&self, payload: Value) -> BoxFuture<'_, Result<(), ApiError>>;
}

/// Posts payloads to the collector's `/track` endpoint.
pub struct HttpSink {
    client: ApiClient,
}

impl HttpSink {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

impl EventSink for HttpSink {
    fn deliver(&self, payload: Value) -> BoxFuture<'_, Result<(), ApiError>> {
        async move { self.client.track(&payload).await }.boxed()
    }
}

/// Keeps delivered payloads in memory. Used for dry runs and tests.
#[derive(Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<Value>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every payload delivered so far.
    pub fn events(&self) -> Vec<Value> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Returns the delivered payloads with the given `eventType`.
    pub fn events_of_type(&self, event_type: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter(|e| e["eventType"] == event_type)
            .collect()
    }
}

impl EventSink for MemorySink {
    fn deliver(&self, payload: Value) -> BoxFuture<'_, Result<(), ApiError>> {
        if let Ok(mut events) = self.events.lock() {
            events.push(payload);
        }
        futures::future::ready(Ok(())).boxed()
    }
}

/// Lock-free delivery counters.
#[derive(Debug, Default)]
pub struct EmitterStats {
    queued: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of [`EmitterStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitterSnapshot {
    pub queued: u64,
    pub delivered: u64,
    pub failed: u64,
    pub dropped: u64,
}

impl EmitterStats {
    pub fn snapshot(&self) -> EmitterSnapshot {
        EmitterSnapshot {
            queued: self.queued.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Handle used to enqueue events. Cheap to clone.
#[derive(Clone)]
pub struct Emitter {
    tx: Arc<Mutex<Option<mpsc::Sender<TrackedEvent>>>>,
    stats: Arc<EmitterStats>,
}

impl Emitter {
    /// Spawns the delivery worker on the current tokio runtime.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn spawn(sink: Arc<dyn EventSink>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let stats = Arc::new(EmitterStats::default());
        let worker = tokio::spawn(run_worker(rx, sink, Arc::clone(&stats)));

        let emitter = Self {
            tx: Arc::new(Mutex::new(Some(tx))),
            stats,
        };
        (emitter, worker)
    }

    /// Queues an event for delivery. Never blocks.
    ///
    /// Returns `false` if the event was dropped.
    pub fn emit(&self, event: TrackedEvent) -> bool {
        let guard = match self.tx.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(tx) = guard.as_ref() else {
            tracing::debug!(event_type = %event.event_type(), "Emitter closed, dropping event");
            return false;
        };

        match tx.try_send(event) {
            Ok(()) => {
                self.stats.queued.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(event)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    event_type = %event.event_type(),
                    "Tracking queue full, dropping event"
                );
                false
            }
            Err(TrySendError::Closed(event)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    event_type = %event.event_type(),
                    "Tracking worker gone, dropping event"
                );
                false
            }
        }
    }

    /// Closes the queue. The worker delivers what is already queued, then exits.
    pub fn close(&self) {
        let mut guard = match self.tx.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.take();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.lock().map(|tx| tx.is_none()).unwrap_or(true)
    }

    pub fn stats(&self) -> EmitterSnapshot {
        self.stats.snapshot()
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<TrackedEvent>,
    sink: Arc<dyn EventSink>,
    stats: Arc<EmitterStats>,
) {
    while let Some(event) = rx.recv().await {
        tracing::debug!(
            event_type = %event.event_type(),
            session_id = %event.session_id,
            page = %event.current_page,
            "Tracking event"
        );

        match sink.deliver(event.to_payload()).await {
            Ok(()) => {
                stats.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(?e, event_type = %event.event_type(), "Tracking error, event dropped");
            }
        }
    }

    tracing::debug!("Tracking worker drained");
}
