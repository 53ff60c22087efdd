//! Client interaction tracker.
//!
//! A [`Tracker`] owns one browsing session: it stamps every event with the
//! session id and current page, runs the idle check and per-element view
//! timers, and hands payloads to the fire-and-forget [`Emitter`].
//!
//! # Lifecycle
//!
//! `Uninitialized -> Active -> TornDown`. [`Tracker::start`] happens once;
//! [`Tracker::stop`] flushes open view timers, emits `session_end` and waits
//! for the delivery queue to drain. A stopped tracker cannot be restarted;
//! build a new one for a new session.
//!
//! All timers are tokio tasks, so `start` and `observe_element` must be
//! called from within a tokio runtime.

pub mod emitter;
pub mod event;
pub mod idle;
pub mod session;
pub mod visibility;

pub use emitter::{Emitter, EmitterSnapshot, EventSink, HttpSink, MemorySink};
pub use event::{EventKind, InteractionType, TrackedEvent};
pub use idle::{ActivityKind, IdleDetector, IdlePolicy};
pub use session::{Lifecycle, Session, SessionId};
pub use visibility::ElementView;

use crate::api::ApiClient;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use visibility::ViewTimer;

/// Tracker tuning knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Capacity of the delivery queue (default: 256).
    pub queue_capacity: usize,

    /// Interval between view heartbeats while an element stays visible (default: 5s).
    pub heartbeat_interval: Duration,

    /// Time without input after which the user counts as idle (default: 5 min).
    pub idle_threshold: Duration,

    /// How often the idle check runs (default: 5 min).
    pub idle_check_interval: Duration,

    /// Whether idleness is reported once per stretch or on every check.
    pub idle_policy: IdlePolicy,

    /// Fraction of an element that must be visible to count as viewed (default: 0.5).
    pub visibility_threshold: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            heartbeat_interval: Duration::from_secs(5),
            idle_threshold: Duration::from_secs(300),
            idle_check_interval: Duration::from_secs(300),
            idle_policy: IdlePolicy::Once,
            visibility_threshold: 0.5,
        }
    }
}

/// Lifecycle misuse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    #[error("tracker session already started")]
    AlreadyStarted,

    #[error("tracker session has not been started")]
    NotStarted,

    #[error("tracker session was torn down")]
    TornDown,
}

pub(crate) struct TrackerState {
    pub(crate) lifecycle: Lifecycle,
    pub(crate) session: Option<Session>,
    pub(crate) current_page: String,
    emitter: Option<Emitter>,
    worker: Option<JoinHandle<()>>,
    idle: IdleDetector,
    idle_task: Option<JoinHandle<()>>,
    pub(crate) views: HashMap<String, ViewTimer>,
    /// Bumped for every view timer so heartbeat tasks can tell theirs apart.
    pub(crate) view_generation: u64,
}

pub(crate) struct Inner {
    pub(crate) config: TrackerConfig,
    sink: Arc<dyn EventSink>,
    state: Mutex<TrackerState>,
}

impl Inner {
    pub(crate) fn lock(&self) -> MutexGuard<'_, TrackerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Builds and queues an event from the locked state.
    pub(crate) fn emit_locked(
        &self,
        state: &TrackerState,
        kind: EventKind,
        extra: Map<String, Value>,
    ) -> bool {
        if !state.lifecycle.is_active() {
            tracing::debug!(event_type = %kind.event_type(), "Tracker not active, dropping event");
            return false;
        }
        let (Some(session), Some(emitter)) = (&state.session, &state.emitter) else {
            return false;
        };

        let event = TrackedEvent::new(
            kind,
            session.session_id.clone(),
            state.current_page.clone(),
            extra,
        );
        emitter.emit(event)
    }

    fn run_idle_check(&self) {
        let mut state = self.lock();
        if !state.lifecycle.is_active() {
            return;
        }

        if let Some(idle) = state.idle.check(Instant::now()) {
            tracing::info!(idle_secs = idle.as_secs(), "User idle");
            self.emit_locked(
                &state,
                EventKind::UserIdle {
                    duration_secs: idle.as_secs_f64(),
                },
                Map::new(),
            );
        }
    }
}

/// Interaction tracker for one session. Cheap to clone.
#[derive(Clone)]
pub struct Tracker {
    pub(crate) inner: Arc<Inner>,
}

impl Tracker {
    /// Creates an uninitialized tracker delivering through `sink`.
    pub fn new(config: TrackerConfig, sink: Arc<dyn EventSink>) -> Self {
        let idle = IdleDetector::new(config.idle_threshold, config.idle_policy, Instant::now());
        let state = TrackerState {
            lifecycle: Lifecycle::Uninitialized,
            session: None,
            current_page: String::new(),
            emitter: None,
            worker: None,
            idle,
            idle_task: None,
            views: HashMap::new(),
            view_generation: 0,
        };

        Self {
            inner: Arc::new(Inner {
                config,
                sink,
                state: Mutex::new(state),
            }),
        }
    }

    /// Creates a tracker that posts events to the API's `/track` endpoint.
    pub fn with_http(config: TrackerConfig, client: ApiClient) -> Self {
        Self::new(config, Arc::new(HttpSink::new(client)))
    }

    /// Starts the session.
    ///
    /// Generates a fresh session id, spawns the delivery worker and the idle
    /// check, and emits the initial page view.
    pub fn start(&self, page: &str, referrer: Option<&str>) -> Result<SessionId, TrackerError> {
        let mut state = self.inner.lock();
        match state.lifecycle {
            Lifecycle::Uninitialized => {}
            Lifecycle::Active => return Err(TrackerError::AlreadyStarted),
            Lifecycle::TornDown => return Err(TrackerError::TornDown),
        }

        let config = &self.inner.config;
        let session = Session::new();
        let session_id = session.session_id.clone();
        let (emitter, worker) = Emitter::spawn(Arc::clone(&self.inner.sink), config.queue_capacity);

        state.session = Some(session);
        state.current_page = page.to_string();
        state.emitter = Some(emitter);
        state.worker = Some(worker);
        state.idle = IdleDetector::new(config.idle_threshold, config.idle_policy, Instant::now());
        state.idle_task = Some(spawn_idle_check(
            Arc::downgrade(&self.inner),
            config.idle_check_interval,
        ));
        state.lifecycle = Lifecycle::Active;

        tracing::info!(session_id = %session_id, page = %page, "Tracking session started");

        self.inner.emit_locked(
            &state,
            EventKind::PageView {
                page: page.to_string(),
                referrer: referrer.map(str::to_string),
            },
            Map::new(),
        );

        Ok(session_id)
    }

    /// Records a page change and emits a page view.
    pub fn navigate(&self, page: &str) {
        let mut state = self.inner.lock();
        if !state.lifecycle.is_active() {
            return;
        }
        state.current_page = page.to_string();
        self.inner.emit_locked(
            &state,
            EventKind::PageView {
                page: page.to_string(),
                referrer: None,
            },
            Map::new(),
        );
    }

    /// Emits a page view for the current page with extra context.
    pub fn track_page_view(&self, extra: Map<String, Value>) -> bool {
        let state = self.inner.lock();
        let kind = EventKind::PageView {
            page: state.current_page.clone(),
            referrer: None,
        };
        self.inner.emit_locked(&state, kind, extra)
    }

    /// Emits a free-form event.
    ///
    /// Returns `false` if the event was dropped (tracker inactive or queue full).
    pub fn track_event(&self, event_type: &str, extra: Map<String, Value>) -> bool {
        let state = self.inner.lock();
        self.inner
            .emit_locked(&state, EventKind::Custom(event_type.to_string()), extra)
    }

    /// Emits a `policy_interaction` event.
    pub fn track_policy_interaction(
        &self,
        customer_id: Option<&str>,
        policy_id: &str,
        interaction: InteractionType,
        duration_secs: Option<u64>,
        extra: Map<String, Value>,
    ) -> bool {
        let state = self.inner.lock();
        self.inner.emit_locked(
            &state,
            EventKind::PolicyInteraction {
                customer_id: customer_id.map(str::to_string),
                policy_id: policy_id.to_string(),
                interaction,
                duration_secs,
            },
            extra,
        )
    }

    /// Refreshes the idle detector from a global input event.
    pub fn record_input(&self, kind: ActivityKind) {
        let mut state = self.inner.lock();
        if state.lifecycle.is_active() {
            state.idle.record_activity(kind, Instant::now());
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.lock().lifecycle
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.inner
            .lock()
            .session
            .as_ref()
            .map(|s| s.session_id.clone())
    }

    pub fn current_page(&self) -> String {
        self.inner.lock().current_page.clone()
    }

    /// Number of elements currently timed as visible.
    pub fn active_views(&self) -> usize {
        self.inner.lock().views.len()
    }

    /// Delivery counters, if the session has been started. Still available after stop.
    pub fn stats(&self) -> Option<EmitterSnapshot> {
        self.inner.lock().emitter.as_ref().map(Emitter::stats)
    }

    /// Tears the session down (page unload).
    ///
    /// Stops the idle check, reports the final duration of every element still
    /// in view, emits `session_end` and waits until queued events are delivered.
    pub async fn stop(&self) -> Result<(), TrackerError> {
        let (emitter, worker) = {
            let mut state = self.inner.lock();
            match state.lifecycle {
                Lifecycle::Active => {}
                Lifecycle::Uninitialized => return Err(TrackerError::NotStarted),
                Lifecycle::TornDown => return Err(TrackerError::TornDown),
            }

            if let Some(task) = state.idle_task.take() {
                task.abort();
            }

            let now = Instant::now();
            let mut open: Vec<(String, ViewTimer)> = state.views.drain().collect();
            open.sort_by(|a, b| a.0.cmp(&b.0));
            for (element_id, timer) in open {
                timer.heartbeat.abort();
                let duration = timer.elapsed_secs(now);
                tracing::debug!(element_id = %element_id, duration_secs = duration, "Flushing view timer");
                self.inner
                    .emit_locked(&state, timer.view_event(duration), Map::new());
            }

            self.inner
                .emit_locked(&state, EventKind::SessionEnd, Map::new());
            state.lifecycle = Lifecycle::TornDown;

            (state.emitter.clone(), state.worker.take())
        };

        if let Some(emitter) = emitter {
            emitter.close();
            let stats = emitter.stats();
            tracing::info!(
                queued = stats.queued,
                dropped = stats.dropped,
                "Tracking session ended, draining queue"
            );
        }
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                tracing::warn!(?e, "Tracking worker ended abnormally");
            }
        }

        Ok(())
    }
}

fn spawn_idle_check(inner: Weak<Inner>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        loop {
            ticker.tick().await;
            let Some(inner) = inner.upgrade() else {
                break;
            };
            inner.run_idle_check();
        }
    })
}
