//! Element view timing.
//!
//! The host reports viewport intersection ratios for a tracked element; the
//! tracker keeps one [`ViewTimer`] per element id while it is in view and
//! reports `policy_interaction(view)` events with the elapsed seconds.

use super::event::{EventKind, InteractionType};
use super::{Inner, Tracker};
use serde_json::Map;
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Bookkeeping for one element that is currently in view.
pub(crate) struct ViewTimer {
    pub(crate) customer_id: Option<String>,
    pub(crate) policy_id: String,
    pub(crate) started_at: Instant,
    pub(crate) generation: u64,
    pub(crate) heartbeat: JoinHandle<()>,
}

impl ViewTimer {
    /// Whole seconds in view, rounded to nearest. Never decreases while active.
    pub(crate) fn elapsed_secs(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.started_at)
            .as_secs_f64()
            .round() as u64
    }

    pub(crate) fn view_event(&self, duration_secs: u64) -> EventKind {
        EventKind::PolicyInteraction {
            customer_id: self.customer_id.clone(),
            policy_id: self.policy_id.clone(),
            interaction: InteractionType::View,
            duration_secs: Some(duration_secs),
        }
    }
}

/// Handle for one observed element.
///
/// Dropping the handle (or calling [`ElementView::cleanup`]) cancels the
/// element's timer without reporting a final duration.
pub struct ElementView {
    tracker: Tracker,
    element_id: String,
    customer_id: Option<String>,
    policy_id: String,
    threshold: f64,
    released: bool,
}

impl Tracker {
    /// Starts observing an element that displays `policy_id`.
    ///
    /// `threshold` is the visible fraction that counts as "in view"; `None`
    /// uses the configured default.
    pub fn observe_element(
        &self,
        element_id: &str,
        customer_id: Option<&str>,
        policy_id: &str,
        threshold: Option<f64>,
    ) -> ElementView {
        let threshold = threshold
            .unwrap_or(self.inner.config.visibility_threshold)
            .clamp(0.0, 1.0);

        ElementView {
            tracker: self.clone(),
            element_id: element_id.to_string(),
            customer_id: customer_id.map(str::to_string),
            policy_id: policy_id.to_string(),
            threshold,
            released: false,
        }
    }
}

impl ElementView {
    pub fn element_id(&self) -> &str {
        &self.element_id
    }

    /// Reports the element's current visible fraction.
    pub fn on_intersection(&self, ratio: f64) {
        if ratio > 0.0 && ratio >= self.threshold {
            self.enter();
        } else {
            self.leave();
        }
    }

    /// Whether a view timer is running for this element.
    pub fn is_visible(&self) -> bool {
        self.tracker
            .inner
            .lock()
            .views
            .contains_key(&self.element_id)
    }

    /// Seconds the element has been in view, if it is.
    pub fn elapsed_secs(&self) -> Option<u64> {
        let state = self.tracker.inner.lock();
        state
            .views
            .get(&self.element_id)
            .map(|timer| timer.elapsed_secs(Instant::now()))
    }

    /// Stops observing. The running timer, if any, is discarded silently.
    pub fn cleanup(mut self) {
        self.release();
    }

    fn enter(&self) {
        let inner = &self.tracker.inner;
        let mut state = inner.lock();
        if !state.lifecycle.is_active() || state.views.contains_key(&self.element_id) {
            return;
        }

        state.view_generation += 1;
        let generation = state.view_generation;
        let heartbeat = spawn_heartbeat(
            std::sync::Arc::downgrade(inner),
            self.element_id.clone(),
            generation,
            inner.config.heartbeat_interval,
        );
        let timer = ViewTimer {
            customer_id: self.customer_id.clone(),
            policy_id: self.policy_id.clone(),
            started_at: Instant::now(),
            generation,
            heartbeat,
        };
        let kind = timer.view_event(0);
        state.views.insert(self.element_id.clone(), timer);

        tracing::debug!(element_id = %self.element_id, policy_id = %self.policy_id, "Element entered view");
        inner.emit_locked(&state, kind, Map::new());
    }

    fn leave(&self) {
        let inner = &self.tracker.inner;
        let mut state = inner.lock();
        let Some(timer) = state.views.remove(&self.element_id) else {
            return;
        };

        timer.heartbeat.abort();
        let duration = timer.elapsed_secs(Instant::now());
        tracing::debug!(
            element_id = %self.element_id,
            duration_secs = duration,
            "Element left view"
        );
        inner.emit_locked(&state, timer.view_event(duration), Map::new());
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let mut state = self.tracker.inner.lock();
        if let Some(timer) = state.views.remove(&self.element_id) {
            timer.heartbeat.abort();
        }
    }
}

impl Drop for ElementView {
    fn drop(&mut self) {
        self.release();
    }
}

// An aborted task may already be waiting on the state lock when a new timer
// for the same element is inserted; the generation keeps it from reporting.
fn spawn_heartbeat(
    inner: Weak<Inner>,
    element_id: String,
    generation: u64,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        loop {
            ticker.tick().await;
            let Some(inner) = inner.upgrade() else {
                break;
            };

            let state = inner.lock();
            let Some(timer) = state
                .views
                .get(&element_id)
                .filter(|timer| timer.generation == generation)
            else {
                break;
            };
            let duration = timer.elapsed_secs(Instant::now());
            tracing::trace!(element_id = %element_id, duration_secs = duration, "View heartbeat");
            inner.emit_locked(&state, timer.view_event(duration), Map::new());
        }
    })
}
