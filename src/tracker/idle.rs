//! Idle detection.
//!
//! Input events only refresh a timestamp; the decision to report idleness is
//! made by a periodic check so that the input path stays cheap.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;

/// Global input kinds that count as user activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    PointerMove,
    KeyPress,
    Scroll,
    Click,
    Touch,
}

/// Whether a long idle stretch is reported once or on every check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdlePolicy {
    /// One event per idle stretch; re-armed by the next input.
    #[default]
    Once,
    /// One event on every check while idleness persists.
    EveryCheck,
}

impl FromStr for IdlePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "once" => Ok(Self::Once),
            "every_check" | "repeat" => Ok(Self::EveryCheck),
            other => Err(format!("unknown idle policy: {other}")),
        }
    }
}

/// Last-activity bookkeeping for one session.
#[derive(Debug, Clone)]
pub struct IdleDetector {
    threshold: Duration,
    policy: IdlePolicy,
    last_active: Instant,
    reported: bool,
}

impl IdleDetector {
    pub fn new(threshold: Duration, policy: IdlePolicy, now: Instant) -> Self {
        Self {
            threshold,
            policy,
            last_active: now,
            reported: false,
        }
    }

    /// Refreshes the last-active instant.
    pub fn record_activity(&mut self, _kind: ActivityKind, now: Instant) {
        self.last_active = now;
        self.reported = false;
    }

    /// Time since the last recorded input.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_active)
    }

    /// Runs one periodic check.
    ///
    /// Returns the idle duration when an idle event should be emitted.
    pub fn check(&mut self, now: Instant) -> Option<Duration> {
        let idle = self.idle_for(now);
        if idle < self.threshold {
            return None;
        }

        match self.policy {
            IdlePolicy::Once if self.reported => None,
            _ => {
                self.reported = true;
                Some(idle)
            }
        }
    }
}
