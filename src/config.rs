//! Runtime settings.
//!
//! Compiled defaults, overlaid by the store's `config` table, overlaid by
//! `POLICYTRACK_API_URL`. Unparseable stored values are logged and skipped.

use crate::api::{ApiClient, ApiError, DEFAULT_BASE_URL};
use crate::store::{LocalStore, StoreError};
use crate::tracker::{IdlePolicy, TrackerConfig};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable overriding the API base URL.
pub const API_URL_ENV: &str = "POLICYTRACK_API_URL";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub tracker: TrackerConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            tracker: TrackerConfig::default(),
        }
    }
}

impl Settings {
    /// Loads settings from the store and the process environment.
    pub fn load(store: &LocalStore) -> Result<Self, StoreError> {
        let mut settings = Self::default();
        for (key, value, _) in store.get_all_config()? {
            settings.apply(&key, &value);
        }
        settings.apply_env(|name| std::env::var(name).ok());
        Ok(settings)
    }

    /// Builds an API client from these settings.
    pub fn api_client(&self) -> Result<ApiClient, ApiError> {
        ApiClient::new(&self.api_base_url, self.request_timeout)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_URL_ENV).filter(|u| !u.trim().is_empty()) {
            tracing::debug!(%url, "API URL overridden from environment");
            self.api_base_url = url.trim().to_string();
        }
    }

    /// Applies one `config` row. Unknown keys are ignored.
    fn apply(&mut self, key: &str, value: &str) {
        let tracker = &mut self.tracker;
        match key {
            "api_base_url" => {
                if !value.trim().is_empty() {
                    self.api_base_url = value.trim().to_string();
                }
            }
            "request_timeout_secs" => set_secs(&mut self.request_timeout, key, value),
            "tracker_queue_capacity" => {
                if let Some(n) = parse::<usize>(key, value).filter(|n| *n > 0) {
                    tracker.queue_capacity = n;
                }
            }
            "heartbeat_interval_secs" => set_secs(&mut tracker.heartbeat_interval, key, value),
            "idle_threshold_secs" => set_secs(&mut tracker.idle_threshold, key, value),
            "idle_check_interval_secs" => set_secs(&mut tracker.idle_check_interval, key, value),
            "idle_policy" => {
                if let Some(policy) = parse::<IdlePolicy>(key, value) {
                    tracker.idle_policy = policy;
                }
            }
            "visibility_threshold" => {
                if let Some(t) = parse::<f64>(key, value).filter(|t| t.is_finite()) {
                    tracker.visibility_threshold = t.clamp(0.0, 1.0);
                }
            }
            _ => {}
        }
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Option<T> {
    match value.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value, "Ignoring invalid config value");
            None
        }
    }
}

// Zero-length periods would spin the timer tasks.
fn set_secs(target: &mut Duration, key: &str, value: &str) {
    if let Some(secs) = parse::<u64>(key, value).filter(|s| *s > 0) {
        *target = Duration::from_secs(secs);
    }
}
