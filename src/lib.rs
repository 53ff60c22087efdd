//! PolicyTrack - client companion for the policy marketing site.
//!
//! The crate bundles the interaction tracker (sessions, view timers, idle
//! detection, fire-and-forget event delivery), a typed client for the
//! policy/cart/analytics API, the local state store and the promotion
//! filter model used by the admin console.

pub mod api;
pub mod cli;
pub mod config;
pub mod promotion;
pub mod store;
pub mod tracker;

pub use api::{ApiClient, ApiError};
pub use config::Settings;
pub use store::{CartService, LocalStore, StoreError};
pub use tracker::{Tracker, TrackerConfig, TrackerError};
