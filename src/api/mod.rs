//! Client for the external policy/cart/analytics API.
//!
//! The server owns recommendation, search, cart persistence and analytics
//! aggregation; this module only speaks its JSON-over-HTTP contract.

pub mod client;
pub mod types;

pub use client::{ApiClient, DEFAULT_BASE_URL};
pub use types::*;

/// Errors from API calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Connection, timeout or body decoding failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
}

impl ApiError {
    /// HTTP status for server-side rejections.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
        }
    }
}
