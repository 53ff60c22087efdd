//! Local client-side state.
//!
//! A small SQLite database stands in for the site's browser storage: the
//! cart mirror, promotion presets and the active customer id live here,
//! alongside the settings table read by [`crate::config::Settings`].

pub mod cart;
pub mod local_store;

pub use cart::CartService;
pub use local_store::*;

use crate::api::ApiError;

/// Errors from the local store and the services built on it.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored value could not be (de)serialized.
    #[error("bad value under '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Api(#[from] ApiError),
}
