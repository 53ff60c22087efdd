//! SQLite-backed client state.
//!
//! Holds the small JSON documents the site keeps client-side (cart mirror,
//! promotion presets, active customer) in a `kv` table, plus the `config`
//! table that settings are read from. There is no schema versioning for the
//! stored JSON; a shape change needs a manual migration of existing values.

use super::StoreError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Local cart mirror: array of `{policy_id, policy_name, premium}`.
pub const CART_KEY: &str = "cart";

/// Saved promotion filter presets.
pub const PRESETS_KEY: &str = "policy_promotion_presets";

/// Identifier of the customer the site is acting for.
pub const CUSTOMER_ID_KEY: &str = "customerId";

/// Default `config` rows: key, value, description.
pub const DEFAULT_CONFIG: [(&str, &str, &str); 8] = [
    ("api_base_url", "http://localhost:5000", "Base URL of the policy API"),
    ("request_timeout_secs", "10", "HTTP request timeout (seconds)"),
    ("tracker_queue_capacity", "256", "Tracking events buffered before dropping"),
    ("heartbeat_interval_secs", "5", "View heartbeat interval (seconds)"),
    ("idle_threshold_secs", "300", "Idle detection threshold (seconds)"),
    ("idle_check_interval_secs", "300", "How often idleness is checked (seconds)"),
    ("idle_policy", "once", "Report idleness 'once' per stretch or on 'every_check'"),
    ("visibility_threshold", "0.5", "Visible fraction that counts as a view"),
];

/// Thread-safe handle to the local state database.
pub struct LocalStore {
    conn: Mutex<Connection>,
}

impl LocalStore {
    /// Opens or creates the store at the default location.
    ///
    /// Creates `<data dir>/policytrack/state.db` if it doesn't exist.
    pub fn open() -> Result<Self, StoreError> {
        Self::open_at(&Self::default_path())
    }

    /// Opens or creates the store at `path`.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        tracing::info!(path = ?path, "Opening local store");

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Opens a throwaway in-memory store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Returns the default database path.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("policytrack")
            .join("state.db")
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(conn) => conn,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock();

        conn.execute_batch(
            r#"
            -- JSON documents keyed like the site's local storage
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Configuration settings
            CREATE TABLE IF NOT EXISTS config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                description TEXT,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;

        // Seed default config if empty
        let config_count: i64 = conn.query_row("SELECT COUNT(*) FROM config", [], |r| r.get(0))?;
        if config_count == 0 {
            let now = Utc::now().to_rfc3339();
            for (key, value, description) in DEFAULT_CONFIG {
                conn.execute(
                    "INSERT INTO config (key, value, description, updated_at) VALUES (?1, ?2, ?3, ?4)",
                    params![key, value, description, &now],
                )?;
            }
            tracing::info!("Added {} default config settings", DEFAULT_CONFIG.len());
        }

        tracing::debug!("Local store schema initialized");
        Ok(())
    }

    // === Key/Value Methods ===

    /// Gets the raw JSON text stored under `key`.
    pub fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock();
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Stores raw JSON text under `key`.
    pub fn set_raw(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.lock();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, &now],
        )?;
        Ok(())
    }

    /// Deserializes the value under `key`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get_raw(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| StoreError::Decode {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Serializes `value` under `key`.
    pub fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value).map_err(|source| StoreError::Decode {
            key: key.to_string(),
            source,
        })?;
        self.set_raw(key, &raw)
    }

    /// Removes `key`. Returns true if something was removed.
    pub fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let conn = self.lock();
        let removed = conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    // === Customer ===

    /// The active customer, if one was selected.
    pub fn customer_id(&self) -> Result<Option<String>, StoreError> {
        self.get_json(CUSTOMER_ID_KEY)
    }

    pub fn set_customer_id(&self, customer_id: &str) -> Result<(), StoreError> {
        self.set_json(CUSTOMER_ID_KEY, customer_id)
    }

    // === Config Methods ===

    /// Gets a configuration value by key.
    pub fn get_config(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock();
        let value = conn
            .query_row(
                "SELECT value FROM config WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Sets a configuration value, creating the key if needed.
    pub fn set_config(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.lock();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO config (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, &now],
        )?;
        Ok(())
    }

    /// Gets all config settings.
    pub fn get_all_config(&self) -> Result<Vec<(String, String, Option<String>)>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT key, value, description FROM config ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
