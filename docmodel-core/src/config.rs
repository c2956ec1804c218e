//! Store connection settings.
//!
//! [`StoreConfig`] can be deserialized from any serde source or read from the
//! environment with [`StoreConfig::from_env`]:
//!
//! | Variable                              | Field                        |
//! |---------------------------------------|------------------------------|
//! | `MONGODB_CONNECTION_URI`              | `uri` (required)             |
//! | `MONGODB_DEFAULT_DATABASE`            | `default_database`           |
//! | `MONGODB_SERVER_SELECTION_TIMEOUT_MS` | `server_selection_timeout_ms`|

use serde::{Deserialize, Serialize};
use std::{env, time::Duration};

use crate::error::{DocumentStoreError, DocumentStoreResult};

pub const CONNECTION_URI_VAR: &str = "MONGODB_CONNECTION_URI";
pub const DEFAULT_DATABASE_VAR: &str = "MONGODB_DEFAULT_DATABASE";
pub const SERVER_SELECTION_TIMEOUT_VAR: &str = "MONGODB_SERVER_SELECTION_TIMEOUT_MS";

/// Server selection budget used when none is configured.
pub const DEFAULT_SERVER_SELECTION_TIMEOUT_MS: u64 = 5000;

fn default_server_selection_timeout_ms() -> u64 {
    DEFAULT_SERVER_SELECTION_TIMEOUT_MS
}

/// Connection settings of a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Connection string, e.g. `mongodb://localhost:27017`.
    pub uri: String,
    /// Database used by models that do not name one.
    #[serde(default)]
    pub default_database: Option<String>,
    /// How long to wait for a usable server before failing an operation.
    #[serde(default = "default_server_selection_timeout_ms")]
    pub server_selection_timeout_ms: u64,
}

impl StoreConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            default_database: None,
            server_selection_timeout_ms: DEFAULT_SERVER_SELECTION_TIMEOUT_MS,
        }
    }

    pub fn default_database(mut self, database: impl Into<String>) -> Self {
        self.default_database = Some(database.into());
        self
    }

    pub fn server_selection_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.server_selection_timeout_ms = timeout_ms;
        self
    }

    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_millis(self.server_selection_timeout_ms)
    }

    /// Reads the settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Initialization`] if the connection URI is missing
    /// or the timeout is not a number.
    pub fn from_env() -> DocumentStoreResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DocumentStoreResult<Self> {
        let uri = lookup(CONNECTION_URI_VAR)
            .filter(|uri| !uri.is_empty())
            .ok_or_else(|| DocumentStoreError::Initialization(format!("{CONNECTION_URI_VAR} is not set")))?;

        let mut config = Self::new(uri);
        config.default_database = lookup(DEFAULT_DATABASE_VAR).filter(|name| !name.is_empty());

        if let Some(timeout) = lookup(SERVER_SELECTION_TIMEOUT_VAR) {
            config.server_selection_timeout_ms = timeout.trim().parse().map_err(|_| {
                DocumentStoreError::Initialization(format!(
                    "{SERVER_SELECTION_TIMEOUT_VAR} is not a number: {timeout}"
                ))
            })?;
        }

        Ok(config)
    }
}
