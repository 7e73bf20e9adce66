//! Database configuration from environment variables

use std::env;

/// Connection settings for the scan database
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct DbConfig {
    /// Path to SQLite database file
    pub db_path: String,

    /// How long a writer waits on a locked database, in milliseconds
    pub busy_timeout_ms: u64,

    /// Use WAL journal mode (ignored for in-memory databases)
    pub wal: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            db_path: "data/rfscope.db".to_string(),
            busy_timeout_ms: 5_000,
            wal: true,
        }
    }
}

impl DbConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `RFSCOPE_DB_PATH` (default: data/rfscope.db)
    /// - `RFSCOPE_BUSY_TIMEOUT_MS` (default: 5000)
    /// - `RFSCOPE_WAL` (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            db_path: env::var("RFSCOPE_DB_PATH").unwrap_or(defaults.db_path),

            busy_timeout_ms: env::var("RFSCOPE_BUSY_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.busy_timeout_ms),

            wal: env::var("RFSCOPE_WAL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.wal),
        }
    }

    /// Same as `from_env` but with an explicit database path taking priority
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            db_path: path.into(),
            ..Self::from_env()
        }
    }
}
