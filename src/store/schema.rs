//! Schema bootstrap and connection setup
//!
//! The SQL lives in `/sql/*.sql` and is embedded at build time. Every file
//! uses `IF NOT EXISTS`, so applying it to an existing database is a no-op.

use crate::config::DbConfig;
use crate::error::StoreError;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// Schema files in execution order
const SCHEMA_FILES: [(&str, &str); 4] = [
    ("01_scan.sql", include_str!("../../sql/01_scan.sql")),
    ("02_waveform.sql", include_str!("../../sql/02_waveform.sql")),
    ("03_waveform_data.sql", include_str!("../../sql/03_waveform_data.sql")),
    ("04_scan_data.sql", include_str!("../../sql/04_scan_data.sql")),
];

/// Create all six tables and their indexes (idempotent)
pub fn apply_schema(conn: &Connection) -> Result<(), StoreError> {
    log::debug!("🔧 Applying scan schema");

    for (name, sql) in SCHEMA_FILES {
        log::debug!("   ├─ Executing: {}", name);
        conn.execute_batch(sql)?;
    }

    Ok(())
}

/// Per-connection settings. Foreign keys are always enforced.
pub fn apply_pragmas(conn: &Connection, config: &DbConfig) -> Result<(), StoreError> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;

    if config.wal {
        // journal_mode answers with the resulting mode ("memory" for in-memory dbs)
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        log::debug!("📊 journal_mode={}", mode);
    }

    Ok(())
}

/// Open (creating if needed) the database described by `config`, ready for use
pub fn open_database(config: &DbConfig) -> Result<Connection, StoreError> {
    let path = Path::new(&config.db_path);

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(path)?;
    apply_pragmas(&conn, config)?;
    apply_schema(&conn)?;

    log::info!("✅ Scan database ready: {}", config.db_path);
    Ok(conn)
}

/// Fresh in-memory database with the schema applied
pub fn open_in_memory() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory()?;
    conn.pragma_update(None, "foreign_keys", true)?;
    apply_schema(&conn)?;
    Ok(conn)
}
