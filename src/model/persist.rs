//! Transactional write of a `Scan` across the six-table schema
//!
//! Tables written (see `/sql/`):
//! - `scan` - one row, generated `sid`
//! - `waveform` - one row per (cavity, non-Time signal), generated `wid`
//! - `waveform_adata` - `raw` + one row per derived array, JSON payload
//! - `waveform_sdata` - one row per scalar metric
//! - `scan_fdata` / `scan_sdata` - scan metadata, skipped when empty
//!
//! All statements run inside one `rusqlite::Transaction`. Dropping it without
//! `commit()` rolls everything back, so every early return via `?` leaves the
//! database exactly as it was.

use super::metadata::MetadataValue;
use super::scan::{Scan, SignalRecord};
use super::timestamp::format_db;
use crate::analysis::RAW_ARRAY;
use crate::error::StoreError;
use rusqlite::{params, Connection};

impl Scan {
    /// Write this scan and everything it owns, atomically.
    ///
    /// Returns the new scan id, which is also recorded on `self`. On any error
    /// nothing is committed and `self.id()` stays `None`; the caller may retry.
    pub fn insert_data(&mut self, conn: &mut Connection) -> Result<i64, StoreError> {
        if let Some(sid) = self.id {
            return Err(StoreError::AlreadyPersisted { sid });
        }

        let tx = conn.transaction()?;

        let sid = self.write_rows(&tx).inspect_err(|e| {
            log::warn!("⚠️  Scan insert failed, rolling back: {}", e);
        })?;

        tx.commit()?;
        self.id = Some(sid);

        log::info!(
            "✅ Scan sid={} committed: {} waveforms, {} metadata entries",
            sid,
            self.waveform_count(),
            self.metadata.len()
        );

        Ok(sid)
    }

    fn write_rows(&self, conn: &Connection) -> Result<i64, StoreError> {
        conn.execute(
            "INSERT INTO scan (scan_start_utc, scan_end_utc) VALUES (?1, ?2)",
            params![format_db(&self.start()), format_db(&self.end())],
        )?;
        let sid = conn.last_insert_rowid();

        for (cavity, data) in &self.cavities {
            for (signal_name, record) in data.signals() {
                conn.execute(
                    "INSERT INTO waveform (sid, cavity, signal_name, sample_rate_hz)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![sid, cavity, signal_name, data.sampling_rate()],
                )?;
                let wid = conn.last_insert_rowid();

                insert_waveform_adata(conn, wid, record)?;
                insert_waveform_sdata(conn, wid, record)?;

                log::debug!("   ├─ waveform wid={} {}/{}", wid, cavity, signal_name);
            }
        }

        insert_scan_metadata(conn, sid, &self.metadata)?;

        Ok(sid)
    }
}

/// `raw` first, then each derived array
fn insert_waveform_adata(
    conn: &Connection,
    wid: i64,
    record: &SignalRecord,
) -> Result<(), StoreError> {
    let mut stmt =
        conn.prepare_cached("INSERT INTO waveform_adata (wid, name, data) VALUES (?1, ?2, ?3)")?;

    stmt.execute(params![wid, RAW_ARRAY, serde_json::to_string(record.raw())?])?;
    for (name, array) in record.analysis().arrays.iter() {
        stmt.execute(params![wid, name, serde_json::to_string(array)?])?;
    }

    Ok(())
}

fn insert_waveform_sdata(
    conn: &Connection,
    wid: i64,
    record: &SignalRecord,
) -> Result<(), StoreError> {
    let mut stmt =
        conn.prepare_cached("INSERT INTO waveform_sdata (wid, name, value) VALUES (?1, ?2, ?3)")?;

    for (name, value) in record.analysis().scalars.iter() {
        stmt.execute(params![wid, name, value])?;
    }

    Ok(())
}

/// Split metadata into `scan_fdata` and `scan_sdata`. An empty side issues no statement.
fn insert_scan_metadata(
    conn: &Connection,
    sid: i64,
    metadata: &std::collections::BTreeMap<String, MetadataValue>,
) -> Result<(), StoreError> {
    let floats: Vec<(&str, f64)> = metadata
        .iter()
        .filter_map(|(k, v)| v.as_f64().map(|f| (k.as_str(), f)))
        .collect();
    let texts: Vec<(&str, &str)> = metadata
        .iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.as_str(), s)))
        .collect();

    if !floats.is_empty() {
        let mut stmt =
            conn.prepare_cached("INSERT INTO scan_fdata (sid, name, value) VALUES (?1, ?2, ?3)")?;
        for (name, value) in floats {
            stmt.execute(params![sid, name, value])?;
        }
    }

    if !texts.is_empty() {
        let mut stmt =
            conn.prepare_cached("INSERT INTO scan_sdata (sid, name, value) VALUES (?1, ?2, ?3)")?;
        for (name, value) in texts {
            stmt.execute(params![sid, name, value])?;
        }
    }

    Ok(())
}
