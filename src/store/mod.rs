//! Persistence collaborator for the query side
//!
//! ## Schema
//!
//! Six tables (see `/sql/`):
//! - `scan(sid, scan_start_utc, scan_end_utc)`
//! - `waveform(wid, sid, cavity, signal_name, sample_rate_hz)`
//! - `waveform_adata(wid, name, data)` - JSON arrays, `raw` reserved
//! - `waveform_sdata(wid, name, value)`
//! - `scan_fdata(sid, name, value)` / `scan_sdata(sid, name, value)`
//!
//! ## Module Organization
//!
//! - `schema` - embedded DDL, pragmas, connection bootstrap
//! - `rows` - typed result rows
//! - `filter` - `QueryFilter` over scan metadata
//! - `sqlite` - `SqliteWaveformDb`, the rusqlite implementation

pub mod filter;
pub mod rows;
pub mod schema;
pub mod sqlite;

pub use filter::{Conjunction, FilterClause, FilterOp, QueryFilter};
pub use rows::{ScanRow, WaveformDataRow, WaveformMetricRow};
pub use schema::{apply_pragmas, apply_schema, open_database, open_in_memory};
pub use sqlite::SqliteWaveformDb;

use crate::error::StoreError;
use chrono::{DateTime, Utc};

/// Read access to stored scans and waveforms
///
/// `Query` depends only on this trait, so any store (or a test double) can
/// back a staged query.
pub trait WaveformDb {
    /// Scans with `scan_start_utc >= begin` and `scan_end_utc <= end` that
    /// satisfy `filter`, each carrying its metadata.
    fn query_scan_rows(
        &self,
        begin: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        filter: Option<&QueryFilter>,
    ) -> Result<Vec<ScanRow>, StoreError>;

    /// Array rows for the given scans and signals. `array_names: None` returns every array.
    fn query_waveform_data(
        &self,
        scan_ids: &[i64],
        signal_names: &[String],
        array_names: Option<&[String]>,
    ) -> Result<Vec<WaveformDataRow>, StoreError>;

    /// Scalar metric rows for the given scans and signals. `metric_names: None` returns every metric.
    fn query_waveform_metadata(
        &self,
        scan_ids: &[i64],
        signal_names: &[String],
        metric_names: Option<&[String]>,
    ) -> Result<Vec<WaveformMetricRow>, StoreError>;
}
