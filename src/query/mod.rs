//! Staged retrieval of stored scans
//!
//! Two phases, so a caller can see how big a result will be before paying
//! for it:
//!
//! ```text
//! Query::new ──> stage()  : scan metadata only (cheap)   -> scan_meta
//!                  │         get_scan_count()
//!                  └─> run(): waveform arrays + metrics  -> wf_data, wf_meta
//! ```
//!
//! `run()` before `stage()` is a usage error. Re-staging replaces the staged
//! set and discards results of any earlier `run()`.

pub mod table;

pub use table::Table;

use crate::analysis::{frequency_range, validate_sampling_rate};
use crate::error::{QueryError, ValidationError};
use crate::model::timestamp::to_utc;
use crate::store::{QueryFilter, ScanRow, WaveformDataRow, WaveformDb, WaveformMetricRow};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashSet;

pub struct Query<'db, D: ?Sized> {
    db: &'db D,
    signal_names: Vec<String>,
    array_names: Option<Vec<String>>,
    begin: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    scan_filter: Option<QueryFilter>,
    wf_metric_names: Option<Vec<String>>,

    staged: bool,
    scan_meta: Option<Vec<ScanRow>>,
    wf_data: Option<Vec<WaveformDataRow>>,
    wf_meta: Option<Vec<WaveformMetricRow>>,
}

impl<'db, D: WaveformDb + ?Sized> Query<'db, D> {
    /// Query for the given signals (e.g. `GMES`, `PMES`). At least one is required.
    pub fn new<I, S>(db: &'db D, signal_names: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let signal_names: Vec<String> = signal_names.into_iter().map(Into::into).collect();
        if signal_names.is_empty() {
            return Err(QueryError::NoSignals);
        }

        Ok(Self {
            db,
            signal_names,
            array_names: None,
            begin: None,
            end: None,
            scan_filter: None,
            wf_metric_names: None,
            staged: false,
            scan_meta: None,
            wf_data: None,
            wf_meta: None,
        })
    }

    /// Restrict arrays to these names (`raw`, `power_spectrum`, ...)
    pub fn array_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.array_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Earliest scan start to include
    pub fn begin<Tz: TimeZone>(mut self, begin: DateTime<Tz>) -> Self {
        self.begin = Some(to_utc(&begin));
        self
    }

    /// Latest scan end to include
    pub fn end<Tz: TimeZone>(mut self, end: DateTime<Tz>) -> Self {
        self.end = Some(to_utc(&end));
        self
    }

    pub fn scan_filter(mut self, filter: QueryFilter) -> Self {
        self.scan_filter = Some(filter);
        self
    }

    /// Restrict waveform metrics to these names (`rms`, `dominant_frequency`, ...)
    pub fn wf_metric_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.wf_metric_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Fetch metadata for every scan matching the time window and filter.
    ///
    /// Returns the number of staged scans.
    pub fn stage(&mut self) -> Result<usize, QueryError> {
        let rows = self
            .db
            .query_scan_rows(self.begin, self.end, self.scan_filter.as_ref())?;
        let count = rows.len();

        self.scan_meta = Some(rows);
        self.wf_data = None;
        self.wf_meta = None;
        self.staged = true;

        log::info!("📋 Query staged: {} scans", count);
        Ok(count)
    }

    pub fn is_staged(&self) -> bool {
        self.staged
    }

    /// Number of scans in the most recent `stage()`
    pub fn get_scan_count(&self) -> Result<usize, QueryError> {
        self.scan_meta.as_ref().map(Vec::len).ok_or(QueryError::NotStaged)
    }

    /// Fetch waveform arrays and metrics for the staged scans.
    pub fn run(&mut self) -> Result<(), QueryError> {
        if !self.staged {
            return Err(QueryError::NotStaged);
        }

        let sids: Vec<i64> = self
            .scan_meta
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|r| r.sid)
            .collect();

        if sids.is_empty() {
            self.wf_data = Some(Vec::new());
            self.wf_meta = Some(Vec::new());
            log::info!("Query run: no staged scans, nothing to fetch");
            return Ok(());
        }

        let staged: HashSet<i64> = sids.iter().copied().collect();

        let data = self.db.query_waveform_data(
            &sids,
            &self.signal_names,
            self.array_names.as_deref(),
        )?;
        let data = retain_staged(data, &staged, |r| r.sid, "waveform data");

        let meta = self.db.query_waveform_metadata(
            &sids,
            &self.signal_names,
            self.wf_metric_names.as_deref(),
        )?;
        let meta = retain_staged(meta, &staged, |r| r.sid, "waveform metadata");

        log::info!(
            "✅ Query run: {} arrays, {} metrics across {} scans",
            data.len(),
            meta.len(),
            sids.len()
        );

        self.wf_data = Some(data);
        self.wf_meta = Some(meta);
        Ok(())
    }

    pub fn scan_meta(&self) -> Option<&[ScanRow]> {
        self.scan_meta.as_deref()
    }

    pub fn wf_data(&self) -> Option<&[WaveformDataRow]> {
        self.wf_data.as_deref()
    }

    pub fn wf_meta(&self) -> Option<&[WaveformMetricRow]> {
        self.wf_meta.as_deref()
    }

    pub fn scan_meta_table(&self) -> Result<Table, QueryError> {
        let rows = self.scan_meta().ok_or(QueryError::NotStaged)?;
        Ok(Table::from_records(rows)?)
    }

    pub fn wf_data_table(&self) -> Result<Table, QueryError> {
        let rows = self.run_results(self.wf_data())?;
        Ok(Table::from_records(rows)?)
    }

    pub fn wf_meta_table(&self) -> Result<Table, QueryError> {
        let rows = self.run_results(self.wf_meta())?;
        Ok(Table::from_records(rows)?)
    }

    fn run_results<'a, T>(&self, rows: Option<&'a [T]>) -> Result<&'a [T], QueryError> {
        match (self.staged, rows) {
            (false, _) => Err(QueryError::NotStaged),
            (true, None) => Err(QueryError::NotRun),
            (true, Some(rows)) => Ok(rows),
        }
    }
}

/// Frequency axis of a stored `power_spectrum` array.
///
/// Same axis the analyzer uses: `n_samples/2 + 1` bins from 0 Hz to Nyquist.
pub fn get_frequency_range(fs: f64, n_samples: usize) -> Result<Vec<f64>, ValidationError> {
    validate_sampling_rate(fs)?;
    if n_samples == 0 {
        return Err(ValidationError::EmptyWaveform);
    }
    Ok(frequency_range(fs, n_samples))
}

fn retain_staged<T>(
    rows: Vec<T>,
    staged: &HashSet<i64>,
    sid: impl Fn(&T) -> i64,
    what: &str,
) -> Vec<T> {
    let total = rows.len();
    let kept: Vec<T> = rows.into_iter().filter(|r| staged.contains(&sid(r))).collect();
    if kept.len() != total {
        log::warn!(
            "Dropped {} {} rows outside the staged scan set",
            total - kept.len(),
            what
        );
    }
    kept
}
