//! The `Scan` aggregate: one capture event across one or more cavities

use super::metadata::{validate_entry, MetadataValue};
use super::timestamp::to_utc;
use crate::analysis::{
    analyze_signal, validate_sampling_rate, DerivedArrays, ScalarMetrics, SignalAnalysis,
};
use crate::error::ValidationError;
use crate::store::ScanRow;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// Signal name carrying the sample time axis. Kept, never analyzed or persisted.
pub const TIME_SIGNAL: &str = "Time";

/// Raw samples of one signal plus the analysis computed when it was added
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRecord {
    raw: Vec<f64>,
    analysis: SignalAnalysis,
}

impl SignalRecord {
    pub fn raw(&self) -> &[f64] {
        &self.raw
    }

    pub fn analysis(&self) -> &SignalAnalysis {
        &self.analysis
    }
}

/// All signals captured for one cavity, sharing a single sampling rate
#[derive(Debug, Clone, PartialEq)]
pub struct CavityData {
    sampling_rate: f64,
    time: Option<Vec<f64>>,
    signals: BTreeMap<String, SignalRecord>,
}

impl CavityData {
    /// Validate and analyze every signal. Nothing is kept unless all succeed.
    fn build<I, K>(data: I, sampling_rate: f64) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (K, Vec<f64>)>,
        K: Into<String>,
    {
        validate_sampling_rate(sampling_rate)?;

        let mut time = None;
        let mut signals = BTreeMap::new();

        for (name, raw) in data {
            let name = name.into();
            if name == TIME_SIGNAL {
                time = Some(raw);
                continue;
            }

            let analysis = analyze_signal(&raw, sampling_rate)?;
            log::debug!(
                "analyzed {}: rms={:.4} dominant={:.2} Hz",
                name,
                analysis.scalars.rms,
                analysis.scalars.dominant_frequency
            );
            signals.insert(name, SignalRecord { raw, analysis });
        }

        Ok(Self {
            sampling_rate,
            time,
            signals,
        })
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn time(&self) -> Option<&[f64]> {
        self.time.as_deref()
    }

    /// Analyzed signals, `Time` excluded
    pub fn signals(&self) -> &BTreeMap<String, SignalRecord> {
        &self.signals
    }
}

/// Raw and derived data for one scan, plus scan-level metadata.
///
/// `id` is `None` until `insert_data` commits; it is assigned exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct Scan {
    pub(crate) id: Option<i64>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    pub(crate) cavities: BTreeMap<String, CavityData>,
    pub(crate) metadata: BTreeMap<String, MetadataValue>,
}

impl Scan {
    /// New, unpersisted scan. Timestamps are normalized to UTC here.
    pub fn new<Tz: TimeZone>(start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self {
            id: None,
            start: to_utc(&start),
            end: to_utc(&end),
            cavities: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Scan header (id, extent, metadata) from a stored row. Carries no waveforms.
    pub fn from_row(row: &ScanRow) -> Self {
        Self {
            id: Some(row.sid),
            start: row.scan_start_utc,
            end: row.scan_end_utc,
            cavities: BTreeMap::new(),
            metadata: row.metadata.clone(),
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Merge numeric and textual scan metadata.
    ///
    /// A name present in both inputs, a reserved column name or a non-finite
    /// number is rejected and nothing is applied. Names from earlier calls are overwritten, including a change of type.
    pub fn add_scan_data<F, S, KF, KS, V>(
        &mut self,
        float_data: F,
        str_data: S,
    ) -> Result<(), ValidationError>
    where
        F: IntoIterator<Item = (KF, f64)>,
        S: IntoIterator<Item = (KS, V)>,
        KF: Into<String>,
        KS: Into<String>,
        V: Into<String>,
    {
        let floats: Vec<(String, f64)> = float_data
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect();
        let strs: Vec<(String, String)> = str_data
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let float_keys: BTreeSet<&str> = floats.iter().map(|(k, _)| k.as_str()).collect();
        if let Some((dup, _)) = strs.iter().find(|(k, _)| float_keys.contains(k.as_str())) {
            return Err(ValidationError::DuplicateMetadataKey(dup.clone()));
        }

        let entries: Vec<(String, MetadataValue)> = floats
            .into_iter()
            .map(|(k, v)| (k, MetadataValue::Float(v)))
            .chain(strs.into_iter().map(|(k, v)| (k, MetadataValue::Text(v))))
            .collect();
        for (k, v) in &entries {
            validate_entry(k, v)?;
        }

        self.metadata.extend(entries);
        Ok(())
    }

    /// Insert or overwrite a single metadata entry
    pub fn add_metadata(
        &mut self,
        name: impl Into<String>,
        value: impl Into<MetadataValue>,
    ) -> Result<(), ValidationError> {
        let name = name.into();
        let value = value.into();
        validate_entry(&name, &value)?;
        self.metadata.insert(name, value);
        Ok(())
    }

    /// Store and analyze the signals of one cavity.
    ///
    /// Every non-`Time` signal is analyzed immediately. On success the cavity
    /// fully replaces any earlier data under the same name (no merge); on
    /// failure the scan is left as it was.
    pub fn add_cavity_data<I, K>(
        &mut self,
        cavity: impl Into<String>,
        data: I,
        sampling_rate: f64,
    ) -> Result<(), ValidationError>
    where
        I: IntoIterator<Item = (K, Vec<f64>)>,
        K: Into<String>,
    {
        let cavity = cavity.into();
        let built = CavityData::build(data, sampling_rate)?;

        log::debug!(
            "cavity {}: {} signals at {} Hz",
            cavity,
            built.signals.len(),
            sampling_rate
        );

        if self.cavities.insert(cavity.clone(), built).is_some() {
            log::debug!("cavity {} replaced prior data", cavity);
        }

        Ok(())
    }

    pub fn cavities(&self) -> &BTreeMap<String, CavityData> {
        &self.cavities
    }

    pub fn cavity(&self, name: &str) -> Option<&CavityData> {
        self.cavities.get(name)
    }

    /// cavity -> signal -> raw samples, `Time` included when supplied
    pub fn waveform_data(&self) -> BTreeMap<&str, BTreeMap<&str, &[f64]>> {
        self.cavities
            .iter()
            .map(|(cav, data)| {
                let mut signals: BTreeMap<&str, &[f64]> = data
                    .signals
                    .iter()
                    .map(|(name, rec)| (name.as_str(), rec.raw.as_slice()))
                    .collect();
                if let Some(time) = data.time() {
                    signals.insert(TIME_SIGNAL, time);
                }
                (cav.as_str(), signals)
            })
            .collect()
    }

    pub fn sampling_rate(&self, cavity: &str) -> Option<f64> {
        self.cavities.get(cavity).map(|c| c.sampling_rate)
    }

    pub fn analysis_scalar(&self, cavity: &str, signal: &str) -> Option<&ScalarMetrics> {
        self.signal(cavity, signal).map(|r| &r.analysis.scalars)
    }

    pub fn analysis_array(&self, cavity: &str, signal: &str) -> Option<&DerivedArrays> {
        self.signal(cavity, signal).map(|r| &r.analysis.arrays)
    }

    fn signal(&self, cavity: &str, signal: &str) -> Option<&SignalRecord> {
        self.cavities.get(cavity)?.signals.get(signal)
    }

    /// Number of waveform rows `insert_data` will write
    pub fn waveform_count(&self) -> usize {
        self.cavities.values().map(|c| c.signals.len()).sum()
    }

    pub fn metadata(&self) -> &BTreeMap<String, MetadataValue> {
        &self.metadata
    }

    /// Numeric metadata view (`scan_fdata`)
    pub fn scan_data_float(&self) -> BTreeMap<&str, f64> {
        self.metadata
            .iter()
            .filter_map(|(k, v)| v.as_f64().map(|f| (k.as_str(), f)))
            .collect()
    }

    /// Textual metadata view (`scan_sdata`)
    pub fn scan_data_str(&self) -> BTreeMap<&str, &str> {
        self.metadata
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.as_str(), s)))
            .collect()
    }
}
