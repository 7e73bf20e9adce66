//! Typed result rows returned by a `WaveformDb`

use crate::model::MetadataValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One scan plus its metadata, as returned by the staging query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRow {
    pub sid: i64,
    pub scan_start_utc: DateTime<Utc>,
    pub scan_end_utc: DateTime<Utc>,
    /// Scan metadata by name; flattened into columns at the table boundary
    #[serde(flatten)]
    pub metadata: BTreeMap<String, MetadataValue>,
}

/// One named array of one waveform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformDataRow {
    pub sid: i64,
    pub wid: i64,
    pub cavity: String,
    pub signal_name: String,
    pub sample_rate_hz: f64,
    pub array_name: String,
    pub data: Vec<f64>,
}

/// One scalar metric of one waveform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformMetricRow {
    pub sid: i64,
    pub wid: i64,
    pub cavity: String,
    pub signal_name: String,
    pub sample_rate_hz: f64,
    pub metric_name: String,
    pub value: f64,
}
