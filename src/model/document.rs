//! JSON scan documents, the on-disk ingest format
//!
//! ```json
//! {
//!   "start": "2024-02-01T10:00:00-05:00",
//!   "end": "2024-02-01T10:00:05-05:00",
//!   "cavities": {
//!     "1L22-1": { "sampling_rate": 5000.0, "signals": { "GMES": [..], "Time": [..] } }
//!   },
//!   "metadata": { "cryomodule_temp_K": 2.05, "mode": "CW" }
//! }
//! ```

use super::{MetadataValue, Scan};
use crate::analysis::samples_from_json;
use crate::error::DocumentError;
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct CavityDocument {
    pub sampling_rate: f64,
    /// Kept untyped so every element goes through `samples_from_json`
    pub signals: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanDocument {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    #[serde(default)]
    pub cavities: BTreeMap<String, CavityDocument>,
    #[serde(default)]
    pub metadata: BTreeMap<String, MetadataValue>,
}

impl ScanDocument {
    pub fn from_json(text: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Build the in-memory scan, analyzing every signal.
    pub fn into_scan(self) -> Result<Scan, DocumentError> {
        let mut scan = Scan::new(self.start, self.end);

        for (name, value) in self.metadata {
            scan.add_metadata(name, value)?;
        }

        for (cavity, doc) in self.cavities {
            let mut signals = Vec::with_capacity(doc.signals.len());
            for (signal, value) in &doc.signals {
                let samples = samples_from_json(value).map_err(|source| DocumentError::Signal {
                    cavity: cavity.clone(),
                    signal: signal.clone(),
                    source,
                })?;
                signals.push((signal.clone(), samples));
            }
            scan.add_cavity_data(cavity, signals, doc.sampling_rate)?;
        }

        Ok(scan)
    }
}
