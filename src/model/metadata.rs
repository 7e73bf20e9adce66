//! Scan-level metadata values
//!
//! A metadata name maps to exactly one value, which is either numeric
//! (`scan_fdata`) or textual (`scan_sdata`, typically an enum readback).

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Names taken by the fixed scan columns; metadata is flattened next to them
pub const RESERVED_NAMES: [&str; 3] = ["sid", "scan_start_utc", "scan_end_utc"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Float(f64),
    Text(String),
}

impl MetadataValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(v) => Some(*v),
            MetadataValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Float(_) => None,
            MetadataValue::Text(s) => Some(s),
        }
    }
}

/// Check one entry before it is accepted into a scan
pub(crate) fn validate_entry(name: &str, value: &MetadataValue) -> Result<(), ValidationError> {
    if RESERVED_NAMES.contains(&name) {
        return Err(ValidationError::ReservedMetadataName(name.to_string()));
    }
    if let MetadataValue::Float(v) = value {
        if !v.is_finite() {
            return Err(ValidationError::NonFiniteMetadata {
                name: name.to_string(),
                value: *v,
            });
        }
    }
    Ok(())
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Float(v)
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Text(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Text(s)
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Float(v) => write!(f, "{}", v),
            MetadataValue::Text(s) => write!(f, "{}", s),
        }
    }
}
