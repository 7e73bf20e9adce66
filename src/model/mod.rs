//! Scan data model
//!
//! - `scan` - the in-memory aggregate (cavities, signals, analysis, metadata)
//! - `persist` - `Scan::insert_data`, the transactional multi-table write
//! - `metadata` - `MetadataValue` (one name, one type)
//! - `timestamp` - UTC normalization and the stored text format
//! - `document` - JSON scan documents for file ingest

pub mod document;
pub mod metadata;
mod persist;
pub mod scan;
pub mod timestamp;

pub use document::{CavityDocument, ScanDocument};
pub use metadata::MetadataValue;
pub use scan::{CavityData, Scan, SignalRecord, TIME_SIGNAL};
