//! rfscope - RF-cavity waveform scan ingestion and staged retrieval
//!
//! ```text
//! Scan::add_cavity_data ──> analysis (stats + periodogram)
//!          │
//!          └─ Scan::insert_data ──> SQLite (one transaction per scan)
//!                                     │
//!                     Query::stage ───┘──> scan metadata
//!                     Query::run ────────> waveform arrays + metrics
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod model;
pub mod query;
pub mod store;

pub use config::DbConfig;
pub use error::{DocumentError, QueryError, StoreError, ValidationError};
pub use model::{MetadataValue, Scan, ScanDocument};
pub use query::{get_frequency_range, Query, Table};
pub use store::{QueryFilter, SqliteWaveformDb, WaveformDb};
