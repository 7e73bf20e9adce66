//! Error types
//!
//! Three families, matching where a failure can originate:
//! - `ValidationError` - caller handed in data that breaks an input contract
//! - `StoreError` - anything raised while talking to SQLite
//! - `QueryError` - staged-query sequencing plus wrapped store failures

use thiserror::Error;

/// Input contract violations. Raised synchronously at the offending call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("waveform input must be an array of numbers, got {found}")]
    NotASequence { found: &'static str },

    #[error("waveform input must contain only finite numeric values (element {index})")]
    NonNumeric { index: usize },

    #[error("waveform must have exactly {expected} samples, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("sampling rate must be a positive finite number of Hz, got {0}")]
    InvalidSamplingRate(f64),

    #[error("metadata name '{0}' may appear in either the float or the text data, not both")]
    DuplicateMetadataKey(String),

    #[error("metadata '{name}' must be a finite number, got {value}")]
    NonFiniteMetadata { name: String, value: f64 },

    #[error("metadata name '{0}' is reserved for a scan column")]
    ReservedMetadataName(String),

    #[error("analysis produced a non-finite {0}; sample magnitudes are out of range")]
    NonFiniteAnalysis(&'static str),

    #[error("frequency axis needs at least one sample")]
    EmptyWaveform,
}

/// Persistence failures. The underlying error is kept as the source.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("array payload encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("stored timestamp could not be parsed: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("scan already persisted with sid={sid}")]
    AlreadyPersisted { sid: i64 },
}

/// Failures from the staged query workflow.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query not staged; call stage() before run()")]
    NotStaged,

    #[error("query has not been run; call run() after stage()")]
    NotRun,

    #[error("query requires at least one signal name")]
    NoSignals,

    #[error("result table conversion failed: {0}")]
    Table(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures while loading a JSON scan document
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("could not read scan document: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed scan document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("cavity {cavity} signal {signal}: {source}")]
    Signal {
        cavity: String,
        signal: String,
        #[source]
        source: ValidationError,
    },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}
