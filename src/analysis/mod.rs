//! Signal Analyzer
//!
//! Turns one fixed-length waveform plus its sampling rate into a bundle of
//! scalar metrics and derived arrays.
//!
//! ```text
//! samples (8192) ──┬─> Summary (min/max/mean/median/std/rms/quartiles)
//!                  └─> periodogram ──> power_spectrum, dominant_frequency
//! ```
//!
//! Pure: no shared state, no I/O. Every call plans its own FFT.

pub mod input;
pub mod spectrum;
pub mod statistics;

pub use input::samples_from_json;
pub use spectrum::{frequency_range, periodogram};
pub use statistics::Summary;

use crate::error::ValidationError;
use spectrum::dominant_frequency;
use serde::{Deserialize, Serialize};

/// Number of samples every analyzed waveform must have
pub const WAVEFORM_LEN: usize = 8192;

/// Array name reserved for the untouched waveform in storage
pub const RAW_ARRAY: &str = "raw";

/// Scalar metrics for one waveform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalarMetrics {
    pub minimum: f64,
    pub maximum: f64,
    pub peak_to_peak: f64,
    pub mean: f64,
    pub median: f64,
    pub standard_deviation: f64,
    pub rms: f64,
    #[serde(rename = "25th_quartile")]
    pub q25: f64,
    #[serde(rename = "75th_quartile")]
    pub q75: f64,
    pub dominant_frequency: f64,
}

impl ScalarMetrics {
    /// Metric names as persisted in `waveform_sdata.name`
    pub const NAMES: [&'static str; 10] = [
        "minimum",
        "maximum",
        "peak_to_peak",
        "mean",
        "median",
        "standard_deviation",
        "rms",
        "25th_quartile",
        "75th_quartile",
        "dominant_frequency",
    ];

    /// (name, value) pairs in `NAMES` order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        let values = [
            self.minimum,
            self.maximum,
            self.peak_to_peak,
            self.mean,
            self.median,
            self.standard_deviation,
            self.rms,
            self.q25,
            self.q75,
            self.dominant_frequency,
        ];
        Self::NAMES.into_iter().zip(values)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }
}

/// Derived arrays for one waveform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedArrays {
    /// One-sided PSD, indexed by `frequency_range(fs, WAVEFORM_LEN)`
    pub power_spectrum: Vec<f64>,
}

impl DerivedArrays {
    pub const NAMES: [&'static str; 1] = ["power_spectrum"];

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &[f64])> {
        Self::NAMES
            .into_iter()
            .zip([self.power_spectrum.as_slice()])
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.iter().find(|(n, _)| *n == name).map(|(_, a)| a)
    }
}

/// Everything the analyzer produces for one waveform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalAnalysis {
    pub scalars: ScalarMetrics,
    pub arrays: DerivedArrays,
}

/// Reject anything that is not a usable sampling rate
pub fn validate_sampling_rate(sampling_rate: f64) -> Result<(), ValidationError> {
    if sampling_rate.is_finite() && sampling_rate > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidSamplingRate(sampling_rate))
    }
}

/// Analyze one waveform sampled at `sampling_rate` Hz.
///
/// # Errors
/// - `WrongLength` unless exactly `WAVEFORM_LEN` samples are given
/// - `NonNumeric` for NaN or infinite samples
/// - `InvalidSamplingRate` for a non-positive or non-finite rate
/// - `NonFiniteAnalysis` when finite samples are large enough to overflow a metric
pub fn analyze_signal(samples: &[f64], sampling_rate: f64) -> Result<SignalAnalysis, ValidationError> {
    validate_sampling_rate(sampling_rate)?;

    if let Some(index) = samples.iter().position(|x| !x.is_finite()) {
        return Err(ValidationError::NonNumeric { index });
    }

    if samples.len() != WAVEFORM_LEN {
        return Err(ValidationError::WrongLength {
            expected: WAVEFORM_LEN,
            actual: samples.len(),
        });
    }

    let summary = Summary::compute(samples);
    let power_spectrum = periodogram(samples, sampling_rate);
    let frequencies = frequency_range(sampling_rate, samples.len());

    let scalars = ScalarMetrics {
        minimum: summary.minimum,
        maximum: summary.maximum,
        peak_to_peak: summary.maximum - summary.minimum,
        mean: summary.mean,
        median: summary.median,
        standard_deviation: summary.standard_deviation,
        rms: summary.rms,
        q25: summary.q25,
        q75: summary.q75,
        dominant_frequency: dominant_frequency(&power_spectrum, &frequencies),
    };

    if let Some((name, _)) = scalars.iter().find(|(_, v)| !v.is_finite()) {
        return Err(ValidationError::NonFiniteAnalysis(name));
    }
    let arrays = DerivedArrays { power_spectrum };
    if let Some((name, _)) = arrays.iter().find(|(_, a)| a.iter().any(|v| !v.is_finite())) {
        return Err(ValidationError::NonFiniteAnalysis(name));
    }

    Ok(SignalAnalysis { scalars, arrays })
}
