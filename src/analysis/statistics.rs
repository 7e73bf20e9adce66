//! Descriptive statistics over a single real-valued waveform

/// Summary statistics for a block of samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub minimum: f64,
    pub maximum: f64,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation (divides by N)
    pub standard_deviation: f64,
    pub rms: f64,
    pub q25: f64,
    pub q75: f64,
}

impl Summary {
    /// Compute statistics for `samples`.
    ///
    /// Callers guarantee a non-empty slice of finite values; the analyzer
    /// validates before getting here.
    pub(crate) fn compute(samples: &[f64]) -> Self {
        debug_assert!(!samples.is_empty());
        let n = samples.len() as f64;

        let mut minimum = f64::INFINITY;
        let mut maximum = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;

        for &x in samples {
            minimum = minimum.min(x);
            maximum = maximum.max(x);
            sum += x;
            sum_sq += x * x;
        }

        let mean = sum / n;
        let variance = samples.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n;

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        Self {
            minimum,
            maximum,
            mean,
            median: percentile(&sorted, 50.0),
            standard_deviation: variance.sqrt(),
            rms: (sum_sq / n).sqrt(),
            q25: percentile(&sorted, 25.0),
            q75: percentile(&sorted, 75.0),
        }
    }
}

/// Percentile of an ascending-sorted slice using linear interpolation
/// between the two closest ranks (rank = q/100 * (N - 1)).
pub(crate) fn percentile(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let rank = (q / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
