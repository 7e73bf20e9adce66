//! Power spectral density estimate
//!
//! One-sided periodogram: boxcar window, constant (mean) detrend, density
//! scaling. Bin `k` corresponds to `frequency_range(fs, n)[k]`.

use rustfft::{num_complex::Complex64, FftPlanner};

/// Frequency axis of a one-sided spectrum of `n_samples` points taken at `fs` Hz.
///
/// Includes both the zero and the Nyquist bin, so the length is `n_samples/2 + 1`.
pub fn frequency_range(fs: f64, n_samples: usize) -> Vec<f64> {
    (0..=n_samples / 2)
        .map(|i| i as f64 * fs / n_samples as f64)
        .collect()
}

/// Periodogram of `samples` in units of power per Hz.
pub fn periodogram(samples: &[f64], fs: f64) -> Vec<f64> {
    let n = samples.len();
    if n == 0 {
        return Vec::new();
    }

    let mean = samples.iter().sum::<f64>() / n as f64;
    let mut buffer: Vec<Complex64> = samples
        .iter()
        .map(|&x| Complex64::new(x - mean, 0.0))
        .collect();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    let scale = 1.0 / (fs * n as f64);
    let nyquist = if n % 2 == 0 { Some(n / 2) } else { None };

    buffer[..=n / 2]
        .iter()
        .enumerate()
        .map(|(k, bin)| {
            let power = bin.norm_sqr() * scale;
            // Fold negative frequencies onto the positive half
            if k == 0 || Some(k) == nyquist {
                power
            } else {
                power * 2.0
            }
        })
        .collect()
}

/// Frequency of the first bin holding the maximum power.
///
/// `psd` and `frequencies` come from the same `n`, so they have equal, non-zero length.
pub(crate) fn dominant_frequency(psd: &[f64], frequencies: &[f64]) -> f64 {
    debug_assert!(!psd.is_empty() && psd.len() == frequencies.len());
    let mut max_idx = 0;
    let mut max_power = f64::NEG_INFINITY;

    for (i, &power) in psd.iter().enumerate() {
        if power > max_power {
            max_power = power;
            max_idx = i;
        }
    }

    frequencies[max_idx]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_frequency_range_endpoints() {
        let f = frequency_range(5000.0, 8192);
        assert_eq!(f.len(), 4097);
        assert_eq!(f[0], 0.0);
        assert_eq!(f[4096], 2500.0);
    }

    #[test]
    fn test_frequency_range_odd_length() {
        let f = frequency_range(10.0, 5);
        assert_eq!(f, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_periodogram_length_matches_axis() {
        let x: Vec<f64> = (0..64).map(|i| (i as f64).sin()).collect();
        assert_eq!(periodogram(&x, 100.0).len(), frequency_range(100.0, 64).len());
    }

    #[test]
    fn test_periodogram_detrends_constant_offset() {
        let psd = periodogram(&[4.0; 32], 8.0);
        assert!(psd.iter().all(|p| p.abs() < 1e-20));
    }

    #[test]
    fn test_sinusoid_peak_and_parseval() {
        let n = 256;
        let fs = 256.0;
        let bin = 32; // 32 Hz exactly on a bin
        let x: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * bin as f64 * i as f64 / n as f64).sin())
            .collect();

        let psd = periodogram(&x, fs);
        let freqs = frequency_range(fs, n);
        assert_eq!(dominant_frequency(&psd, &freqs), 32.0);

        // Integrated density equals the signal variance (0.5 for a unit sine)
        let df = fs / n as f64;
        let total: f64 = psd.iter().sum::<f64>() * df;
        assert!((total - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_dominant_frequency_first_max_wins() {
        let freqs = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(dominant_frequency(&[0.0, 5.0, 5.0, 1.0], &freqs), 1.0);
    }
}
