use std::f64::consts::{PI, SQRT_2};

use num_complex::Complex;

use super::{
    error::SpectrumError,
    window::{FlatTop, Window},
};

/// Number of leading samples that hold a whole number of cycles of `freq`.
#[must_use]
pub fn whole_cycle_len(len: usize, sample_rate: f64, freq: f64) -> usize {
    let samples_per_cycle = sample_rate / freq;
    let cycles = (len as f64 / samples_per_cycle).floor();
    ((cycles * samples_per_cycle + 1e-9).floor() as usize).min(len)
}

/// Evaluates bin `k` of the `n`-point DFT of `x`.
#[must_use]
pub fn dft_bin(x: impl IntoIterator<Item = f64>, n: usize, k: usize) -> Complex<f64> {
    x.into_iter()
        .take(n)
        .enumerate()
        .map(|(i, v)| Complex::from_polar(v, -2.0 * PI * ((k * i) % n) as f64 / n as f64))
        .sum()
}

/// Extracts the RMS magnitude of `target_frequency` with a flat-top window.
///
/// See [`extract_bin_magnitude_with`].
pub fn extract_bin_magnitude(
    samples: &[f64],
    sample_rate: f64,
    target_frequency: f64,
) -> Result<f64, SpectrumError> {
    extract_bin_magnitude_with(samples, sample_rate, target_frequency, FlatTop)
}

/// Extracts the RMS magnitude of `target_frequency` from `samples`.
///
/// The capture is trimmed to a whole number of cycles of the target, windowed and
/// transformed. The bin nearest the target is normalised by the window sum and scaled by
/// √2, so a sine of RMS value `A` reads as `A`.
pub fn extract_bin_magnitude_with<W: Window>(
    samples: &[f64],
    sample_rate: f64,
    target_frequency: f64,
    window: W,
) -> Result<f64, SpectrumError> {
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(SpectrumError::InvalidSampleRate(sample_rate));
    }
    if !target_frequency.is_finite() || target_frequency <= 0.0 {
        return Err(SpectrumError::InvalidFrequency(target_frequency));
    }
    let nyquist = sample_rate / 2.0;
    if target_frequency >= nyquist {
        return Err(SpectrumError::AboveNyquist {
            freq: target_frequency,
            nyquist,
        });
    }

    let n = whole_cycle_len(samples.len(), sample_rate, target_frequency);
    if n < 2 {
        return Err(SpectrumError::TooShort { len: n });
    }

    let w = window.coefficients(n);
    let gain = w.iter().sum::<f64>();
    let resolution = sample_rate / n as f64;
    let k = (target_frequency / resolution).round() as usize;

    let bin = dft_bin(samples.iter().zip(w.iter()).map(|(x, w)| x * w), n, k);
    let magnitude = bin.norm() / gain * SQRT_2;

    tracing::trace!(
        "bin {} of {} ({:.3} Hz/bin) at {:.1} Hz: {:.6}",
        k,
        n,
        resolution,
        target_frequency,
        magnitude
    );

    Ok(magnitude)
}
