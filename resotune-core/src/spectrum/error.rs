use thiserror::Error;

/// An error produced by the spectral analysis.
#[derive(Error, Debug, PartialEq, Clone)]
#[non_exhaustive]
pub enum SpectrumError {
    /// Fewer than two samples remain after trimming to whole cycles.
    #[error("Only {len} samples remain after trimming to whole cycles, at least 2 are required")]
    TooShort {
        /// Trimmed length.
        len: usize,
    },
    /// Sample rate is not a positive finite number.
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f64),
    /// Target frequency is not a positive finite number.
    #[error("Invalid target frequency: {0}")]
    InvalidFrequency(f64),
    /// Target frequency is not below half the sample rate.
    #[error("Target frequency ({freq}) must be below the Nyquist frequency ({nyquist})")]
    AboveNyquist {
        /// Target frequency.
        freq: f64,
        /// Half of the sample rate.
        nyquist: f64,
    },
}
