use resotune_core::{link::LinkError, spectrum::SpectrumError};
use resotune_driver::error::DriverError;
use thiserror::Error;

/// An error produced while tuning.
#[derive(Error, Debug, PartialEq, Clone)]
#[non_exhaustive]
pub enum TuneError {
    /// A device exchange failed.
    #[error("{0}")]
    Driver(#[from] DriverError),
    /// The spectral analysis rejected a capture.
    #[error("{0}")]
    Spectrum(#[from] SpectrumError),
    /// A link could not be opened.
    #[error("{0}")]
    Link(#[from] LinkError),
    /// The configured capture channel is not present in the waveform.
    #[error("Capture has no channel {0}")]
    NoSuchChannel(usize),
    /// A sweep frequency cannot be realised by the PWM timer.
    #[error("Frequency {0} Hz cannot be realised by the PWM timer")]
    FrequencyOutOfRange(f64),
}

impl TuneError {
    /// Returns `true` if a device did not answer in time.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Driver(e) => e.is_timeout(),
            Self::Link(e) => e.is_timeout(),
            _ => false,
        }
    }
}
