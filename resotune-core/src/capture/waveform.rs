use nalgebra::{DMatrix, RowDVector};

use super::error::CaptureError;

/// Number of interleaved channels in a high-speed capture.
pub const HS_CHANNELS: usize = 4;
/// Full-scale input voltage of the high-speed ADC.
pub const HS_FULL_SCALE: f64 = 3.3;
/// Largest code of the 12-bit high-speed ADC.
pub const HS_MAX_CODE: u16 = 4095;

/// Scaling applied to raw codes of a capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdcScale {
    /// Voltage at `max_code`.
    pub full_scale: f64,
    /// Largest code produced by the converter.
    pub max_code: u16,
}

impl AdcScale {
    /// Volts per code.
    #[must_use]
    pub fn volts_per_code(&self) -> f64 {
        self.full_scale / self.max_code as f64
    }

    /// Converts a voltage back to the nearest code, saturating at the converter range.
    #[must_use]
    pub fn to_code(&self, volts: f64) -> u16 {
        (volts / self.volts_per_code())
            .round()
            .clamp(0.0, self.max_code as f64) as u16
    }
}

impl Default for AdcScale {
    fn default() -> Self {
        Self {
            full_scale: HS_FULL_SCALE,
            max_code: HS_MAX_CODE,
        }
    }
}

/// A decoded multi-channel capture in volts.
///
/// Row `c` of the matrix is channel `c`, columns are successive sampling instants.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    data: DMatrix<f64>,
}

impl Waveform {
    /// Decodes a raw capture with the default 4-channel, 12-bit, 3.3 V layout.
    pub fn decode(raw: &[u8]) -> Result<Self, CaptureError> {
        Self::decode_with(raw, HS_CHANNELS, AdcScale::default())
    }

    /// Decodes a raw capture of little-endian `u16` codes interleaved across `channels`.
    pub fn decode_with(raw: &[u8], channels: usize, scale: AdcScale) -> Result<Self, CaptureError> {
        if channels == 0 {
            return Err(CaptureError::NoChannel);
        }
        if raw.len() % 2 != 0 {
            return Err(CaptureError::OddLength(raw.len()));
        }
        let num_samples = raw.len() / 2;
        if num_samples % channels != 0 {
            return Err(CaptureError::Malformed {
                samples: num_samples,
                channels,
            });
        }

        let k = scale.volts_per_code();
        let volts = raw
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]) as f64 * k)
            .collect::<Vec<_>>();

        // Column-major storage of a (channels × n) matrix is exactly the interleaved order.
        Ok(Self {
            data: DMatrix::from_vec(channels, num_samples / channels, volts),
        })
    }

    /// Builds a waveform from per-channel samples.
    ///
    /// All channels must have the same length.
    pub fn from_channels(channels: &[Vec<f64>]) -> Result<Self, CaptureError> {
        let Some(first) = channels.first() else {
            return Err(CaptureError::NoChannel);
        };
        if let Some(c) = channels.iter().find(|c| c.len() != first.len()) {
            return Err(CaptureError::Malformed {
                samples: c.len(),
                channels: channels.len(),
            });
        }
        Ok(Self {
            data: DMatrix::from_fn(channels.len(), first.len(), |r, c| channels[r][c]),
        })
    }

    /// Encodes the waveform back into interleaved codes.
    #[must_use]
    pub fn encode(&self, scale: AdcScale) -> Vec<u8> {
        self.data
            .iter()
            .flat_map(|&v| scale.to_code(v).to_le_bytes())
            .collect()
    }

    /// Number of channels.
    #[must_use]
    pub fn num_channels(&self) -> usize {
        self.data.nrows()
    }

    /// Number of samples in each channel.
    #[must_use]
    pub fn samples_per_channel(&self) -> usize {
        self.data.ncols()
    }

    /// Returns the samples of channel `idx`, or `None` if out of range.
    #[must_use]
    pub fn channel(&self, idx: usize) -> Option<Vec<f64>> {
        (idx < self.num_channels()).then(|| self.data.row(idx).iter().copied().collect())
    }

    /// Returns channel `idx` as a row vector.
    #[must_use]
    pub fn channel_vector(&self, idx: usize) -> Option<RowDVector<f64>> {
        (idx < self.num_channels()).then(|| self.data.row(idx).into_owned())
    }

    /// Returns the underlying `channels × samples` matrix.
    #[must_use]
    pub const fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }
}
