use std::time::Duration;

use super::report::AuxReadings;

/// A closed interval of accepted values.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Band {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

impl Band {
    /// Creates a band from `min` to `max`.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Returns `true` if `value` is finite and inside the band.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && self.min <= value && value <= self.max
    }
}

/// Optional limits of the quantities sampled at the centre of a tap sweep.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AuxLimits {
    /// DUT supply voltage.
    pub vdut: Option<Band>,
    /// DUT supply current.
    pub idut: Option<Band>,
    /// DUT 5 V rail.
    pub tx_5v: Option<Band>,
    /// DUT 3.3 V rail.
    pub tx_3v3: Option<Band>,
}

impl AuxLimits {
    /// Returns `true` if no limit is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.vdut.is_none() && self.idut.is_none() && self.tx_5v.is_none() && self.tx_3v3.is_none()
    }

    /// Checks `readings` against every limit that is set.
    ///
    /// Missing readings only pass when no limit is set.
    #[must_use]
    pub fn check(&self, readings: Option<&AuxReadings>) -> bool {
        let Some(r) = readings else {
            return self.is_empty();
        };
        [
            (self.vdut, r.vdut),
            (self.idut, r.idut),
            (self.tx_5v, r.tx_5v),
            (self.tx_3v3, r.tx_3v3),
        ]
        .into_iter()
        .all(|(band, value)| band.map_or(true, |b| b.contains(value as f64)))
    }
}

/// A tap of the transmitter coil.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TapConfig {
    /// Name used in the report.
    pub name: String,
    /// Relay mask that inserts the tap.
    pub mask: u32,
    /// Centre of the sweep.
    pub center_hz: f64,
    /// Accepted inductance of the tap in henries.
    pub inductance_band: Band,
    /// Limits of the quantities sampled at the sweep centre.
    #[cfg_attr(feature = "serde", serde(default))]
    pub aux_limits: AuxLimits,
}

impl TapConfig {
    /// Creates a tap without auxiliary limits.
    #[must_use]
    pub fn new(name: impl Into<String>, mask: u32, center_hz: f64, inductance_band: Band) -> Self {
        Self {
            name: name.into(),
            mask,
            center_hz,
            inductance_band,
            aux_limits: AuxLimits::default(),
        }
    }

    /// Sets the limits of the quantities sampled at the sweep centre.
    #[must_use]
    pub fn with_aux_limits(mut self, aux_limits: AuxLimits) -> Self {
        self.aux_limits = aux_limits;
        self
    }
}

/// The waveform channel analysed at each sweep point.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CaptureOption {
    /// Channel of the high-speed capture carrying the tank current.
    pub channel: usize,
    /// Per-channel sample rate of the high-speed capture.
    pub sample_rate: f64,
}

impl Default for CaptureOption {
    fn default() -> Self {
        Self {
            channel: 0,
            sample_rate: 1e6,
        }
    }
}

/// The option of [`Tuner`].
///
/// [`Tuner`]: super::Tuner
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TunerOption {
    /// Centre of the baseline sweep.
    pub probe_hz: f64,
    /// Offsets from the sweep centre visited by every sweep.
    pub offsets: Vec<f64>,
    /// Fixed inductance of the coil in henries.
    pub l_fixed: f64,
    /// Accepted tank capacitance in farads.
    pub capacitance_band: Band,
    /// Delay after every frequency or configuration change.
    pub settle: Duration,
    /// Captured channel and sample rate.
    pub capture: CaptureOption,
    /// Attempts of each capture.
    pub capture_attempts: usize,
    /// Clock of the DUT PWM timer.
    pub pwm_clock_hz: f64,
    /// Taps swept after a passing baseline, in order.
    pub taps: Vec<TapConfig>,
}

impl Default for TunerOption {
    fn default() -> Self {
        Self {
            probe_hz: 72_666.,
            offsets: vec![-2000., -1000., 0., 1000., 2000.],
            l_fixed: 47e-6,
            capacitance_band: Band::new(90e-9, 110e-9),
            settle: Duration::from_millis(50),
            capture: CaptureOption::default(),
            capture_attempts: 1,
            pwm_clock_hz: 64e6,
            taps: Vec::new(),
        }
    }
}
