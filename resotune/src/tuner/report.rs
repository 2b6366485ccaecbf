use std::fmt;

use itertools::Itertools;
use resotune_core::spectrum::PeakEstimate;

/// A point of a frequency sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPoint {
    /// PWM period applied by the DUT.
    pub period: u32,
    /// Frequency realised by `period`.
    pub frequency: f64,
    /// RMS magnitude of the captured channel at `frequency`.
    pub magnitude: f64,
}

/// Quantities sampled at the centre of a tap sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuxReadings {
    /// DUT supply voltage.
    pub vdut: f32,
    /// DUT supply current.
    pub idut: f32,
    /// DUT 5 V rail.
    pub tx_5v: f32,
    /// DUT 3.3 V rail.
    pub tx_3v3: f32,
}

/// Outcome of the baseline sweep with every tap shorted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BaselineResult {
    /// Frequency-ascending sweep.
    pub sweep: Vec<SweepPoint>,
    /// Resonance located in `sweep`.
    pub peak: PeakEstimate,
    /// Tank capacitance in farads.
    pub capacitance: Option<f64>,
    /// `true` if `capacitance` is inside the accepted band.
    pub passed: bool,
}

/// Outcome of a tap sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct TapResult {
    /// Name of the tap.
    pub name: String,
    /// Relay mask of the tap.
    pub mask: u32,
    /// Frequency-ascending sweep.
    pub sweep: Vec<SweepPoint>,
    /// Resonance located in `sweep`.
    pub peak: PeakEstimate,
    /// Inductance of the tap in henries.
    pub inductance: Option<f64>,
    /// Readings at the sweep centre, if the sweep visited it.
    pub aux: Option<AuxReadings>,
    /// `true` if `inductance` is inside the accepted band.
    pub inductance_ok: bool,
    /// `true` if `aux` satisfies the tap limits.
    pub aux_ok: bool,
}

impl TapResult {
    /// Returns `true` if both the inductance and the auxiliary readings pass.
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.inductance_ok && self.aux_ok
    }
}

/// State of a [`Tuner`](super::Tuner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TunerState {
    /// Next step sweeps with every tap shorted.
    #[default]
    Baseline,
    /// Next step sweeps the tap at this index.
    Tap(usize),
    /// Nothing left to do.
    Done,
}

/// Results collected by a [`Tuner`](super::Tuner).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Report {
    /// Baseline outcome; default until the baseline step has run.
    pub baseline: BaselineResult,
    /// Tap outcomes in sweep order.
    pub taps: Vec<TapResult>,
    /// State at the time the report was taken.
    pub state: TunerState,
}

impl Report {
    /// Returns `true` if the run is complete and the baseline and every tap passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.state == TunerState::Done
            && self.baseline.passed
            && self.taps.iter().all(TapResult::passed)
    }

    /// Names of the taps that were swept and failed.
    #[must_use]
    pub fn failed_taps(&self) -> Vec<&str> {
        self.taps
            .iter()
            .filter(|t| !t.passed())
            .map(|t| t.name.as_str())
            .collect()
    }
}

fn verdict(passed: bool) -> &'static str {
    if passed {
        "PASS"
    } else {
        "FAIL"
    }
}

fn or_dash(v: Option<f64>, scale: f64, precision: usize) -> String {
    v.map_or_else(|| "-".to_owned(), |v| format!("{:.*}", precision, v * scale))
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "baseline: f0 = {} Hz, C = {} nF [{}]",
            or_dash(self.baseline.peak.f0, 1., 1),
            or_dash(self.baseline.capacitance, 1e9, 3),
            verdict(self.baseline.passed)
        )?;
        self.taps.iter().try_for_each(|t| {
            writeln!(
                f,
                "{}: f0 = {} Hz, L = {} uH [{}]",
                t.name,
                or_dash(t.peak.f0, 1., 1),
                or_dash(t.inductance, 1e6, 3),
                verdict(t.passed())
            )
        })?;
        if self.failed_taps().is_empty() {
            write!(f, "result: {}", verdict(self.passed()))
        } else {
            write!(
                f,
                "result: {} (failed taps: {})",
                verdict(self.passed()),
                self.failed_taps().iter().join(", ")
            )
        }
    }
}
