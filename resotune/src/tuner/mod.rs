mod option;
mod report;

use std::f64::consts::PI;

use itertools::Itertools;
use resotune_core::{
    link::Link,
    sleep::{Sleeper, StdSleeper},
    spectrum::{estimate_peak, extract_bin_magnitude, PeakEstimate},
};
use resotune_driver::{retry::retry, role::ALL_TAPS_SHORTED};

use crate::{error::TuneError, fixture::Fixture};

pub use option::{AuxLimits, Band, CaptureOption, TapConfig, TunerOption};
pub use report::{AuxReadings, BaselineResult, Report, SweepPoint, TapResult, TunerState};

/// Capacitance resonating with `inductance` at `f0`.
#[must_use]
pub fn capacitance(f0: f64, inductance: f64) -> f64 {
    1. / ((2. * PI * f0).powi(2) * inductance)
}

/// Inductance that, in series with `l_fixed`, resonates with `capacitance` at `f0`.
#[must_use]
pub fn tap_inductance(f0: f64, capacitance: f64, l_fixed: f64) -> f64 {
    1. / ((2. * PI * f0).powi(2) * capacitance) - l_fixed
}

/// PWM period realising `freq` with a timer clocked at `clock_hz`.
pub fn pwm_period(clock_hz: f64, freq: f64) -> Result<u32, TuneError> {
    if !freq.is_finite() || freq <= 0. {
        return Err(TuneError::FrequencyOutOfRange(freq));
    }
    let period = (clock_hz / freq).round();
    if !(1.0..=u32::MAX as f64).contains(&period) {
        return Err(TuneError::FrequencyOutOfRange(freq));
    }
    Ok(period as u32)
}

enum Outcome {
    Baseline(BaselineResult),
    Tap(TapResult),
}

fn fit(sweep: &[SweepPoint]) -> PeakEstimate {
    let (frequencies, magnitudes): (Vec<_>, Vec<_>) =
        sweep.iter().map(|p| (p.frequency, p.magnitude)).unzip();
    estimate_peak(&frequencies, &magnitudes)
}

/// Resonance tuner of the transmitter coil.
///
/// The tuner first sweeps the coil with every tap shorted and derives the tank capacitance
/// from the resonance. If the capacitance is accepted, each configured tap is inserted in
/// turn and its inductance derived from the shifted resonance. Every sweep visits
/// [`TunerOption::offsets`] around its centre in ascending order, waiting
/// [`TunerOption::settle`] after each change of frequency or tap mask.
///
/// Whenever the tuner reaches [`TunerState::Done`] or a step fails, the taps are shorted
/// again.
pub struct Tuner<'a, LC: Link, LD: Link, S: Sleeper = StdSleeper> {
    fixture: &'a mut Fixture<LC, LD>,
    option: TunerOption,
    sleeper: S,
    report: Report,
}

impl<'a, LC: Link, LD: Link> Tuner<'a, LC, LD> {
    /// Creates a tuner that settles with [`StdSleeper`].
    #[must_use]
    pub fn new(fixture: &'a mut Fixture<LC, LD>, option: TunerOption) -> Self {
        Self::with_sleeper(fixture, option, StdSleeper)
    }
}

impl<'a, LC: Link, LD: Link, S: Sleeper> Tuner<'a, LC, LD, S> {
    /// Creates a tuner that settles with `sleeper`.
    #[must_use]
    pub fn with_sleeper(fixture: &'a mut Fixture<LC, LD>, option: TunerOption, sleeper: S) -> Self {
        Self {
            fixture,
            option,
            sleeper,
            report: Report::default(),
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> TunerState {
        self.report.state
    }

    /// Results collected so far.
    #[must_use]
    pub const fn report(&self) -> &Report {
        &self.report
    }

    /// The option of the tuner.
    #[must_use]
    pub const fn option(&self) -> &TunerOption {
        &self.option
    }

    /// The tuned fixture, for exchanges between steps.
    pub fn fixture_mut(&mut self) -> &mut Fixture<LC, LD> {
        &mut *self.fixture
    }

    /// Runs the step of the current state and returns the next state.
    ///
    /// On error the state is left unchanged, so the step can be repeated.
    pub fn step(&mut self) -> Result<TunerState, TuneError> {
        let r = self.step_impl();
        if r.is_err() {
            if let Err(e) = self.fixture.dut.select_taps(ALL_TAPS_SHORTED) {
                tracing::warn!("Failed to short taps after error: {}", e);
            }
        }
        r
    }

    /// Steps until [`TunerState::Done`] and returns the report.
    pub fn run(mut self) -> Result<Report, TuneError> {
        while self.step()? != TunerState::Done {}
        Ok(self.report)
    }

    /// Consumes the tuner and returns the results collected so far.
    #[must_use]
    pub fn into_report(self) -> Report {
        self.report
    }

    fn step_impl(&mut self) -> Result<TunerState, TuneError> {
        let (next, outcome) = match self.report.state {
            TunerState::Baseline => {
                let baseline = self.baseline()?;
                let next = if !baseline.passed {
                    tracing::warn!("Baseline failed, skipping taps");
                    TunerState::Done
                } else if self.option.taps.is_empty() {
                    TunerState::Done
                } else {
                    TunerState::Tap(0)
                };
                (next, Some(Outcome::Baseline(baseline)))
            }
            TunerState::Tap(i) => {
                let result = match self.option.taps.get(i).cloned() {
                    Some(tap) => Some(Outcome::Tap(self.tap(&tap)?)),
                    None => None,
                };
                let next = if i + 1 < self.option.taps.len() {
                    TunerState::Tap(i + 1)
                } else {
                    TunerState::Done
                };
                (next, result)
            }
            TunerState::Done => return Ok(TunerState::Done),
        };

        if next == TunerState::Done {
            self.fixture.dut.select_taps(ALL_TAPS_SHORTED)?;
        }

        // The report only changes once the step can no longer fail.
        match outcome {
            Some(Outcome::Baseline(baseline)) => self.report.baseline = baseline,
            Some(Outcome::Tap(result)) => self.report.taps.push(result),
            None => {}
        }
        self.report.state = next;
        if next == TunerState::Done {
            tracing::info!("Tuning done, passed: {}", self.report.passed());
        }
        Ok(next)
    }

    fn baseline(&mut self) -> Result<BaselineResult, TuneError> {
        tracing::info!("Baseline sweep around {} Hz", self.option.probe_hz);
        self.select_taps(ALL_TAPS_SHORTED)?;
        let (sweep, _) = self.sweep(self.option.probe_hz, false)?;

        let peak = fit(&sweep);
        let capacitance = peak.f0.map(|f0| capacitance(f0, self.option.l_fixed));
        let passed = capacitance.is_some_and(|c| self.option.capacitance_band.contains(c));
        match capacitance {
            Some(c) => tracing::info!("Baseline resonance {:?} Hz, C = {:e} F", peak.f0, c),
            None => tracing::warn!("No resonance found in baseline sweep"),
        }
        Ok(BaselineResult {
            sweep,
            peak,
            capacitance,
            passed,
        })
    }

    fn tap(&mut self, tap: &TapConfig) -> Result<TapResult, TuneError> {
        tracing::info!(
            "Sweeping {} (mask {:#b}) around {} Hz",
            tap.name,
            tap.mask,
            tap.center_hz
        );
        self.select_taps(tap.mask)?;
        let (sweep, aux) = self.sweep(tap.center_hz, true)?;

        let peak = fit(&sweep);
        let inductance = peak
            .f0
            .zip(self.report.baseline.capacitance)
            .map(|(f0, c)| tap_inductance(f0, c, self.option.l_fixed));
        let inductance_ok = inductance.is_some_and(|l| tap.inductance_band.contains(l));
        let aux_ok = tap.aux_limits.check(aux.as_ref());
        if !inductance_ok {
            tracing::warn!("{}: inductance {:?} H out of band", tap.name, inductance);
        }
        if !aux_ok {
            tracing::warn!("{}: auxiliary readings {:?} out of limits", tap.name, aux);
        }
        Ok(TapResult {
            name: tap.name.clone(),
            mask: tap.mask,
            sweep,
            peak,
            inductance,
            aux,
            inductance_ok,
            aux_ok,
        })
    }

    fn select_taps(&mut self, mask: u32) -> Result<(), TuneError> {
        let applied = self.fixture.dut.select_taps(mask)?;
        if applied != mask {
            tracing::warn!("DUT applied tap mask {:#b} instead of {:#b}", applied, mask);
        }
        self.settle();
        Ok(())
    }

    fn settle(&self) {
        tracing::debug!("Settling for {:?}", self.option.settle);
        self.sleeper.sleep(self.option.settle);
    }

    fn sweep(
        &mut self,
        center_hz: f64,
        sample_aux: bool,
    ) -> Result<(Vec<SweepPoint>, Option<AuxReadings>), TuneError> {
        let offsets = self
            .option
            .offsets
            .iter()
            .copied()
            .sorted_by(f64::total_cmp)
            .collect_vec();

        let mut aux = None;
        let mut sweep = Vec::with_capacity(offsets.len());
        for offset in offsets {
            let target = center_hz + offset;
            let period = pwm_period(self.option.pwm_clock_hz, target)?;
            let applied = self.fixture.dut.set_pwm_period(period)?;
            if applied == 0 {
                return Err(TuneError::FrequencyOutOfRange(target));
            }
            if applied != period {
                tracing::warn!("DUT applied PWM period {} instead of {}", applied, period);
            }
            let frequency = self.option.pwm_clock_hz / applied as f64;
            self.settle();

            if sample_aux && offset == 0. {
                aux = Some(self.aux()?);
            }
            let magnitude = self.magnitude(frequency)?;
            tracing::debug!("{:.1} Hz (period {}): {:e}", frequency, applied, magnitude);
            sweep.push(SweepPoint {
                period: applied,
                frequency,
                magnitude,
            });
        }
        Ok((sweep, aux))
    }

    fn magnitude(&mut self, frequency: f64) -> Result<f64, TuneError> {
        let CaptureOption {
            channel,
            sample_rate,
        } = self.option.capture;
        let coprocessor = &mut self.fixture.coprocessor;
        let waveform = retry(self.option.capture_attempts, || coprocessor.measure_adc_hs())?;
        let samples = waveform
            .channel(channel)
            .ok_or(TuneError::NoSuchChannel(channel))?;
        Ok(extract_bin_magnitude(&samples, sample_rate, frequency)?)
    }

    fn aux(&mut self) -> Result<AuxReadings, TuneError> {
        Ok(AuxReadings {
            vdut: self.fixture.coprocessor.measure_vdut()?,
            idut: self.fixture.coprocessor.measure_idut()?,
            tx_5v: self.fixture.measure_tx_5v()?,
            tx_3v3: self.fixture.measure_tx_3v3()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, time::Duration};

    use approx::assert_relative_eq;
    use resotune_emulator::{ResonantTank, SharedTank};

    use super::*;
    use crate::fixture::tests::{emulated, EmulatedFixture};

    #[derive(Default)]
    struct RecordingSleeper(RefCell<Vec<Duration>>);

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.0.borrow_mut().push(duration);
        }
    }

    fn taps() -> Vec<TapConfig> {
        vec![
            TapConfig::new("tap1", 0b001, 66_000., Band::new(9e-6, 11e-6)),
            TapConfig::new("tap2", 0b010, 60_000., Band::new(20e-6, 24e-6)),
            TapConfig::new("tap3", 0b100, 55_700., Band::new(30e-6, 36e-6)),
        ]
    }

    fn setup() -> anyhow::Result<(SharedTank, EmulatedFixture)> {
        let tank = ResonantTank::default().shared();
        let fixture = emulated(tank.clone())?;
        Ok((tank, fixture))
    }

    fn mask(tank: &SharedTank) -> u32 {
        tank.lock().unwrap().mask()
    }

    #[rstest::rstest]
    #[case(880, 64e6, 72_727.27)]
    #[case(881, 64e6, 72_666.)]
    #[case(1, 64e6, 64e6)]
    #[test]
    fn realisable_period(#[case] expect: u32, #[case] clock: f64, #[case] freq: f64) {
        assert_eq!(Ok(expect), pwm_period(clock, freq));
    }

    #[rstest::rstest]
    #[case(0.)]
    #[case(-1.)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    #[case(1e9)]
    #[case(1e-6)]
    #[test]
    fn unrealisable_period(#[case] freq: f64) {
        assert!(matches!(
            pwm_period(64e6, freq),
            Err(TuneError::FrequencyOutOfRange(_))
        ));
    }

    #[test]
    fn lc_conversions() {
        let c = capacitance(72_700., 47e-6);
        assert_relative_eq!(1.0197e-7, c, max_relative = 1e-4);

        let f_tap = 1. / (2. * PI * (57e-6 * c).sqrt());
        assert_relative_eq!(10e-6, tap_inductance(f_tap, c, 47e-6), max_relative = 1e-9);
        assert_relative_eq!(0., tap_inductance(72_700., c, 47e-6), epsilon = 1e-15);
    }

    #[test]
    fn baseline_locates_resonance() -> anyhow::Result<()> {
        let (tank, mut fixture) = setup()?;
        let sleeper = RecordingSleeper::default();
        let mut tuner = Tuner::with_sleeper(&mut fixture, TunerOption::default(), &sleeper);

        assert_eq!(TunerState::Baseline, tuner.state());
        assert_eq!(TunerState::Done, tuner.step()?);

        let baseline = &tuner.report().baseline;
        assert_eq!(5, baseline.sweep.len());
        assert!(baseline
            .sweep
            .windows(2)
            .all(|w| w[0].frequency < w[1].frequency));
        baseline.sweep.iter().for_each(|p| {
            assert_eq!(64e6 / p.period as f64, p.frequency);
        });
        assert_eq!(Some(2), baseline.peak.index);
        assert_relative_eq!(72_700., baseline.peak.f0.unwrap(), max_relative = 1e-3);
        assert_relative_eq!(
            tank.lock().unwrap().capacitance,
            baseline.capacitance.unwrap(),
            max_relative = 5e-3
        );
        assert!(baseline.passed);
        assert!(tuner.report().passed());

        assert_eq!(vec![Duration::from_millis(50); 6], *sleeper.0.borrow());
        assert_eq!(ALL_TAPS_SHORTED, mask(&tank));
        Ok(())
    }

    #[test]
    fn taps_are_swept_in_order() -> anyhow::Result<()> {
        let (tank, mut fixture) = setup()?;
        fixture.coprocessor_mut().set_vdut(5.0)?;

        let option = TunerOption {
            settle: Duration::ZERO,
            taps: taps(),
            ..Default::default()
        };
        let mut tuner = Tuner::new(&mut fixture, option);
        assert_eq!(TunerState::Tap(0), tuner.step()?);
        assert_eq!(TunerState::Tap(1), tuner.step()?);
        assert_eq!(0b001, mask(&tank));
        assert_eq!(TunerState::Tap(2), tuner.step()?);
        assert_eq!(TunerState::Done, tuner.step()?);
        assert_eq!(TunerState::Done, tuner.step()?);

        let report = tuner.into_report();
        assert!(report.passed());
        assert!(report.failed_taps().is_empty());
        report
            .taps
            .iter()
            .zip([10e-6, 22e-6, 33e-6])
            .for_each(|(tap, expect)| {
                assert_relative_eq!(expect, tap.inductance.unwrap(), max_relative = 2e-2);
                let aux = tap.aux.unwrap();
                approx::assert_abs_diff_eq!(5.0, aux.vdut);
                approx::assert_abs_diff_eq!(5.0, aux.tx_5v, epsilon = 1e-5);
                approx::assert_abs_diff_eq!(3.3, aux.tx_3v3, epsilon = 1e-5);
            });
        assert_eq!(ALL_TAPS_SHORTED, mask(&tank));
        Ok(())
    }

    #[test]
    fn out_of_band_tap_does_not_abort() -> anyhow::Result<()> {
        let (_tank, mut fixture) = setup()?;
        let mut taps = taps();
        taps[1].inductance_band = Band::new(30e-6, 36e-6);

        let report = Tuner::new(
            &mut fixture,
            TunerOption {
                settle: Duration::ZERO,
                taps,
                ..Default::default()
            },
        )
        .run()?;

        assert_eq!(TunerState::Done, report.state);
        assert_eq!(3, report.taps.len());
        assert_eq!(vec!["tap2"], report.failed_taps());
        assert!(!report.passed());
        Ok(())
    }

    #[test]
    fn failed_baseline_skips_taps() -> anyhow::Result<()> {
        let (_tank, mut fixture) = setup()?;
        let option = TunerOption {
            settle: Duration::ZERO,
            capacitance_band: Band::new(50e-9, 60e-9),
            taps: taps(),
            ..Default::default()
        };

        let mut tuner = Tuner::new(&mut fixture, option);
        assert_eq!(TunerState::Done, tuner.step()?);

        let report = tuner.into_report();
        assert!(report.baseline.capacitance.is_some());
        assert!(!report.baseline.passed);
        assert!(report.taps.is_empty());
        assert!(report.failed_taps().is_empty());
        assert!(!report.passed());
        Ok(())
    }

    #[test]
    fn aux_limits_fail_unpowered_dut() -> anyhow::Result<()> {
        let (_tank, mut fixture) = setup()?;
        let limits = AuxLimits {
            tx_5v: Some(Band::new(4.2, 5.2)),
            ..Default::default()
        };
        let option = TunerOption {
            settle: Duration::ZERO,
            taps: taps()
                .into_iter()
                .map(|t| t.with_aux_limits(limits))
                .collect(),
            ..Default::default()
        };

        let report = Tuner::new(&mut fixture, option).run()?;
        assert_eq!(vec!["tap1", "tap2", "tap3"], report.failed_taps());
        assert!(report.taps.iter().all(|t| t.inductance_ok && !t.aux_ok));
        Ok(())
    }

    #[test]
    fn centre_is_not_swept() -> anyhow::Result<()> {
        let (_tank, mut fixture) = setup()?;
        let option = TunerOption {
            settle: Duration::ZERO,
            offsets: vec![1000., -1000., -2000., 2000.],
            taps: taps().into_iter().take(1).collect(),
            ..Default::default()
        };

        let report = Tuner::new(&mut fixture, option).run()?;
        assert_eq!(4, report.baseline.sweep.len());
        assert!(report.baseline.sweep[0].frequency < report.baseline.sweep[1].frequency);
        assert_eq!(None, report.taps[0].aux);
        assert!(report.taps[0].aux_ok);
        Ok(())
    }

    #[test]
    fn missing_channel() -> anyhow::Result<()> {
        let (tank, mut fixture) = setup()?;
        let option = TunerOption {
            settle: Duration::ZERO,
            capture: CaptureOption {
                channel: 4,
                ..Default::default()
            },
            ..Default::default()
        };

        let mut tuner = Tuner::new(&mut fixture, option);
        assert_eq!(Err(TuneError::NoSuchChannel(4)), tuner.step());
        assert_eq!(TunerState::Baseline, tuner.state());
        assert_eq!(ALL_TAPS_SHORTED, mask(&tank));
        Ok(())
    }

    #[test]
    fn capture_timeout_shorts_taps() -> anyhow::Result<()> {
        let (tank, mut fixture) = setup()?;
        let option = TunerOption {
            settle: Duration::ZERO,
            capture_attempts: 2,
            taps: taps(),
            ..Default::default()
        };

        let mut tuner = Tuner::new(&mut fixture, option);
        assert_eq!(TunerState::Tap(0), tuner.step()?);

        tuner.fixture_mut().coprocessor_mut().link_mut().break_down();
        let err = tuner.step().unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(TunerState::Tap(0), tuner.state());
        assert_eq!(ALL_TAPS_SHORTED, mask(&tank));

        tuner.fixture_mut().coprocessor_mut().link_mut().repair();
        assert_eq!(TunerState::Tap(1), tuner.step()?);
        assert_eq!(1, tuner.report().taps.len());
        Ok(())
    }

    /// Fails the `fail_at`-th tap mask write with an I/O error.
    struct GlitchingRelays<L> {
        inner: L,
        writes: usize,
        fail_at: usize,
    }

    impl<L: Link> Link for GlitchingRelays<L> {
        fn close(&mut self) -> Result<(), resotune_core::link::LinkError> {
            self.inner.close()
        }

        fn send(&mut self, tx: &[u8]) -> Result<(), resotune_core::link::LinkError> {
            const SELECT_TAPS: u32 = 0x8000_0103;
            if tx.len() >= 4 && u32::from_le_bytes([tx[0], tx[1], tx[2], tx[3]]) == SELECT_TAPS {
                self.writes += 1;
                if self.writes == self.fail_at {
                    return Err(resotune_core::link::LinkError::Io(
                        "relay bus glitch".to_owned(),
                    ));
                }
            }
            self.inner.send(tx)
        }

        fn receive(&mut self, buf: &mut [u8]) -> Result<usize, resotune_core::link::LinkError> {
            self.inner.receive(buf)
        }

        fn discard_pending(&mut self) -> Result<(), resotune_core::link::LinkError> {
            self.inner.discard_pending()
        }

        fn is_open(&self) -> bool {
            self.inner.is_open()
        }
    }

    #[test]
    fn failed_reshort_does_not_record_tap_twice() -> anyhow::Result<()> {
        use resotune_driver::{device::Device, error::DriverError, option::DeviceOption};
        use resotune_emulator::{CoprocessorEmulator, DutEmulator, Emulated};

        let tank = ResonantTank::default().shared();
        let option = DeviceOption {
            timeout: Duration::from_millis(50),
        };
        let mut fixture = Fixture::new(
            Device::open(Emulated::new(CoprocessorEmulator::new(tank.clone())), option)?,
            Device::open(
                GlitchingRelays {
                    inner: Emulated::new(DutEmulator::new(tank.clone(), crate::fixture::tests::UID)),
                    writes: 0,
                    fail_at: 3,
                },
                option,
            )?,
        );

        let mut tuner = Tuner::new(
            &mut fixture,
            TunerOption {
                settle: Duration::ZERO,
                taps: taps().into_iter().take(1).collect(),
                ..Default::default()
            },
        );
        assert_eq!(TunerState::Tap(0), tuner.step()?);

        assert_eq!(
            Err(TuneError::Driver(DriverError::Link(
                resotune_core::link::LinkError::Io("relay bus glitch".to_owned())
            ))),
            tuner.step()
        );
        assert_eq!(TunerState::Tap(0), tuner.state());
        assert!(tuner.report().taps.is_empty());
        assert_eq!(ALL_TAPS_SHORTED, mask(&tank));

        assert_eq!(TunerState::Done, tuner.step()?);
        assert_eq!(
            vec!["tap1"],
            tuner
                .report()
                .taps
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
        );
        assert!(tuner.report().passed());
        Ok(())
    }
}
