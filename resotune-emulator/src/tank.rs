use std::{
    f64::consts::{PI, SQRT_2},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use num_complex::Complex;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use resotune_core::capture::{AdcScale, HS_CHANNELS, HS_FULL_SCALE};

/// A [`ResonantTank`] shared between the DUT and the coprocessor emulators.
pub type SharedTank = Arc<Mutex<ResonantTank>>;

pub(crate) fn lock(tank: &SharedTank) -> MutexGuard<'_, ResonantTank> {
    tank.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Capacitance resonating with `inductance` at `f0`.
#[must_use]
pub fn capacitance_for(f0: f64, inductance: f64) -> f64 {
    1. / ((2. * PI * f0).powi(2) * inductance)
}

/// A series RLC tank driven by the DUT's PWM bridge.
///
/// The DUT sets the PWM period and the tap mask, and the coprocessor samples the tank current
/// through a sense amplifier biased at mid-scale.
#[derive(Debug, Clone)]
pub struct ResonantTank {
    /// Fixed inductance in henries.
    pub l_fixed: f64,
    /// Tank capacitance in farads.
    pub capacitance: f64,
    /// Series resistance in ohms.
    pub resistance: f64,
    /// Inductance inserted by each tap; bit `i` of the mask inserts `taps[i]`.
    pub taps: Vec<f64>,
    /// RMS voltage of the drive fundamental.
    pub drive_rms: f64,
    /// Current sense gain in volts per ampere.
    pub sense_gain: f64,
    /// PWM timer clock in hertz.
    pub pwm_clock_hz: f64,
    /// Bias of every high-speed channel in volts.
    pub offset: f64,
    /// Peak amplitude of uniform noise added to every sample, in volts.
    pub noise: f64,
    period: u32,
    mask: u32,
    rng: SmallRng,
}

impl Default for ResonantTank {
    fn default() -> Self {
        Self {
            l_fixed: 47e-6,
            capacitance: capacitance_for(72_700., 47e-6),
            resistance: 2.0,
            taps: vec![10e-6, 22e-6, 33e-6],
            drive_rms: 1.0,
            sense_gain: 1.0,
            pwm_clock_hz: 64e6,
            offset: HS_FULL_SCALE / 2.,
            noise: 0.,
            period: 0,
            mask: 0,
            rng: SmallRng::seed_from_u64(0),
        }
    }
}

impl ResonantTank {
    /// Wraps the tank for sharing between emulators.
    #[must_use]
    pub fn shared(self) -> SharedTank {
        Arc::new(Mutex::new(self))
    }

    /// Reseeds the noise generator.
    pub fn seed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
    }

    /// PWM period in timer ticks. `0` stops the drive.
    #[must_use]
    pub const fn period(&self) -> u32 {
        self.period
    }

    pub(crate) fn set_period(&mut self, period: u32) {
        self.period = period;
    }

    /// Tap relay mask.
    #[must_use]
    pub const fn mask(&self) -> u32 {
        self.mask
    }

    pub(crate) fn set_mask(&mut self, mask: u32) {
        self.mask = mask;
    }

    /// Total inductance with the current tap mask.
    #[must_use]
    pub fn inductance(&self) -> f64 {
        self.l_fixed
            + self
                .taps
                .iter()
                .enumerate()
                .filter(|(i, _)| self.mask & (1 << i) != 0)
                .map(|(_, l)| l)
                .sum::<f64>()
    }

    /// Resonance frequency with the current tap mask.
    #[must_use]
    pub fn resonance_hz(&self) -> f64 {
        1. / (2. * PI * (self.inductance() * self.capacitance).sqrt())
    }

    /// Drive frequency, or `None` if the drive is stopped.
    #[must_use]
    pub fn drive_hz(&self) -> Option<f64> {
        (self.period != 0).then(|| self.pwm_clock_hz / self.period as f64)
    }

    /// Tank current phasor (RMS) at `freq` with the current tap mask.
    #[must_use]
    pub fn current(&self, freq: f64) -> Complex<f64> {
        let w = 2. * PI * freq;
        let z = Complex::new(
            self.resistance,
            w * self.inductance() - 1. / (w * self.capacitance),
        );
        Complex::new(self.drive_rms, 0.) / z
    }

    /// Samples the high-speed channels and returns interleaved 12-bit little-endian codes.
    ///
    /// Channel 0 carries the sensed tank current, channel 1 half of the drive voltage, and
    /// channels 2 and 3 the bias only.
    pub fn capture(&mut self, samples_per_channel: usize, sample_rate: f64) -> Vec<u8> {
        let scale = AdcScale::default();
        let drive = self.drive_hz();
        let current = drive.map_or(Complex::new(0., 0.), |f| self.current(f));
        let w = drive.map_or(0., |f| 2. * PI * f);

        let mut raw = Vec::with_capacity(samples_per_channel * HS_CHANNELS * 2);
        (0..samples_per_channel).for_each(|i| {
            let t = i as f64 / sample_rate;
            let values = [
                self.sense_gain * current.norm() * SQRT_2 * (w * t + current.arg()).sin(),
                drive.map_or(0., |_| 0.5 * self.drive_rms * SQRT_2 * (w * t).sin()),
                0.,
                0.,
            ];
            values.into_iter().for_each(|v| {
                let noise = if self.noise > 0. {
                    self.rng.random_range(-self.noise..=self.noise)
                } else {
                    0.
                };
                raw.extend_from_slice(&scale.to_code(self.offset + v + noise).to_le_bytes());
            });
        });
        raw
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use resotune_core::capture::Waveform;

    use super::*;

    #[test]
    fn default_resonance() {
        let tank = ResonantTank::default();
        assert_relative_eq!(72_700., tank.resonance_hz(), max_relative = 1e-9);
        assert_relative_eq!(1.0197e-7, tank.capacitance, max_relative = 1e-4);
    }

    #[rstest::rstest]
    #[case(47e-6, 0b000)]
    #[case(57e-6, 0b001)]
    #[case(69e-6, 0b010)]
    #[case(80e-6, 0b100)]
    #[case(112e-6, 0b111)]
    #[case(47e-6, 0b1000)]
    #[test]
    fn inductance(#[case] expect: f64, #[case] mask: u32) {
        let mut tank = ResonantTank::default();
        tank.set_mask(mask);
        assert_relative_eq!(expect, tank.inductance(), max_relative = 1e-12);
    }

    #[test]
    fn current_peaks_at_resonance() {
        let tank = ResonantTank::default();
        let f0 = tank.resonance_hz();
        let i0 = tank.current(f0);
        assert_relative_eq!(0.5, i0.norm(), max_relative = 1e-9);
        assert!(i0.arg().abs() < 1e-9);
        assert!(tank.current(f0 - 1000.).norm() < i0.norm());
        assert!(tank.current(f0 + 1000.).norm() < i0.norm());
    }

    #[test]
    fn stopped_drive_is_bias_only() -> anyhow::Result<()> {
        let mut tank = ResonantTank::default();
        assert_eq!(None, tank.drive_hz());

        let wf = Waveform::decode(&tank.capture(16, 1e6))?;
        assert_eq!(16, wf.samples_per_channel());
        (0..4).for_each(|c| {
            wf.channel(c).unwrap().iter().for_each(|&v| {
                approx::assert_abs_diff_eq!(1.65, v, epsilon = 1e-3);
            });
        });
        Ok(())
    }

    #[test]
    fn capture_stays_in_range() -> anyhow::Result<()> {
        let mut tank = ResonantTank::default();
        tank.set_period(880);
        tank.noise = 0.01;

        let wf = Waveform::decode(&tank.capture(1024, 1e6))?;
        let ch0 = wf.channel(0).unwrap();
        let max = ch0.iter().copied().fold(f64::MIN, f64::max);
        let min = ch0.iter().copied().fold(f64::MAX, f64::min);
        assert!(max < 3.3 && min > 0.);
        assert!(max - 1.65 > 0.6);
        Ok(())
    }
}
