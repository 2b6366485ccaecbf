use resotune_core::frame::Frame;
use resotune_driver::{
    lcd::LCD_COLUMNS,
    role::{Coprocessor, CoprocessorCommand},
};

use crate::{
    firmware::{Firmware, Reply},
    tank::{lock, SharedTank},
};

const NUM_DOUT: usize = 8;
const NUM_DIN: usize = 8;
const VDUT_MAX: f32 = 12.0;
/// Supply voltage above which the DUT regulators are up.
const DUT_POWER_GOOD: f32 = 4.5;

/// Emulator of the fixture coprocessor firmware.
pub struct CoprocessorEmulator {
    tank: SharedTank,
    vdut: f32,
    load_ohms: f32,
    rgb: u32,
    fp_led: bool,
    lcd: [[char; LCD_COLUMNS]; 2],
    dout: [bool; NUM_DOUT],
    din: [u32; NUM_DIN],
    hs_samples: usize,
    hs_sample_rate: f64,
}

impl CoprocessorEmulator {
    /// Creates an emulator sampling `tank` with its high-speed ADC.
    #[must_use]
    pub fn new(tank: SharedTank) -> Self {
        Self {
            tank,
            vdut: 0.,
            load_ohms: 50.,
            rgb: 0,
            fp_led: false,
            lcd: [[' '; LCD_COLUMNS]; 2],
            dout: [false; NUM_DOUT],
            din: [0; NUM_DIN],
            hs_samples: 1024,
            hs_sample_rate: 1e6,
        }
    }

    /// Sets the size and per-channel sample rate of a high-speed capture.
    pub fn set_hs_capture(&mut self, samples_per_channel: usize, sample_rate: f64) {
        self.hs_samples = samples_per_channel;
        self.hs_sample_rate = sample_rate;
    }

    /// Sets the resistance the DUT presents on its supply.
    pub fn set_load_ohms(&mut self, load_ohms: f32) {
        self.load_ohms = load_ohms;
    }

    /// Drives digital input `idx` to `level`.
    pub fn set_din(&mut self, idx: usize, level: u32) {
        if let Some(din) = self.din.get_mut(idx) {
            *din = level;
        }
    }

    /// DUT supply setpoint.
    #[must_use]
    pub const fn vdut(&self) -> f32 {
        self.vdut
    }

    /// DUT supply current.
    #[must_use]
    pub fn idut(&self) -> f32 {
        if self.vdut > 0. && self.load_ohms > 0. {
            self.vdut / self.load_ohms
        } else {
            0.
        }
    }

    /// Indicator colour.
    #[must_use]
    pub const fn rgb(&self) -> u32 {
        self.rgb
    }

    /// Front-panel LED state.
    #[must_use]
    pub const fn fp_led(&self) -> bool {
        self.fp_led
    }

    /// State of digital output `idx`.
    #[must_use]
    pub fn dout(&self, idx: usize) -> Option<bool> {
        self.dout.get(idx).copied()
    }

    /// Contents of display row `row`.
    #[must_use]
    pub fn lcd_line(&self, row: usize) -> Option<String> {
        self.lcd.get(row).map(|line| line.iter().collect())
    }

    /// Low-speed ADC vector: supply divider, supply current, and the DUT 3.3 V and 5 V rails
    /// behind their 1/1.5 dividers.
    #[must_use]
    pub fn adc_ls(&self) -> [f32; 4] {
        let (rail_3v3, rail_5v) = if self.vdut >= DUT_POWER_GOOD {
            (3.3, self.vdut.min(5.0))
        } else {
            (0., 0.)
        };
        [self.vdut / 4., self.idut(), rail_3v3 / 1.5, rail_5v / 1.5]
    }

    fn write_lcd(&mut self, payload: &[u8]) {
        let [col, row, text @ ..] = payload else {
            tracing::warn!("LCD payload too short: {} bytes", payload.len());
            return;
        };
        let Some(line) = self.lcd.get_mut(*row as usize) else {
            tracing::warn!("LCD row {} out of range", row);
            return;
        };
        line.iter_mut()
            .skip(*col as usize)
            .zip(String::from_utf8_lossy(text).chars())
            .for_each(|(dst, c)| *dst = c);
    }
}

impl Firmware for CoprocessorEmulator {
    type Role = Coprocessor;

    fn handle(&mut self, cmd: CoprocessorCommand, request: &Frame) -> Reply {
        match cmd {
            CoprocessorCommand::SetVdut => {
                self.vdut = request.value::<f32>().clamp(0., VDUT_MAX);
                Reply::Value(self.vdut.to_le_bytes())
            }
            CoprocessorCommand::MeasureVdut => Reply::Value(self.vdut.to_le_bytes()),
            CoprocessorCommand::MeasureIdut => Reply::Value(self.idut().to_le_bytes()),
            CoprocessorCommand::SetRgb => {
                self.rgb = request.value::<u32>() & 0x00FF_FFFF;
                Reply::Value(self.rgb.to_le_bytes())
            }
            CoprocessorCommand::SetLcdText => Reply::Raw {
                expect: request.value::<u32>() as usize,
            },
            CoprocessorCommand::SetFpLed => {
                self.fp_led = request.value::<u32>() != 0;
                Reply::Value((self.fp_led as u32).to_le_bytes())
            }
            CoprocessorCommand::SetDout => {
                let [idx, state, ..] = request.value::<[u8; 4]>();
                let applied = self.dout.get_mut(idx as usize).map_or(0, |dout| {
                    *dout = state != 0;
                    *dout as u8
                });
                Reply::Value([idx, applied, 0, 0])
            }
            CoprocessorCommand::GetDin => {
                let idx = request.value::<u32>() as usize;
                Reply::Value(self.din.get(idx).copied().unwrap_or(0).to_le_bytes())
            }
            CoprocessorCommand::MeasureAdcLs => Reply::Buffer(
                self.adc_ls()
                    .iter()
                    .flat_map(|v| v.to_le_bytes())
                    .collect(),
            ),
            CoprocessorCommand::MeasureAdcHs => {
                Reply::Buffer(lock(&self.tank).capture(self.hs_samples, self.hs_sample_rate))
            }
        }
    }

    fn raw(&mut self, cmd: CoprocessorCommand, payload: &[u8]) {
        if cmd == CoprocessorCommand::SetLcdText {
            self.write_lcd(payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use resotune_core::link::LinkError;
    use resotune_driver::{device::Device, error::DriverError, option::DeviceOption};

    use super::*;
    use crate::{tank::ResonantTank, Emulated};

    fn open() -> anyhow::Result<Device<Emulated<CoprocessorEmulator>, Coprocessor>> {
        let emulator = CoprocessorEmulator::new(ResonantTank::default().shared());
        Ok(Device::open(
            Emulated::new(emulator),
            DeviceOption {
                timeout: Duration::from_millis(20),
            },
        )?)
    }

    #[test]
    fn supply() -> anyhow::Result<()> {
        let mut dev = open()?;

        approx::assert_abs_diff_eq!(5.0, dev.set_vdut(5.0)?);
        approx::assert_abs_diff_eq!(5.0, dev.measure_vdut()?);
        approx::assert_abs_diff_eq!(0.1, dev.measure_idut()?, epsilon = 1e-6);
        approx::assert_abs_diff_eq!(VDUT_MAX, dev.set_vdut(24.0)?);
        approx::assert_abs_diff_eq!(0.0, dev.set_vdut(-1.0)?);
        approx::assert_abs_diff_eq!(0.0, dev.measure_idut()?);
        Ok(())
    }

    #[rstest::rstest]
    #[case(5.0, 3.3, 5.0)]
    #[case(4.8, 3.3, 4.8)]
    #[case(3.0, 0.0, 0.0)]
    #[test]
    fn rails(#[case] vdut: f32, #[case] rail_3v3: f32, #[case] rail_5v: f32) -> anyhow::Result<()> {
        let mut dev = open()?;
        dev.set_vdut(vdut)?;

        let adc = dev.measure_adc_ls()?;
        assert_eq!(4, adc.len());
        approx::assert_abs_diff_eq!(rail_3v3, adc[2] * 1.5, epsilon = 1e-5);
        approx::assert_abs_diff_eq!(rail_5v, adc[3] * 1.5, epsilon = 1e-5);
        Ok(())
    }

    #[test]
    fn lcd() -> anyhow::Result<()> {
        let mut dev = open()?;

        dev.set_lcd_text("Tuning", 0, 0, true)?;
        dev.set_lcd_text("tap 2", 1, 4, false)?;
        assert_eq!(Some("Tuning          ".to_owned()), dev.link().lcd_line(0));
        assert_eq!(Some("    tap 2       ".to_owned()), dev.link().lcd_line(1));

        dev.set_lcd_text("Done", 0, 0, false)?;
        assert_eq!(Some("Doneng          ".to_owned()), dev.link().lcd_line(0));
        assert_eq!(0, dev.link().pending());
        Ok(())
    }

    #[test]
    fn indicators() -> anyhow::Result<()> {
        let mut dev = open()?;

        assert_eq!(0x00FF00, dev.set_rgb_str("#00FF00")?);
        assert_eq!(0x00FF00, dev.link().rgb());
        assert_eq!(0x00FF_FFFF, dev.set_rgb(0xFFFF_FFFF)?);

        assert_eq!(1, dev.set_fp_led_state(true)?);
        assert!(dev.link().fp_led());
        Ok(())
    }

    #[test]
    fn digital_io() -> anyhow::Result<()> {
        let mut dev = open()?;

        assert_eq!([3, 1, 0, 0], dev.set_dout_state(3, true)?);
        assert_eq!(Some(true), dev.link().dout(3));
        assert_eq!([3, 0, 0, 0], dev.set_dout_state(3, false)?);
        assert_eq!([200, 0, 0, 0], dev.set_dout_state(200, true)?);

        dev.link_mut().set_din(2, 1);
        assert_eq!(1, dev.get_din_state(2)?);
        assert_eq!(0, dev.get_din_state(1)?);
        assert_eq!(0, dev.get_din_state(100)?);
        Ok(())
    }

    #[test]
    fn hs_capture() -> anyhow::Result<()> {
        let mut dev = open()?;
        dev.link_mut().set_hs_capture(256, 1e6);

        let wf = dev.measure_adc_hs()?;
        assert_eq!(4, wf.num_channels());
        assert_eq!(256, wf.samples_per_channel());
        Ok(())
    }

    #[test]
    fn broken_times_out() -> anyhow::Result<()> {
        let mut dev = open()?;

        dev.link_mut().break_down();
        assert_eq!(
            Err(DriverError::Link(LinkError::Timeout {
                expected: 8,
                received: 0
            })),
            dev.measure_vdut()
        );

        dev.link_mut().repair();
        approx::assert_abs_diff_eq!(0.0, dev.measure_vdut()?);
        Ok(())
    }
}
