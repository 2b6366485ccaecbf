use resotune_core::{capture::Waveform, link::Link};

use super::{Command, CommandSpec, Direction::*, Role, Shape::*};
use crate::{device::Device, error::DriverError, lcd::lcd_payload};

/// The fixture coprocessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coprocessor;

/// Commands understood by the [`Coprocessor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoprocessorCommand {
    /// Sets the DUT supply voltage.
    SetVdut,
    /// Measures the DUT supply voltage.
    MeasureVdut,
    /// Measures the DUT supply current.
    MeasureIdut,
    /// Sets the status indicator colour.
    SetRgb,
    /// Writes text to the front-panel display.
    SetLcdText,
    /// Enables the front-panel LED.
    SetFpLed,
    /// Drives a digital output.
    SetDout,
    /// Samples a digital input.
    GetDin,
    /// Reads the low-speed ADC vector.
    MeasureAdcLs,
    /// Captures the high-speed 4-channel waveform.
    MeasureAdcHs,
}

impl CoprocessorCommand {
    const fn entry(self) -> CommandSpec {
        match self {
            Self::SetVdut => CommandSpec::new("SetVdut", 1, Write, F32),
            Self::MeasureVdut => CommandSpec::new("MeasureVdut", 2, Read, F32),
            Self::MeasureIdut => CommandSpec::new("MeasureIdut", 3, Read, F32),
            Self::SetRgb => CommandSpec::new("SetRgb", 4, Write, U32),
            Self::SetLcdText => CommandSpec::new("SetLcdText", 5, Write, Text),
            Self::SetFpLed => CommandSpec::new("SetFpLed", 6, Write, U32),
            Self::SetDout => CommandSpec::new("SetDout", 7, Write, Bytes4),
            Self::GetDin => CommandSpec::new("GetDin", 8, Write, U32),
            Self::MeasureAdcLs => CommandSpec::new("MeasureAdcLs", 9, Read, Buffer),
            Self::MeasureAdcHs => CommandSpec::new("MeasureAdcHs", 10, Read, Buffer),
        }
    }
}

impl Command for CoprocessorCommand {
    const ALL: &'static [Self] = &[
        Self::SetVdut,
        Self::MeasureVdut,
        Self::MeasureIdut,
        Self::SetRgb,
        Self::SetLcdText,
        Self::SetFpLed,
        Self::SetDout,
        Self::GetDin,
        Self::MeasureAdcLs,
        Self::MeasureAdcHs,
    ];

    fn spec(self) -> CommandSpec {
        self.entry()
    }
}

impl Role for Coprocessor {
    const NAME: &'static str = "Coprocessor";
    const DEFAULT_PORT: &'static str = "/dev/ttyAMA2";
    const DEFAULT_BAUD: u32 = 1_000_000;
    const TABLE: &'static [CommandSpec] = &[
        CoprocessorCommand::SetVdut.entry(),
        CoprocessorCommand::MeasureVdut.entry(),
        CoprocessorCommand::MeasureIdut.entry(),
        CoprocessorCommand::SetRgb.entry(),
        CoprocessorCommand::SetLcdText.entry(),
        CoprocessorCommand::SetFpLed.entry(),
        CoprocessorCommand::SetDout.entry(),
        CoprocessorCommand::GetDin.entry(),
        CoprocessorCommand::MeasureAdcLs.entry(),
        CoprocessorCommand::MeasureAdcHs.entry(),
    ];

    type Command = CoprocessorCommand;
}

/// Parses a `#RRGGBB` colour into `0xRRGGBB`.
pub fn parse_rgb(rgb: &str) -> Result<u32, DriverError> {
    rgb.strip_prefix('#')
        .filter(|hex| hex.len() == 6 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
        .and_then(|hex| u32::from_str_radix(hex, 16).ok())
        .ok_or_else(|| DriverError::InvalidColor(rgb.to_owned()))
}

impl<L: Link> Device<L, Coprocessor> {
    /// Sets the DUT supply voltage and returns the applied setpoint.
    pub fn set_vdut(&mut self, voltage: f32) -> Result<f32, DriverError> {
        self.write_f32(CoprocessorCommand::SetVdut, voltage)
    }

    /// Measures the DUT supply voltage in volts.
    pub fn measure_vdut(&mut self) -> Result<f32, DriverError> {
        self.read_f32(CoprocessorCommand::MeasureVdut)
    }

    /// Measures the DUT supply current in amperes.
    pub fn measure_idut(&mut self) -> Result<f32, DriverError> {
        self.read_f32(CoprocessorCommand::MeasureIdut)
    }

    /// Sets the indicator colour as `0xRRGGBB`.
    pub fn set_rgb(&mut self, rgb: u32) -> Result<u32, DriverError> {
        self.write_u32(CoprocessorCommand::SetRgb, rgb)
    }

    /// Sets the indicator colour from a `#RRGGBB` string.
    pub fn set_rgb_str(&mut self, rgb: &str) -> Result<u32, DriverError> {
        let rgb = parse_rgb(rgb)?;
        self.set_rgb(rgb)
    }

    /// Writes `text` on the display at `row`, `col`.
    ///
    /// The text is validated against the display geometry before anything is sent.
    pub fn set_lcd_text(
        &mut self,
        text: &str,
        row: u8,
        col: u8,
        full_line: bool,
    ) -> Result<(), DriverError> {
        let payload = lcd_payload(text, row, col, full_line)?;
        self.write_text(CoprocessorCommand::SetLcdText, &payload)
    }

    /// Switches the front-panel LED.
    pub fn set_fp_led_state(&mut self, state: bool) -> Result<u32, DriverError> {
        self.write_u32(CoprocessorCommand::SetFpLed, state as u32)
    }

    /// Drives digital output `index` and returns the state reported by the coprocessor.
    pub fn set_dout_state(&mut self, index: u8, state: bool) -> Result<[u8; 4], DriverError> {
        self.write_bytes(CoprocessorCommand::SetDout, [index, state as u8, 0, 0])
    }

    /// Samples digital input `index`.
    pub fn get_din_state(&mut self, index: u32) -> Result<u32, DriverError> {
        self.write_u32(CoprocessorCommand::GetDin, index)
    }

    /// Reads the low-speed ADC vector.
    pub fn measure_adc_ls(&mut self) -> Result<Vec<f32>, DriverError> {
        let raw = self.read_buffer(CoprocessorCommand::MeasureAdcLs)?;
        if raw.len() % 4 != 0 {
            return Err(DriverError::MalformedBuffer {
                len: raw.len(),
                elem: 4,
            });
        }
        Ok(raw
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Captures the high-speed 4-channel waveform.
    pub fn measure_adc_hs(&mut self) -> Result<Waveform, DriverError> {
        let raw = self.read_buffer(CoprocessorCommand::MeasureAdcHs)?;
        let waveform = Waveform::decode(&raw)?;
        tracing::debug!(
            "Captured {} channels x {} samples",
            waveform.num_channels(),
            waveform.samples_per_channel()
        );
        Ok(waveform)
    }
}
