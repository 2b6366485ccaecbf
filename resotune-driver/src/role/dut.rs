use std::time::{Duration, Instant};

use regex::Regex;
use resotune_core::link::{IDLE_POLL, Link};

use super::{Command, CommandSpec, Direction::*, Role, Shape::*};
use crate::{device::Device, error::DriverError};

const UID_PATTERN: &str = r"UID: (\d{30})";
/// Time to keep draining once the DUT has started printing.
const UID_TAIL: Duration = Duration::from_millis(150);

/// The transmitter under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dut;

/// Commands understood by the [`Dut`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DutCommand {
    /// Sets the PWM period in timer ticks.
    SetPwmPeriod,
    /// Reads the PWM period.
    ReadPwmPeriod,
    /// Selects the tap relay mask.
    SelectTaps,
    /// Reads the tap relay mask.
    ReadTaps,
}

impl DutCommand {
    const fn entry(self) -> CommandSpec {
        match self {
            Self::SetPwmPeriod => CommandSpec::new("SetPwmPeriod", 0x101, Write, U32),
            Self::ReadPwmPeriod => CommandSpec::new("ReadPwmPeriod", 0x102, Read, U32),
            Self::SelectTaps => CommandSpec::new("SelectTaps", 0x103, Write, U32),
            Self::ReadTaps => CommandSpec::new("ReadTaps", 0x104, Read, U32),
        }
    }
}

impl Command for DutCommand {
    const ALL: &'static [Self] = &[
        Self::SetPwmPeriod,
        Self::ReadPwmPeriod,
        Self::SelectTaps,
        Self::ReadTaps,
    ];

    fn spec(self) -> CommandSpec {
        self.entry()
    }
}

impl Role for Dut {
    const NAME: &'static str = "DUT";
    const DEFAULT_PORT: &'static str = "/dev/ttyAMA3";
    const DEFAULT_BAUD: u32 = 115_200;
    const TABLE: &'static [CommandSpec] = &[
        DutCommand::SetPwmPeriod.entry(),
        DutCommand::ReadPwmPeriod.entry(),
        DutCommand::SelectTaps.entry(),
        DutCommand::ReadTaps.entry(),
    ];

    type Command = DutCommand;
}

/// Mask that shorts every tap.
pub const ALL_TAPS_SHORTED: u32 = 0;

impl<L: Link> Device<L, Dut> {
    /// Sets the PWM period and returns the applied period.
    pub fn set_pwm_period(&mut self, period: u32) -> Result<u32, DriverError> {
        self.write_u32(DutCommand::SetPwmPeriod, period)
    }

    /// Reads the current PWM period.
    pub fn pwm_period(&mut self) -> Result<u32, DriverError> {
        self.read_u32(DutCommand::ReadPwmPeriod)
    }

    /// Selects the tap relay mask and returns the applied mask.
    pub fn select_taps(&mut self, mask: u32) -> Result<u32, DriverError> {
        self.write_u32(DutCommand::SelectTaps, mask)
    }

    /// Reads the current tap relay mask.
    pub fn taps(&mut self) -> Result<u32, DriverError> {
        self.read_u32(DutCommand::ReadTaps)
    }

    /// Reads the unique identifier the DUT prints after boot.
    ///
    /// Waits up to `window` for output to start, keeps collecting for a short while after the
    /// first bytes arrive, and returns the 30-digit identifier following `UID: `, or `None` if
    /// the output contains none.
    pub fn read_uid(&mut self, window: Duration) -> Result<Option<String>, DriverError> {
        let re = Regex::new(UID_PATTERN)?;
        self.link.ensure_is_open()?;

        let mut rx = Vec::new();
        let mut buf = [0u8; 64];
        let start = Instant::now();
        let mut first_output = None;
        loop {
            let n = self.link.receive(&mut buf)?;
            rx.extend_from_slice(&buf[..n]);
            if first_output.is_none() && rx.len() > 3 {
                first_output = Some(Instant::now());
            }
            match first_output {
                Some(t) if t.elapsed() >= UID_TAIL => break,
                None if start.elapsed() >= window => break,
                _ => {}
            }
            if n == 0 {
                std::thread::sleep(IDLE_POLL);
            }
        }

        let text = String::from_utf8_lossy(&rx);
        tracing::debug!("DUT output: {:?}", text);
        Ok(re
            .captures(&text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_owned()))
    }
}
