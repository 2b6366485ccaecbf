use resotune_core::frame::Frame;
use resotune_driver::role::{Dut, DutCommand};

use crate::{
    firmware::{Firmware, Reply},
    tank::{lock, SharedTank},
};

/// Emulator of the DUT firmware.
///
/// PWM period and tap mask writes are applied to the shared tank.
pub struct DutEmulator {
    tank: SharedTank,
    uid: String,
}

impl DutEmulator {
    /// Creates an emulator driving `tank` and reporting `uid` after power-on.
    #[must_use]
    pub fn new(tank: SharedTank, uid: impl Into<String>) -> Self {
        Self {
            tank,
            uid: uid.into(),
        }
    }

    /// Reported unique identifier.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// The driven tank.
    #[must_use]
    pub const fn tank(&self) -> &SharedTank {
        &self.tank
    }
}

impl Firmware for DutEmulator {
    type Role = Dut;

    fn handle(&mut self, cmd: DutCommand, request: &Frame) -> Reply {
        let mut tank = lock(&self.tank);
        let value = match cmd {
            DutCommand::SetPwmPeriod => {
                tank.set_period(request.value());
                tank.period()
            }
            DutCommand::ReadPwmPeriod => tank.period(),
            DutCommand::SelectTaps => {
                tank.set_mask(request.value());
                tank.mask()
            }
            DutCommand::ReadTaps => tank.mask(),
        };
        Reply::Value(value.to_le_bytes())
    }

    fn banner(&self) -> Vec<u8> {
        format!("TX boot\r\nUID: {}\r\n", self.uid).into_bytes()
    }
}
