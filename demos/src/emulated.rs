mod runner;

use std::time::Duration;

use anyhow::Result;

use resotune::prelude::*;
use resotune_emulator::{CoprocessorEmulator, DutEmulator, Emulated, ResonantTank};

const UID: &str = "000000000000000000000000000001";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let option = runner::load_option()?;

    let mut tank = ResonantTank::default();
    tank.noise = 0.005;
    let tank = tank.shared();

    let device = DeviceOption {
        timeout: Duration::from_millis(100),
    };
    let coprocessor = Device::open(Emulated::new(CoprocessorEmulator::new(tank.clone())), device)?;
    let mut dut = Device::open(Emulated::new(DutEmulator::new(tank, UID)), device)?;
    dut.link_mut().reboot();

    runner::run(Fixture::new(coprocessor, dut), option)
}
