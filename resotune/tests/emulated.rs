use std::time::Duration;

use approx::assert_relative_eq;
use resotune::prelude::*;
use resotune_emulator::{CoprocessorEmulator, DutEmulator, Emulated, ResonantTank, SharedTank};

const UID: &str = "240117093512000000000000001234";

type EmulatedFixture = Fixture<Emulated<CoprocessorEmulator>, Emulated<DutEmulator>>;

fn fixture(tank: &SharedTank) -> anyhow::Result<EmulatedFixture> {
    let option = DeviceOption {
        timeout: Duration::from_millis(100),
    };
    Ok(Fixture::new(
        Device::open(Emulated::new(CoprocessorEmulator::new(tank.clone())), option)?,
        Device::open(Emulated::new(DutEmulator::new(tank.clone(), UID)), option)?,
    ))
}

fn option() -> TunerOption {
    let supply = AuxLimits {
        vdut: Some(Band::new(4.8, 5.2)),
        idut: Some(Band::new(0.001, 0.5)),
        tx_5v: Some(Band::new(4.2, 5.2)),
        tx_3v3: Some(Band::new(3.0, 3.6)),
    };
    TunerOption {
        settle: Duration::from_millis(1),
        capture_attempts: 2,
        taps: vec![
            TapConfig::new("tap1", 0b001, 66_000., Band::new(9e-6, 11e-6)),
            TapConfig::new("tap2", 0b010, 60_000., Band::new(20e-6, 24e-6)),
            TapConfig::new("tap3", 0b100, 55_700., Band::new(30e-6, 36e-6)),
        ]
        .into_iter()
        .map(|t| t.with_aux_limits(supply))
        .collect(),
        ..Default::default()
    }
}

#[test]
fn power_up_and_tune() -> anyhow::Result<()> {
    let tank = ResonantTank::default().shared();
    {
        let mut tank = tank.lock().unwrap();
        tank.noise = 0.005;
        tank.seed(7);
    }
    let mut fixture = fixture(&tank)?;

    fixture.coprocessor_mut().set_lcd_text("Power Up", 0, 0, true)?;
    approx::assert_abs_diff_eq!(5.0, fixture.coprocessor_mut().set_vdut(5.0)?);
    fixture.dut_mut().link_mut().reboot();
    assert_eq!(Some(UID), fixture.read_dut_uid(Duration::from_millis(200))?);
    approx::assert_abs_diff_eq!(5.0, fixture.measure_tx_5v()?, epsilon = 1e-5);
    approx::assert_abs_diff_eq!(3.3, fixture.measure_tx_3v3()?, epsilon = 1e-5);

    fixture.coprocessor_mut().set_lcd_text("Tuning", 1, 0, true)?;
    let report = Tuner::new(&mut fixture, option()).run()?;

    assert!(report.passed(), "{report}");
    assert_relative_eq!(72_700., report.baseline.peak.f0.unwrap(), max_relative = 2e-3);
    assert_relative_eq!(
        tank.lock().unwrap().capacitance,
        report.baseline.capacitance.unwrap(),
        max_relative = 3e-2
    );
    assert_eq!(
        vec!["tap1", "tap2", "tap3"],
        report.taps.iter().map(|t| t.name.as_str()).collect::<Vec<_>>()
    );
    assert_eq!(0, fixture.dut_mut().taps()?);

    fixture
        .coprocessor_mut()
        .set_rgb_str(if report.passed() { "#00FF00" } else { "#FF0000" })?;
    assert_eq!(0x00FF00, fixture.coprocessor().link().rgb());
    assert_eq!(
        Some("Power Up        ".to_owned()),
        fixture.coprocessor().link().lcd_line(0)
    );

    fixture.coprocessor_mut().set_vdut(0.0)?;
    fixture.close()?;
    Ok(())
}

#[test]
fn detuned_tank_fails_baseline() -> anyhow::Result<()> {
    let tank = ResonantTank::default().shared();
    {
        let mut tank = tank.lock().unwrap();
        tank.capacitance *= 1.25;
    }
    let mut fixture = fixture(&tank)?;
    fixture.coprocessor_mut().set_vdut(5.0)?;

    let option = TunerOption {
        offsets: vec![-8000., -4000., 0., 4000., 8000.],
        ..option()
    };
    let report = Tuner::new(&mut fixture, option).run()?;

    assert_eq!(TunerState::Done, report.state);
    assert_eq!(Some(0), report.baseline.peak.index);
    assert!(report.baseline.capacitance.unwrap() > 110e-9);
    assert!(!report.baseline.passed);
    assert!(report.taps.is_empty());
    assert!(!report.passed());
    assert!(report.to_string().ends_with("result: FAIL"));
    Ok(())
}

#[test]
fn silent_coprocessor_times_out() -> anyhow::Result<()> {
    let tank = ResonantTank::default().shared();
    let mut fixture = fixture(&tank)?;
    fixture.coprocessor_mut().link_mut().break_down();

    let err = Tuner::new(&mut fixture, option()).run().unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(
        TuneError::Driver(DriverError::Link(LinkError::Timeout {
            expected: 8,
            received: 0
        })),
        err
    );
    assert_eq!(0, fixture.dut_mut().taps()?);
    Ok(())
}
