use std::{path::Path, time::Duration};

use anyhow::Result;

use resotune::prelude::*;

const VDUT: f32 = 5.0;
const POWER_UP: Duration = Duration::from_millis(100);
const UID_WINDOW: Duration = Duration::from_secs(2);

/// Loads the tuner option from the first argument, or the default if none is given.
pub fn load_option() -> Result<TunerOption> {
    match std::env::args().nth(1) {
        Some(path) => {
            let path = Path::new(&path);
            tracing::info!("Loading tuner option from {}", path.display());
            Ok(serde_json::from_reader(std::fs::File::open(path)?)?)
        }
        None => Ok(TunerOption::default()),
    }
}

/// Powers the DUT, tunes it and reports the result on the fixture indicators.
pub fn run<LC: Link, LD: Link>(mut fixture: Fixture<LC, LD>, option: TunerOption) -> Result<()> {
    fixture.coprocessor_mut().set_lcd_text("Power Up", 0, 0, true)?;
    fixture.coprocessor_mut().set_vdut(VDUT)?;
    std::thread::sleep(POWER_UP);

    println!("Vdut  : {:.3} V", fixture.coprocessor_mut().measure_vdut()?);
    println!("Idut  : {:.3} A", fixture.coprocessor_mut().measure_idut()?);
    println!("TX 5V : {:.3} V", fixture.measure_tx_5v()?);
    println!("TX 3V3: {:.3} V", fixture.measure_tx_3v3()?);
    match fixture.read_dut_uid(UID_WINDOW)? {
        Some(uid) => println!("UID   : {uid}"),
        None => println!("UID   : -"),
    }

    fixture.coprocessor_mut().set_lcd_text("Tuning", 1, 0, true)?;
    let result = Tuner::new(&mut fixture, option).run();

    let passed = result.as_ref().is_ok_and(Report::passed);
    fixture
        .coprocessor_mut()
        .set_rgb_str(if passed { "#00FF00" } else { "#FF0000" })?;
    fixture
        .coprocessor_mut()
        .set_lcd_text(if passed { "PASS" } else { "FAIL" }, 1, 0, true)?;
    fixture.coprocessor_mut().set_vdut(0.)?;

    println!("{}", result?);
    fixture.close()?;
    Ok(())
}
