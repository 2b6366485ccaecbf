#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::unescaped_backticks)]

//! Resonance tuning of transmitter coils on the RCTF test fixture.
//!
//! A [`Fixture`] owns the fixture coprocessor and the device under test. A [`Tuner`] drives
//! both to sweep the coil, locates the resonance of every configuration and converts it to
//! the tank capacitance and the tap inductances.
//!
//! ```no_run
//! use resotune::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut fixture = Fixture::connect(FixtureConfig::default())?;
//! fixture.coprocessor_mut().set_vdut(5.0)?;
//! let report = Tuner::new(&mut fixture, TunerOption::default()).run()?;
//! println!("{report}");
//! fixture.close()?;
//! # Ok(())
//! # }
//! ```

/// Error type.
pub mod error;
/// The fixture connection session.
pub mod fixture;
/// Re-exports of the commonly used items.
pub mod prelude;
/// The resonance tuner.
pub mod tuner;

pub use resotune_driver as driver;
#[cfg(feature = "serial")]
pub use resotune_link_serial as link_serial;

pub use fixture::Fixture;
pub use tuner::Tuner;
