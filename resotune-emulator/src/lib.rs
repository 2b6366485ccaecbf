#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::unescaped_backticks)]

//! Emulators of the resotune coprocessor and DUT firmware.

mod coprocessor;
mod dut;
mod firmware;
mod link;
mod tank;

pub use coprocessor::CoprocessorEmulator;
pub use dut::DutEmulator;
pub use firmware::{Firmware, Reply};
pub use link::Emulated;
pub use tank::{capacitance_for, ResonantTank, SharedTank};
