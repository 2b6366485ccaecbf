#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::unescaped_backticks)]

//! Device proxies for the resotune fixture.
//!
//! A [`Device`](device::Device) owns one [`Link`](resotune_core::link::Link) and speaks the
//! fixed-frame command protocol of one [`Role`](role::Role): the fixture [`Coprocessor`] or
//! the [`Dut`].
//!
//! [`Coprocessor`]: role::Coprocessor
//! [`Dut`]: role::Dut

/// The generic device proxy.
pub mod device;
/// Error types.
pub mod error;
/// Front-panel display rules.
pub mod lcd;
/// Device options.
pub mod option;
/// Explicit retry helper.
pub mod retry;
/// Endpoint roles and their command tables.
pub mod role;

/// Re-exports of the commonly used items.
pub mod prelude {
    pub use crate::{
        device::Device,
        error::DriverError,
        option::DeviceOption,
        retry::retry,
        role::{Coprocessor, CoprocessorCommand, Dut, DutCommand, Role, ALL_TAPS_SHORTED},
    };
}
