#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::unescaped_backticks)]

//! Core traits and types for resotune.

/// Decoding of high-speed multi-channel ADC captures.
pub mod capture;
/// Fixed-size binary frames exchanged with the devices.
pub mod frame;
/// A interface to the device.
pub mod link;
/// Sleep abstractions used for settle delays.
pub mod sleep;
/// Windowed single-bin DFT and peak estimation.
pub mod spectrum;
