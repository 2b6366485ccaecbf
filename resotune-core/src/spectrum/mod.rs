mod bin;
mod error;
mod peak;
mod window;

pub use bin::{dft_bin, extract_bin_magnitude, extract_bin_magnitude_with, whole_cycle_len};
pub use error::SpectrumError;
pub use peak::{estimate_peak, PeakEstimate};
pub use window::{FlatTop, Rectangular, Window};
