mod error;
mod waveform;

pub use error::CaptureError;
pub use waveform::{AdcScale, Waveform, HS_CHANNELS, HS_FULL_SCALE, HS_MAX_CODE};
