use resotune_core::{capture::CaptureError, frame::FrameSizeError, link::LinkError};
use thiserror::Error;

use crate::role::{Direction, Shape};

/// A interface for error handling in resotune-driver.
#[derive(Error, Debug, PartialEq, Clone)]
#[non_exhaustive]
pub enum DriverError {
    /// Error in the link.
    #[error("{0}")]
    Link(#[from] LinkError),
    /// Error while decoding a waveform capture.
    #[error("{0}")]
    Capture(#[from] CaptureError),
    /// A response frame could not be decoded.
    #[error("{0}")]
    Frame(#[from] FrameSizeError),
    /// The primitive used does not match the declared shape of the command.
    #[error("Command {command} is declared as {direction} of {shape}")]
    ShapeMismatch {
        /// Command name.
        command: &'static str,
        /// Declared direction.
        direction: Direction,
        /// Declared shape.
        shape: Shape,
    },
    /// A buffer length is not a multiple of its element size.
    #[error("Buffer of {len} bytes is not a multiple of {elem}")]
    MalformedBuffer {
        /// Received byte count.
        len: usize,
        /// Element size in bytes.
        elem: usize,
    },
    /// Text does not fit on the display at the given column.
    #[error("Text {text:?} does not fit on the display at column {col}")]
    TextTooLong {
        /// Rejected text.
        text: String,
        /// Starting column.
        col: u8,
    },
    /// Display row is out of range.
    #[error("Row must be 0 or 1, got {0}")]
    RowOutOfRange(u8),
    /// Color string is not of the form `#RRGGBB`.
    #[error("Invalid color {0:?}, expected #RRGGBB")]
    InvalidColor(String),
    /// Invalid pattern.
    #[error("{0}")]
    Pattern(#[from] regex::Error),
}

impl DriverError {
    /// Returns `true` if the error is a read timeout on the link.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Link(e) if e.is_timeout())
    }
}
