use thiserror::Error;

/// An error produced when decoding a capture.
#[derive(Error, Debug, PartialEq, Clone)]
#[non_exhaustive]
pub enum CaptureError {
    /// The sample count is not a multiple of the channel count.
    #[error("Capture of {samples} samples cannot be split into {channels} channels")]
    Malformed {
        /// Number of samples in the capture.
        samples: usize,
        /// Number of channels expected.
        channels: usize,
    },
    /// The byte count is not a whole number of 16-bit samples.
    #[error("Capture length ({0} bytes) is not a multiple of 2")]
    OddLength(usize),
    /// At least one channel is required.
    #[error("Capture must have at least one channel")]
    NoChannel,
}
