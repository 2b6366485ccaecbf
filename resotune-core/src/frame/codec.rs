use derive_more::Display;
use thiserror::Error;
use zerocopy::{
    byteorder::little_endian::U32, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
};

use super::command::CommandWord;

/// Size of every request and response frame in bytes.
pub const FRAME_SIZE: usize = core::mem::size_of::<Frame>();

/// A value that can ride in the 4-byte payload of a [`Frame`].
pub trait Payload: Copy {
    /// Encodes the value into little-endian payload bytes.
    fn into_payload(self) -> [u8; 4];
    /// Decodes the value from little-endian payload bytes.
    fn from_payload(bytes: [u8; 4]) -> Self;
}

impl Payload for u32 {
    fn into_payload(self) -> [u8; 4] {
        self.to_le_bytes()
    }

    fn from_payload(bytes: [u8; 4]) -> Self {
        u32::from_le_bytes(bytes)
    }
}

impl Payload for f32 {
    fn into_payload(self) -> [u8; 4] {
        self.to_le_bytes()
    }

    fn from_payload(bytes: [u8; 4]) -> Self {
        f32::from_le_bytes(bytes)
    }
}

impl Payload for [u8; 4] {
    fn into_payload(self) -> [u8; 4] {
        self
    }

    fn from_payload(bytes: [u8; 4]) -> Self {
        bytes
    }
}

/// An error produced when decoding a frame.
#[derive(Error, Debug, PartialEq, Clone)]
#[error("Frame must be {FRAME_SIZE} bytes, got {0}")]
pub struct FrameSizeError(pub usize);

/// A fixed-length request or response.
///
/// `[command word: u32 LE][payload: 4 bytes]`
#[repr(C)]
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    IntoBytes,
    FromBytes,
    Immutable,
    KnownLayout,
    Unaligned,
    Display,
)]
#[display("({:#010X}, {:02X?})", word.get(), payload)]
pub struct Frame {
    word: U32,
    payload: [u8; 4],
}

impl Frame {
    /// Creates a frame from a command word and a payload value.
    #[must_use]
    pub fn new<P: Payload>(command: CommandWord, value: P) -> Self {
        Self {
            word: U32::new(command.into_bits()),
            payload: value.into_payload(),
        }
    }

    /// Creates a write request for `id` carrying `value`.
    #[must_use]
    pub fn write<P: Payload>(id: u32, value: P) -> Self {
        Self::new(CommandWord::for_write(id), value)
    }

    /// Creates a read request for `id` with a zero-filled payload.
    #[must_use]
    pub fn read(id: u32) -> Self {
        Self::new(CommandWord::for_read(id), [0u8; 4])
    }

    /// Decodes a frame from exactly [`FRAME_SIZE`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameSizeError> {
        Self::read_from_bytes(bytes).map_err(|_| FrameSizeError(bytes.len()))
    }

    /// Returns the command word.
    #[must_use]
    pub fn command(&self) -> CommandWord {
        CommandWord::from_bits(self.word.get())
    }

    /// Returns the raw payload bytes.
    #[must_use]
    pub const fn payload(&self) -> [u8; 4] {
        self.payload
    }

    /// Decodes the payload as `P`.
    #[must_use]
    pub fn value<P: Payload>(&self) -> P {
        P::from_payload(self.payload)
    }
}
