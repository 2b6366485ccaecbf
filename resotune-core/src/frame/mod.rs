mod codec;
mod command;

pub use codec::{Frame, FrameSizeError, Payload, FRAME_SIZE};
pub use command::CommandWord;
