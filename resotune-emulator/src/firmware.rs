use resotune_core::frame::Frame;
use resotune_driver::role::Role;

/// What the firmware sends back for a request frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Echoes the command word with this payload.
    Value([u8; 4]),
    /// Echoes the request, then waits for `expect` raw bytes and acknowledges them.
    Raw {
        /// Number of raw bytes that follow the request.
        expect: usize,
    },
    /// Echoes the command word with the buffer length, then sends the buffer.
    Buffer(Vec<u8>),
    /// Sends nothing.
    Silent,
}

/// Firmware running behind an [`Emulated`] link.
///
/// [`Emulated`]: crate::Emulated
pub trait Firmware {
    /// The role the firmware implements.
    type Role: Role;

    /// Handles a request frame.
    fn handle(&mut self, cmd: <Self::Role as Role>::Command, request: &Frame) -> Reply;

    /// Handles the raw bytes following a request answered with [`Reply::Raw`].
    fn raw(&mut self, cmd: <Self::Role as Role>::Command, payload: &[u8]) {
        let _ = (cmd, payload);
    }

    /// Text printed on the serial line after power-on.
    fn banner(&self) -> Vec<u8> {
        Vec::new()
    }
}
