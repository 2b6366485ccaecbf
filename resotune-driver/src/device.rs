use std::marker::PhantomData;

use getset::{Getters, MutGetters};
use resotune_core::{
    frame::{Frame, Payload, FRAME_SIZE},
    link::Link,
};
use zerocopy::IntoBytes;

use crate::{
    error::DriverError,
    option::DeviceOption,
    role::{Command, CommandSpec, Direction, Role, Shape},
};

/// A proxy for one remote endpoint reached through an exclusively owned [`Link`].
///
/// Every exchange is synchronous: a request is written and flushed, and its response is read
/// back in full before the next request is sent.
#[derive(Getters, MutGetters)]
pub struct Device<L: Link, R: Role> {
    /// The link to the endpoint.
    #[getset(get = "pub", get_mut = "pub")]
    pub(crate) link: L,
    /// The option used for every exchange.
    #[getset(get = "pub")]
    pub(crate) option: DeviceOption,
    _role: PhantomData<R>,
}

impl<L: Link, R: Role> Device<L, R> {
    /// Wraps an open link and discards any input pending on it.
    pub fn open(mut link: L, option: DeviceOption) -> Result<Self, DriverError> {
        link.ensure_is_open()?;
        link.discard_pending()?;
        tracing::info!("{} opened (timeout: {:?})", R::NAME, option.timeout);
        Ok(Self {
            link,
            option,
            _role: PhantomData,
        })
    }

    /// Closes the device.
    pub fn close(mut self) -> Result<(), DriverError> {
        self.close_impl()
    }

    /// Discards any input pending on the link.
    pub fn flush_rx(&mut self) -> Result<(), DriverError> {
        self.link.ensure_is_open()?;
        self.link.discard_pending()?;
        Ok(())
    }

    /// Writes a `u32` and returns the acknowledged value.
    pub fn write_u32(&mut self, cmd: R::Command, value: u32) -> Result<u32, DriverError> {
        let spec = Self::checked(cmd, Direction::Write, Shape::U32)?;
        self.exchange(spec, Frame::write(spec.id, value))
    }

    /// Writes an `f32` and returns the acknowledged value.
    pub fn write_f32(&mut self, cmd: R::Command, value: f32) -> Result<f32, DriverError> {
        let spec = Self::checked(cmd, Direction::Write, Shape::F32)?;
        self.exchange(spec, Frame::write(spec.id, value))
    }

    /// Writes four bytes and returns the acknowledged bytes.
    pub fn write_bytes(&mut self, cmd: R::Command, value: [u8; 4]) -> Result<[u8; 4], DriverError> {
        let spec = Self::checked(cmd, Direction::Write, Shape::Bytes4)?;
        self.exchange(spec, Frame::write(spec.id, value))
    }

    /// Reads a `u32`.
    pub fn read_u32(&mut self, cmd: R::Command) -> Result<u32, DriverError> {
        let spec = Self::checked(cmd, Direction::Read, Shape::U32)?;
        self.exchange(spec, Frame::read(spec.id))
    }

    /// Reads an `f32`.
    pub fn read_f32(&mut self, cmd: R::Command) -> Result<f32, DriverError> {
        let spec = Self::checked(cmd, Direction::Read, Shape::F32)?;
        self.exchange(spec, Frame::read(spec.id))
    }

    /// Sends a variable-length payload.
    ///
    /// The payload length is written first as a `u32` frame, then the raw payload follows
    /// without framing, and a fixed-size acknowledgment is consumed.
    pub fn write_text(&mut self, cmd: R::Command, payload: &[u8]) -> Result<(), DriverError> {
        let spec = Self::checked(cmd, Direction::Write, Shape::Text)?;
        let _: u32 = self.exchange(spec, Frame::write(spec.id, payload.len() as u32))?;

        self.link.send(payload)?;
        let ack = self.link.read_exact(FRAME_SIZE, self.option.timeout)?;
        tracing::trace!("{} {}: ack {:02X?}", R::NAME, spec.name, ack);
        Ok(())
    }

    /// Reads a length-prefixed buffer.
    pub fn read_buffer(&mut self, cmd: R::Command) -> Result<Vec<u8>, DriverError> {
        let spec = Self::checked(cmd, Direction::Read, Shape::Buffer)?;
        let len: u32 = self.exchange(spec, Frame::read(spec.id))?;
        tracing::trace!("{} {}: receiving {} bytes", R::NAME, spec.name, len);
        Ok(self.link.read_exact(len as usize, self.option.timeout)?)
    }
}

impl<L: Link, R: Role> Device<L, R> {
    fn checked(
        cmd: R::Command,
        direction: Direction,
        shape: Shape,
    ) -> Result<CommandSpec, DriverError> {
        let spec = cmd.spec();
        if spec.direction != direction || spec.shape != shape {
            return Err(DriverError::ShapeMismatch {
                command: spec.name,
                direction: spec.direction,
                shape: spec.shape,
            });
        }
        Ok(spec)
    }

    fn exchange<P: Payload>(&mut self, spec: CommandSpec, request: Frame) -> Result<P, DriverError> {
        self.link.ensure_is_open()?;

        tracing::trace!("{} {}: send {}", R::NAME, spec.name, request);
        self.link.send(request.as_bytes())?;

        let rx = self.link.read_exact(FRAME_SIZE, self.option.timeout)?;
        let response = Frame::decode(&rx)?;
        tracing::trace!("{} {}: recv {}", R::NAME, spec.name, response);

        if response.command().id() != spec.id {
            tracing::warn!(
                "{} {}: response carries command {:#X}",
                R::NAME,
                spec.name,
                response.command().id()
            );
        }
        Ok(response.value())
    }

    fn close_impl(&mut self) -> Result<(), DriverError> {
        if !self.link.is_open() {
            return Ok(());
        }
        tracing::info!("{} closing", R::NAME);
        self.link.close()?;
        Ok(())
    }
}

impl<L: Link, R: Role> Drop for Device<L, R> {
    fn drop(&mut self) {
        if let Err(e) = self.close_impl() {
            tracing::warn!("Failed to close {}: {}", R::NAME, e);
        }
    }
}
