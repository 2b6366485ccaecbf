#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::unescaped_backticks)]

//! A [`Link`] over a serial port.

use std::{
    io::{self, Read, Write},
    time::Duration,
};

use resotune_core::link::{Link, LinkError};
use serialport::{ClearBuffer, SerialPort};

/// Default timeout of a single read on the port.
///
/// The deadline of a whole exchange is enforced by [`Link::read_exact`], so this only bounds
/// how long one call to [`Link::receive`] may block.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(10);

/// A builder of [`SerialLink`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SerialLinkBuilder {
    /// Port name, e.g. `/dev/ttyAMA2`.
    pub port: String,
    /// Baud rate.
    pub baud: u32,
    /// Timeout of a single read.
    pub read_timeout: Duration,
}

impl SerialLinkBuilder {
    /// Sets the timeout of a single read.
    #[must_use]
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Opens the port and discards any input already pending on it.
    pub fn open(self) -> Result<SerialLink, LinkError> {
        tracing::info!("Opening {} at {} baud", self.port, self.baud);
        let port = serialport::new(&self.port, self.baud)
            .timeout(self.read_timeout)
            .open()
            .map_err(|e| LinkError::Open {
                port: self.port.clone(),
                msg: e.to_string(),
            })?;

        let mut link = SerialLink {
            name: self.port,
            port: Some(port),
        };
        link.discard_pending()?;
        Ok(link)
    }
}

/// A [`Link`] using a serial port.
pub struct SerialLink {
    name: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialLink {
    /// Creates a builder for `port` at `baud`.
    #[must_use]
    pub fn builder(port: impl Into<String>, baud: u32) -> SerialLinkBuilder {
        SerialLinkBuilder {
            port: port.into(),
            baud,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Name of the underlying port.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, LinkError> {
        self.port.as_mut().ok_or(LinkError::Closed)
    }
}

fn received(r: io::Result<usize>) -> Result<usize, LinkError> {
    match r {
        Ok(n) => Ok(n),
        Err(e)
            if matches!(
                e.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
            ) =>
        {
            Ok(0)
        }
        Err(e) => Err(LinkError::io(e)),
    }
}

impl Link for SerialLink {
    fn close(&mut self) -> Result<(), LinkError> {
        let Some(mut port) = self.port.take() else {
            return Ok(());
        };
        tracing::info!("Closing {}", self.name);
        port.flush().map_err(LinkError::io)
    }

    fn send(&mut self, tx: &[u8]) -> Result<(), LinkError> {
        let port = self.port()?;
        port.write_all(tx).map_err(LinkError::io)?;
        port.flush().map_err(LinkError::io)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        let port = self.port()?;
        received(port.read(buf))
    }

    fn discard_pending(&mut self) -> Result<(), LinkError> {
        let port = self.port()?;
        port.clear(ClearBuffer::Input).map_err(LinkError::io)
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}
