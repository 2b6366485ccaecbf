use std::collections::VecDeque;

use resotune_core::{
    frame::{Frame, FRAME_SIZE},
    link::{Link, LinkError},
};
use resotune_driver::role::Role;
use zerocopy::IntoBytes;

use crate::firmware::{Firmware, Reply};

struct PendingRaw<C> {
    cmd: C,
    ack: Frame,
    len: usize,
}

/// A [`Link`] that feeds a [`Firmware`] in-process.
///
/// Bytes sent are parsed exactly as the firmware parses its UART: fixed-size frames, except
/// after a request answered with [`Reply::Raw`], where the next bytes are the raw payload.
pub struct Emulated<F: Firmware> {
    firmware: F,
    is_open: bool,
    broken: bool,
    tx: Vec<u8>,
    rx: VecDeque<u8>,
    raw: Option<PendingRaw<<F::Role as Role>::Command>>,
}

impl<F: Firmware> std::ops::Deref for Emulated<F> {
    type Target = F;

    fn deref(&self) -> &Self::Target {
        &self.firmware
    }
}

impl<F: Firmware> std::ops::DerefMut for Emulated<F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.firmware
    }
}

impl<F: Firmware> Emulated<F> {
    /// Creates an open link to `firmware`.
    pub fn new(firmware: F) -> Self {
        Self {
            firmware,
            is_open: true,
            broken: false,
            tx: Vec::new(),
            rx: VecDeque::new(),
            raw: None,
        }
    }

    /// Makes the firmware ignore every byte until [`Self::repair`].
    pub fn break_down(&mut self) {
        self.broken = true;
    }

    /// Undoes [`Self::break_down`].
    pub fn repair(&mut self) {
        self.broken = false;
    }

    /// Queues the firmware's power-on output as unsolicited input.
    pub fn reboot(&mut self) {
        self.tx.clear();
        self.raw = None;
        let banner = self.firmware.banner();
        self.rx.extend(banner);
    }

    /// Number of bytes waiting to be received.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    fn process(&mut self) {
        loop {
            if let Some(raw) = self.raw.take() {
                if self.tx.len() < raw.len {
                    self.raw = Some(raw);
                    return;
                }
                let payload = self.tx.drain(..raw.len).collect::<Vec<_>>();
                self.firmware.raw(raw.cmd, &payload);
                self.rx.extend(raw.ack.as_bytes());
                continue;
            }

            if self.tx.len() < FRAME_SIZE {
                return;
            }
            let bytes = self.tx.drain(..FRAME_SIZE).collect::<Vec<_>>();
            let Ok(request) = Frame::decode(&bytes) else {
                return;
            };
            let id = request.command().id();
            let Some(cmd) = <F::Role as Role>::command(id) else {
                tracing::warn!("{}: unknown command {:#X}", <F::Role as Role>::NAME, id);
                continue;
            };

            match self.firmware.handle(cmd, &request) {
                Reply::Value(value) => {
                    self.rx.extend(Frame::new(request.command(), value).as_bytes());
                }
                Reply::Raw { expect } => {
                    self.rx.extend(request.as_bytes());
                    self.raw = Some(PendingRaw {
                        cmd,
                        ack: request,
                        len: expect,
                    });
                }
                Reply::Buffer(buf) => {
                    self.rx
                        .extend(Frame::new(request.command(), buf.len() as u32).as_bytes());
                    self.rx.extend(buf);
                }
                Reply::Silent => {}
            }
        }
    }
}

impl<F: Firmware> Link for Emulated<F> {
    fn close(&mut self) -> Result<(), LinkError> {
        self.is_open = false;
        Ok(())
    }

    fn send(&mut self, tx: &[u8]) -> Result<(), LinkError> {
        self.ensure_is_open()?;
        if self.broken {
            return Ok(());
        }
        self.tx.extend_from_slice(tx);
        self.process();
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        self.ensure_is_open()?;
        let n = buf.len().min(self.rx.len());
        buf.iter_mut()
            .zip(self.rx.drain(..n))
            .for_each(|(b, v)| *b = v);
        Ok(n)
    }

    fn discard_pending(&mut self) -> Result<(), LinkError> {
        self.ensure_is_open()?;
        self.rx.clear();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.is_open
    }
}
