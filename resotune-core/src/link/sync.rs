use std::time::{Duration, Instant};

use super::error::LinkError;

/// Largest number of bytes requested from [`Link::receive`] at once.
const READ_CHUNK: usize = 4096;

/// Back-off before polling again after [`Link::receive`] returned nothing.
pub const IDLE_POLL: Duration = Duration::from_micros(100);

/// A trait that provides the byte-oriented interface with the device.
///
/// Implementors provide the primitive operations. [`Link::read_exact`] is built on top of
/// [`Link::receive`] so that every backend shares the same deadline semantics.
pub trait Link {
    /// Closes the link.
    fn close(&mut self) -> Result<(), LinkError>;

    /// Writes all bytes and blocks until the output buffer is drained.
    fn send(&mut self, tx: &[u8]) -> Result<(), LinkError>;

    /// Reads at most `buf.len()` bytes.
    ///
    /// Returns `0` if nothing arrived within the backend's own per-read timeout.
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError>;

    /// Drops any buffered input without blocking.
    fn discard_pending(&mut self) -> Result<(), LinkError>;

    /// Checks if the link is open.
    #[must_use]
    fn is_open(&self) -> bool;

    /// Returns [`LinkError::Closed`] if the link is not open.
    fn ensure_is_open(&self) -> Result<(), LinkError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(LinkError::Closed)
        }
    }

    /// Reads exactly `n` bytes.
    ///
    /// Blocks until `n` bytes have been accumulated or `timeout` has elapsed on a monotonic
    /// clock. A short read is never returned: it fails with [`LinkError::Timeout`]. The
    /// result grows as bytes arrive, so a bogus `n` does not allocate up front.
    fn read_exact(&mut self, n: usize, timeout: Duration) -> Result<Vec<u8>, LinkError> {
        self.ensure_is_open()?;

        let mut buf = Vec::with_capacity(n.min(READ_CHUNK));
        let mut chunk = [0u8; READ_CHUNK];
        let start = Instant::now();
        while buf.len() < n {
            let want = (n - buf.len()).min(READ_CHUNK);
            let got = self.receive(&mut chunk[..want])?;
            buf.extend_from_slice(&chunk[..got]);
            if buf.len() == n {
                break;
            }
            if start.elapsed() >= timeout {
                tracing::trace!("read_exact timed out: {}/{} bytes", buf.len(), n);
                return Err(LinkError::Timeout {
                    expected: n,
                    received: buf.len(),
                });
            }
            if got == 0 {
                std::thread::sleep(IDLE_POLL);
            }
        }
        Ok(buf)
    }
}

impl Link for Box<dyn Link> {
    fn close(&mut self) -> Result<(), LinkError> {
        self.as_mut().close()
    }

    fn send(&mut self, tx: &[u8]) -> Result<(), LinkError> {
        self.as_mut().send(tx)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        self.as_mut().receive(buf)
    }

    fn discard_pending(&mut self) -> Result<(), LinkError> {
        self.as_mut().discard_pending()
    }

    fn is_open(&self) -> bool {
        self.as_ref().is_open()
    }
}

impl<L: Link + ?Sized> Link for &mut L {
    fn close(&mut self) -> Result<(), LinkError> {
        (**self).close()
    }

    fn send(&mut self, tx: &[u8]) -> Result<(), LinkError> {
        (**self).send(tx)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        (**self).receive(buf)
    }

    fn discard_pending(&mut self) -> Result<(), LinkError> {
        (**self).discard_pending()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}
