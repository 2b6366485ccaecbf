use thiserror::Error;

/// An error produced by the link.
#[derive(Error, Debug, PartialEq, Clone)]
#[non_exhaustive]
pub enum LinkError {
    /// The port could not be opened.
    #[error("Failed to open {port}: {msg}")]
    Open {
        /// Port name.
        port: String,
        /// Reason reported by the backend.
        msg: String,
    },
    /// The backend failed while reading or writing.
    #[error("{0}")]
    Io(String),
    /// Link is closed.
    #[error("Link is closed")]
    Closed,
    /// Fewer bytes than required arrived before the deadline.
    #[error("Expected {expected} bytes, received {received}")]
    Timeout {
        /// Number of bytes requested.
        expected: usize,
        /// Number of bytes actually received.
        received: usize,
    },
}

impl LinkError {
    /// Creates a [`LinkError::Io`] from any displayable error.
    pub fn io(e: impl std::fmt::Display) -> Self {
        Self::Io(e.to_string())
    }

    /// Returns `true` if the error is a [`LinkError::Timeout`].
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
