use std::time::Duration;

use resotune_core::link::DEFAULT_TIMEOUT;

/// The option of [`Device`].
///
/// [`Device`]: crate::device::Device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeviceOption {
    /// Deadline of every read from the link.
    pub timeout: Duration,
}

impl Default for DeviceOption {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}
