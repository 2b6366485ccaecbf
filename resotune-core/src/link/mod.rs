mod error;
mod sync;

/// Default per-operation read timeout.
pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(1);

pub use error::LinkError;
#[doc(inline)]
pub use sync::*;
