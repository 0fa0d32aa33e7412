use std::time::Duration;

use crate::channel::Channel;

/// Errors that can occur in radio transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No device matched the connect target before the scan timeout.
    #[error("no bridge found matching {target}")]
    DeviceNotFound { target: String },

    /// The connection attempt did not complete in time.
    #[error("failed to connect within {0:?}")]
    ConnectTimeout(Duration),

    /// An operation that needs an active connection was invoked without one.
    #[error("no active connection")]
    NotConnected,

    /// The channel is not subscribed.
    #[error("channel {0} is not subscribed")]
    NotSubscribed(Channel),

    /// An I/O error occurred on the radio link.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A platform-specific failure the stack cannot classify further.
    #[error("transport error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;
