use std::time::Duration;

use gravilink_transport::TransportError;

use crate::bridge::ConnectionState;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// A connect was attempted while the session is not idle.
    #[error("session already active (state {0})")]
    AlreadyConnected(ConnectionState),

    /// An operation that needs an active connection was invoked without one.
    #[error("no active connection")]
    NotConnected,

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The operation did not complete in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// A channel read returned fewer bytes than the protocol requires.
    #[error("short read ({got} bytes)")]
    ShortRead { got: usize },
}

pub type Result<T> = std::result::Result<T, BridgeError>;
