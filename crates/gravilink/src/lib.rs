//! Client protocol stack for GraviTrax Connect bridges.
//!
//! gravilink speaks the bridge's 7-byte signal protocol over a
//! platform-supplied radio transport: checksum framing, message-ID
//! sequencing, duplicate suppression, resend-based reliability, and
//! automatic reconnection.
//!
//! # Crate Structure
//!
//! - [`transport`] — The radio transport boundary (trait, channels, mock)
//! - [`frame`] — 7-byte signal framing and duplicate suppression
//! - [`bridge`] — Session management and reliable signalling (behind the
//!   `bridge` feature)

/// Re-export transport types.
pub mod transport {
    pub use gravilink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use gravilink_frame::*;
}

/// Re-export session types (requires `bridge` feature).
#[cfg(feature = "bridge")]
pub mod bridge {
    pub use gravilink_bridge::*;
}
