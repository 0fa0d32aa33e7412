//! Radio transport boundary for GraviTrax Connect bridges.
//!
//! The bridge is reachable over an unreliable, low-bandwidth radio link
//! exposing a fixed set of addressable channels. This crate defines that
//! boundary: the [`Transport`] trait the host platform implements, the
//! [`Channel`] addressing for the fixed characteristics, and the transport
//! error taxonomy. Everything else in gravilink builds on top of it.
//!
//! The `mock` feature adds a scriptable in-memory transport for tests.

pub mod channel;
pub mod error;
pub mod traits;

#[cfg(feature = "mock")]
pub mod mock;

pub use channel::{Channel, DeviceInfo, Target, DEFAULT_BRIDGE_NAME};
pub use error::{Result, TransportError};
pub use traits::{LinkDown, Transport};

#[cfg(feature = "mock")]
pub use mock::MockTransport;
