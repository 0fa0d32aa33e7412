//! Session management and reliable signalling for GraviTrax Connect
//! bridges.
//!
//! This is the "just works" layer. Connect to a bridge over a
//! platform-supplied [`Transport`](gravilink_transport::Transport), send
//! signals with resend-based reliability, and receive decoded,
//! de-duplicated notifications through a registered callback — with
//! optional automatic reconnection after link loss.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use gravilink_bridge::{Bridge, ConnectOptions, SignalOptions};
//! use gravilink_frame::{Color, STATUS_ALL};
//! use gravilink_transport::{Target, Transport};
//!
//! async fn run(transport: Arc<dyn Transport>) -> gravilink_bridge::Result<()> {
//!     let bridge = Bridge::new(transport);
//!     bridge.connect(Target::default_name(), ConnectOptions::default()).await?;
//!     bridge
//!         .send_signal(STATUS_ALL, Color::Red, &SignalOptions::default(), None)
//!         .await;
//!     bridge.disconnect(Duration::from_secs(20), false).await?;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod error;
pub mod event;
mod notify;
pub mod send;

pub use bridge::{
    Bridge, ConnectOptions, ConnectionState, DEFAULT_CONNECT_TIMEOUT, DEFAULT_DISCONNECT_TIMEOUT,
    RECONNECT_TIMEOUT,
};
pub use error::{BridgeError, Result};
pub use event::{Disconnect, Notification};
pub use send::{SignalOptions, DEFAULT_RESENDS};
