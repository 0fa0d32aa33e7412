//! Events delivered to user callbacks.

use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use gravilink_frame::Signal;

use crate::bridge::Bridge;

/// One inbound notification, as delivered to the registered callback.
#[derive(Debug, Clone)]
pub enum Notification {
    /// A decoded protocol signal, with the raw payload it came from.
    Signal { signal: Signal, raw: Bytes },
    /// A payload with no recognizable frames, surfaced as-is.
    Unstructured { raw: Bytes },
}

impl Notification {
    /// The decoded signal, when this is a structured notification.
    pub fn signal(&self) -> Option<&Signal> {
        match self {
            Notification::Signal { signal, .. } => Some(signal),
            Notification::Unstructured { .. } => None,
        }
    }

    /// The raw notification payload.
    pub fn raw(&self) -> &Bytes {
        match self {
            Notification::Signal { raw, .. } | Notification::Unstructured { raw } => raw,
        }
    }
}

/// Why the disconnect callback fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disconnect {
    /// Whether the user asked for the disconnect.
    pub user_initiated: bool,
    /// Whether this invocation reports a timed-out operation (an overlong
    /// close wait, or a failed reconnect) rather than a completed close.
    pub by_timeout: bool,
}

/// Registered notification handler.
pub(crate) type NotifyCallback =
    Arc<dyn Fn(Bridge, Notification) -> BoxFuture<'static, ()> + Send + Sync>;

/// Registered disconnect handler.
pub(crate) type DisconnectCallback = Arc<dyn Fn(&Bridge, Disconnect) + Send + Sync>;
