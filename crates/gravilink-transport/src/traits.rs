use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::channel::{Channel, DeviceInfo, Target};
use crate::error::Result;

/// Emitted on the link-event stream whenever the connection closes, whether
/// the close was requested locally or the link dropped on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkDown;

/// The platform-supplied radio link to one bridge.
///
/// One `Transport` value represents one physical device slot: `connect`
/// binds it to a device, and all channel operations act on that device
/// until the link closes. Implementations are expected to be `Arc`-shared
/// between the session and its background tasks.
///
/// Notifications and link events are delivered as channel streams rather
/// than callbacks so that the session can process them on its own task.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Scan for and connect to the bridge identified by `target`.
    ///
    /// `timeout` bounds both the scan and the connection attempt.
    async fn connect(&self, target: &Target, timeout: Duration) -> Result<DeviceInfo>;

    /// Close the connection.
    ///
    /// `timeout` bounds the platform-level close handshake. A completed
    /// close must also emit [`LinkDown`] on the link-event stream.
    async fn disconnect(&self, timeout: Duration) -> Result<()>;

    /// Write `data` to a channel.
    async fn write_channel(&self, channel: Channel, data: &[u8]) -> Result<()>;

    /// Read the current value of a channel.
    async fn read_channel(&self, channel: Channel) -> Result<Bytes>;

    /// Subscribe to notifications on a channel.
    ///
    /// Returns the stream of raw notification payloads. Subscribing a
    /// channel that is already subscribed replaces the previous stream,
    /// which then terminates.
    async fn subscribe(&self, channel: Channel) -> Result<mpsc::Receiver<Bytes>>;

    /// Stop notifications on a channel. Idempotent: unsubscribing a channel
    /// that is not subscribed succeeds.
    async fn unsubscribe(&self, channel: Channel) -> Result<()>;

    /// Stream of link-close events for the current connection.
    ///
    /// Exactly one [`LinkDown`] is delivered per established connection,
    /// after the link has closed for any reason.
    async fn link_events(&self) -> Result<mpsc::Receiver<LinkDown>>;

    /// Whether the link is currently up.
    fn is_connected(&self) -> bool;
}
