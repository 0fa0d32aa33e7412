//! The session state machine.
//!
//! A [`Bridge`] owns one logical connection to a GraviTrax Connect bridge:
//! the connection lifecycle, the reconnect policy, the message-ID counter,
//! and the duplicate filter. It is a cheap-`Clone` handle over shared
//! state, so it can be moved into background tasks and user callbacks.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures::FutureExt;
use gravilink_frame::DedupWindow;
use gravilink_transport::{Channel, DeviceInfo, LinkDown, Target, Transport};
use tokio::sync::mpsc;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::error::{BridgeError, Result};
use crate::event::{Disconnect, DisconnectCallback, Notification, NotifyCallback};
use crate::notify;

/// Default bound on the scan plus connection attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(25);

/// Default wait for a requested close to complete.
pub const DEFAULT_DISCONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Fixed bound on an automatic reconnect attempt.
pub const RECONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Recovering from an unexpected link loss.
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => f.write_str("disconnected"),
            ConnectionState::Connecting => f.write_str("connecting"),
            ConnectionState::Connected => f.write_str("connected"),
            ConnectionState::Reconnecting => f.write_str("reconnecting"),
        }
    }
}

/// Connection behavior knobs.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Bound on the scan and the connection attempt.
    pub timeout: Duration,
    /// Automatically reconnect after an unexpected link loss.
    pub reconnect: bool,
    /// Re-subscribe notifications after a successful reconnect, when a
    /// notification callback is registered.
    pub resubscribe: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CONNECT_TIMEOUT,
            reconnect: false,
            resubscribe: true,
        }
    }
}

pub(crate) struct Inner {
    pub(crate) transport: Arc<dyn Transport>,
    state: Mutex<ConnectionState>,
    device: Mutex<Option<DeviceInfo>>,
    versions: Mutex<Option<(u8, u8)>>,
    /// Message ID for the next outbound signal. Locked for the
    /// read-increment only, never across a transport write.
    pub(crate) next_send_id: AsyncMutex<u8>,
    /// Mutated only by the inbound dispatch task.
    pub(crate) dedup: AsyncMutex<DedupWindow>,
    notify_callback: Mutex<Option<NotifyCallback>>,
    dc_callback: Mutex<Option<DisconnectCallback>>,
    user_disconnected: AtomicBool,
    reconnect_enabled: AtomicBool,
    resubscribe: AtomicBool,
}

/// One logical connection to a GraviTrax Connect bridge.
#[derive(Clone)]
pub struct Bridge {
    pub(crate) inner: Arc<Inner>,
}

impl Bridge {
    /// Create a session over a platform-supplied transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                state: Mutex::new(ConnectionState::Disconnected),
                device: Mutex::new(None),
                versions: Mutex::new(None),
                next_send_id: AsyncMutex::new(0),
                dedup: AsyncMutex::new(DedupWindow::new()),
                notify_callback: Mutex::new(None),
                dc_callback: Mutex::new(None),
                user_disconnected: AtomicBool::new(false),
                reconnect_enabled: AtomicBool::new(false),
                resubscribe: AtomicBool::new(true),
            }),
        }
    }

    /// Register the disconnect handler, replacing any previous one.
    ///
    /// The handler fires once per completed close with the initiator
    /// recorded, and additionally with `by_timeout` set when a disconnect
    /// wait or a reconnect attempt times out (see [`Bridge::disconnect`]).
    pub fn set_disconnect_callback<F>(&self, callback: F)
    where
        F: Fn(&Bridge, Disconnect) + Send + Sync + 'static,
    {
        *self.inner.dc_callback.lock().unwrap() = Some(Arc::new(callback));
    }

    /// Remove the disconnect handler.
    pub fn clear_disconnect_callback(&self) {
        *self.inner.dc_callback.lock().unwrap() = None;
    }

    /// Connect to a bridge.
    ///
    /// Only permitted while disconnected; a session carries at most one
    /// connection attempt at a time. On success the device identity
    /// channel is read immediately to populate the firmware/hardware
    /// versions; a failure there is logged but never reverts the
    /// established connection.
    pub async fn connect(&self, target: Target, options: ConnectOptions) -> Result<()> {
        self.inner
            .reconnect_enabled
            .store(options.reconnect, Ordering::SeqCst);
        self.inner
            .resubscribe
            .store(options.resubscribe, Ordering::SeqCst);

        {
            let mut state = self.inner.state.lock().unwrap();
            if *state != ConnectionState::Disconnected {
                warn!(state = %*state, "connect refused: session already active");
                return Err(BridgeError::AlreadyConnected(*state));
            }
            *state = ConnectionState::Connecting;
        }

        debug!(%target, "connecting");
        match self.establish(&target, options.timeout).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.set_state(ConnectionState::Disconnected);
                warn!(error = %err, %target, "failed to connect");
                Err(err)
            }
        }
    }

    /// Bring the link up and arm the session. Shared by connect and
    /// reconnect; the caller owns the state transition on failure.
    async fn establish(&self, target: &Target, timeout: Duration) -> Result<()> {
        let info = self.inner.transport.connect(target, timeout).await?;
        self.inner.user_disconnected.store(false, Ordering::SeqCst);
        *self.inner.device.lock().unwrap() = Some(info.clone());
        let link = self.inner.transport.link_events().await?;
        self.set_state(ConnectionState::Connected);
        info!(address = %info.address, "connected to bridge");
        self.spawn_link_watcher(link);
        if let Err(err) = self.request_bridge_info().await {
            warn!(error = %err, "could not read bridge identity");
        }
        Ok(())
    }

    /// Terminate the connection.
    ///
    /// The close is started as a detached task and keeps running even if
    /// this call gives up waiting: the contract is report early, converge
    /// eventually. On a timely close the disconnect callback fires exactly
    /// once, through the link-down path. If the wait times out and
    /// `notify_on_timeout` is set, the callback additionally fires early
    /// with `by_timeout = true` — callers must tolerate at most two
    /// invocations on that path.
    pub async fn disconnect(&self, timeout: Duration, notify_on_timeout: bool) -> Result<()> {
        if self.state() == ConnectionState::Disconnected {
            error!("disconnecting: no active connection, connect to a bridge first");
            // Fires anyway so scripts that shut down from the callback
            // don't hang on this path.
            self.fire_disconnect(Disconnect {
                user_initiated: true,
                by_timeout: false,
            });
            return Err(BridgeError::NotConnected);
        }

        self.inner.user_disconnected.store(true, Ordering::SeqCst);
        debug!("disconnecting");
        let transport = Arc::clone(&self.inner.transport);
        let close = tokio::spawn(async move { transport.disconnect(timeout).await });
        match time::timeout(timeout, close).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(err))) => Err(err.into()),
            Ok(Err(join_err)) => Err(BridgeError::Transport(
                gravilink_transport::TransportError::Other(format!(
                    "close task failed: {join_err}"
                )),
            )),
            Err(_) => {
                warn!(?timeout, "disconnect is taking longer than the configured wait");
                if notify_on_timeout {
                    self.fire_disconnect(Disconnect {
                        user_initiated: true,
                        by_timeout: true,
                    });
                }
                Err(BridgeError::Timeout(timeout))
            }
        }
    }

    fn spawn_link_watcher(&self, mut link: mpsc::Receiver<LinkDown>) {
        let bridge = self.clone();
        tokio::spawn(async move {
            if link.recv().await.is_some() {
                bridge.handle_link_down().await;
            }
        });
    }

    /// Runs once per established connection, after the link has closed for
    /// any reason.
    async fn handle_link_down(&self) {
        let user = self.inner.user_disconnected.load(Ordering::SeqCst);
        self.set_state(ConnectionState::Disconnected);
        info!(user_initiated = user, "bridge disconnected");
        self.fire_disconnect(Disconnect {
            user_initiated: user,
            by_timeout: false,
        });

        if user || !self.inner.reconnect_enabled.load(Ordering::SeqCst) {
            return;
        }
        let Some(address) = self.address() else {
            warn!("reconnect skipped: no known address");
            return;
        };
        self.set_state(ConnectionState::Reconnecting);
        info!("trying to reconnect");
        let bridge = self.clone();
        tokio::spawn(async move { bridge.reconnect(address).await });
    }

    /// Bounded reconnect against the last known address. Abandons itself
    /// on timeout; the outcome is always observable through the disconnect
    /// callback.
    async fn reconnect(&self, address: String) {
        let target = Target::Address(address);
        match time::timeout(RECONNECT_TIMEOUT, self.establish(&target, RECONNECT_TIMEOUT)).await {
            Ok(Ok(())) => {
                info!("reconnected to bridge");
                if self.inner.resubscribe.load(Ordering::SeqCst) {
                    let callback = self.inner.notify_callback.lock().unwrap().clone();
                    if let Some(callback) = callback {
                        if let Err(err) = self.enable_dispatch(callback).await {
                            warn!(error = %err, "could not restart notifications after reconnect");
                        }
                    }
                }
            }
            Ok(Err(err)) => {
                warn!(error = %err, "could not reconnect to bridge");
                self.reconnect_failed();
            }
            Err(_) => {
                warn!("could not reconnect to bridge: reconnect timed out");
                self.reconnect_failed();
            }
        }
    }

    fn reconnect_failed(&self) {
        self.set_state(ConnectionState::Disconnected);
        self.fire_disconnect(Disconnect {
            user_initiated: false,
            by_timeout: true,
        });
    }

    /// Register the notification handler and subscribe the notify channel.
    ///
    /// At most one handler is active per session; re-registering replaces
    /// the previous one. A dispatch already in progress completes with the
    /// handler that was registered when its payload arrived.
    pub async fn notification_enable<F, Fut>(&self, callback: F) -> Result<()>
    where
        F: Fn(Bridge, Notification) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let callback: NotifyCallback =
            Arc::new(move |bridge, event| callback(bridge, event).boxed());
        self.enable_dispatch(callback).await
    }

    pub(crate) async fn enable_dispatch(&self, callback: NotifyCallback) -> Result<()> {
        if !self.inner.transport.is_connected() {
            error!("enabling notifications failed: no active connection");
            return Err(BridgeError::NotConnected);
        }
        let stream = match self.inner.transport.subscribe(Channel::Notify).await {
            Ok(stream) => stream,
            Err(err) => {
                error!(error = %err, "enabling notifications failed");
                return Err(err.into());
            }
        };
        *self.inner.notify_callback.lock().unwrap() = Some(callback);
        notify::spawn_dispatch(self.clone(), stream);
        info!("notifications enabled");
        Ok(())
    }

    /// Stop notifications.
    ///
    /// Idempotent at the transport level; fails only when there is no
    /// active connection at all. The registered handler stays in place so
    /// a later reconnect can transparently re-enable it.
    pub async fn notification_disable(&self) -> Result<()> {
        if !self.inner.transport.is_connected() {
            error!("disabling notifications failed: no active connection");
            return Err(BridgeError::NotConnected);
        }
        if let Err(err) = self.inner.transport.unsubscribe(Channel::Notify).await {
            error!(error = %err, "disabling notifications failed");
            return Err(err.into());
        }
        info!("notifications disabled");
        Ok(())
    }

    /// Read the firmware and hardware versions from the identity channel.
    ///
    /// Also run automatically on every successful connect; the values are
    /// cached on the session.
    pub async fn request_bridge_info(&self) -> Result<(u8, u8)> {
        let data = self
            .read_channel(Channel::Write, "error requesting bridge information")
            .await?;
        if data.len() < 3 {
            error!(
                len = data.len(),
                "error requesting bridge information: short read"
            );
            return Err(BridgeError::ShortRead { got: data.len() });
        }
        let firmware = data[1];
        let hardware = data[2];
        *self.inner.versions.lock().unwrap() = Some((firmware, hardware));
        info!(firmware, hardware, "bridge version information");
        Ok((firmware, hardware))
    }

    /// Read the raw battery level byte.
    ///
    /// Interpreting the byte (voltage steps, user-facing strings) is left
    /// to the application.
    pub async fn request_battery(&self) -> Result<u8> {
        let data = self
            .read_channel(Channel::Battery, "error requesting battery level")
            .await?;
        debug!(?data, "battery level read");
        data.first()
            .copied()
            .ok_or(BridgeError::ShortRead { got: 0 })
    }

    async fn read_channel(&self, channel: Channel, context: &str) -> Result<Bytes> {
        match self.inner.transport.read_channel(channel).await {
            Ok(data) => Ok(data),
            Err(err) => {
                error!(error = %err, "{}", context);
                Err(err.into())
            }
        }
    }

    /// Whether the link is currently up.
    pub fn is_connected(&self) -> bool {
        self.inner.transport.is_connected()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.lock().unwrap()
    }

    /// Address of the last connected bridge.
    pub fn address(&self) -> Option<String> {
        self.inner
            .device
            .lock()
            .unwrap()
            .as_ref()
            .map(|info| info.address.clone())
    }

    /// Name of the last connected bridge.
    pub fn name(&self) -> Option<String> {
        self.inner
            .device
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|info| info.name.clone())
    }

    /// Firmware version, once the identity channel has been read.
    pub fn firmware(&self) -> Option<u8> {
        self.inner.versions.lock().unwrap().map(|(fw, _)| fw)
    }

    /// Hardware version, once the identity channel has been read.
    pub fn hardware(&self) -> Option<u8> {
        self.inner.versions.lock().unwrap().map(|(_, hw)| hw)
    }

    pub(crate) fn notify_callback(&self) -> Option<NotifyCallback> {
        self.inner.notify_callback.lock().unwrap().clone()
    }

    fn set_state(&self, state: ConnectionState) {
        *self.inner.state.lock().unwrap() = state;
    }

    /// Callback panics stop at this boundary; connection handling must
    /// survive a misbehaving handler.
    fn fire_disconnect(&self, event: Disconnect) {
        let callback = self.inner.dc_callback.lock().unwrap().clone();
        if let Some(callback) = callback {
            if std::panic::catch_unwind(AssertUnwindSafe(|| callback(self, event))).is_err() {
                error!("disconnect callback panicked");
            }
        }
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("state", &self.state())
            .field("device", &*self.inner.device.lock().unwrap())
            .finish()
    }
}
