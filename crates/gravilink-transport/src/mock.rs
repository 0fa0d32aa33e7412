//! Scriptable in-memory transport for tests and examples.
//!
//! `MockTransport` implements [`Transport`] against plain process memory:
//! written payloads are recorded, notification payloads and link loss are
//! injected by the test, and reads/writes/connects can be scripted to fail.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::channel::{Channel, DeviceInfo, Target};
use crate::error::{Result, TransportError};
use crate::traits::{LinkDown, Transport};

const EVENT_BUFFER: usize = 32;

#[derive(Default)]
struct Script {
    fail_connect: bool,
    connect_delay: Option<Duration>,
    disconnect_delay: Option<Duration>,
    reads: HashMap<Channel, Bytes>,
    /// Writes remaining before every further write fails. `None` never fails.
    writes_before_failure: Option<u32>,
}

#[derive(Default)]
struct State {
    connected_to: Option<DeviceInfo>,
    writes: Vec<(Channel, Vec<u8>)>,
    subscriptions: HashMap<Channel, mpsc::Sender<Bytes>>,
    link_tx: Option<mpsc::Sender<LinkDown>>,
    connects: Vec<Target>,
}

/// In-memory [`Transport`] double.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<Script>,
    state: Mutex<State>,
    connected: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent connect attempt fail with `DeviceNotFound`.
    pub fn fail_connects(&self, fail: bool) {
        self.script.lock().unwrap().fail_connect = fail;
    }

    /// Delay connect completion, to exercise caller-side timeouts.
    pub fn delay_connects(&self, delay: Duration) {
        self.script.lock().unwrap().connect_delay = Some(delay);
    }

    /// Delay disconnect completion, to exercise the disconnect-timeout path.
    pub fn delay_disconnects(&self, delay: Duration) {
        self.script.lock().unwrap().disconnect_delay = Some(delay);
    }

    /// Script the value returned by reads of `channel`.
    pub fn set_read(&self, channel: Channel, data: impl Into<Bytes>) {
        self.script.lock().unwrap().reads.insert(channel, data.into());
    }

    /// Let `count` more writes succeed, then fail every one after that.
    pub fn fail_writes_after(&self, count: u32) {
        self.script.lock().unwrap().writes_before_failure = Some(count);
    }

    /// All writes recorded so far, in order.
    pub fn writes(&self) -> Vec<(Channel, Vec<u8>)> {
        self.state.lock().unwrap().writes.clone()
    }

    /// Payloads written to [`Channel::Write`], in order.
    pub fn written_frames(&self) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .writes
            .iter()
            .filter(|(channel, _)| *channel == Channel::Write)
            .map(|(_, data)| data.clone())
            .collect()
    }

    /// Targets passed to connect attempts, in order.
    pub fn connect_targets(&self) -> Vec<Target> {
        self.state.lock().unwrap().connects.clone()
    }

    /// Whether `channel` currently has a live subscription.
    pub fn is_subscribed(&self, channel: Channel) -> bool {
        self.state
            .lock()
            .unwrap()
            .subscriptions
            .contains_key(&channel)
    }

    /// Inject a raw notification payload on `channel`.
    ///
    /// Dropped silently if the channel is not subscribed, like a radio
    /// packet nobody listens for.
    pub async fn notify_on(&self, channel: Channel, payload: impl Into<Bytes>) {
        let tx = self
            .state
            .lock()
            .unwrap()
            .subscriptions
            .get(&channel)
            .cloned();
        if let Some(tx) = tx {
            let _ = tx.send(payload.into()).await;
        }
    }

    /// Inject a raw notification payload on [`Channel::Notify`].
    pub async fn notify(&self, payload: impl Into<Bytes>) {
        self.notify_on(Channel::Notify, payload).await;
    }

    /// Drop the link out from under the session, as radio loss would.
    pub async fn drop_link(&self) {
        self.close_link().await;
    }

    async fn close_link(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let (link_tx, subscriptions) = {
            let mut state = self.state.lock().unwrap();
            state.connected_to = None;
            (state.link_tx.take(), std::mem::take(&mut state.subscriptions))
        };
        // Subscriptions die with the link.
        drop(subscriptions);
        if let Some(tx) = link_tx {
            let _ = tx.send(LinkDown).await;
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, target: &Target, _timeout: Duration) -> Result<DeviceInfo> {
        let (fail, delay) = {
            let script = self.script.lock().unwrap();
            (script.fail_connect, script.connect_delay)
        };
        self.state.lock().unwrap().connects.push(target.clone());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(TransportError::DeviceNotFound {
                target: target.to_string(),
            });
        }

        let info = DeviceInfo {
            name: Some("GravitraxConnect".to_string()),
            address: match target {
                Target::Address(addr) => addr.clone(),
                Target::Name(_) => "AA:BB:CC:DD:EE:FF".to_string(),
            },
        };
        self.state.lock().unwrap().connected_to = Some(info.clone());
        self.connected.store(true, Ordering::SeqCst);
        Ok(info)
    }

    async fn disconnect(&self, _timeout: Duration) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        let delay = self.script.lock().unwrap().disconnect_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.close_link().await;
        Ok(())
    }

    async fn write_channel(&self, channel: Channel, data: &[u8]) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        {
            let mut script = self.script.lock().unwrap();
            if let Some(remaining) = script.writes_before_failure.as_mut() {
                if *remaining == 0 {
                    return Err(TransportError::Other("scripted write failure".into()));
                }
                *remaining -= 1;
            }
        }
        self.state
            .lock()
            .unwrap()
            .writes
            .push((channel, data.to_vec()));
        Ok(())
    }

    async fn read_channel(&self, channel: Channel) -> Result<Bytes> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        self.script
            .lock()
            .unwrap()
            .reads
            .get(&channel)
            .cloned()
            .ok_or_else(|| TransportError::Other(format!("no scripted read for {channel}")))
    }

    async fn subscribe(&self, channel: Channel) -> Result<mpsc::Receiver<Bytes>> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        self.state
            .lock()
            .unwrap()
            .subscriptions
            .insert(channel, tx);
        Ok(rx)
    }

    async fn unsubscribe(&self, channel: Channel) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        self.state.lock().unwrap().subscriptions.remove(&channel);
        Ok(())
    }

    async fn link_events(&self) -> Result<mpsc::Receiver<LinkDown>> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        self.state.lock().unwrap().link_tx = Some(tx);
        Ok(rx)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
