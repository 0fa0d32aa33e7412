//! Outbound signalling.
//!
//! Delivery is at-least-once by brute force: the link is lossy and carries
//! no acknowledgements, so every signal is written `resends` times and the
//! receiving stones deduplicate. "Success" means the configured writes
//! completed without a transport error, never that a stone heard them.
//!
//! Send operations do not return errors. A failed write is logged and
//! reflected through the caller's [`CancellationToken`], so call chains
//! built around optional connectivity can detect failure without wrapping
//! every send.

use std::time::Duration;

use gravilink_frame::{Color, Signal, STATUS_LOCK, STATUS_UNLOCK, STONE_BRIDGE};
use gravilink_transport::Channel;
use rand::Rng;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::bridge::Bridge;

/// Default resend count for a signal, sized to the stones' dedup window.
pub const DEFAULT_RESENDS: u32 = 12;

/// Knobs for a single signal send.
#[derive(Debug, Clone)]
pub struct SignalOptions {
    /// Stone type stamped into the frame.
    pub stone: u8,
    /// How often the identical frame is written. Higher values cut packet
    /// loss at the cost of throughput.
    pub resends: u32,
    /// Extra delay between resends.
    pub resend_gap: Duration,
    /// Draw the message ID randomly instead of from the session counter.
    pub random_id: bool,
}

impl Default for SignalOptions {
    fn default() -> Self {
        Self {
            stone: STONE_BRIDGE,
            resends: DEFAULT_RESENDS,
            resend_gap: Duration::ZERO,
            random_id: false,
        }
    }
}

impl Bridge {
    /// Write raw bytes to the signal channel, `resends` times.
    ///
    /// The first transport error ends the burst: it is logged and, when a
    /// `failure` token is supplied, cancels it.
    pub async fn send_bytes(
        &self,
        data: &[u8],
        resends: u32,
        resend_gap: Duration,
        failure: Option<&CancellationToken>,
    ) {
        for attempt in 0..resends {
            if let Err(err) = self.inner.transport.write_channel(Channel::Write, data).await {
                if let Some(token) = failure {
                    token.cancel();
                }
                error!(error = %err, "error sending data");
                return;
            }
            if attempt + 1 < resends && !resend_gap.is_zero() {
                time::sleep(resend_gap).await;
            }
        }
    }

    /// Send one signal.
    ///
    /// The reserved byte is drawn fresh per signal. The message ID comes
    /// from the session counter unless `random_id` is set; the counter is
    /// read and advanced as one atomic step, so concurrent senders never
    /// share an ID, though their writes may interleave on the transport.
    pub async fn send_signal(
        &self,
        status: u8,
        color: Color,
        options: &SignalOptions,
        failure: Option<&CancellationToken>,
    ) {
        let reserved = rand::thread_rng().gen_range(0..255u8);
        let message_id = self.next_message_id(options.random_id).await;
        let signal = Signal::outbound(options.stone, status, reserved, message_id, color);
        debug!(status, %color, message_id, "sending signal");
        self.send_bytes(
            &signal.to_bytes(),
            options.resends,
            options.resend_gap,
            failure,
        )
        .await;
    }

    async fn next_message_id(&self, random: bool) -> u8 {
        // Read-increment only; holding the lock across the transport write
        // would serialize concurrent senders.
        let mut next = self.inner.next_send_id.lock().await;
        let id = if random {
            rand::thread_rng().gen_range(0..255u8)
        } else {
            *next
        };
        *next = next.wrapping_add(1);
        id
    }

    /// Send `count` signals spaced `gap` apart, with no delay before the
    /// first.
    ///
    /// With `stop_on_failure`, a cancelled token — set by a failed send in
    /// this batch, or cooperatively by the caller — skips every remaining
    /// send rather than hammering a transport known to be broken. Callers
    /// needing exactly `count` deliveries must retry externally.
    #[allow(clippy::too_many_arguments)]
    pub async fn send_periodic(
        &self,
        status: u8,
        color: Color,
        count: u32,
        gap: Duration,
        options: &SignalOptions,
        stop_on_failure: bool,
        failure: Option<&CancellationToken>,
    ) {
        let token = failure.cloned().unwrap_or_default();
        for sent in 0..count {
            if stop_on_failure && token.is_cancelled() {
                debug!(sent, requested = count, "periodic send stopped after failure");
                return;
            }
            if sent > 0 && !gap.is_zero() {
                time::sleep(gap).await;
            }
            self.send_signal(status, color, options, Some(&token)).await;
        }
    }

    /// Switch all listening power stones into bridge-exclusive mode, where
    /// they only react to bridge signals.
    pub async fn start_bridge_mode(&self) {
        self.send_signal(STATUS_LOCK, Color::Red, &SignalOptions::default(), None)
            .await;
        info!("bridge mode enabled");
    }

    /// Switch power stones back to normal mode.
    pub async fn stop_bridge_mode(&self) {
        self.send_signal(STATUS_UNLOCK, Color::Red, &SignalOptions::default(), None)
            .await;
        info!("bridge mode disabled");
    }
}
