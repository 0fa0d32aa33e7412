//! Inbound notification dispatch.
//!
//! One task per subscription drains the raw payload stream sequentially: a
//! payload is fully handled — scanned, deduplicated, decoded, delivered —
//! before the next one is looked at. This ordering is what keeps the
//! duplicate window's FIFO semantics intact without extra locking.

use std::panic::AssertUnwindSafe;

use bytes::Bytes;
use futures::FutureExt;
use gravilink_frame::{scan_frames, Signal};
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::bridge::Bridge;
use crate::event::{Notification, NotifyCallback};

pub(crate) fn spawn_dispatch(bridge: Bridge, mut stream: mpsc::Receiver<Bytes>) {
    tokio::spawn(async move {
        while let Some(payload) = stream.recv().await {
            dispatch_payload(&bridge, payload).await;
        }
        debug!("notification stream ended");
    });
}

async fn dispatch_payload(bridge: &Bridge, payload: Bytes) {
    // The handler registered when the payload arrived handles everything
    // in it, even if it is swapped out mid-dispatch.
    let Some(callback) = bridge.notify_callback() else {
        return;
    };

    let frames = scan_frames(&payload);
    if frames.is_empty() {
        deliver(
            bridge,
            &callback,
            Notification::Unstructured {
                raw: payload.clone(),
            },
        )
        .await;
        return;
    }

    let mut dedup = bridge.inner.dedup.lock().await;
    for frame in frames {
        // A frame the bridge retransmitted for reliability is dropped
        // before anything else looks at it.
        if !dedup.accept(frame) {
            continue;
        }
        let signal = match Signal::decode(&frame) {
            Ok(signal) => signal,
            Err(err) => {
                debug!(error = %err, "scanner produced an undecodable frame");
                continue;
            }
        };
        if !signal.checksum_ok() {
            // Matches the bridge's observed behavior: the mismatch is
            // reported but the signal is still delivered. Flagged in
            // DESIGN.md pending clarification.
            debug!(
                message_id = signal.message_id,
                checksum = signal.checksum,
                "incoming signal has an incorrect checksum"
            );
        }
        deliver(
            bridge,
            &callback,
            Notification::Signal {
                signal,
                raw: payload.clone(),
            },
        )
        .await;
    }
}

/// Callback panics stop at this boundary; the dispatch loop must survive a
/// misbehaving handler.
async fn deliver(bridge: &Bridge, callback: &NotifyCallback, event: Notification) {
    let invocation = callback(bridge.clone(), event);
    if AssertUnwindSafe(invocation).catch_unwind().await.is_err() {
        error!("notification callback panicked");
    }
}
