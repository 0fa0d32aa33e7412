//! End-to-end session behavior against the in-memory transport.

use std::sync::Arc;
use std::time::Duration;

use gravilink_bridge::{Bridge, BridgeError, ConnectOptions, Disconnect, Notification};
use gravilink_frame::{add_checksum, Color, HEADER, STONE_CONTROLLER, STONE_TRIGGER};
use gravilink_transport::{Channel, MockTransport, Target};
use tokio::sync::mpsc;
use tokio::time;

fn setup() -> (Bridge, Arc<MockTransport>) {
    let transport = Arc::new(MockTransport::new());
    transport.set_read(Channel::Write, vec![0u8, 2, 1]);
    transport.set_read(Channel::Battery, vec![128u8]);
    let bridge = Bridge::new(transport.clone());
    (bridge, transport)
}

/// A wire-correct inbound frame, checksum stamped with the echo formula.
fn inbound_frame(stone: u8, status: u8, reserved: u8, id: u8, color: u8) -> [u8; 7] {
    add_checksum(&[HEADER, stone, status, reserved, id, 0, color], true).unwrap()
}

async fn enable_notifications(bridge: &Bridge) -> mpsc::UnboundedReceiver<Notification> {
    let (tx, rx) = mpsc::unbounded_channel();
    bridge
        .notification_enable(move |_, event| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(event);
            }
        })
        .await
        .unwrap();
    rx
}

async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> Option<T> {
    time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .ok()
        .flatten()
}

#[tokio::test]
async fn full_session_scenario() {
    let (bridge, transport) = setup();
    let (dc_tx, mut dc_rx) = mpsc::unbounded_channel();
    bridge.set_disconnect_callback(move |_, event| {
        let _ = dc_tx.send(event);
    });

    bridge
        .connect(Target::default_name(), ConnectOptions::default())
        .await
        .unwrap();
    let mut notifications = enable_notifications(&bridge).await;

    // Two valid frames back to back in one payload.
    let mut payload = inbound_frame(STONE_TRIGGER, 1, 10, 7, 1).to_vec();
    payload.extend_from_slice(&inbound_frame(STONE_CONTROLLER, 2, 11, 8, 2));
    transport.notify(payload).await;

    let first = recv(&mut notifications).await.unwrap();
    let signal = *first.signal().expect("structured notification");
    assert_eq!(signal.stone, STONE_TRIGGER);
    assert_eq!(signal.status, 1);
    assert_eq!(signal.reserved, 10);
    assert_eq!(signal.message_id, 7);
    assert_eq!(signal.color(), Some(Color::Red));
    assert!(signal.checksum_ok());

    let second = recv(&mut notifications).await.unwrap();
    let signal = *second.signal().expect("structured notification");
    assert_eq!(signal.stone, STONE_CONTROLLER);
    assert_eq!(signal.message_id, 8);
    assert_eq!(signal.color(), Some(Color::Green));

    bridge.disconnect(Duration::from_secs(1), false).await.unwrap();
    assert_eq!(
        recv(&mut dc_rx).await.unwrap(),
        Disconnect {
            user_initiated: true,
            by_timeout: false
        }
    );
    assert!(recv(&mut dc_rx).await.is_none());
}

#[tokio::test]
async fn retransmitted_frames_are_delivered_once() {
    let (bridge, transport) = setup();
    bridge
        .connect(Target::default_name(), ConnectOptions::default())
        .await
        .unwrap();
    let mut notifications = enable_notifications(&bridge).await;

    let frame = inbound_frame(STONE_TRIGGER, 1, 0, 42, 3);
    for _ in 0..5 {
        transport.notify(frame.to_vec()).await;
    }

    let delivered = recv(&mut notifications).await.unwrap();
    assert_eq!(delivered.signal().unwrap().message_id, 42);
    assert!(recv(&mut notifications).await.is_none());
}

#[tokio::test]
async fn checksum_mismatch_is_still_delivered() {
    let (bridge, transport) = setup();
    bridge
        .connect(Target::default_name(), ConnectOptions::default())
        .await
        .unwrap();
    let mut notifications = enable_notifications(&bridge).await;

    let mut frame = inbound_frame(STONE_TRIGGER, 1, 0, 5, 1);
    frame[5] = frame[5].wrapping_add(1);
    transport.notify(frame.to_vec()).await;

    let delivered = recv(&mut notifications).await.unwrap();
    let signal = delivered.signal().unwrap();
    assert!(!signal.checksum_ok());
    assert_eq!(signal.message_id, 5);
}

#[tokio::test]
async fn unstructured_payload_is_surfaced_raw() {
    let (bridge, transport) = setup();
    bridge
        .connect(Target::default_name(), ConnectOptions::default())
        .await
        .unwrap();
    let mut notifications = enable_notifications(&bridge).await;

    transport.notify(vec![0xde, 0xad, 0xbe, 0xef]).await;

    match recv(&mut notifications).await.unwrap() {
        Notification::Unstructured { raw } => {
            assert_eq!(raw.as_ref(), &[0xde, 0xad, 0xbe, 0xef])
        }
        other => panic!("expected unstructured notification, got {other:?}"),
    }
}

#[tokio::test]
async fn garbled_payload_yields_only_embedded_frames() {
    let (bridge, transport) = setup();
    bridge
        .connect(Target::default_name(), ConnectOptions::default())
        .await
        .unwrap();
    let mut notifications = enable_notifications(&bridge).await;

    let mut payload = vec![0x01, 0x02];
    payload.extend_from_slice(&inbound_frame(STONE_TRIGGER, 4, 0, 9, 1));
    payload.extend_from_slice(&[0xff, 0xfe]);
    transport.notify(payload).await;

    let delivered = recv(&mut notifications).await.unwrap();
    assert_eq!(delivered.signal().unwrap().message_id, 9);
    assert!(recv(&mut notifications).await.is_none());
}

#[tokio::test]
async fn reregistering_replaces_the_callback() {
    let (bridge, transport) = setup();
    bridge
        .connect(Target::default_name(), ConnectOptions::default())
        .await
        .unwrap();
    let mut old = enable_notifications(&bridge).await;
    let mut new = enable_notifications(&bridge).await;

    transport
        .notify(inbound_frame(STONE_TRIGGER, 1, 0, 1, 1).to_vec())
        .await;

    assert!(recv(&mut new).await.is_some());
    assert!(recv(&mut old).await.is_none());
}

#[tokio::test]
async fn panicking_notification_callback_does_not_break_dispatch() {
    let (bridge, transport) = setup();
    bridge
        .connect(Target::default_name(), ConnectOptions::default())
        .await
        .unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    bridge
        .notification_enable(move |_, event: Notification| {
            let tx = tx.clone();
            async move {
                if event.signal().map(|signal| signal.message_id) == Some(13) {
                    panic!("handler bug");
                }
                let _ = tx.send(event);
            }
        })
        .await
        .unwrap();

    transport
        .notify(inbound_frame(STONE_TRIGGER, 1, 0, 13, 1).to_vec())
        .await;
    transport
        .notify(inbound_frame(STONE_TRIGGER, 1, 0, 14, 1).to_vec())
        .await;

    let delivered = recv(&mut rx).await.unwrap();
    assert_eq!(delivered.signal().unwrap().message_id, 14);
}

#[tokio::test]
async fn notifications_require_a_connection() {
    let (bridge, _transport) = setup();
    let err = bridge
        .notification_enable(|_, _| async {})
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::NotConnected));

    let err = bridge.notification_disable().await.unwrap_err();
    assert!(matches!(err, BridgeError::NotConnected));
}

#[tokio::test]
async fn disable_stops_delivery_and_is_idempotent() {
    let (bridge, transport) = setup();
    bridge
        .connect(Target::default_name(), ConnectOptions::default())
        .await
        .unwrap();
    let mut notifications = enable_notifications(&bridge).await;

    bridge.notification_disable().await.unwrap();
    bridge.notification_disable().await.unwrap();

    transport
        .notify(inbound_frame(STONE_TRIGGER, 1, 0, 2, 1).to_vec())
        .await;
    assert!(recv(&mut notifications).await.is_none());
}

#[tokio::test]
async fn battery_read_returns_raw_level_byte() {
    let (bridge, _transport) = setup();
    bridge
        .connect(Target::default_name(), ConnectOptions::default())
        .await
        .unwrap();
    assert_eq!(bridge.request_battery().await.unwrap(), 128);
}
