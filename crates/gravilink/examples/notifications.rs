//! Receive and decode notifications from the in-memory mock transport.
//!
//! Run with:
//!   cargo run --example notifications

use std::sync::Arc;
use std::time::Duration;

use gravilink::bridge::{Bridge, ConnectOptions, Notification};
use gravilink::frame::{add_checksum, status_name, stone_name, HEADER, STONE_TRIGGER};
use gravilink::transport::{Channel, Target};
use gravilink_transport::MockTransport;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::INFO)
        .init();

    let transport = Arc::new(MockTransport::new());
    transport.set_read(Channel::Write, vec![0u8, 2, 1]);

    let bridge = Bridge::new(transport.clone());
    bridge
        .connect(Target::default_name(), ConnectOptions::default())
        .await?;

    bridge
        .notification_enable(|_, event| async move {
            match event {
                Notification::Signal { signal, .. } => eprintln!(
                    "signal: stone={} status={} id={} color={:?}",
                    stone_name(signal.stone),
                    status_name(signal.status),
                    signal.message_id,
                    signal.color()
                ),
                Notification::Unstructured { raw } => {
                    eprintln!("unstructured payload: {raw:02x?}")
                }
            }
        })
        .await?;

    // A trigger stone firing on red, echoed by the bridge.
    let frame = add_checksum(&[HEADER, STONE_TRIGGER, 1, 0, 1, 0, 1], true)
        .expect("frame is 7 bytes");
    transport.notify(frame.to_vec()).await;
    // Something that is not a signal at all.
    transport.notify(vec![0x42, 0x42]).await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    bridge.disconnect(Duration::from_secs(5), false).await?;
    Ok(())
}
