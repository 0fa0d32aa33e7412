//! Send a few signals through the in-memory mock transport.
//!
//! Run with:
//!   cargo run --example send-signals
//!
//! Swap `MockTransport` for a platform transport implementation to drive a
//! real bridge.

use std::sync::Arc;
use std::time::Duration;

use gravilink::bridge::{Bridge, ConnectOptions, SignalOptions};
use gravilink::frame::{Color, STATUS_ALL, STATUS_SWITCH};
use gravilink::transport::{Channel, Target};
use gravilink_transport::MockTransport;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .init();

    let transport = Arc::new(MockTransport::new());
    transport.set_read(Channel::Write, vec![0u8, 2, 1]);

    let bridge = Bridge::new(transport.clone());
    bridge
        .connect(Target::default_name(), ConnectOptions::default())
        .await?;
    eprintln!(
        "Connected to {} (firmware {:?}, hardware {:?})",
        bridge.address().unwrap_or_default(),
        bridge.firmware(),
        bridge.hardware()
    );

    // One green signal for everyone, then a red burst for the switches.
    bridge
        .send_signal(STATUS_ALL, Color::Green, &SignalOptions::default(), None)
        .await;
    bridge
        .send_periodic(
            STATUS_SWITCH,
            Color::Red,
            3,
            Duration::from_millis(100),
            &SignalOptions::default(),
            true,
            None,
        )
        .await;

    eprintln!("Wrote {} frames to the wire", transport.written_frames().len());

    bridge.disconnect(Duration::from_secs(5), false).await?;
    Ok(())
}
