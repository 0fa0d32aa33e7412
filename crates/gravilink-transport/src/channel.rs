//! Fixed channel addressing.
//!
//! The bridge exposes exactly four characteristics. Anything beyond this
//! layout is out of scope for the protocol stack.

use std::fmt;

/// Advertised name of an unrenamed bridge.
pub const DEFAULT_BRIDGE_NAME: &str = "GravitraxConnect";

/// Outbound signal writes.
pub const UUID_WRITE: &str = "0000ff02-0000-1000-8000-00805f9b34fb";

/// Inbound signal notifications.
pub const UUID_NOTIFY: &str = "0000ff03-0000-1000-8000-00805f9b34fb";

/// Battery level reads.
pub const UUID_BATTERY: &str = "00002a19-0000-1000-8000-00805f9b34fb";

/// Device name reads.
pub const UUID_DEVICE_NAME: &str = "00002a00-0000-1000-8000-00805f9b34fb";

/// One of the bridge's fixed characteristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Signal writes; also carries the firmware/hardware identity on read.
    Write,
    /// Signal notifications.
    Notify,
    /// Battery level.
    Battery,
    /// Device name.
    DeviceName,
}

impl Channel {
    /// The GATT characteristic UUID backing this channel.
    pub fn uuid(self) -> &'static str {
        match self {
            Channel::Write => UUID_WRITE,
            Channel::Notify => UUID_NOTIFY,
            Channel::Battery => UUID_BATTERY,
            Channel::DeviceName => UUID_DEVICE_NAME,
        }
    }

    /// Returns a human-readable name for the channel.
    pub fn name(self) -> &'static str {
        match self {
            Channel::Write => "WRITE",
            Channel::Notify => "NOTIFY",
            Channel::Battery => "BATTERY",
            Channel::DeviceName => "DEVICE_NAME",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How to identify the bridge to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Match by advertised device name.
    Name(String),
    /// Match by MAC address (or platform equivalent).
    Address(String),
}

impl Target {
    /// Target the default bridge name.
    pub fn default_name() -> Self {
        Target::Name(DEFAULT_BRIDGE_NAME.to_string())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Name(name) => write!(f, "name \"{name}\""),
            Target::Address(addr) => write!(f, "address {addr}"),
        }
    }
}

/// Identity of a connected bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Advertised name, when the platform reports one.
    pub name: Option<String>,
    /// MAC address (or platform equivalent).
    pub address: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_uuids_are_distinct() {
        let all = [
            Channel::Write,
            Channel::Notify,
            Channel::Battery,
            Channel::DeviceName,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.uuid(), b.uuid());
            }
        }
    }

    #[test]
    fn channel_names() {
        assert_eq!(Channel::Write.name(), "WRITE");
        assert_eq!(Channel::Notify.to_string(), "NOTIFY");
    }

    #[test]
    fn target_display() {
        assert_eq!(
            Target::default_name().to_string(),
            "name \"GravitraxConnect\""
        );
        assert_eq!(
            Target::Address("AA:BB:CC:DD:EE:FF".into()).to_string(),
            "address AA:BB:CC:DD:EE:FF"
        );
    }
}
