//! Signal data model and protocol constants.
//!
//! Stone and status bytes are device-defined enumerations with a handful of
//! named values and an open numeric range, so they stay raw `u8` fields on
//! [`Signal`]; the named values live here as constants with name lookups.

use std::fmt;

use crate::codec;
use crate::error::{FrameError, Result};

/// Protocol marker carried by every valid frame.
pub const HEADER: u8 = 19;

/// Wire size of one frame.
pub const FRAME_LEN: usize = 7;

/// Trigger stone.
pub const STONE_TRIGGER: u8 = 1;
/// Finish stone.
pub const STONE_FINISH: u8 = 2;
/// Starter stone.
pub const STONE_STARTER: u8 = 4;
/// Controller handset.
pub const STONE_CONTROLLER: u8 = 5;
/// Connect bridge. Default source for outbound signals.
pub const STONE_BRIDGE: u8 = 6;

/// All stones react.
pub const STATUS_ALL: u8 = 0;
/// Starter stones react.
pub const STATUS_STARTER: u8 = 1;
/// Switch stones react.
pub const STATUS_SWITCH: u8 = 2;
/// Bridge stones react.
pub const STATUS_BRIDGE: u8 = 3;
/// Sound stones react.
pub const STATUS_SOUND: u8 = 4;
/// Lever stones react.
pub const STATUS_LEVER: u8 = 6;
/// Leave bridge-exclusive mode.
pub const STATUS_UNLOCK: u8 = 200;
/// Enter bridge-exclusive mode.
pub const STATUS_LOCK: u8 = 201;
/// A starter was pressed.
pub const STATUS_STARTER_PRESS: u8 = 202;

/// Returns a human-readable name for a stone byte.
pub fn stone_name(stone: u8) -> &'static str {
    match stone {
        STONE_TRIGGER => "trigger",
        STONE_FINISH => "finish",
        STONE_STARTER => "starter",
        STONE_CONTROLLER => "controller",
        STONE_BRIDGE => "bridge",
        _ => "unknown",
    }
}

/// Returns a human-readable name for a status byte.
pub fn status_name(status: u8) -> &'static str {
    match status {
        STATUS_ALL => "ALL",
        STATUS_STARTER => "STARTER",
        STATUS_SWITCH => "SWITCH",
        STATUS_BRIDGE => "BRIDGE",
        STATUS_SOUND => "SOUND",
        STATUS_LEVER => "LEVER",
        STATUS_UNLOCK => "UNLOCK",
        STATUS_LOCK => "LOCK",
        STATUS_STARTER_PRESS => "STARTER_PRESS",
        _ => "UNKNOWN",
    }
}

/// Color channel of a signal. Zero on the wire means invalid/absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Color {
    Red = 1,
    Green = 2,
    Blue = 3,
}

impl TryFrom<u8> for Color {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, u8> {
        match value {
            1 => Ok(Color::Red),
            2 => Ok(Color::Green),
            3 => Ok(Color::Blue),
            other => Err(other),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => f.write_str("red"),
            Color::Green => f.write_str("green"),
            Color::Blue => f.write_str("blue"),
        }
    }
}

/// One decoded protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal {
    /// Protocol marker; 19 for all valid frames.
    pub header: u8,
    /// Logical source/target class.
    pub stone: u8,
    /// Which stones react to the signal.
    pub status: u8,
    /// Free-form payload byte, round-tripped but not interpreted.
    pub reserved: u8,
    /// Sequence number, wraps at 256.
    pub message_id: u8,
    /// As carried on the wire; see [`Signal::checksum_ok`].
    pub checksum: u8,
    /// 1 = red, 2 = green, 3 = blue; 0 invalid/absent.
    pub color: u8,
}

impl Signal {
    /// Build an outbound signal, stamping the outbound checksum.
    pub fn outbound(stone: u8, status: u8, reserved: u8, message_id: u8, color: Color) -> Self {
        let frame = [HEADER, stone, status, reserved, message_id, 0, color as u8];
        let checksum = codec::calc_checksum(&frame, false).unwrap_or(0);
        Self {
            header: HEADER,
            stone,
            status,
            reserved,
            message_id,
            checksum,
            color: color as u8,
        }
    }

    /// Decode a 7-byte candidate frame. See [`codec::decode_candidate`].
    pub fn decode(frame: &[u8]) -> Result<Self> {
        codec::decode_candidate(frame)
    }

    /// Serialize to the 7-byte wire form.
    pub fn to_bytes(&self) -> [u8; FRAME_LEN] {
        [
            self.header,
            self.stone,
            self.status,
            self.reserved,
            self.message_id,
            self.checksum,
            self.color,
        ]
    }

    /// Whether the carried checksum matches the inbound formula.
    ///
    /// The session logs mismatches but still delivers the signal; callers
    /// wanting a strict policy can check this themselves.
    pub fn checksum_ok(&self) -> bool {
        codec::calc_checksum(&self.to_bytes(), true) == Some(self.checksum)
    }

    /// The color channel, when the byte names a valid color.
    pub fn color(&self) -> Option<Color> {
        Color::try_from(self.color).ok()
    }
}

impl TryFrom<&[u8]> for Signal {
    type Error = FrameError;

    fn try_from(frame: &[u8]) -> Result<Self> {
        Self::decode(frame)
    }
}
