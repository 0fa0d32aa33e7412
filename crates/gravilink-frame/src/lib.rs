//! 7-byte signal framing for the GraviTrax Connect protocol.
//!
//! Every message on the radio link is a fixed 7-byte frame:
//!
//! ```text
//! [header=19][stone][status][reserved][messageId][checksum][color]
//! ```
//!
//! This crate is the pure half of the stack: deterministic encode/decode
//! with both checksum formulas, extraction of candidate frames from noisy
//! notification payloads, and the bounded duplicate-suppression window.
//! No I/O happens here.

pub mod codec;
pub mod dedup;
pub mod error;
pub mod signal;

pub use codec::{add_checksum, calc_checksum, decode_candidate, scan_frames};
pub use dedup::{DedupWindow, DEDUP_WINDOW};
pub use error::{FrameError, Result};
pub use signal::{
    status_name, stone_name, Color, Signal, FRAME_LEN, HEADER, STATUS_ALL, STATUS_BRIDGE,
    STATUS_LEVER, STATUS_LOCK, STATUS_SOUND, STATUS_STARTER, STATUS_STARTER_PRESS, STATUS_SWITCH,
    STATUS_UNLOCK, STONE_BRIDGE, STONE_CONTROLLER, STONE_FINISH, STONE_STARTER, STONE_TRIGGER,
};
