//! Frame encode/decode and payload scanning.
//!
//! Two checksum formulas exist on purpose: the bridge re-stamps the
//! checksum differently when it echoes a signal, folding in the color byte
//! minus one. Outbound frames use the plain sum, inbound validation uses
//! the echoed form.

use crate::error::{FrameError, Result};
use crate::signal::{Signal, FRAME_LEN, HEADER};

/// Calculate the checksum for a 7-byte frame.
///
/// Outbound: `(header + stone + status + reserved + messageId) mod 256`.
/// Inbound adds `color - 1` on top. Returns `None` for any length other
/// than 7.
pub fn calc_checksum(frame: &[u8], inbound: bool) -> Option<u8> {
    if frame.len() != FRAME_LEN {
        return None;
    }
    let mut checksum = frame[..5]
        .iter()
        .fold(0u8, |sum, byte| sum.wrapping_add(*byte));
    if inbound {
        checksum = checksum.wrapping_add(frame[6]).wrapping_sub(1);
    }
    Some(checksum)
}

/// Return `frame` with its checksum byte stamped in.
///
/// Returns `None` for any length other than 7.
pub fn add_checksum(frame: &[u8], inbound: bool) -> Option<[u8; FRAME_LEN]> {
    let checksum = calc_checksum(frame, inbound)?;
    let mut stamped = [0u8; FRAME_LEN];
    stamped.copy_from_slice(frame);
    stamped[5] = checksum;
    Some(stamped)
}

/// Decode a candidate frame into a [`Signal`].
///
/// Requires exactly 7 bytes and the header byte 19. The checksum is NOT
/// verified here: the protocol delivers checksum-mismatched signals, so
/// validation is a separate query ([`Signal::checksum_ok`]).
pub fn decode_candidate(frame: &[u8]) -> Result<Signal> {
    if frame.len() != FRAME_LEN {
        return Err(FrameError::InvalidLength(frame.len()));
    }
    if frame[0] != HEADER {
        return Err(FrameError::InvalidHeader(frame[0]));
    }
    Ok(Signal {
        header: frame[0],
        stone: frame[1],
        status: frame[2],
        reserved: frame[3],
        message_id: frame[4],
        checksum: frame[5],
        color: frame[6],
    })
}

/// Extract candidate frames from a raw notification payload.
///
/// Payloads may carry zero, one, or several concatenated frames mixed with
/// garbage. A candidate is any 7-byte run beginning with the header byte;
/// matches are non-overlapping, scanned left to right. An empty result
/// means the payload should be surfaced as an unstructured notification.
pub fn scan_frames(raw: &[u8]) -> Vec<[u8; FRAME_LEN]> {
    let mut frames = Vec::new();
    let mut pos = 0;
    while pos + FRAME_LEN <= raw.len() {
        if raw[pos] == HEADER {
            let mut frame = [0u8; FRAME_LEN];
            frame.copy_from_slice(&raw[pos..pos + FRAME_LEN]);
            frames.push(frame);
            pos += FRAME_LEN;
        } else {
            pos += 1;
        }
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Color;

    #[test]
    fn outbound_checksum_reference_values() {
        assert_eq!(calc_checksum(&[19, 5, 0, 0, 0, 0, 1], false), Some(24));
        assert_eq!(calc_checksum(&[19, 5, 10, 10, 10, 0, 1], false), Some(54));
    }

    #[test]
    fn outbound_checksum_wraps() {
        assert_eq!(
            calc_checksum(&[255, 255, 255, 255, 3, 0, 1], false),
            Some(255)
        );
        assert_eq!(calc_checksum(&[255, 255, 255, 255, 4, 0, 1], false), Some(0));
    }

    #[test]
    fn inbound_checksum_folds_in_color_minus_one() {
        // sum = 24, + color 3 - 1 = 26
        assert_eq!(calc_checksum(&[19, 5, 0, 0, 0, 0, 3], true), Some(26));
        // color 0 underflows past the -1
        assert_eq!(calc_checksum(&[19, 5, 0, 0, 0, 0, 0], true), Some(23));
    }

    #[test]
    fn checksum_rejects_all_other_lengths() {
        for len in (0..=16).filter(|len| *len != FRAME_LEN) {
            let frame = vec![19u8; len];
            assert_eq!(calc_checksum(&frame, false), None, "length {len}");
            assert_eq!(calc_checksum(&frame, true), None, "length {len}");
            assert!(add_checksum(&frame, false).is_none(), "length {len}");
        }
    }

    #[test]
    fn add_checksum_stamps_byte_five() {
        let stamped = add_checksum(&[19, 6, 2, 40, 9, 0, 2], false).unwrap();
        assert_eq!(stamped[5], 19u8.wrapping_add(6 + 2 + 40 + 9));
        // Other bytes untouched.
        assert_eq!(stamped[0], 19);
        assert_eq!(stamped[6], 2);
    }

    #[test]
    fn decode_candidate_checks_length_and_header() {
        assert!(matches!(
            decode_candidate(&[19, 0, 0]),
            Err(FrameError::InvalidLength(3))
        ));
        assert!(matches!(
            decode_candidate(&[20, 0, 0, 0, 0, 0, 0]),
            Err(FrameError::InvalidHeader(20))
        ));

        let signal = decode_candidate(&[19, 6, 2, 40, 9, 76, 2]).unwrap();
        assert_eq!(signal.stone, 6);
        assert_eq!(signal.status, 2);
        assert_eq!(signal.reserved, 40);
        assert_eq!(signal.message_id, 9);
        assert_eq!(signal.checksum, 76);
        assert_eq!(signal.color, 2);
    }

    #[test]
    fn decode_does_not_verify_checksum() {
        let signal = decode_candidate(&[19, 6, 2, 40, 9, 0, 2]).unwrap();
        assert!(!signal.checksum_ok());
    }

    #[test]
    fn checksum_ok_uses_inbound_formula() {
        let frame = add_checksum(
            &Signal::outbound(6, 0, 10, 3, Color::Blue).to_bytes(),
            true,
        )
        .unwrap();
        assert!(decode_candidate(&frame).unwrap().checksum_ok());
    }

    #[test]
    fn scan_finds_nothing_in_garbage() {
        assert!(scan_frames(&[]).is_empty());
        assert!(scan_frames(&[0, 1, 2, 3, 4, 5, 6, 7]).is_empty());
    }

    #[test]
    fn scan_single_frame() {
        let frames = scan_frames(&[19, 6, 0, 0, 0, 25, 1]);
        assert_eq!(frames, vec![[19, 6, 0, 0, 0, 25, 1]]);
    }

    #[test]
    fn scan_two_back_to_back_frames() {
        let mut raw = vec![19, 6, 0, 0, 0, 25, 1];
        raw.extend_from_slice(&[19, 6, 0, 0, 1, 26, 2]);
        let frames = scan_frames(&raw);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0][4], 0);
        assert_eq!(frames[1][4], 1);
    }

    #[test]
    fn scan_skips_leading_and_trailing_garbage() {
        let mut raw = vec![0xff, 0x00];
        raw.extend_from_slice(&[19, 1, 2, 3, 4, 5, 6]);
        raw.extend_from_slice(&[0xaa, 0xbb]);
        assert_eq!(scan_frames(&raw), vec![[19, 1, 2, 3, 4, 5, 6]]);
    }

    #[test]
    fn scan_matches_do_not_overlap() {
        // A header byte inside a claimed frame does not start a new one.
        let raw = [19, 19, 2, 3, 4, 5, 6, 0];
        assert_eq!(scan_frames(&raw), vec![[19, 19, 2, 3, 4, 5, 6]]);
    }

    #[test]
    fn scan_ignores_short_tail() {
        let raw = [0, 19, 1, 2, 3];
        assert!(scan_frames(&raw).is_empty());
    }
}
