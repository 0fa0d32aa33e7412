/// Errors that can occur when decoding a candidate frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The candidate is not exactly 7 bytes long.
    #[error("invalid frame length ({0} bytes, expected 7)")]
    InvalidLength(usize),

    /// The first byte is not the protocol header (19).
    #[error("invalid frame header ({0:#04x}, expected 0x13)")]
    InvalidHeader(u8),
}

pub type Result<T> = std::result::Result<T, FrameError>;
