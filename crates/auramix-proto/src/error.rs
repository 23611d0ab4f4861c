//! Error types for frame transmission and parsing.

/// Errors that can occur while encoding, sending, receiving, or decoding
/// a wire frame.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The peer closed the connection (a zero-byte read at any stage of
    /// receiving a frame).
    #[error("peer closed the connection")]
    PeerClosed,

    /// The frame's `magic` field did not match [`crate::header::MAGIC`].
    #[error("invalid frame: bad magic {0:#010x}")]
    BadMagic(u32),

    /// `data_offset` was smaller than [`crate::header::BASE_HEADER_SIZE`].
    #[error("invalid frame: data_offset {0} is smaller than the base header")]
    HeaderTooShort(u32),

    /// `total_size` was smaller than `data_offset`, so the payload length
    /// would underflow.
    #[error("invalid frame: total_size {total_size} smaller than data_offset {data_offset}")]
    SizeUnderflow { total_size: u32, data_offset: u32 },

    /// Underlying socket I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A reply's transmission id did not match the request it was
    /// supposedly correlated to.
    #[error("transmission id mismatch: expected {expected}, got {got}")]
    TransmissionIdMismatch { expected: u32, got: u32 },

    /// A connection URI (`tcp:...` / `unix:...`) failed to parse.
    #[error("invalid endpoint URI: {0}")]
    BadUri(String),

    /// A typed payload was shorter than its fixed-size fields require.
    #[error("payload too short: expected at least {expected} bytes, got {got}")]
    PayloadTooShort { expected: usize, got: usize },

    /// A payload string field was not valid UTF-8.
    #[error("payload string field is not valid UTF-8")]
    BadString,
}

/// Convenience result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
