//! Error types for stream decode/resample/ring operations.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("truncated sample data: {format} frames need a multiple of {frame_bytes} bytes, got {got}")]
    TruncatedFrame {
        format: &'static str,
        frame_bytes: usize,
        got: usize,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
