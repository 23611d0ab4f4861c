//! Error types for output backend operations.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no such output device: {0}")]
    NoSuchOutput(u16),

    #[error("output device {0} does not support any of the negotiated sample rates/channels")]
    NegotiationFailed(u16),

    #[error("backend I/O error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, Error>;
