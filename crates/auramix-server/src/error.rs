//! Error types for connection and request handling.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Proto(#[from] auramix_proto::Error),

    #[error(transparent)]
    Backend(#[from] auramix_backend::Error),

    #[error(transparent)]
    Mixer(#[from] auramix_mixer::Error),

    #[error("unknown output id {0}")]
    UnknownOutput(u16),

    #[error("unknown stream id {0}")]
    UnknownStream(u16),

    #[error("unknown connection id {0}")]
    UnknownConnection(u32),

    #[error("request not permitted before the initial connection handshake")]
    NotYetConnected,
}

pub type Result<T> = std::result::Result<T, Error>;
