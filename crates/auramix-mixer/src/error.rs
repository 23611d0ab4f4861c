//! Error types for the mixing engine.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("output backend error: {0}")]
    Backend(#[from] auramix_backend::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
