use thiserror::Error;

pub type ZprobeResult<T> = Result<T, ZprobeError>;

#[derive(Debug, Error)]
pub enum ZprobeError {
    #[error("zstd codec unavailable: {0}")]
    CodecUnavailable(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ZprobeError {
    /// True when the error came from the underlying reader or writer.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
