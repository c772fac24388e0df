use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrimitivesError {
    #[error("Failed to read contract artifact: {0}")]
    ArtifactReadError(String),
    #[error("Failed to parse contract artifact: {0}")]
    ArtifactParseError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Topic filter error: {0}")]
    TopicError(String),
}

pub type Result<T> = core::result::Result<T, PrimitivesError>;
