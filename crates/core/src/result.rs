// crates/core/src/result.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LivecapError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Push error: {0}")]
    Push(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

pub type LivecapResult<T> = Result<T, LivecapError>;
