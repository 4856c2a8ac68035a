use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("format {0:?} not recognized (expected http, json or gemini)")]
    UnsupportedFormat(String),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
