use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid post id {id:?}: {reason}")]
    InvalidPostId { id: String, reason: &'static str },

    #[error("invalid instant: {0}")]
    InvalidInstant(String),

    #[error("invalid opaque id: {0}")]
    InvalidOpaqueId(String),
}
