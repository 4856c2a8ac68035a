use thiserror::Error;
use ts_protocol::ProtocolError;
use ts_store::StoreError;
use ts_types::TypeError;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("no matching post")]
    NotFound,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("type error: {0}")]
    Type(#[from] TypeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SdkResult<T> = Result<T, SdkError>;
