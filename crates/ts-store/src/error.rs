/// Errors from post store operations.
///
/// A missing post is not an error: lookups return `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the local filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote instance could not be reached or the exchange broke off.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote instance answered with a non-success status other than 404.
    #[error("error getting remote post ({status}): {detail}")]
    UpstreamStatus { status: u16, detail: String },

    /// A remote response lacked a required header or a usable `self` link.
    #[error("malformed upstream response: {0}")]
    MalformedUpstream(String),

    /// The source url's scheme is neither a local path nor http(s).
    #[error("protocol {0} not supported")]
    UnsupportedProtocol(String),

    /// The source url could not be parsed.
    #[error("invalid source {0:?}")]
    InvalidSource(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
