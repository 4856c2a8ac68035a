/// Version advertised in the `time-streams-version` header.
pub const PROTOCOL_VERSION: &str = "1";

/// Content type used when none can be inferred.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Query parameter selecting the newest post strictly before an instant.
pub const BEFORE_PARAM: &str = "before";

/// Gemini success status.
pub const GEMINI_SUCCESS: u8 = 20;

/// Header names used on the wire. Always lower case.
pub mod headers {
    pub const CONTENT_TYPE: &str = "content-type";
    pub const POST_TIME: &str = "post-time";
    pub const VERSION: &str = "time-streams-version";
    pub const LINK: &str = "link";
    pub const DATE: &str = "date";
    pub const CONTENT_LENGTH: &str = "content-length";
    pub const LAST_MODIFIED: &str = "last-modified";
    pub const ETAG: &str = "etag";
}
