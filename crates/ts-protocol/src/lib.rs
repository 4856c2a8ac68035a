//! Wire protocol for Time Streams.
//!
//! Defines the relation-link header grammar and the header block encodings
//! used when a post's metadata leaves the process: HTTP header lines, a
//! flat JSON object, or a single Gemini response line.

pub mod error;
pub mod headers;
pub mod link_header;
pub mod wire;

pub use error::{ProtocolError, ProtocolResult};
pub use headers::{
    AnyHeaderWriter, GeminiHeaders, HeaderFormat, HeaderValue, HeaderWriter, HttpHeaders,
    JsonHeaders,
};
pub use link_header::{decode_target, encode_target, parse_link_header, serialize_link_header};
pub use wire::{BEFORE_PARAM, DEFAULT_CONTENT_TYPE, PROTOCOL_VERSION};
