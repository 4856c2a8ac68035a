//! High-level SDK for Time Streams.
//!
//! Opens a post store from a source url and runs the get command against
//! it. This is the entry point for the `timestreams` binary and for
//! applications embedding a time stream.

pub mod error;
pub mod get;
pub mod source;

pub use error::{SdkError, SdkResult};
pub use get::{get_post, GetOptions};
pub use source::Source;

// Re-export key types
pub use ts_protocol::HeaderFormat;
pub use ts_store::{Post, PostStore};
