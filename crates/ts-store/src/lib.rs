//! Post storage for Time Streams.
//!
//! A store exposes a time-ordered stream of posts through three lookups:
//! by id, the newest post strictly before an instant, and the post preceding
//! a given one. Posts are read-only projections of existing content; nothing
//! here writes.
//!
//! # Backends
//!
//! All backends implement the [`PostStore`] trait:
//!
//! - [`FsStore`]: a local `YYYY/MM/DD` directory tree, scanned without an index
//! - `ts_remote::HttpStore`: another Time Streams instance over HTTP
//!
//! # Bodies
//!
//! A [`Post`] carries its body unopened. [`PostBody::open`] consumes it and
//! yields a [`PostReader`]; dropping the reader releases the file handle or
//! connection on every path, including errors.

pub mod error;
pub mod fs;
pub mod post;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsStore;
pub use post::{BodyReader, BodySource, Post, PostBody, PostReader, TransportMeta};
pub use traits::PostStore;
