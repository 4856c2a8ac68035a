//! Foundation types for Time Streams.
//!
//! A time stream is a sequence of posts ordered by timestamp, each backed by
//! a file in a `YYYY/MM/DD` directory tree. This crate holds the pieces every
//! other crate shares.
//!
//! # Key Types
//!
//! - [`PostId`]: sortable identifier derived from a file's day-directory and name
//! - [`Link`]: typed relation from a post to another resource
//! - [`temporal`]: instant parsing and HTTP/ISO date rendering
//! - [`opaque`]: reversible id obfuscation for public links

pub mod error;
pub mod id;
pub mod link;
pub mod opaque;
pub mod temporal;

pub use error::TypeError;
pub use id::{day_dir, FileStem, PostId, SIDECAR_MARK};
pub use link::{find_rel, rel, Link};
pub use temporal::{format_http_date, format_iso, parse_http_date, parse_instant};
