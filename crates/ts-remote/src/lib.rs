//! Remote post store for Time Streams.
//!
//! [`HttpStore`] implements the same [`ts_store::PostStore`] contract as the
//! local directory store by asking another Time Streams instance over HTTP,
//! so one instance can relay another.

pub mod http;

pub use http::HttpStore;
