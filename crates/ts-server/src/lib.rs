//! HTTP server for Time Streams.
//!
//! Serves any [`PostStore`](ts_store::PostStore) over HTTP: `GET /` for the
//! newest post (optionally `?before=<instant>`) and `GET /{id}` for one post.
//! Post metadata travels in response headers and the body is streamed from
//! the store.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::TsServer;
