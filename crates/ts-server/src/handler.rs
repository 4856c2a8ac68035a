use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use ts_protocol::wire::headers;
use ts_protocol::{encode_target, serialize_link_header};
use ts_store::{Post, PostReader, PostStore, StoreResult};
use ts_types::opaque::{decode_id, encode_id};
use ts_types::{format_http_date, parse_instant, Link};

use crate::error::{ServerError, ServerResult};

/// Shared state behind every route.
pub struct AppState<S> {
    pub store: Arc<S>,
    pub opaque_ids: bool,
    /// One permit per request in flight, held until its body is fully sent.
    pub permits: Arc<Semaphore>,
}

impl<S> AppState<S> {
    async fn admit(&self) -> ServerResult<OwnedSemaphorePermit> {
        self.permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BeforeQuery {
    pub before: Option<String>,
}

/// `GET /` and `GET /?before=...`: the newest post strictly before the
/// given instant, or before now.
pub async fn latest_handler<S: PostStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<BeforeQuery>,
) -> ServerResult<Response> {
    let permit = state.admit().await?;
    let instant = query
        .before
        .as_deref()
        .map(parse_instant)
        .transpose()
        .map_err(|e| ServerError::BadRequest(e.to_string()))?;
    let post = state.store.before(instant).await?.ok_or(ServerError::NotFound)?;
    post_response(post, state.opaque_ids, permit).await
}

/// `GET /{id}`: one post by id.
pub async fn post_handler<S: PostStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> ServerResult<Response> {
    let permit = state.admit().await?;
    let id = if state.opaque_ids {
        decode_id(&id).map_err(|_| ServerError::NotFound)?
    } else {
        id
    };
    let post = state.store.get(&id).await?.ok_or(ServerError::NotFound)?;
    post_response(post, state.opaque_ids, permit).await
}

async fn post_response(
    post: Post,
    opaque_ids: bool,
    permit: OwnedSemaphorePermit,
) -> ServerResult<Response> {
    tracing::debug!(id = %post.id, "serving post");
    let links: Vec<Link> = post
        .links
        .iter()
        .map(|link| public_link(link, opaque_ids))
        .collect();

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(headers::CONTENT_TYPE, &post.content_type)
        .header(headers::POST_TIME, format_http_date(&post.time))
        .header(headers::VERSION, &post.version);
    if !links.is_empty() {
        builder = builder.header(headers::LINK, serialize_link_header(&links));
    }
    if let Some(len) = post.transport.content_length {
        builder = builder.header(headers::CONTENT_LENGTH, len);
    }
    if let Some(modified) = &post.transport.last_modified {
        builder = builder.header(headers::LAST_MODIFIED, format_http_date(modified));
    }
    if let Some(etag) = &post.transport.etag {
        builder = builder.header(headers::ETAG, etag);
    }

    let reader = post.body.open().await?;
    let body = match post.transport.content_length {
        Some(0) => Body::empty(),
        len => Body::from_stream(hold_until_sent(reader, permit, len)),
    };
    builder
        .body(body)
        .map_err(|e| ServerError::Internal(e.to_string()))
}

/// Streams the body, keeping `permit` until `len` bytes have been produced
/// or the stream is dropped.
fn hold_until_sent(
    reader: PostReader,
    permit: OwnedSemaphorePermit,
    len: Option<u64>,
) -> impl Stream<Item = StoreResult<Bytes>> + Send {
    let mut permit = Some(permit);
    let mut remaining = len;
    reader.into_stream().map(move |chunk| {
        if let (Ok(bytes), Some(left)) = (&chunk, remaining.as_mut()) {
            *left = left.saturating_sub(bytes.len() as u64);
            if *left == 0 {
                permit.take();
            }
        }
        chunk
    })
}

/// Bare targets become absolute, percent-encoded paths on this server;
/// anything with a scheme or path is passed through.
fn public_link(link: &Link, opaque_ids: bool) -> Link {
    if !link.is_bare() {
        return link.clone();
    }
    let target = if opaque_ids {
        encode_id(&link.url)
    } else {
        link.url.clone()
    };
    Link {
        url: format!("/{}", encode_target(&target)),
        ..link.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ts_types::rel;

    #[test]
    fn bare_links_become_paths() {
        let link = public_link(&Link::new(rel::SELF, "20200701051121Z-hello"), false);
        assert_eq!(link.url, "/20200701051121Z-hello");
        assert_eq!(link.rel, rel::SELF);
    }

    #[test]
    fn opaque_links_are_encoded() {
        let link = public_link(&Link::new(rel::PREVIOUS, "20200630051121Z-hi"), true);
        assert_eq!(link.url, format!("/{}", encode_id("20200630051121Z-hi")));
        assert_eq!(decode_id(&link.url[1..]).unwrap(), "20200630051121Z-hi");
    }

    #[test]
    fn bare_links_are_percent_encoded() {
        let link = public_link(&Link::new(rel::SELF, "20200701000000Z-café au lait"), false);
        assert_eq!(link.url, "/20200701000000Z-caf%C3%A9%20au%20lait");
        assert!(axum::http::HeaderValue::from_str(&link.url).is_ok());
    }

    #[test]
    fn absolute_links_pass_through() {
        let original =
            Link::new(rel::DESCRIBED_BY, "https://example.com/a.json").with_type("application/json");
        assert_eq!(public_link(&original, true), original);
    }
}
