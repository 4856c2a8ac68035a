use chrono::{DateTime, Utc};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use ts_protocol::wire::headers;
use ts_protocol::{HeaderFormat, HeaderWriter};
use ts_store::{Post, PostStore};
use ts_types::parse_instant;

use crate::error::{SdkError, SdkResult};

/// What the get command fetches and how it prints it.
#[derive(Clone, Debug, Default)]
pub struct GetOptions {
    pub format: HeaderFormat,
    /// Print a header block before the body.
    pub headers: bool,
    /// Print only the header block. Implies `headers`.
    pub headers_only: bool,
    /// Fetch the newest post strictly before this instant (now when `None`).
    pub before: Option<DateTime<Utc>>,
    /// Fetch this post instead of searching by time.
    pub id: Option<String>,
}

impl GetOptions {
    pub fn wants_headers(&self) -> bool {
        self.headers || self.headers_only
    }

    /// Set `before` from user input (RFC 3339 or a bare date).
    pub fn with_before(mut self, before: Option<&str>) -> SdkResult<Self> {
        self.before = before.map(parse_instant).transpose()?;
        Ok(self)
    }
}

/// Look up one post in `store` and write it to `out`.
pub async fn get_post<S, W>(store: &S, options: &GetOptions, out: &mut W) -> SdkResult<()>
where
    S: PostStore + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let post = match &options.id {
        Some(id) => store.get(id).await?,
        None => store.before(options.before).await?,
    }
    .ok_or(SdkError::NotFound)?;
    tracing::debug!(id = %post.id, "fetched post");

    if options.wants_headers() {
        let block = header_block(&post, options.format)?;
        out.write_all(&block).await?;
    }
    if options.headers_only {
        out.flush().await?;
    } else {
        post.body.open().await?.copy_to(out).await?;
    }
    Ok(())
}

fn header_block(post: &Post, format: HeaderFormat) -> SdkResult<Vec<u8>> {
    let mut block = Vec::new();
    let mut writer = format.writer(&mut block);
    writer.set_header(headers::LINK, post.links.as_slice());
    writer.set_header(headers::POST_TIME, post.time);
    writer.set_header(headers::CONTENT_TYPE, post.content_type.as_str());
    writer.set_header(headers::VERSION, post.version.as_str());
    if let Some(len) = post.transport.content_length {
        writer.set_header(headers::CONTENT_LENGTH, len);
    }
    if let Some(modified) = post.transport.last_modified {
        writer.set_header(headers::LAST_MODIFIED, modified);
    }
    if let Some(etag) = &post.transport.etag {
        writer.set_header(headers::ETAG, etag.as_str());
    }
    writer.close_headers()?;
    Ok(block)
}
