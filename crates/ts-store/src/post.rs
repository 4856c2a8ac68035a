use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::Stream;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use ts_types::{find_rel, Link};

use crate::error::{StoreError, StoreResult};

const FILE_CHUNK: usize = 64 * 1024;

/// Transport-level metadata carried alongside a post.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransportMeta {
    pub content_length: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
    /// Cache validator, already quoted (`W/"..."`).
    pub etag: Option<String>,
}

/// One post: metadata plus a body that is opened on demand.
pub struct Post {
    pub id: String,
    pub time: DateTime<Utc>,
    pub content_type: String,
    pub version: String,
    pub links: Vec<Link>,
    pub transport: TransportMeta,
    pub body: PostBody,
}

impl Post {
    /// First link with the given relation.
    pub fn link(&self, rel: &str) -> Option<&Link> {
        find_rel(&self.links, rel)
    }
}

impl fmt::Debug for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Post")
            .field("id", &self.id)
            .field("time", &self.time)
            .field("content_type", &self.content_type)
            .field("version", &self.version)
            .field("links", &self.links)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

/// Something a post body can be opened from.
#[async_trait]
pub trait BodySource: Send {
    async fn open(self: Box<Self>) -> StoreResult<Box<dyn BodyReader>>;
}

/// An open post body, read chunk by chunk.
#[async_trait]
pub trait BodyReader: Send {
    /// Next chunk of the body, `None` at the end.
    async fn next_chunk(&mut self) -> StoreResult<Option<Bytes>>;
}

/// Unopened body of a post. Opening consumes it, so a body is read at most
/// once.
pub struct PostBody(Box<dyn BodySource>);

impl PostBody {
    pub fn new(source: impl BodySource + 'static) -> Self {
        Self(Box::new(source))
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(FileBody { path: path.into() })
    }

    pub async fn open(self) -> StoreResult<PostReader> {
        Ok(PostReader(self.0.open().await?))
    }
}

/// An open body. The underlying file handle or connection is released when
/// the reader is dropped.
pub struct PostReader(Box<dyn BodyReader>);

impl PostReader {
    pub async fn next_chunk(&mut self) -> StoreResult<Option<Bytes>> {
        self.0.next_chunk().await
    }

    pub async fn read_to_end(mut self) -> StoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.next_chunk().await? {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf)
    }

    /// Copy the rest of the body into `out`, returning the number of bytes
    /// written.
    pub async fn copy_to<W>(mut self, out: &mut W) -> StoreResult<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut written = 0u64;
        while let Some(chunk) = self.next_chunk().await? {
            out.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        out.flush().await?;
        Ok(written)
    }

    pub fn into_stream(self) -> impl Stream<Item = StoreResult<Bytes>> + Send {
        futures_util::stream::try_unfold(self, |mut reader| async move {
            let chunk = reader.next_chunk().await?;
            Ok::<_, StoreError>(chunk.map(|chunk| (chunk, reader)))
        })
    }
}

struct FileBody {
    path: PathBuf,
}

#[async_trait]
impl BodySource for FileBody {
    async fn open(self: Box<Self>) -> StoreResult<Box<dyn BodyReader>> {
        let file = tokio::fs::File::open(&self.path).await?;
        Ok(Box::new(FileReader { file }))
    }
}

struct FileReader {
    file: tokio::fs::File,
}

#[async_trait]
impl BodyReader for FileReader {
    async fn next_chunk(&mut self) -> StoreResult<Option<Bytes>> {
        let mut buf = vec![0u8; FILE_CHUNK];
        let n = self.file.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(Bytes::from(buf)))
    }
}
