use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::post::Post;

/// Read access to a time-ordered stream of posts.
///
/// Every lookup returns `Ok(None)` when nothing matches; `Err` is reserved
/// for I/O and transport failures.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// The post with the given id.
    async fn get(&self, id: &str) -> StoreResult<Option<Post>>;

    /// The newest post strictly before `instant`, or before now when `None`.
    async fn before(&self, instant: Option<DateTime<Utc>>) -> StoreResult<Option<Post>>;

    /// The post immediately preceding `id` in stream order.
    async fn previous(&self, id: &str) -> StoreResult<Option<Post>>;
}
