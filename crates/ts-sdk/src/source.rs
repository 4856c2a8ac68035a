use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use ts_remote::HttpStore;
use ts_store::{FsStore, Post, PostStore, StoreError, StoreResult};

/// A post store chosen from a source url.
pub enum Source {
    Local(FsStore),
    Remote(HttpStore),
}

impl Source {
    /// Pick a backend from `url`.
    ///
    /// Paths without a scheme and `file:` urls open a local tree, resolved
    /// against `base_dir` when relative. `http:` and `https:` open a remote
    /// instance. Any other scheme is rejected.
    pub fn open(url: &str, base_dir: &Path) -> StoreResult<Self> {
        match scheme_of(url) {
            None => Ok(Self::Local(FsStore::new(base_dir.join(url)))),
            Some(scheme) if scheme.eq_ignore_ascii_case("file") => {
                let rest = &url[scheme.len() + 1..];
                let path = rest.strip_prefix("//").unwrap_or(rest);
                Ok(Self::Local(FsStore::new(base_dir.join(path))))
            }
            Some(scheme)
                if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") =>
            {
                let url = Url::parse(url)
                    .map_err(|e| StoreError::InvalidSource(format!("{url}: {e}")))?;
                Ok(Self::Remote(HttpStore::new(url)?))
            }
            Some(scheme) => Err(StoreError::UnsupportedProtocol(format!("{scheme}:"))),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

/// The scheme of `url`, if it has one. Single letters are drive prefixes,
/// not schemes.
fn scheme_of(url: &str) -> Option<&str> {
    let (scheme, _) = url.split_once(':')?;
    let mut chars = scheme.chars();
    let valid = scheme.len() > 1
        && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

#[async_trait]
impl PostStore for Source {
    async fn get(&self, id: &str) -> StoreResult<Option<Post>> {
        match self {
            Self::Local(store) => store.get(id).await,
            Self::Remote(store) => store.get(id).await,
        }
    }

    async fn before(&self, instant: Option<DateTime<Utc>>) -> StoreResult<Option<Post>> {
        match self {
            Self::Local(store) => store.before(instant).await,
            Self::Remote(store) => store.before(instant).await,
        }
    }

    async fn previous(&self, id: &str) -> StoreResult<Option<Post>> {
        match self {
            Self::Local(store) => store.previous(id).await,
            Self::Remote(store) => store.previous(id).await,
        }
    }
}
