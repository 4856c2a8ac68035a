use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, SubsecRound, Utc};
use ts_protocol::{DEFAULT_CONTENT_TYPE, PROTOCOL_VERSION};
use ts_types::{day_dir, format_iso, rel, FileStem, Link, PostId};

use crate::error::StoreResult;
use crate::post::{Post, PostBody, TransportMeta};
use crate::traits::PostStore;

/// Post store over a local `YYYY/MM/DD` directory tree.
///
/// Layout: `<root>/<YYYY>/<MM>/<DD>/[<HHMMSSZ>-]<disambiguator>[.<ext>]`.
/// There is no index: `before` walks day-directories backwards from the
/// requested instant.
///
/// Within a day, posts are listed by id in descending order, newest first.
/// Files sharing an id form one post: the file with the fewest extension
/// segments is the post itself, the others are sidecars exposed only through
/// `describedby` links and explicit lookup of their own ids.
#[derive(Clone, Debug)]
pub struct FsStore {
    root: PathBuf,
}

/// One file of a day-directory.
#[derive(Clone, Debug)]
struct StoredFile {
    id: PostId,
    name: String,
    path: PathBuf,
}

/// A post in a day listing, with its sidecars.
#[derive(Clone, Debug)]
struct DayEntry {
    primary: StoredFile,
    sidecars: Vec<StoredFile>,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Years present in the store, ascending.
    async fn years(&self) -> StoreResult<Vec<i32>> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut years = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.len() != 4 || !name.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
            if entry.file_type().await?.is_dir() {
                if let Ok(year) = name.parse() {
                    years.push(year);
                }
            }
        }
        years.sort_unstable();
        Ok(years)
    }

    /// Posts of one day, newest first. A missing directory has no posts.
    async fn list_day(&self, date: NaiveDate) -> StoreResult<Vec<DayEntry>> {
        let dir_path = self.root.join(day_dir(date));
        let mut dir = match tokio::fs::read_dir(&dir_path).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut groups: BTreeMap<PostId, Vec<StoredFile>> = BTreeMap::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => {}
                _ => continue,
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let Ok(id) = PostId::for_file(date, &name) else {
                continue;
            };
            groups.entry(id.clone()).or_default().push(StoredFile { id, name, path });
        }

        let mut listing = Vec::with_capacity(groups.len());
        for (_, mut files) in groups.into_iter().rev() {
            files.sort_by(|a, b| {
                extension_segments(&a.name)
                    .cmp(&extension_segments(&b.name))
                    .then_with(|| a.name.cmp(&b.name))
            });
            let mut files = files.into_iter();
            let Some(primary) = files.next() else { continue };
            let mut sidecars: Vec<StoredFile> = Vec::new();
            for mut file in files {
                let Some(ext) = FileStem::parse(&file.name).and_then(|s| s.extension) else {
                    tracing::debug!(file = %file.path.display(), "duplicate post file ignored");
                    continue;
                };
                let Ok(id) = primary.id.with_sidecar(ext) else { continue };
                if sidecars.iter().any(|s| s.id == id) {
                    tracing::debug!(file = %file.path.display(), "duplicate sidecar ignored");
                    continue;
                }
                file.id = id;
                sidecars.push(file);
            }
            listing.push(DayEntry { primary, sidecars });
        }
        Ok(listing)
    }

    /// The day listing holding `id` and the position of its post.
    async fn resolve(&self, id: &PostId) -> StoreResult<Option<(Vec<DayEntry>, usize)>> {
        let primary = id.primary();
        let listing = self.list_day(id.date()).await?;
        let pos = listing.iter().position(|e| e.primary.id == primary);
        Ok(pos.map(|pos| (listing, pos)))
    }

    /// Newest post strictly before `instant`, walking back one day at a time.
    async fn find_before(&self, instant: DateTime<Utc>) -> StoreResult<Option<DayEntry>> {
        let years = self.years().await?;
        let (Some(&earliest), Some(&latest)) = (years.first(), years.last()) else {
            return Ok(None);
        };
        if instant.year() < earliest {
            return Ok(None);
        }

        let mut day = if instant.year() > latest {
            match last_day_of(latest) {
                Some(day) => day,
                None => return Ok(None),
            }
        } else {
            instant.date_naive()
        };

        loop {
            if years.binary_search(&day.year()).is_err() {
                let lower = years.iter().rev().find(|&&y| y < day.year());
                match lower.and_then(|&y| last_day_of(y)) {
                    Some(next) => day = next,
                    None => return Ok(None),
                }
                continue;
            }

            tracing::debug!(%day, "scanning day-directory");
            for entry in self.list_day(day).await? {
                if entry.primary.id.instant() < instant {
                    return Ok(Some(entry));
                }
            }

            match day.pred_opt() {
                Some(prev) if prev.year() >= earliest => day = prev,
                _ => return Ok(None),
            }
        }
    }

    /// The post listed after `id` in its day, or the newest post before it.
    async fn previous_entry(&self, id: &PostId) -> StoreResult<Option<DayEntry>> {
        let Some((listing, pos)) = self.resolve(id).await? else {
            return Ok(None);
        };
        if let Some(next) = listing.into_iter().nth(pos + 1) {
            return Ok(Some(next));
        }
        self.find_before(id.instant()).await
    }

    async fn entry_post(&self, entry: DayEntry) -> StoreResult<Post> {
        let mut links = vec![Link::new(rel::SELF, entry.primary.id.to_string())];
        if let Some(prev) = self.previous_entry(&entry.primary.id).await? {
            links.push(Link::new(rel::PREVIOUS, prev.primary.id.to_string()));
        }
        for sidecar in &entry.sidecars {
            links.push(
                Link::new(rel::DESCRIBED_BY, sidecar.id.to_string())
                    .with_type(content_type_of(&sidecar.name)),
            );
        }
        self.file_post(&entry.primary, links).await
    }

    async fn file_post(&self, file: &StoredFile, links: Vec<Link>) -> StoreResult<Post> {
        let meta = tokio::fs::metadata(&file.path).await?;
        let last_modified = meta
            .modified()
            .ok()
            .map(|t| DateTime::<Utc>::from(t).trunc_subsecs(0));
        let etag = last_modified.map(|lm| weak_etag(&lm, &file.path));
        Ok(Post {
            id: file.id.to_string(),
            time: file.id.instant(),
            content_type: content_type_of(&file.name),
            version: PROTOCOL_VERSION.to_string(),
            links,
            transport: TransportMeta {
                content_length: Some(meta.len()),
                last_modified,
                etag,
            },
            body: PostBody::file(&file.path),
        })
    }
}

#[async_trait]
impl PostStore for FsStore {
    async fn get(&self, id: &str) -> StoreResult<Option<Post>> {
        let Ok(id) = id.parse::<PostId>() else {
            tracing::debug!(id, "not a post id");
            return Ok(None);
        };
        let Some((listing, pos)) = self.resolve(&id).await? else {
            return Ok(None);
        };
        let Some(entry) = listing.into_iter().nth(pos) else {
            return Ok(None);
        };
        if !id.is_sidecar() {
            return self.entry_post(entry).await.map(Some);
        }
        match entry.sidecars.iter().find(|s| s.id == id) {
            Some(sidecar) => {
                let links = vec![Link::new(rel::SELF, sidecar.id.to_string())];
                self.file_post(sidecar, links).await.map(Some)
            }
            None => Ok(None),
        }
    }

    async fn before(&self, instant: Option<DateTime<Utc>>) -> StoreResult<Option<Post>> {
        let instant = instant.unwrap_or_else(Utc::now);
        match self.find_before(instant).await? {
            Some(entry) => self.entry_post(entry).await.map(Some),
            None => Ok(None),
        }
    }

    async fn previous(&self, id: &str) -> StoreResult<Option<Post>> {
        let Ok(id) = id.parse::<PostId>() else {
            return Ok(None);
        };
        match self.previous_entry(&id).await? {
            Some(entry) => self.entry_post(entry).await.map(Some),
            None => Ok(None),
        }
    }
}

fn last_day_of(year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 12, 31)
}

fn extension_segments(name: &str) -> usize {
    FileStem::parse(name).map_or(0, |s| s.extension_segments())
}

fn content_type_of(name: &str) -> String {
    mime_guess::from_path(name)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}

fn weak_etag(last_modified: &DateTime<Utc>, path: &Path) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(format_iso(last_modified).as_bytes());
    hasher.update(path.to_string_lossy().as_bytes());
    format!("W/\"{}\"", hex::encode(&hasher.finalize().as_bytes()[..16]))
}
