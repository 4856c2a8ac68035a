use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Client, Response, StatusCode, Url};
use ts_protocol::wire::headers;
use ts_protocol::{decode_target, parse_link_header, BEFORE_PARAM};
use ts_store::{
    BodyReader, BodySource, Post, PostBody, PostStore, StoreError, StoreResult, TransportMeta,
};
use ts_types::{find_rel, format_iso, parse_http_date, rel, Link};

/// Post store backed by another Time Streams instance.
///
/// `get(id)` fetches `<base>/<id>`, `before(t)` fetches `<base>?before=<t>`.
/// Post metadata comes only from response headers, and the post id is taken
/// from the `self` link so the upstream may rewrite ids.
#[derive(Clone, Debug)]
pub struct HttpStore {
    base: Url,
    client: Client,
}

impl HttpStore {
    pub fn new(base: Url) -> StoreResult<Self> {
        Self::with_client(base, Client::new())
    }

    pub fn with_client(base: Url, client: Client) -> StoreResult<Self> {
        match base.scheme() {
            "http" | "https" => Ok(Self { base, client }),
            other => Err(StoreError::UnsupportedProtocol(format!("{other}:"))),
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `<base>/<id>`, with `id` escaped as a single path segment.
    fn post_url(&self, id: &str) -> StoreResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::InvalidSource(format!("{} cannot hold a post id", self.base)))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    fn before_url(&self, instant: Option<DateTime<Utc>>) -> Url {
        let mut url = self.base.clone();
        if let Some(instant) = instant {
            url.query_pairs_mut().append_pair(BEFORE_PARAM, &format_iso(&instant));
        }
        url
    }

    async fn fetch(&self, url: Url) -> StoreResult<Option<Post>> {
        tracing::debug!(%url, "fetching remote post");
        let response = self.client.get(url.clone()).send().await.map_err(transport)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(StoreError::UpstreamStatus {
                status: status.as_u16(),
                detail,
            });
        }

        let meta = rehydrate(&url, response.headers())?;
        Ok(Some(Post {
            id: meta.id,
            time: meta.time,
            content_type: meta.content_type,
            version: meta.version,
            links: meta.links,
            transport: meta.transport,
            body: PostBody::new(ResponseBody { response }),
        }))
    }
}

#[async_trait]
impl PostStore for HttpStore {
    async fn get(&self, id: &str) -> StoreResult<Option<Post>> {
        self.fetch(self.post_url(id)?).await
    }

    async fn before(&self, instant: Option<DateTime<Utc>>) -> StoreResult<Option<Post>> {
        self.fetch(self.before_url(instant)).await
    }

    async fn previous(&self, id: &str) -> StoreResult<Option<Post>> {
        let post_url = self.post_url(id)?;
        let Some(post) = self.fetch(post_url.clone()).await? else {
            return Ok(None);
        };
        let Some(link) = post.link(rel::PREVIOUS) else {
            return Ok(None);
        };
        let url = post_url.join(&link.url).map_err(|e| {
            StoreError::MalformedUpstream(format!("bad previous link {:?}: {e}", link.url))
        })?;
        self.fetch(url).await
    }
}

/// Post metadata recovered from response headers.
#[derive(Debug, PartialEq)]
struct Rehydrated {
    id: String,
    time: DateTime<Utc>,
    content_type: String,
    version: String,
    links: Vec<Link>,
    transport: TransportMeta,
}

fn rehydrate(url: &Url, map: &HeaderMap) -> StoreResult<Rehydrated> {
    let post_time = required(map, headers::POST_TIME)?;
    let time = parse_http_date(post_time)
        .map_err(|_| malformed(format!("unreadable post-time {post_time:?}")))?;
    let content_type = required(map, headers::CONTENT_TYPE)?.to_string();
    let version = required(map, headers::VERSION)?.to_string();

    let links = parse_link_header(optional(map, headers::LINK));
    let id = find_rel(&links, rel::SELF)
        .and_then(|link| url.join(&link.url).ok())
        .and_then(|target| {
            target
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|segment| !segment.is_empty())
                .and_then(decode_target)
        })
        .ok_or_else(|| malformed("couldn't get post id from Link header".to_string()))?;

    let transport = TransportMeta {
        content_length: optional(map, headers::CONTENT_LENGTH).and_then(|v| v.parse().ok()),
        last_modified: optional(map, headers::LAST_MODIFIED).and_then(|v| parse_http_date(v).ok()),
        etag: optional(map, headers::ETAG).map(str::to_string),
    };

    Ok(Rehydrated {
        id,
        time,
        content_type,
        version,
        links,
        transport,
    })
}

fn required<'a>(map: &'a HeaderMap, name: &str) -> StoreResult<&'a str> {
    optional(map, name).ok_or_else(|| malformed(format!("post didn't have a {name} header")))
}

/// Header value as text. UTF-8 outside visible ASCII is accepted so a
/// non-encoding upstream still yields its links.
fn optional<'a>(map: &'a HeaderMap, name: &str) -> Option<&'a str> {
    map.get(name).and_then(|v| std::str::from_utf8(v.as_bytes()).ok())
}

fn malformed(reason: String) -> StoreError {
    StoreError::MalformedUpstream(reason)
}

fn transport(e: reqwest::Error) -> StoreError {
    StoreError::Transport(e.to_string())
}

struct ResponseBody {
    response: Response,
}

#[async_trait]
impl BodySource for ResponseBody {
    async fn open(self: Box<Self>) -> StoreResult<Box<dyn BodyReader>> {
        Ok(Box::new(ResponseReader {
            response: self.response,
        }))
    }
}

struct ResponseReader {
    response: Response,
}

#[async_trait]
impl BodyReader for ResponseReader {
    async fn next_chunk(&mut self) -> StoreResult<Option<Bytes>> {
        self.response.chunk().await.map_err(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, StatusCode as AxumStatus};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Router;
    use chrono::TimeZone;
    use reqwest::header::HeaderValue;

    fn store(base: &str) -> HttpStore {
        HttpStore::new(Url::parse(base).unwrap()).unwrap()
    }

    fn header_map(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_str(v).unwrap());
        }
        map
    }

    fn full_headers() -> Vec<(&'static str, &'static str)> {
        vec![
            ("post-time", "Wed, 01 Jul 2020 05:11:21 GMT"),
            ("content-type", "text/plain"),
            ("time-streams-version", "1"),
            ("link", r#"</renamed-id>; rel="self", </20200630051121Z-hi>; rel="previous""#),
        ]
    }

    async fn upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{addr}")
    }

    #[test]
    fn rejects_other_schemes() {
        let err = HttpStore::new(Url::parse("ftp://example.com").unwrap()).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedProtocol(p) if p == "ftp:"));
    }

    #[test]
    fn request_urls() {
        let s = store("http://example.com/");
        assert_eq!(
            s.post_url("20200701051121Z-hello").unwrap().as_str(),
            "http://example.com/20200701051121Z-hello"
        );
        assert_eq!(
            s.post_url("20200701000000Z-my post?#").unwrap().as_str(),
            "http://example.com/20200701000000Z-my%20post%3F%23"
        );
        assert_eq!(
            store("http://example.com/stream").post_url("20200701000000Z-café").unwrap().as_str(),
            "http://example.com/stream/20200701000000Z-caf%C3%A9"
        );
        assert_eq!(s.before_url(None).as_str(), "http://example.com/");
        let t = Utc.with_ymd_and_hms(2020, 7, 1, 5, 11, 21).unwrap();
        assert_eq!(
            s.before_url(Some(t)).as_str(),
            "http://example.com/?before=2020-07-01T05%3A11%3A21Z"
        );
    }

    #[test]
    fn id_comes_from_self_link() {
        let url = Url::parse("http://example.com/20200701051121Z-hello").unwrap();
        let meta = rehydrate(&url, &header_map(&full_headers())).unwrap();
        assert_eq!(meta.id, "renamed-id");
        assert_eq!(meta.time, Utc.with_ymd_and_hms(2020, 7, 1, 5, 11, 21).unwrap());
        assert_eq!(meta.content_type, "text/plain");
        assert_eq!(meta.version, "1");
        assert_eq!(meta.links.len(), 2);
        assert_eq!(meta.transport, TransportMeta::default());
    }

    #[test]
    fn id_is_percent_decoded() {
        let url = Url::parse("http://example.com/").unwrap();
        let mut pairs = full_headers();
        pairs.retain(|(k, _)| *k != "link");
        pairs.push(("link", r#"</20200701000000Z-caf%C3%A9%20au%20lait>; rel="self""#));
        let meta = rehydrate(&url, &header_map(&pairs)).unwrap();
        assert_eq!(meta.id, "20200701000000Z-café au lait");
    }

    #[test]
    fn raw_utf8_links_are_read() {
        let url = Url::parse("http://example.com/").unwrap();
        let mut map = header_map(&full_headers());
        map.insert(
            "link",
            HeaderValue::from_bytes("</20200701000000Z-café>; rel=\"self\"".as_bytes()).unwrap(),
        );
        let meta = rehydrate(&url, &map).unwrap();
        assert_eq!(meta.id, "20200701000000Z-café");
    }

    #[test]
    fn optional_transport_headers() {
        let url = Url::parse("http://example.com/").unwrap();
        let mut pairs = full_headers();
        pairs.push(("content-length", "9"));
        pairs.push(("etag", "W/\"abc\""));
        pairs.push(("last-modified", "Wed, 01 Jul 2020 06:00:00 GMT"));
        let meta = rehydrate(&url, &header_map(&pairs)).unwrap();
        assert_eq!(meta.transport.content_length, Some(9));
        assert_eq!(meta.transport.etag.as_deref(), Some("W/\"abc\""));
        assert!(meta.transport.last_modified.is_some());
    }

    #[test]
    fn missing_required_headers_are_malformed() {
        let url = Url::parse("http://example.com/").unwrap();
        for skip in ["post-time", "content-type", "time-streams-version", "link"] {
            let pairs: Vec<_> = full_headers().into_iter().filter(|(k, _)| *k != skip).collect();
            let err = rehydrate(&url, &header_map(&pairs)).unwrap_err();
            assert!(matches!(err, StoreError::MalformedUpstream(_)), "missing {skip}");
        }
    }

    #[test]
    fn link_without_self_is_malformed() {
        let url = Url::parse("http://example.com/").unwrap();
        let mut pairs = full_headers();
        pairs.retain(|(k, _)| *k != "link");
        pairs.push(("link", r#"</x>; rel="previous""#));
        assert!(matches!(
            rehydrate(&url, &header_map(&pairs)),
            Err(StoreError::MalformedUpstream(_))
        ));
    }

    #[tokio::test]
    async fn not_found_is_none() {
        let base = upstream(Router::new()).await;
        assert!(store(&base).get("20200701051121Z-hello").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn server_error_carries_body() {
        let router = Router::new().route(
            "/",
            get(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "disk on fire") }),
        );
        let base = upstream(router).await;
        let err = store(&base).before(None).await.unwrap_err();
        match err {
            StoreError::UpstreamStatus { status, detail } => {
                assert_eq!(status, 500);
                assert_eq!(detail, "disk on fire");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn success_without_headers_is_malformed() {
        let router = Router::new().route("/", get(|| async { "just text" }));
        let base = upstream(router).await;
        assert!(matches!(
            store(&base).before(None).await,
            Err(StoreError::MalformedUpstream(_))
        ));
    }

    #[tokio::test]
    async fn streams_body_and_follows_previous() {
        async fn head() -> impl IntoResponse {
            (
                [
                    (header::CONTENT_TYPE, "text/plain"),
                    (header::HeaderName::from_static("post-time"), "Wed, 01 Jul 2020 05:11:21 GMT"),
                    (header::HeaderName::from_static("time-streams-version"), "1"),
                    (
                        header::LINK,
                        r#"</20200701051121Z-hello>; rel="self", </20200630051121Z-hi>; rel="previous""#,
                    ),
                ],
                "with a timestamp",
            )
        }
        async fn tail() -> impl IntoResponse {
            (
                [
                    (header::CONTENT_TYPE, "text/plain"),
                    (header::HeaderName::from_static("post-time"), "Tue, 30 Jun 2020 05:11:21 GMT"),
                    (header::HeaderName::from_static("time-streams-version"), "1"),
                    (header::LINK, r#"</20200630051121Z-hi>; rel="self""#),
                ],
                "hi there!",
            )
        }
        let router = Router::new()
            .route("/20200701051121Z-hello", get(head))
            .route("/20200630051121Z-hi", get(tail));
        let base = upstream(router).await;
        let s = store(&base);

        let post = s.get("20200701051121Z-hello").await.unwrap().unwrap();
        assert_eq!(post.id, "20200701051121Z-hello");
        let body = post.body.open().await.unwrap().read_to_end().await.unwrap();
        assert_eq!(body, b"with a timestamp");

        let prev = s.previous("20200701051121Z-hello").await.unwrap().unwrap();
        assert_eq!(prev.id, "20200630051121Z-hi");
        assert!(s.previous("20200630051121Z-hi").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unreachable_upstream_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = store(&format!("http://{addr}")).before(None).await.unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)));
    }
}
