//! A remote store in front of a server in front of a local store must see
//! the same stream as the local store itself.

use std::net::SocketAddr;
use std::path::Path;

use chrono::{TimeZone, Utc};
use tokio::net::TcpListener;
use ts_sdk::{get_post, GetOptions, Post, PostStore, Source};
use ts_server::{ServerConfig, TsServer};
use ts_store::FsStore;

const FILES: &[(&str, &str)] = &[
    ("2020/07/01/051121Z-hello.txt", "with a timestamp"),
    ("2020/07/01/051121Z-hello.meta.json", "{\"title\":\"hello\"}"),
    ("2020/06/30/051121Z-hi.txt", "hi there!"),
    ("2019/12/31/note.md", "# last of the year"),
];

fn fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (path, contents) in FILES {
        let path = dir.path().join(path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }
    dir
}

async fn spawn_server(root: &Path, config: ServerConfig) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = TsServer::new(config, FsStore::new(root));
    tokio::spawn(server.serve_on(listener));
    addr
}

async fn summary(post: Post) -> (String, String, Vec<u8>) {
    let id = post.id.clone();
    let content_type = post.content_type.clone();
    let bytes = post.body.open().await.unwrap().read_to_end().await.unwrap();
    (id, content_type, bytes)
}

async fn walk(store: &dyn PostStore) -> Vec<(String, String, Vec<u8>)> {
    let mut posts = Vec::new();
    let mut current = store.before(None).await.unwrap();
    while let Some(post) = current {
        current = store.previous(&post.id).await.unwrap();
        posts.push(summary(post).await);
    }
    posts
}

#[tokio::test]
async fn remote_walk_matches_local() {
    let dir = fixture();
    let addr = spawn_server(dir.path(), ServerConfig::default()).await;

    let local = Source::open(dir.path().to_str().unwrap(), Path::new(".")).unwrap();
    let remote = Source::open(&format!("http://{addr}/"), Path::new(".")).unwrap();

    let expected = walk(&local).await;
    assert_eq!(expected.len(), 3);
    assert_eq!(walk(&remote).await, expected);
}

#[tokio::test]
async fn remote_lookups_match_local() {
    let dir = fixture();
    let addr = spawn_server(dir.path(), ServerConfig::default()).await;
    let local = FsStore::new(dir.path());
    let remote = Source::open(&format!("http://{addr}/"), Path::new(".")).unwrap();

    for id in ["20200701051121Z-hello", "20200701051121Z-hello.meta.json", "20200630051121Z-hi"] {
        let want = summary(local.get(id).await.unwrap().unwrap()).await;
        let got = summary(remote.get(id).await.unwrap().unwrap()).await;
        assert_eq!(got, want);
    }

    let instant = Utc.with_ymd_and_hms(2020, 7, 1, 5, 11, 21).unwrap();
    let got = summary(remote.before(Some(instant)).await.unwrap().unwrap()).await;
    assert_eq!(got.0, "20200630051121Z-hi");

    let early = Utc.with_ymd_and_hms(1980, 1, 1, 0, 0, 0).unwrap();
    assert!(remote.before(Some(early)).await.unwrap().is_none());
    assert!(remote.get("20200701051121Z-nope").await.unwrap().is_none());
}

#[tokio::test]
async fn remote_with_opaque_ids() {
    let dir = fixture();
    let config = ServerConfig {
        opaque_ids: true,
        ..ServerConfig::default()
    };
    let addr = spawn_server(dir.path(), config).await;
    let remote = Source::open(&format!("http://{addr}/"), Path::new(".")).unwrap();

    let bodies: Vec<Vec<u8>> = walk(&remote).await.into_iter().map(|(_, _, b)| b).collect();
    assert_eq!(
        bodies,
        vec![
            b"with a timestamp".to_vec(),
            b"hi there!".to_vec(),
            b"# last of the year".to_vec(),
        ]
    );
}

#[tokio::test]
async fn ids_with_spaces_and_non_ascii_survive_the_relay() {
    let dir = tempfile::tempdir().unwrap();
    for (path, contents) in [
        ("2020/07/01/café.txt", "au lait"),
        ("2020/07/01/083000Z-my post.txt", "spaced out"),
        ("2020/07/01/093000Z-what?.txt", "asked"),
        ("2020/07/02/next.txt", "after"),
    ] {
        let path = dir.path().join(path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }
    let addr = spawn_server(dir.path(), ServerConfig::default()).await;
    let local = FsStore::new(dir.path());
    let remote = Source::open(&format!("http://{addr}/"), Path::new(".")).unwrap();

    let expected = walk(&local).await;
    let ids: Vec<&str> = expected.iter().map(|(id, _, _)| id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "20200702000000Z-next",
            "20200701093000Z-what?",
            "20200701083000Z-my post",
            "20200701000000Z-café",
        ]
    );
    assert_eq!(walk(&remote).await, expected);

    for id in ids {
        let want = summary(local.get(id).await.unwrap().unwrap()).await;
        let got = summary(remote.get(id).await.unwrap().unwrap()).await;
        assert_eq!(got, want);
    }
}

#[tokio::test]
async fn get_command_over_http() {
    let dir = fixture();
    let addr = spawn_server(dir.path(), ServerConfig::default()).await;
    let remote = Source::open(&format!("http://{addr}"), Path::new(".")).unwrap();

    let options = GetOptions {
        headers: true,
        id: Some("20200630051121Z-hi".into()),
        ..GetOptions::default()
    };
    let mut out = Vec::new();
    get_post(&remote, &options, &mut out).await.unwrap();
    let out = String::from_utf8(out).unwrap();
    let (head, body) = out.split_once("\r\n\r\n").unwrap();
    assert_eq!(body, "hi there!");
    assert!(head.contains("content-type: text/plain\r\n"), "{head}");
    assert!(head.contains("content-length: 9\r\n"), "{head}");
}
