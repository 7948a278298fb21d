//! End-to-end seek behavior over real HTTP.

use flv_pseudostream::config::LocationConfig;
use flv_pseudostream::flv::{FilterMode, FLV_HEADER};

mod common;

fn expected_from(data: &[u8], start: usize) -> Vec<u8> {
    let mut out = FLV_HEADER.to_vec();
    out.extend_from_slice(&data[start..]);
    out
}

#[tokio::test]
async fn test_static_seek_injects_header() {
    let data = common::payload(1000);
    let dir = common::media_dir(&[("clip.flv", &data)]);
    let server = common::start_server(common::static_config(&dir, FilterMode::On)).await;

    let res = common::client()
        .get(server.url("/clip.flv?start=500"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-length"], "513");
    assert_eq!(res.headers()["content-type"], "video/x-flv");
    assert!(res.headers().contains_key("x-request-id"));

    let body = res.bytes().await.unwrap();
    assert_eq!(body.len(), 513);
    assert_eq!(&body[..13], b"FLV\x01\x05\x00\x00\x00\x09\x00\x00\x00\x00");
    assert_eq!(body.to_vec(), expected_from(&data, 500));
}

#[tokio::test]
async fn test_small_read_chunks_give_same_body() {
    let data = common::payload(1000);
    let dir = common::media_dir(&[("clip.flv", &data)]);
    let mut config = common::static_config(&dir, FilterMode::On);
    config.static_files.read_chunk_size = 7;
    let server = common::start_server(config).await;

    let body = common::client()
        .get(server.url("/clip.flv?start=500"))
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();

    assert_eq!(body.to_vec(), expected_from(&data, 500));
}

#[tokio::test]
async fn test_declined_requests_are_untouched() {
    let data = common::payload(1000);
    let dir = common::media_dir(&[("clip.flv", &data)]);
    let server = common::start_server(common::static_config(&dir, FilterMode::On)).await;
    let client = common::client();

    for query in [
        "",
        "?start=0",
        "?start=1000",
        "?start=2000",
        "?start=abc",
        "?start=-5",
        "?begin=500",
        "?start",
    ] {
        let res = client
            .get(server.url(&format!("/clip.flv{}", query)))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), 200, "query {query:?}");
        assert_eq!(res.headers()["content-length"], "1000", "query {query:?}");
        assert_eq!(res.bytes().await.unwrap().to_vec(), data, "query {query:?}");
    }
}

#[tokio::test]
async fn test_mode_off_is_identity() {
    let data = common::payload(1000);
    let dir = common::media_dir(&[("clip.flv", &data)]);
    let server = common::start_server(common::static_config(&dir, FilterMode::Off)).await;

    let body = common::client()
        .get(server.url("/clip.flv?start=500"))
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();

    assert_eq!(body.to_vec(), data);
}

#[tokio::test]
async fn test_head_reports_rewritten_length() {
    let data = common::payload(1000);
    let dir = common::media_dir(&[("clip.flv", &data)]);
    let server = common::start_server(common::static_config(&dir, FilterMode::On)).await;

    let res = common::client()
        .head(server.url("/clip.flv?start=500"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-length"], "513");
}

#[tokio::test]
async fn test_nested_location_overrides_mode() {
    let data = common::payload(100);
    let dir = common::media_dir(&[("clip.flv", &data)]);
    std::fs::create_dir_all(dir.join("raw")).unwrap();
    std::fs::write(dir.join("raw/clip.flv"), &data).unwrap();

    let mut parent = LocationConfig::new("/");
    parent.root = Some(dir.to_string_lossy().into_owned());
    parent.flv_filter = Some(FilterMode::On);
    // Inherits the root, seek disabled below /raw/.
    let mut raw = LocationConfig::new("/raw/");
    raw.flv_filter = Some(FilterMode::Off);
    parent.locations.push(raw);

    let server = common::start_server(common::single_server(vec![parent])).await;
    let client = common::client();

    let seek = client
        .get(server.url("/clip.flv?start=40"))
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    assert_eq!(seek.to_vec(), expected_from(&data, 40));

    let raw = client
        .get(server.url("/raw/clip.flv?start=40"))
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    assert_eq!(raw.to_vec(), data);
}

#[tokio::test]
async fn test_missing_file_and_unmatched_path() {
    let dir = common::media_dir(&[]);
    let mut videos = LocationConfig::new("/videos/");
    videos.root = Some(dir.to_string_lossy().into_owned());
    videos.flv_filter = Some(FilterMode::On);
    let server = common::start_server(common::single_server(vec![videos])).await;
    let client = common::client();

    let res = client.get(server.url("/videos/none.flv?start=5")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    let res = client.get(server.url("/other/a.flv")).send().await.unwrap();
    assert_eq!(res.status(), 404);
}
