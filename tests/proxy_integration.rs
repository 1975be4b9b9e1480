//! Integration tests for the streaming download proxy.

use std::time::Duration;

use filefinder_core::config::PROXY_CHUNK_SIZE;
use filefinder_core::{DownloadProxy, ProxyConfig, ProxyError, SessionStage};
use futures_util::StreamExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_proxy() -> DownloadProxy {
    DownloadProxy::with_config(ProxyConfig {
        probe_timeout: Duration::from_secs(5),
        stream_timeout: Duration::from_secs(10),
        connect_timeout: Duration::from_secs(2),
        ..ProxyConfig::default()
    })
    .expect("proxy client should build")
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

async fn mount_file(server: &MockServer, file_path: &str, content_type: &str, body: Vec<u8>) {
    Mock::given(method("HEAD"))
        .and(path(file_path))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Type", content_type))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(file_path))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, content_type))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_open_download_streams_full_body_in_chunks() {
    let server = MockServer::start().await;
    let content = payload(PROXY_CHUNK_SIZE * 2 + 18_928);
    mount_file(
        &server,
        "/path/report.pdf",
        "application/pdf; charset=binary",
        content.clone(),
    )
    .await;

    let proxy = test_proxy();
    let url = format!("{}/path/report.pdf?x=1", server.uri());
    let download = proxy.open_download(&url).await.expect("download should open");

    assert_eq!(download.content_type, "application/pdf");
    assert_eq!(download.disposition_name, "report.pdf");
    assert_eq!(
        download.content_disposition(),
        "attachment; filename=\"report.pdf\""
    );
    assert_eq!(proxy.active_sessions(), 1);

    let chunks: Vec<_> = download.body.collect().await;
    let sizes: Vec<usize> = chunks
        .iter()
        .map(|chunk| chunk.as_ref().map_or(0, |bytes| bytes.len()))
        .collect();
    assert_eq!(sizes, vec![PROXY_CHUNK_SIZE, PROXY_CHUNK_SIZE, 18_928]);

    let received: Vec<u8> = chunks
        .into_iter()
        .flat_map(|chunk| chunk.expect("chunk should be ok").to_vec())
        .collect();
    assert_eq!(received, content);
    assert_eq!(proxy.active_sessions(), 0);
}

#[tokio::test]
async fn test_open_download_head_error_skips_get() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/missing.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing.pdf"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let proxy = test_proxy();
    let error = proxy
        .open_download(&format!("{}/missing.pdf", server.uri()))
        .await
        .expect_err("404 should fail");

    assert!(
        matches!(
            error,
            ProxyError::UpstreamStatus {
                status: 404,
                stage: SessionStage::ProbingMetadata,
                ..
            }
        ),
        "got {error:?}"
    );
    assert_eq!(error.status_code(), 404);
    assert_eq!(proxy.active_sessions(), 0);
}

#[tokio::test]
async fn test_open_download_get_error_reports_streaming_stage() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/flaky.zip"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky.zip"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let proxy = test_proxy();
    let error = proxy
        .open_download(&format!("{}/flaky.zip", server.uri()))
        .await
        .expect_err("500 should fail");

    assert!(
        matches!(
            error,
            ProxyError::UpstreamStatus {
                status: 500,
                stage: SessionStage::Streaming,
                ..
            }
        ),
        "got {error:?}"
    );
    assert_eq!(proxy.active_sessions(), 0);
}

#[tokio::test]
async fn test_open_download_rejects_non_http_without_network() {
    let proxy = test_proxy();
    for url in ["ftp://files.example/a.pdf", "not a url", ""] {
        let error = proxy.open_download(url).await.expect_err("should reject");
        assert!(matches!(error, ProxyError::InvalidInput { .. }), "got {error:?}");
        assert_eq!(error.status_code(), 400);
    }
    assert_eq!(proxy.active_sessions(), 0);
}

#[tokio::test]
async fn test_open_download_defaults_missing_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello".to_vec()))
        .mount(&server)
        .await;

    let download = test_proxy()
        .open_download(&format!("{}/", server.uri()))
        .await
        .expect("download should open");
    assert_eq!(download.content_type, "application/octet-stream");
    assert_eq!(download.disposition_name, "download");
}

#[tokio::test]
async fn test_dropping_body_early_releases_session() {
    let server = MockServer::start().await;
    mount_file(&server, "/big.bin", "application/zip", payload(PROXY_CHUNK_SIZE * 4)).await;

    let proxy = test_proxy();
    let download = proxy
        .open_download(&format!("{}/big.bin", server.uri()))
        .await
        .expect("download should open");
    let mut body = download.body;

    let first = body
        .next()
        .await
        .expect("stream should yield")
        .expect("first chunk should be ok");
    assert_eq!(first.len(), PROXY_CHUNK_SIZE);
    assert_eq!(proxy.active_sessions(), 1);

    drop(body);
    assert_eq!(proxy.active_sessions(), 0);
}

#[tokio::test]
async fn test_unreachable_upstream_maps_to_bad_gateway() {
    let server = MockServer::start().await;
    let url = format!("{}/gone.pdf", server.uri());
    drop(server);

    let proxy = test_proxy();
    let error = proxy.open_download(&url).await.expect_err("should fail");
    assert!(
        matches!(
            error,
            ProxyError::Network {
                stage: SessionStage::ProbingMetadata,
                ..
            }
        ),
        "got {error:?}"
    );
    assert_eq!(error.status_code(), 502);
    assert_eq!(proxy.active_sessions(), 0);
}
