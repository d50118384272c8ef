//! End-to-end resolution of attachments across inline, file and URL sources.

use std::io::Write;

use attache_core::{Attachment, Error, FetchConfig, HttpFetcher, Row, RowValue};
use base64::Engine;
use sha2::{Digest, Sha256};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(FetchConfig::default()).expect("Failed to create fetcher")
}

#[tokio::test]
async fn test_identifier_is_deterministic_across_instances() {
    let samples: [&[u8]; 4] = [b"", b"a", b"attachment body", &[0u8, 255, 128, 7]];

    for bytes in samples {
        let first = Attachment::from_bytes(bytes);
        let second = Attachment::from_bytes(bytes);

        let a = first.id().await.unwrap().to_string();
        let b = first.id().await.unwrap().to_string();
        let c = second.id().await.unwrap().to_string();

        assert_eq!(a, sha256_hex(bytes));
        assert_eq!(a, b, "memoized id should not change");
        assert_eq!(a, c, "equal content should give equal ids");
    }
}

#[tokio::test]
async fn test_identifier_same_for_inline_and_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"shared payload").unwrap();

    let inline = Attachment::from_bytes(b"shared payload".to_vec());
    let on_disk = Attachment::from_path(file.path());

    assert_eq!(inline.id().await.unwrap(), on_disk.id().await.unwrap());
}

#[tokio::test]
async fn test_url_identifier_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let url = format!("{}/x", server.uri());
    let attachment = Attachment::from_url(url.clone());

    let expected = sha256_hex(serde_json::json!({ "url": url }).to_string().as_bytes());
    assert_eq!(attachment.id().await.unwrap(), expected);
}

#[tokio::test]
async fn test_url_identifier_for_example_url() {
    let attachment = Attachment::from_url("https://example.com/x");
    assert_eq!(
        attachment.id().await.unwrap(),
        sha256_hex(br#"{"url":"https://example.com/x"}"#)
    );
}

#[tokio::test]
async fn test_explicit_type_wins_over_every_source() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Type", "text/html"))
        .expect(0)
        .mount(&server)
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"%PDF-1.4\n").unwrap();

    let candidates = [
        Attachment::from_bytes(b"plain".to_vec()),
        Attachment::from_path(file.path()),
        Attachment::from_url(server.uri()),
    ];

    for attachment in candidates {
        let attachment = attachment.with_type("image/png");
        assert_eq!(
            attachment.resolve_type_with(&fetcher()).await.unwrap(),
            "image/png"
        );
    }
}

#[tokio::test]
async fn test_url_type_from_head_request() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/image"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Type", "image/webp"))
        .expect(2)
        .mount(&server)
        .await;

    let attachment = Attachment::from_url(format!("{}/image", server.uri()));

    // Not memoized: both calls hit the server.
    assert_eq!(attachment.resolve_type_with(&fetcher()).await.unwrap(), "image/webp");
    assert_eq!(attachment.resolve_type_with(&fetcher()).await.unwrap(), "image/webp");
}

#[tokio::test]
async fn test_url_content_and_base64() {
    let body = vec![0x89u8, b'P', b'N', b'G', 0, 1, 2, 3];
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/file.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(2)
        .mount(&server)
        .await;

    let attachment = Attachment::from_url(format!("{}/file.png", server.uri()));
    let fetcher = fetcher();

    let bytes = attachment.content_bytes_with(&fetcher).await.unwrap();
    assert_eq!(bytes.as_ref(), body.as_slice());

    let encoded = attachment.base64_content_with(&fetcher).await.unwrap();
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .unwrap();
    assert_eq!(decoded, body);
}

#[tokio::test]
async fn test_url_request_failure_surfaces() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let attachment = Attachment::from_url(format!("http://127.0.0.1:{}/gone", port));

    let result = attachment.content_bytes_with(&fetcher()).await;
    assert!(matches!(result, Err(Error::Request(_))));
    let result = attachment.resolve_type_with(&fetcher()).await;
    assert!(matches!(result, Err(Error::Request(_))));
}

#[tokio::test]
async fn test_no_source_behavior() {
    let attachment = Attachment::empty();

    let type_err = attachment.resolve_type().await.unwrap_err();
    assert_eq!(
        type_err.to_string(),
        "attachment has no type and no content to derive it from"
    );

    let content_err = attachment.content_bytes().await.unwrap_err();
    assert_eq!(content_err.to_string(), "no content available");

    assert_eq!(attachment.id().await.unwrap(), "");
}

#[tokio::test]
async fn test_record_with_path_reads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&[9u8, 8, 7, 6, 5]).unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let mut row = Row::new();
    row.insert("path".to_string(), RowValue::from(path.as_str()));
    let attachment = Attachment::from_row(&row);

    let via_attachment = attachment.content_bytes().await.unwrap().into_owned();
    let direct = std::fs::read(&path).unwrap();
    assert_eq!(via_attachment, direct);
}

#[tokio::test]
async fn test_record_with_stored_id_skips_hashing() {
    let mut row = Row::new();
    row.insert("id".to_string(), RowValue::from("precomputed"));
    row.insert("path".to_string(), RowValue::from("/definitely/not/here"));

    let attachment = Attachment::from_row(&row);
    assert_eq!(attachment.id().await.unwrap(), "precomputed");
}

#[tokio::test]
async fn test_base64_matches_content_for_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"base64 me, please").unwrap();
    let attachment = Attachment::from_path(file.path());

    let bytes = attachment.content_bytes().await.unwrap().into_owned();
    let encoded = attachment.base64_content().await.unwrap();
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .unwrap();
    assert_eq!(decoded, bytes);
}

#[tokio::test]
async fn test_missing_file_errors_are_io() {
    let dir = tempfile::tempdir().unwrap();
    let attachment = Attachment::from_path(dir.path().join("missing.bin"));

    assert!(matches!(attachment.content_bytes().await, Err(Error::Io(_))));
    assert!(matches!(attachment.resolve_type().await, Err(Error::Io(_))));
    assert!(matches!(attachment.base64_content().await, Err(Error::Io(_))));
    assert!(matches!(attachment.id().await, Err(Error::Io(_))));
}
