use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio_stream::StreamExt;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vidgrab::config::Config;
use vidgrab::extractor::{ExtractError, Extractor};
use vidgrab::models::RawInfo;
use vidgrab::{router, AppState};

/// Canned extractor. Records the URLs and formats it was asked for.
#[derive(Default)]
struct FakeExtractor {
    info: Option<Value>,
    refuse: bool,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeExtractor {
    fn returning(info: Value) -> Self {
        FakeExtractor { info: Some(info), ..Default::default() }
    }

    fn refusing() -> Self {
        FakeExtractor { refuse: true, ..Default::default() }
    }

    fn respond(&self) -> Result<RawInfo, ExtractError> {
        if self.refuse {
            return Err(ExtractError::Download("Private video".into()));
        }
        match &self.info {
            Some(info) => Ok(serde_json::from_value(info.clone())?),
            None => Err(ExtractError::Spawn(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "yt-dlp not installed",
            ))),
        }
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    async fn extract_info(&self, url: &str) -> Result<RawInfo, ExtractError> {
        self.calls.lock().unwrap().push((url.to_string(), None));
        self.respond()
    }

    async fn resolve_format(&self, url: &str, format_id: &str) -> Result<RawInfo, ExtractError> {
        self.calls.lock().unwrap().push((url.to_string(), Some(format_id.to_string())));
        self.respond()
    }
}

struct TestApp {
    app: Router,
    extractor: Arc<FakeExtractor>,
    _static_dir: TempDir,
}

impl TestApp {
    fn new(extractor: FakeExtractor) -> Self {
        let static_dir = tempfile::tempdir().unwrap();
        std::fs::write(static_dir.path().join("index.html"), "<html>index</html>").unwrap();
        std::fs::create_dir_all(static_dir.path().join("assets")).unwrap();
        std::fs::write(static_dir.path().join("assets/app.js"), "console.log(1)").unwrap();

        let config = Config {
            static_dir: static_dir.path().to_path_buf(),
            chunk_size: 4,
            ..Config::default()
        };
        let extractor = Arc::new(extractor);
        let state = AppState::new(config, extractor.clone()).unwrap();
        TestApp { app: router(state), extractor, _static_dir: static_dir }
    }

    async fn get(&self, uri: &str) -> Response {
        self.app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    fn calls(&self) -> Vec<(String, Option<String>)> {
        self.extractor.calls.lock().unwrap().clone()
    }
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn header_str<'a>(response: &'a Response, name: header::HeaderName) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

// ===================================================================
//                          /api/info
// ===================================================================

#[tokio::test]
async fn info_requires_url() {
    let app = TestApp::new(FakeExtractor::returning(json!({})));

    let response = app.get("/api/info").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "URL parameter is missing.");

    let response = app.get("/api/info?url=").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.calls().is_empty());
}

#[tokio::test]
async fn info_normalizes_single_video() {
    let app = TestApp::new(FakeExtractor::returning(json!({
        "id": "abc",
        "title": "A video",
        "thumbnail": "https://i.example/abc.jpg",
        "duration": 3661,
        "formats": [
            {"format_id": "sb0", "vcodec": "none", "acodec": "none", "ext": "mhtml"},
            {"format_id": "140", "vcodec": "none", "acodec": "mp4a.40.2", "ext": "m4a",
             "resolution": "audio only", "filesize": 3000, "format_note": "medium"},
            {"format_id": "137", "vcodec": "avc1", "acodec": "none", "ext": "mp4",
             "width": 1920, "height": 1080, "filesize_approx": 9000.5}
        ]
    })));

    let response = app.get("/api/info?url=https%3A%2F%2Fexample.com%2Fwatch%3Fv%3Dabc").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.calls(), vec![("https://example.com/watch?v=abc".to_string(), None)]);

    let body = body_json(response).await;
    assert_eq!(body["type"], "video");
    assert_eq!(body["id"], "abc");
    assert_eq!(body["thumbnailUrl"], "https://i.example/abc.jpg");
    assert_eq!(body["duration"], "1:01:01");
    assert_eq!(
        body["formats"],
        json!([
            {"format_id": "140", "resolution": "audio only", "ext": "m4a", "vcodec": "none",
             "acodec": "mp4a.40.2", "filesize": 3000, "type": "audio", "note": "medium"},
            {"format_id": "137", "resolution": "1920x1080", "ext": "mp4", "vcodec": "avc1",
             "acodec": "none", "filesize": 9000, "type": "video", "note": ""}
        ])
    );
}

#[tokio::test]
async fn info_normalizes_playlist() {
    let app = TestApp::new(FakeExtractor::returning(json!({
        "_type": "playlist",
        "id": "PL1",
        "title": "Mix",
        "entries": [{"id": "a", "title": "One", "duration": 61}, null]
    })));

    let body = body_json(app.get("/api/info?url=https://example.com/list").await).await;
    assert_eq!(body["type"], "playlist");
    assert_eq!(body["title"], "Mix");
    assert_eq!(body["videos"].as_array().unwrap().len(), 1);
    assert_eq!(body["videos"][0]["duration"], "1:01");
    assert!(body["videos"][0].get("type").is_none());
}

#[tokio::test]
async fn info_reports_protected_content_with_ok_status() {
    let app = TestApp::new(FakeExtractor::refusing());

    let response = app.get("/api/info?url=https://example.com/private").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["isProtected"], true);
    assert!(body["message"].as_str().unwrap().contains("protected"));
}

#[tokio::test]
async fn info_unexpected_failure_is_server_error() {
    let app = TestApp::new(FakeExtractor::default());

    let response = app.get("/api/info?url=https://example.com/v").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["message"], "An unexpected server error occurred.");
}

// ===================================================================
//                          downloads
// ===================================================================

#[tokio::test]
async fn download_requires_both_ids() {
    let app = TestApp::new(FakeExtractor::returning(json!({})));

    for uri in [
        "/api/download",
        "/api/download?videoId=abc",
        "/api/download?formatId=18",
        "/download/clip.mp4?videoId=abc",
        "/download/clip.mp4?formatId=18",
    ] {
        let response = app.get(uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(
            body_json(response).await["message"],
            "videoId and formatId parameters are required."
        );
    }
    assert!(app.calls().is_empty());
}

#[tokio::test]
async fn download_streams_upstream_media() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/abc.webm"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "video/webm")
                .set_body_bytes(b"0123456789".to_vec()),
        )
        .mount(&upstream)
        .await;

    let app = TestApp::new(FakeExtractor::returning(json!({
        "id": "abc",
        "title": "Live: at <the> \"venue\"",
        "ext": "webm",
        "format_note": "720p",
        "filesize": 10,
        "url": format!("{}/media/abc.webm", upstream.uri())
    })));

    let response = app.get("/api/download?videoId=abc&formatId=247").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        app.calls(),
        vec![("https://www.youtube.com/watch?v=abc".to_string(), Some("247".to_string()))]
    );
    assert_eq!(header_str(&response, header::CONTENT_TYPE), Some("video/webm"));
    assert_eq!(header_str(&response, header::CONTENT_LENGTH), Some("10"));
    let disposition = header_str(&response, header::CONTENT_DISPOSITION).unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\"Live at the venue - 720p.webm\""));

    // The test config caps relayed chunks at 4 bytes.
    let mut chunks = response.into_body().into_data_stream();
    let mut relayed = Vec::new();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.unwrap();
        assert!(!chunk.is_empty() && chunk.len() <= 4, "chunk of {} bytes", chunk.len());
        relayed.extend_from_slice(&chunk);
    }
    assert_eq!(relayed, b"0123456789");
}

#[tokio::test]
async fn download_defaults_content_type_and_omits_unknown_length() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blob"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"abc".to_vec()))
        .mount(&upstream)
        .await;

    let app = TestApp::new(FakeExtractor::returning(json!({
        "title": "Clip",
        "ext": "m4a",
        "url": format!("{}/blob", upstream.uri())
    })));

    let response = app.get("/api/download?videoId=x&formatId=140").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_str(&response, header::CONTENT_TYPE),
        Some("application/octet-stream")
    );
    assert_eq!(header_str(&response, header::CONTENT_LENGTH), None);
    assert_eq!(body_bytes(response).await, b"abc");
}

#[tokio::test]
async fn pretty_download_uses_path_filename() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "video/mp4")
                .set_body_bytes(b"data".to_vec()),
        )
        .mount(&upstream)
        .await;

    let app = TestApp::new(FakeExtractor::returning(json!({
        "title": "Ignored title",
        "ext": "mp4",
        "url": format!("{}/media", upstream.uri())
    })));

    let response = app.get("/download/My%20Clip%3F.mp4?videoId=abc&formatId=18").await;
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = header_str(&response, header::CONTENT_DISPOSITION).unwrap();
    assert!(disposition.starts_with("attachment; filename=\"My Clip.mp4\""));
    assert_eq!(body_bytes(response).await, b"data");
}

#[tokio::test]
async fn pretty_download_estimates_length_from_bitrate() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/audio"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"aac".to_vec()))
        .mount(&upstream)
        .await;

    let app = TestApp::new(FakeExtractor::returning(json!({
        "title": "Podcast",
        "ext": "m4a",
        "tbr": 129.5,
        "duration": 10,
        "url": format!("{}/audio", upstream.uri())
    })));

    let response = app.get("/download/podcast.m4a?videoId=abc&formatId=140").await;
    assert_eq!(response.status(), StatusCode::OK);
    let expected = (161 * 1024).to_string();
    assert_eq!(header_str(&response, header::CONTENT_LENGTH), Some(expected.as_str()));
}

#[tokio::test]
async fn download_extraction_failure_names_format() {
    let app = TestApp::new(FakeExtractor::refusing());

    let response = app.get("/api/download?videoId=abc&formatId=22").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await["message"],
        "Failed to process download for format 22."
    );

    let response = app.get("/download/clip.mp4?videoId=abc&formatId=22").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await["message"],
        "Failed to process download for clip.mp4."
    );
}

#[tokio::test]
async fn download_without_direct_url_is_server_error() {
    let app = TestApp::new(FakeExtractor::returning(json!({"title": "Merged", "ext": "mkv"})));

    let response = app.get("/api/download?videoId=abc&formatId=137%2B140").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await["message"],
        "Failed to process download for format 137+140."
    );
}

#[tokio::test]
async fn download_upstream_error_is_server_error() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&upstream)
        .await;

    let app = TestApp::new(FakeExtractor::returning(json!({
        "title": "Expired",
        "url": format!("{}/expired", upstream.uri())
    })));

    let response = app.get("/api/download?videoId=abc&formatId=18").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// ===================================================================
//                          static frontend
// ===================================================================

#[tokio::test]
async fn serves_static_assets() {
    let app = TestApp::new(FakeExtractor::default());

    let response = app.get("/assets/app.js").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"console.log(1)");
}

#[tokio::test]
async fn unknown_paths_fall_back_to_index() {
    let app = TestApp::new(FakeExtractor::default());

    for uri in ["/", "/some/client/route"] {
        let response = app.get(uri).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert_eq!(body_bytes(response).await, b"<html>index</html>");
    }
}
