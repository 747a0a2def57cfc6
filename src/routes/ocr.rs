//! OCR Routes
//!
//! Endpoints:
//! - POST /api/v1/ocr/file - multipart form with an `image` file part
//! - POST /api/v1/ocr/base64 - JSON `{"image": "<base64>", "filename": "optional.png"}`
//!
//! Both respond with `{"success": true, "text": ..., "confidence": ...}` or
//! the error envelope produced by [`OcrError`].

use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::BytesRejection,
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    routing::post,
    Json, Router,
};

use crate::error::{OcrError, Result};
use crate::ocr::{Base64Request, OcrResponse};
use crate::state::AppState;

/// Multipart field carrying the image
const IMAGE_FIELD: &str = "image";

/// Create the OCR router
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/file", post(ocr_file))
        .route("/base64", post(ocr_base64))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// POST /api/v1/ocr/file
///
/// Only file parts count: a plain form field named `image` is ignored, as is
/// a request that is not multipart at all.
async fn ocr_file(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<OcrResponse>> {
    let max_bytes = state.config().server.max_upload_bytes;

    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("Request is not a multipart upload: {}", e);
        OcrError::MissingImageFile
    })?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, max_bytes))?;

        tracing::debug!(
            filename = %filename,
            size = data.len(),
            "Received image upload"
        );

        let outcome = state.ocr().recognize_upload(&filename, &data).await?;
        return Ok(Json(outcome.into()));
    }

    Err(OcrError::MissingImageFile)
}

/// POST /api/v1/ocr/base64
///
/// The body is parsed by hand so that malformed JSON gets the same envelope
/// as a missing `image` field.
async fn ocr_base64(
    State(state): State<AppState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Json<OcrResponse>> {
    let body = body.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            OcrError::PayloadTooLarge {
                max_bytes: state.config().server.max_upload_bytes,
            }
        } else {
            OcrError::UploadRead(e.body_text())
        }
    })?;

    let request: Base64Request = serde_json::from_slice(&body).map_err(|e| {
        OcrError::MissingImageData {
            details: Some(e.to_string()),
        }
    })?;

    let outcome = state.ocr().recognize_base64(request).await?;
    Ok(Json(outcome.into()))
}

fn multipart_error(error: MultipartError, max_bytes: usize) -> OcrError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        OcrError::PayloadTooLarge { max_bytes }
    } else {
        OcrError::UploadRead(error.body_text())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum_test::TestServer;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::config::{Config, Deployment};
    use crate::ocr::mock::{sample_png, Behavior, MockEngine};
    use crate::ocr::TextLine;
    use crate::routes;
    use crate::state::AppState;

    const BOUNDARY: &str = "ocr-test-boundary";

    struct Harness {
        app: axum::Router,
        engine: Arc<MockEngine>,
        upload_dir: TempDir,
    }

    impl Harness {
        fn new(behavior: Behavior) -> Self {
            Self::with_config(behavior, |_| {})
        }

        fn with_config(behavior: Behavior, configure: impl FnOnce(&mut Config)) -> Self {
            let upload_dir = TempDir::new().unwrap();
            let mut config = Config::default();
            config.storage.upload_dir = upload_dir.path().to_path_buf();
            configure(&mut config);

            let engine = Arc::new(MockEngine::new(behavior));
            let state = AppState::new(config, engine.clone());

            Self {
                app: routes::router(state),
                engine,
                upload_dir,
            }
        }

        fn server(&self) -> TestServer {
            TestServer::new(self.app.clone()).unwrap()
        }

        fn leftover_files(&self) -> usize {
            std::fs::read_dir(self.upload_dir.path()).unwrap().count()
        }

        /// Send a hand-built multipart body to the file endpoint
        async fn post_parts(&self, parts: &[Part<'_>]) -> (StatusCode, Value) {
            let request = Request::builder()
                .method("POST")
                .uri("/api/v1/ocr/file")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(multipart_body(parts)))
                .unwrap();

            let response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            (status, serde_json::from_slice(&bytes).unwrap())
        }
    }

    struct Part<'a> {
        name: &'a str,
        filename: Option<&'a str>,
        data: &'a [u8],
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part.filename {
                Some(filename) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        part.name, filename
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                        part.name
                    )
                    .as_bytes(),
                ),
            }
            body.extend_from_slice(part.data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn lines() -> Behavior {
        Behavior::Lines(vec![
            TextLine::new("INVOICE", 0.9),
            TextLine::new("No. 1042 ", 0.7),
        ])
    }

    #[tokio::test]
    async fn test_health_is_static() {
        let harness = Harness::new(Behavior::Fail("boom".into()));
        let server = harness.server();

        let response = server.get("/health").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body, json!({"status": "healthy", "message": "OCR service is running"}));

        // A failing request in between changes nothing
        let png = sample_png(2, 2);
        let (status, _) = harness
            .post_parts(&[Part { name: "image", filename: Some("a.png"), data: &png }])
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = server.get("/health").await.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(harness.leftover_files(), 0);
    }

    #[tokio::test]
    async fn test_service_index_only_for_serverless() {
        let local = Harness::new(lines());
        let response = local.server().get("/").expect_failure().await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

        let serverless = Harness::with_config(lines(), |config| {
            config.storage.deployment = Deployment::Serverless;
        });
        let body: Value = serverless.server().get("/").await.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["endpoints"]["file_upload"], "/api/v1/ocr/file");
        assert_eq!(body["endpoints"]["base64"], "/api/v1/ocr/base64");
        assert_eq!(body["endpoints"]["health_check"], "/health");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_file_upload_success() {
        let harness = Harness::new(lines());
        let png = sample_png(4, 4);

        let (status, body) = harness
            .post_parts(&[
                Part { name: "note", filename: None, data: b"ignored" },
                Part { name: "image", filename: Some("scan.PNG"), data: &png },
            ])
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["text"], "INVOICE No. 1042");
        assert!((body["confidence"].as_f64().unwrap() - 0.8).abs() < 1e-9);
        assert_eq!(harness.engine.calls(), 1);
        assert!(harness.engine.seen()[0].existed);
        assert_eq!(harness.leftover_files(), 0);
    }

    #[tokio::test]
    async fn test_file_upload_missing_image() {
        let harness = Harness::new(lines());

        let (status, body) = harness
            .post_parts(&[Part { name: "picture", filename: Some("a.png"), data: b"x" }])
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "No image file provided");
        assert_eq!(
            body["required_format"],
            "Send image as form-data with key \"image\""
        );

        // `image` sent as a plain form field is not a file
        let (status, body) = harness
            .post_parts(&[Part { name: "image", filename: None, data: b"aGVsbG8=" }])
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No image file provided");

        assert_eq!(harness.engine.calls(), 0);
    }

    #[tokio::test]
    async fn test_file_upload_rejects_non_multipart_body() {
        let harness = Harness::new(lines());
        let response = harness
            .server()
            .post("/api/v1/ocr/file")
            .json(&json!({"image": "abc"}))
            .expect_failure()
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "No image file provided");
    }

    #[tokio::test]
    async fn test_file_upload_empty_filename() {
        let harness = Harness::new(lines());
        let (status, body) = harness
            .post_parts(&[Part { name: "image", filename: Some(""), data: b"" }])
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"success": false, "error": "No selected file"}));
        assert_eq!(harness.engine.calls(), 0);
    }

    #[tokio::test]
    async fn test_file_upload_long_filename() {
        let harness = Harness::new(lines());
        let png = sample_png(4, 4);
        let filename = format!("{}.png", "a".repeat(230));

        let (status, body) = harness
            .post_parts(&[Part { name: "image", filename: Some(&filename), data: &png }])
            .await;

        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["success"], true);
        assert_eq!(harness.engine.calls(), 1);
        assert!(harness.engine.seen()[0].existed);
        assert_eq!(harness.leftover_files(), 0);
    }

    #[tokio::test]
    async fn test_file_upload_invalid_type() {
        let harness = Harness::new(lines());

        for filename in ["malware.exe", "README", "photo.webp"] {
            let (status, body) = harness
                .post_parts(&[Part { name: "image", filename: Some(filename), data: b"x" }])
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{filename}");
            assert_eq!(body["error"], "Invalid file type");
            assert_eq!(body["allowed_extensions"].as_array().unwrap().len(), 5);
        }

        assert_eq!(harness.engine.calls(), 0);
        assert_eq!(harness.leftover_files(), 0);
    }

    #[tokio::test]
    async fn test_engine_failure_is_500_and_cleans_up() {
        let harness = Harness::new(Behavior::Fail("engine exploded".into()));
        let png = sample_png(3, 3);

        let (status, body) = harness
            .post_parts(&[Part { name: "image", filename: Some("x.jpg"), data: &png }])
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"success": false, "error": "engine exploded"}));

        let response = harness
            .server()
            .post("/api/v1/ocr/base64")
            .json(&json!({"image": BASE64.encode(&png)}))
            .expect_failure()
            .await;
        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(harness.engine.calls(), 2);
        assert_eq!(harness.leftover_files(), 0);
    }

    #[tokio::test]
    async fn test_base64_success_uses_temp_png() {
        let harness = Harness::new(Behavior::Dimensions);
        let payload = BASE64.encode(sample_png(9, 2));

        let response = harness
            .server()
            .post("/api/v1/ocr/base64")
            .json(&json!({ "image": payload }))
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body, json!({"success": true, "text": "9x2", "confidence": 0.5}));

        let seen = harness.engine.seen();
        let name = seen[0].path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with("_temp.png"), "{name}");
        assert_eq!(harness.leftover_files(), 0);
    }

    #[tokio::test]
    async fn test_base64_missing_image() {
        let harness = Harness::new(lines());
        let server = harness.server();

        let response = server
            .post("/api/v1/ocr/base64")
            .json(&json!({"filename": "a.png"}))
            .expect_failure()
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "No image data provided");
        assert_eq!(body["required_format"]["filename"], "optional_filename.jpg");

        let response = server
            .post("/api/v1/ocr/base64")
            .text("{not json")
            .expect_failure()
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "No image data provided");
        assert!(body["details"].is_string());

        assert_eq!(harness.engine.calls(), 0);
    }

    #[tokio::test]
    async fn test_base64_invalid_data() {
        let harness = Harness::new(lines());
        let server = harness.server();

        for image in [json!("***"), json!(BASE64.encode(b"GIF89a but not really"))] {
            let response = server
                .post("/api/v1/ocr/base64")
                .json(&json!({ "image": image }))
                .expect_failure()
                .await;
            assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
            let body: Value = response.json();
            assert_eq!(body["success"], false);
            assert_eq!(body["error"], "Invalid base64 image data");
            assert!(body["details"].is_string());
        }

        assert_eq!(harness.engine.calls(), 0);
        assert_eq!(harness.leftover_files(), 0);
    }

    #[tokio::test]
    async fn test_base64_and_file_endpoints_agree() {
        let harness = Harness::new(Behavior::Dimensions);
        let png = sample_png(13, 5);

        let (status, from_file) = harness
            .post_parts(&[Part { name: "image", filename: Some("page.png"), data: &png }])
            .await;
        assert_eq!(status, StatusCode::OK);

        let from_base64: Value = harness
            .server()
            .post("/api/v1/ocr/base64")
            .json(&json!({"image": BASE64.encode(&png), "filename": "page.png"}))
            .await
            .json();

        assert_eq!(from_file, from_base64);
        assert_eq!(from_file["text"], "13x5");
    }

    #[tokio::test]
    async fn test_body_limit_returns_envelope() {
        let harness = Harness::with_config(lines(), |config| {
            config.server.max_upload_bytes = 64;
        });

        let response = harness
            .server()
            .post("/api/v1/ocr/base64")
            .json(&json!({ "image": "A".repeat(256) }))
            .expect_failure()
            .await;

        assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["max_bytes"], 64);
        assert_eq!(harness.engine.calls(), 0);
    }

    #[tokio::test]
    async fn test_file_upload_over_limit_returns_envelope() {
        let harness = Harness::with_config(lines(), |config| {
            config.server.max_upload_bytes = 64;
        });
        let data = vec![0u8; 4096];

        let (status, body) = harness
            .post_parts(&[Part { name: "image", filename: Some("big.png"), data: &data }])
            .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["success"], false);
        assert_eq!(body["max_bytes"], 64);
        assert_eq!(harness.engine.calls(), 0);
        assert_eq!(harness.leftover_files(), 0);
    }
}
