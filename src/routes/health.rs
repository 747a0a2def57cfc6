//! Health and service directory routes

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        message: "OCR service is running",
    })
}

#[derive(Serialize)]
pub struct ServiceIndex {
    pub status: &'static str,
    pub message: &'static str,
    pub version: &'static str,
    pub endpoints: Endpoints,
}

#[derive(Serialize)]
pub struct Endpoints {
    pub health_check: &'static str,
    pub file_upload: &'static str,
    pub base64: &'static str,
}

/// GET / (serverless deployment)
pub async fn service_index() -> Json<ServiceIndex> {
    Json(ServiceIndex {
        status: "healthy",
        message: "OCR service is running",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: Endpoints {
            health_check: "/health",
            file_upload: "/api/v1/ocr/file",
            base64: "/api/v1/ocr/base64",
        },
    })
}
