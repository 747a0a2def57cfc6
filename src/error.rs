//! Error types for the OCR server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::storage::ALLOWED_EXTENSIONS;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, OcrError>;

/// Every way an OCR request can fail
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("No image file provided")]
    MissingImageFile,

    #[error("No selected file")]
    EmptyFilename,

    #[error("Invalid file type: {0}")]
    InvalidFileType(String),

    #[error("No image data provided")]
    MissingImageData { details: Option<String> },

    #[error("Invalid base64 image data: {0}")]
    InvalidImageData(String),

    #[error("Failed to read upload: {0}")]
    UploadRead(String),

    #[error("Payload too large (max {max_bytes} bytes)")]
    PayloadTooLarge { max_bytes: usize },

    #[error("{0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OcrError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingImageFile
            | Self::EmptyFilename
            | Self::InvalidFileType(_)
            | Self::MissingImageData { .. }
            | Self::InvalidImageData(_)
            | Self::UploadRead(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Engine(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// `{success: false, error, ...context}` body for this error
    pub fn envelope(&self) -> Value {
        let mut body = Map::new();
        body.insert("success".into(), Value::Bool(false));

        match self {
            Self::MissingImageFile => {
                body.insert("error".into(), json!("No image file provided"));
                body.insert(
                    "required_format".into(),
                    json!("Send image as form-data with key \"image\""),
                );
            }
            Self::EmptyFilename => {
                body.insert("error".into(), json!("No selected file"));
            }
            Self::InvalidFileType(_) => {
                body.insert("error".into(), json!("Invalid file type"));
                body.insert("allowed_extensions".into(), json!(ALLOWED_EXTENSIONS));
            }
            Self::MissingImageData { details } => {
                body.insert("error".into(), json!("No image data provided"));
                body.insert(
                    "required_format".into(),
                    json!({
                        "image": "base64_encoded_image_string",
                        "filename": "optional_filename.jpg"
                    }),
                );
                if let Some(details) = details {
                    body.insert("details".into(), json!(details));
                }
            }
            Self::InvalidImageData(details) => {
                body.insert("error".into(), json!("Invalid base64 image data"));
                body.insert("details".into(), json!(details));
            }
            Self::UploadRead(details) => {
                body.insert("error".into(), json!("Failed to read upload"));
                body.insert("details".into(), json!(details));
            }
            Self::PayloadTooLarge { max_bytes } => {
                body.insert("error".into(), json!("Payload too large"));
                body.insert("max_bytes".into(), json!(max_bytes));
            }
            Self::Engine(_) | Self::Io(_) | Self::Internal(_) => {
                body.insert("error".into(), json!(self.to_string()));
            }
        }

        Value::Object(body)
    }
}

impl IntoResponse for OcrError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("OCR request failed: {}", self);
        } else {
            tracing::debug!("Rejected OCR request: {}", self);
        }

        (status, Json(self.envelope())).into_response()
    }
}
