//! OCR Service
//!
//! Validates incoming images, materializes them into temp storage, runs the
//! engine once and aggregates its lines. The temp file guard is held for the
//! duration of the engine call and dropped on every exit path.

use std::io::Cursor;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::{DynamicImage, ImageFormat};

use super::{
    engine::OcrEngine,
    types::{Base64Request, OcrOutcome, DEFAULT_BASE64_FILENAME},
};
use crate::error::{OcrError, Result};
use crate::storage::{allowed_extension, TempFile, TempStorage};

/// OCR service shared by all requests
#[derive(Clone)]
pub struct OcrService {
    engine: Arc<dyn OcrEngine>,
    storage: TempStorage,
}

impl OcrService {
    /// Create a new OCR service
    pub fn new(engine: Arc<dyn OcrEngine>, storage: TempStorage) -> Self {
        Self { engine, storage }
    }

    pub fn engine(&self) -> &Arc<dyn OcrEngine> {
        &self.engine
    }

    pub fn storage(&self) -> &TempStorage {
        &self.storage
    }

    /// Recognize an uploaded image file
    ///
    /// The filename must be non-empty and carry an allowed image extension;
    /// otherwise the engine is never invoked.
    pub async fn recognize_upload(&self, filename: &str, data: &[u8]) -> Result<OcrOutcome> {
        if filename.is_empty() {
            return Err(OcrError::EmptyFilename);
        }

        if allowed_extension(filename).is_none() {
            return Err(OcrError::InvalidFileType(filename.to_string()));
        }

        let file = self.storage.reserve(filename);
        file.write(data).await?;

        tracing::debug!(
            filename = %filename,
            path = %file.path().display(),
            size = data.len(),
            "Stored uploaded image"
        );

        self.recognize_file(&file).await
    }

    /// Recognize a base64-encoded image
    ///
    /// The payload is decoded, parsed as an image and re-encoded in the format
    /// implied by `filename` (default `temp.png`) before recognition.
    pub async fn recognize_base64(&self, request: Base64Request) -> Result<OcrOutcome> {
        let image = request
            .image
            .ok_or(OcrError::MissingImageData { details: None })?;

        let encoded = image.as_str().ok_or_else(|| {
            OcrError::InvalidImageData("image must be a base64 encoded string".to_string())
        })?;

        let bytes = decode_base64(encoded)?;

        let filename = request
            .filename
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE64_FILENAME.to_string());

        let format = allowed_extension(&filename)
            .and_then(|ext| ImageFormat::from_extension(ext))
            .ok_or_else(|| OcrError::InvalidFileType(filename.clone()))?;

        let encoded_image = tokio::task::spawn_blocking(move || reencode(&bytes, format))
            .await
            .map_err(|e| OcrError::Internal(format!("Image task failed: {}", e)))??;

        let file = self.storage.reserve(&filename);
        file.write(&encoded_image).await?;

        tracing::debug!(
            filename = %filename,
            path = %file.path().display(),
            size = encoded_image.len(),
            "Stored decoded image"
        );

        self.recognize_file(&file).await
    }

    async fn recognize_file(&self, file: &TempFile) -> Result<OcrOutcome> {
        let lines = self.engine.recognize(file.path()).await?;
        let outcome = OcrOutcome::from_lines(&lines);

        tracing::info!(
            engine = ?self.engine.engine_type(),
            lines = outcome.line_count,
            confidence = outcome.confidence,
            "OCR completed"
        );

        Ok(outcome)
    }
}

/// Decode base64 text, tolerating a `data:` URL prefix and embedded whitespace
fn decode_base64(encoded: &str) -> Result<Vec<u8>> {
    let payload = match encoded.trim_start().strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(rest),
        None => encoded,
    };

    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    BASE64
        .decode(compact)
        .map_err(|e| OcrError::InvalidImageData(e.to_string()))
}

/// Parse image bytes and write them back out as `format`
fn reencode(bytes: &[u8], format: ImageFormat) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| OcrError::InvalidImageData(e.to_string()))?;

    // JPEG has no alpha channel; BMP and GIF only take 8-bit samples
    let img = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
        ImageFormat::Png => img,
        _ => DynamicImage::ImageRgba8(img.to_rgba8()),
    };

    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), format)
        .map_err(|e| OcrError::InvalidImageData(e.to_string()))?;

    Ok(buffer)
}
