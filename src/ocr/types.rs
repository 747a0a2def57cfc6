//! OCR Types
//!
//! Engine output, request payloads and the aggregated response.

use serde::{Deserialize, Serialize};

/// OCR engine type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Tesseract OCR (local CLI)
    Tesseract,
    /// Ollama vision model (local LLM)
    Ollama,
    /// In-process test double
    Mock,
}

/// Pixel-based rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One recognized text region as reported by the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextLine {
    /// Recognized text
    pub text: String,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Region the text was found in, if the engine reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<PixelRect>,
}

impl TextLine {
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence,
            bounds: None,
        }
    }
}

/// Aggregated result for one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrOutcome {
    /// Line texts joined by a single space, trimmed
    pub text: String,
    /// Unweighted mean of line confidences, 0 when nothing was detected
    pub confidence: f64,
    /// Number of lines the engine reported
    #[serde(skip)]
    pub line_count: usize,
}

impl OcrOutcome {
    pub fn from_lines(lines: &[TextLine]) -> Self {
        let text = lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string();

        let confidence = if lines.is_empty() {
            0.0
        } else {
            lines.iter().map(|line| line.confidence).sum::<f64>() / lines.len() as f64
        };

        Self {
            text,
            confidence,
            line_count: lines.len(),
        }
    }
}

/// Success envelope
#[derive(Debug, Serialize)]
pub struct OcrResponse {
    pub success: bool,
    pub text: String,
    pub confidence: f64,
}

impl From<OcrOutcome> for OcrResponse {
    fn from(outcome: OcrOutcome) -> Self {
        Self {
            success: true,
            text: outcome.text,
            confidence: outcome.confidence,
        }
    }
}

/// JSON body of the base64 endpoint
///
/// `image` is kept as a raw JSON value so that a missing field and a field of
/// the wrong type can be reported differently.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Base64Request {
    #[serde(default)]
    pub image: Option<serde_json::Value>,
    #[serde(default)]
    pub filename: Option<String>,
}

/// Filename used when a base64 request does not name its image
pub const DEFAULT_BASE64_FILENAME: &str = "temp.png";
