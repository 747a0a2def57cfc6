//! OCR Module
//!
//! Text recognition for uploaded images.
//!
//! Recognition itself is delegated to an engine:
//! - Tesseract (local, requires installation)
//! - Ollama vision models (local LLM)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ocr_server::ocr::{OcrService, TesseractEngine};
//! use ocr_server::storage::TempStorage;
//!
//! let engine = Arc::new(TesseractEngine::new("tesseract", &["en".to_string()]));
//! let service = OcrService::new(engine, TempStorage::new("uploads"));
//!
//! let outcome = service.recognize_upload("receipt.png", &bytes).await?;
//! println!("{} ({:.2})", outcome.text, outcome.confidence);
//! ```

mod engine;
mod service;
mod types;

pub use engine::{parse_tsv, OcrEngine, OllamaEngine, TesseractEngine};
pub use service::OcrService;
pub use types::{
    Base64Request, EngineKind, OcrOutcome, OcrResponse, PixelRect, TextLine,
    DEFAULT_BASE64_FILENAME,
};

#[cfg(test)]
pub(crate) use engine::mock;
