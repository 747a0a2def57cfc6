//! OCR Engines
//!
//! Defines the engine trait and the backends the server can delegate to.
//! Engines receive the path of a temp file holding the request image and
//! return one [`TextLine`] per recognized region.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use super::types::{EngineKind, PixelRect, TextLine};
use crate::error::OcrError;

/// OCR engine trait
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Get the engine type
    fn engine_type(&self) -> EngineKind;

    /// Check if the engine is available
    async fn is_available(&self) -> bool;

    /// Recognize the text in the image stored at `image_path`
    async fn recognize(&self, image_path: &Path) -> Result<Vec<TextLine>, OcrError>;
}

/// Map ISO 639-1 codes to Tesseract traineddata names
fn tesseract_language(code: &str) -> &str {
    match code {
        "en" => "eng",
        "de" => "deu",
        "fr" => "fra",
        "es" => "spa",
        "it" => "ita",
        "pt" => "por",
        "nl" => "nld",
        "ru" => "rus",
        "ja" => "jpn",
        "ko" => "kor",
        "zh" | "ch_sim" => "chi_sim",
        "ch_tra" => "chi_tra",
        other => other,
    }
}

/// Tesseract OCR engine (CLI)
pub struct TesseractEngine {
    /// Tesseract executable
    binary: String,
    /// `+`-joined Tesseract language list
    languages: String,
}

impl TesseractEngine {
    pub fn new(binary: &str, languages: &[String]) -> Self {
        let languages = languages
            .iter()
            .map(|l| tesseract_language(l))
            .collect::<Vec<_>>()
            .join("+");

        Self {
            binary: binary.to_string(),
            languages,
        }
    }

    pub fn languages(&self) -> &str {
        &self.languages
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn engine_type(&self) -> EngineKind {
        EngineKind::Tesseract
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    async fn recognize(&self, image_path: &Path) -> Result<Vec<TextLine>, OcrError> {
        let output = Command::new(&self.binary)
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .arg("--oem")
            .arg("3")
            .arg("--psm")
            .arg("3")
            .arg("tsv")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| OcrError::Engine(format!("Failed to run tesseract: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(format!(
                "Tesseract failed: {}",
                stderr.trim()
            )));
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Group Tesseract TSV word rows into lines
///
/// Columns: level, page, block, paragraph, line, word, left, top, width,
/// height, conf, text. Only word rows (level 5) with a non-negative
/// confidence and non-blank text contribute.
pub fn parse_tsv(tsv: &str) -> Vec<TextLine> {
    struct Pending {
        key: (u32, u32, u32, u32),
        words: Vec<String>,
        confidence_sum: f64,
        left: u32,
        top: u32,
        right: u32,
        bottom: u32,
    }

    impl Pending {
        fn finish(self) -> TextLine {
            let count = self.words.len() as f64;
            TextLine {
                text: self.words.join(" "),
                confidence: (self.confidence_sum / count / 100.0).clamp(0.0, 1.0),
                bounds: Some(PixelRect {
                    x: self.left,
                    y: self.top,
                    width: self.right - self.left,
                    height: self.bottom - self.top,
                }),
            }
        }
    }

    let mut lines = Vec::new();
    let mut current: Option<Pending> = None;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 11 || cols[0] != "5" {
            continue;
        }

        let text = cols.get(11).map(|t| t.trim()).unwrap_or("");
        let confidence: f64 = match cols[10].trim().parse() {
            Ok(c) if c >= 0.0 => c,
            _ => continue,
        };
        if text.is_empty() {
            continue;
        }

        let num = |i: usize| cols[i].trim().parse::<u32>().unwrap_or(0);
        let key = (num(1), num(2), num(3), num(4));
        let (left, top, width, height) = (num(6), num(7), num(8), num(9));

        match current.as_mut() {
            Some(pending) if pending.key == key => {
                pending.words.push(text.to_string());
                pending.confidence_sum += confidence;
                pending.left = pending.left.min(left);
                pending.top = pending.top.min(top);
                pending.right = pending.right.max(left + width);
                pending.bottom = pending.bottom.max(top + height);
            }
            _ => {
                if let Some(done) = current.take() {
                    lines.push(done.finish());
                }
                current = Some(Pending {
                    key,
                    words: vec![text.to_string()],
                    confidence_sum: confidence,
                    left,
                    top,
                    right: left + width,
                    bottom: top + height,
                });
            }
        }
    }

    if let Some(done) = current {
        lines.push(done.finish());
    }

    lines
}

/// Confidence reported for LLM output, which carries no score of its own
const OLLAMA_NOMINAL_CONFIDENCE: f64 = 0.75;

/// Ollama vision model engine
pub struct OllamaEngine {
    client: reqwest::Client,
    /// Ollama API URL
    base_url: String,
    /// Model name (e.g., "llava", "bakllava")
    model: String,
    /// Language hint passed in the prompt
    languages: Vec<String>,
}

impl OllamaEngine {
    pub fn new(base_url: &str, model: &str, languages: &[String]) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            languages: languages.to_vec(),
        }
    }

    fn prompt(&self) -> String {
        format!(
            "Extract all text from this image exactly as written, one line of output per line of text. \
             The text is in {}. Return only the extracted text, nothing else.",
            self.languages.join(", ")
        )
    }
}

#[async_trait]
impl OcrEngine for OllamaEngine {
    fn engine_type(&self) -> EngineKind {
        EngineKind::Ollama
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn recognize(&self, image_path: &Path) -> Result<Vec<TextLine>, OcrError> {
        use base64::Engine;

        let image_data = tokio::fs::read(image_path).await?;
        let image_base64 = base64::engine::general_purpose::STANDARD.encode(&image_data);

        let url = format!("{}/api/generate", self.base_url);
        let request = serde_json::json!({
            "model": self.model,
            "prompt": self.prompt(),
            "images": [image_base64],
            "stream": false
        });

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| OcrError::Engine(format!("Failed to call Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::Engine(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OcrError::Engine(format!("Failed to parse response: {}", e)))?;

        let text = result["response"].as_str().unwrap_or("");

        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| TextLine::new(line, OLLAMA_NOMINAL_CONFIDENCE))
            .collect())
    }
}
