//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::ocr::{OcrEngine, OcrService};
use crate::storage::TempStorage;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    ocr: OcrService,
}

impl AppState {
    /// Create a new application state
    ///
    /// The engine is built once by the caller and shared read-only by every
    /// request. Temp files go to the directory selected by the deployment.
    pub fn new(config: Config, engine: Arc<dyn OcrEngine>) -> Self {
        let storage = TempStorage::new(config.temp_dir());
        let ocr = OcrService::new(engine, storage);

        Self {
            inner: Arc::new(AppStateInner { config, ocr }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the OCR service
    pub fn ocr(&self) -> &OcrService {
        &self.inner.ocr
    }
}
