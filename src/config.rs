//! Configuration management for the OCR server

use std::env;
use std::path::PathBuf;

/// Default request body limit for the OCR routes: 16MB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum request body size accepted by the OCR routes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub deployment: Deployment,
    /// Upload directory used by the local deployment
    pub upload_dir: PathBuf,
}

/// Hosting profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deployment {
    /// Long-running server writing temp files to a local uploads directory
    Local,
    /// Serverless function writing temp files to the platform temp directory
    Serverless,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub engine: EngineChoice,
    /// Language set, fixed for the lifetime of the process
    pub languages: Vec<String>,
    pub tesseract_bin: String,
    pub ollama_url: String,
    pub ollama_model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineChoice {
    Tesseract,
    Ollama,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5001,
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
            storage: StorageConfig {
                deployment: Deployment::Local,
                upload_dir: PathBuf::from("uploads"),
            },
            ocr: OcrConfig {
                engine: EngineChoice::Tesseract,
                languages: vec!["en".to_string()],
                tesseract_bin: "tesseract".to_string(),
                ollama_url: "http://localhost:11434".to_string(),
                ollama_model: "llava".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let port = match lookup("SERVER_PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "SERVER_PORT",
                value,
            })?,
            None => defaults.server.port,
        };

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "MAX_UPLOAD_BYTES",
                value,
            })?,
            None => defaults.server.max_upload_bytes,
        };

        let deployment = match lookup("OCR_DEPLOYMENT").as_deref().map(str::to_lowercase) {
            None => defaults.storage.deployment,
            Some(value) => match value.as_str() {
                "local" => Deployment::Local,
                "serverless" | "vercel" => Deployment::Serverless,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "OCR_DEPLOYMENT",
                        value: value.clone(),
                    })
                }
            },
        };

        let engine = match lookup("OCR_ENGINE").as_deref().map(str::to_lowercase) {
            None => defaults.ocr.engine,
            Some(value) => match value.as_str() {
                "tesseract" => EngineChoice::Tesseract,
                "ollama" => EngineChoice::Ollama,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "OCR_ENGINE",
                        value: value.clone(),
                    })
                }
            },
        };

        let languages = match lookup("OCR_LANGUAGES") {
            Some(value) => {
                let languages: Vec<String> = value
                    .split(',')
                    .map(|l| l.trim().to_lowercase())
                    .filter(|l| !l.is_empty())
                    .collect();
                if languages.is_empty() {
                    return Err(ConfigError::Empty("OCR_LANGUAGES"));
                }
                languages
            }
            None => defaults.ocr.languages,
        };

        Ok(Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or(defaults.server.host),
                port,
                max_upload_bytes,
            },
            storage: StorageConfig {
                deployment,
                upload_dir: lookup("OCR_UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.upload_dir),
            },
            ocr: OcrConfig {
                engine,
                languages,
                tesseract_bin: lookup("TESSERACT_BIN").unwrap_or(defaults.ocr.tesseract_bin),
                ollama_url: lookup("OLLAMA_URL").unwrap_or(defaults.ocr.ollama_url),
                ollama_model: lookup("OLLAMA_MODEL").unwrap_or(defaults.ocr.ollama_model),
            },
        })
    }

    /// Directory where request-scoped temp files are written
    pub fn temp_dir(&self) -> PathBuf {
        match self.storage.deployment {
            Deployment::Local => self.storage.upload_dir.clone(),
            Deployment::Serverless => env::temp_dir(),
        }
    }
}
