//! OCR Server
//!
//! Accepts images as multipart uploads or base64 JSON and returns the text
//! recognized by the configured OCR engine.

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ocr_server::config::{Config, Deployment, EngineChoice};
use ocr_server::ocr::{OcrEngine, OllamaEngine, TesseractEngine};
use ocr_server::routes;
use ocr_server::state::AppState;

fn build_engine(config: &Config) -> Arc<dyn OcrEngine> {
    match config.ocr.engine {
        EngineChoice::Tesseract => Arc::new(TesseractEngine::new(
            &config.ocr.tesseract_bin,
            &config.ocr.languages,
        )),
        EngineChoice::Ollama => Arc::new(OllamaEngine::new(
            &config.ocr.ollama_url,
            &config.ocr.ollama_model,
            &config.ocr.languages,
        )),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "ocr_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting OCR Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Deployment: {:?}", config.storage.deployment);
    tracing::info!("Languages: {}", config.ocr.languages.join(", "));

    // Initialize the OCR engine once; every request shares it
    let engine = build_engine(&config);
    if engine.is_available().await {
        tracing::info!("OCR engine {:?} is available", engine.engine_type());
    } else {
        tracing::warn!(
            "OCR engine {:?} is not available; OCR requests will fail until it is",
            engine.engine_type()
        );
    }

    let app_state = AppState::new(config.clone(), engine);

    if config.storage.deployment == Deployment::Local {
        app_state.ocr().storage().ensure_dir().await.with_context(|| {
            format!(
                "Failed to create upload directory {}",
                app_state.ocr().storage().dir().display()
            )
        })?;
    }
    tracing::info!("Temp files in {}", app_state.ocr().storage().dir().display());

    let app = routes::router(app_state);

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.server.host, config.server.port))?;
    tracing::info!("OCR Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
