//! Route modules for the OCR server

pub mod health;
pub mod ocr;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Deployment;
use crate::state::AppState;

/// Build the full application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new().route("/health", get(health::health_check));

    if state.config().storage.deployment == Deployment::Serverless {
        app = app.route("/", get(health::service_index));
    }

    app.nest(
        "/api/v1/ocr",
        ocr::router(state.config().server.max_upload_bytes),
    )
    .layer(TraceLayer::new_for_http())
    .layer(cors)
    .with_state(state)
}
