//! DSVA server library logic.

pub mod api;
pub mod api_calls;
pub mod api_chat;
pub mod api_config;
pub mod background;
pub mod config;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use dsva_telephony::SessionRegistry;
use dsva_types::IntentClassifier;
use dsva_voice::ResponseGenerator;
use dsva_webhook::{ConfigStore, WebhookDispatcher};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Webhook configuration record.
    pub store: Arc<ConfigStore>,
    pub dispatcher: Arc<WebhookDispatcher>,
    pub generator: Arc<dyn ResponseGenerator>,
    pub classifier: Arc<dyn IntentClassifier>,
    /// Utterance returned when the generator fails.
    pub apology: String,
    /// Active telephone calls, shared with the call router.
    pub sessions: Arc<SessionRegistry>,
    /// Directory of the bundled front-end. `None` disables static serving.
    pub frontend_dir: Option<String>,
}

/// Maximum request body size (1 MiB).
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route(
            "/api/config",
            get(api_config::get_config_handler).post(api_config::update_config_handler),
        )
        .route("/api/chat", post(api_chat::chat_handler))
        .route("/api/calls", get(api_calls::list_calls_handler));

    let router = match state.frontend_dir.as_deref() {
        Some(dir) if std::path::Path::new(dir).join("index.html").exists() => {
            tracing::info!(path = %dir, "serving front-end static files");
            let index = std::path::Path::new(dir).join("index.html");
            router.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)))
        }
        Some(dir) => {
            tracing::info!(path = %dir, "front-end directory not found, skipping static file serving");
            router
        }
        None => router,
    };

    router
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
