//! Parley webhook handler service.
//!
//! Receives LiveKit webhook events, verifies their signature, keeps them in
//! an in-memory call log, and serves that log back over HTTP.

pub mod api;
pub mod api_webhook;
pub mod config;
pub mod signature;
pub mod store;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use store::CallLogStore;
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Received webhooks.
    pub logs: CallLogStore,
    /// Shared secret for webhook signatures; `None` disables verification.
    pub webhook_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(webhook_secret: Option<&str>) -> Self {
        Self {
            logs: CallLogStore::new(),
            webhook_secret: webhook_secret.filter(|s| !s.is_empty()).map(Arc::from),
        }
    }
}

/// Maximum request body size (2 MiB).
const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "webhook_handler"
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook", post(api_webhook::webhook_handler))
        .route("/logs", get(api_webhook::logs_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
