//! Read-only view of active telephone calls.

use crate::AppState;
use axum::extract::{Extension, Json};
use dsva_telephony::CallSummary;
use std::sync::Arc;

/// Handler for `GET /api/calls`.
pub async fn list_calls_handler(Extension(state): Extension<Arc<AppState>>) -> Json<Vec<CallSummary>> {
    Json(state.sessions.active())
}
