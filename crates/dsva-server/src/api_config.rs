//! Webhook configuration endpoints.

use crate::api::ApiError;
use crate::AppState;
use axum::extract::{rejection::JsonRejection, Extension, Json};
use dsva_types::{PayloadShape, WebhookConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request body for `POST /api/config`.
#[derive(Debug, Deserialize)]
pub struct UpdateConfigRequest {
    #[serde(rename = "webhookUrl")]
    pub webhook_url: String,
    /// Defaults to `standard` when omitted.
    #[serde(rename = "outputFormat", default)]
    pub output_format: Option<String>,
}

/// Response body for a successful update.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateConfigResponse {
    pub status: String,
    #[serde(rename = "webhookUrl")]
    pub webhook_url: String,
    #[serde(rename = "outputFormat")]
    pub output_format: PayloadShape,
}

/// Handler for `GET /api/config`.
pub async fn get_config_handler(Extension(state): Extension<Arc<AppState>>) -> Json<WebhookConfig> {
    Json(state.store.get_config())
}

/// Handler for `POST /api/config`.
pub async fn update_config_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<UpdateConfigRequest>, JsonRejection>,
) -> Result<Json<UpdateConfigResponse>, ApiError> {
    let Json(payload) = payload?;
    let output_format = payload
        .output_format
        .as_deref()
        .unwrap_or(PayloadShape::Standard.as_str());

    let store = state.store.clone();
    let webhook_url = payload.webhook_url;
    let format = output_format.to_string();
    let config = tokio::task::spawn_blocking(move || store.set_config(&webhook_url, &format))
        .await
        .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    Ok(Json(UpdateConfigResponse {
        status: "updated".to_string(),
        webhook_url: config.webhook_url,
        output_format: config.output_format,
    }))
}
