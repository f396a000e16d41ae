//! Text-chat simulator of the voice agent.

use crate::api::ApiError;
use crate::AppState;
use axum::extract::{rejection::JsonRejection, Extension, Json};
use dsva_types::ConversationTurn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Source label attached to interactions reported from this endpoint.
pub const WEB_SIMULATOR_SOURCE: &str = "web_simulator";

/// Request body for `POST /api/chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Prior turns, oldest first. Unknown roles are rejected.
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Handler for `POST /api/chat`.
///
/// Generator failures are answered with the apology utterance. Loggable
/// replies are reported to the webhook before responding, and a webhook
/// answer of the form `{"response": "..."}` replaces the reply.
pub async fn chat_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload?;
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    let mut history = request.history;
    history.push(ConversationTurn::user(request.message.clone()));

    let reply = match state.generator.generate(&history).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!("chat response generation failed: {}", e);
            state.apology.clone()
        }
    };

    let decision = state.classifier.classify(&reply);
    if !decision.loggable {
        return Ok(Json(ChatResponse { response: reply }));
    }

    let result = state
        .dispatcher
        .notify_interaction(WEB_SIMULATOR_SOURCE, &request.message, &reply, Map::new())
        .await;

    let response = result
        .as_ref()
        .and_then(override_reply)
        .map(str::to_string)
        .unwrap_or(reply);
    Ok(Json(ChatResponse { response }))
}

fn override_reply(result: &Value) -> Option<&str> {
    result.as_object()?.get("response")?.as_str()
}
