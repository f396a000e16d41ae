use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use dsva_server::{app, AppState};
use dsva_telephony::SessionRegistry;
use dsva_types::{ConversationTurn, PhraseClassifier, WebhookConfig, APOLOGY};
use dsva_voice::{ResponseGenerator, VoiceError};
use dsva_webhook::{
    ConfigBackend, ConfigStore, JsonFileBackend, MemoryBackend, WebhookDispatcher, WebhookError,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct UnusedGenerator;

#[async_trait]
impl ResponseGenerator for UnusedGenerator {
    async fn generate(&self, _history: &[ConversationTurn]) -> Result<String, VoiceError> {
        Err(VoiceError::Upstream("not used".to_string()))
    }
}

struct ReadOnlyBackend;

impl ConfigBackend for ReadOnlyBackend {
    fn load(&self) -> Result<Option<WebhookConfig>, WebhookError> {
        Ok(None)
    }

    fn store(&self, _config: &WebhookConfig) -> Result<(), WebhookError> {
        Err(WebhookError::Persistence(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only file system",
        )))
    }
}

fn setup_app(store: ConfigStore) -> (Router, Arc<ConfigStore>) {
    let store = Arc::new(store);
    let dispatcher = Arc::new(WebhookDispatcher::new(store.clone()).unwrap());
    let router = app(AppState {
        store: store.clone(),
        dispatcher,
        generator: Arc::new(UnusedGenerator),
        classifier: Arc::new(PhraseClassifier::default()),
        apology: APOLOGY.to_string(),
        sessions: Arc::new(SessionRegistry::new()),
        frontend_dir: None,
    });
    (router, store)
}

async fn send(app: Router, method: &str, body: Option<String>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri("/api/config");
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_get_returns_defaults() {
    let (app, _) = setup_app(ConfigStore::open(MemoryBackend::new()));
    let (status, body) = send(app, "GET", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"webhookUrl": "", "outputFormat": "standard"}));
}

#[tokio::test]
async fn test_post_then_get_round_trips() {
    let (app, store) = setup_app(ConfigStore::open(MemoryBackend::new()));

    let (status, body) = send(
        app.clone(),
        "POST",
        Some(json!({"webhookUrl": "https://hooks.example.com/dsva", "outputFormat": "flat"}).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "status": "updated",
            "webhookUrl": "https://hooks.example.com/dsva",
            "outputFormat": "flat"
        })
    );

    let (_, body) = send(app, "GET", None).await;
    assert_eq!(
        body,
        json!({"webhookUrl": "https://hooks.example.com/dsva", "outputFormat": "flat"})
    );
    assert_eq!(store.get_config().webhook_url, "https://hooks.example.com/dsva");
}

#[tokio::test]
async fn test_missing_output_format_defaults_to_standard() {
    let (app, _) = setup_app(ConfigStore::open(MemoryBackend::with_config(
        WebhookConfig::new("https://old.example.com", dsva_types::PayloadShape::Flat),
    )));

    let (status, body) = send(
        app,
        "POST",
        Some(json!({"webhookUrl": "https://new.example.com/hook"}).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outputFormat"], "standard");
}

#[tokio::test]
async fn test_invalid_updates_are_rejected_without_change() {
    let (app, store) = setup_app(ConfigStore::open(MemoryBackend::new()));

    for body in [
        json!({"webhookUrl": "https://hooks.example.com", "outputFormat": "xml"}).to_string(),
        json!({"webhookUrl": "ftp://hooks.example.com"}).to_string(),
        json!({"outputFormat": "flat"}).to_string(),
        "webhookUrl=https://x".to_string(),
    ] {
        let (status, response) = send(app.clone(), "POST", Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
        assert!(response["error"].is_string());
    }
    assert_eq!(store.get_config(), WebhookConfig::default());
}

#[tokio::test]
async fn test_persistence_failure_is_500() {
    let (app, store) = setup_app(ConfigStore::open(ReadOnlyBackend));

    let (status, body) = send(
        app,
        "POST",
        Some(json!({"webhookUrl": "https://hooks.example.com", "outputFormat": "flat"}).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("read-only"));
    assert_eq!(store.get_config(), WebhookConfig::default());
}

#[tokio::test]
async fn test_update_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    let (app, _) = setup_app(ConfigStore::open(JsonFileBackend::new(&path)));
    let (status, _) = send(
        app,
        "POST",
        Some(json!({"webhookUrl": "http://127.0.0.1:9999/in", "outputFormat": "flat"}).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let on_disk: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        on_disk,
        json!({"webhookUrl": "http://127.0.0.1:9999/in", "outputFormat": "flat"})
    );

    let (app, _) = setup_app(ConfigStore::open(JsonFileBackend::new(&path)));
    let (_, body) = send(app, "GET", None).await;
    assert_eq!(body["webhookUrl"], "http://127.0.0.1:9999/in");
}
