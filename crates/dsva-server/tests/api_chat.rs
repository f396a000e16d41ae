use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use dsva_server::{app, AppState};
use dsva_telephony::SessionRegistry;
use dsva_types::{ConversationTurn, PhraseClassifier, Role, APOLOGY};
use dsva_voice::{ResponseGenerator, VoiceError};
use dsva_webhook::{ConfigStore, MemoryBackend, WebhookDispatcher};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Returns a fixed reply (or failure) and records every history it sees.
struct MockGenerator {
    reply: Option<String>,
    seen: Mutex<Vec<Vec<ConversationTurn>>>,
}

impl MockGenerator {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_string()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ResponseGenerator for MockGenerator {
    async fn generate(&self, history: &[ConversationTurn]) -> Result<String, VoiceError> {
        self.seen.lock().unwrap().push(history.to_vec());
        self.reply
            .clone()
            .ok_or_else(|| VoiceError::Upstream("chat completion returned 503".to_string()))
    }
}

type Bodies = Arc<Mutex<Vec<Value>>>;

async fn spawn_webhook(reply: fn() -> axum::response::Response) -> (String, Bodies) {
    let bodies: Bodies = Arc::new(Mutex::new(Vec::new()));
    let sink = bodies.clone();
    let router = Router::new().route(
        "/hook",
        post(move |Json(body): Json<Value>| {
            let sink = sink.clone();
            async move {
                sink.lock().unwrap().push(body);
                reply()
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{}/hook", addr), bodies)
}

fn setup_app(generator: Arc<MockGenerator>, webhook_url: &str) -> Router {
    let store = Arc::new(ConfigStore::open(MemoryBackend::new()));
    store.set_config(webhook_url, "standard").unwrap();
    let dispatcher = Arc::new(WebhookDispatcher::new(store.clone()).unwrap());

    app(AppState {
        store,
        dispatcher,
        generator,
        classifier: Arc::new(PhraseClassifier::default()),
        apology: APOLOGY.to_string(),
        sessions: Arc::new(SessionRegistry::new()),
        frontend_dir: None,
    })
}

async fn post_chat(app: Router, body: String) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_logged_request_dispatches_once() {
    let (url, bodies) = spawn_webhook(|| Json(json!({"ok": true})).into_response()).await;
    let reply = "Understood. I have logged your request for a consultation on Tuesday.";
    let app = setup_app(MockGenerator::replying(reply), &url);

    let (status, body) = post_chat(
        app,
        json!({"message": "I'd like a consultation on Tuesday", "history": []}).to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"response": reply}));

    let delivered = bodies.lock().unwrap().clone();
    assert_eq!(delivered.len(), 1);
    assert_eq!(
        delivered[0],
        json!({
            "event": "interaction_logged",
            "data": {
                "userMessage": "I'd like a consultation on Tuesday",
                "agentResponse": reply,
                "source": "web_simulator"
            }
        })
    );
}

#[tokio::test]
async fn test_plain_reply_dispatches_nothing() {
    let (url, bodies) = spawn_webhook(|| Json(json!({"ok": true})).into_response()).await;
    let app = setup_app(MockGenerator::replying("We open at nine."), &url);

    let (status, body) = post_chat(
        app,
        json!({"message": "When do you open?"}).to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "We open at nine.");
    assert!(bodies.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_transfer_sentinel_is_reported() {
    let (url, bodies) = spawn_webhook(|| Json(json!({"ok": true})).into_response()).await;
    let app = setup_app(MockGenerator::replying("transfer_to_owner"), &url);

    let (status, body) = post_chat(
        app,
        json!({"message": "Let me talk to a person"}).to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "transfer_to_owner");
    assert_eq!(bodies.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_webhook_response_overrides_reply() {
    let (url, _) = spawn_webhook(|| {
        Json(json!({"response": "A manager will call you within the hour."})).into_response()
    })
    .await;
    let app = setup_app(
        MockGenerator::replying("I have logged your request for a quote."),
        &url,
    );

    let (_, body) = post_chat(app, json!({"message": "How much?"}).to_string()).await;
    assert_eq!(body["response"], "A manager will call you within the hour.");
}

#[tokio::test]
async fn test_webhook_failure_keeps_reply() {
    let (url, bodies) = spawn_webhook(|| StatusCode::BAD_GATEWAY.into_response()).await;
    let reply = "I have logged your request.";
    let app = setup_app(MockGenerator::replying(reply), &url);

    let (status, body) = post_chat(app, json!({"message": "Book me in"}).to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], reply);
    assert_eq!(bodies.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_generator_failure_returns_apology() {
    let app = setup_app(MockGenerator::failing(), "");

    let (status, body) = post_chat(app, json!({"message": "Hello?"}).to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], APOLOGY);
}

#[tokio::test]
async fn test_history_is_forwarded_with_new_message_last() {
    let generator = MockGenerator::replying("Sure.");
    let app = setup_app(generator.clone(), "");

    post_chat(
        app,
        json!({
            "message": "Tuesday works",
            "history": [
                {"role": "assistant", "content": "Hello, this is Alex."},
                {"role": "user", "content": "I need an appointment"},
                {"role": "assistant", "content": "Which day?"}
            ]
        })
        .to_string(),
    )
    .await;

    let seen = generator.seen.lock().unwrap();
    let history = &seen[0];
    assert_eq!(history.len(), 4);
    assert_eq!(history[3], ConversationTurn::new(Role::User, "Tuesday works"));
    assert_eq!(history[0].role, Role::Assistant);
}

#[tokio::test]
async fn test_invalid_bodies_are_rejected() {
    for body in [
        "{not json".to_string(),
        json!({"history": []}).to_string(),
        json!({"message": "hi", "history": [{"role": "robot", "content": "x"}]}).to_string(),
        json!({"message": "   "}).to_string(),
    ] {
        let generator = MockGenerator::replying("unused");
        let app = setup_app(generator.clone(), "");
        let (status, response) = post_chat(app, body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
        assert!(response["error"].is_string());
        assert!(generator.seen.lock().unwrap().is_empty());
    }
}
