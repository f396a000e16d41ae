//! DSVA server binary.
//!
//! Serves the HTTP API and, when an Asterisk host is configured, listens for
//! telephone calls over ARI. Shuts down gracefully on SIGTERM/SIGINT.

use dsva_server::{app, background, config, AppState};
use dsva_telephony::{
    AriClient, AriEventStream, CallDeps, CallRouter, PlaybackSignals, SessionRegistry,
    SilentListener,
};
use dsva_types::{PhraseClassifier, APOLOGY};
use dsva_voice::{ElevenLabsSynthesizer, OpenAiGenerator};
use dsva_webhook::{ConfigStore, JsonFileBackend, WebhookDispatcher};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("DSVA_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();

    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration, the server cannot start without valid config");

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    if let Ok(path) = dotenv {
        tracing::info!(path = %path.display(), "loaded environment file");
    }
    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    // Webhook configuration and delivery
    let store = Arc::new(ConfigStore::open(JsonFileBackend::new(
        &config.webhook.store_path,
    )));
    let dispatcher = Arc::new(
        WebhookDispatcher::new(store.clone()).expect("failed to build webhook HTTP client"),
    );

    if config.llm.api_key.is_empty() {
        tracing::warn!("OPENAI_API_KEY is not set, every reply will be the apology utterance");
    }
    let generator = Arc::new(
        OpenAiGenerator::new(config.llm.clone()).expect("failed to build generator HTTP client"),
    );
    let classifier = Arc::new(PhraseClassifier::default());
    let sessions = Arc::new(SessionRegistry::new());

    // Telephony
    match config.telephony.ari() {
        Some(ari) => {
            if config.tts.api_key.is_empty() {
                tracing::warn!("ELEVENLABS_API_KEY is not set, calls will proceed without audio");
            }
            let synthesizer = ElevenLabsSynthesizer::new(config.tts.clone())
                .expect("failed to build synthesizer HTTP client");
            let control = AriClient::new(ari.clone()).expect("invalid ARI connection settings");
            let stream = AriEventStream::new(&ari).expect("invalid ARI connection settings");

            let deps = CallDeps {
                generator: generator.clone(),
                synthesizer: Arc::new(synthesizer),
                control: Arc::new(control),
                listener: Arc::new(SilentListener::new(Duration::from_secs(
                    config.telephony.listen_window_secs,
                ))),
                classifier: classifier.clone(),
                signals: Arc::new(PlaybackSignals::new()),
                registry: sessions.clone(),
                dispatcher: Some(dispatcher.clone()),
            };
            let router = CallRouter::new(deps, config.telephony.turn_settings());

            tracing::info!(
                host = %ari.host,
                port = ari.port,
                app = %ari.app_name,
                "starting telephony listener"
            );
            tokio::spawn(background::start_session_reaper(
                router.clone(),
                config.telephony.session_ttl_secs,
            ));
            tokio::spawn(async move {
                if let Err(e) = stream.run(&router).await {
                    tracing::error!("telephony listener stopped: {}", e);
                }
            });
        }
        None => tracing::info!("no Asterisk host configured, telephony disabled"),
    }

    // Build application
    let state = AppState {
        store,
        dispatcher,
        generator,
        classifier,
        apology: APOLOGY.to_string(),
        sessions,
        frontend_dir: Some(config.frontend.dir.clone()),
    };
    let app = app(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting dsva server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address, is another process using this port?");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("dsva server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
