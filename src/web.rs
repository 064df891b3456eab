use crate::handler::{Responder, ValidationError, VersePolicy};
use crate::topics::TopicStore;
use crate::verse::{BibleApiClient, VerseApiConfig};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::info;

type SharedState = Arc<AppState>;

pub struct AppState {
    pub responder: Responder,
}

#[derive(Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub verse_api: VerseApiConfig,
    pub policy: VersePolicy,
    pub seed: Option<u64>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            verse_api: VerseApiConfig::default(),
            policy: VersePolicy::default(),
            seed: None,
        }
    }
}

#[derive(Debug)]
pub enum WebError {
    Io(std::io::Error),
    Client(reqwest::Error),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::Io(err) => write!(f, "io error: {err}"),
            WebError::Client(err) => write!(f, "failed to build verse client: {err}"),
        }
    }
}

impl std::error::Error for WebError {}

impl From<std::io::Error> for WebError {
    fn from(value: std::io::Error) -> Self {
        WebError::Io(value)
    }
}

impl From<reqwest::Error> for WebError {
    fn from(value: reqwest::Error) -> Self {
        WebError::Client(value)
    }
}

/// Builds the production responder: the given store plus the HTTP verse client.
pub fn build_responder(store: Arc<TopicStore>, config: &WebConfig) -> Result<Responder, WebError> {
    let client = BibleApiClient::new(&config.verse_api)?;
    let responder = Responder::new(store, Arc::new(client)).with_policy(config.policy);
    Ok(match config.seed {
        Some(seed) => responder.with_seed(seed),
        None => responder,
    })
}

pub async fn serve(config: WebConfig, store: Arc<TopicStore>) -> Result<(), WebError> {
    let topics = store.len();
    let state = Arc::new(AppState {
        responder: build_responder(store, &config)?,
    });
    let router = build_router(state);
    info!(
        %config.addr,
        topics,
        verse_api = %config.verse_api.base_url,
        translation = %config.verse_api.translation,
        policy = ?config.policy,
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

/// Client-side failures of `/ask`; every other outcome is a 200 reply.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: value.to_string(),
        }
    }
}

// Syntax errors, wrong content types and oversized bodies all count as a
// missing message.
impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: value.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message });
        (self.status, Json(payload)).into_response()
    }
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/ask", post(ask))
        .route("/api/message", post(ask))
        .route("/api/topics", get(api_topics))
        .route("/healthz", get(health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn home() -> &'static str {
    "BibleBot backend is running"
}

async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "biblebot",
        "topics": state.responder.store().len(),
    }))
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AskResponse {
    reply: String,
}

async fn ask(
    State(state): State<SharedState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Json(request) = payload?;
    let message = request.message.unwrap_or_default();
    let reply = state.responder.handle(&message).await?;
    Ok(Json(AskResponse { reply: reply.text }))
}

#[derive(Debug, Serialize, Deserialize)]
struct TopicSummaryPayload {
    name: String,
    verses: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct TopicListPayload {
    topics: Vec<TopicSummaryPayload>,
}

async fn api_topics(State(state): State<SharedState>) -> Json<TopicListPayload> {
    let topics = state
        .responder
        .store()
        .iter()
        .map(|topic| TopicSummaryPayload {
            name: topic.name().to_string(),
            verses: topic.verses().len(),
        })
        .collect();
    Json(TopicListPayload { topics })
}
