use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router, serve,
};
use futures::{sink::SinkExt, stream::StreamExt};
use minijinja::{path_loader, Environment};
use minijinja_autoreload::AutoReloader;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::constants;
use crate::errors::SessionError;
use crate::matcher::{EmergencyCategory, KeywordMatcher};
use crate::resolver::ResponseResolver;
use crate::session::{self, ChatService, ConnectionStatus, Exchange, Message as ChatMessage, SessionRegistry};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    templates: Arc<AutoReloader>,
    sessions: SessionRegistry,
}

impl AppState {
    pub fn new(sessions: SessionRegistry, templates_dir: impl Into<String>) -> Self {
        Self {
            templates: Arc::new(create_minijinja_env(templates_dir.into())),
            sessions,
        }
    }

    pub fn local_only(templates_dir: impl Into<String>) -> Self {
        Self::new(SessionRegistry::new(ResponseResolver::local_only()), templates_dir)
    }

    async fn session(&self, id: Uuid) -> Result<ChatService, ApiError> {
        self.sessions.get(id).await.ok_or_else(|| {
            warn!(%id, "Request for unknown session");
            (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": "Unknown session" })),
            )
        })
    }
}

fn create_minijinja_env(templates_dir: String) -> AutoReloader {
    AutoReloader::new(move |notifier| {
        let mut env = Environment::new();
        env.set_loader(path_loader(&templates_dir));
        notifier.watch_path(&templates_dir, true);
        Ok(env)
    })
}

#[derive(Deserialize)]
pub struct SubmitRequest {
    pub text: String,
}

#[derive(Serialize)]
struct StatusResponse {
    status: ConnectionStatus,
    remote_configured: bool,
    loading_hint: &'static str,
}

#[derive(Serialize)]
pub struct SessionOpened {
    pub id: Uuid,
    pub messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct NoticeResponse {
    message: &'static str,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn session_error(err: SessionError) -> ApiError {
    let status = match err {
        SessionError::EmptyInput => StatusCode::BAD_REQUEST,
        SessionError::Busy => StatusCode::CONFLICT,
        SessionError::UnknownSuggestion(_) => StatusCode::NOT_FOUND,
    };
    (status, Json(serde_json::json!({ "error": err.to_string() })))
}

// Every page load starts its own conversation
async fn index_handler(State(state): State<AppState>) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let (session_id, service) = state.sessions.open().await;
    let messages = service.messages().await;
    state
        .templates
        .acquire_env()
        .and_then(|env| {
            env.get_template("index.html").and_then(|tmpl| {
                let context = minijinja::context! {
                    title => "Assistant Premiers Secours",
                    session_id => session_id.to_string(),
                    messages => messages,
                    suggestions => session::suggestions(),
                    disclaimer => constants::DISCLAIMER,
                    loading_hint => service.loading_hint(),
                    remote_configured => service.remote_configured(),
                };
                tmpl.render(context)
            })
        })
        .map(Html)
        .map_err(|e| {
            error!("Failed to get or render template: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("Internal Server Error: {}", e)),
            )
        })
}

async fn open_session(State(state): State<AppState>) -> Json<SessionOpened> {
    let (id, service) = state.sessions.open().await;
    Json(SessionOpened {
        id,
        messages: service.messages().await,
    })
}

async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let service = state.session(id).await?;
    Ok(Json(service.messages().await))
}

async fn submit_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<Exchange>, ApiError> {
    let service = state.session(id).await?;
    service.submit(&request.text).await.map(Json).map_err(session_error)
}

async fn status_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StatusResponse>, ApiError> {
    let service = state.session(id).await?;
    Ok(Json(StatusResponse {
        status: service.status().await,
        remote_configured: service.remote_configured(),
        loading_hint: service.loading_hint(),
    }))
}

async fn suggestions_handler() -> Json<&'static [&'static str]> {
    Json(session::suggestions())
}

async fn emergency_call_handler() -> Json<NoticeResponse> {
    info!("Simulated emergency call requested");
    Json(NoticeResponse {
        message: session::emergency_call_notice(),
    })
}

async fn categories_handler() -> Json<&'static [EmergencyCategory]> {
    Json(KeywordMatcher::categories())
}

// WebSocket upgrade handler
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    info!(%id, "WebSocket connection upgrade requested");
    let service = state.session(id).await?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, service)))
}

// Forward session events to one client until it goes away
async fn handle_socket(socket: WebSocket, service: ChatService) {
    info!("New WebSocket connection established");
    let mut events = service.subscribe();
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "WebSocket client lagging behind session events");
                        continue;
                    }
                    Err(_) => break,
                };
                match serde_json::to_string(&event) {
                    Ok(json_msg) => {
                        if sender.send(Message::Text(json_msg)).await.is_err() {
                            warn!("WebSocket client disconnected or send error. Closing connection.");
                            break;
                        }
                    }
                    Err(e) => error!("Failed to serialize session event: {}", e),
                }
            }

            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(Message::Text(text))) => {
                        // Submissions go through POST /api/sessions/:id/messages
                        warn!("Ignoring text frame from client: {}", text);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket receive error: {}", e);
                        break;
                    }
                }
            }
        }
    }
    info!("WebSocket connection closed");
}

pub fn router(state: AppState, static_dir: &str) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/sessions", post(open_session))
        .route("/api/sessions/:id/messages", get(list_messages).post(submit_message))
        .route("/api/sessions/:id/status", get(status_handler))
        .route("/api/suggestions", get(suggestions_handler))
        .route("/api/emergency-call", post(emergency_call_handler))
        .route("/api/categories", get(categories_handler))
        .route("/ws/:id", get(ws_handler))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn start_web_server(
    port: u16,
    sessions: SessionRegistry,
    templates_dir: &str,
    static_dir: &str,
) -> Result<()> {
    let state = AppState::new(sessions, templates_dir);
    let app = router(state, static_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Web server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;

    Ok(())
}
