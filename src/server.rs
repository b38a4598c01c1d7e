use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use tracing::info;

use crate::AppState;
use crate::config::AppConfig;
use crate::error::{ChatError, RegistryError};
use crate::llm::Orchestrator;
use crate::mcp::{ServerRecord, ServerRegistry};
use crate::session::ChatMessage;

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let settings = config.llm_settings();
    info!(
        name: "llm.config.loaded",
        base_url = %settings.base_url,
        model = %settings.model,
        protocol = ?settings.protocol.resolve(&settings.base_url),
        has_api_key = settings.api_key.is_some(),
        "LLM configuration loaded"
    );
    if settings.api_key.is_none() {
        tracing::warn!("No API key configured; every turn will answer with the fallback reply");
    }

    let registry = match &config.mcp.config_file {
        Some(path) => ServerRegistry::load_from_file(path)?,
        None => ServerRegistry::demo(),
    };
    for server in registry.list() {
        info!(
            name: "mcp.server.registered",
            server = %server.name,
            status = ?server.status,
            "MCP server registered"
        );
    }

    let state = AppState::new(registry, Orchestrator::new(settings));
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %format!("http://{addr}"),
        "Server started"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/chat", post(api_chat))
        .route("/api/messages", get(api_list_messages))
        .route("/api/servers", get(api_list_servers).post(api_add_server))
        .route("/api/servers/{id}", delete(api_remove_server))
        .route("/api/servers/{id}/toggle", post(api_toggle_server))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// JSON error body: `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(e: ChatError) -> Self {
        let status = match e {
            ChatError::EmptyPrompt => StatusCode::BAD_REQUEST,
            ChatError::Busy => StatusCode::CONFLICT,
            ChatError::Aborted => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: e.to_string(),
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
}

async fn api_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatMessage>, ApiError> {
    tracing::info!(message_length = req.message.len(), "Received chat request");
    let message = state.submit(&req.message).await?;
    Ok(Json(message))
}

#[derive(Debug, Serialize)]
struct MessagesResponse {
    messages: Vec<ChatMessage>,
    processing: bool,
}

async fn api_list_messages(State(state): State<AppState>) -> Json<MessagesResponse> {
    let conversation = state.conversation.read().await;
    Json(MessagesResponse {
        messages: conversation.messages().to_vec(),
        processing: conversation.is_processing(),
    })
}

async fn api_list_servers(State(state): State<AppState>) -> Json<Vec<ServerRecord>> {
    Json(state.registry.read().await.list())
}

#[derive(Debug, Deserialize)]
struct AddServerRequest {
    name: String,
    url: String,
    #[serde(default)]
    description: String,
}

async fn api_add_server(
    State(state): State<AppState>,
    Json(req): Json<AddServerRequest>,
) -> Result<(StatusCode, Json<ServerRecord>), ApiError> {
    let record = state
        .registry
        .write()
        .await
        .add(&req.name, &req.url, &req.description)?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn api_remove_server(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    state.registry.write().await.remove(&id);
    StatusCode::NO_CONTENT
}

async fn api_toggle_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ServerRecord>, StatusCode> {
    let mut registry = state.registry.write().await;
    registry.toggle_connection(&id).ok_or(StatusCode::NOT_FOUND)?;
    registry
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
