use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tokio::sync::broadcast;

use crate::board::models::{Message, TrackId};
use crate::board::store::{BoardStore, SparkDraft};
use crate::build::BuildRunner;
use crate::chat::Relay;
use crate::errors::{BoardError, ChatError};
use crate::registry::{Agent, Registry};

use super::ws::{BoardEvent, broadcast_event};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub store: Arc<BoardStore>,
    pub registry: Arc<Registry>,
    pub runner: Arc<BuildRunner>,
    pub relay: Arc<Relay>,
    pub ws_tx: broadcast::Sender<String>,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SaveSparkRequest {
    pub track: String,
    pub stage_id: String,
    #[serde(flatten)]
    pub spark: SparkDraft,
}

#[derive(Deserialize)]
pub struct HandoffRequest {
    pub target_track: String,
    pub target_stage_id: String,
    pub note: String,
    pub agent_id: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub agent_id: Option<String>,
}

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unavailable(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<BoardError> for ApiError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::SparkNotFound { .. }
            | BoardError::StageNotFound { .. }
            | BoardError::AgentNotFound { .. } => ApiError::NotFound(err.to_string()),
            BoardError::Validation(_) | BoardError::BuildAlreadyRunning { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            BoardError::Storage(_) | BoardError::Other(_) => ApiError::Internal(err.to_string()),
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/board", get(get_board))
        .route("/api/sparks", post(save_spark))
        .route("/api/sparks/{id}/handoff", post(handoff_spark))
        .route("/api/sparks/{id}/build", post(start_build))
        .route("/api/sparks/{id}/chat", post(chat))
        .route("/api/registry", get(get_registry))
        .route("/api/agents", get(get_agents))
        .route("/api/stages/{track}", get(get_stages))
        .route("/health", get(health_check))
}

// ── Helpers ───────────────────────────────────────────────────────────

fn parse_track(raw: &str) -> Result<TrackId, ApiError> {
    TrackId::from_str(raw).map_err(ApiError::BadRequest)
}

/// Resolve the acting agent, defaulting to the roster's default persona.
fn resolve_agent<'a>(registry: &'a Registry, agent_id: Option<&str>) -> Result<&'a Agent, ApiError> {
    match agent_id {
        Some(id) => registry.agent(id).ok_or_else(|| {
            ApiError::NotFound(
                BoardError::AgentNotFound { id: id.to_string() }.to_string(),
            )
        }),
        None => Ok(registry.default_agent()),
    }
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn get_board(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.store.snapshot().await)
}

async fn save_spark(
    State(state): State<SharedState>,
    Json(req): Json<SaveSparkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let track = parse_track(&req.track)?;
    let spark = state.store.save_spark(&track, &req.stage_id, req.spark).await?;
    broadcast_event(
        &state.ws_tx,
        &BoardEvent::SparkSaved {
            track,
            stage_id: req.stage_id,
            spark: spark.clone(),
        },
    );
    Ok((StatusCode::CREATED, Json(spark)))
}

async fn handoff_spark(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<HandoffRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let target_track = parse_track(&req.target_track)?;
    let agent = resolve_agent(&state.registry, req.agent_id.as_deref())?.clone();

    let outcome = state
        .store
        .handoff(&id, &target_track, &req.target_stage_id, &req.note, &agent)
        .await?;
    broadcast_event(
        &state.ws_tx,
        &BoardEvent::SparkHandedOff {
            from_track: outcome.from_track,
            from_stage_id: outcome.from_stage_id,
            spark: outcome.spark.clone(),
        },
    );
    Ok(Json(outcome.spark))
}

async fn start_build(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    // The runner broadcasts build_started itself and streams step events
    // as the spawned run executes.
    let spark = state.runner.start(&id, state.ws_tx.clone()).await?;
    Ok((StatusCode::ACCEPTED, Json(spark)))
}

async fn chat(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let agent = resolve_agent(&state.registry, req.agent_id.as_deref())?.clone();
    let message = req.message.trim().to_string();
    if message.is_empty() {
        // Refused before the transcript is touched.
        return Err(ApiError::BadRequest(ChatError::EmptyMessage.to_string()));
    }

    let prior = state.store.begin_user_turn(&id, &message).await?;
    broadcast_event(
        &state.ws_tx,
        &BoardEvent::ChatMessage {
            spark_id: id.clone(),
            message: Message::user(&message),
        },
    );

    // Streamed fragments append into the open model turn as they arrive;
    // the relay callback is synchronous, so the append runs on a side task
    // fed through a channel.
    let (chunk_tx, mut chunk_rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    let appender = {
        let store = state.store.clone();
        let spark_id = id.clone();
        tokio::spawn(async move {
            while let Some(chunk) = chunk_rx.recv().await {
                if let Err(e) = store.append_model_chunk(&spark_id, &chunk).await {
                    tracing::warn!("Dropping chat chunk for {}: {e:#}", spark_id);
                }
            }
        })
    };

    let result = state
        .relay
        .send(&prior, &message, &agent.personality_prompt, |chunk| {
            let _ = chunk_tx.send(chunk.to_string());
        })
        .await;
    drop(chunk_tx);
    let _ = appender.await;

    match result {
        Ok(_) => {
            let reply = state.store.finish_model_turn(&id, None).await?;
            broadcast_event(
                &state.ws_tx,
                &BoardEvent::ChatMessage {
                    spark_id: id,
                    message: reply.clone(),
                },
            );
            Ok(Json(reply))
        }
        Err(ChatError::EmptyMessage) => {
            Err(ApiError::BadRequest(ChatError::EmptyMessage.to_string()))
        }
        Err(err) => {
            // Keep whatever streamed before the failure; the error reads
            // as the persona, not a generic "AI".
            let _ = state.store.finish_model_turn(&id, None).await;
            Err(ApiError::Unavailable(
                err.to_string().replace("The AI", &agent.name),
            ))
        }
    }
}

async fn get_registry(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.registry.catalog().clone())
}

async fn get_agents(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.registry.agents().to_vec())
}

async fn get_stages(
    State(state): State<SharedState>,
    Path(track): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let track = parse_track(&track)?;
    Ok(Json(state.registry.stage_templates(&track).to_vec()))
}
