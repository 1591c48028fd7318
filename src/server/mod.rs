//! HTTP + WebSocket surface over the board.
//!
//! ```text
//!   browser ──REST──► api::api_router ──► BoardStore / BuildRunner / Relay
//!      ▲                                        │
//!      └────WS /ws◄── ws::BoardEvent ◄── broadcast channel
//! ```
//!
//! | Module | Responsibility                                           |
//! |--------|----------------------------------------------------------|
//! | `api`  | Route table, request payloads, handlers, error mapping   |
//! | `ws`   | Event types, fan-out, keepalive socket loop              |
//!
//! Every committed mutation broadcasts a [`ws::BoardEvent`]; clients that
//! lag the channel refetch the board instead of replaying missed events.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::board::db::{DbHandle, SnapshotDb};
use crate::board::store::BoardStore;
use crate::build::BuildRunner;
use crate::chat::{GeminiClient, Relay};
use crate::config::CassaConfig;
use crate::registry::Registry;

pub mod api;
pub mod ws;

pub use api::{AppState, SharedState};

/// Capacity of the WS fan-out channel; laggards refetch the board.
const BROADCAST_CAPACITY: usize = 256;

/// Build the full application router: REST API plus the WebSocket route.
pub fn build_router(state: SharedState) -> Router {
    api::api_router()
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
}

/// Wire the whole service together and serve it until ctrl-c.
pub async fn start_server(config: CassaConfig) -> Result<()> {
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let registry = Arc::new(Registry::load()?);
    let db = DbHandle::new(
        SnapshotDb::new(&config.db_path).context("Failed to initialize snapshot database")?,
    );
    let store = Arc::new(BoardStore::open(Arc::new(db), &registry).await);

    if config.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; chat requests will fail as unavailable");
    }
    let relay = Arc::new(Relay::new(Arc::new(GeminiClient::new(
        config.gemini_api_key.clone().unwrap_or_default(),
        config.gemini_model.clone(),
    ))));

    let (ws_tx, _rx) = broadcast::channel::<String>(BROADCAST_CAPACITY);
    let runner = Arc::new(BuildRunner::new(store.clone(), registry.clone()));

    let state = Arc::new(AppState {
        store,
        registry,
        runner,
        relay,
        ws_tx,
    });

    let mut app = build_router(state);
    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let host = if config.dev_mode { "0.0.0.0" } else { "127.0.0.1" };
    let addr = format!("{}:{}", host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Cassa Vegas board at http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    println!("\nShutting down...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::db::MemoryStore;
    use crate::board::models::{Role, Snapshot, Spark, SparkStatus};
    use crate::build::Pacing;
    use crate::chat::{ChatTurn, CompletionClient};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tower::ServiceExt;

    struct CannedClient {
        reply: Option<&'static str>,
    }

    #[async_trait]
    impl CompletionClient for CannedClient {
        async fn stream_reply(
            &self,
            _turns: &[ChatTurn],
            _system_instruction: &str,
            on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
        ) -> anyhow::Result<()> {
            match self.reply {
                Some(text) => {
                    for word in text.split_inclusive(' ') {
                        on_chunk(word);
                    }
                    Ok(())
                }
                None => anyhow::bail!("connection refused"),
            }
        }
    }

    async fn test_router_with_chat(reply: Option<&'static str>) -> (Router, SharedState) {
        let registry = Arc::new(Registry::load().unwrap());
        let store = Arc::new(BoardStore::open(Arc::new(MemoryStore::new()), &registry).await);
        let runner = Arc::new(BuildRunner::with_rng(
            store.clone(),
            registry.clone(),
            StdRng::seed_from_u64(7),
            Pacing::Immediate,
        ));
        let relay = Arc::new(Relay::new(Arc::new(CannedClient { reply })));
        let (ws_tx, _rx) = broadcast::channel(16);
        let state = Arc::new(AppState {
            store,
            registry,
            runner,
            relay,
            ws_tx,
        });
        (build_router(state.clone()), state)
    }

    async fn test_router() -> (Router, SharedState) {
        test_router_with_chat(Some("Well, hello there.")).await
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create_spark(state: &SharedState, title: &str) -> Spark {
        state
            .store
            .save_spark(
                &crate::board::models::TrackId::Alpha,
                "vision-quest",
                crate::board::store::SparkDraft {
                    id: None,
                    title: title.to_string(),
                    build_config: Default::default(),
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _state) = test_router().await;
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_board_returns_seeded_snapshot() {
        let (app, _state) = test_router().await;
        let resp = app
            .oneshot(Request::builder().uri("/api/board").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let snapshot: Snapshot = serde_json::from_value(body_json(resp).await).unwrap();
        assert_eq!(snapshot.alpha.len(), 5);
        assert_eq!(snapshot.bravo.len(), 5);
    }

    #[tokio::test]
    async fn test_save_spark_roundtrip() {
        let (app, _state) = test_router().await;
        let resp = app
            .oneshot(json_request(
                "POST",
                "/api/sparks",
                serde_json::json!({
                    "track": "alpha",
                    "stage_id": "vision-quest",
                    "title": "Auth Flow",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let spark: Spark = serde_json::from_value(body_json(resp).await).unwrap();
        assert_eq!(spark.title, "Auth Flow");
        assert_eq!(spark.status, SparkStatus::Unconfigured);
    }

    #[tokio::test]
    async fn test_save_spark_empty_title_is_400() {
        let (app, _state) = test_router().await;
        let resp = app
            .oneshot(json_request(
                "POST",
                "/api/sparks",
                serde_json::json!({
                    "track": "alpha",
                    "stage_id": "vision-quest",
                    "title": "  ",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "Title cannot be empty.");
    }

    #[tokio::test]
    async fn test_save_spark_bad_track_is_400() {
        let (app, _state) = test_router().await;
        let resp = app
            .oneshot(json_request(
                "POST",
                "/api/sparks",
                serde_json::json!({
                    "track": "charlie",
                    "stage_id": "vision-quest",
                    "title": "Auth Flow",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_handoff_endpoint_moves_and_broadcasts() {
        let (app, state) = test_router().await;
        let spark = create_spark(&state, "Auth Flow").await;
        let mut rx = state.ws_tx.subscribe();

        let resp = app
            .oneshot(json_request(
                "POST",
                &format!("/api/sparks/{}/handoff", spark.id),
                serde_json::json!({
                    "target_track": "bravo",
                    "target_stage_id": "intel-sync",
                    "note": "needs backend",
                    "agent_id": "lyra",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let moved: Spark = serde_json::from_value(body_json(resp).await).unwrap();
        assert_eq!(moved.origin.as_ref().unwrap().agent_name, "Lyra");

        let event = rx.recv().await.unwrap();
        assert!(event.contains("spark_handed_off"));
        assert!(event.contains("\"from_stage_id\":\"vision-quest\""));
    }

    #[tokio::test]
    async fn test_handoff_unknown_spark_is_404() {
        let (app, _state) = test_router().await;
        let resp = app
            .oneshot(json_request(
                "POST",
                "/api/sparks/spark-ghost/handoff",
                serde_json::json!({
                    "target_track": "bravo",
                    "target_stage_id": "intel-sync",
                    "note": "note",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_handoff_unknown_agent_is_404() {
        let (app, state) = test_router().await;
        let spark = create_spark(&state, "Auth Flow").await;
        let resp = app
            .oneshot(json_request(
                "POST",
                &format!("/api/sparks/{}/handoff", spark.id),
                serde_json::json!({
                    "target_track": "bravo",
                    "target_stage_id": "intel-sync",
                    "note": "note",
                    "agent_id": "nobody",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_build_endpoint_gates_on_template() {
        let (app, state) = test_router().await;
        let spark = create_spark(&state, "Auth Flow").await;
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/sparks/{}/build", spark.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_build_endpoint_accepts_configured_spark() {
        let (app, state) = test_router().await;
        let spark = create_spark(&state, "Auth Flow").await;
        state
            .store
            .save_spark(
                &crate::board::models::TrackId::Alpha,
                "vision-quest",
                crate::board::store::SparkDraft {
                    id: Some(spark.id.clone()),
                    title: "Auth Flow".to_string(),
                    build_config: crate::board::models::BuildConfig {
                        template: Some("react".to_string()),
                        ..Default::default()
                    },
                },
            )
            .await
            .unwrap();

        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/sparks/{}/build", spark.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);

        let announced: Spark = serde_json::from_value(body_json(resp).await).unwrap();
        assert_eq!(announced.status, SparkStatus::Building);
    }

    #[tokio::test]
    async fn test_chat_endpoint_streams_into_model_turn() {
        let (app, state) = test_router().await;
        let spark = create_spark(&state, "Auth Flow").await;

        let resp = app
            .oneshot(json_request(
                "POST",
                &format!("/api/sparks/{}/chat", spark.id),
                serde_json::json!({"message": "what's the plan?", "agent_id": "lyra"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let reply = body_json(resp).await;
        assert_eq!(reply["role"], "model");
        assert_eq!(reply["content"], "Well, hello there.");

        let history = state.store.get_spark(&spark.id).await.unwrap().history;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].content, "Well, hello there.");
    }

    #[tokio::test]
    async fn test_chat_blank_message_is_400_and_leaves_transcript_alone() {
        let (app, state) = test_router().await;
        let spark = create_spark(&state, "Auth Flow").await;

        let resp = app
            .oneshot(json_request(
                "POST",
                &format!("/api/sparks/{}/chat", spark.id),
                serde_json::json!({"message": "   "}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(
            state
                .store
                .get_spark(&spark.id)
                .await
                .unwrap()
                .history
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_chat_unavailable_is_502_named_after_persona() {
        let (app, state) = test_router_with_chat(None).await;
        let spark = create_spark(&state, "Auth Flow").await;

        let resp = app
            .oneshot(json_request(
                "POST",
                &format!("/api/sparks/{}/chat", spark.id),
                serde_json::json!({"message": "hello", "agent_id": "vega"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let error = body_json(resp).await["error"].as_str().unwrap().to_string();
        assert_eq!(error, "Vega is currently unavailable. Please try again later.");

        // The user turn and the (empty) model turn stay inspectable.
        let history = state.store.get_spark(&spark.id).await.unwrap().history;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::Model);
    }

    #[tokio::test]
    async fn test_registry_endpoints() {
        let (app, _state) = test_router().await;
        let resp = app
            .oneshot(Request::builder().uri("/api/registry").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let catalog = body_json(resp).await;
        assert!(catalog["templates"].as_array().unwrap().len() >= 4);

        let (app, _state) = test_router().await;
        let resp = app
            .oneshot(Request::builder().uri("/api/agents").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let agents = body_json(resp).await;
        assert_eq!(agents.as_array().unwrap().len(), 8);

        let (app, _state) = test_router().await;
        let resp = app
            .oneshot(Request::builder().uri("/api/stages/bravo").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let stages = body_json(resp).await;
        assert_eq!(stages[0]["id"], "intel-sync");

        let (app, _state) = test_router().await;
        let resp = app
            .oneshot(Request::builder().uri("/api/stages/charlie").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
