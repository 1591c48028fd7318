//! Integration tests for Cassa Vegas
//!
//! These tests verify the CLI surface, the full board workflow through the
//! library, and the HTTP router end to end.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::sync::Arc;
use tempfile::TempDir;

use cassa::board::db::{DbHandle, SnapshotDb, SnapshotStore};
use cassa::board::models::{BuildConfig, Role, SparkStatus, TrackId};
use cassa::board::store::{BoardStore, SparkDraft};
use cassa::build::{BuildRunner, Pacing};
use cassa::registry::Registry;

/// Helper to create a cassa Command
fn cassa() -> Command {
    cargo_bin_cmd!("cassa")
}

/// Helper for a temp directory holding a board database
fn temp_board() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("board.db");
    (dir, db_path)
}

async fn open_store(db_path: &std::path::Path) -> (Arc<BoardStore>, Registry) {
    let registry = Registry::load().unwrap();
    let db = DbHandle::new(SnapshotDb::new(db_path).unwrap());
    let store = Arc::new(BoardStore::open(Arc::new(db), &registry).await);
    (store, registry)
}

fn draft(title: &str, config: BuildConfig) -> SparkDraft {
    SparkDraft {
        id: None,
        title: title.to_string(),
        build_config: config,
    }
}

// =============================================================================
// CLI surface
// =============================================================================

mod cli {
    use super::*;

    #[test]
    fn test_help_lists_subcommands() {
        cassa()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("serve"))
            .stdout(predicate::str::contains("board"))
            .stdout(predicate::str::contains("agents"))
            .stdout(predicate::str::contains("registry"))
            .stdout(predicate::str::contains("reset"));
    }

    #[test]
    fn test_version() {
        cassa()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("cassa"));
    }

    #[test]
    fn test_agents_prints_roster() {
        cassa()
            .arg("agents")
            .assert()
            .success()
            .stdout(predicate::str::contains("Lyra"))
            .stdout(predicate::str::contains("Maestro"))
            .stdout(predicate::str::contains("Vega"));
    }

    #[test]
    fn test_registry_prints_catalog() {
        cassa()
            .arg("registry")
            .assert()
            .success()
            .stdout(predicate::str::contains("React + Vite"))
            .stdout(predicate::str::contains("Node.js Express API"))
            .stdout(predicate::str::contains("IndexedDB"));
    }

    #[test]
    fn test_board_without_database_shows_seed_layout() {
        let (_dir, db_path) = temp_board();
        cassa()
            .arg("--db")
            .arg(&db_path)
            .arg("board")
            .assert()
            .success()
            .stdout(predicate::str::contains("Alpha Crew"))
            .stdout(predicate::str::contains("Bravo Ops"))
            .stdout(predicate::str::contains("1. Vision Quest"))
            .stdout(predicate::str::contains("0 spark(s)"));
    }

    #[test]
    fn test_reset_without_database_is_a_noop() {
        let (_dir, db_path) = temp_board();
        cassa()
            .arg("--db")
            .arg(&db_path)
            .arg("--yes")
            .arg("reset")
            .assert()
            .success()
            .stdout(predicate::str::contains("nothing to reset"));
    }
}

// =============================================================================
// Board workflow through the library
// =============================================================================

mod workflow {
    use super::*;

    /// The concrete end-to-end scenario: seed, save "Auth Flow" into
    /// alpha/vision-quest, hand it off to bravo/intel-sync as Lyra.
    #[tokio::test]
    async fn test_auth_flow_handoff_scenario() {
        let (_dir, db_path) = temp_board();
        let (store, registry) = open_store(&db_path).await;

        let spark = store
            .save_spark(
                &TrackId::Alpha,
                "vision-quest",
                draft("Auth Flow", BuildConfig::default()),
            )
            .await
            .unwrap();

        let lyra = registry.agent("lyra").unwrap();
        store
            .handoff(&spark.id, &TrackId::Bravo, "intel-sync", "needs backend", lyra)
            .await
            .unwrap();

        let snapshot = store.snapshot().await;
        let vision_quest = snapshot.alpha.iter().find(|s| s.id == "vision-quest").unwrap();
        assert!(vision_quest.sparks.is_empty());

        let intel_sync = snapshot.bravo.iter().find(|s| s.id == "intel-sync").unwrap();
        assert_eq!(intel_sync.sparks.len(), 1);

        let moved = &intel_sync.sparks[0];
        assert_eq!(moved.title, "Auth Flow");
        assert_eq!(moved.current_domain_id, TrackId::Bravo);
        let origin = moved.origin.as_ref().unwrap();
        assert_eq!(origin.domain_id, TrackId::Alpha);
        assert_eq!(origin.stage_id, "vision-quest");
        assert_eq!(origin.agent_name, "Lyra");

        let system = moved.history.last().unwrap();
        assert_eq!(system.role, Role::System);
        assert!(system.content.contains("Lyra"));
        assert!(system.content.contains("needs backend"));
    }

    /// The write-behind persist lands in SQLite; a fresh store picks the
    /// board up where the last session left it.
    #[tokio::test]
    async fn test_board_survives_reopen() {
        let (_dir, db_path) = temp_board();
        {
            let (store, _registry) = open_store(&db_path).await;
            store
                .save_spark(
                    &TrackId::Alpha,
                    "blueprint-synthesis",
                    draft("Payments", BuildConfig::default()),
                )
                .await
                .unwrap();
            // Persistence is fire-and-forget; let the spawned save land.
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        }

        let (reopened, _registry) = open_store(&db_path).await;
        let snapshot = reopened.snapshot().await;
        assert_eq!(snapshot.spark_count(), 1);
        let blueprint = snapshot
            .alpha
            .iter()
            .find(|s| s.id == "blueprint-synthesis")
            .unwrap();
        assert_eq!(blueprint.sparks[0].title, "Payments");
    }

    #[tokio::test]
    async fn test_full_build_run_against_a_real_database() {
        let (_dir, db_path) = temp_board();
        let (store, registry) = open_store(&db_path).await;

        let spark = store
            .save_spark(
                &TrackId::Alpha,
                "vision-quest",
                draft(
                    "Auth Flow",
                    BuildConfig {
                        template: Some("react".to_string()),
                        ui: vec!["shadcn".to_string(), "tailwind".to_string()],
                        datastore: Some("indexeddb".to_string()),
                        service: Some("node-express".to_string()),
                        ..BuildConfig::default()
                    },
                ),
            )
            .await
            .unwrap();
        assert_eq!(spark.status, SparkStatus::Configured);

        use rand::SeedableRng;
        let runner = Arc::new(BuildRunner::with_rng(
            store.clone(),
            Arc::new(registry),
            rand::rngs::StdRng::seed_from_u64(3),
            Pacing::Immediate,
        ));
        let (tx, mut rx) = tokio::sync::broadcast::channel(64);
        runner.start(&spark.id, tx).await.unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            loop {
                let event = rx.recv().await.unwrap();
                if event.contains("build_finished") {
                    break;
                }
            }
        })
        .await
        .expect("build should finish");

        let built = store.get_spark(&spark.id).await.unwrap();
        assert_eq!(built.status, SparkStatus::Built);
        assert_eq!(built.build_history.len(), 9);
        assert_eq!(built.history.last().unwrap().role, Role::Model);
    }

    #[tokio::test]
    async fn test_reset_reseeds_on_next_open() {
        let (_dir, db_path) = temp_board();
        {
            let (store, _registry) = open_store(&db_path).await;
            store
                .save_spark(
                    &TrackId::Bravo,
                    "intel-sync",
                    draft("Scratch", BuildConfig::default()),
                )
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        }

        let db = DbHandle::new(SnapshotDb::new(&db_path).unwrap());
        db.clear().await.unwrap();

        let (reopened, _registry) = open_store(&db_path).await;
        let snapshot = reopened.snapshot().await;
        assert_eq!(snapshot.spark_count(), 0);
        assert_eq!(snapshot.alpha.len(), 5);
    }
}

// =============================================================================
// HTTP router end to end
// =============================================================================

mod http {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use cassa::board::db::MemoryStore;
    use cassa::chat::{ChatTurn, CompletionClient, Relay};
    use cassa::server::{AppState, SharedState, build_router};
    use http_body_util::BodyExt;
    use rand::SeedableRng;
    use tower::ServiceExt;

    struct EchoClient;

    #[async_trait]
    impl CompletionClient for EchoClient {
        async fn stream_reply(
            &self,
            turns: &[ChatTurn],
            _system_instruction: &str,
            on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
        ) -> anyhow::Result<()> {
            on_chunk("You said: ");
            on_chunk(&turns.last().unwrap().text);
            Ok(())
        }
    }

    async fn test_state() -> SharedState {
        let registry = Arc::new(Registry::load().unwrap());
        let store = Arc::new(BoardStore::open(Arc::new(MemoryStore::new()), &registry).await);
        let runner = Arc::new(BuildRunner::with_rng(
            store.clone(),
            registry.clone(),
            rand::rngs::StdRng::seed_from_u64(11),
            Pacing::Immediate,
        ));
        let (ws_tx, _rx) = tokio::sync::broadcast::channel(64);
        Arc::new(AppState {
            store,
            registry,
            runner,
            relay: Arc::new(Relay::new(Arc::new(EchoClient))),
            ws_tx,
        })
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_of(resp: axum::response::Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_save_handoff_chat_over_http() {
        let state = test_state().await;

        // Save
        let resp = build_router(state.clone())
            .oneshot(post_json(
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
        let spark_id = json_of(resp).await["id"].as_str().unwrap().to_string();

        // Handoff
        let resp = build_router(state.clone())
            .oneshot(post_json(
                &format!("/api/sparks/{spark_id}/handoff"),
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
        let moved = json_of(resp).await;
        assert_eq!(moved["origin"]["stage_id"], "vision-quest");
        assert_eq!(moved["current_domain_id"], "bravo");

        // Chat
        let resp = build_router(state.clone())
            .oneshot(post_json(
                &format!("/api/sparks/{spark_id}/chat"),
                serde_json::json!({"message": "status?", "agent_id": "vega"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_of(resp).await["content"], "You said: status?");

        // The board reflects all of it: handoff entry, user turn, reply.
        let resp = build_router(state)
            .oneshot(Request::builder().uri("/api/board").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let board = json_of(resp).await;
        let intel_sync = &board["bravo"][0];
        assert_eq!(intel_sync["id"], "intel-sync");
        assert_eq!(
            intel_sync["sparks"][0]["history"].as_array().unwrap().len(),
            3
        );
    }

    #[tokio::test]
    async fn test_handoff_missing_spark_leaves_board_unchanged_over_http() {
        let state = test_state().await;
        let before = state.store.snapshot().await;

        let resp = build_router(state.clone())
            .oneshot(post_json(
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
        assert_eq!(state.store.snapshot().await, before);
    }
}
