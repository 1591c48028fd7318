use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::{Mutex, watch};
use tracing::{info, warn};

use crate::errors::BoardError;
use crate::registry::{Agent, Registry};

use super::db::SnapshotStore;
use super::models::{
    BuildStep, Message, Origin, Role, Snapshot, Spark, SparkStatus, Stage, Suggestion, TrackId,
    new_spark_id,
};

/// User-editable fields of a spark, as submitted by a save.
#[derive(Debug, Clone, Deserialize)]
pub struct SparkDraft {
    /// Present when updating, or when the client pre-minted a draft id.
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub build_config: super::models::BuildConfig,
}

/// A committed handoff: the moved spark plus where it came from, so
/// observers can update the old stage without refetching the board.
#[derive(Debug, Clone)]
pub struct HandoffOutcome {
    pub spark: Spark,
    pub from_track: TrackId,
    pub from_stage_id: String,
}

/// Authoritative in-memory board state.
///
/// Every mutation rebuilds the affected track's stage list wholesale and
/// swaps it in under the lock, so observers only ever see fully-formed
/// trees. The committed snapshot then mirrors to storage write-behind
/// through a single writer task, so saves land in commit order; storage
/// failures are logged and the session continues in memory.
pub struct BoardStore {
    snapshot: Mutex<Snapshot>,
    persist_tx: watch::Sender<Snapshot>,
}

impl BoardStore {
    /// Load the persisted board, seeding a fresh one from the stage
    /// templates when nothing durable exists or either track is missing
    /// its scaffold. The seed persists immediately; a failure to persist
    /// it (or to load at all) is logged and the in-memory board serves
    /// the session anyway.
    pub async fn open(db: Arc<dyn SnapshotStore>, registry: &Registry) -> Self {
        let snapshot = match db.load().await {
            Ok(Some(mut snapshot)) if !snapshot.needs_seed() => {
                if recover_interrupted_builds(&mut snapshot) {
                    if let Err(e) = db.save(&snapshot).await {
                        warn!("Failed to persist recovered board: {e:#}");
                    }
                }
                snapshot
            }
            Ok(_) => {
                let seeded = registry.seed_snapshot();
                info!(
                    "Seeding board: {} alpha stages, {} bravo stages",
                    seeded.alpha.len(),
                    seeded.bravo.len()
                );
                if let Err(e) = db.save(&seeded).await {
                    warn!("Failed to persist seeded board, continuing in memory: {e:#}");
                }
                seeded
            }
            Err(e) => {
                warn!("Failed to load board snapshot, using defaults: {e:#}");
                registry.seed_snapshot()
            }
        };
        let persist_tx = spawn_snapshot_writer(db, &snapshot);
        Self {
            snapshot: Mutex::new(snapshot),
            persist_tx,
        }
    }

    /// Clone of the full board.
    pub async fn snapshot(&self) -> Snapshot {
        self.snapshot.lock().await.clone()
    }

    pub async fn get_spark(&self, spark_id: &str) -> Result<Spark, BoardError> {
        let guard = self.snapshot.lock().await;
        guard
            .find_spark(spark_id)
            .map(|(_, _, spark)| spark.clone())
            .ok_or_else(|| BoardError::SparkNotFound {
                id: spark_id.to_string(),
            })
    }

    /// Create or update a spark in the given track.
    ///
    /// Updates locate the spark by id anywhere on the board; a save naming
    /// a track the spark no longer occupies (a board view that predates a
    /// handoff) is refused rather than minting a second copy. Ids the board
    /// has never seen are created in `stage_id`. Built sparks refuse edits
    /// for good; building sparks refuse them until the run ends. A
    /// configuration edit moves `unconfigured` (and `error`) sparks to
    /// `configured`.
    pub async fn save_spark(
        &self,
        track: &TrackId,
        stage_id: &str,
        draft: SparkDraft,
    ) -> Result<Spark, BoardError> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(BoardError::validation("Title cannot be empty."));
        }

        let mut guard = self.snapshot.lock().await;
        if !guard.track(track).iter().any(|s| s.id == stage_id) {
            return Err(BoardError::StageNotFound {
                track: track.to_string(),
                id: stage_id.to_string(),
            });
        }

        let existing = match draft.id.as_deref().and_then(|id| locate(&guard, id)) {
            Some((found_track, si, pi)) => {
                if found_track != *track {
                    return Err(BoardError::validation(format!(
                        "Spark now lives in the {} domain; refresh the board before saving.",
                        found_track.as_str().to_uppercase()
                    )));
                }
                Some((si, pi))
            }
            None => None,
        };

        let saved = match existing {
            Some((si, pi)) => {
                let stored = &guard.track(track)[si].sparks[pi];
                let config_changed = stored.build_config != draft.build_config;
                let changed = config_changed || stored.title != title;
                match stored.status {
                    SparkStatus::Built if changed => {
                        return Err(BoardError::validation(
                            "Spark is already built and can no longer be edited.",
                        ));
                    }
                    SparkStatus::Building if changed => {
                        return Err(BoardError::validation(
                            "Build in progress; the spark cannot be edited right now.",
                        ));
                    }
                    _ => {}
                }
                let status = match stored.status {
                    SparkStatus::Unconfigured | SparkStatus::Error if config_changed => {
                        SparkStatus::Configured
                    }
                    ref status => status.clone(),
                };

                let mut stages = guard.track(track).to_vec();
                let spark = &mut stages[si].sparks[pi];
                spark.title = title;
                spark.build_config = draft.build_config;
                spark.status = status;
                let saved = spark.clone();
                *guard.track_mut(track) = stages;
                saved
            }
            None => {
                let status = if draft.build_config.is_empty() {
                    SparkStatus::Unconfigured
                } else {
                    SparkStatus::Configured
                };
                let spark = Spark {
                    id: draft.id.unwrap_or_else(new_spark_id),
                    title,
                    history: Vec::new(),
                    current_domain_id: track.clone(),
                    origin: None,
                    build_config: draft.build_config,
                    build_history: Vec::new(),
                    status,
                };
                let saved = spark.clone();
                let stages = guard
                    .track(track)
                    .iter()
                    .map(|stage| {
                        if stage.id == stage_id {
                            let mut stage = stage.clone();
                            stage.sparks.push(spark.clone());
                            stage
                        } else {
                            stage.clone()
                        }
                    })
                    .collect();
                *guard.track_mut(track) = stages;
                saved
            }
        };

        self.persist(guard.clone());
        Ok(saved)
    }

    /// Move a spark into a stage of the target track.
    ///
    /// The whole effect commits in one snapshot swap: removal from the old
    /// stage, the system transcript entry, the track change, the one-time
    /// origin stamp, and the append to the target stage. A spark missing
    /// from the track it claims to occupy aborts with the board untouched.
    pub async fn handoff(
        &self,
        spark_id: &str,
        target_track: &TrackId,
        target_stage_id: &str,
        note: &str,
        acting_agent: &Agent,
    ) -> Result<HandoffOutcome, BoardError> {
        let note = note.trim();
        if note.is_empty() {
            return Err(BoardError::validation("Handoff note cannot be empty."));
        }

        let mut guard = self.snapshot.lock().await;
        if !guard
            .track(target_track)
            .iter()
            .any(|s| s.id == target_stage_id)
        {
            return Err(BoardError::StageNotFound {
                track: target_track.to_string(),
                id: target_stage_id.to_string(),
            });
        }

        // A spark whose recorded track disagrees with where it actually
        // sits is treated as missing.
        let (origin_track, si, pi) = match locate(&guard, spark_id) {
            Some(found) if guard.track(&found.0)[found.1].sparks[found.2].current_domain_id == found.0 => found,
            _ => {
                return Err(BoardError::SparkNotFound {
                    id: spark_id.to_string(),
                });
            }
        };
        let origin_stage_id = guard.track(&origin_track)[si].id.clone();
        let origin_stage_title = guard.track(&origin_track)[si].title.clone();
        let mut spark = guard.track(&origin_track)[si].sparks[pi].clone();

        let drained: Vec<Stage> = guard
            .track(&origin_track)
            .iter()
            .map(|stage| {
                if stage.id == origin_stage_id {
                    let mut stage = stage.clone();
                    stage.sparks.retain(|s| s.id != spark_id);
                    stage
                } else {
                    stage.clone()
                }
            })
            .collect();
        *guard.track_mut(&origin_track) = drained;

        spark.history.push(Message::system(format!(
            "Spark handed off from {} @ {} to {} domain.\nReason: {}",
            acting_agent.name,
            origin_stage_title,
            target_track.as_str().to_uppercase(),
            note
        )));
        spark.current_domain_id = target_track.clone();
        if spark.origin.is_none() {
            spark.origin = Some(Origin {
                domain_id: origin_track.clone(),
                stage_id: origin_stage_id.clone(),
                agent_name: acting_agent.name.clone(),
            });
        }

        let handed = spark.clone();
        let appended: Vec<Stage> = guard
            .track(target_track)
            .iter()
            .map(|stage| {
                if stage.id == target_stage_id {
                    let mut stage = stage.clone();
                    stage.sparks.push(spark.clone());
                    stage
                } else {
                    stage.clone()
                }
            })
            .collect();
        *guard.track_mut(target_track) = appended;

        self.persist(guard.clone());
        drop(guard);
        info!(
            "Spark {} handed off to {}/{}",
            spark_id, target_track, target_stage_id
        );
        Ok(HandoffOutcome {
            spark: handed,
            from_track: origin_track,
            from_stage_id: origin_stage_id,
        })
    }

    /// Start a user turn: strip suggestions from every prior message, then
    /// append the user message and an empty model turn awaiting streamed
    /// content. Returns the transcript as it stood before this turn, which
    /// is what the relay forwards.
    pub async fn begin_user_turn(
        &self,
        spark_id: &str,
        content: &str,
    ) -> Result<Vec<Message>, BoardError> {
        let mut guard = self.snapshot.lock().await;
        let (track, si, pi) = locate(&guard, spark_id).ok_or_else(|| BoardError::SparkNotFound {
            id: spark_id.to_string(),
        })?;

        let mut stages = guard.track(&track).to_vec();
        let spark = &mut stages[si].sparks[pi];
        let prior = spark.history.clone();
        for message in &mut spark.history {
            message.suggestions = None;
        }
        spark.history.push(Message::user(content));
        spark.history.push(Message::model(""));
        *guard.track_mut(&track) = stages;

        self.persist(guard.clone());
        Ok(prior)
    }

    /// Append streamed text to the newest transcript entry when it is an
    /// open model turn. Memory-only; the turn persists when it completes.
    pub async fn append_model_chunk(&self, spark_id: &str, chunk: &str) -> Result<(), BoardError> {
        self.update_spark(spark_id, false, |spark| {
            if let Some(last) = spark.history.last_mut() {
                if last.role == Role::Model {
                    last.content.push_str(chunk);
                }
            }
        })
        .await?;
        Ok(())
    }

    /// Close the newest model turn, optionally attaching suggestions, and
    /// persist the transcript. Returns the completed message.
    pub async fn finish_model_turn(
        &self,
        spark_id: &str,
        suggestions: Option<Vec<Suggestion>>,
    ) -> Result<Message, BoardError> {
        let updated = self
            .update_spark(spark_id, true, |spark| {
                if let Some(last) = spark.history.last_mut() {
                    if last.role == Role::Model {
                        last.suggestions = suggestions;
                    }
                }
            })
            .await?;
        updated
            .history
            .last()
            .cloned()
            .ok_or_else(|| BoardError::Other(anyhow::anyhow!("Transcript empty after turn")))
    }

    /// Append a complete message to a spark's transcript.
    pub async fn append_message(
        &self,
        spark_id: &str,
        message: Message,
    ) -> Result<(), BoardError> {
        self.update_spark(spark_id, true, |spark| spark.history.push(message))
            .await?;
        Ok(())
    }

    /// Gate and enter a build run.
    ///
    /// Requires a chosen template and a `configured` spark; a running build
    /// refuses a second start. Clears the previous build history, appends
    /// the opening system message, and marks the spark `building`.
    pub async fn mark_building(
        &self,
        spark_id: &str,
        opening: Message,
    ) -> Result<Spark, BoardError> {
        let mut guard = self.snapshot.lock().await;
        let (track, si, pi) = locate(&guard, spark_id).ok_or_else(|| BoardError::SparkNotFound {
            id: spark_id.to_string(),
        })?;

        {
            let spark = &guard.track(&track)[si].sparks[pi];
            if spark.status == SparkStatus::Building {
                return Err(BoardError::BuildAlreadyRunning {
                    spark_id: spark_id.to_string(),
                });
            }
            if spark.build_config.template.is_none() {
                return Err(BoardError::validation(
                    "A template must be selected before starting a build.",
                ));
            }
            match spark.status {
                SparkStatus::Built => {
                    return Err(BoardError::validation("Spark is already built."));
                }
                SparkStatus::Error => {
                    return Err(BoardError::validation(
                        "Edit the configuration to reconfigure the spark before rebuilding.",
                    ));
                }
                _ => {}
            }
        }

        let mut stages = guard.track(&track).to_vec();
        let spark = &mut stages[si].sparks[pi];
        spark.status = SparkStatus::Building;
        spark.build_history.clear();
        spark.history.push(opening);
        let updated = spark.clone();
        *guard.track_mut(&track) = stages;

        self.persist(guard.clone());
        Ok(updated)
    }

    /// Record one executed step and its mirrored system transcript entry.
    pub async fn record_step(
        &self,
        spark_id: &str,
        step: BuildStep,
        mirror: Message,
    ) -> Result<(), BoardError> {
        self.update_spark(spark_id, true, |spark| {
            spark.build_history.push(step);
            spark.history.push(mirror);
        })
        .await?;
        Ok(())
    }

    /// Complete a run: append the closing model message and mark `built`.
    pub async fn finish_build(&self, spark_id: &str, closing: Message) -> Result<(), BoardError> {
        self.update_spark(spark_id, true, |spark| {
            spark.status = SparkStatus::Built;
            spark.history.push(closing);
        })
        .await?;
        Ok(())
    }

    /// Halt a run on a failed step: record it and mark the spark `error`.
    /// The spark re-enters `configured` on its next configuration edit.
    pub async fn fail_build(
        &self,
        spark_id: &str,
        step: BuildStep,
        mirror: Message,
    ) -> Result<(), BoardError> {
        self.update_spark(spark_id, true, |spark| {
            spark.build_history.push(step);
            spark.history.push(mirror);
            spark.status = SparkStatus::Error;
        })
        .await?;
        Ok(())
    }

    /// Shared rebuild-and-swap path for single-spark mutations.
    async fn update_spark<F>(
        &self,
        spark_id: &str,
        persist_after: bool,
        update: F,
    ) -> Result<Spark, BoardError>
    where
        F: FnOnce(&mut Spark),
    {
        let mut guard = self.snapshot.lock().await;
        let (track, si, pi) = locate(&guard, spark_id).ok_or_else(|| BoardError::SparkNotFound {
            id: spark_id.to_string(),
        })?;

        let mut stages = guard.track(&track).to_vec();
        update(&mut stages[si].sparks[pi]);
        let updated = stages[si].sparks[pi].clone();
        *guard.track_mut(&track) = stages;

        if persist_after {
            self.persist(guard.clone());
        }
        Ok(updated)
    }

    /// Write-behind persistence. The snapshot is handed to the single
    /// writer task while the board lock is still held, so saves are queued
    /// in commit order; a burst of mutations may coalesce into one save of
    /// the newest snapshot. Failures are logged, never surfaced; the
    /// in-memory snapshot stays the source of truth for the session.
    fn persist(&self, snapshot: Snapshot) {
        if self.persist_tx.send(snapshot).is_err() {
            warn!("Snapshot writer stopped; board changes stay in memory only");
        }
    }
}

/// Single writer draining the latest committed snapshot to storage. The
/// task exits when the owning store drops its sender.
fn spawn_snapshot_writer(
    db: Arc<dyn SnapshotStore>,
    initial: &Snapshot,
) -> watch::Sender<Snapshot> {
    let (tx, mut rx) = watch::channel(initial.clone());
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let snapshot = rx.borrow_and_update().clone();
            if let Err(e) = db.save(&snapshot).await {
                warn!("Failed to persist board snapshot: {e:#}");
            }
        }
    });
    tx
}

/// A `building` status that survived a shutdown means the process died
/// mid-run. The run cannot resume, so the spark lands in `error`; a
/// configuration edit brings it back to `configured`.
fn recover_interrupted_builds(snapshot: &mut Snapshot) -> bool {
    let mut recovered = false;
    for track in [TrackId::Alpha, TrackId::Bravo] {
        for stage in snapshot.track_mut(&track).iter_mut() {
            for spark in stage.sparks.iter_mut() {
                if spark.status == SparkStatus::Building {
                    warn!("Spark {} was mid-build at shutdown, marking it errored", spark.id);
                    spark.status = SparkStatus::Error;
                    spark.history.push(Message::system(
                        "Build interrupted by a restart. Edit the configuration to rebuild.",
                    ));
                    recovered = true;
                }
            }
        }
    }
    recovered
}

fn locate_in_track(stages: &[Stage], spark_id: &str) -> Option<(usize, usize)> {
    stages.iter().enumerate().find_map(|(si, stage)| {
        stage
            .sparks
            .iter()
            .position(|s| s.id == spark_id)
            .map(|pi| (si, pi))
    })
}

fn locate(snapshot: &Snapshot, spark_id: &str) -> Option<(TrackId, usize, usize)> {
    for track in [TrackId::Alpha, TrackId::Bravo] {
        if let Some((si, pi)) = locate_in_track(snapshot.track(&track), spark_id) {
            return Some((track, si, pi));
        }
    }
    None
}
