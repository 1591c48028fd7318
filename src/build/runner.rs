use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{Mutex, broadcast};
use tracing::{info, warn};

use crate::board::models::{BuildConfig, BuildStep, Spark, StepStatus, new_step_id};
use crate::board::store::BoardStore;
use crate::errors::BoardError;
use crate::registry::{Affinity, Agent, Registry};
use crate::server::ws::{BoardEvent, broadcast_event};

use super::plan::{build_plan, closing_message, failure_message, mirror_message, opening_message};

/// Pacing profile for the scripted sequence.
#[derive(Debug, Clone, Copy)]
pub enum Pacing {
    /// 800-1300 ms per step and a 500 ms beat before the closing message,
    /// purely to read like real work.
    Staged,
    /// No delays. Used by tests.
    Immediate,
}

impl Pacing {
    fn step_delay(&self, rng: &mut StdRng) -> Duration {
        match self {
            Pacing::Staged => Duration::from_millis(800 + rng.random_range(0..500u64)),
            Pacing::Immediate => Duration::ZERO,
        }
    }

    fn closing_delay(&self) -> Duration {
        match self {
            Pacing::Staged => Duration::from_millis(500),
            Pacing::Immediate => Duration::ZERO,
        }
    }
}

/// Drives scripted build runs to completion in the background.
///
/// One run per spark at a time: the running set refuses a second start
/// before the store's status check could see `building`. Steps execute in
/// a spawned task; progress reaches clients over the broadcast channel.
pub struct BuildRunner {
    store: Arc<BoardStore>,
    registry: Arc<Registry>,
    running: Mutex<HashSet<String>>,
    rng: Mutex<StdRng>,
    pacing: Pacing,
    /// Action whose step reports failure instead of executing, halting the
    /// run. Only settable from tests; production steps always succeed.
    fail_action: Option<String>,
}

impl BuildRunner {
    pub fn new(store: Arc<BoardStore>, registry: Arc<Registry>) -> Self {
        Self::with_rng(store, registry, StdRng::from_os_rng(), Pacing::Staged)
    }

    /// Seeded variant so tests pin actor assignment and skip delays.
    pub fn with_rng(
        store: Arc<BoardStore>,
        registry: Arc<Registry>,
        rng: StdRng,
        pacing: Pacing,
    ) -> Self {
        Self {
            store,
            registry,
            running: Mutex::new(HashSet::new()),
            rng: Mutex::new(rng),
            pacing,
            fail_action: None,
        }
    }

    #[cfg(test)]
    fn failing_at(mut self, action: &str) -> Self {
        self.fail_action = Some(action.to_string());
        self
    }

    /// Validate, mark the spark `building`, and spawn the scripted run.
    ///
    /// Returns the spark as announced: status `building`, build history
    /// cleared, opening system message appended. Steps stream over `tx`
    /// as they execute.
    pub async fn start(
        self: &Arc<Self>,
        spark_id: &str,
        tx: broadcast::Sender<String>,
    ) -> Result<Spark, BoardError> {
        {
            let mut running = self.running.lock().await;
            if !running.insert(spark_id.to_string()) {
                return Err(BoardError::BuildAlreadyRunning {
                    spark_id: spark_id.to_string(),
                });
            }
        }

        let spark = match self.announce(spark_id).await {
            Ok(spark) => spark,
            Err(e) => {
                self.running.lock().await.remove(spark_id);
                return Err(e);
            }
        };
        broadcast_event(
            &tx,
            &BoardEvent::BuildStarted {
                spark: spark.clone(),
            },
        );

        let runner = Arc::clone(self);
        let id = spark_id.to_string();
        let title = spark.title.clone();
        let config = spark.build_config.clone();
        tokio::spawn(async move {
            if let Err(e) = runner.run(&id, &title, &config, &tx).await {
                warn!("Build run for {} aborted: {e:#}", id);
            }
            runner.running.lock().await.remove(&id);
        });

        Ok(spark)
    }

    async fn announce(&self, spark_id: &str) -> Result<Spark, BoardError> {
        let spark = self.store.get_spark(spark_id).await?;
        let opening = opening_message(self.registry.coordinator(), &spark.title);
        self.store.mark_building(spark_id, opening).await
    }

    async fn run(
        &self,
        spark_id: &str,
        title: &str,
        config: &BuildConfig,
        tx: &broadcast::Sender<String>,
    ) -> Result<(), BoardError> {
        let steps = build_plan(config, self.registry.catalog());
        info!("Running {} build steps for {}", steps.len(), spark_id);

        for planned in steps {
            let (actor, delay) = {
                let mut rng = self.rng.lock().await;
                let actor = self.pick_actor(&planned.affinity, &mut rng);
                (actor, self.pacing.step_delay(&mut rng))
            };
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let failed = self.fail_action.as_deref() == Some(planned.action);
            let step = BuildStep {
                id: new_step_id(),
                action: planned.action.to_string(),
                details: planned.details.clone(),
                status: if failed {
                    StepStatus::Error
                } else {
                    StepStatus::Success
                },
                timestamp: chrono::Utc::now().to_rfc3339(),
                by: actor.name.clone(),
            };

            if failed {
                // A failed step ends the run; steps after it never execute.
                let mirror = failure_message(planned.action, &actor);
                self.store.fail_build(spark_id, step.clone(), mirror).await?;
                broadcast_event(
                    tx,
                    &BoardEvent::BuildStep {
                        spark_id: spark_id.to_string(),
                        step,
                    },
                );
                let spark = self.store.get_spark(spark_id).await?;
                broadcast_event(tx, &BoardEvent::BuildFinished { spark });
                return Ok(());
            }

            let mirror = mirror_message(planned.action, &actor, &planned.details);
            self.store
                .record_step(spark_id, step.clone(), mirror)
                .await?;
            broadcast_event(
                tx,
                &BoardEvent::BuildStep {
                    spark_id: spark_id.to_string(),
                    step,
                },
            );
        }

        let delay = self.pacing.closing_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.store
            .finish_build(spark_id, closing_message(title, config))
            .await?;

        let spark = self.store.get_spark(spark_id).await?;
        broadcast_event(tx, &BoardEvent::BuildFinished { spark });
        Ok(())
    }

    /// Uniform pick over the agents whose affinity matches the step's;
    /// the default persona covers the (roster-validated-away) empty case.
    fn pick_actor(&self, affinity: &Affinity, rng: &mut StdRng) -> Agent {
        let candidates = self.registry.candidates_for(affinity);
        if candidates.is_empty() {
            return self.registry.default_agent().clone();
        }
        candidates[rng.random_range(0..candidates.len())].clone()
    }
}
