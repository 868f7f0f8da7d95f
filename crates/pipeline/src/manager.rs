//! Registry of pipeline runs.
//!
//! Runs live in memory behind one lock. Each phase executes on its own
//! tokio task, so callers only ever wait on the registry lock, never on a
//! model call.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use contentcrew_agent::{Crew, QaController, ToolLoop};
use contentcrew_config::AppConfig;
use contentcrew_core::content::{ClientContext, TopicMapEntry};
use contentcrew_core::error::{Error, PipelineError};
use contentcrew_core::event::RunLog;
use contentcrew_core::layout::OutputLayout;
use contentcrew_core::provider::Provider;
use contentcrew_tools::Toolkit;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::phases::Phase;
use crate::run::{PipelineRun, RunPhase, RunRecord, RunSummary};
use crate::state::load_topic_map;

#[derive(Clone)]
pub struct RunManager {
    runs: Arc<RwLock<HashMap<String, Arc<PipelineRun>>>>,
    crew: Crew,
    output_dir: PathBuf,
}

impl RunManager {
    pub fn new(crew: Crew, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            runs: Arc::new(RwLock::new(HashMap::new())),
            crew,
            output_dir: output_dir.into(),
        }
    }

    /// Wire a crew from configuration around an already-built provider.
    pub fn from_config(config: &AppConfig, provider: Arc<dyn Provider>) -> Result<Self, Error> {
        let agent = ToolLoop::new(provider, config.model.clone())
            .with_max_tokens(config.max_tokens)
            .with_max_rounds(config.agent.max_tool_rounds);
        let qa = QaController::new(config.agent.max_qa_attempts)?
            .with_policy(config.agent.pass_marker.into());
        let toolkit = Toolkit::new(&config.search, &config.output_dir);
        Ok(Self::new(Crew::new(agent, toolkit, qa), &config.output_dir))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Register a run and start its research phase.
    pub async fn create(
        &self,
        client: ClientContext,
        seed_topic: impl Into<String>,
    ) -> Result<Arc<PipelineRun>, Error> {
        let id = new_run_id();
        let layout = OutputLayout::for_run(&self.output_dir, &id);
        layout.ensure_dirs()?;

        let seed_topic = seed_topic.into();
        info!(run_id = %id, client = %client.client_name, seed = %seed_topic, "Run created");
        let run = Arc::new(PipelineRun::new(id.clone(), client, seed_topic, layout));
        self.runs.write().await.insert(id, run.clone());

        self.start(&run, Phase::Research).await?;
        Ok(run)
    }

    pub async fn get(&self, run_id: &str) -> Option<Arc<PipelineRun>> {
        self.runs.read().await.get(run_id).cloned()
    }

    pub async fn require(&self, run_id: &str) -> Result<Arc<PipelineRun>, PipelineError> {
        self.get(run_id)
            .await
            .ok_or_else(|| PipelineError::RunNotFound(run_id.to_string()))
    }

    /// Summaries of every run, oldest first.
    pub async fn list(&self) -> Vec<RunSummary> {
        let runs: Vec<_> = self.runs.read().await.values().cloned().collect();
        let mut summaries = Vec::with_capacity(runs.len());
        for run in runs {
            summaries.push(run.summary().await);
        }
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.run_id.cmp(&b.run_id)));
        summaries
    }

    /// Pass the checkpoint the run is waiting at and start the next phase.
    /// Returns the phase the run moved into.
    pub async fn approve(&self, run_id: &str) -> Result<RunPhase, PipelineError> {
        let run = self.require(run_id).await?;
        let current = run.phase();
        let next = Phase::after(current).ok_or_else(|| not_at_checkpoint(&run, current))?;
        info!(run_id, from = %current, "Checkpoint approved");
        self.start(&run, next).await?;
        Ok(next.running())
    }

    /// Re-read a hand-edited topic map while the run waits for approval.
    pub async fn reload_topic_map(&self, run_id: &str) -> Result<usize, Error> {
        let run = self.require(run_id).await?;
        let phase = run.phase();
        if phase != RunPhase::Phase1Review {
            return Err(not_at_checkpoint(&run, phase).into());
        }
        let loaded = read_topic_map(&run)
            .await
            .ok_or(Error::Pipeline(PipelineError::NoTopicMap))?;

        let log = run.log().clone();
        run.update(|r| {
            let phase = run.phase();
            if phase != RunPhase::Phase1Review {
                return Err(not_at_checkpoint(&run, phase).into());
            }
            apply_topic_map(r, &log, loaded)
        })
        .await
    }

    async fn start(&self, run: &Arc<PipelineRun>, phase: Phase) -> Result<(), PipelineError> {
        // Approval picks up edits made to the map during review.
        let edited = match phase {
            Phase::Briefs => read_topic_map(run).await,
            _ => None,
        };
        let log = run.log().clone();
        run.transition(phase.entry(), phase.running(), |r| {
            if let Some(loaded) = edited {
                let _ = apply_topic_map(r, &log, loaded);
            }
            r.progress.phase = phase.number();
            r.progress.current_task = phase.opening_task().to_string();
            r.progress.percent = phase.opening_percent();
            r.progress.topics_done = 0;
        })
        .await
        .map_err(|found| not_at_checkpoint(run, found))?;

        let run = run.clone();
        let crew = self.crew.clone();
        tokio::spawn(async move {
            let task_run = run.clone();
            let task = tokio::spawn(async move {
                let date = Local::now().date_naive();
                phase.execute(&task_run, &crew, date).await
            });
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => run.fail(phase.number(), failure_message(&e)).await,
                Err(e) if e.is_panic() => {
                    let message = format!("Phase task panicked: {}", panic_message(e.into_panic()));
                    run.fail(phase.number(), message).await;
                }
                Err(e) => run.fail(phase.number(), format!("Phase task was cancelled: {e}")).await,
            }
        });
        Ok(())
    }
}

impl std::fmt::Debug for RunManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunManager")
            .field("output_dir", &self.output_dir)
            .field("crew", &self.crew)
            .finish()
    }
}

/// First 8 characters of a v4 UUID.
fn new_run_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn not_at_checkpoint(run: &PipelineRun, phase: RunPhase) -> PipelineError {
    PipelineError::NotAtCheckpoint {
        run_id: run.id().to_string(),
        phase: phase.to_string(),
    }
}

/// Read the run's topic map outside the run lock. `None` when no map has
/// been written yet.
async fn read_topic_map(run: &PipelineRun) -> Option<Result<Vec<TopicMapEntry>, Error>> {
    let path = run.read(|r| r.state.topic_map_path.clone()).await?;
    Some(load_topic_map(&path).await)
}

/// Swap a loaded map into the record. Failures are logged and leave the
/// current entries in place.
fn apply_topic_map(
    record: &mut RunRecord,
    log: &RunLog,
    loaded: Result<Vec<TopicMapEntry>, Error>,
) -> Result<usize, Error> {
    let result = record.state.apply_topic_map(loaded);
    match &result {
        Ok(n) => {
            record.progress.topics_total = *n;
            log.info("System", format!("Parsed {n} topics from CSV"));
        }
        Err(e) => {
            warn!(error = %e, "Topic map reload failed");
            log.error("System", format!("Could not parse topic map CSV: {e}"));
        }
    }
    result
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown cause".to_string()),
    }
}

/// Operator-facing text for a phase failure, without the error-kind prefix.
fn failure_message(error: &Error) -> String {
    match error {
        Error::Provider(e) => e.to_string(),
        Error::Pipeline(e) => e.to_string(),
        Error::Tool(e) => e.to_string(),
        other => other.to_string(),
    }
}
