//! One pipeline run: its phase, progress, state and log stream.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use contentcrew_core::content::ClientContext;
use contentcrew_core::error::PipelineError;
use contentcrew_core::event::RunLog;
use contentcrew_core::layout::OutputLayout;
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, watch};
use tracing::error;

use crate::state::PipelineState;

pub const TOTAL_PHASES: u8 = 3;

/// Where a run is in its lifecycle. `*Review` phases wait for approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Setup,
    Phase1Running,
    Phase1Review,
    Phase2Running,
    Phase2Review,
    Phase3Running,
    Complete,
    Error,
}

impl RunPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Phase1Running => "phase1_running",
            Self::Phase1Review => "phase1_review",
            Self::Phase2Running => "phase2_running",
            Self::Phase2Review => "phase2_review",
            Self::Phase3Running => "phase3_running",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    pub fn is_checkpoint(self) -> bool {
        matches!(self, Self::Phase1Review | Self::Phase2Review)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub phase: u8,
    pub total_phases: u8,
    pub current_task: String,
    pub percent: u8,
    pub topics_total: usize,
    pub topics_done: usize,
}

impl Progress {
    fn new() -> Self {
        Self {
            total_phases: TOTAL_PHASES,
            ..Self::default()
        }
    }

    /// Mark item `done` of `total` finished.
    pub fn advance(&mut self, done: usize, total: usize) {
        self.topics_done = done;
        self.percent = if total == 0 {
            100
        } else {
            (done * 100 / total).min(100) as u8
        };
    }
}

/// What the registry lists for each run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub client_name: String,
    pub seed_topic: String,
    pub phase: RunPhase,
    pub progress: Progress,
    pub created_at: DateTime<Utc>,
    pub error: Option<String>,
    pub topic_count: usize,
    pub brief_count: usize,
    pub article_count: usize,
}

/// Summary plus the full state, for a single-run view.
#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    #[serde(flatten)]
    pub summary: RunSummary,
    pub state: PipelineState,
}

/// Mutable part of a run. Only the phase tasks and the registry write it.
#[derive(Debug)]
pub(crate) struct RunRecord {
    pub(crate) progress: Progress,
    pub(crate) error: Option<String>,
    pub(crate) state: PipelineState,
}

pub struct PipelineRun {
    id: String,
    created_at: DateTime<Utc>,
    log: Arc<RunLog>,
    record: RwLock<RunRecord>,
    phase: watch::Sender<RunPhase>,
}

impl PipelineRun {
    pub fn new(id: impl Into<String>, client: ClientContext, seed_topic: impl Into<String>, layout: OutputLayout) -> Self {
        let (phase, _) = watch::channel(RunPhase::Setup);
        Self {
            id: id.into(),
            created_at: Utc::now(),
            log: Arc::new(RunLog::default()),
            record: RwLock::new(RunRecord {
                progress: Progress::new(),
                error: None,
                state: PipelineState::new(client, seed_topic, layout),
            }),
            phase,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn log(&self) -> &Arc<RunLog> {
        &self.log
    }

    pub fn phase(&self) -> RunPhase {
        *self.phase.borrow()
    }

    /// Follow phase changes, e.g. to wait for a checkpoint.
    pub fn watch_phase(&self) -> watch::Receiver<RunPhase> {
        self.phase.subscribe()
    }

    /// Wait until the run stops at a checkpoint or finishes.
    pub async fn settled(&self) -> RunPhase {
        let mut phases = self.phase.subscribe();
        match phases
            .wait_for(|p| p.is_checkpoint() || p.is_terminal())
            .await
        {
            Ok(phase) => *phase,
            Err(_) => self.phase(),
        }
    }

    pub async fn state(&self) -> PipelineState {
        self.record.read().await.state.clone()
    }

    pub async fn progress(&self) -> Progress {
        self.record.read().await.progress.clone()
    }

    pub async fn error(&self) -> Option<String> {
        self.record.read().await.error.clone()
    }

    pub async fn summary(&self) -> RunSummary {
        let record = self.record.read().await;
        self.summarize(&record)
    }

    pub async fn snapshot(&self) -> RunSnapshot {
        let record = self.record.read().await;
        RunSnapshot {
            summary: self.summarize(&record),
            state: record.state.clone(),
        }
    }

    fn summarize(&self, record: &RunRecord) -> RunSummary {
        RunSummary {
            run_id: self.id.clone(),
            client_name: record.state.client.client_name.clone(),
            seed_topic: record.state.seed_topic.clone(),
            phase: self.phase(),
            progress: record.progress.clone(),
            created_at: self.created_at,
            error: record.error.clone(),
            topic_count: record.state.topic_entries.len(),
            brief_count: record.state.briefs.len(),
            article_count: record.state.articles.len(),
        }
    }

    pub(crate) async fn read<R>(&self, f: impl FnOnce(&RunRecord) -> R) -> R {
        f(&*self.record.read().await)
    }

    pub(crate) async fn update<R>(&self, f: impl FnOnce(&mut RunRecord) -> R) -> R {
        f(&mut *self.record.write().await)
    }

    /// Move from `from` to `to`, applying `f` under the same lock. Fails
    /// with the phase actually found when it is not `from`.
    pub(crate) async fn transition(
        &self,
        from: RunPhase,
        to: RunPhase,
        f: impl FnOnce(&mut RunRecord),
    ) -> Result<(), RunPhase> {
        let mut record = self.record.write().await;
        let current = self.phase();
        if current != from {
            return Err(current);
        }
        f(&mut record);
        self.phase.send_replace(to);
        Ok(())
    }

    /// Publish a phase reached by the task that owns the run.
    pub(crate) async fn reach(&self, to: RunPhase, f: impl FnOnce(&mut RunRecord)) {
        let mut record = self.record.write().await;
        f(&mut record);
        self.phase.send_replace(to);
    }

    /// Terminal failure of phase `phase`.
    pub(crate) async fn fail(&self, phase: u8, message: String) {
        error!(run_id = %self.id, phase, error = %message, "Phase failed");
        let failure = PipelineError::Phase {
            phase,
            message: message.clone(),
        };
        self.log.error("System", failure.to_string());
        self.reach(RunPhase::Error, |record| record.error = Some(message))
            .await;
    }
}

impl fmt::Debug for PipelineRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineRun")
            .field("id", &self.id)
            .field("phase", &self.phase())
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> PipelineRun {
        let client = ClientContext {
            client_name: "Bean Co".into(),
            ..ClientContext::default()
        };
        PipelineRun::new("ab12cd34", client, "espresso", OutputLayout::new("/out/run-ab12cd34"))
    }

    #[test]
    fn phases_serialize_snake_case() {
        assert_eq!(serde_json::to_value(RunPhase::Phase1Review).unwrap(), "phase1_review");
        assert_eq!(serde_json::to_value(RunPhase::Complete).unwrap(), "complete");
        assert_eq!(RunPhase::Phase3Running.to_string(), "phase3_running");
        let parsed: RunPhase = serde_json::from_str("\"phase2_running\"").unwrap();
        assert_eq!(parsed, RunPhase::Phase2Running);
    }

    #[test]
    fn checkpoints_and_terminals() {
        assert!(RunPhase::Phase1Review.is_checkpoint());
        assert!(!RunPhase::Phase3Running.is_checkpoint());
        assert!(RunPhase::Error.is_terminal());
        assert!(!RunPhase::Phase2Review.is_terminal());
    }

    #[test]
    fn progress_percent_is_integer_share() {
        let mut p = Progress::new();
        p.advance(1, 3);
        assert_eq!((p.topics_done, p.percent), (1, 33));
        p.advance(3, 3);
        assert_eq!(p.percent, 100);
        assert_eq!(p.total_phases, 3);
    }

    #[tokio::test]
    async fn new_run_summary() {
        let run = run();
        let summary = run.summary().await;
        assert_eq!(summary.run_id, "ab12cd34");
        assert_eq!(summary.client_name, "Bean Co");
        assert_eq!(summary.phase, RunPhase::Setup);
        assert_eq!(summary.topic_count, 0);
        assert!(summary.error.is_none());

        let json = serde_json::to_value(run.snapshot().await).unwrap();
        assert_eq!(json["run_id"], "ab12cd34");
        assert_eq!(json["phase"], "setup");
        assert_eq!(json["progress"]["total_phases"], 3);
        assert_eq!(json["state"]["seed_topic"], "espresso");
    }

    #[tokio::test]
    async fn transition_checks_current_phase() {
        let run = run();
        let mut phases = run.watch_phase();

        run.transition(RunPhase::Setup, RunPhase::Phase1Running, |r| r.progress.phase = 1)
            .await
            .unwrap();
        assert!(phases.has_changed().unwrap());
        assert_eq!(*phases.borrow_and_update(), RunPhase::Phase1Running);
        assert_eq!(run.progress().await.phase, 1);

        let found = run
            .transition(RunPhase::Phase1Review, RunPhase::Phase2Running, |_| {})
            .await
            .unwrap_err();
        assert_eq!(found, RunPhase::Phase1Running);
    }

    #[tokio::test]
    async fn fail_records_message_and_logs() {
        let run = run();
        run.fail(2, "API request failed".into()).await;

        assert_eq!(run.phase(), RunPhase::Error);
        assert_eq!(run.error().await.as_deref(), Some("API request failed"));
        let events = run.log().since(0);
        assert_eq!(events.last().unwrap().message, "Phase 2 error: API request failed");
    }
}
