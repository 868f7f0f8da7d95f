//! The three phases of a run. Each one reads what it needs from the run,
//! calls the crew without holding the run lock, and writes results back.

use chrono::NaiveDate;
use contentcrew_agent::{ArticleSpec, BriefInput, Crew, ProductionInput, ResearchInput};
use contentcrew_core::content::{Article, ContentBrief};
use contentcrew_core::error::{Error, PipelineError};
use contentcrew_core::layout::dated_name;
use tracing::{debug, info};

use crate::index;
use crate::run::{PipelineRun, RunPhase};
use crate::state::load_topic_map;

/// A unit of work between two checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Research,
    Briefs,
    Production,
}

impl Phase {
    pub fn number(self) -> u8 {
        match self {
            Self::Research => 1,
            Self::Briefs => 2,
            Self::Production => 3,
        }
    }

    pub fn running(self) -> RunPhase {
        match self {
            Self::Research => RunPhase::Phase1Running,
            Self::Briefs => RunPhase::Phase2Running,
            Self::Production => RunPhase::Phase3Running,
        }
    }

    /// The phase a run must be in for this phase to start.
    pub fn entry(self) -> RunPhase {
        match self {
            Self::Research => RunPhase::Setup,
            Self::Briefs => RunPhase::Phase1Review,
            Self::Production => RunPhase::Phase2Review,
        }
    }

    /// The phase that follows the checkpoint `phase`, if it is one.
    pub fn after(phase: RunPhase) -> Option<Self> {
        match phase {
            RunPhase::Phase1Review => Some(Self::Briefs),
            RunPhase::Phase2Review => Some(Self::Production),
            _ => None,
        }
    }

    pub(crate) fn opening_task(self) -> &'static str {
        match self {
            Self::Research => "SEO research & topic map generation",
            Self::Briefs => "Generating content briefs",
            Self::Production => "Writing articles",
        }
    }

    pub(crate) fn opening_percent(self) -> u8 {
        match self {
            Self::Research => 5,
            Self::Briefs | Self::Production => 0,
        }
    }

    pub(crate) async fn execute(self, run: &PipelineRun, crew: &Crew, date: NaiveDate) -> Result<(), Error> {
        match self {
            Self::Research => research(run, crew, date).await,
            Self::Briefs => briefs(run, crew, date).await,
            Self::Production => production(run, crew, date).await,
        }
    }
}

async fn research(run: &PipelineRun, crew: &Crew, date: NaiveDate) -> Result<(), Error> {
    let log = run.log();
    log.info("System", "Phase 1 started: Research & Topic Map Generation");

    let (client, seed, path) = run
        .update(|r| {
            r.progress.percent = 10;
            r.state.current_phase = 1;
            let path = r.state.layout.topic_map_path(&r.state.seed_topic, date);
            (r.state.client.clone(), r.state.seed_topic.clone(), path)
        })
        .await;

    let output = crew
        .research(
            &ResearchInput {
                client: &client,
                seed_topic: &seed,
                topic_map_path: &path,
                date,
            },
            log,
        )
        .await?;

    let loaded = match tokio::fs::try_exists(&path).await {
        Ok(true) => Some(load_topic_map(&path).await),
        _ => {
            log.warning(
                "System",
                format!("No topic map was saved at {}", path.display()),
            );
            None
        }
    };

    let topics = run
        .update(|r| {
            r.state.topic_map_path = Some(path.clone());
            r.state.topic_map_summary = output.summary;
            if let Some(loaded) = loaded {
                match r.state.apply_topic_map(loaded) {
                    Ok(n) => log.info("System", format!("Parsed {n} topics from CSV")),
                    Err(e) => log.error("System", format!("Could not parse topic map CSV: {e}")),
                }
            }
            r.state.topic_entries.len()
        })
        .await;

    info!(run_id = run.id(), topics, "Research finished");
    log.success("System", format!("Phase 1 complete — {topics} topics generated"));
    run.reach(RunPhase::Phase1Review, |r| {
        r.progress.percent = 100;
        r.progress.current_task = "Topic map ready for review".into();
        r.progress.topics_total = topics;
    })
    .await;
    Ok(())
}

async fn briefs(run: &PipelineRun, crew: &Crew, date: NaiveDate) -> Result<(), Error> {
    let log = run.log();
    log.info("System", "Phase 2 started: Content Brief Generation");

    let (client, topics, layout) = run
        .update(|r| {
            r.state.current_phase = 2;
            let topics: Vec<_> = r.state.topics_by_priority().into_iter().cloned().collect();
            r.progress.topics_total = topics.len();
            (r.state.client.clone(), topics, r.state.layout.clone())
        })
        .await;
    if topics.is_empty() {
        return Err(PipelineError::NoTopics.into());
    }

    let total = topics.len();
    for (n, entry) in topics.iter().enumerate() {
        let i = n + 1;
        let topic = &entry.topic_name;
        log.info("Brief Agent", format!("[{i}/{total}] Creating brief: {topic}"));
        run.update(|r| r.progress.current_task = format!("Brief {i}/{total}: {topic}"))
            .await;

        let path = layout.brief_path(topic, date);
        crew.brief(
            &BriefInput {
                client: &client,
                entry,
                output_path: &path,
            },
            log,
        )
        .await?;

        let brief = ContentBrief::for_entry(entry, dated_name(topic, date, "md"));
        run.update(|r| {
            r.state.briefs.push(brief);
            r.progress.advance(i, total);
        })
        .await;
        log.success("Brief Agent", format!("✅ Brief done: {topic}"));
    }

    let index_path = layout.brief_index_path(date);
    let text = run.read(|r| index::brief_index(&r.state, date)).await;
    tokio::fs::write(&index_path, text).await?;
    debug!(path = %index_path.display(), "Brief index written");

    let count = run
        .update(|r| {
            r.state.brief_index_path = Some(index_path);
            r.state.briefs.len()
        })
        .await;
    log.success("System", format!("Phase 2 complete — {count} briefs generated"));
    run.reach(RunPhase::Phase2Review, |r| {
        r.progress.percent = 100;
        r.progress.current_task = "Briefs ready for review".into();
    })
    .await;
    Ok(())
}

async fn production(run: &PipelineRun, crew: &Crew, date: NaiveDate) -> Result<(), Error> {
    let log = run.log();
    log.info("System", "Phase 3 started: Content Production & QA");

    let (client, briefs, layout) = run
        .update(|r| {
            r.state.current_phase = 3;
            let briefs: Vec<_> = r.state.briefs_by_priority().into_iter().cloned().collect();
            r.progress.topics_total = briefs.len();
            (r.state.client.clone(), briefs, r.state.layout.clone())
        })
        .await;

    let total = briefs.len();
    for (n, brief) in briefs.iter().enumerate() {
        let i = n + 1;
        let topic = &brief.topic_name;
        log.info("Production Agent", format!("[{i}/{total}] Writing: {topic}"));
        run.update(|r| r.progress.current_task = format!("Article {i}/{total}: {topic}"))
            .await;

        let brief_path = layout.briefs_dir().join(&brief.filename);
        let brief_body = match tokio::fs::read_to_string(&brief_path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                format!("Brief for {topic} (file not found)")
            }
            Err(e) => return Err(e.into()),
        };
        let entry = run.read(|r| r.state.topic_entry(topic).cloned()).await;

        let article_path = layout.article_path(topic, date);
        let outcome = crew
            .produce(
                &ProductionInput {
                    client: &client,
                    spec: ArticleSpec::new(brief, entry.as_ref()),
                    brief_body: &brief_body,
                    output_path: &article_path,
                    date,
                },
                log,
            )
            .await?;

        // The reviewer saves the article; fall back to its last reply.
        let saved = tokio::fs::read_to_string(&article_path)
            .await
            .unwrap_or_else(|_| outcome.text.clone());
        let mut article = Article::new(topic.as_str(), dated_name(topic, date, "md"), &saved);
        article.record_qa(outcome.passed, outcome.attempts, &outcome.text);

        let mark = if outcome.passed { "✅" } else { "⚠️" };
        let line = format!(
            "{mark} {topic} — {} (Attempts: {})",
            article.qa_status, article.qa_attempts
        );
        run.update(|r| {
            r.state.articles.push(article);
            r.progress.advance(i, total);
        })
        .await;
        if outcome.passed {
            log.success("Production Agent", line);
        } else {
            log.warning("Production Agent", line);
        }
    }

    let index_path = layout.production_index_path(date);
    let max_attempts = crew.qa().max_attempts();
    let text = run
        .read(|r| index::production_index(&r.state, date, max_attempts))
        .await;
    tokio::fs::write(&index_path, text).await?;
    debug!(path = %index_path.display(), "Production index written");

    let summary = run
        .update(|r| {
            r.state.production_index_path = Some(index_path);
            r.state.summary()
        })
        .await;
    info!(
        run_id = run.id(),
        total = summary.total,
        passed = summary.passed,
        flagged = summary.flagged,
        "Pipeline complete"
    );
    log.success(
        "System",
        format!(
            "🎉 Pipeline complete — {} passed, {} flagged",
            summary.passed, summary.flagged
        ),
    );
    run.reach(RunPhase::Complete, |r| {
        r.progress.percent = 100;
        r.progress.current_task = "Production complete".into();
    })
    .await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoints_lead_to_the_next_phase() {
        assert_eq!(Phase::after(RunPhase::Phase1Review), Some(Phase::Briefs));
        assert_eq!(Phase::after(RunPhase::Phase2Review), Some(Phase::Production));
        assert_eq!(Phase::after(RunPhase::Phase1Running), None);
        assert_eq!(Phase::after(RunPhase::Complete), None);
    }

    #[test]
    fn every_phase_starts_from_its_entry() {
        for phase in [Phase::Research, Phase::Briefs, Phase::Production] {
            assert_ne!(phase.entry(), phase.running());
            if phase != Phase::Research {
                assert_eq!(Phase::after(phase.entry()), Some(phase));
            }
        }
        assert_eq!(Phase::Research.opening_percent(), 5);
        assert_eq!(Phase::Production.number(), 3);
    }
}
