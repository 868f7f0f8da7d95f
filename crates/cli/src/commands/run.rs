//! `contentcrew run`: the whole pipeline in the terminal, with a prompt at
//! each checkpoint.

use std::io::{self, Write};

use contentcrew_core::content::{ClientContext, TopicLevel};
use contentcrew_core::event::LogEvent;
use contentcrew_pipeline::{PipelineRun, PipelineState, RunManager, RunPhase, final_report};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::broadcast::error::RecvError;

const RULE: &str = "============================================================";

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (config, provider) = super::setup()?;
    let mut prompter = Prompter::new(BufReader::new(tokio::io::stdin()));

    banner("CONTENT CREATION PIPELINE — Phase 0: Client Context");
    println!("\nBefore we begin, I need some information about your client.\n");
    let (client, seed_topic) = collect_client_context(&mut prompter).await?;

    let manager = RunManager::from_config(&config, provider)?;
    println!("\n🚀 Starting Content Creation Pipeline...");
    let run = manager.create(client, seed_topic).await?;

    let state = run.state().await;
    println!("\n✅ Client context saved for: {}", state.client.client_name);
    println!("📋 Seed topic: {}", state.seed_topic);
    println!("📁 Output directory: {}\n", state.layout.root().display());

    drive(&manager, &run, &mut prompter).await
}

/// Follow the run to the end, asking for approval at each checkpoint.
async fn drive<R: AsyncBufRead + Unpin>(
    manager: &RunManager,
    run: &PipelineRun,
    prompter: &mut Prompter<R>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut cursor = 0;
    loop {
        match follow(run, &mut cursor).await {
            RunPhase::Phase1Review => {
                banner("✅ PHASE 1 COMPLETE — Topic Map Generated");
                println!("{}", topic_map_review(&run.state().await));
                prompter
                    .wait_for_proceed(
                        "Ready for Phase 2 (Content Briefs)? Or would you like to edit anything first?",
                        "Please make your edits to the CSV and type 'proceed' when ready.",
                    )
                    .await?;
                manager.approve(run.id()).await?;
            }
            RunPhase::Phase2Review => {
                banner("✅ PHASE 2 COMPLETE — Content Briefs Generated");
                println!("{}", brief_review(&run.state().await));
                prompter
                    .wait_for_proceed(
                        "Ready for Phase 3 (Content Production)? Or would you like to edit anything first?",
                        "Please make your edits and type 'proceed' when ready.",
                    )
                    .await?;
                manager.approve(run.id()).await?;
            }
            RunPhase::Complete => {
                banner("🏁 PIPELINE COMPLETE");
                println!("\n{}", final_report(&run.state().await));
                return Ok(());
            }
            RunPhase::Error => {
                let message = run.error().await.unwrap_or_default();
                return Err(format!("Pipeline failed: {message}").into());
            }
            other => return Err(format!("Run stopped unexpectedly in phase {other}").into()),
        }
    }
}

/// Print log events as they arrive until the run settles, then flush the
/// rest so nothing is missed before a prompt.
async fn follow(run: &PipelineRun, cursor: &mut u64) -> RunPhase {
    let log = run.log();
    let mut events = log.subscribe();
    print_since(run, cursor);

    let phase = loop {
        tokio::select! {
            phase = run.settled() => break phase,
            event = events.recv() => match event {
                Ok(event) if event.seq >= *cursor => {
                    print_event(&event);
                    *cursor = event.seq + 1;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(_)) => print_since(run, cursor),
                Err(RecvError::Closed) => break run.settled().await,
            },
        }
    };
    print_since(run, cursor);
    phase
}

fn print_since(run: &PipelineRun, cursor: &mut u64) {
    for event in run.log().since(*cursor) {
        print_event(&event);
        *cursor = event.seq + 1;
    }
}

fn print_event(event: &LogEvent) {
    println!("  {} [{}] {}", event.time, event.source, event.message);
}

fn banner(title: &str) {
    println!("\n{RULE}");
    println!("  {title}");
    println!("{RULE}");
}

fn topic_map_review(state: &PipelineState) -> String {
    let mut lines = Vec::new();
    if let Some(path) = &state.topic_map_path {
        lines.push(format!("\n📄 Topic map saved to: {}", path.display()));
    }
    lines.push(format!("\n📊 Summary:\n{}", state.topic_map_summary));

    if !state.topic_entries.is_empty() {
        let count = |level: TopicLevel| {
            state
                .topic_entries
                .iter()
                .filter(|t| t.topic_level == level)
                .count()
        };
        lines.push(format!(
            "\n   Pillars: {} | Clusters: {} | Supporting: {}",
            count(TopicLevel::Pillar),
            count(TopicLevel::Cluster),
            count(TopicLevel::Supporting),
        ));
        lines.push(format!("   Total topics: {}", state.topic_entries.len()));
    }
    lines.push(format!("\n{}", "-".repeat(60)));
    lines.join("\n")
}

fn brief_review(state: &PipelineState) -> String {
    let mut lines = vec![format!("\n📄 Briefs generated: {}", state.briefs.len())];
    if let Some(path) = &state.brief_index_path {
        lines.push(format!("📋 Brief index: {}", path.display()));
    }
    lines.push("\nBriefs by priority:".to_string());
    for brief in state.briefs_by_priority() {
        lines.push(format!(
            "   [{}] {} ({}, {}-{} words)",
            brief.priority_score,
            brief.topic_name,
            brief.content_type,
            brief.word_count_min,
            brief.word_count_max,
        ));
    }
    lines.push(format!("\n{}", "-".repeat(60)));
    lines.join("\n")
}

async fn collect_client_context<R: AsyncBufRead + Unpin>(
    prompter: &mut Prompter<R>,
) -> io::Result<(ClientContext, String)> {
    let client = ClientContext {
        client_name: prompter.ask_required("Client name: ").await?,
        business_summary: prompter
            .ask_required("Business summary (what they do, who they serve): ")
            .await?,
        brand_voice: prompter
            .ask("Brand voice (e.g., authoritative, friendly, technical): ")
            .await?,
        brand_tone: prompter
            .ask("Brand tone (e.g., professional, conversational, encouraging): ")
            .await?,
        style_preferences: prompter
            .ask("Style preferences (e.g., data-driven, storytelling, concise): ")
            .await?,
        industry: prompter.ask_required("Industry: ").await?,
        competitive_landscape: prompter
            .ask("Competitive landscape (key competitors, optional): ")
            .await?,
    };
    let seed_topic = prompter
        .ask_required("\nSeed topic for the content strategy: ")
        .await?;
    Ok((client, seed_topic))
}

/// Line-based prompts over any buffered reader.
pub struct Prompter<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> Prompter<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    pub async fn ask(&mut self, prompt: &str) -> io::Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;
        match self.lines.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed")),
        }
    }

    pub async fn ask_required(&mut self, prompt: &str) -> io::Result<String> {
        loop {
            let answer = self.ask(prompt).await?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            println!("   This field is required.");
        }
    }

    /// Block until the operator types `proceed`. Anything else is echoed
    /// back as a note.
    pub async fn wait_for_proceed(&mut self, question: &str, hint: &str) -> io::Result<()> {
        let prompt = format!("\n{question}\nType 'proceed' to continue, or describe what you'd like to change: ");
        let response = self.ask(&prompt).await?.to_lowercase();
        if response == "proceed" {
            return Ok(());
        }
        println!("\n📝 Noted: {response}");
        println!("{hint}");
        loop {
            let response = self
                .ask("\nType 'proceed' when ready to continue: ")
                .await?
                .to_lowercase();
            if response == "proceed" {
                return Ok(());
            }
            println!("📝 Noted: {response}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contentcrew_core::content::{ContentBrief, TopicMapEntry};
    use contentcrew_core::layout::OutputLayout;

    fn prompter(input: &'static str) -> Prompter<&'static [u8]> {
        Prompter::new(input.as_bytes())
    }

    #[tokio::test]
    async fn collects_context_and_reasks_required_fields() {
        let mut p = prompter("\nBean Co\nRoaster\nwarm\n\n\nCoffee\n\n  espresso  \n");
        let (client, seed) = collect_client_context(&mut p).await.unwrap();
        assert_eq!(client.client_name, "Bean Co");
        assert_eq!(client.business_summary, "Roaster");
        assert_eq!(client.brand_voice, "warm");
        assert_eq!(client.brand_tone, "");
        assert_eq!(client.industry, "Coffee");
        assert_eq!(seed, "espresso");
    }

    #[tokio::test]
    async fn proceed_after_notes() {
        let mut p = prompter("add grinders\nnot yet\nPROCEED\nleftover\n");
        p.wait_for_proceed("Ready?", "Edit then proceed").await.unwrap();
        assert_eq!(p.ask("next: ").await.unwrap(), "leftover");
    }

    #[tokio::test]
    async fn closed_input_is_an_error() {
        let mut p = prompter("maybe\n");
        let err = p.wait_for_proceed("Ready?", "hint").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn reviews_summarize_state() {
        let mut state = PipelineState::new(ClientContext::default(), "espresso", OutputLayout::new("/out"));
        state.topic_map_summary = "Three clusters.".into();
        let mut pillar = TopicMapEntry::new("Espresso Guide");
        pillar.topic_level = TopicLevel::Pillar;
        pillar.priority_score = 10;
        let support = TopicMapEntry::new("Tampers");
        state.topic_entries = vec![support.clone(), pillar.clone()];

        let text = topic_map_review(&state);
        assert!(text.contains("Three clusters."));
        assert!(text.contains("Pillars: 1 | Clusters: 0 | Supporting: 1"));
        assert!(text.contains("Total topics: 2"));

        state.briefs = vec![
            ContentBrief::for_entry(&support, "Tampers.md"),
            ContentBrief::for_entry(&pillar, "Espresso Guide.md"),
        ];
        let text = brief_review(&state);
        let guide = text.find("[10] Espresso Guide").unwrap();
        let tampers = text.find("Tampers (").unwrap();
        assert!(guide < tampers);
    }
}
