//! `contentcrew plot`: Write the pipeline flow as a Mermaid diagram in a
//! standalone HTML page.

use std::path::PathBuf;

use contentcrew_config::AppConfig;

pub async fn run(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let html = render_html(&flow_diagram(&config));
    tokio::fs::write(&output, html).await?;
    println!("📊 Flow visualization saved as '{}'", output.display());

    Ok(())
}

/// Mermaid flowchart of the run lifecycle.
pub fn flow_diagram(config: &AppConfig) -> String {
    let qa = config.agent.max_qa_attempts;
    let rounds = config.agent.max_tool_rounds;
    [
        "flowchart TD".to_string(),
        "    setup([Client context + seed topic]) --> p1".to_string(),
        format!(
            "    p1[Phase 1: Research & Topic Map<br/>web search, up to {rounds} tool rounds] --> map[(Topic map CSV)]"
        ),
        "    map --> r1{Review topic map}".to_string(),
        "    r1 -- edit CSV --> r1".to_string(),
        "    r1 -- proceed --> p2[Phase 2: Content Briefs<br/>one per topic, highest priority first]".to_string(),
        "    p2 --> briefs[(Briefs + Brief Index)]".to_string(),
        "    briefs --> r2{Review briefs}".to_string(),
        "    r2 -- proceed --> write[Phase 3: Write article]".to_string(),
        "    write --> qa{QA review}".to_string(),
        format!("    qa -- FAILED, attempt < {qa} --> qa"),
        "    qa -- PASSED --> passed[Article PASSED]".to_string(),
        format!("    qa -- FAILED {qa} times --> flagged[Article FLAGGED]"),
        "    passed --> index[(Articles + Production Index)]".to_string(),
        "    flagged --> index".to_string(),
        "    index --> done([Complete])".to_string(),
        "    p1 -. error .-> err([Error])".to_string(),
        "    p2 -. error .-> err".to_string(),
        "    write -. error .-> err".to_string(),
    ]
    .join("\n")
}

fn render_html(diagram: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>ContentCrew — Pipeline Flow</title>
  <script src="https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.min.js"></script>
  <style>body {{ font-family: sans-serif; margin: 2rem; }}</style>
</head>
<body>
  <h1>ContentCrew Pipeline Flow</h1>
  <pre class="mermaid">
{diagram}
  </pre>
  <script>mermaid.initialize({{ startOnLoad: true }});</script>
</body>
</html>
"#
    )
}
