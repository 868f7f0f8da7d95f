//! Web search through the Serper.dev Google Search API.
//!
//! Failures never raise: a missing key or a transport error comes back as
//! text so the model can decide what to do next.

use std::time::Duration;

use async_trait::async_trait;
use contentcrew_config::SearchConfig;
use contentcrew_core::error::ToolError;
use contentcrew_core::schema::Schema;
use contentcrew_core::tool::{Tool, ToolResult, require_str};
use serde::{Deserialize, Serialize};

/// People-also-ask and related-search entries shown per section.
const SECTION_LIMIT: usize = 5;

pub struct SerperSearchTool {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
    num_results: u32,
    timeout: Duration,
}

impl SerperSearchTool {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            endpoint: config.endpoint.clone(),
            num_results: config.num_results,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    async fn search(&self, api_key: &str, query: &str, num: u32) -> Result<SerperResponse, reqwest::Error> {
        self.client
            .post(&self.endpoint)
            .header("X-API-KEY", api_key)
            .timeout(self.timeout)
            .json(&SerperRequest { q: query, num })
            .send()
            .await?
            .error_for_status()?
            .json::<SerperResponse>()
            .await
    }
}

#[derive(Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    num: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerperResponse {
    #[serde(default)]
    pub knowledge_graph: Option<KnowledgeGraph>,
    #[serde(default)]
    pub organic: Vec<OrganicResult>,
    #[serde(default)]
    pub people_also_ask: Vec<PeopleAlsoAsk>,
    #[serde(default)]
    pub related_searches: Vec<RelatedSearch>,
}

#[derive(Debug, Default, Deserialize)]
pub struct KnowledgeGraph {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PeopleAlsoAsk {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RelatedSearch {
    #[serde(default)]
    pub query: String,
}

/// Render a search response as the text the model reads.
pub fn format_results(response: &SerperResponse, num_results: usize) -> String {
    let mut lines = Vec::new();

    if let Some(kg) = &response.knowledge_graph {
        lines.push(format!("Knowledge Graph: {} — {}", kg.title, kg.description));
    }

    for (i, item) in response.organic.iter().take(num_results).enumerate() {
        lines.push(format!(
            "{}. [{}]({})\n   {}",
            i + 1,
            item.title,
            item.link,
            item.snippet
        ));
    }

    if !response.people_also_ask.is_empty() {
        lines.push("\nPeople Also Ask:".into());
        for q in response.people_also_ask.iter().take(SECTION_LIMIT) {
            lines.push(format!("  - {}", q.question));
        }
    }

    if !response.related_searches.is_empty() {
        lines.push("\nRelated Searches:".into());
        for r in response.related_searches.iter().take(SECTION_LIMIT) {
            lines.push(format!("  - {}", r.query));
        }
    }

    if lines.is_empty() {
        "No results found.".into()
    } else {
        lines.join("\n")
    }
}

#[async_trait]
impl Tool for SerperSearchTool {
    fn name(&self) -> &str {
        "serper_search"
    }

    fn description(&self) -> &str {
        "Search Google via Serper.dev. Returns organic results with titles, links and snippets, plus People Also Ask questions and related searches."
    }

    fn parameters(&self) -> Schema {
        Schema::object()
            .property("query", Schema::string("The search query"))
            .property(
                "num_results",
                Schema::integer("Number of organic results to return (default 10)"),
            )
            .require("query")
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = require_str(&arguments, "query")?;
        let num = arguments["num_results"]
            .as_u64()
            .map(|n| n.clamp(1, 100) as u32)
            .unwrap_or(self.num_results);

        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(ToolResult::failed("Error: SERPER_API_KEY not set"));
        };

        tracing::debug!(query, num, "Serper search");
        match self.search(api_key, query, num).await {
            Ok(response) => Ok(ToolResult::ok(format_results(&response, num as usize))),
            Err(e) => {
                tracing::warn!(query, error = %e, "Serper search failed");
                Ok(ToolResult::failed(format!("Search error: {e}")))
            }
        }
    }
}
