//! Google Gemini provider implementation.
//!
//! Talks to the `generateContent` endpoint of the Generative Language API.
//! Tool declarations are sent as-is: the neutral declaration dialect is
//! Gemini's own (upper-case type tokens), so no translation is needed.
//!
//! Features:
//! - `x-goog-api-key` header authentication
//! - System prompt as `systemInstruction`
//! - `functionCall` / `functionResponse` parts, all responses of a round in
//!   one content
//! - Thought signatures echoed back on the next turn

use async_trait::async_trait;
use contentcrew_core::error::ProviderError;
use contentcrew_core::message::{Message, MessageToolCall, Role};
use contentcrew_core::provider::*;
use contentcrew_core::schema::FunctionDeclaration;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MAX_TOKENS: u32 = 16384;

/// Gemini `generateContent` provider.
pub struct GeminiProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: "gemini".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create with a custom base URL (`GEMINI_API_BASE`).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn to_api_contents(messages: &[Message]) -> Vec<ApiContent> {
        messages
            .iter()
            .map(|msg| match msg.role {
                Role::User => ApiContent::new("user", vec![ApiPart::text(&msg.content)]),
                Role::Assistant => {
                    let mut parts = Vec::new();
                    if !msg.content.is_empty() {
                        parts.push(ApiPart::text(&msg.content));
                    }
                    parts.extend(msg.tool_calls.iter().map(|tc| ApiPart::FunctionCall {
                        function_call: ApiFunctionCall {
                            name: tc.name.clone(),
                            args: tc.arguments.clone(),
                        },
                        thought_signature: tc.signature.clone(),
                    }));
                    ApiContent::new("model", parts)
                }
                Role::Tool => ApiContent::new(
                    "user",
                    msg.tool_results
                        .iter()
                        .map(|r| ApiPart::FunctionResponse {
                            function_response: ApiFunctionResponse {
                                name: r.name.clone(),
                                response: serde_json::json!({ "result": r.content }),
                            },
                        })
                        .collect(),
                ),
            })
            .collect()
    }

    fn build_body(request: &ProviderRequest) -> ApiGenerateContentRequest {
        ApiGenerateContentRequest {
            contents: Self::to_api_contents(&request.messages),
            system_instruction: request
                .system_prompt
                .as_ref()
                .filter(|s| !s.is_empty())
                .map(|s| ApiContent {
                    role: None,
                    parts: vec![ApiPart::text(s)],
                }),
            tools: if request.tools.is_empty() {
                Vec::new()
            } else {
                vec![ApiToolConfig {
                    function_declarations: request.tools.clone(),
                }]
            },
            generation_config: ApiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            },
        }
    }

    fn response_to_provider_response(resp: ApiGenerateContentResponse, model: &str) -> ProviderResponse {
        let parts = resp
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts)
            .unwrap_or_default();

        if parts.is_empty() {
            warn!(provider = "gemini", "Response had no candidate parts");
        }

        let mut texts: Vec<String> = Vec::new();
        let mut tool_calls = Vec::new();
        for part in parts {
            match part {
                ApiPart::Text { text, .. } => {
                    if !text.is_empty() {
                        texts.push(text);
                    }
                }
                ApiPart::FunctionCall {
                    function_call,
                    thought_signature,
                } => {
                    let mut call = MessageToolCall::new(
                        format!("call_{}", Uuid::new_v4().simple()),
                        function_call.name,
                        function_call.args,
                    );
                    call.signature = thought_signature;
                    tool_calls.push(call);
                }
                ApiPart::FunctionResponse { .. } => {}
                ApiPart::Unknown(value) => {
                    debug!(part = %value, "Skipping unknown Gemini part");
                }
            }
        }

        let usage = resp.usage_metadata.map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.prompt_token_count + u.candidates_token_count,
        });

        ProviderResponse {
            message: Message::assistant_with_calls(texts.join("\n"), tool_calls),
            usage,
            model: resp.model_version.unwrap_or_else(|| model.to_string()),
        }
    }
}

#[async_trait]
impl contentcrew_core::Provider for GeminiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);
        let body = Self::build_body(&request);

        debug!(
            provider = "gemini",
            model = %request.model,
            turns = body.contents.len(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid Gemini API key".into(),
            ));
        }
        if status == 404 {
            return Err(ProviderError::ModelNotFound(request.model));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Gemini API error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: ApiGenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse Gemini response: {e}")))?;

        Ok(Self::response_to_provider_response(api_resp, &request.model))
    }
}

// --- Gemini API types ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiGenerateContentRequest {
    contents: Vec<ApiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<ApiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiToolConfig>,
    generation_config: ApiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    /// Missing on empty or safety-blocked responses
    #[serde(default)]
    parts: Vec<ApiPart>,
}

impl ApiContent {
    fn new(role: &str, parts: Vec<ApiPart>) -> Self {
        Self {
            role: Some(role.to_string()),
            parts,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ApiPart {
    Text {
        text: String,
        #[serde(rename = "thoughtSignature", default, skip_serializing_if = "Option::is_none")]
        thought_signature: Option<String>,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: ApiFunctionCall,
        #[serde(rename = "thoughtSignature", default, skip_serializing_if = "Option::is_none")]
        thought_signature: Option<String>,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: ApiFunctionResponse,
    },
    Unknown(serde_json::Value),
}

impl ApiPart {
    fn text(text: &str) -> Self {
        Self::Text {
            text: text.to_string(),
            thought_signature: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiToolConfig {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiGenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
    #[serde(default)]
    usage_metadata: Option<ApiUsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiCandidate {
    #[serde(default = "empty_content")]
    content: ApiContent,
}

fn empty_content() -> ApiContent {
    ApiContent {
        role: None,
        parts: Vec::new(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}
