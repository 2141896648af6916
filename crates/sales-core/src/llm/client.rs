//! LLM API HTTP Client
//!
//! Supports both Claude API and OpenAI-compatible APIs (Mistral, GLM, etc.)

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::{LlmConfig, LlmProvider};
use crate::error::{Error, Result};
use crate::tool::ToolManager;

use super::provider::{CompletionProvider, CompletionRequest, StructuredReply};
use super::types::*;

/// LLM API client (supports Claude and OpenAI-compatible APIs)
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    provider: LlmProvider,
}

impl LlmClient {
    /// Create a new LLM client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(Error::Http)?;

        let base_url = match &config.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => match config.provider {
                LlmProvider::Claude => "https://api.anthropic.com/v1".to_string(),
                LlmProvider::OpenAi => "https://api.openai.com/v1".to_string(),
            },
        };

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url,
            provider: config.provider.clone(),
        })
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the provider type
    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }

    /// Send a message to the LLM API
    pub async fn messages(&self, request: MessagesRequest) -> Result<MessagesResponse> {
        match self.provider {
            LlmProvider::Claude => self.send_claude_request(request).await,
            LlmProvider::OpenAi => self.send_openai_request(request).await,
        }
    }

    async fn send_claude_request(&self, request: MessagesRequest) -> Result<MessagesResponse> {
        let url = format!("{}/messages", self.base_url);
        debug!("Sending request to Claude API: {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Claude API error: {} - {}", status, body);
            return Err(Error::Llm(format!("{}: {}", status, body)));
        }

        let parsed: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Llm(format!("Failed to parse response: {} - {}", e, body)))?;

        info!(
            "Claude API response: stop_reason={}, tokens={}",
            parsed.stop_reason,
            parsed.usage.as_ref().map(|u| u.output_tokens).unwrap_or(0)
        );

        Ok(parsed)
    }

    async fn send_openai_request(&self, request: MessagesRequest) -> Result<MessagesResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("Sending request to OpenAI-compatible API: {}", url);

        let openai_request = ChatCompletionRequest::from(&request);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&openai_request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("OpenAI API error: {} - {}", status, body);
            return Err(Error::Llm(format!("{}: {}", status, body)));
        }

        let openai_response: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Llm(format!("Failed to parse response: {} - {}", e, body)))?;
        let parsed = MessagesResponse::from(openai_response);

        info!(
            "OpenAI API response: stop_reason={}, tokens={}",
            parsed.stop_reason,
            parsed.usage.as_ref().map(|u| u.output_tokens).unwrap_or(0)
        );

        Ok(parsed)
    }

    /// Run the model until it stops asking for tools.
    ///
    /// Tool errors are fed back to the model as error results rather than
    /// aborting the loop.
    pub async fn run_tool_loop(
        &self,
        system: Option<String>,
        prompt: String,
        tools: &ToolManager,
        max_tokens: u64,
        max_iterations: usize,
    ) -> Result<String> {
        let definitions = tools.definitions();
        let mut messages = vec![LlmMessage::user(prompt)];

        for iteration in 1..=max_iterations {
            let request = MessagesRequest {
                model: self.model.clone(),
                max_tokens,
                system: system.clone(),
                messages: messages.clone(),
                tools: if definitions.is_empty() {
                    None
                } else {
                    Some(definitions.clone())
                },
            };

            let response = self.messages(request).await?;

            match response.stop_reason.as_str() {
                "tool_use" | "tool_calls" => {
                    let tool_uses: Vec<_> = response
                        .content
                        .iter()
                        .filter_map(|c| match c {
                            ContentBlock::ToolUse { id, name, input } => {
                                Some((id.clone(), name.clone(), input.clone()))
                            }
                            _ => None,
                        })
                        .collect();

                    if tool_uses.is_empty() {
                        warn!("tool_use stop_reason but no tool_uses found");
                        return Ok(text_of(&response.content));
                    }

                    let mut results = Vec::new();
                    for (id, name, input) in tool_uses {
                        debug!(iteration, tool = %name, "Executing tool");
                        let result = match tools.execute(&name, input).await {
                            Ok(result) => result,
                            Err(e) => crate::tool::ToolResult::error(e.to_string()),
                        };
                        results.push(ContentBlock::ToolResult {
                            tool_use_id: id,
                            content: result.output,
                            is_error: result.is_error,
                        });
                    }

                    messages.push(LlmMessage {
                        role: "assistant".to_string(),
                        content: response.content,
                    });
                    messages.push(LlmMessage {
                        role: "user".to_string(),
                        content: results,
                    });
                }
                "end_turn" | "stop_sequence" | "stop" | "max_tokens" | "length" => {
                    return Ok(text_of(&response.content));
                }
                other => {
                    warn!("Unknown stop_reason: {}", other);
                    return Err(Error::Llm(format!("Unknown stop_reason: {}", other)));
                }
            }
        }

        Err(Error::Llm(format!(
            "Tool loop did not finish within {} iterations",
            max_iterations
        )))
    }
}

#[async_trait]
impl CompletionProvider for LlmClient {
    async fn complete(&self, request: CompletionRequest, tools: &ToolManager) -> Result<StructuredReply> {
        let system = request.effective_system();
        let raw = self
            .run_tool_loop(
                system,
                request.prompt,
                tools,
                request.max_tokens,
                request.max_iterations,
            )
            .await?;
        Ok(StructuredReply::parse(&raw, request.schema.as_ref()))
    }
}
