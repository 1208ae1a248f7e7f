use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error, warn};

use crate::function::FunctionSchema;
use crate::models::ProviderConfig;
use crate::traits::{ChatMessage, ChatResponse, FunctionCall, ModelProvider};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// `ModelProvider` over any OpenAI-compatible chat-completions endpoint.
pub struct OpenAiProvider {
    config: ProviderConfig,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Self {
        let client = Client::new();
        Self { config, client }
    }

    fn api_base(&self) -> String {
        self.config
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
    }

    async fn post_chat(&self, payload: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let url = format!("{}/chat/completions", self.api_base());
        debug!("POST {} (model={})", url, self.config.default_model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send()
            .await?;

        // Read the body as text first so a non-JSON error page still
        // produces a useful message.
        let response_text = response.text().await?;
        let data = match serde_json::from_str::<serde_json::Value>(&response_text) {
            Ok(json) => json,
            Err(e) => {
                error!("non-JSON response from {}: {}", url, response_text);
                return Err(anyhow::anyhow!("API returned non-JSON response: {}", e));
            }
        };

        if let Some(api_error) = data.get("error") {
            let message = api_error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            error!("API error from {}: {}", url, message);
            return Err(anyhow::anyhow!("API error: {}", message));
        }

        Ok(data)
    }

    fn format_messages(messages: &[ChatMessage]) -> Vec<serde_json::Value> {
        messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role,
                    "content": msg.content,
                })
            })
            .collect()
    }
}

/// Extracts the assistant text and tool calls from a chat-completions
/// payload. Factored out so the parsing is testable without a server.
pub fn parse_chat_payload(data: &serde_json::Value) -> anyhow::Result<ChatResponse> {
    let choices = data
        .get("choices")
        .and_then(|c| c.as_array())
        .ok_or_else(|| anyhow::anyhow!("response missing 'choices' array"))?;

    let message = choices
        .first()
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| anyhow::anyhow!("response choice missing 'message'"))?;

    let content = message
        .get("content")
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty());

    let mut function_calls = Vec::new();
    if let Some(tool_calls) = message.get("tool_calls").and_then(|t| t.as_array()) {
        for call in tool_calls {
            let function = &call["function"];
            let name = match function.get("name").and_then(|n| n.as_str()) {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => {
                    warn!("skipping tool call without a name: {}", call);
                    continue;
                }
            };

            // Arguments arrive as a JSON string; tolerate garbage rather
            // than failing the whole turn.
            let raw_arguments = function
                .get("arguments")
                .and_then(|a| a.as_str())
                .unwrap_or("{}");
            let arguments: HashMap<String, serde_json::Value> =
                match serde_json::from_str::<serde_json::Value>(raw_arguments) {
                    Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
                    Ok(other) => {
                        warn!("tool call '{}' had non-object arguments: {}", name, other);
                        HashMap::new()
                    }
                    Err(e) => {
                        warn!("tool call '{}' had unparsable arguments: {}", name, e);
                        HashMap::new()
                    }
                };

            function_calls.push(FunctionCall { name, arguments });
        }
    }

    Ok(ChatResponse {
        content,
        function_calls,
    })
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> anyhow::Result<String> {
        let payload = json!({
            "model": self.config.default_model,
            "messages": Self::format_messages(&messages),
        });

        let data = self.post_chat(payload).await?;
        let response = parse_chat_payload(&data)?;
        response
            .content
            .ok_or_else(|| anyhow::anyhow!("response message missing 'content'"))
    }

    async fn chat_with_functions(
        &self,
        messages: Vec<ChatMessage>,
        functions: Vec<FunctionSchema>,
    ) -> anyhow::Result<ChatResponse> {
        let tools: Vec<serde_json::Value> = functions
            .iter()
            .map(|schema| {
                json!({
                    "type": "function",
                    "function": {
                        "name": schema.name,
                        "description": schema.description,
                        "parameters": schema.parameters,
                    },
                })
            })
            .collect();

        let payload = json!({
            "model": self.config.default_model,
            "messages": Self::format_messages(&messages),
            "tools": tools,
            "tool_choice": "auto",
        });

        let data = self.post_chat(payload).await?;
        parse_chat_payload(&data)
    }
}
