use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::function::FunctionSchema;

/// One prompt turn handed to the oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A function invocation requested by the oracle. `arguments` is the
/// decoded JSON object from the tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: HashMap<String, serde_json::Value>,
}

impl FunctionCall {
    /// String-typed argument lookup. Tool arguments come from the model
    /// and may legitimately be missing or of the wrong type.
    pub fn string_arg(&self, key: &str) -> Option<String> {
        self.arguments
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}

/// What the oracle produced for one turn: optional text plus zero or more
/// function calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: Option<String>,
    pub function_calls: Vec<FunctionCall>,
}

/// The narrow boundary the chat pipeline sees. Implementations speak
/// whatever wire protocol they like; tests substitute a scripted fake.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Plain chat completion without tools.
    async fn chat(&self, messages: Vec<ChatMessage>) -> anyhow::Result<String>;

    /// Chat completion with the function catalog attached.
    async fn chat_with_functions(
        &self,
        messages: Vec<ChatMessage>,
        functions: Vec<FunctionSchema>,
    ) -> anyhow::Result<ChatResponse>;
}
