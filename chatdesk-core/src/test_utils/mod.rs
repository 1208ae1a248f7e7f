// src/test_utils/mod.rs
//
// Shared test substrate: a scripted oracle and a fully wired pipeline
// over the in-memory repositories. Lives in the library so integration
// tests across the workspace can reuse it.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use chatdesk_ai::{
    default_catalog, ChatMessage as PromptMessage, ChatResponse, FunctionSchema, ModelProvider,
};
use chatdesk_common::traits::repository_traits::ChatSessionRepository;

use crate::eventbus::BroadcastHub;
use crate::repositories::memory::{
    MemoryChatMessageRepository, MemoryChatSessionRepository, MemoryVisitorRepository,
};
use crate::services::{
    ChatService, MessageService, SessionService, TakeoverService, VisitorService,
};

/// Initialize tracing for a test binary; safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A `ModelProvider` that replays queued responses in order and errors
/// when the script runs out. Tests script exactly the turns they expect.
#[derive(Default)]
pub struct ScriptedOracle {
    responses: Mutex<VecDeque<ChatResponse>>,
    contexts: Mutex<Vec<Vec<PromptMessage>>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: ChatResponse) {
        self.responses.lock().unwrap().push_back(response);
    }

    /// The context of the most recent completion call, for assertions
    /// on context assembly.
    pub fn last_context(&self) -> Option<Vec<PromptMessage>> {
        self.contexts.lock().unwrap().last().cloned()
    }

    pub fn push_text(&self, content: &str) {
        self.push(ChatResponse {
            content: Some(content.to_string()),
            function_calls: Vec::new(),
        });
    }

    fn next(&self) -> anyhow::Result<ChatResponse> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("scripted oracle has no response queued"))
    }
}

#[async_trait]
impl ModelProvider for ScriptedOracle {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, messages: Vec<PromptMessage>) -> anyhow::Result<String> {
        self.contexts.lock().unwrap().push(messages);
        let response = self.next()?;
        response
            .content
            .ok_or_else(|| anyhow::anyhow!("scripted response had no content"))
    }

    async fn chat_with_functions(
        &self,
        messages: Vec<PromptMessage>,
        _functions: Vec<FunctionSchema>,
    ) -> anyhow::Result<ChatResponse> {
        self.contexts.lock().unwrap().push(messages);
        self.next()
    }
}

/// The whole pipeline wired over memory repositories, one isolated hub
/// per harness so suites cannot leak events into each other.
pub struct MemoryHarness {
    pub hub: Arc<BroadcastHub>,
    pub oracle: Arc<ScriptedOracle>,
    pub visitor_service: Arc<VisitorService>,
    pub session_service: Arc<SessionService>,
    pub message_service: Arc<MessageService>,
    pub takeover_service: Arc<TakeoverService>,
    pub chat_service: Arc<ChatService>,
    pub session_repo: Arc<MemoryChatSessionRepository>,
}

impl MemoryHarness {
    pub fn new() -> Self {
        let visitor_repo = Arc::new(MemoryVisitorRepository::new());
        let session_repo = Arc::new(MemoryChatSessionRepository::new());
        let message_repo = Arc::new(MemoryChatMessageRepository::new());

        let hub = Arc::new(BroadcastHub::new());
        let oracle = Arc::new(ScriptedOracle::new());

        let visitor_service = Arc::new(VisitorService::new(visitor_repo.clone() as _));
        let session_service = Arc::new(SessionService::new(
            session_repo.clone() as Arc<dyn ChatSessionRepository>,
            message_repo.clone() as _,
        ));
        let message_service = Arc::new(MessageService::new(message_repo.clone() as _));
        let takeover_service = Arc::new(TakeoverService::new(
            session_repo.clone() as _,
            message_service.clone(),
            hub.clone(),
        ));
        let chat_service = Arc::new(ChatService::new(
            visitor_service.clone(),
            session_service.clone(),
            message_service.clone(),
            hub.clone(),
            oracle.clone() as _,
            default_catalog(),
        ));

        Self {
            hub,
            oracle,
            visitor_service,
            session_service,
            message_service,
            takeover_service,
            chat_service,
            session_repo,
        }
    }
}

impl Default for MemoryHarness {
    fn default() -> Self {
        Self::new()
    }
}
