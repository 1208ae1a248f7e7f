// src/services/chat_service.rs

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use chatdesk_ai::{
    is_contact_call, ChatMessage as PromptMessage, ChatResponse, FunctionCall, FunctionSpec,
    ModelProvider, COLLECT_CONTACT_INFO,
};
use chatdesk_common::models::{ContactCapture, MessageRole, Visitor, VisitorProfile};
use chatdesk_common::Error;

use crate::eventbus::{BroadcastHub, ChatEvent};
use crate::services::message_service::MessageService;
use crate::services::session_service::{ResolvedSession, SessionService};
use crate::services::visitor_service::VisitorService;

/// How many persisted turns ride along as oracle context.
const DEFAULT_CONTEXT_TURNS: usize = 20;

const DEFAULT_SYSTEM_PROMPT: &str = "You are the sales assistant for a development \
studio's website. Be concise and helpful, answer in the visitor's language, and \
use the available functions to guide them around the site.";

/// One inbound chat turn from the widget, as the request handler
/// deserializes it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundTurn {
    pub visitor_id: String,
    pub session_token: String,
    /// The visitor's latest message.
    pub message: String,
    pub current_page: String,
    pub locale: String,
    /// Client-side transcript; used only to seed context when the
    /// server has no persisted history for this session.
    #[serde(default)]
    pub conversation_history: Vec<PromptMessage>,
    #[serde(default)]
    pub user_city: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub has_contact_info: bool,
    #[serde(default)]
    pub client_contact: Option<String>,
    #[serde(default)]
    pub has_played_game: bool,
    #[serde(default)]
    pub won_discount: bool,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// What goes back to the widget: reply text plus the filtered function
/// calls. Both empty when an admin owns the session.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantTurn {
    pub message: String,
    pub function_calls: Vec<FunctionCall>,
}

/// The assistant orchestrator: resolves visitor and session, logs the
/// inbound turn, and either short-circuits under admin takeover or runs
/// the oracle loop.
pub struct ChatService {
    visitor_service: Arc<VisitorService>,
    session_service: Arc<SessionService>,
    message_service: Arc<MessageService>,
    hub: Arc<BroadcastHub>,
    oracle: Arc<dyn ModelProvider>,
    catalog: Vec<FunctionSpec>,
    system_prompt: String,
    context_turns: usize,
}

impl ChatService {
    pub fn new(
        visitor_service: Arc<VisitorService>,
        session_service: Arc<SessionService>,
        message_service: Arc<MessageService>,
        hub: Arc<BroadcastHub>,
        oracle: Arc<dyn ModelProvider>,
        catalog: Vec<FunctionSpec>,
    ) -> Self {
        Self {
            visitor_service,
            session_service,
            message_service,
            hub,
            oracle,
            catalog,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            context_turns: DEFAULT_CONTEXT_TURNS,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_context_turns(mut self, turns: usize) -> Self {
        self.context_turns = turns;
        self
    }

    /// Handle one visitor message end to end.
    pub async fn process_visitor_message(
        &self,
        turn: &InboundTurn,
    ) -> Result<AssistantTurn, Error> {
        // The registry must run before the store; "no session row yet"
        // is the new-session signal for the visit counter.
        let new_session = !self
            .session_service
            .session_exists(&turn.visitor_id, &turn.session_token)
            .await?;

        let profile = VisitorProfile {
            visitor_id: turn.visitor_id.clone(),
            ip_address: turn.ip_address.clone(),
            user_agent: turn.user_agent.clone(),
            city: turn.user_city.clone(),
            country: None,
        };
        let visitor = self
            .visitor_service
            .get_or_create_visitor(&profile, new_session)
            .await?;

        let resolved = self
            .session_service
            .get_or_create_session(
                &turn.visitor_id,
                &turn.session_token,
                &turn.current_page,
                &turn.locale,
            )
            .await?;
        let session_id = resolved.session.session_id;

        if resolved.created {
            self.hub.broadcast(ChatEvent::SessionStarted {
                session_id,
                visitor: (&visitor).into(),
            });
        }

        // The inbound turn is logged even when an admin owns the
        // session, so the admin sees it.
        let user_message = self
            .message_service
            .add_chat_message(session_id, MessageRole::User, &turn.message, None)
            .await?;
        self.hub.broadcast(ChatEvent::NewMessage {
            session_id,
            message: user_message,
            origin_token: Some(turn.session_token.clone()),
        });

        if resolved.session.is_admin_takeover() {
            debug!("session {} admin-owned, suppressing AI reply", session_id);
            return Ok(AssistantTurn::default());
        }

        let contact_on_file = turn.has_contact_info
            || self
                .visitor_service
                .has_contact_on_file(&turn.visitor_id)
                .await?;

        let context = self.assemble_context(turn, &visitor, &resolved, contact_on_file);
        let schemas = self.catalog.iter().map(|f| f.to_schema()).collect();
        // Nothing is persisted for the assistant until the oracle
        // response parsed cleanly; a failed turn leaves no half-written
        // state and the caller may retry it whole.
        let response: ChatResponse = self
            .oracle
            .chat_with_functions(context, schemas)
            .await
            .map_err(|e| Error::Oracle(e.to_string()))?;

        let mut function_calls = response.function_calls;
        if contact_on_file {
            // The one business rule at this layer: never re-solicit a
            // contact that is already on file.
            function_calls.retain(|call| {
                if is_contact_call(&call.name) {
                    debug!("dropping '{}' call, contact already on file", call.name);
                    false
                } else {
                    true
                }
            });
        }

        self.execute_side_effects(session_id, &turn.visitor_id, &function_calls)
            .await;

        let reply_text = response.content.unwrap_or_default();
        if !reply_text.is_empty() || !function_calls.is_empty() {
            let metadata = if function_calls.is_empty() {
                None
            } else {
                Some(json!({ "functionCalls": function_calls }))
            };
            let assistant_message = self
                .message_service
                .add_chat_message(session_id, MessageRole::Assistant, &reply_text, metadata)
                .await?;
            self.hub.broadcast(ChatEvent::NewMessage {
                session_id,
                message: assistant_message,
                origin_token: Some(turn.session_token.clone()),
            });
        }

        Ok(AssistantTurn {
            message: reply_text,
            function_calls,
        })
    }

    /// System prompt, one situational-facts line, then the transcript.
    /// SYSTEM markers are skipped; ADMIN turns read as assistant turns
    /// so the oracle keeps a coherent two-party view.
    fn assemble_context(
        &self,
        turn: &InboundTurn,
        visitor: &Visitor,
        resolved: &ResolvedSession,
        contact_on_file: bool,
    ) -> Vec<PromptMessage> {
        let mut facts = vec![
            format!("Current page: {}", turn.current_page),
            format!("Locale: {}", turn.locale),
            format!("Visit number: {}", visitor.total_visits),
        ];
        if let Some(name) = &turn.user_name {
            facts.push(format!("Visitor name: {}", name));
        }
        if let Some(city) = visitor.city.as_ref().or(turn.user_city.as_ref()) {
            facts.push(format!("Visitor city: {}", city));
        }
        if contact_on_file {
            facts.push("Contact details are already on file; do not ask again.".to_string());
        }
        if turn.has_played_game {
            facts.push(if turn.won_discount {
                "The visitor already played the mini-game and won a discount.".to_string()
            } else {
                "The visitor already played the mini-game.".to_string()
            });
        }

        let mut context = vec![
            PromptMessage::system(&self.system_prompt),
            PromptMessage::system(facts.join("\n")),
        ];

        if resolved.messages.is_empty() {
            // Fresh server-side session; the client transcript (if any)
            // keeps continuity across token rotation.
            context.extend(turn.conversation_history.iter().cloned());
        } else {
            let turns: Vec<PromptMessage> = resolved
                .messages
                .iter()
                .filter_map(|m| match m.role {
                    MessageRole::User => Some(PromptMessage::user(&m.content)),
                    MessageRole::Assistant | MessageRole::Admin => {
                        Some(PromptMessage::assistant(&m.content))
                    }
                    MessageRole::System => None,
                })
                .collect();
            let skip = turns.len().saturating_sub(self.context_turns);
            context.extend(turns.into_iter().skip(skip));
        }

        context.push(PromptMessage::user(&turn.message));
        context
    }

    /// Contact capture is the only call executed server-side; all other
    /// calls ride back to the widget uninterpreted. Failures here are
    /// logged and swallowed so the reply still reaches the visitor.
    async fn execute_side_effects(
        &self,
        session_id: uuid::Uuid,
        visitor_id: &str,
        function_calls: &[FunctionCall],
    ) {
        for call in function_calls {
            if call.name != COLLECT_CONTACT_INFO {
                continue;
            }
            let (Some(name), Some(contact)) =
                (call.string_arg("name"), call.string_arg("contact"))
            else {
                warn!("collectContactInfo call missing name/contact arguments");
                continue;
            };

            let capture = ContactCapture {
                visitor_id: visitor_id.to_string(),
                name,
                contact,
                message: call.string_arg("message"),
                source: "chat".to_string(),
            };
            match self.visitor_service.update_visitor_contact(&capture).await {
                Ok(saved) => {
                    info!("captured contact for visitor '{}'", visitor_id);
                    self.hub.broadcast(ChatEvent::ContactCollected {
                        session_id,
                        name: saved.name,
                        contact: saved.contact,
                    });
                }
                Err(e) => {
                    warn!("contact capture failed for '{}': {:?}", visitor_id, e);
                }
            }
        }
    }
}
