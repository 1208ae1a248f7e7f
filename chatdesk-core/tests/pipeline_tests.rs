// tests/pipeline_tests.rs
//
// End-to-end pipeline behavior over the in-memory harness: visitor
// upserts, session reuse, message ordering, the contact filter, and the
// admin-takeover suppression path.

use std::collections::HashMap;

use chatdesk_ai::{ChatMessage as PromptMessage, ChatResponse, FunctionCall};
use chatdesk_common::models::{MessageRole, SessionStatus, VisitorProfile};
use chatdesk_common::Error;
use chatdesk_core::services::InboundTurn;
use chatdesk_core::test_utils::{init_test_tracing, MemoryHarness};

fn inbound(visitor_id: &str, session_token: &str, message: &str) -> InboundTurn {
    InboundTurn {
        visitor_id: visitor_id.to_string(),
        session_token: session_token.to_string(),
        message: message.to_string(),
        current_page: "/".to_string(),
        locale: "ru".to_string(),
        conversation_history: Vec::new(),
        user_city: None,
        user_name: None,
        has_contact_info: false,
        client_contact: None,
        has_played_game: false,
        won_discount: false,
        ip_address: None,
        user_agent: None,
    }
}

fn call(name: &str, arguments: &[(&str, &str)]) -> FunctionCall {
    FunctionCall {
        name: name.to_string(),
        arguments: arguments
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::json!(v)))
            .collect::<HashMap<_, _>>(),
    }
}

#[tokio::test]
async fn test_fresh_visitor_scenario() -> Result<(), Error> {
    init_test_tracing();
    let harness = MemoryHarness::new();
    let (_, mut rx) = harness.hub.subscribe(None);

    harness.oracle.push_text("Hi! How can I help?");
    let turn = harness
        .chat_service
        .process_visitor_message(&inbound("v1", "s1", "Hello"))
        .await?;
    assert_eq!(turn.message, "Hi! How can I help?");
    assert!(turn.function_calls.is_empty());

    // Registry created the visitor with one visit.
    let visitor = harness
        .visitor_service
        .get_or_create_visitor(
            &VisitorProfile {
                visitor_id: "v1".to_string(),
                ..Default::default()
            },
            false,
        )
        .await?;
    assert_eq!(visitor.total_visits, 1);

    // Store created the session ACTIVE with the transcript in order.
    let session = harness
        .session_service
        .get_or_create_session("v1", "s1", "/", "ru")
        .await?;
    assert!(!session.created);
    assert_eq!(session.session.status(), SessionStatus::Active);
    let roles: Vec<MessageRole> = session.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant]);
    assert_eq!(session.messages[0].content, "Hello");

    // Observer saw session_started, then one new_message per role.
    let events: Vec<String> = [rx.recv().await, rx.recv().await, rx.recv().await]
        .into_iter()
        .map(|e| e.expect("event").event_type().to_string())
        .collect();
    assert_eq!(events, vec!["session_started", "new_message", "new_message"]);
    assert!(rx.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn test_visit_counter_increments_per_session_token() -> Result<(), Error> {
    let harness = MemoryHarness::new();

    harness.oracle.push_text("hi");
    harness.oracle.push_text("hi again");
    harness.oracle.push_text("welcome back");

    harness
        .chat_service
        .process_visitor_message(&inbound("v1", "tok-1", "first"))
        .await?;
    // Same token: no new session, counter untouched.
    harness
        .chat_service
        .process_visitor_message(&inbound("v1", "tok-1", "second"))
        .await?;
    let visitor = harness
        .visitor_service
        .get_or_create_visitor(
            &VisitorProfile {
                visitor_id: "v1".to_string(),
                ..Default::default()
            },
            false,
        )
        .await?;
    assert_eq!(visitor.total_visits, 1);

    // New token: exactly one increment.
    harness
        .chat_service
        .process_visitor_message(&inbound("v1", "tok-2", "back"))
        .await?;
    let visitor = harness
        .visitor_service
        .get_or_create_visitor(
            &VisitorProfile {
                visitor_id: "v1".to_string(),
                ..Default::default()
            },
            false,
        )
        .await?;
    assert_eq!(visitor.total_visits, 2);
    Ok(())
}

#[tokio::test]
async fn test_session_reuse_by_token() -> Result<(), Error> {
    let harness = MemoryHarness::new();
    harness
        .visitor_service
        .get_or_create_visitor(
            &VisitorProfile {
                visitor_id: "v1".to_string(),
                ..Default::default()
            },
            true,
        )
        .await?;

    let first = harness
        .session_service
        .get_or_create_session("v1", "tok-1", "/", "ru")
        .await?;
    assert!(first.created);
    let again = harness
        .session_service
        .get_or_create_session("v1", "tok-1", "/pricing", "ro")
        .await?;
    assert!(!again.created);
    assert_eq!(first.session.session_id, again.session.session_id);
    assert_eq!(again.session.current_page, "/pricing");
    assert_eq!(again.session.locale, "ro");

    let other = harness
        .session_service
        .get_or_create_session("v1", "tok-2", "/", "ru")
        .await?;
    assert!(other.created);
    assert_ne!(other.session.session_id, first.session.session_id);
    Ok(())
}

#[tokio::test]
async fn test_message_log_keeps_insertion_order() -> Result<(), Error> {
    let harness = MemoryHarness::new();
    harness
        .visitor_service
        .get_or_create_visitor(
            &VisitorProfile {
                visitor_id: "v1".to_string(),
                ..Default::default()
            },
            true,
        )
        .await?;
    let session = harness
        .session_service
        .get_or_create_session("v1", "tok-1", "/", "ru")
        .await?
        .session;

    for i in 0..5 {
        harness
            .message_service
            .add_chat_message(session.session_id, MessageRole::User, &format!("m{}", i), None)
            .await?;
    }
    let messages = harness
        .message_service
        .session_messages(session.session_id)
        .await?;
    assert_eq!(messages.len(), 5);
    for (i, message) in messages.iter().enumerate() {
        assert_eq!(message.content, format!("m{}", i));
    }
    Ok(())
}

#[tokio::test]
async fn test_admin_takeover_suppresses_ai_reply() -> Result<(), Error> {
    let harness = MemoryHarness::new();
    harness.oracle.push_text("hello!");
    harness
        .chat_service
        .process_visitor_message(&inbound("v1", "s1", "Hello"))
        .await?;
    let session_id = harness
        .session_service
        .get_or_create_session("v1", "s1", "/", "ru")
        .await?
        .session
        .session_id;

    harness.takeover_service.takeover(session_id, "olga").await?;

    // No oracle response is scripted: the turn must not reach it.
    let turn = harness
        .chat_service
        .process_visitor_message(&inbound("v1", "s1", "Anyone there?"))
        .await?;
    assert_eq!(turn.message, "");
    assert!(turn.function_calls.is_empty());

    // The inbound USER message still landed for the admin to read.
    let messages = harness.message_service.session_messages(session_id).await?;
    let last = messages.last().unwrap();
    assert_eq!(last.role, MessageRole::User);
    assert_eq!(last.content, "Anyone there?");
    assert!(!messages
        .iter()
        .any(|m| m.role == MessageRole::Assistant && m.content != "hello!"));
    Ok(())
}

#[tokio::test]
async fn test_contact_calls_filtered_when_contact_on_file() -> Result<(), Error> {
    let harness = MemoryHarness::new();
    harness.oracle.push(ChatResponse {
        content: Some("Sure, have a look.".to_string()),
        function_calls: vec![
            call("askForContact", &[]),
            call("navigateTo", &[("path", "/projects")]),
        ],
    });

    let mut turn = inbound("v1", "s1", "Show me your work");
    turn.has_contact_info = true;
    let result = harness.chat_service.process_visitor_message(&turn).await?;

    assert_eq!(result.function_calls.len(), 1);
    assert_eq!(result.function_calls[0].name, "navigateTo");
    assert_eq!(
        result.function_calls[0].string_arg("path").as_deref(),
        Some("/projects")
    );

    // The persisted assistant metadata carries only the surviving call.
    let session_id = harness
        .session_service
        .get_or_create_session("v1", "s1", "/", "ru")
        .await?
        .session
        .session_id;
    let messages = harness.message_service.session_messages(session_id).await?;
    let assistant = messages
        .iter()
        .find(|m| m.role == MessageRole::Assistant)
        .unwrap();
    let calls = &assistant.metadata.as_ref().unwrap()["functionCalls"];
    assert_eq!(calls.as_array().unwrap().len(), 1);
    assert_eq!(calls[0]["name"], "navigateTo");
    Ok(())
}

#[tokio::test]
async fn test_contact_capture_persists_and_broadcasts() -> Result<(), Error> {
    let harness = MemoryHarness::new();
    let (_, mut rx) = harness.hub.subscribe(None);

    harness.oracle.push(ChatResponse {
        content: Some("Thanks, we'll be in touch!".to_string()),
        function_calls: vec![call(
            "collectContactInfo",
            &[("name", "Ana"), ("contact", "ana@example.com")],
        )],
    });
    harness
        .chat_service
        .process_visitor_message(&inbound("v1", "s1", "My email is ana@example.com"))
        .await?;

    let contact = harness
        .visitor_service
        .get_contact("v1")
        .await?
        .expect("contact saved");
    assert_eq!(contact.name, "Ana");
    assert_eq!(contact.contact, "ana@example.com");
    assert_eq!(contact.source, "chat");

    let mut saw_contact_collected = false;
    while let Ok(event) = rx.try_recv() {
        if event.event_type() == "contact_collected" {
            saw_contact_collected = true;
        }
    }
    assert!(saw_contact_collected);

    // Follow-up turn: the stored contact filters re-solicitation even
    // though the client flag is false.
    harness.oracle.push(ChatResponse {
        content: Some("Of course.".to_string()),
        function_calls: vec![call("askForContact", &[])],
    });
    let result = harness
        .chat_service
        .process_visitor_message(&inbound("v1", "s1", "One more thing"))
        .await?;
    assert!(result.function_calls.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_oracle_failure_leaves_no_assistant_turn() -> Result<(), Error> {
    let harness = MemoryHarness::new();
    // Nothing scripted: the oracle call fails.
    let err = harness
        .chat_service
        .process_visitor_message(&inbound("v1", "s1", "Hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Oracle(_)));

    let session_id = harness
        .session_service
        .get_or_create_session("v1", "s1", "/", "ru")
        .await?
        .session
        .session_id;
    let messages = harness.message_service.session_messages(session_id).await?;
    // The inbound USER message persisted; no assistant half-turn did.
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, MessageRole::User);
    Ok(())
}

#[tokio::test]
async fn test_new_message_reactivates_ended_session() -> Result<(), Error> {
    let harness = MemoryHarness::new();
    harness.oracle.push_text("hi");
    harness.oracle.push_text("welcome back");

    harness
        .chat_service
        .process_visitor_message(&inbound("v1", "s1", "Hello"))
        .await?;
    let session_id = harness
        .session_service
        .get_or_create_session("v1", "s1", "/", "ru")
        .await?
        .session
        .session_id;
    harness.takeover_service.end_session(session_id).await?;
    assert_eq!(
        harness.session_service.get_session(session_id).await?.status(),
        SessionStatus::Ended
    );

    harness
        .chat_service
        .process_visitor_message(&inbound("v1", "s1", "Still there?"))
        .await?;
    let session = harness.session_service.get_session(session_id).await?;
    assert_eq!(session.status(), SessionStatus::Active);
    Ok(())
}

#[tokio::test]
async fn test_client_history_seeds_fresh_session_context() -> Result<(), Error> {
    let harness = MemoryHarness::new();
    harness.oracle.push_text("Picking up where we left off.");

    let mut turn = inbound("v1", "fresh-token", "And the price?");
    turn.conversation_history = vec![
        PromptMessage::user("Tell me about your projects"),
        PromptMessage::assistant("We build web and mobile apps."),
    ];
    turn.has_played_game = true;
    harness.chat_service.process_visitor_message(&turn).await?;

    let context = harness.oracle.last_context().expect("oracle was called");
    // Two system turns, the seeded pair, then the live message.
    assert_eq!(context.len(), 5);
    assert_eq!(context[0].role, "system");
    assert!(context[1].content.contains("mini-game"));
    assert_eq!(context[2].content, "Tell me about your projects");
    assert_eq!(context[4].content, "And the price?");

    // Next turn on the same token: the persisted log wins over any
    // client transcript.
    harness.oracle.push_text("Plans start at ...");
    let mut second = inbound("v1", "fresh-token", "Monthly plans?");
    second.conversation_history = vec![PromptMessage::user("stale client copy")];
    harness.chat_service.process_visitor_message(&second).await?;
    let context = harness.oracle.last_context().unwrap();
    assert!(!context.iter().any(|m| m.content == "stale client copy"));
    assert!(context.iter().any(|m| m.content == "And the price?"));
    Ok(())
}
