// tests/takeover_tests.rs
//
// Takeover coordinator semantics: mutual exclusion, race behavior,
// idempotent re-take, release, admin messages, and the idle reaper.

use std::sync::Arc;

use chatdesk_common::models::{ChatSession, MessageRole, SessionStatus, VisitorProfile};
use chatdesk_common::traits::repository_traits::ChatSessionRepository;
use chatdesk_common::Error;
use chatdesk_core::tasks::run_idle_sweep;
use chatdesk_core::test_utils::{init_test_tracing, MemoryHarness};
use chrono::{Duration, Utc};
use uuid::Uuid;

async fn seed_session(harness: &MemoryHarness, visitor_id: &str, token: &str) -> ChatSession {
    harness
        .visitor_service
        .get_or_create_visitor(
            &VisitorProfile {
                visitor_id: visitor_id.to_string(),
                ..Default::default()
            },
            true,
        )
        .await
        .unwrap();
    harness
        .session_service
        .get_or_create_session(visitor_id, token, "/", "ru")
        .await
        .unwrap()
        .session
}

#[tokio::test]
async fn test_takeover_then_release_restores_ai_ownership() -> Result<(), Error> {
    init_test_tracing();
    let harness = MemoryHarness::new();
    let session = seed_session(&harness, "v1", "s1").await;
    let (_, mut rx) = harness.hub.subscribe(Some(session.session_id));

    let taken = harness
        .takeover_service
        .takeover(session.session_id, "olga")
        .await?;
    assert_eq!(taken.status(), SessionStatus::AdminActive);
    assert!(taken.is_admin_takeover());
    assert_eq!(taken.admin_takeover_by(), Some("olga"));

    let released = harness
        .takeover_service
        .release(session.session_id)
        .await?;
    assert_eq!(released.status(), SessionStatus::Active);
    assert!(!released.is_admin_takeover());
    assert_eq!(released.admin_takeover_by(), None);

    // Both transitions left SYSTEM markers in the transcript.
    let messages = harness
        .message_service
        .session_messages(session.session_id)
        .await?;
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == MessageRole::System)
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(system, vec!["admin joined", "admin left"]);

    // And broadcast the matching events.
    assert_eq!(rx.recv().await.unwrap().event_type(), "admin_joined");
    assert_eq!(rx.recv().await.unwrap().event_type(), "admin_left");
    Ok(())
}

#[tokio::test]
async fn test_concurrent_takeover_has_one_winner() -> Result<(), Error> {
    let harness = MemoryHarness::new();
    let session = seed_session(&harness, "v1", "s1").await;

    let a = harness.takeover_service.takeover(session.session_id, "admin-a");
    let b = harness.takeover_service.takeover(session.session_id, "admin-b");
    let (result_a, result_b) = tokio::join!(a, b);

    let (winner, loser_result) = if result_a.is_ok() {
        ("admin-a", result_b)
    } else {
        ("admin-b", result_a)
    };
    match loser_result {
        Err(Error::AlreadyTakenOver { owner, .. }) => assert_eq!(owner, winner),
        other => panic!("expected AlreadyTakenOver, got {:?}", other),
    }

    let session = harness
        .session_service
        .get_session(session.session_id)
        .await?;
    assert_eq!(session.admin_takeover_by(), Some(winner));
    Ok(())
}

#[tokio::test]
async fn test_retake_by_same_admin_is_idempotent() -> Result<(), Error> {
    let harness = MemoryHarness::new();
    let session = seed_session(&harness, "v1", "s1").await;

    harness
        .takeover_service
        .takeover(session.session_id, "olga")
        .await?;
    let again = harness
        .takeover_service
        .takeover(session.session_id, "olga")
        .await?;
    assert_eq!(again.admin_takeover_by(), Some("olga"));

    // No duplicate "admin joined" marker.
    let markers = harness
        .message_service
        .session_messages(session.session_id)
        .await?
        .into_iter()
        .filter(|m| m.role == MessageRole::System)
        .count();
    assert_eq!(markers, 1);
    Ok(())
}

#[tokio::test]
async fn test_release_without_takeover_is_noop() -> Result<(), Error> {
    let harness = MemoryHarness::new();
    let session = seed_session(&harness, "v1", "s1").await;

    let released = harness
        .takeover_service
        .release(session.session_id)
        .await?;
    assert_eq!(released.status(), SessionStatus::Active);

    // No "admin left" marker for a no-op release.
    let messages = harness
        .message_service
        .session_messages(session.session_id)
        .await?;
    assert!(messages.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_takeover_of_missing_session_is_not_found() {
    let harness = MemoryHarness::new();
    let err = harness
        .takeover_service
        .takeover(Uuid::new_v4(), "olga")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_takeover_reactivates_ended_session() -> Result<(), Error> {
    let harness = MemoryHarness::new();
    let session = seed_session(&harness, "v1", "s1").await;
    harness
        .takeover_service
        .end_session(session.session_id)
        .await?;

    let taken = harness
        .takeover_service
        .takeover(session.session_id, "olga")
        .await?;
    assert_eq!(taken.status(), SessionStatus::AdminActive);

    let released = harness
        .takeover_service
        .release(session.session_id)
        .await?;
    assert_eq!(released.status(), SessionStatus::Active);
    Ok(())
}

#[tokio::test]
async fn test_admin_message_persists_and_broadcasts() -> Result<(), Error> {
    let harness = MemoryHarness::new();
    let session = seed_session(&harness, "v1", "s1").await;
    let (_, mut rx) = harness.hub.subscribe(Some(session.session_id));

    let message = harness
        .takeover_service
        .send_admin_message(session.session_id, "Hi, Olga here")
        .await?;
    assert_eq!(message.role, MessageRole::Admin);

    let event = rx.recv().await.unwrap();
    assert_eq!(event.event_type(), "new_message");
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["message"]["role"], "ADMIN");
    // Admin messages carry no origin token; nothing to echo-suppress.
    assert!(value.get("originToken").is_none());

    let err = harness
        .takeover_service
        .send_admin_message(Uuid::new_v4(), "nobody home")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn test_idle_sweep_reaps_only_ai_owned_sessions() -> Result<(), Error> {
    let harness = MemoryHarness::new();
    let idle = seed_session(&harness, "v1", "s1").await;
    let held = seed_session(&harness, "v2", "s2").await;
    harness
        .takeover_service
        .takeover(held.session_id, "olga")
        .await?;

    let stale = Utc::now() - Duration::minutes(90);
    harness.session_repo.backdate_activity(idle.session_id, stale).await;
    harness.session_repo.backdate_activity(held.session_id, stale).await;

    let repo: Arc<dyn ChatSessionRepository> = harness.session_repo.clone();
    let marked = run_idle_sweep(&repo, Duration::minutes(30)).await?;
    assert_eq!(marked, 1);

    assert_eq!(
        harness
            .session_service
            .get_session(idle.session_id)
            .await?
            .status(),
        SessionStatus::Abandoned
    );
    // The admin's session is live by definition.
    assert_eq!(
        harness
            .session_service
            .get_session(held.session_id)
            .await?
            .status(),
        SessionStatus::AdminActive
    );

    // A returning visitor reactivates the abandoned session.
    let resolved = harness
        .session_service
        .get_or_create_session("v1", "s1", "/", "ru")
        .await?;
    assert_eq!(resolved.session.status(), SessionStatus::Active);
    Ok(())
}
