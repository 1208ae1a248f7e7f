// src/tasks/idle_reaper.rs
//
// Background sweep that marks AI-owned ACTIVE sessions with stale
// activity as ABANDONED. Admin-owned sessions are never touched; a new
// message on an abandoned session reactivates it through the store.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use chatdesk_common::traits::repository_traits::ChatSessionRepository;
use chatdesk_common::Error;

/// One sweep: everything idle longer than `idle_after` goes ABANDONED.
/// Returns how many sessions were marked.
pub async fn run_idle_sweep(
    session_repo: &Arc<dyn ChatSessionRepository>,
    idle_after: chrono::Duration,
) -> Result<u64, Error> {
    let cutoff = Utc::now() - idle_after;
    let marked = session_repo.mark_abandoned_before(cutoff).await?;
    if marked > 0 {
        info!("marked {} idle session(s) as abandoned", marked);
    } else {
        debug!("idle sweep found nothing to reap");
    }
    Ok(marked)
}

/// Spawn the reaper loop. Sweep failures are logged and the loop keeps
/// going; the task runs for process uptime.
pub fn spawn_idle_reaper(
    session_repo: Arc<dyn ChatSessionRepository>,
    every: Duration,
    idle_after: chrono::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick fires immediately; skip it so a fresh process
        // does not sweep before anything could go idle.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = run_idle_sweep(&session_repo, idle_after).await {
                error!("idle sweep failed: {:?}", e);
            }
        }
    })
}
