use std::time::{Duration, SystemTime};

use tracing::{info, warn};
use uuid::Uuid;

use crate::{dao::models::SessionStatusEntity, state::SharedState};

/// Periodically reclaim sessions nobody touched for the configured TTL.
///
/// Finished and abandoned sessions otherwise pin their PIN and their SSE hub
/// forever. Sessions reaped straight out of the lobby never played, so their
/// persisted snapshot is deleted as well; played sessions keep theirs for
/// post-game reporting.
pub async fn run(state: SharedState) {
    let interval = Duration::from_secs(state.config().reaper_interval_secs);
    let ttl = Duration::from_secs(state.config().session_idle_ttl_secs);

    loop {
        tokio::time::sleep(interval).await;
        sweep(&state, ttl).await;
    }
}

async fn sweep(state: &SharedState, ttl: Duration) {
    let now = SystemTime::now();
    let mut expired: Vec<(Uuid, String, SessionStatusEntity)> = Vec::new();

    // Collect handles first so no registry shard guard is held across an await.
    let handles: Vec<_> = state
        .sessions()
        .iter()
        .map(|entry| entry.value().clone())
        .collect();

    for handle in handles {
        let session = handle.session.lock().await;
        let idle = now
            .duration_since(session.updated_at)
            .unwrap_or(Duration::ZERO);
        if idle >= ttl {
            expired.push((session.id, session.pin.clone(), session.status()));
        }
    }

    for (id, pin, status) in expired {
        state.remove_session(id, &pin);
        info!(session_id = %id, %pin, "reclaimed idle session");

        if status == SessionStatusEntity::Waiting
            && let Some(store) = state.quiz_store().await
            && let Err(err) = store.delete_session(id).await
        {
            warn!(session_id = %id, error = %err, "failed to delete abandoned session record");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::quiz_store::memory::MemoryQuizStore,
        state::{AppState, GameSession},
    };
    use crate::state::session::Question;

    fn one_question() -> Vec<Question> {
        vec![Question {
            text: "q".into(),
            options: vec!["a".into(), "b".into()],
            correct_index: 0,
        }]
    }

    #[tokio::test]
    async fn sweep_removes_only_idle_sessions() {
        let state = AppState::new(AppConfig::default());
        state
            .install_quiz_store(Arc::new(MemoryQuizStore::new()))
            .await;

        let handle = state
            .register_session(|pin| GameSession::new(Uuid::new_v4(), pin, 10, one_question()))
            .unwrap();
        let (id, pin) = {
            let session = handle.session.lock().await;
            (session.id, session.pin.clone())
        };

        // Fresh session survives a sweep with a generous TTL.
        sweep(&state, Duration::from_secs(3600)).await;
        assert!(state.session(id).is_some());

        // Zero TTL reclaims everything.
        sweep(&state, Duration::ZERO).await;
        assert!(state.session(id).is_none());
        assert!(state.session_by_pin(&pin).is_none());
    }
}
