use std::{sync::Arc, time::Duration};

use tokio::sync::MutexGuard;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::session::{
        AnswerAck, CreateSessionRequest, EndQuestionRequest, JoinSessionRequest, JoinResponse,
        LeaderboardResponse, PhaseDto, QuestionView, SessionSummary, SubmitAnswerRequest,
    },
    error::ServiceError,
    services::sse_events,
    state::{GameSession, SessionHandle, SessionPhase, SharedState},
};

/// Host a new session for an existing quiz.
///
/// The quiz's questions are copied into the session at this point; later
/// edits to the quiz never reach a running session.
pub async fn create_session(
    state: &SharedState,
    request: CreateSessionRequest,
) -> Result<SessionSummary, ServiceError> {
    let store = state.require_quiz_store().await?;
    let Some(quiz) = store.find_quiz(request.quiz_id).await? else {
        return Err(ServiceError::NotFound(format!(
            "quiz `{}` not found",
            request.quiz_id
        )));
    };

    if quiz.questions.is_empty() {
        return Err(ServiceError::InvalidState(format!(
            "quiz `{}` has no questions",
            quiz.id
        )));
    }

    let quiz_id = quiz.id;
    let time_limit_secs = quiz.time_limit_secs;
    let questions = quiz.questions.into_iter().map(Into::into).collect();

    let handle = state
        .register_session(|pin| GameSession::new(quiz_id, pin, time_limit_secs, questions))?;

    let session = handle.session.lock().await;
    info!(session_id = %session.id, pin = %session.pin, %quiz_id, "session created");
    persist_session(state, &session).await;
    Ok((&*session).into())
}

/// Session summary by id.
pub async fn get_session(state: &SharedState, id: Uuid) -> Result<SessionSummary, ServiceError> {
    let handle = require_session(state, id)?;
    let session = handle.session.lock().await;
    Ok((&*session).into())
}

/// Session summary by join PIN.
pub async fn get_session_by_pin(
    state: &SharedState,
    pin: &str,
) -> Result<SessionSummary, ServiceError> {
    let Some(handle) = state.session_by_pin(pin) else {
        return Err(ServiceError::NotFound(format!(
            "no active session with PIN `{pin}`"
        )));
    };
    let session = handle.session.lock().await;
    Ok((&*session).into())
}

/// Join a session lobby under the submitted nickname.
pub async fn join_session(
    state: &SharedState,
    id: Uuid,
    request: JoinSessionRequest,
) -> Result<JoinResponse, ServiceError> {
    let handle = require_session(state, id)?;
    let mut session = handle.session.lock().await;

    if session.phase() != SessionPhase::Waiting {
        return Err(ServiceError::InvalidState(
            "players can only join before the game starts".into(),
        ));
    }

    let (player_id, player) = session.join(&request.nickname)?;
    sse_events::broadcast_player_joined(
        &handle.sse,
        player_id,
        &player.nickname,
        session.players().len(),
    );
    persist_session(state, &session).await;

    Ok(JoinResponse {
        player_id,
        nickname: player.nickname,
        session_id: id,
    })
}

/// Start the game: first question goes live and its timer is armed.
pub async fn start_session(state: &SharedState, id: Uuid) -> Result<PhaseDto, ServiceError> {
    let handle = require_session(state, id)?;
    let mut session = handle.session.lock().await;

    let phase = session.start()?;
    announce_live_question(state, &handle, &session, phase);
    persist_session(state, &session).await;
    Ok(phase.into())
}

/// Record a player's answer to the live question.
///
/// The elapsed time is measured on the server clock from the question-start
/// instant; the request carries no timing information.
pub async fn submit_answer(
    state: &SharedState,
    id: Uuid,
    request: SubmitAnswerRequest,
) -> Result<AnswerAck, ServiceError> {
    let handle = require_session(state, id)?;
    let mut session = handle.session.lock().await;

    let elapsed = session.elapsed_secs().unwrap_or_default();
    let answer = session.submit_answer(
        request.player_id,
        request.question_index,
        request.option_index,
        elapsed,
    )?;

    sse_events::broadcast_player_answered(
        &handle.sse,
        request.player_id,
        request.question_index,
        session.answer_count(request.question_index),
    );

    Ok(AnswerAck::accepted(request.question_index, &answer))
}

/// Freeze the live question's answer window at the host's request.
pub async fn end_question(
    state: &SharedState,
    id: Uuid,
    request: EndQuestionRequest,
) -> Result<PhaseDto, ServiceError> {
    let handle = require_session(state, id)?;
    let mut session = handle.session.lock().await;

    let phase = close_question(&handle, &mut session, request.question_index)?;
    persist_session(state, &session).await;
    Ok(phase.into())
}

/// Leave the results window: next question goes live, or the session ends.
pub async fn advance(state: &SharedState, id: Uuid) -> Result<PhaseDto, ServiceError> {
    let handle = require_session(state, id)?;
    let mut session = handle.session.lock().await;

    let phase = session.advance()?;
    match phase {
        SessionPhase::QuestionLive { .. } => {
            announce_live_question(state, &handle, &session, phase);
        }
        SessionPhase::Finished => {
            let leaderboard = session.leaderboard().into_iter().map(Into::into).collect();
            sse_events::broadcast_game_end(&handle.sse, leaderboard);
            info!(session_id = %session.id, "session finished");
        }
        _ => {}
    }
    persist_session(state, &session).await;
    Ok(phase.into())
}

/// Current leaderboard of a session.
pub async fn leaderboard(
    state: &SharedState,
    id: Uuid,
) -> Result<LeaderboardResponse, ServiceError> {
    let handle = require_session(state, id)?;
    let session = handle.session.lock().await;

    Ok(LeaderboardResponse {
        session_id: id,
        phase: session.phase().into(),
        entries: session.leaderboard().into_iter().map(Into::into).collect(),
    })
}

fn require_session(state: &SharedState, id: Uuid) -> Result<Arc<SessionHandle>, ServiceError> {
    state
        .session(id)
        .ok_or_else(|| ServiceError::NotFound(format!("session `{id}` not found")))
}

/// Broadcast a freshly live question and arm its expiry timer. Called with
/// the session lock held so the broadcast lands before any answer event.
fn announce_live_question(
    state: &SharedState,
    handle: &Arc<SessionHandle>,
    session: &GameSession,
    phase: SessionPhase,
) {
    let SessionPhase::QuestionLive { index } = phase else {
        return;
    };
    let Some(question) = session.question(index) else {
        return;
    };

    sse_events::broadcast_question_start(
        &handle.sse,
        QuestionView::new(index, question, session.time_limit_secs),
    );
    spawn_question_timer(
        state.clone(),
        session.id,
        index,
        Duration::from_secs(u64::from(session.time_limit_secs)),
    );
}

/// Close the question at `index` and broadcast the reveal.
///
/// Transition validation inside the state machine makes this idempotent
/// under the host/timer race: whichever caller loses gets an error and no
/// second `question_end` event is emitted.
fn close_question(
    handle: &Arc<SessionHandle>,
    session: &mut MutexGuard<'_, GameSession>,
    index: usize,
) -> Result<SessionPhase, ServiceError> {
    let phase = session.end_question(index)?;

    // end_question only succeeds while `index` is the live question.
    let correct_index = session
        .question(index)
        .map(|q| q.correct_index)
        .unwrap_or_default();
    let leaderboard = session.leaderboard().into_iter().map(Into::into).collect();
    sse_events::broadcast_question_end(&handle.sse, index, correct_index, leaderboard);
    Ok(phase)
}

/// Detached timer that closes the question when its time limit expires.
///
/// No cancellation bookkeeping: if the host ended the question (or the
/// session moved on) before the timer fires, the transition is rejected and
/// the task exits quietly.
fn spawn_question_timer(state: SharedState, session_id: Uuid, index: usize, limit: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(limit).await;

        let Some(handle) = state.session(session_id) else {
            return;
        };
        let mut session = handle.session.lock().await;

        match close_question(&handle, &mut session, index) {
            Ok(_) => {
                debug!(%session_id, question_index = index, "question closed by timer");
                persist_session(&state, &session).await;
            }
            Err(_) => {
                debug!(
                    %session_id,
                    question_index = index,
                    "question already closed; timer expiry ignored"
                );
            }
        }
    });
}

/// Best-effort persistence of the session snapshot. The in-memory session is
/// the authority; a storage failure is logged and does not fail the request.
async fn persist_session(state: &SharedState, session: &GameSession) {
    let Some(store) = state.quiz_store().await else {
        return;
    };
    if let Err(err) = store.save_session(session.into()).await {
        warn!(session_id = %session.id, error = %err, "failed to persist session snapshot");
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::SystemTime};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{QuestionEntity, QuizEntity},
            quiz_store::{QuizStore, memory::MemoryQuizStore},
        },
        state::AppState,
    };

    async fn state_with_quiz() -> (SharedState, Uuid) {
        let state = AppState::new(AppConfig::default());
        let store = MemoryQuizStore::new();
        let quiz = QuizEntity {
            id: Uuid::new_v4(),
            title: "Maths".into(),
            description: None,
            time_limit_secs: 10,
            questions: vec![
                QuestionEntity {
                    text: "2 + 2?".into(),
                    options: vec!["3".into(), "4".into()],
                    correct_index: 1,
                },
                QuestionEntity {
                    text: "3 * 3?".into(),
                    options: vec!["9".into(), "6".into()],
                    correct_index: 0,
                },
            ],
            created_at: SystemTime::now(),
        };
        let quiz_id = quiz.id;
        store.save_quiz(quiz).await.unwrap();
        state.install_quiz_store(Arc::new(store)).await;
        (state, quiz_id)
    }

    async fn hosted_session(state: &SharedState, quiz_id: Uuid) -> Uuid {
        create_session(state, CreateSessionRequest { quiz_id })
            .await
            .unwrap()
            .id
    }

    fn join_request(nickname: &str) -> JoinSessionRequest {
        JoinSessionRequest {
            nickname: nickname.into(),
        }
    }

    #[tokio::test]
    async fn full_game_flow() {
        let (state, quiz_id) = state_with_quiz().await;
        let session_id = hosted_session(&state, quiz_id).await;

        let alice = join_session(&state, session_id, join_request("alice"))
            .await
            .unwrap();
        let bob = join_session(&state, session_id, join_request("bob"))
            .await
            .unwrap();

        let phase = start_session(&state, session_id).await.unwrap();
        assert_eq!(phase, PhaseDto::QuestionLive { question_index: 0 });

        let ack = submit_answer(
            &state,
            session_id,
            SubmitAnswerRequest {
                player_id: alice.player_id,
                question_index: 0,
                option_index: 1,
            },
        )
        .await
        .unwrap();
        assert!(ack.accepted);

        submit_answer(
            &state,
            session_id,
            SubmitAnswerRequest {
                player_id: bob.player_id,
                question_index: 0,
                option_index: 0,
            },
        )
        .await
        .unwrap();

        let phase = end_question(&state, session_id, EndQuestionRequest { question_index: 0 })
            .await
            .unwrap();
        assert_eq!(phase, PhaseDto::QuestionResults { question_index: 0 });

        let board = leaderboard(&state, session_id).await.unwrap();
        assert_eq!(board.entries[0].nickname, "alice");
        assert_eq!(board.entries[0].rank, 1);
        assert_eq!(board.entries[1].nickname, "bob");
        assert_eq!(board.entries[1].score, 0);

        let phase = advance(&state, session_id).await.unwrap();
        assert_eq!(phase, PhaseDto::QuestionLive { question_index: 1 });
        end_question(&state, session_id, EndQuestionRequest { question_index: 1 })
            .await
            .unwrap();
        let phase = advance(&state, session_id).await.unwrap();
        assert_eq!(phase, PhaseDto::Finished);
    }

    #[tokio::test]
    async fn join_is_rejected_once_started() {
        let (state, quiz_id) = state_with_quiz().await;
        let session_id = hosted_session(&state, quiz_id).await;

        join_session(&state, session_id, join_request("alice"))
            .await
            .unwrap();
        start_session(&state, session_id).await.unwrap();

        let err = join_session(&state, session_id, join_request("bob"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn start_requires_players() {
        let (state, quiz_id) = state_with_quiz().await;
        let session_id = hosted_session(&state, quiz_id).await;

        let err = start_session(&state, session_id).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Session(crate::error::SessionError::NoPlayers)
        ));
    }

    #[tokio::test]
    async fn concurrent_duplicate_submissions_accept_exactly_one() {
        let (state, quiz_id) = state_with_quiz().await;
        let session_id = hosted_session(&state, quiz_id).await;
        let player = join_session(&state, session_id, join_request("alice"))
            .await
            .unwrap();
        start_session(&state, session_id).await.unwrap();

        let request = || SubmitAnswerRequest {
            player_id: player.player_id,
            question_index: 0,
            option_index: 1,
        };
        let first = tokio::spawn({
            let state = state.clone();
            let request = request();
            async move { submit_answer(&state, session_id, request).await }
        });
        let second = tokio::spawn({
            let state = state.clone();
            let request = request();
            async move { submit_answer(&state, session_id, request).await }
        });

        let outcomes = [first.await.unwrap(), second.await.unwrap()];
        let accepted = outcomes.iter().filter(|r| r.is_ok()).count();
        assert_eq!(accepted, 1);

        // Only the single accepted answer scored.
        let board = leaderboard(&state, session_id).await.unwrap();
        assert_eq!(board.entries[0].score, 1000);
    }

    #[tokio::test]
    async fn concurrent_joins_with_same_nickname_accept_exactly_one() {
        let (state, quiz_id) = state_with_quiz().await;
        let session_id = hosted_session(&state, quiz_id).await;

        let spawn_join = || {
            tokio::spawn({
                let state = state.clone();
                async move { join_session(&state, session_id, join_request("alice")).await }
            })
        };
        let outcomes = [
            spawn_join().await.unwrap(),
            spawn_join().await.unwrap(),
        ];
        let accepted = outcomes.iter().filter(|r| r.is_ok()).count();
        assert_eq!(accepted, 1);
    }

    #[tokio::test]
    async fn double_end_question_broadcasts_once() {
        let (state, quiz_id) = state_with_quiz().await;
        let session_id = hosted_session(&state, quiz_id).await;
        join_session(&state, session_id, join_request("alice"))
            .await
            .unwrap();

        let handle = state.session(session_id).unwrap();
        let mut events = handle.sse.subscribe();

        start_session(&state, session_id).await.unwrap();
        end_question(&state, session_id, EndQuestionRequest { question_index: 0 })
            .await
            .unwrap();
        let err = end_question(&state, session_id, EndQuestionRequest { question_index: 0 })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Session(_)));

        let mut question_end_count = 0;
        while let Ok(event) = events.try_recv() {
            if event.event.as_deref() == Some("question_end") {
                question_end_count += 1;
            }
        }
        assert_eq!(question_end_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_closes_the_question_when_time_runs_out() {
        let (state, quiz_id) = state_with_quiz().await;
        let session_id = hosted_session(&state, quiz_id).await;
        join_session(&state, session_id, join_request("alice"))
            .await
            .unwrap();
        start_session(&state, session_id).await.unwrap();

        // Past the 10 second limit.
        tokio::time::sleep(Duration::from_secs(11)).await;

        let handle = state.session(session_id).unwrap();
        let session = handle.session.lock().await;
        assert_eq!(session.phase(), SessionPhase::QuestionResults { index: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn host_end_beats_timer_without_double_close() {
        let (state, quiz_id) = state_with_quiz().await;
        let session_id = hosted_session(&state, quiz_id).await;
        join_session(&state, session_id, join_request("alice"))
            .await
            .unwrap();
        start_session(&state, session_id).await.unwrap();

        end_question(&state, session_id, EndQuestionRequest { question_index: 0 })
            .await
            .unwrap();
        advance(&state, session_id).await.unwrap();

        // Let the leaked question-0 timer fire while question 1 is live; its
        // expiry must not close question 1.
        tokio::time::sleep(Duration::from_secs(11)).await;

        let handle = state.session(session_id).unwrap();
        let session = handle.session.lock().await;
        // Question 1's own timer closed it; the stale question-0 timer
        // changed nothing in between.
        assert_eq!(session.phase(), SessionPhase::QuestionResults { index: 1 });
    }

    #[tokio::test]
    async fn session_questions_are_frozen_at_creation() {
        let (state, quiz_id) = state_with_quiz().await;
        let session_id = hosted_session(&state, quiz_id).await;

        // Rewrite the quiz after the session snapshot was taken.
        let store = state.quiz_store().await.unwrap();
        let mut quiz = store.find_quiz(quiz_id).await.unwrap().unwrap();
        quiz.questions[0].correct_index = 0;
        quiz.questions[0].text = "changed".into();
        store.save_quiz(quiz).await.unwrap();

        let handle = state.session(session_id).unwrap();
        let session = handle.session.lock().await;
        let question = session.question(0).unwrap();
        assert_eq!(question.text, "2 + 2?");
        assert_eq!(question.correct_index, 1);
    }

    #[tokio::test]
    async fn lookup_by_pin_matches_lookup_by_id() {
        let (state, quiz_id) = state_with_quiz().await;
        let created = create_session(&state, CreateSessionRequest { quiz_id })
            .await
            .unwrap();

        let by_pin = get_session_by_pin(&state, &created.pin).await.unwrap();
        assert_eq!(by_pin.id, created.id);

        let err = get_session_by_pin(&state, "000000").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
