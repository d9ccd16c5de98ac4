use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::{
        session::{LeaderboardRow, PhaseDto, PlayerSummary, QuestionView},
        sse::{
            GameEndEvent, PlayerAnsweredEvent, PlayerJoinedEvent, QuestionEndEvent,
            QuestionStartEvent, ServerEvent, SessionSnapshotEvent,
        },
    },
    state::{GameSession, SessionPhase, SseHub},
};

const EVENT_SNAPSHOT: &str = "snapshot";
const EVENT_PLAYER_JOINED: &str = "player_joined";
const EVENT_QUESTION_START: &str = "question_start";
const EVENT_PLAYER_ANSWERED: &str = "player_answered";
const EVENT_QUESTION_END: &str = "question_end";
const EVENT_GAME_END: &str = "game_end";

/// Broadcast that a player entered the lobby.
pub fn broadcast_player_joined(hub: &SseHub, player_id: Uuid, nickname: &str, player_count: usize) {
    let payload = PlayerJoinedEvent {
        player_id,
        nickname: nickname.to_owned(),
        player_count,
    };
    send_session_event(hub, EVENT_PLAYER_JOINED, &payload);
}

/// Broadcast that a question went live. The payload never carries the
/// correct index.
pub fn broadcast_question_start(hub: &SseHub, question: QuestionView) {
    let payload = QuestionStartEvent { question };
    send_session_event(hub, EVENT_QUESTION_START, &payload);
}

/// Broadcast that a player's answer was accepted, without revealing the
/// choice or the score delta.
pub fn broadcast_player_answered(
    hub: &SseHub,
    player_id: Uuid,
    question_index: usize,
    answer_count: usize,
) {
    let payload = PlayerAnsweredEvent {
        player_id,
        question_index,
        answer_count,
    };
    send_session_event(hub, EVENT_PLAYER_ANSWERED, &payload);
}

/// Broadcast that a question closed, revealing the correct option and the
/// refreshed leaderboard.
pub fn broadcast_question_end(
    hub: &SseHub,
    question_index: usize,
    correct_index: usize,
    leaderboard: Vec<LeaderboardRow>,
) {
    let payload = QuestionEndEvent {
        question_index,
        correct_index,
        leaderboard,
    };
    send_session_event(hub, EVENT_QUESTION_END, &payload);
}

/// Broadcast the final leaderboard once the session finishes.
pub fn broadcast_game_end(hub: &SseHub, leaderboard: Vec<LeaderboardRow>) {
    let payload = GameEndEvent { leaderboard };
    send_session_event(hub, EVENT_GAME_END, &payload);
}

/// Build the snapshot frame a new subscriber receives before any live event.
pub fn snapshot_event(session: &GameSession) -> Option<ServerEvent> {
    let question = match session.phase() {
        SessionPhase::QuestionLive { index } => session
            .question(index)
            .map(|q| QuestionView::new(index, q, session.time_limit_secs)),
        _ => None,
    };

    let payload = SessionSnapshotEvent {
        phase: PhaseDto::from(session.phase()),
        players: session
            .players()
            .iter()
            .map(|(id, player)| PlayerSummary {
                id: *id,
                nickname: player.nickname.clone(),
                score: player.score,
            })
            .collect(),
        question,
        elapsed_secs: session.elapsed_secs(),
    };

    match ServerEvent::json(Some(EVENT_SNAPSHOT.to_string()), &payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(error = %err, "failed to serialize session snapshot");
            None
        }
    }
}

fn send_session_event(hub: &SseHub, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => hub.broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}
