use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::session::{LeaderboardRow, PhaseDto, PlayerSummary, QuestionView};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// First frame sent to every SSE subscriber: the state of the session at
/// subscription time. Later frames only carry deltas.
pub struct SessionSnapshotEvent {
    #[serde(flatten)]
    pub phase: PhaseDto,
    pub players: Vec<PlayerSummary>,
    /// Present while a question is live.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
    /// Server-side seconds already elapsed on the live question.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_secs: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a player enters the lobby.
pub struct PlayerJoinedEvent {
    pub player_id: Uuid,
    pub nickname: String,
    pub player_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a question goes live. Carries no correct index.
pub struct QuestionStartEvent {
    #[serde(flatten)]
    pub question: QuestionView,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a player's answer is accepted. Choice and score stay
/// hidden until the question closes.
pub struct PlayerAnsweredEvent {
    pub player_id: Uuid,
    pub question_index: usize,
    pub answer_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a question's answer window freezes.
pub struct QuestionEndEvent {
    pub question_index: usize,
    /// Revealed correct option.
    pub correct_index: usize,
    pub leaderboard: Vec<LeaderboardRow>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast once after the last question's results window.
pub struct GameEndEvent {
    pub leaderboard: Vec<LeaderboardRow>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}
