use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::format_system_time,
    state::{
        GameSession, SessionPhase,
        session::{Answer, LeaderboardEntry, Question},
    },
};

/// Payload used to host a new session for an existing quiz.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateSessionRequest {
    /// Quiz to snapshot the questions from.
    pub quiz_id: Uuid,
}

/// Payload used by a player to join a session lobby.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinSessionRequest {
    #[validate(length(min = 1, max = 40))]
    pub nickname: String,
}

/// Payload used by a player to answer the live question.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitAnswerRequest {
    /// Player identifier returned by the join call.
    pub player_id: Uuid,
    /// Question the player believes is live; a mismatch is rejected.
    pub question_index: usize,
    /// Chosen option index.
    pub option_index: usize,
}

/// Payload used by the host to freeze a question's answer window.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct EndQuestionRequest {
    /// Question the host believes is live; a mismatch is rejected.
    pub question_index: usize,
}

/// Lifecycle phase projection exposed to REST/SSE clients.
#[derive(Clone, Copy, Debug, Serialize, ToSchema, PartialEq, Eq)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum PhaseDto {
    /// Lobby, players joining.
    Waiting,
    /// A question is live and accepting answers.
    QuestionLive { question_index: usize },
    /// Correction window after a question closed.
    QuestionResults { question_index: usize },
    /// All questions played.
    Finished,
}

impl From<SessionPhase> for PhaseDto {
    fn from(value: SessionPhase) -> Self {
        match value {
            SessionPhase::Waiting => Self::Waiting,
            SessionPhase::QuestionLive { index } => Self::QuestionLive {
                question_index: index,
            },
            SessionPhase::QuestionResults { index } => Self::QuestionResults {
                question_index: index,
            },
            SessionPhase::Finished => Self::Finished,
        }
    }
}

/// Player-facing question projection. Never carries the correct index while
/// the question is live.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct QuestionView {
    pub question_index: usize,
    pub text: String,
    pub options: Vec<String>,
    /// Seconds players have to answer.
    pub time_limit_secs: u32,
}

impl QuestionView {
    pub fn new(index: usize, question: &Question, time_limit_secs: u32) -> Self {
        Self {
            question_index: index,
            text: question.text.clone(),
            options: question.options.clone(),
            time_limit_secs,
        }
    }
}

/// Public projection of one leaderboard row.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct LeaderboardRow {
    pub player_id: Uuid,
    pub nickname: String,
    pub score: u32,
    /// 1-based position in score-descending order.
    pub rank: u32,
}

impl From<LeaderboardEntry> for LeaderboardRow {
    fn from(value: LeaderboardEntry) -> Self {
        Self {
            player_id: value.player_id,
            nickname: value.nickname,
            score: value.score,
            rank: value.rank,
        }
    }
}

/// Roster row exposed in session summaries.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PlayerSummary {
    pub id: Uuid,
    pub nickname: String,
    pub score: u32,
}

/// Summary returned once a session has been created or looked up.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionSummary {
    pub id: Uuid,
    pub pin: String,
    pub quiz_id: Uuid,
    #[serde(flatten)]
    pub phase: PhaseDto,
    pub question_count: usize,
    pub players: Vec<PlayerSummary>,
    pub created_at: String,
}

impl From<&GameSession> for SessionSummary {
    fn from(session: &GameSession) -> Self {
        Self {
            id: session.id,
            pin: session.pin.clone(),
            quiz_id: session.quiz_id,
            phase: session.phase().into(),
            question_count: session.question_count(),
            players: session
                .players()
                .iter()
                .map(|(id, player)| PlayerSummary {
                    id: *id,
                    nickname: player.nickname.clone(),
                    score: player.score,
                })
                .collect(),
            created_at: format_system_time(session.created_at),
        }
    }
}

/// Response returned to a player that joined a session.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinResponse {
    /// Identifier the player presents on later calls.
    pub player_id: Uuid,
    pub nickname: String,
    pub session_id: Uuid,
}

/// Acknowledgement returned for an accepted answer. Points stay hidden until
/// the question closes.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerAck {
    pub question_index: usize,
    pub option_index: usize,
    pub accepted: bool,
}

impl AnswerAck {
    pub fn accepted(question_index: usize, answer: &Answer) -> Self {
        Self {
            question_index,
            option_index: answer.option_index,
            accepted: true,
        }
    }
}

/// Leaderboard payload returned by the REST endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub phase: PhaseDto,
    pub entries: Vec<LeaderboardRow>,
}
