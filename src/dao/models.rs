use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Quiz document persisted by the storage layer: the authored question
/// sequence sessions are snapshotted from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizEntity {
    /// Primary key of the quiz.
    pub id: Uuid,
    /// Display title of the quiz.
    pub title: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Seconds every question of this quiz stays live.
    pub time_limit_secs: u32,
    /// Ordered question sequence.
    pub questions: Vec<QuestionEntity>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
}

/// Single question inside a quiz document. Position in the parent vector is
/// the question order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Question text shown to players.
    pub text: String,
    /// Answer options; at least two.
    pub options: Vec<String>,
    /// Zero-based index of the correct option.
    pub correct_index: usize,
}

/// Summary representation of a quiz used by listing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizListItemEntity {
    /// Primary key of the quiz.
    pub id: Uuid,
    /// Display title of the quiz.
    pub title: String,
    /// Number of questions in the quiz.
    pub question_count: usize,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

impl From<QuizEntity> for QuizListItemEntity {
    fn from(value: QuizEntity) -> Self {
        Self {
            id: value.id,
            title: value.title,
            question_count: value.questions.len(),
            created_at: value.created_at,
        }
    }
}

/// Coarse session status stored alongside the session snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatusEntity {
    /// Lobby, players joining.
    Waiting,
    /// A question is live or its results are shown.
    Active,
    /// All questions played.
    Finished,
}

/// Snapshot of a session persisted after each transition. The in-memory
/// session is the authority; this document exists for inspection and
/// post-game reporting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionEntity {
    /// Primary key of the session.
    pub id: Uuid,
    /// Join PIN, unique among active sessions.
    pub pin: String,
    /// Quiz the question snapshot was taken from.
    pub quiz_id: Uuid,
    /// Coarse lifecycle status.
    pub status: SessionStatusEntity,
    /// Index of the current question while active.
    pub current_question_index: Option<usize>,
    /// Joined players with their cumulative scores, in join order.
    pub players: Vec<PlayerEntity>,
    /// Accepted answers, in creation order.
    pub answers: Vec<AnswerEntity>,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last transition timestamp.
    pub updated_at: SystemTime,
}

/// Player record embedded in the session snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerEntity {
    /// Stable identifier for the player, scoped to the session.
    pub id: Uuid,
    /// Display nickname, unique within the session.
    pub nickname: String,
    /// Cumulative score.
    pub score: u32,
    /// Join timestamp.
    pub joined_at: SystemTime,
}

/// Accepted answer embedded in the session snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerEntity {
    /// Player who submitted the answer.
    pub player_id: Uuid,
    /// Question the answer belongs to.
    pub question_index: usize,
    /// Chosen option index.
    pub option_index: usize,
    /// Seconds elapsed between question start and submission.
    pub time_taken_secs: f64,
    /// Points awarded by the scoring function.
    pub points: u32,
    /// Per-session acceptance order.
    pub order: u64,
}
