use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, state::state_machine::InvalidTransition};

/// Domain errors raised by session core operations.
///
/// These are caller errors (invalid input or invalid state) plus the single
/// resource-exhaustion case; none of them is retried automatically and none
/// of them leaves a session half-transitioned.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The requested state-machine transition is not valid from the current phase.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// A session cannot start without at least one joined player.
    #[error("cannot start a session with no players")]
    NoPlayers,
    /// Nickname is empty or whitespace-only.
    #[error("nickname must not be empty")]
    InvalidNickname,
    /// Another player in the same session already holds this nickname.
    #[error("nickname `{0}` is already taken")]
    NicknameTaken(String),
    /// Chosen option index is outside the question's option list.
    #[error("option index {option_index} is out of bounds for {option_count} options")]
    InvalidOption {
        /// The rejected option index.
        option_index: usize,
        /// Number of options the question offers.
        option_count: usize,
    },
    /// The player already answered this question; answers are immutable.
    #[error("player already answered question {question_index}")]
    DuplicateAnswer {
        /// Index of the already-answered question.
        question_index: usize,
    },
    /// Submission targets a question that is not currently accepting answers.
    #[error("question {submitted} is not accepting answers")]
    StaleQuestion {
        /// Question index carried by the submission.
        submitted: usize,
    },
    /// Submission references a player that never joined this session.
    #[error("player `{player_id}` is not part of this session")]
    UnknownPlayer {
        /// The unknown player identifier.
        player_id: uuid::Uuid,
    },
    /// No unique PIN could be allocated within the bounded attempt budget.
    #[error("failed to allocate a unique session PIN after {attempts} attempts")]
    GenerationExhausted {
        /// Number of allocation attempts made before giving up.
        attempts: u32,
    },
}

impl SessionError {
    /// Stable machine-readable code carried in the HTTP error body.
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::InvalidTransition(_) => "invalid_transition",
            SessionError::NoPlayers => "no_players",
            SessionError::InvalidNickname => "invalid_nickname",
            SessionError::NicknameTaken(_) => "nickname_taken",
            SessionError::InvalidOption { .. } => "invalid_option",
            SessionError::DuplicateAnswer { .. } => "duplicate_answer",
            SessionError::StaleQuestion { .. } => "stale_question",
            SessionError::UnknownPlayer { .. } => "unknown_player",
            SessionError::GenerationExhausted { .. } => "generation_exhausted",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            SessionError::InvalidNickname | SessionError::InvalidOption { .. } => {
                StatusCode::BAD_REQUEST
            }
            SessionError::InvalidTransition(_)
            | SessionError::NoPlayers
            | SessionError::NicknameTaken(_)
            | SessionError::DuplicateAnswer { .. }
            | SessionError::StaleQuestion { .. } => StatusCode::CONFLICT,
            SessionError::UnknownPlayer { .. } => StatusCode::NOT_FOUND,
            SessionError::GenerationExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// A session core precondition failed.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::Session(SessionError::InvalidTransition(err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
    /// Session core precondition failure, mapped per failure code.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Session(session) => AppError::Session(session),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = match &self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            AppError::Session(session) => (session.status(), session.code()),
        };

        let payload = Json(ErrorBody {
            code,
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
