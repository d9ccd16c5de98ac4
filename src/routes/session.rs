use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::session::{
        AnswerAck, CreateSessionRequest, EndQuestionRequest, JoinSessionRequest, JoinResponse,
        LeaderboardResponse, PhaseDto, SessionSummary, SubmitAnswerRequest,
    },
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Routes handling the session lifecycle, membership, and answers.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session))
        .route("/sessions/by-pin/{pin}", get(get_session_by_pin))
        .route("/sessions/{id}/players", post(join_session))
        .route("/sessions/{id}/start", post(start_session))
        .route("/sessions/{id}/answers", post(submit_answer))
        .route("/sessions/{id}/question/end", post(end_question))
        .route("/sessions/{id}/advance", post(advance_session))
        .route("/sessions/{id}/leaderboard", get(session_leaderboard))
}

/// Host a new session for an existing quiz.
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "session",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Session created", body = SessionSummary),
        (status = 404, description = "Quiz not found"),
        (status = 503, description = "No unique PIN available")
    )
)]
pub async fn create_session(
    State(state): State<SharedState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<Json<SessionSummary>, AppError> {
    let summary = session_service::create_session(&state, payload).await?;
    Ok(Json(summary))
}

/// Fetch a session summary by id.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    tag = "session",
    params(("id" = Uuid, Path, description = "Identifier of the session")),
    responses(
        (status = 200, description = "Session found", body = SessionSummary),
        (status = 404, description = "Session not found")
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>, AppError> {
    let summary = session_service::get_session(&state, id).await?;
    Ok(Json(summary))
}

/// Resolve a join PIN to its session.
#[utoipa::path(
    get,
    path = "/sessions/by-pin/{pin}",
    tag = "session",
    params(("pin" = String, Path, description = "Join PIN shown by the host")),
    responses(
        (status = 200, description = "Session found", body = SessionSummary),
        (status = 404, description = "No active session with this PIN")
    )
)]
pub async fn get_session_by_pin(
    State(state): State<SharedState>,
    Path(pin): Path<String>,
) -> Result<Json<SessionSummary>, AppError> {
    let summary = session_service::get_session_by_pin(&state, &pin).await?;
    Ok(Json(summary))
}

/// Join a session lobby under a nickname.
#[utoipa::path(
    post,
    path = "/sessions/{id}/players",
    tag = "session",
    params(("id" = Uuid, Path, description = "Identifier of the session")),
    request_body = JoinSessionRequest,
    responses(
        (status = 200, description = "Player joined", body = JoinResponse),
        (status = 409, description = "Nickname taken or game already started")
    )
)]
pub async fn join_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<JoinSessionRequest>,
) -> Result<Json<JoinResponse>, AppError> {
    payload.validate()?;
    let response = session_service::join_session(&state, id, payload).await?;
    Ok(Json(response))
}

/// Start the game.
#[utoipa::path(
    post,
    path = "/sessions/{id}/start",
    tag = "session",
    params(("id" = Uuid, Path, description = "Identifier of the session")),
    responses(
        (status = 200, description = "First question live", body = PhaseDto),
        (status = 409, description = "No players or already started")
    )
)]
pub async fn start_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PhaseDto>, AppError> {
    let phase = session_service::start_session(&state, id).await?;
    Ok(Json(phase))
}

/// Answer the live question.
#[utoipa::path(
    post,
    path = "/sessions/{id}/answers",
    tag = "session",
    params(("id" = Uuid, Path, description = "Identifier of the session")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer accepted", body = AnswerAck),
        (status = 409, description = "Duplicate answer or question no longer live")
    )
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<Json<AnswerAck>, AppError> {
    let ack = session_service::submit_answer(&state, id, payload).await?;
    Ok(Json(ack))
}

/// Freeze the live question's answer window.
#[utoipa::path(
    post,
    path = "/sessions/{id}/question/end",
    tag = "session",
    params(("id" = Uuid, Path, description = "Identifier of the session")),
    request_body = EndQuestionRequest,
    responses(
        (status = 200, description = "Question closed", body = PhaseDto),
        (status = 409, description = "Question already closed")
    )
)]
pub async fn end_question(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EndQuestionRequest>,
) -> Result<Json<PhaseDto>, AppError> {
    let phase = session_service::end_question(&state, id, payload).await?;
    Ok(Json(phase))
}

/// Leave the results window for the next question or the final standings.
#[utoipa::path(
    post,
    path = "/sessions/{id}/advance",
    tag = "session",
    params(("id" = Uuid, Path, description = "Identifier of the session")),
    responses(
        (status = 200, description = "Next phase", body = PhaseDto),
        (status = 409, description = "Not in a results window")
    )
)]
pub async fn advance_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PhaseDto>, AppError> {
    let phase = session_service::advance(&state, id).await?;
    Ok(Json(phase))
}

/// Current leaderboard of the session.
#[utoipa::path(
    get,
    path = "/sessions/{id}/leaderboard",
    tag = "session",
    params(("id" = Uuid, Path, description = "Identifier of the session")),
    responses(
        (status = 200, description = "Leaderboard", body = LeaderboardResponse),
        (status = 404, description = "Session not found")
    )
)]
pub async fn session_leaderboard(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let response = session_service::leaderboard(&state, id).await?;
    Ok(Json(response))
}
