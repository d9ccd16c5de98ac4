use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::quiz::{CreateQuizRequest, QuizListItem, QuizSummary},
    error::AppError,
    services::quiz_service,
    state::SharedState,
};

/// Routes handling quiz authoring and lookup.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/quizzes", post(create_quiz).get(list_quizzes))
        .route("/quizzes/{id}", get(get_quiz))
}

/// Author a new quiz and persist it.
#[utoipa::path(
    post,
    path = "/quizzes",
    tag = "quiz",
    request_body = CreateQuizRequest,
    responses(
        (status = 200, description = "Quiz created", body = QuizSummary),
        (status = 400, description = "Invalid quiz definition")
    )
)]
pub async fn create_quiz(
    State(state): State<SharedState>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<Json<QuizSummary>, AppError> {
    payload.validate()?;
    let summary = quiz_service::create_quiz(&state, payload).await?;
    Ok(Json(summary))
}

/// List the quiz catalogue.
#[utoipa::path(
    get,
    path = "/quizzes",
    tag = "quiz",
    responses((status = 200, description = "Quiz catalogue", body = [QuizListItem]))
)]
pub async fn list_quizzes(
    State(state): State<SharedState>,
) -> Result<Json<Vec<QuizListItem>>, AppError> {
    let items = quiz_service::list_quizzes(&state).await?;
    Ok(Json(items))
}

/// Fetch a quiz with its questions and correct answers.
#[utoipa::path(
    get,
    path = "/quizzes/{id}",
    tag = "quiz",
    params(("id" = Uuid, Path, description = "Identifier of the quiz")),
    responses(
        (status = 200, description = "Quiz found", body = QuizSummary),
        (status = 404, description = "Quiz not found")
    )
)]
pub async fn get_quiz(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuizSummary>, AppError> {
    let summary = quiz_service::get_quiz(&state, id).await?;
    Ok(Json(summary))
}
