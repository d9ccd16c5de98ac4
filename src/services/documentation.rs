use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Quizdash Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::quiz::create_quiz,
        crate::routes::quiz::list_quizzes,
        crate::routes::quiz::get_quiz,
        crate::routes::session::create_session,
        crate::routes::session::get_session,
        crate::routes::session::get_session_by_pin,
        crate::routes::session::join_session,
        crate::routes::session::start_session,
        crate::routes::session::submit_answer,
        crate::routes::session::end_question,
        crate::routes::session::advance_session,
        crate::routes::session::session_leaderboard,
        crate::routes::sse::session_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::quiz::CreateQuizRequest,
            crate::dto::quiz::QuestionInput,
            crate::dto::quiz::QuizSummary,
            crate::dto::quiz::QuestionSummary,
            crate::dto::quiz::QuizListItem,
            crate::dto::session::CreateSessionRequest,
            crate::dto::session::JoinSessionRequest,
            crate::dto::session::SubmitAnswerRequest,
            crate::dto::session::EndQuestionRequest,
            crate::dto::session::PhaseDto,
            crate::dto::session::SessionSummary,
            crate::dto::session::PlayerSummary,
            crate::dto::session::JoinResponse,
            crate::dto::session::AnswerAck,
            crate::dto::session::LeaderboardRow,
            crate::dto::session::LeaderboardResponse,
            crate::dto::sse::SessionSnapshotEvent,
            crate::dto::sse::PlayerJoinedEvent,
            crate::dto::sse::QuestionStartEvent,
            crate::dto::sse::PlayerAnsweredEvent,
            crate::dto::sse::QuestionEndEvent,
            crate::dto::sse::GameEndEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "quiz", description = "Quiz authoring and lookup"),
        (name = "session", description = "Session lifecycle and gameplay"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
