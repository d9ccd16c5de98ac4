use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use tracing::info;
use uuid::Uuid;

use crate::{error::AppError, services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sessions/{id}/events",
    tag = "sse",
    params(("id" = Uuid, Path, description = "Identifier of the session")),
    responses((status = 200, description = "Session SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream realtime session events, starting with a state snapshot.
pub async fn session_stream(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let Some(handle) = state.session(id) else {
        return Err(AppError::NotFound(format!("session `{id}` not found")));
    };

    let (snapshot, receiver) = sse_service::subscribe_session(&handle).await;
    info!(session_id = %id, "new session SSE connection");
    Ok(sse_service::to_sse_stream(snapshot, receiver))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sessions/{id}/events", get(session_stream))
}
