use std::time::SystemTime;

use uuid::Uuid;

use crate::{
    dao::models::QuizEntity,
    dto::quiz::{CreateQuizRequest, QuizListItem, QuizSummary},
    error::ServiceError,
    state::SharedState,
};

/// Author a new quiz and persist it.
pub async fn create_quiz(
    state: &SharedState,
    request: CreateQuizRequest,
) -> Result<QuizSummary, ServiceError> {
    let entity = build_quiz_entity(state, request)?;

    let store = state.require_quiz_store().await?;
    store.save_quiz(entity.clone()).await?;

    Ok(entity.into())
}

/// Look up a quiz by id, including its correct answers.
pub async fn get_quiz(state: &SharedState, id: Uuid) -> Result<QuizSummary, ServiceError> {
    let store = state.require_quiz_store().await?;
    let Some(quiz) = store.find_quiz(id).await? else {
        return Err(ServiceError::NotFound(format!("quiz `{id}` not found")));
    };
    Ok(quiz.into())
}

/// List the quiz catalogue.
pub async fn list_quizzes(state: &SharedState) -> Result<Vec<QuizListItem>, ServiceError> {
    let store = state.require_quiz_store().await?;
    let items = store.list_quizzes().await?;
    Ok(items.into_iter().map(Into::into).collect())
}

fn build_quiz_entity(
    state: &SharedState,
    request: CreateQuizRequest,
) -> Result<QuizEntity, ServiceError> {
    let CreateQuizRequest {
        title,
        description,
        time_limit_secs,
        questions,
    } = request;

    if title.trim().is_empty() {
        return Err(ServiceError::InvalidInput(
            "quiz title must not be empty".into(),
        ));
    }

    if questions.is_empty() {
        return Err(ServiceError::InvalidInput(
            "a quiz requires at least one question".into(),
        ));
    }

    let questions = questions
        .into_iter()
        .enumerate()
        .map(|(index, question)| {
            if question.text.trim().is_empty() {
                return Err(ServiceError::InvalidInput(format!(
                    "question {index} has no text"
                )));
            }
            if question.options.len() < 2 {
                return Err(ServiceError::InvalidInput(format!(
                    "question {index} needs at least two options"
                )));
            }
            if question.correct_index >= question.options.len() {
                return Err(ServiceError::InvalidInput(format!(
                    "question {index} marks option {} as correct but only has {} options",
                    question.correct_index,
                    question.options.len()
                )));
            }
            Ok(question.into())
        })
        .collect::<Result<Vec<_>, ServiceError>>()?;

    Ok(QuizEntity {
        id: Uuid::new_v4(),
        title: title.trim().to_owned(),
        description,
        time_limit_secs: time_limit_secs.unwrap_or(state.config().default_time_limit_secs),
        questions,
        created_at: SystemTime::now(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::quiz_store::memory::MemoryQuizStore,
        dto::quiz::QuestionInput,
        state::AppState,
    };

    async fn ready_state() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state
            .install_quiz_store(Arc::new(MemoryQuizStore::new()))
            .await;
        state
    }

    fn request(correct_index: usize) -> CreateQuizRequest {
        CreateQuizRequest {
            title: "Capitals".into(),
            description: None,
            time_limit_secs: Some(20),
            questions: vec![QuestionInput {
                text: "Capital of France?".into(),
                options: vec!["Paris".into(), "Lyon".into()],
                correct_index,
            }],
        }
    }

    #[tokio::test]
    async fn creates_and_finds_a_quiz() {
        let state = ready_state().await;
        let created = create_quiz(&state, request(0)).await.unwrap();
        assert_eq!(created.time_limit_secs, 20);

        let found = get_quiz(&state, created.id).await.unwrap();
        assert_eq!(found.title, "Capitals");
        assert_eq!(found.questions[0].correct_index, 0);

        let listed = list_quizzes(&state).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn rejects_out_of_range_correct_index() {
        let state = ready_state().await;
        let err = create_quiz(&state, request(5)).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn fails_degraded_without_a_store() {
        let state = AppState::new(AppConfig::default());
        let err = create_quiz(&state, request(0)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Degraded));
    }
}
