use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{QuizEntity, QuizListItemEntity, SessionEntity},
    quiz_store::QuizStore,
    storage::StorageResult,
};

/// Process-local [`QuizStore`] used when no database is configured, and as
/// the backend for service-level tests.
#[derive(Clone, Default)]
pub struct MemoryQuizStore {
    quizzes: Arc<DashMap<Uuid, QuizEntity>>,
    sessions: Arc<DashMap<Uuid, SessionEntity>>,
}

impl MemoryQuizStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl QuizStore for MemoryQuizStore {
    fn save_quiz(&self, quiz: QuizEntity) -> BoxFuture<'static, StorageResult<()>> {
        let quizzes = self.quizzes.clone();
        Box::pin(async move {
            quizzes.insert(quiz.id, quiz);
            Ok(())
        })
    }

    fn find_quiz(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuizEntity>>> {
        let quizzes = self.quizzes.clone();
        Box::pin(async move { Ok(quizzes.get(&id).map(|entry| entry.value().clone())) })
    }

    fn list_quizzes(&self) -> BoxFuture<'static, StorageResult<Vec<QuizListItemEntity>>> {
        let quizzes = self.quizzes.clone();
        Box::pin(async move {
            let mut items: Vec<QuizListItemEntity> = quizzes
                .iter()
                .map(|entry| entry.value().clone().into())
                .collect();
            items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            Ok(items)
        })
    }

    fn save_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let sessions = self.sessions.clone();
        Box::pin(async move {
            sessions.insert(session.id, session);
            Ok(())
        })
    }

    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let sessions = self.sessions.clone();
        Box::pin(async move { Ok(sessions.get(&id).map(|entry| entry.value().clone())) })
    }

    fn delete_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let sessions = self.sessions.clone();
        Box::pin(async move { Ok(sessions.remove(&id).is_some()) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::dao::models::QuestionEntity;

    fn quiz(title: &str) -> QuizEntity {
        QuizEntity {
            id: Uuid::new_v4(),
            title: title.to_owned(),
            description: None,
            time_limit_secs: 10,
            questions: vec![QuestionEntity {
                text: "q".into(),
                options: vec!["a".into(), "b".into()],
                correct_index: 0,
            }],
            created_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn round_trips_quizzes() {
        let store = MemoryQuizStore::new();
        let entity = quiz("capitals");
        let id = entity.id;
        store.save_quiz(entity).await.unwrap();

        let found = store.find_quiz(id).await.unwrap().unwrap();
        assert_eq!(found.title, "capitals");
        assert!(store.find_quiz(Uuid::new_v4()).await.unwrap().is_none());

        let listed = store.list_quizzes().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].question_count, 1);
    }

    #[tokio::test]
    async fn delete_session_reports_presence() {
        let store = MemoryQuizStore::new();
        let id = Uuid::new_v4();
        assert!(!store.delete_session(id).await.unwrap());
    }
}
