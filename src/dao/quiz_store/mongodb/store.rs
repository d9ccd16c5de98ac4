use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Client, Collection, Database, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoQuizDocument, MongoSessionDocument, doc_id},
};
use crate::dao::{
    models::{QuizEntity, QuizListItemEntity, SessionEntity},
    quiz_store::QuizStore,
    storage::StorageResult,
};

const QUIZ_COLLECTION_NAME: &str = "quizzes";
const SESSION_COLLECTION_NAME: &str = "sessions";

#[derive(Clone)]
pub struct MongoQuizStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoQuizStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let quizzes = database.collection::<mongodb::bson::Document>(QUIZ_COLLECTION_NAME);
        let title_index = mongodb::IndexModel::builder()
            .keys(doc! {"title": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("quiz_title_idx".to_owned()))
                    .build(),
            )
            .build();
        quizzes
            .create_index(title_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: QUIZ_COLLECTION_NAME,
                index: "title",
                source,
            })?;

        // PIN lookups hit the session collection directly when replaying
        // finished sessions.
        let sessions = database.collection::<mongodb::bson::Document>(SESSION_COLLECTION_NAME);
        let pin_index = mongodb::IndexModel::builder()
            .keys(doc! {"pin": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("session_pin_idx".to_owned()))
                    .build(),
            )
            .build();
        sessions
            .create_index(pin_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SESSION_COLLECTION_NAME,
                index: "pin",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn quiz_collection(&self) -> Collection<MongoQuizDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoQuizDocument>(QUIZ_COLLECTION_NAME)
    }

    async fn session_collection(&self) -> Collection<MongoSessionDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoSessionDocument>(SESSION_COLLECTION_NAME)
    }

    async fn save_quiz(&self, quiz: QuizEntity) -> MongoResult<()> {
        let id = quiz.id;
        let document: MongoQuizDocument = quiz.into();
        let collection = self.quiz_collection().await;
        collection
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveQuiz { id, source })?;

        Ok(())
    }

    async fn find_quiz(&self, id: Uuid) -> MongoResult<Option<QuizEntity>> {
        let collection = self.quiz_collection().await;

        let document = collection
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadQuiz { id, source })?;

        Ok(document.map(Into::into))
    }

    async fn list_quizzes(&self) -> MongoResult<Vec<QuizListItemEntity>> {
        let collection = self.quiz_collection().await;

        let documents: Vec<MongoQuizDocument> = collection
            .find(doc! {})
            .await
            .map_err(|source| MongoDaoError::ListQuizzes { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListQuizzes { source })?;

        Ok(documents
            .into_iter()
            .map(|doc| {
                let entity: QuizEntity = doc.into();
                entity.into()
            })
            .collect())
    }

    async fn save_session(&self, session: SessionEntity) -> MongoResult<()> {
        let id = session.id;
        let document: MongoSessionDocument = session.into();
        let collection = self.session_collection().await;
        collection
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveSession { id, source })?;

        Ok(())
    }

    async fn find_session(&self, id: Uuid) -> MongoResult<Option<SessionEntity>> {
        let collection = self.session_collection().await;

        let document = collection
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadSession { id, source })?;

        Ok(document.map(Into::into))
    }

    async fn delete_session(&self, id: Uuid) -> MongoResult<bool> {
        let collection = self.session_collection().await;
        let result = collection
            .delete_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::DeleteSession { id, source })?;
        Ok(result.deleted_count > 0)
    }
}

impl QuizStore for MongoQuizStore {
    fn save_quiz(&self, quiz: QuizEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_quiz(quiz).await.map_err(Into::into) })
    }

    fn find_quiz(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuizEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_quiz(id).await.map_err(Into::into) })
    }

    fn list_quizzes(&self) -> BoxFuture<'static, StorageResult<Vec<QuizListItemEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_quizzes().await.map_err(Into::into) })
    }

    fn save_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_session(session).await.map_err(Into::into) })
    }

    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_session(id).await.map_err(Into::into) })
    }

    fn delete_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_session(id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
