use mongodb::bson::{Binary, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    AnswerEntity, PlayerEntity, QuestionEntity, QuizEntity, SessionEntity, SessionStatusEntity,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoQuizDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    title: String,
    description: Option<String>,
    time_limit_secs: u32,
    questions: Vec<QuestionEntity>,
    created_at: DateTime,
}

impl From<QuizEntity> for MongoQuizDocument {
    fn from(value: QuizEntity) -> Self {
        Self {
            id: value.id,
            title: value.title,
            description: value.description,
            time_limit_secs: value.time_limit_secs,
            questions: value.questions,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoQuizDocument> for QuizEntity {
    fn from(value: MongoQuizDocument) -> Self {
        Self {
            id: value.id,
            title: value.title,
            description: value.description,
            time_limit_secs: value.time_limit_secs,
            questions: value.questions,
            created_at: value.created_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSessionDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    pin: String,
    quiz_id: Uuid,
    status: SessionStatusEntity,
    current_question_index: Option<usize>,
    players: Vec<MongoPlayerDocument>,
    answers: Vec<AnswerEntity>,
    created_at: DateTime,
    updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlayerDocument {
    id: Uuid,
    nickname: String,
    score: u32,
    joined_at: DateTime,
}

impl From<SessionEntity> for MongoSessionDocument {
    fn from(value: SessionEntity) -> Self {
        Self {
            id: value.id,
            pin: value.pin,
            quiz_id: value.quiz_id,
            status: value.status,
            current_question_index: value.current_question_index,
            players: value
                .players
                .into_iter()
                .map(|p| MongoPlayerDocument {
                    id: p.id,
                    nickname: p.nickname,
                    score: p.score,
                    joined_at: DateTime::from_system_time(p.joined_at),
                })
                .collect(),
            answers: value.answers,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<MongoSessionDocument> for SessionEntity {
    fn from(value: MongoSessionDocument) -> Self {
        Self {
            id: value.id,
            pin: value.pin,
            quiz_id: value.quiz_id,
            status: value.status,
            current_question_index: value.current_question_index,
            players: value
                .players
                .into_iter()
                .map(|p| PlayerEntity {
                    id: p.id,
                    nickname: p.nickname,
                    score: p.score,
                    joined_at: p.joined_at.to_system_time(),
                })
                .collect(),
            answers: value.answers,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_binary(id)}
}
