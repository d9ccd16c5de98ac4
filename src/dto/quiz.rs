use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{QuestionEntity, QuizEntity, QuizListItemEntity},
    dto::format_system_time,
};

/// Payload used to author a new quiz.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Seconds each question stays live; defaults to the server-wide value.
    #[serde(default)]
    #[validate(range(min = 5, max = 300))]
    pub time_limit_secs: Option<u32>,
    #[validate(length(min = 1), nested)]
    pub questions: Vec<QuestionInput>,
}

/// Incoming question definition.
#[derive(Debug, Serialize, Deserialize, ToSchema, Validate)]
pub struct QuestionInput {
    #[validate(length(min = 1))]
    pub text: String,
    #[validate(length(min = 2, max = 8))]
    pub options: Vec<String>,
    /// Zero-based index into `options`.
    pub correct_index: usize,
}

impl From<QuestionInput> for QuestionEntity {
    fn from(value: QuestionInput) -> Self {
        Self {
            text: value.text,
            options: value.options,
            correct_index: value.correct_index,
        }
    }
}

/// Full quiz representation returned to its author.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuizSummary {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub time_limit_secs: u32,
    pub questions: Vec<QuestionSummary>,
    pub created_at: String,
}

/// Question projection including the correct answer, host-facing only.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionSummary {
    pub text: String,
    pub options: Vec<String>,
    pub correct_index: usize,
}

impl From<QuizEntity> for QuizSummary {
    fn from(value: QuizEntity) -> Self {
        Self {
            id: value.id,
            title: value.title,
            description: value.description,
            time_limit_secs: value.time_limit_secs,
            questions: value
                .questions
                .into_iter()
                .map(|q| QuestionSummary {
                    text: q.text,
                    options: q.options,
                    correct_index: q.correct_index,
                })
                .collect(),
            created_at: format_system_time(value.created_at),
        }
    }
}

/// Listing row for the quiz catalogue.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuizListItem {
    pub id: Uuid,
    pub title: String,
    pub question_count: usize,
    pub created_at: String,
}

impl From<QuizListItemEntity> for QuizListItem {
    fn from(value: QuizListItemEntity) -> Self {
        Self {
            id: value.id,
            title: value.title,
            question_count: value.question_count,
            created_at: format_system_time(value.created_at),
        }
    }
}
