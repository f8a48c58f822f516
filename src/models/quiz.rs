// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::question::{CreateQuestionRequest, PublicQuestion};

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub name: String,
    pub description: String,

    /// Base offset the score starts from.
    pub points: i64,

    pub author_id: i64,
    pub date: chrono::DateTime<chrono::Utc>,
}

/// One row of the quiz board, joined with the author's username.
#[derive(Debug, Serialize, FromRow)]
pub struct QuizBoardEntry {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub points: i64,
    pub author_id: i64,
    pub author_username: String,
    pub date: chrono::DateTime<chrono::Utc>,
}

/// The quiz-taking view: the quiz and its tasks, correctness hidden.
#[derive(Debug, Serialize)]
pub struct QuizRunView {
    pub quiz: Quiz,
    pub tasks: Vec<PublicQuestion>,
}

/// DTO for submitting an attempt: the ids of every checked answer.
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    #[serde(default)]
    pub answers: Vec<i64>,
}

/// DTO for authoring a quiz together with its questions.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 512))]
    pub description: String,
    #[serde(default)]
    #[validate(range(min = -1_000_000, max = 1_000_000))]
    pub points: i64,
    #[serde(default)]
    #[validate(nested)]
    pub questions: Vec<CreateQuestionRequest>,
}
