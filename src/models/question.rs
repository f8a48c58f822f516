// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,

    /// The text content of the question.
    pub value: String,

    /// Weight of the question in the score.
    pub points: i64,
}

/// Represents the 'answers' table in the database.
/// The id doubles as the token a client submits when checking the answer.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Answer {
    pub id: i64,
    pub question_id: i64,
    pub value: String,
    pub correct: bool,
}

/// Answer as sent to a quiz taker (excludes `correct`).
#[derive(Debug, Serialize)]
pub struct PublicAnswer {
    pub id: i64,
    pub value: String,
}

impl From<Answer> for PublicAnswer {
    fn from(answer: Answer) -> Self {
        Self {
            id: answer.id,
            value: answer.value,
        }
    }
}

/// A question with its answers, as sent to a quiz taker.
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub value: String,
    pub points: i64,
    pub answers: Vec<PublicAnswer>,
}

/// DTO for authoring a question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 512))]
    pub value: String,
    #[serde(default = "default_question_points")]
    #[validate(range(min = 0, max = 1_000_000))]
    pub points: i64,
    #[serde(default)]
    #[validate(nested)]
    pub answers: Vec<CreateAnswerRequest>,
}

/// DTO for authoring an answer.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAnswerRequest {
    #[validate(length(min = 1, max = 256))]
    pub value: String,
    #[serde(default)]
    pub correct: bool,
}

fn default_question_points() -> i64 {
    1
}
