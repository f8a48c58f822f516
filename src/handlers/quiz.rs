// src/handlers/quiz.rs

use std::collections::{HashMap, HashSet};

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool, Transaction};
use validator::Validate;

use crate::{
    error::{AppError, is_foreign_key_violation},
    models::{
        question::{Answer, CreateQuestionRequest, PublicAnswer, PublicQuestion, Question},
        quiz::{CreateQuizRequest, Quiz, QuizBoardEntry, QuizRunView, SubmitQuizRequest},
        record::Record,
    },
    scoring::{QuizKey, load_question_keys, score},
    utils::{html::clean_text, session::CurrentUser},
};

async fn fetch_quiz<'e, E>(executor: E, id: i64) -> Result<Quiz, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as(
        "SELECT id, name, description, points, author_id, date FROM quizzes WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))
}

/// Fetches a quiz the caller is allowed to modify.
async fn fetch_own_quiz(pool: &SqlitePool, id: i64, user: &CurrentUser) -> Result<Quiz, AppError> {
    let quiz = fetch_quiz(pool, id).await?;
    if quiz.author_id != user.0.id {
        return Err(AppError::Forbidden(
            "Only the author can modify this quiz".to_string(),
        ));
    }
    Ok(quiz)
}

/// Inserts one question and its answers inside an open transaction.
async fn insert_question(
    tx: &mut Transaction<'_, Sqlite>,
    quiz_id: i64,
    question: &CreateQuestionRequest,
) -> Result<i64, AppError> {
    let question_id = sqlx::query("INSERT INTO questions (quiz_id, value, points) VALUES (?, ?, ?)")
        .bind(quiz_id)
        .bind(clean_text(&question.value))
        .bind(question.points)
        .execute(&mut **tx)
        .await?
        .last_insert_rowid();

    for answer in &question.answers {
        sqlx::query("INSERT INTO answers (question_id, value, correct) VALUES (?, ?, ?)")
            .bind(question_id)
            .bind(clean_text(&answer.value))
            .bind(answer.correct)
            .execute(&mut **tx)
            .await?;
    }

    Ok(question_id)
}

/// Appends an attempt record. A quiz that vanished meanwhile is `NotFound`.
async fn insert_record(conn: &mut SqliteConnection, record: &Record) -> Result<i64, AppError> {
    let result =
        sqlx::query("INSERT INTO records (user_id, quiz_id, date, points) VALUES (?, ?, ?, ?)")
            .bind(record.user_id)
            .bind(record.quiz_id)
            .bind(record.date)
            .bind(record.points)
            .execute(conn)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    AppError::NotFound("Quiz not found".to_string())
                } else {
                    tracing::error!("Failed to insert record: {:?}", e);
                    AppError::InternalServerError(e.to_string())
                }
            })?;

    Ok(result.last_insert_rowid())
}

/// The quiz board: every quiz, newest first.
pub async fn list_quizzes(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let quizzes: Vec<QuizBoardEntry> = sqlx::query_as(
        r#"
        SELECT
            q.id, q.name, q.description, q.points, q.author_id,
            u.username AS author_username, q.date
        FROM quizzes q
        JOIN users u ON q.author_id = u.id
        ORDER BY q.date DESC, q.id DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch quiz board: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(quizzes))
}

/// The quiz-taking view: questions in order, each with its answers.
/// Correct flags are not sent.
pub async fn get_quiz(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, id).await?;

    let questions: Vec<Question> = sqlx::query_as(
        "SELECT id, quiz_id, value, points FROM questions WHERE quiz_id = ? ORDER BY id",
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    let answers: Vec<Answer> = sqlx::query_as(
        r#"
        SELECT a.id, a.question_id, a.value, a.correct
        FROM answers a
        JOIN questions q ON a.question_id = q.id
        WHERE q.quiz_id = ?
        ORDER BY a.id
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    let mut by_question: HashMap<i64, Vec<PublicAnswer>> = HashMap::new();
    for answer in answers {
        by_question
            .entry(answer.question_id)
            .or_default()
            .push(answer.into());
    }

    let tasks = questions
        .into_iter()
        .map(|question| PublicQuestion {
            id: question.id,
            answers: by_question.remove(&question.id).unwrap_or_default(),
            value: question.value,
            points: question.points,
        })
        .collect();

    Ok(Json(QuizRunView { quiz, tasks }))
}

/// Scores an attempt and stores it as a new record.
///
/// Unknown answer ids are ignored by the scorer; an empty submission is valid.
pub async fn submit_quiz(
    State(pool): State<SqlitePool>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let checked: HashSet<i64> = req.answers.into_iter().collect();

    // Quiz row, structure and the new record come from one transaction.
    let mut tx = pool.begin().await?;
    let quiz = fetch_quiz(&mut *tx, id).await?;
    let key = QuizKey {
        points: quiz.points,
        questions: load_question_keys(&mut *tx, quiz.id).await?,
    };
    let points = score(&key, &checked);

    let mut record = Record {
        id: 0,
        user_id: user.0.id,
        quiz_id: quiz.id,
        date: chrono::Utc::now(),
        points,
    };
    record.id = insert_record(&mut *tx, &record).await?;
    tx.commit().await?;

    tracing::info!(
        "User {} scored {} in quiz {} (record {})",
        user.0.id,
        points,
        quiz.id,
        record.id
    );

    Ok(Json(json!({
        "record": record,
        "points": points,
        "message": format!("You scored {} in {} quiz!", points, quiz.name),
    })))
}

/// Authors a new quiz, with its questions and answers, in one transaction.
/// The caller becomes the author.
pub async fn create_quiz(
    State(pool): State<SqlitePool>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let mut tx = pool.begin().await?;

    let quiz_id = sqlx::query(
        "INSERT INTO quizzes (name, description, points, author_id, date) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(clean_text(&payload.name))
    .bind(clean_text(&payload.description))
    .bind(payload.points)
    .bind(user.0.id)
    .bind(chrono::Utc::now())
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    for question in &payload.questions {
        insert_question(&mut tx, quiz_id, question).await?;
    }

    tx.commit().await?;

    tracing::info!(
        "User {} created quiz {} with {} questions",
        user.0.id,
        quiz_id,
        payload.questions.len()
    );

    Ok((StatusCode::CREATED, Json(json!({ "id": quiz_id }))))
}

/// Appends one question to an existing quiz. Author only.
pub async fn add_question(
    State(pool): State<SqlitePool>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let quiz = fetch_own_quiz(&pool, id, &user).await?;

    let mut tx = pool.begin().await?;
    let question_id = insert_question(&mut tx, quiz.id, &payload).await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": question_id }))))
}

/// Deletes a quiz. Author only.
/// Questions, answers and records are removed by the schema's cascades.
pub async fn delete_quiz(
    State(pool): State<SqlitePool>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_own_quiz(&pool, id, &user).await?;

    let result = sqlx::query("DELETE FROM quizzes WHERE id = ?")
        .bind(quiz.id)
        .execute(&pool)
        .await?;

    // Deleted concurrently between the lookup and here.
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    tracing::info!("User {} deleted quiz {}", user.0.id, quiz.id);

    Ok(StatusCode::NO_CONTENT)
}
