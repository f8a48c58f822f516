// src/models/record.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'records' table in the database.
/// One row per quiz attempt; never updated.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub date: chrono::DateTime<chrono::Utc>,
    pub points: f64,
}

/// A record joined with the username and quiz name, for listings.
#[derive(Debug, Serialize, FromRow)]
pub struct RecordEntry {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub quiz_id: i64,
    pub quiz_name: String,
    pub date: chrono::DateTime<chrono::Utc>,
    pub points: f64,
}

/// SELECT list shared by every record listing.
pub(crate) const RECORD_ENTRY_SELECT: &str = r#"
    SELECT
        r.id, r.user_id, u.username, r.quiz_id, q.name AS quiz_name,
        r.date, r.points
    FROM records r
    JOIN users u ON r.user_id = u.id
    JOIN quizzes q ON r.quiz_id = q.id
"#;
