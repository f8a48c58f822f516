// src/handlers/record.rs

use axum::{Json, extract::State, response::IntoResponse};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::record::{RECORD_ENTRY_SELECT, RecordEntry},
};

/// Every record, newest first.
pub async fn list_records(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let records: Vec<RecordEntry> =
        sqlx::query_as(&format!("{RECORD_ENTRY_SELECT} ORDER BY r.date DESC, r.id DESC"))
            .fetch_all(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch records: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;

    Ok(Json(records))
}
