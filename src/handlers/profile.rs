// src/handlers/profile.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation, user_conflict_message},
    handlers::auth::{USER_SELECT, check_existence},
    models::{
        record::{RECORD_ENTRY_SELECT, RecordEntry},
        user::{InfoChangeRequest, PasswordChangeRequest, PublicUser, User},
    },
    utils::{
        hash::{hash_password, verify_password},
        session::{CurrentUser, SessionStore, SessionToken},
    },
};

async fn fetch_user(pool: &SqlitePool, id: i64) -> Result<User, AppError> {
    sqlx::query_as(&format!("{USER_SELECT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))
}

/// The current user's own profile.
pub async fn get_me(
    State(pool): State<SqlitePool>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let me = fetch_user(&pool, user.0.id).await?;
    Ok(Json(me))
}

/// Another user's public profile together with their records, newest first.
pub async fn get_profile(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = fetch_user(&pool, id).await?;

    let records: Vec<RecordEntry> = sqlx::query_as(&format!(
        "{RECORD_ENTRY_SELECT} WHERE r.user_id = ? ORDER BY r.date DESC, r.id DESC"
    ))
    .bind(id)
    .fetch_all(&pool)
    .await?;

    let public = PublicUser {
        id: user.id,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        rate: user.rate,
    };

    Ok(Json(json!({ "user": public, "records": records })))
}

/// Updates the current user's email, username and names.
/// The session picks up the new identity.
pub async fn change_info(
    State(pool): State<SqlitePool>,
    State(sessions): State<SessionStore>,
    Extension(user): Extension<CurrentUser>,
    Extension(SessionToken(token)): Extension<SessionToken>,
    Json(payload): Json<InfoChangeRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if let Some(msg) =
        check_existence(&pool, &payload.email, &payload.username, Some(user.0.id)).await?
    {
        return Err(AppError::Conflict(msg.to_string()));
    }

    let result = sqlx::query(
        r#"
        UPDATE users
        SET email = ?, username = ?, first_name = ?, last_name = ?
        WHERE id = ?
        "#,
    )
    .bind(&payload.email)
    .bind(&payload.username)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(user.0.id)
    .execute(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(user_conflict_message(&e).to_string())
        } else {
            AppError::from(e)
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let updated = fetch_user(&pool, user.0.id).await?;
    sessions.refresh(&token, &updated.identity());

    Ok(Json(json!({
        "user": updated,
        "message": "Everything was changed. Check it out!"
    })))
}

/// Changes the current user's password and ends the session.
pub async fn change_password(
    State(pool): State<SqlitePool>,
    State(sessions): State<SessionStore>,
    Extension(user): Extension<CurrentUser>,
    Extension(SessionToken(token)): Extension<SessionToken>,
    Json(payload): Json<PasswordChangeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let messed_up = || AppError::BadRequest("You messed up something.".to_string());

    if payload.validate().is_err() || payload.password != payload.password_repeat {
        return Err(messed_up());
    }

    let current = fetch_user(&pool, user.0.id).await?;
    if !verify_password(&payload.old_password, &current.password)? {
        return Err(messed_up());
    }

    let hashed_password = hash_password(&payload.password)?;
    sqlx::query("UPDATE users SET password = ? WHERE id = ?")
        .bind(&hashed_password)
        .bind(current.id)
        .execute(&pool)
        .await?;

    sessions.close(&token);
    tracing::info!("User {} changed password", current.id);

    Ok(Json(json!({
        "message": "Success! You changed password! Try to use it."
    })))
}
