// src/handlers/auth.rs

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation, user_conflict_message},
    models::user::{LoginRequest, SignUpRequest, User},
    utils::{
        hash::{hash_password, verify_password},
        session::{SessionStore, bearer_token},
    },
};

pub(crate) const USER_SELECT: &str = r#"
    SELECT id, email, username, password, first_name, last_name, rate, created_at
    FROM users
"#;

/// Why an email/username pair cannot be registered, if it cannot.
///
/// Both are checked; a taken username wins over a taken email.
pub(crate) async fn check_existence(
    pool: &SqlitePool,
    email: &str,
    username: &str,
    except_id: Option<i64>,
) -> Result<Option<&'static str>, AppError> {
    let except_id = except_id.unwrap_or(-1);
    let mut error = None;

    let email_taken: Option<i64> =
        sqlx::query_scalar("SELECT id FROM users WHERE email = ? AND id != ?")
            .bind(email)
            .bind(except_id)
            .fetch_optional(pool)
            .await?;
    if email_taken.is_some() {
        error = Some("Email already exist.");
    }

    let username_taken: Option<i64> =
        sqlx::query_scalar("SELECT id FROM users WHERE username = ? AND id != ?")
            .bind(username)
            .bind(except_id)
            .fetch_optional(pool)
            .await?;
    if username_taken.is_some() {
        error = Some("Username already exist.");
    }

    Ok(error)
}

/// Registers a new user.
///
/// A password mismatch overrides a taken email or username.
/// Returns 201 Created on success.
pub async fn signup(
    State(pool): State<SqlitePool>,
    Json(payload): Json<SignUpRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let taken = check_existence(&pool, &payload.email, &payload.username, None).await?;

    if payload.password != payload.password_repeat {
        return Err(AppError::BadRequest("Passwords didn't match.".to_string()));
    }
    if let Some(msg) = taken {
        return Err(AppError::Conflict(msg.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    let id = sqlx::query(
        r#"
        INSERT INTO users (email, username, password, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&payload.email)
    .bind(&payload.username)
    .bind(&hashed_password)
    .bind(chrono::Utc::now())
    .execute(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(user_conflict_message(&e).to_string())
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?
    .last_insert_rowid();

    tracing::info!("Registered user {} ({})", payload.username, id);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": id, "message": "Successful!" })),
    ))
}

/// Authenticates a user by email and opens a session.
///
/// Returns the bearer token for the new session.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(sessions): State<SessionStore>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.validate().is_err() {
        return Err(AppError::BadRequest(
            "Nice try. Input valid data plz.".to_string(),
        ));
    }

    let user: Option<User> = sqlx::query_as(&format!("{USER_SELECT} WHERE email = ?"))
        .bind(&payload.email)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Login DB error: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    let user = user.ok_or(AppError::AuthError("No such user.".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        tracing::warn!("Wrong password for user {}", user.id);
        return Err(AppError::AuthError("Wrong password.".to_string()));
    }

    let token = sessions.open(&user.identity());
    tracing::info!("User {} logged in", user.id);

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "message": "Welcome back!"
    })))
}

/// Ends the caller's session, if there is one. Always succeeds.
pub async fn logout(
    State(sessions): State<SessionStore>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(token) = bearer_token(&headers) {
        sessions.close(token);
    }

    Json(json!({ "message": "Logged out." }))
}
