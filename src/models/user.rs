// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::utils::session::Identity;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique email, also the login name.
    pub email: String,

    /// Unique username.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub first_name: String,
    pub last_name: String,

    /// Aggregate rating, not maintained by scoring.
    pub rate: f64,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

/// Public part of a profile, shown to other users.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub rate: f64,
}

/// DTO for registration.
#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 64, message = "Email must be at most 64 characters.")
    )]
    pub email: String,
    #[validate(length(
        min = 1,
        max = 150,
        message = "Username length must be between 1 and 150 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
    pub password_repeat: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email, length(max = 64))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for changing the current user's info.
#[derive(Debug, Deserialize, Validate)]
pub struct InfoChangeRequest {
    #[validate(email, length(max = 64))]
    pub email: String,
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
}

/// DTO for changing the current user's password.
#[derive(Debug, Deserialize, Validate)]
pub struct PasswordChangeRequest {
    pub old_password: String,
    #[validate(length(min = 4, max = 128))]
    pub password: String,
    pub password_repeat: String,
}
