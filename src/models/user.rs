use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

lazy_static! {
    // Usernames and passwords may not contain any whitespace.
    static ref NO_WHITESPACE: Regex = Regex::new(r"^\S+$").unwrap();
}

/// A stored account. Never serialized directly; see [`UserProfile`].
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// bcrypt hash, never the plain password.
    pub password_hash: String,
    /// The single currently valid refresh token. Empty means revoked.
    pub refresh_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            refresh_token: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// The public view of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

/// Represents the payload for a new user registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Between 3 and 50 characters, no whitespace.
    #[validate(
        length(min = 3, max = 50),
        regex(path = "NO_WHITESPACE", code = "excludespace")
    )]
    pub username: String,
    #[validate(email, length(min = 10, max = 150))]
    pub email: String,
    /// Between 6 and 50 characters, no whitespace.
    #[validate(
        length(min = 6, max = 50),
        regex(path = "NO_WHITESPACE", code = "excludespace")
    )]
    pub password: String,
}

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email, length(min = 10, max = 150))]
    pub email: String,
    #[validate(length(min = 6, max = 50))]
    pub password: String,
}

/// Full replace of the mutable account fields.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(
        length(min = 3, max = 50),
        regex(path = "NO_WHITESPACE", code = "excludespace")
    )]
    pub username: String,
    #[validate(
        length(min = 6, max = 50),
        regex(path = "NO_WHITESPACE", code = "excludespace")
    )]
    pub password: String,
}
