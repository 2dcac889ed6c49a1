// src/models/user.rs

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("username pattern is valid"));

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// Display name.
    pub name: String,

    /// Unique email address.
    pub email: String,

    /// User role: 'user' or 'admin'.
    pub role: String,

    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// Fields the store needs to create a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(
        length(
            min = 3,
            max = 50,
            message = "Username length must be between 3 and 50 characters."
        ),
        custom(function = validate_username)
    )]
    pub username: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "Name must not be empty."))]
    pub name: String,
    #[validate(email(message = "Email address is not valid."))]
    pub email: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Response for register and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: &'static str,
    pub user: User,
}

fn validate_username(username: &str) -> Result<(), validator::ValidationError> {
    if !USERNAME_PATTERN.is_match(username) {
        return Err(validator::ValidationError::new("username_invalid_characters"));
    }
    Ok(())
}
