// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{AuthResponse, CreateUserRequest, LoginRequest, NewUser, ROLE_USER, User},
    store::Repository,
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
    },
};

fn auth_response(user: User, config: &Config) -> Result<AuthResponse, AppError> {
    let token = sign_jwt(user.id, &user.role, &config.jwt_secret, config.jwt_expiration)?;
    Ok(AuthResponse {
        token,
        token_type: "Bearer",
        user,
    })
}

/// Registers a new user and logs them in.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created with a token and the user object (excluding password).
pub async fn register(
    State(store): State<Arc<dyn Repository>>,
    State(config): State<Config>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;

    let user = store
        .create_user(NewUser {
            username: payload.username,
            password: hashed_password,
            name: payload.name,
            email: payload.email,
            role: ROLE_USER.to_string(),
        })
        .await?;

    tracing::info!("Registered user {} ({})", user.id, user.username);
    Ok((StatusCode::CREATED, Json(auth_response(user, &config)?)))
}

/// Authenticates a user and returns a JWT token.
pub async fn login(
    State(store): State<Arc<dyn Repository>>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = store
        .get_user_by_username(&payload.username)
        .await?
        .ok_or(AppError::AuthError("Incorrect username".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError("Incorrect password".to_string()));
    }

    Ok(Json(auth_response(user, &config)?))
}

/// Returns the currently authenticated user.
pub async fn me(
    State(store): State<Arc<dyn Repository>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = store
        .get_user(claims.user_id()?)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}
