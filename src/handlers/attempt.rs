// src/handlers/attempt.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::exam_attempt::{StartAttemptRequest, UpdateAttemptRequest, UserAnswer},
    services::attempt::AttemptService,
    utils::jwt::Claims,
};

/// Starts a new attempt for the current user.
///
/// Returns 201 with the pending attempt, or 400 if the exam does not exist.
pub async fn start_attempt(
    State(attempts): State<Arc<AttemptService>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<StartAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let attempt = attempts
        .start(user_id, req.exam_id)
        .await
        .map_err(|e| match e {
            AppError::NotFound(msg) => AppError::BadRequest(msg),
            other => other,
        })?;

    Ok((StatusCode::CREATED, Json(attempt)))
}

/// Retrieves one of the current user's attempts.
pub async fn get_attempt(
    State(attempts): State<Arc<AttemptService>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = attempts.get_attempt(id, claims.user_id()?).await?;
    Ok(Json(attempt))
}

/// Updates an attempt.
///
/// * `answers` are recorded (last write wins per question).
/// * `completed: true` submits the attempt; repeating it returns the already
///   completed attempt instead of an error.
/// * Client-supplied `score` and `timeTaken` are ignored; both are computed here.
pub async fn update_attempt(
    State(attempts): State<Arc<AttemptService>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let submit = req.completed == Some(true);

    if req.score.is_some() || req.time_taken.is_some() {
        tracing::debug!("Ignoring client-supplied score/timeTaken for attempt {}", id);
    }

    let attempt = attempts.update(id, user_id, req.answers, submit).await?;
    Ok(Json(attempt))
}

/// Records a single answer.
pub async fn record_answer(
    State(attempts): State<Arc<AttemptService>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(answer): Json<UserAnswer>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = attempts
        .record_answer(
            id,
            claims.user_id()?,
            &answer.question_id,
            &answer.selected_option_id,
        )
        .await?;
    Ok(Json(attempt))
}

/// Remaining time of an in-progress attempt. 409 once the attempt is completed.
pub async fn get_timer(
    State(attempts): State<Arc<AttemptService>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let timer = attempts.timer(id, claims.user_id()?).await?;
    Ok(Json(timer))
}

/// Per-question results of a completed attempt, including the correct options.
pub async fn get_review(
    State(attempts): State<Arc<AttemptService>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let review = attempts.review(id, claims.user_id()?).await?;
    Ok(Json(review))
}

/// Lists all attempts of the current user.
pub async fn list_my_attempts(
    State(attempts): State<Arc<AttemptService>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let list = attempts.attempts_for_user(claims.user_id()?).await?;
    Ok(Json(list))
}
