// src/handlers/profile.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::exam_attempt::LeaderboardParams,
    services::{leaderboard::compute_leaderboard, stats::user_stats},
    store::Repository,
    utils::jwt::Claims,
};

/// Dashboard statistics of the current user.
pub async fn get_my_stats(
    State(store): State<Arc<dyn Repository>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let stats = user_stats(store.as_ref(), claims.user_id()?).await?;
    Ok(Json(stats))
}

/// Users ranked by average score of their completed attempts.
/// Every ranked user is returned unless `limit` is given.
pub async fn get_leaderboard(
    State(store): State<Arc<dyn Repository>>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let board = compute_leaderboard(store.as_ref(), params.limit).await?;
    Ok(Json(board))
}
