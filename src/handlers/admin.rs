// src/handlers/admin.rs

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    error::AppError,
    models::exam::CreateExamRequest,
    services::catalog::ExamCatalog,
    store::Repository,
};

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(
    State(store): State<Arc<dyn Repository>>,
) -> Result<impl IntoResponse, AppError> {
    let users = store.list_users().await?;
    Ok(Json(users))
}

/// Creates a new exam, including its answer key.
/// Admin only.
pub async fn create_exam(
    State(catalog): State<ExamCatalog>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let exam = catalog.create_exam(payload).await?;
    Ok((StatusCode::CREATED, Json(exam)))
}
