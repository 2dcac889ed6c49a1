// src/handlers/exam.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::exam::{ExamListParams, PublicExam},
    services::catalog::{ExamCatalog, ExamFilter},
};

/// Lists exams, optionally filtered by language, level and duration
/// (`short`, `medium`, `long`). The answer key is never included.
pub async fn list_exams(
    State(catalog): State<ExamCatalog>,
    Query(params): Query<ExamListParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ExamFilter::try_from(params)?;
    let exams: Vec<PublicExam> = catalog
        .list_exams(&filter)
        .await?
        .into_iter()
        .map(PublicExam::from)
        .collect();

    Ok(Json(exams))
}

/// Retrieves a single exam by ID.
pub async fn get_exam(
    State(catalog): State<ExamCatalog>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = catalog.get_exam_by_id(id).await?;
    Ok(Json(PublicExam::from(exam)))
}
