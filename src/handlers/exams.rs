// src/handlers/exams.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::exam::{CreateExamRequest, Exam},
    store::ExamStore,
};

/// Loads an exam or fails with 404.
pub(crate) async fn find_exam(store: &dyn ExamStore, id: i64) -> Result<Exam, AppError> {
    store
        .get_exam(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Exam {} not found", id)))
}

/// Lists all exams, newest first.
pub async fn list_exams(State(store): State<Arc<dyn ExamStore>>) -> Result<impl IntoResponse, AppError> {
    let exams = store.list_exams().await?;
    Ok(Json(exams))
}

pub async fn create_exam(
    State(store): State<Arc<dyn ExamStore>>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let exam = store.create_exam(payload).await?;
    tracing::info!("Created exam {} ({})", exam.id, exam.name);

    Ok((StatusCode::CREATED, Json(exam)))
}

pub async fn get_exam(
    State(store): State<Arc<dyn ExamStore>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = find_exam(store.as_ref(), id).await?;
    Ok(Json(exam))
}

/// Deletes an exam together with its answer key and results.
pub async fn delete_exam(
    State(store): State<Arc<dyn ExamStore>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !store.delete_exam(id).await? {
        return Err(AppError::NotFound(format!("Exam {} not found", id)));
    }

    tracing::info!("Deleted exam {}", id);
    Ok(StatusCode::NO_CONTENT)
}
