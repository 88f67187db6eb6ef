// src/handlers/analysis.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{error::AppError, grading::ranking::rank, handlers::exams::find_exam, state::AppState};

/// Lists the exam's stored results with exam and class standing,
/// best score first.
pub async fn list_results(
    State(state): State<AppState>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    find_exam(state.store.as_ref(), exam_id).await?;
    let results = state.store.list_results(exam_id).await?;
    Ok(Json(rank(&results)))
}

pub async fn get_result(
    State(state): State<AppState>,
    Path((exam_id, student_id)): Path<(i64, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    find_exam(state.store.as_ref(), exam_id).await?;
    let results = state.store.list_results(exam_id).await?;

    // standing depends on every other result, so rank the whole set
    let ranked = rank(&results)
        .into_iter()
        .find(|r| r.result.student_id == student_id)
        .ok_or_else(|| AppError::NotFound(format!("Result {} not found", student_id)))?;

    Ok(Json(ranked))
}

pub async fn clear_results(
    State(state): State<AppState>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    find_exam(state.store.as_ref(), exam_id).await?;
    let deleted = state.store.clear_results(exam_id).await?;
    tracing::info!("Cleared {} results for exam {}", deleted, exam_id);

    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

/// Exam analysis from the backend, or computed here when it is unreachable.
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    find_exam(state.store.as_ref(), exam_id).await?;
    let analysis = state.analysis.exam_analysis(exam_id).await?;
    Ok(Json(analysis))
}
