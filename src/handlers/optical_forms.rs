// src/handlers/optical_forms.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{error::AppError, models::optical_form::CreateOpticalFormRequest, store::ExamStore};

pub async fn list_optical_forms(
    State(store): State<Arc<dyn ExamStore>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.list_optical_forms().await?))
}

/// Registers a scannable sheet layout that roster uploads can refer to.
pub async fn create_optical_form(
    State(store): State<Arc<dyn ExamStore>>,
    Json(payload): Json<CreateOpticalFormRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(|e| AppError::BadRequest(e.to_string()))?;

    let form = store.create_optical_form(payload).await?;
    tracing::info!("Created optical form {} ({})", form.id, form.name);

    Ok((StatusCode::CREATED, Json(form)))
}

pub async fn get_optical_form(
    State(store): State<Arc<dyn ExamStore>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let form = store
        .get_optical_form(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Optical form {} not found", id)))?;

    Ok(Json(form))
}

pub async fn delete_optical_form(
    State(store): State<Arc<dyn ExamStore>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !store.delete_optical_form(id).await? {
        return Err(AppError::NotFound(format!("Optical form {} not found", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
