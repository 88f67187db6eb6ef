// src/handlers/uploads.rs

use std::collections::{BTreeSet, HashMap};
use std::path::Path as FsPath;

use axum::{
    Json,
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use serde::Serialize;

use crate::{
    error::AppError,
    grading::{
        answer_key::read_answer_key,
        parser::{LineError, parse_roster},
        scoring::{Placement, score},
    },
    handlers::exams::find_exam,
    state::AppState,
};

const ANSWER_KEY_EXTENSIONS: &[&str] = &["xlsx", "xls", "ods"];
const ROSTER_EXTENSIONS: &[&str] = &["txt", "dat"];

/// A multipart upload: one `file` part plus plain text fields.
struct UploadForm {
    file_name: String,
    bytes: Vec<u8>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

async fn read_upload(mut multipart: Multipart, allowed: &[&str]) -> Result<UploadForm, AppError> {
    let mut file = None;
    let mut fields = HashMap::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let bytes = field.bytes().await?;
            file = Some((file_name, bytes.to_vec()));
        } else {
            fields.insert(name, field.text().await?);
        }
    }

    let (file_name, bytes) = file.ok_or_else(|| AppError::BadRequest("Missing 'file' part".to_string()))?;

    let extension = FsPath::new(&file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();
    if !allowed.contains(&extension.as_str()) {
        return Err(AppError::UnsupportedFile(format!(
            "Invalid file type '{}'. Allowed: {}",
            file_name,
            allowed.join(", ")
        )));
    }

    Ok(UploadForm {
        file_name,
        bytes,
        fields,
    })
}

#[derive(Debug, Serialize)]
pub struct AnswerKeyUploadResponse {
    pub exam_id: i64,
    pub questions: usize,
    pub subjects: Vec<String>,
    pub remote_synced: bool,
}

/// Replaces the exam's answer key with the uploaded spreadsheet.
///
/// * Rejects files that are not spreadsheets before parsing.
/// * Mirrors the file to the remote backend when configured; a remote
///   failure is logged and the local key is stored regardless.
pub async fn upload_answer_key(
    State(state): State<AppState>,
    Path(exam_id): Path<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    find_exam(state.store.as_ref(), exam_id).await?;
    let upload = read_upload(multipart, ANSWER_KEY_EXTENSIONS).await?;

    let key = read_answer_key(&upload.bytes)?;

    let remote_synced = match &state.backend {
        Some(backend) => match backend.submit_answer_key(exam_id, &upload.file_name, upload.bytes).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Answer key for exam {} not mirrored to backend: {}", exam_id, e);
                false
            }
        },
        None => false,
    };

    state.store.replace_answer_key(exam_id, &key).await?;

    let subjects: BTreeSet<String> = key.entries().iter().map(|e| e.subject.clone()).collect();
    tracing::info!("Stored answer key for exam {} ({} questions)", exam_id, key.len());

    Ok(Json(AnswerKeyUploadResponse {
        exam_id,
        questions: key.len(),
        subjects: subjects.into_iter().collect(),
        remote_synced,
    }))
}

pub async fn get_answer_key(
    State(state): State<AppState>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    find_exam(state.store.as_ref(), exam_id).await?;
    let key = state
        .store
        .answer_key(exam_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Exam {} has no answer key", exam_id)))?;

    Ok(Json(key.into_entries()))
}

#[derive(Debug, Serialize)]
pub struct ResponsesUploadResponse {
    pub exam_id: i64,
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<LineError>,
    pub remote_synced: bool,
}

/// Decodes and scores an uploaded roster against the current answer key.
///
/// Form fields: `file`, `optical_form_id`, optional `class_name` and
/// `section` applied to every student in the file. Bad lines are skipped
/// and listed in `errors`. Results are appended to the exam.
pub async fn upload_responses(
    State(state): State<AppState>,
    Path(exam_id): Path<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    find_exam(state.store.as_ref(), exam_id).await?;
    let upload = read_upload(multipart, ROSTER_EXTENSIONS).await?;

    let optical_form_id = upload
        .text("optical_form_id")
        .ok_or_else(|| AppError::BadRequest("Missing 'optical_form_id' field".to_string()))?
        .parse::<i64>()
        .map_err(|_| AppError::BadRequest("'optical_form_id' must be an integer".to_string()))?;

    if state.store.get_optical_form(optical_form_id).await?.is_none() {
        return Err(AppError::MissingPrerequisite(format!(
            "Optical form {} does not exist",
            optical_form_id
        )));
    }

    let key = state.store.answer_key(exam_id).await?.ok_or_else(|| {
        AppError::MissingPrerequisite("Upload an answer key for this exam before uploading responses".to_string())
    })?;

    let text = match std::str::from_utf8(&upload.bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            tracing::warn!("Roster for exam {} is not valid UTF-8, decoding lossily", exam_id);
            String::from_utf8_lossy(&upload.bytes).into_owned()
        }
    };

    let roster = parse_roster(&text);
    if roster.students.is_empty() && roster.errors.is_empty() {
        return Err(AppError::BadRequest("Roster file contains no answer lines".to_string()));
    }

    let placement = Placement {
        class_name: upload.text("class_name"),
        section: upload.text("section"),
    };
    let results = score(&roster.students, &key, &placement);

    let remote_synced = match &state.backend {
        Some(backend) => match backend
            .submit_responses(exam_id, optical_form_id, &upload.file_name, upload.bytes.clone())
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Responses for exam {} not mirrored to backend: {}", exam_id, e);
                false
            }
        },
        None => false,
    };

    state.store.append_results(exam_id, &results).await?;
    tracing::info!(
        "Imported {} results for exam {} ({} lines skipped)",
        results.len(),
        exam_id,
        roster.errors.len()
    );

    Ok(Json(ResponsesUploadResponse {
        exam_id,
        imported: results.len(),
        skipped: roster.errors.len(),
        errors: roster.errors,
        remote_synced,
    }))
}
