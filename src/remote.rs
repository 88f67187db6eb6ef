// src/remote.rs

//! HTTP client for the remote exam backend.
//!
//! The backend is optional. Every call here is attempted once; callers
//! decide what a failure means (uploads log and carry on, analysis falls
//! back to local computation).

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use url::Url;
use uuid::Uuid;

use crate::{
    error::AppError,
    grading::scoring::{StudentResult, Tally},
    models::student::StudentInfo,
};

#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
}

/// Analysis payload returned by `GET /exams/{id}/analysis`.
#[derive(Debug, Deserialize)]
pub struct RemoteAnalysis {
    #[serde(default)]
    pub students: Vec<RemoteStudent>,
}

#[derive(Debug, Deserialize)]
pub struct RemoteStudent {
    pub id: Option<String>,
    #[serde(flatten)]
    pub info: StudentInfo,
    pub total_correct: Option<u32>,
    pub total_wrong: Option<u32>,
    pub total_empty: Option<u32>,
    pub total_questions: Option<u32>,
    #[serde(default)]
    pub subject_scores: BTreeMap<String, Tally>,
    #[serde(default)]
    pub topic_scores: BTreeMap<String, Tally>,
}

impl RemoteAnalysis {
    /// Converts backend rows into results so they can be ranked and
    /// summarised the same way as local ones. Per-question answers are not
    /// part of the payload and stay empty.
    pub fn into_results(self) -> Vec<StudentResult> {
        self.students
            .into_iter()
            .enumerate()
            .map(|(index, s)| {
                let position = index + 1;
                let score = s.total_correct.unwrap_or(0);
                let wrong = s.total_wrong.unwrap_or(0);
                let empty = s.total_empty.unwrap_or(0);
                StudentResult {
                    student_id: s
                        .id
                        .as_deref()
                        .and_then(|id| Uuid::parse_str(id).ok())
                        .unwrap_or_else(Uuid::new_v4),
                    student_name: s.info.display_name(position),
                    student_number: s.info.display_number(position),
                    class_name: s.info.class_name(),
                    section: s.info.section(),
                    answers: BTreeMap::new(),
                    score,
                    wrong,
                    empty,
                    total_questions: s.total_questions.unwrap_or(score + wrong + empty),
                    subject_scores: s.subject_scores,
                    topic_scores: s.topic_scores,
                    scored_at: Utc::now(),
                }
            })
            .collect()
    }
}

impl BackendClient {
    pub fn new(mut base_url: Url, timeout: Duration) -> Result<Self, AppError> {
        // relative joins replace the last segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::InternalServerError(format!("Bad backend path '{}': {}", path, e)))
    }

    /// Uploads the answer-key spreadsheet for an exam.
    pub async fn submit_answer_key(&self, exam_id: i64, file_name: &str, bytes: Vec<u8>) -> Result<(), AppError> {
        let url = self.endpoint(&format!("exams/{}/answer-key", exam_id))?;
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name.to_string()));

        tracing::debug!("Submitting answer key for exam {} to {}", exam_id, url);
        self.http
            .post(url)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Uploads a response roster tied to an optical form layout.
    pub async fn submit_responses(
        &self,
        exam_id: i64,
        optical_form_id: i64,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), AppError> {
        let url = self.endpoint(&format!("exams/{}/responses", exam_id))?;
        let form = Form::new()
            .text("optical_form_id", optical_form_id.to_string())
            .part("file", Part::bytes(bytes).file_name(file_name.to_string()));

        tracing::debug!("Submitting responses for exam {} to {}", exam_id, url);
        self.http
            .post(url)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn fetch_analysis(&self, exam_id: i64) -> Result<RemoteAnalysis, AppError> {
        let url = self.endpoint(&format!("exams/{}/analysis", exam_id))?;
        let analysis = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<RemoteAnalysis>()
            .await?;
        Ok(analysis)
    }
}
