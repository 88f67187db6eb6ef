// src/store/memory.rs

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::RwLock;

use super::ExamStore;
use crate::{
    error::AppError,
    grading::{answer_key::AnswerKey, scoring::StudentResult},
    models::{
        exam::{CreateExamRequest, Exam},
        optical_form::{CreateOpticalFormRequest, OpticalForm},
    },
};

/// Process-local store. Used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    next_exam_id: i64,
    next_form_id: i64,
    exams: BTreeMap<i64, Exam>,
    forms: BTreeMap<i64, OpticalForm>,
    keys: HashMap<i64, AnswerKey>,
    results: HashMap<i64, Vec<StudentResult>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExamStore for MemoryStore {
    async fn create_exam(&self, req: CreateExamRequest) -> Result<Exam, AppError> {
        let mut inner = self.inner.write().await;
        inner.next_exam_id += 1;
        let exam = Exam {
            id: inner.next_exam_id,
            name: req.name,
            description: req.description,
            exam_date: req.exam_date,
            created_at: Utc::now(),
        };
        inner.exams.insert(exam.id, exam.clone());
        Ok(exam)
    }

    async fn list_exams(&self) -> Result<Vec<Exam>, AppError> {
        // newest first, like the Postgres store
        Ok(self.inner.read().await.exams.values().rev().cloned().collect())
    }

    async fn get_exam(&self, id: i64) -> Result<Option<Exam>, AppError> {
        Ok(self.inner.read().await.exams.get(&id).cloned())
    }

    async fn delete_exam(&self, id: i64) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        inner.keys.remove(&id);
        inner.results.remove(&id);
        Ok(inner.exams.remove(&id).is_some())
    }

    async fn create_optical_form(&self, req: CreateOpticalFormRequest) -> Result<OpticalForm, AppError> {
        let mut inner = self.inner.write().await;
        inner.next_form_id += 1;
        let form = OpticalForm {
            id: inner.next_form_id,
            name: req.name,
            fields: Json(req.fields),
            created_at: Utc::now(),
        };
        inner.forms.insert(form.id, form.clone());
        Ok(form)
    }

    async fn list_optical_forms(&self) -> Result<Vec<OpticalForm>, AppError> {
        Ok(self.inner.read().await.forms.values().cloned().collect())
    }

    async fn get_optical_form(&self, id: i64) -> Result<Option<OpticalForm>, AppError> {
        Ok(self.inner.read().await.forms.get(&id).cloned())
    }

    async fn delete_optical_form(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.inner.write().await.forms.remove(&id).is_some())
    }

    async fn replace_answer_key(&self, exam_id: i64, key: &AnswerKey) -> Result<(), AppError> {
        self.inner.write().await.keys.insert(exam_id, key.clone());
        Ok(())
    }

    async fn answer_key(&self, exam_id: i64) -> Result<Option<AnswerKey>, AppError> {
        Ok(self.inner.read().await.keys.get(&exam_id).cloned())
    }

    async fn append_results(&self, exam_id: i64, results: &[StudentResult]) -> Result<(), AppError> {
        self.inner
            .write()
            .await
            .results
            .entry(exam_id)
            .or_default()
            .extend_from_slice(results);
        Ok(())
    }

    async fn list_results(&self, exam_id: i64) -> Result<Vec<StudentResult>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .results
            .get(&exam_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn clear_results(&self, exam_id: i64) -> Result<u64, AppError> {
        let removed = self.inner.write().await.results.remove(&exam_id);
        Ok(removed.map(|r| r.len() as u64).unwrap_or(0))
    }
}
