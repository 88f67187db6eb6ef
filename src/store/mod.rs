// src/store/mod.rs

//! Persistence for exams, layouts, booklets and scored results.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::{
    error::AppError,
    grading::{answer_key::AnswerKey, scoring::StudentResult},
    models::{
        exam::{CreateExamRequest, Exam},
        optical_form::{CreateOpticalFormRequest, OpticalForm},
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage contract shared by the Postgres and in-memory stores.
///
/// * An exam has at most one answer key; `replace_answer_key` discards the
///   previous one.
/// * Results are append-only. `list_results` returns them in insertion
///   order, which is the tie-break order for ranking.
/// * Deleting an exam deletes its key and results.
#[async_trait]
pub trait ExamStore: Send + Sync {
    async fn create_exam(&self, req: CreateExamRequest) -> Result<Exam, AppError>;
    async fn list_exams(&self) -> Result<Vec<Exam>, AppError>;
    async fn get_exam(&self, id: i64) -> Result<Option<Exam>, AppError>;
    async fn delete_exam(&self, id: i64) -> Result<bool, AppError>;

    async fn create_optical_form(&self, req: CreateOpticalFormRequest) -> Result<OpticalForm, AppError>;
    async fn list_optical_forms(&self) -> Result<Vec<OpticalForm>, AppError>;
    async fn get_optical_form(&self, id: i64) -> Result<Option<OpticalForm>, AppError>;
    async fn delete_optical_form(&self, id: i64) -> Result<bool, AppError>;

    async fn replace_answer_key(&self, exam_id: i64, key: &AnswerKey) -> Result<(), AppError>;
    async fn answer_key(&self, exam_id: i64) -> Result<Option<AnswerKey>, AppError>;

    async fn append_results(&self, exam_id: i64, results: &[StudentResult]) -> Result<(), AppError>;
    async fn list_results(&self, exam_id: i64) -> Result<Vec<StudentResult>, AppError>;
    async fn clear_results(&self, exam_id: i64) -> Result<u64, AppError>;
}
