// src/store/postgres.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, types::Json};
use uuid::Uuid;

use super::ExamStore;
use crate::{
    error::AppError,
    grading::{
        Choice,
        answer_key::{AnswerKey, AnswerKeyEntry},
        scoring::{StudentResult, Tally},
    },
    models::{
        exam::{CreateExamRequest, Exam},
        optical_form::{CreateOpticalFormRequest, OpticalForm},
    },
};

/// Postgres caps one statement at this many bind parameters.
const BIND_LIMIT: usize = 65_535;
const ANSWER_KEY_BINDS_PER_ROW: usize = 5;
const RESULT_BINDS_PER_ROW: usize = 14;

/// Splits `rows` so that no multi-row INSERT exceeds the bind limit.
fn insert_batches<T>(rows: &[T], binds_per_row: usize) -> std::slice::Chunks<'_, T> {
    rows.chunks((BIND_LIMIT / binds_per_row).max(1))
}

/// Postgres-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct AnswerKeyRow {
    question_number: i32,
    correct_answer: String,
    subject: String,
    topic: String,
}

#[derive(FromRow)]
struct StudentResultRow {
    student_id: String,
    student_name: String,
    student_number: String,
    class_name: Option<String>,
    section: Option<String>,
    answers: Json<BTreeMap<u32, Choice>>,
    score: i32,
    wrong: i32,
    empty: i32,
    total_questions: i32,
    subject_scores: Json<BTreeMap<String, Tally>>,
    topic_scores: Json<BTreeMap<String, Tally>>,
    scored_at: DateTime<Utc>,
}

impl TryFrom<StudentResultRow> for StudentResult {
    type Error = AppError;

    fn try_from(row: StudentResultRow) -> Result<Self, Self::Error> {
        let student_id = Uuid::parse_str(&row.student_id)
            .map_err(|e| AppError::InternalServerError(format!("Corrupt student id '{}': {}", row.student_id, e)))?;

        Ok(StudentResult {
            student_id,
            student_name: row.student_name,
            student_number: row.student_number,
            class_name: row.class_name,
            section: row.section,
            answers: row.answers.0,
            score: row.score.max(0) as u32,
            wrong: row.wrong.max(0) as u32,
            empty: row.empty.max(0) as u32,
            total_questions: row.total_questions.max(0) as u32,
            subject_scores: row.subject_scores.0,
            topic_scores: row.topic_scores.0,
            scored_at: row.scored_at,
        })
    }
}

#[async_trait]
impl ExamStore for PgStore {
    async fn create_exam(&self, req: CreateExamRequest) -> Result<Exam, AppError> {
        let exam = sqlx::query_as::<_, Exam>(
            r#"
            INSERT INTO exams (name, description, exam_date)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, exam_date, created_at
            "#,
        )
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.exam_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create exam: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(exam)
    }

    async fn list_exams(&self) -> Result<Vec<Exam>, AppError> {
        let exams = sqlx::query_as::<_, Exam>(
            "SELECT id, name, description, exam_date, created_at FROM exams ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(exams)
    }

    async fn get_exam(&self, id: i64) -> Result<Option<Exam>, AppError> {
        let exam = sqlx::query_as::<_, Exam>(
            "SELECT id, name, description, exam_date, created_at FROM exams WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(exam)
    }

    async fn delete_exam(&self, id: i64) -> Result<bool, AppError> {
        // answer keys and results cascade
        let result = sqlx::query("DELETE FROM exams WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_optical_form(&self, req: CreateOpticalFormRequest) -> Result<OpticalForm, AppError> {
        let form = sqlx::query_as::<_, OpticalForm>(
            r#"
            INSERT INTO optical_forms (name, fields)
            VALUES ($1, $2)
            RETURNING id, name, fields, created_at
            "#,
        )
        .bind(&req.name)
        .bind(Json(&req.fields))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create optical form: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(form)
    }

    async fn list_optical_forms(&self) -> Result<Vec<OpticalForm>, AppError> {
        let forms = sqlx::query_as::<_, OpticalForm>(
            "SELECT id, name, fields, created_at FROM optical_forms ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(forms)
    }

    async fn get_optical_form(&self, id: i64) -> Result<Option<OpticalForm>, AppError> {
        let form = sqlx::query_as::<_, OpticalForm>(
            "SELECT id, name, fields, created_at FROM optical_forms WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(form)
    }

    async fn delete_optical_form(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM optical_forms WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn replace_answer_key(&self, exam_id: i64, key: &AnswerKey) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM answer_key_entries WHERE exam_id = $1")
            .bind(exam_id)
            .execute(&mut *tx)
            .await?;

        for batch in insert_batches(key.entries(), ANSWER_KEY_BINDS_PER_ROW) {
            let mut query_builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO answer_key_entries (exam_id, question_number, correct_answer, subject, topic) ",
            );
            query_builder.push_values(batch, |mut b, entry| {
                b.push_bind(exam_id)
                    .push_bind(entry.question_number as i32)
                    .push_bind(entry.correct_answer.to_string())
                    .push_bind(&entry.subject)
                    .push_bind(&entry.topic);
            });
            query_builder.build().execute(&mut *tx).await.map_err(|e| {
                tracing::error!("Failed to store answer key for exam {}: {:?}", exam_id, e);
                AppError::InternalServerError(e.to_string())
            })?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn answer_key(&self, exam_id: i64) -> Result<Option<AnswerKey>, AppError> {
        let rows = sqlx::query_as::<_, AnswerKeyRow>(
            r#"
            SELECT question_number, correct_answer, subject, topic
            FROM answer_key_entries
            WHERE exam_id = $1
            ORDER BY question_number
            "#,
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let entries = rows
            .into_iter()
            .map(|row| -> Result<AnswerKeyEntry, AppError> {
                let correct_answer = row
                    .correct_answer
                    .chars()
                    .next()
                    .and_then(Choice::from_char)
                    .ok_or_else(|| {
                        AppError::InternalServerError(format!(
                            "Corrupt answer '{}' for question {}",
                            row.correct_answer, row.question_number
                        ))
                    })?;
                Ok(AnswerKeyEntry {
                    question_number: row.question_number as u32,
                    correct_answer,
                    subject: row.subject,
                    topic: row.topic,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        let key = AnswerKey::new(entries).map_err(|e| AppError::InternalServerError(e.to_string()))?;
        Ok(Some(key))
    }

    async fn append_results(&self, exam_id: i64, results: &[StudentResult]) -> Result<(), AppError> {
        if results.is_empty() {
            return Ok(());
        }

        // one transaction so a file is stored whole or not at all
        let mut tx = self.pool.begin().await?;

        for batch in insert_batches(results, RESULT_BINDS_PER_ROW) {
            let mut query_builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO student_results (exam_id, student_id, student_name, student_number, class_name, section, \
                 answers, score, wrong, empty, total_questions, subject_scores, topic_scores, scored_at) ",
            );
            query_builder.push_values(batch, |mut b, r| {
                b.push_bind(exam_id)
                    .push_bind(r.student_id.to_string())
                    .push_bind(&r.student_name)
                    .push_bind(&r.student_number)
                    .push_bind(&r.class_name)
                    .push_bind(&r.section)
                    .push_bind(Json(&r.answers))
                    .push_bind(r.score as i32)
                    .push_bind(r.wrong as i32)
                    .push_bind(r.empty as i32)
                    .push_bind(r.total_questions as i32)
                    .push_bind(Json(&r.subject_scores))
                    .push_bind(Json(&r.topic_scores))
                    .push_bind(r.scored_at);
            });

            query_builder.build().execute(&mut *tx).await.map_err(|e| {
                tracing::error!("Failed to store {} results for exam {}: {:?}", results.len(), exam_id, e);
                AppError::InternalServerError(e.to_string())
            })?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_results(&self, exam_id: i64) -> Result<Vec<StudentResult>, AppError> {
        let rows = sqlx::query_as::<_, StudentResultRow>(
            r#"
            SELECT
                student_id, student_name, student_number, class_name, section,
                answers, score, wrong, empty, total_questions,
                subject_scores, topic_scores, scored_at
            FROM student_results
            WHERE exam_id = $1
            ORDER BY id
            "#,
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StudentResult::try_from).collect()
    }

    async fn clear_results(&self, exam_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM student_results WHERE exam_id = $1")
            .bind(exam_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
