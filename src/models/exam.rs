// src/models/exam.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'exams' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Exam {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub exam_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// DTO for creating a new exam.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200, message = "Exam name must be between 1 and 200 characters."))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub exam_date: Option<NaiveDate>,
}
