// src/models/optical_form.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

/// A scannable answer-sheet layout. Stored for reference by uploads; the
/// roster decoder uses its own fixed layout.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OpticalForm {
    pub id: i64,
    pub name: String,
    /// Stored as a JSON array in the database.
    pub fields: Json<Vec<FormField>>,
    pub created_at: DateTime<Utc>,
}

/// One column range on the sheet, `start` is 0-based.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub start: u32,
    pub length: u32,
}

/// DTO for creating an optical form layout.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOpticalFormRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(custom(function = validate_fields))]
    pub fields: Vec<FormField>,
}

fn validate_fields(fields: &[FormField]) -> Result<(), validator::ValidationError> {
    if fields.is_empty() {
        return Err(validator::ValidationError::new("fields_cannot_be_empty"));
    }
    for field in fields {
        if field.name.trim().is_empty() {
            return Err(validator::ValidationError::new("field_name_required"));
        }
        if field.length == 0 {
            return Err(validator::ValidationError::new("field_length_must_be_positive"));
        }
    }

    let mut ranges = fields
        .iter()
        .map(|f| {
            f.start
                .checked_add(f.length)
                .map(|end| (f.start, end))
                .ok_or_else(|| validator::ValidationError::new("field_out_of_range"))
        })
        .collect::<Result<Vec<(u32, u32)>, _>>()?;
    ranges.sort_unstable();
    if ranges.windows(2).any(|w| w[1].0 < w[0].1) {
        return Err(validator::ValidationError::new("fields_overlap"));
    }
    Ok(())
}
