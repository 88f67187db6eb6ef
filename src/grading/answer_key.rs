// src/grading/answer_key.rs

use std::collections::HashSet;
use std::fmt;
use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use serde::{Deserialize, Serialize};

use super::{Choice, label_or_default};

/// One question of a booklet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerKeyEntry {
    pub question_number: u32,
    pub correct_answer: Choice,
    pub subject: String,
    pub topic: String,
}

/// A validated booklet, ordered by question number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnswerKey {
    entries: Vec<AnswerKeyEntry>,
}

#[derive(Debug)]
pub enum AnswerKeyError {
    /// The bytes are not a readable workbook.
    Workbook(String),
    /// The workbook has no sheet.
    NoSheet,
    /// No question rows after the header.
    Empty,
    DuplicateQuestion(u32),
    InvalidQuestionNumber { row: usize },
}

impl fmt::Display for AnswerKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerKeyError::Workbook(msg) => write!(f, "Unreadable workbook: {msg}"),
            AnswerKeyError::NoSheet => write!(f, "Workbook has no sheets"),
            AnswerKeyError::Empty => write!(f, "Answer key contains no questions"),
            AnswerKeyError::DuplicateQuestion(q) => {
                write!(f, "Question {q} appears more than once in the answer key")
            }
            AnswerKeyError::InvalidQuestionNumber { row } => {
                write!(f, "Row {row}: question number must be positive")
            }
        }
    }
}

impl std::error::Error for AnswerKeyError {}

/// Largest question number a key may carry.
pub const MAX_QUESTION_NUMBER: u32 = i32::MAX as u32;

impl AnswerKey {
    /// Validates uniqueness and sorts by question number.
    pub fn new(mut entries: Vec<AnswerKeyEntry>) -> Result<Self, AnswerKeyError> {
        if entries.is_empty() {
            return Err(AnswerKeyError::Empty);
        }

        let mut seen = HashSet::with_capacity(entries.len());
        for (index, entry) in entries.iter_mut().enumerate() {
            if entry.question_number == 0 || entry.question_number > MAX_QUESTION_NUMBER {
                return Err(AnswerKeyError::InvalidQuestionNumber { row: index + 1 });
            }
            if !seen.insert(entry.question_number) {
                return Err(AnswerKeyError::DuplicateQuestion(entry.question_number));
            }
            entry.subject = label_or_default(&entry.subject);
            entry.topic = label_or_default(&entry.topic);
        }

        entries.sort_by_key(|e| e.question_number);
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[AnswerKeyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<AnswerKeyEntry> {
        self.entries
    }
}

/// Reads a booklet from the first sheet of a spreadsheet.
///
/// Row 1 is a header. Columns: question number, topic, correct answer,
/// subject. Missing cells fall back to the data-row index, `"Konu {row}"`,
/// `A` and `"Genel"` respectively.
pub fn read_answer_key(bytes: &[u8]) -> Result<AnswerKey, AnswerKeyError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| AnswerKeyError::Workbook(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(AnswerKeyError::NoSheet)?
        .map_err(|e| AnswerKeyError::Workbook(e.to_string()))?;

    let rows: Vec<Vec<Option<String>>> = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    entries_from_rows(&rows).and_then(AnswerKey::new)
}

/// Applies the column layout to already-extracted cell text. The first row
/// is the header.
pub fn entries_from_rows(rows: &[Vec<Option<String>>]) -> Result<Vec<AnswerKeyEntry>, AnswerKeyError> {
    let mut entries = Vec::new();

    for (index, row) in rows.iter().skip(1).enumerate() {
        if row.iter().all(Option::is_none) {
            continue;
        }
        let data_row = index + 1;
        let cell = |col: usize| row.get(col).cloned().flatten();

        let question_number = match cell(0).as_deref().map(parse_question_number) {
            Some(QuestionCell::Number(n)) => n,
            Some(QuestionCell::OutOfRange) => {
                return Err(AnswerKeyError::InvalidQuestionNumber { row: data_row });
            }
            Some(QuestionCell::NotNumeric) | None => data_row as u32,
        };

        let topic = cell(1).unwrap_or_else(|| format!("Konu {data_row}"));
        let correct_answer = cell(2)
            .and_then(|text| text.trim().chars().next())
            .and_then(Choice::from_char)
            .unwrap_or(Choice::A);
        let subject = cell(3).unwrap_or_else(|| super::DEFAULT_LABEL.to_string());

        entries.push(AnswerKeyEntry {
            question_number,
            correct_answer,
            subject,
            topic,
        });
    }

    Ok(entries)
}

enum QuestionCell {
    Number(u32),
    OutOfRange,
    NotNumeric,
}

/// Question numbers must fit the database's `INTEGER` column.
fn parse_question_number(text: &str) -> QuestionCell {
    let in_range = |n: f64| n.fract() == 0.0 && n >= 1.0 && n <= MAX_QUESTION_NUMBER as f64;

    let trimmed = text.trim();
    match trimmed.parse::<f64>() {
        Ok(n) if !n.is_finite() => QuestionCell::NotNumeric,
        Ok(n) if in_range(n) => QuestionCell::Number(n as u32),
        Ok(_) => QuestionCell::OutOfRange,
        Err(_) => QuestionCell::NotNumeric,
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        _ => return None,
    };
    if text.is_empty() { None } else { Some(text) }
}
