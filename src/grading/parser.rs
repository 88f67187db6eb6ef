// src/grading/parser.rs

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::Choice;

/// Lines shorter than this are pure answer strings.
pub const COMPOSITE_LINE_MIN_LEN: usize = 50;
/// Width of the name field at the start of a composite line.
pub const NAME_FIELD_LEN: usize = 30;
/// Width of the student number field following the name.
pub const NUMBER_FIELD_LEN: usize = 10;
/// Anything longer is not a scanner line.
pub const MAX_LINE_LEN: usize = 1024;

const ANSWERS_START: usize = NAME_FIELD_LEN + NUMBER_FIELD_LEN;

/// One decoded roster line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedStudent {
    /// 1-based position of the line in the uploaded file.
    pub line_number: usize,
    pub student_name: String,
    pub student_number: String,
    /// Question number -> marked choice. Unanswered questions are absent.
    pub answers: BTreeMap<u32, Choice>,
    pub raw_line: String,
}

/// Why a single roster line was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineError {
    ControlCharacter { line: usize, position: usize },
    TooLong { line: usize, length: usize },
}

impl LineError {
    pub fn line(&self) -> usize {
        match self {
            LineError::ControlCharacter { line, .. } | LineError::TooLong { line, .. } => *line,
        }
    }
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineError::ControlCharacter { line, position } => {
                write!(f, "line {line}: control character at column {}", position + 1)
            }
            LineError::TooLong { line, length } => {
                write!(f, "line {line}: {length} characters exceeds limit of {MAX_LINE_LEN}")
            }
        }
    }
}

impl std::error::Error for LineError {}

/// Result of decoding a whole roster file.
#[derive(Debug, Default, Serialize)]
pub struct RosterParse {
    pub students: Vec<ParsedStudent>,
    pub errors: Vec<LineError>,
}

/// Decodes one fixed-width line.
///
/// Lines under `COMPOSITE_LINE_MIN_LEN` characters are answers only.
/// Longer lines carry a 30-character name, a 10-character number and the
/// answers from column 40 onward. Widths are counted in characters.
pub fn parse_line(line: &str, line_number: usize) -> Result<ParsedStudent, LineError> {
    let chars: Vec<char> = line.chars().collect();

    if chars.len() > MAX_LINE_LEN {
        return Err(LineError::TooLong {
            line: line_number,
            length: chars.len(),
        });
    }
    if let Some(position) = chars.iter().position(|c| c.is_control() && *c != '\t') {
        return Err(LineError::ControlCharacter {
            line: line_number,
            position,
        });
    }

    let (name, number, answer_chars) = if chars.len() < COMPOSITE_LINE_MIN_LEN {
        (String::new(), String::new(), &chars[..])
    } else {
        let name: String = chars[..NAME_FIELD_LEN].iter().collect();
        let number: String = chars[NAME_FIELD_LEN..ANSWERS_START].iter().collect();
        (
            name.trim().to_string(),
            number.trim().to_string(),
            &chars[ANSWERS_START..],
        )
    };

    let answers = decode_answers(answer_chars);

    let student_name = if name.is_empty() {
        format!("Öğrenci {line_number}")
    } else {
        name
    };
    let student_number = if number.is_empty() {
        format!("{line_number:04}")
    } else {
        number
    };

    Ok(ParsedStudent {
        line_number,
        student_name,
        student_number,
        answers,
        raw_line: line.to_string(),
    })
}

fn decode_answers(segment: &[char]) -> BTreeMap<u32, Choice> {
    segment
        .iter()
        .enumerate()
        .filter_map(|(offset, c)| Choice::from_char(*c).map(|choice| (offset as u32 + 1, choice)))
        .collect()
}

/// Decodes every non-blank line of a roster file.
///
/// A bad line is logged and reported in `errors`; it never aborts the batch.
pub fn parse_roster(text: &str) -> RosterParse {
    let mut parsed = RosterParse::default();
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);

    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_number = index + 1;
        match parse_line(line, line_number) {
            Ok(student) => parsed.students.push(student),
            Err(e) => {
                tracing::warn!("Skipping roster line {}: {}", line_number, e);
                parsed.errors.push(e);
            }
        }
    }

    parsed
}
