// src/grading/mod.rs

//! Optical answer-sheet grading: line decoding, scoring and ranking.
//!
//! Everything in here is pure and synchronous. Persistence and the remote
//! backend live in `store` and `remote`.

pub mod answer_key;
pub mod parser;
pub mod ranking;
pub mod scoring;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Label used when a booklet entry has no subject or topic.
pub const DEFAULT_LABEL: &str = "Genel";

/// One bubble on the answer sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Choice {
    A,
    B,
    C,
    D,
    E,
}

impl Choice {
    /// Case-insensitive. Anything outside A-E means "unanswered".
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(Choice::A),
            'B' => Some(Choice::B),
            'C' => Some(Choice::C),
            'D' => Some(Choice::D),
            'E' => Some(Choice::E),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Choice::A => 'A',
            Choice::B => 'B',
            Choice::C => 'C',
            Choice::D => 'D',
            Choice::E => 'E',
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Returns the label, or `DEFAULT_LABEL` when it is blank.
pub(crate) fn label_or_default(label: &str) -> String {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        DEFAULT_LABEL.to_string()
    } else {
        trimmed.to_string()
    }
}
