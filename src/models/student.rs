// src/models/student.rs

use serde::Deserialize;

/// Student identity as the remote backend reports it. Every field may be
/// missing; the accessors apply the defaults.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct StudentInfo {
    pub name: Option<String>,
    pub number: Option<String>,
    pub class_name: Option<String>,
    pub section: Option<String>,
}

impl StudentInfo {
    /// Falls back to "Öğrenci {position}" like the roster decoder does.
    pub fn display_name(&self, position: usize) -> String {
        non_blank(&self.name).unwrap_or_else(|| format!("Öğrenci {position}"))
    }

    /// Falls back to the zero-padded position.
    pub fn display_number(&self, position: usize) -> String {
        non_blank(&self.number).unwrap_or_else(|| format!("{position:04}"))
    }

    pub fn class_name(&self) -> Option<String> {
        non_blank(&self.class_name)
    }

    pub fn section(&self) -> Option<String> {
        non_blank(&self.section)
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
