// src/models/analysis.rs

use serde::{Deserialize, Serialize};

use crate::grading::{ranking::RankedResult, scoring::Tally};

/// Where an analysis was computed.
///
/// `Local` means the remote backend was unavailable or not configured and
/// the figures were derived from the results stored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    Backend,
    Local,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExamAnalysis {
    pub exam_id: i64,
    pub source: AnalysisSource,
    pub summary: ExamSummary,
    /// In exam rank order.
    pub students: Vec<RankedResult>,
    pub classes: Vec<ClassSummary>,
    pub subjects: Vec<LabelSummary>,
    pub topics: Vec<LabelSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExamSummary {
    pub participants: usize,
    pub total_questions: u32,
    pub average_score: f64,
    pub highest_score: u32,
    pub lowest_score: u32,
    pub total_correct: u64,
    pub total_wrong: u64,
    pub total_empty: u64,
}

/// Aggregate for one `(class_name, section)` group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassSummary {
    pub class_name: Option<String>,
    pub section: Option<String>,
    pub participants: usize,
    pub average_score: f64,
    pub highest_score: u32,
}

/// Aggregate for one subject or topic label across all students.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelSummary {
    pub label: String,
    #[serde(flatten)]
    pub tally: Tally,
    /// Percentage of correct answers over all students.
    pub success_rate: f64,
}
