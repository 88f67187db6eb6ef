// src/analysis.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
    error::AppError,
    grading::{
        ranking::rank,
        scoring::{Placement, StudentResult, Tally},
    },
    models::analysis::{AnalysisSource, ClassSummary, ExamAnalysis, ExamSummary, LabelSummary},
    remote::BackendClient,
    store::ExamStore,
};

/// Builds exam analyses, preferring the remote backend when one is configured.
#[derive(Clone)]
pub struct AnalysisService {
    store: Arc<dyn ExamStore>,
    backend: Option<BackendClient>,
}

impl AnalysisService {
    pub fn new(store: Arc<dyn ExamStore>, backend: Option<BackendClient>) -> Self {
        Self { store, backend }
    }

    /// Backend analysis if it answers, otherwise the local one.
    ///
    /// The returned `source` says which. A failed backend call is never
    /// retried and never surfaces as an error.
    pub async fn exam_analysis(&self, exam_id: i64) -> Result<ExamAnalysis, AppError> {
        if let Some(backend) = &self.backend {
            match backend.fetch_analysis(exam_id).await {
                Ok(remote) => {
                    let results = remote.into_results();
                    return Ok(analyze(exam_id, &results, AnalysisSource::Backend));
                }
                Err(e) => {
                    tracing::warn!("Backend analysis for exam {} unavailable, computing locally: {}", exam_id, e);
                }
            }
        }

        let results = self.store.list_results(exam_id).await?;
        Ok(analyze(exam_id, &results, AnalysisSource::Local))
    }
}

/// Summarises a result set. Pure; recompute whenever the results change.
pub fn analyze(exam_id: i64, results: &[StudentResult], source: AnalysisSource) -> ExamAnalysis {
    let students = rank(results);

    ExamAnalysis {
        exam_id,
        source,
        summary: summarize(results),
        students,
        classes: class_summaries(results),
        subjects: label_summaries(results.iter().map(|r| &r.subject_scores)),
        topics: label_summaries(results.iter().map(|r| &r.topic_scores)),
    }
}

fn summarize(results: &[StudentResult]) -> ExamSummary {
    if results.is_empty() {
        return ExamSummary::default();
    }

    let total_score: u64 = results.iter().map(|r| r.score as u64).sum();
    ExamSummary {
        participants: results.len(),
        total_questions: results.iter().map(|r| r.total_questions).max().unwrap_or(0),
        average_score: total_score as f64 / results.len() as f64,
        highest_score: results.iter().map(|r| r.score).max().unwrap_or(0),
        lowest_score: results.iter().map(|r| r.score).min().unwrap_or(0),
        total_correct: total_score,
        total_wrong: results.iter().map(|r| r.wrong as u64).sum(),
        total_empty: results.iter().map(|r| r.empty as u64).sum(),
    }
}

fn class_summaries(results: &[StudentResult]) -> Vec<ClassSummary> {
    let mut groups: BTreeMap<Placement, Vec<u32>> = BTreeMap::new();
    for result in results {
        groups.entry(result.placement()).or_default().push(result.score);
    }

    groups
        .into_iter()
        .map(|(placement, scores)| ClassSummary {
            class_name: placement.class_name,
            section: placement.section,
            participants: scores.len(),
            average_score: scores.iter().map(|s| *s as f64).sum::<f64>() / scores.len() as f64,
            highest_score: scores.iter().copied().max().unwrap_or(0),
        })
        .collect()
}

fn label_summaries<'a>(tallies: impl Iterator<Item = &'a BTreeMap<String, Tally>>) -> Vec<LabelSummary> {
    let mut merged: BTreeMap<String, Tally> = BTreeMap::new();
    for per_student in tallies {
        for (label, tally) in per_student {
            merged.entry(label.clone()).or_default().merge(tally);
        }
    }

    merged
        .into_iter()
        .map(|(label, tally)| LabelSummary {
            label,
            success_rate: tally.success_rate(),
            tally,
        })
        .collect()
}
