// src/grading/ranking.rs

use std::collections::HashMap;

use serde::Serialize;

use super::scoring::{Placement, StudentResult};

/// A result with its exam-wide and class-wide standing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    #[serde(flatten)]
    pub result: StudentResult,
    pub rank: usize,
    pub percentile: u32,
    pub class_rank: usize,
    pub class_percentile: u32,
    pub total_classmates: usize,
}

/// Positional rank and percentile for every result.
///
/// Sorted by score, highest first. Equal scores keep their input order and
/// still get distinct ranks. Class standing is computed the same way inside
/// each `(class_name, section)` group. The output is in exam rank order.
pub fn rank(results: &[StudentResult]) -> Vec<RankedResult> {
    let overall = positions(results.iter().enumerate().map(|(i, r)| (i, r.score)).collect());

    let mut groups: HashMap<Placement, Vec<(usize, u32)>> = HashMap::new();
    for (i, result) in results.iter().enumerate() {
        groups.entry(result.placement()).or_default().push((i, result.score));
    }

    let mut class_standing: HashMap<usize, (usize, u32, usize)> = HashMap::with_capacity(results.len());
    for members in groups.into_values() {
        let size = members.len();
        for (index, rank, pct) in positions(members) {
            class_standing.insert(index, (rank, pct, size));
        }
    }

    overall
        .into_iter()
        .map(|(index, rank, percentile)| {
            let (class_rank, class_percentile, total_classmates) = class_standing[&index];
            RankedResult {
                result: results[index].clone(),
                rank,
                percentile,
                class_rank,
                class_percentile,
                total_classmates,
            }
        })
        .collect()
}

/// Sorts `(input index, score)` pairs and returns `(input index, rank, percentile)`.
fn positions(mut scored: Vec<(usize, u32)>) -> Vec<(usize, usize, u32)> {
    let n = scored.len();
    // stable: ties stay in input order
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored
        .into_iter()
        .enumerate()
        .map(|(position, (index, _))| (index, position + 1, percentile(position, n)))
        .collect()
}

fn percentile(position: usize, n: usize) -> u32 {
    ((1.0 - position as f64 / n as f64) * 100.0).round() as u32
}
