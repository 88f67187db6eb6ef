// src/grading/scoring.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Choice, answer_key::AnswerKey, parser::ParsedStudent};

/// Correct / wrong / empty counts for a group of questions.
///
/// `total` counts every question in the group whether or not the student
/// marked it, so `correct + wrong + empty == total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tally {
    pub correct: u32,
    pub wrong: u32,
    pub empty: u32,
    pub total: u32,
}

impl Tally {
    fn record(&mut self, outcome: Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Correct => self.correct += 1,
            Outcome::Wrong => self.wrong += 1,
            Outcome::Empty => self.empty += 1,
        }
    }

    pub fn merge(&mut self, other: &Tally) {
        self.correct += other.correct;
        self.wrong += other.wrong;
        self.empty += other.empty;
        self.total += other.total;
    }

    /// Percentage of correct answers, 0 for an empty group.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64 * 100.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Correct,
    Wrong,
    Empty,
}

/// Class and section shared by every student of one roster upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Placement {
    pub class_name: Option<String>,
    pub section: Option<String>,
}

/// A scored answer sheet. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentResult {
    pub student_id: Uuid,
    pub student_name: String,
    pub student_number: String,
    pub class_name: Option<String>,
    pub section: Option<String>,
    pub answers: BTreeMap<u32, Choice>,
    /// Number of correct answers. Wrong and empty both score nothing.
    pub score: u32,
    pub wrong: u32,
    pub empty: u32,
    pub total_questions: u32,
    pub subject_scores: BTreeMap<String, Tally>,
    pub topic_scores: BTreeMap<String, Tally>,
    pub scored_at: DateTime<Utc>,
}

impl StudentResult {
    pub fn placement(&self) -> Placement {
        Placement {
            class_name: self.class_name.clone(),
            section: self.section.clone(),
        }
    }
}

/// Scores every parsed student against the booklet.
pub fn score(students: &[ParsedStudent], key: &AnswerKey, placement: &Placement) -> Vec<StudentResult> {
    students
        .iter()
        .map(|student| score_student(student, key, placement))
        .collect()
}

fn score_student(student: &ParsedStudent, key: &AnswerKey, placement: &Placement) -> StudentResult {
    let mut overall = Tally::default();
    let mut subject_scores: BTreeMap<String, Tally> = BTreeMap::new();
    let mut topic_scores: BTreeMap<String, Tally> = BTreeMap::new();

    for entry in key.entries() {
        let outcome = match student.answers.get(&entry.question_number) {
            None => Outcome::Empty,
            Some(answer) if *answer == entry.correct_answer => Outcome::Correct,
            Some(_) => Outcome::Wrong,
        };

        overall.record(outcome);
        subject_scores.entry(entry.subject.clone()).or_default().record(outcome);
        topic_scores.entry(entry.topic.clone()).or_default().record(outcome);
    }

    StudentResult {
        student_id: Uuid::new_v4(),
        student_name: student.student_name.clone(),
        student_number: student.student_number.clone(),
        class_name: placement.class_name.clone(),
        section: placement.section.clone(),
        answers: student.answers.clone(),
        score: overall.correct,
        wrong: overall.wrong,
        empty: overall.empty,
        total_questions: key.len() as u32,
        subject_scores,
        topic_scores,
        scored_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::{answer_key::AnswerKeyEntry, parser::parse_line};

    fn entry(q: u32, correct: Choice, subject: &str, topic: &str) -> AnswerKeyEntry {
        AnswerKeyEntry {
            question_number: q,
            correct_answer: correct,
            subject: subject.to_string(),
            topic: topic.to_string(),
        }
    }

    fn sample_key() -> AnswerKey {
        AnswerKey::new(vec![
            entry(1, Choice::A, "Math", "Algebra"),
            entry(2, Choice::B, "Math", "Geometry"),
            entry(3, Choice::C, "Sci", "Physics"),
        ])
        .unwrap()
    }

    #[test]
    fn worked_example() {
        let student = parse_line("ACB", 1).unwrap();
        let results = score(&[student], &sample_key(), &Placement::default());
        let result = &results[0];

        assert_eq!(result.score, 1);
        assert_eq!(result.total_questions, 3);
        assert_eq!(result.subject_scores["Math"].correct, 1);
        assert_eq!(result.subject_scores["Math"].total, 2);
        assert_eq!(result.subject_scores["Sci"].correct, 0);
        assert_eq!(result.subject_scores["Sci"].total, 1);
        assert_eq!(result.topic_scores["Algebra"].correct, 1);
        assert_eq!(result.topic_scores["Physics"].total, 1);
    }

    #[test]
    fn wrong_and_empty_are_tracked_apart() {
        let student = parse_line("A C", 1).unwrap();
        let result = &score(&[student], &sample_key(), &Placement::default())[0];

        assert_eq!(result.score, 1);
        assert_eq!(result.empty, 1);
        assert_eq!(result.wrong, 0);
        assert_eq!(result.subject_scores["Math"].empty, 1);
        assert_eq!(result.subject_scores["Sci"].correct, 1);
    }

    #[test]
    fn totals_do_not_depend_on_answers() {
        let key = sample_key();
        for line in ["", "ABC", "EEE", "a", "   "] {
            let student = ParsedStudent {
                line_number: 1,
                student_name: "x".into(),
                student_number: "1".into(),
                answers: parse_line(line, 1).map(|s| s.answers).unwrap_or_default(),
                raw_line: line.into(),
            };
            let result = &score(&[student], &key, &Placement::default())[0];
            assert_eq!(result.subject_scores["Math"].total, 2);
            assert_eq!(result.subject_scores["Sci"].total, 1);
            assert!(result.score <= result.total_questions);
            assert_eq!(result.score + result.wrong + result.empty, 3);
        }
    }

    #[test]
    fn answers_beyond_the_key_are_ignored() {
        let student = parse_line("ABCDDDD", 1).unwrap();
        let result = &score(&[student], &sample_key(), &Placement::default())[0];
        assert_eq!(result.score, 3);
        assert_eq!(result.answers.len(), 7);
    }

    #[test]
    fn placement_is_copied_and_ids_are_unique() {
        let placement = Placement {
            class_name: Some("8".into()),
            section: Some("B".into()),
        };
        let students = vec![parse_line("ABC", 1).unwrap(), parse_line("ABC", 2).unwrap()];
        let results = score(&students, &sample_key(), &placement);

        assert_eq!(results[0].placement(), placement);
        assert_ne!(results[0].student_id, results[1].student_id);
    }

    #[test]
    fn success_rate_handles_empty_tally() {
        assert_eq!(Tally::default().success_rate(), 0.0);
        let tally = Tally { correct: 1, wrong: 1, empty: 2, total: 4 };
        assert_eq!(tally.success_rate(), 25.0);
    }
}
