//! Scored quiz outcomes.

use serde::{Deserialize, Serialize};

use crate::model::{AnswerKey, QuestionType};

/// Outcome for a single question. Built once at scoring time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_id: String,
    pub question_type: QuestionType,
    /// Whether any answer was submitted.
    pub answered: bool,
    pub is_correct: bool,
    /// Either 0 or `points_possible`; there is no partial credit.
    pub points_earned: u32,
    pub points_possible: u32,
    pub time_spent_secs: u32,
    pub correct_answer: AnswerKey,
    pub explanation: String,
}

/// Aggregate result of one scored attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResults {
    pub score: u32,
    pub max_score: u32,
    /// `round(100 * score / max_score)`, or 0 when `max_score` is 0.
    pub percentage: u32,
    pub passed: bool,
    /// Threshold `passed` was decided against.
    pub passing_threshold: u32,
    /// The quiz's own passing score, kept even when it was not applied.
    #[serde(default)]
    pub quiz_passing_score: Option<u32>,
    pub time_spent_secs: u32,
    pub question_results: Vec<QuestionResult>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
}

impl QuizResults {
    pub fn correct_count(&self) -> usize {
        self.question_results.iter().filter(|r| r.is_correct).count()
    }

    pub fn incorrect_count(&self) -> usize {
        self.question_results.len() - self.correct_count()
    }

    /// True when the quiz declares a passing score that differs from the
    /// threshold actually applied.
    pub fn has_threshold_discrepancy(&self) -> bool {
        self.quiz_passing_score
            .is_some_and(|quiz| quiz != self.passing_threshold)
    }
}

/// Integer percentage rounded half away from zero, guarding `max == 0`.
/// Sum that stops at `u32::MAX` instead of overflowing.
pub fn saturating_sum(values: impl IntoIterator<Item = u32>) -> u32 {
    values.into_iter().fold(0u32, u32::saturating_add)
}

pub fn percentage(score: u32, max: u32) -> u32 {
    if max == 0 {
        return 0;
    }
    (f64::from(score) * 100.0 / f64::from(max)).round() as u32
}
