//! Attempt Store: append-only quiz attempt history and derived statistics.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageError;
use crate::model::AnswerSheet;
use crate::results::QuizResults;
use crate::storage::{keys, read_json, try_read_json, write_json, KeyValueStore};

/// One submitted and scored quiz attempt. Never updated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: Uuid,
    pub quiz_id: String,
    pub user_id: String,
    pub answers: AnswerSheet,
    /// Points earned.
    pub score: u32,
    pub max_score: u32,
    pub percentage: u32,
    pub passed: bool,
    pub time_spent_secs: u32,
    pub completed_at: DateTime<Utc>,
}

impl QuizAttempt {
    /// Record a scored attempt.
    pub fn from_results(
        quiz_id: impl Into<String>,
        user_id: impl Into<String>,
        answers: AnswerSheet,
        results: &QuizResults,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            quiz_id: quiz_id.into(),
            user_id: user_id.into(),
            answers,
            score: results.score,
            max_score: results.max_score,
            percentage: results.percentage,
            passed: results.passed,
            time_spent_secs: results.time_spent_secs,
            completed_at: Utc::now(),
        }
    }
}

/// Statistics over the attempts of one quiz. Scores are percentages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttemptStatistics {
    pub total_attempts: usize,
    pub best_score: u32,
    pub average_score: f64,
    /// Share of passed attempts, 0-100.
    pub pass_rate: f64,
    pub average_time_spent_secs: f64,
}

/// Quiz attempt history persisted under [`keys::QUIZ_ATTEMPTS`].
pub struct AttemptStore {
    store: Arc<dyn KeyValueStore>,
}

impl AttemptStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Append an attempt, reporting failures. History that cannot be read is
    /// left untouched and the read error is returned.
    pub fn try_save(&self, attempt: QuizAttempt) -> Result<(), StorageError> {
        let mut attempts: Vec<QuizAttempt> =
            try_read_json(self.store.as_ref(), keys::QUIZ_ATTEMPTS)?.unwrap_or_default();
        attempts.push(attempt);
        write_json(self.store.as_ref(), keys::QUIZ_ATTEMPTS, &attempts)
    }

    /// Append an attempt. Storage failures are logged and dropped.
    pub fn save(&self, attempt: QuizAttempt) {
        let id = attempt.id;
        if let Err(e) = self.try_save(attempt) {
            tracing::error!("failed to save quiz attempt {id}: {e}");
        }
    }

    /// Every stored attempt; empty when storage is missing or corrupt.
    pub fn all(&self) -> Vec<QuizAttempt> {
        read_json(self.store.as_ref(), keys::QUIZ_ATTEMPTS)
    }

    pub fn for_quiz(&self, quiz_id: &str) -> Vec<QuizAttempt> {
        self.all()
            .into_iter()
            .filter(|a| a.quiz_id == quiz_id)
            .collect()
    }

    /// Highest percentage for the quiz, 0 without attempts.
    pub fn best_score(&self, quiz_id: &str) -> u32 {
        self.for_quiz(quiz_id)
            .iter()
            .map(|a| a.percentage)
            .max()
            .unwrap_or(0)
    }

    /// Mean percentage for the quiz, 0 without attempts.
    pub fn average_score(&self, quiz_id: &str) -> f64 {
        let attempts = self.for_quiz(quiz_id);
        mean(attempts.iter().map(|a| f64::from(a.percentage)), attempts.len())
    }

    /// True while fewer than `max_attempts` attempts are recorded.
    pub fn can_retake(&self, quiz_id: &str, max_attempts: u32) -> bool {
        self.for_quiz(quiz_id).len() < max_attempts as usize
    }

    /// [`Self::can_retake`] counting only `user_id`'s attempts.
    pub fn can_user_retake(&self, quiz_id: &str, user_id: &str, max_attempts: u32) -> bool {
        let taken = self
            .for_quiz(quiz_id)
            .iter()
            .filter(|a| a.user_id == user_id)
            .count();
        taken < max_attempts as usize
    }

    pub fn statistics(&self, quiz_id: &str) -> AttemptStatistics {
        let attempts = self.for_quiz(quiz_id);
        let n = attempts.len();
        if n == 0 {
            return AttemptStatistics::default();
        }

        let passed = attempts.iter().filter(|a| a.passed).count();
        AttemptStatistics {
            total_attempts: n,
            best_score: attempts.iter().map(|a| a.percentage).max().unwrap_or(0),
            average_score: mean(attempts.iter().map(|a| f64::from(a.percentage)), n),
            pass_rate: passed as f64 * 100.0 / n as f64,
            average_time_spent_secs: mean(
                attempts.iter().map(|a| f64::from(a.time_spent_secs)),
                n,
            ),
        }
    }
}

fn mean(values: impl Iterator<Item = f64>, n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        values.sum::<f64>() / n as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn attempt(quiz_id: &str, percentage: u32, passed: bool, time: u32) -> QuizAttempt {
        QuizAttempt {
            id: Uuid::new_v4(),
            quiz_id: quiz_id.into(),
            user_id: "baker".into(),
            answers: AnswerSheet::new(),
            score: percentage / 10,
            max_score: 10,
            percentage,
            passed,
            time_spent_secs: time,
            completed_at: Utc::now(),
        }
    }

    fn store() -> (Arc<MemoryStore>, AttemptStore) {
        let backing = Arc::new(MemoryStore::new());
        let attempts = AttemptStore::new(backing.clone());
        (backing, attempts)
    }

    #[test]
    fn can_retake_is_strictly_less_than_max() {
        let (_, attempts) = store();
        assert!(attempts.can_retake("choux", 3));
        attempts.save(attempt("choux", 50, false, 60));
        assert!(attempts.can_retake("choux", 3));
        attempts.save(attempt("choux", 60, false, 60));
        assert!(attempts.can_retake("choux", 3));
        attempts.save(attempt("choux", 80, true, 60));
        assert!(!attempts.can_retake("choux", 3));
        attempts.save(attempt("choux", 90, true, 60));
        assert!(!attempts.can_retake("choux", 3));
    }

    #[test]
    fn attempts_are_filtered_per_quiz() {
        let (_, attempts) = store();
        attempts.save(attempt("choux", 50, false, 60));
        attempts.save(attempt("ganache", 90, true, 60));
        assert_eq!(attempts.all().len(), 2);
        assert_eq!(attempts.for_quiz("choux").len(), 1);
        assert!(attempts.can_retake("ganache", 2));
    }

    #[test]
    fn statistics_over_attempts() {
        let (_, attempts) = store();
        attempts.save(attempt("choux", 50, false, 100));
        attempts.save(attempt("choux", 70, true, 200));
        attempts.save(attempt("choux", 90, true, 300));

        let stats = attempts.statistics("choux");
        assert_eq!(stats.total_attempts, 3);
        assert_eq!(stats.best_score, 90);
        assert!((stats.average_score - 70.0).abs() < f64::EPSILON);
        assert!((stats.pass_rate - 200.0 / 3.0).abs() < 1e-9);
        assert!((stats.average_time_spent_secs - 200.0).abs() < f64::EPSILON);
        assert_eq!(attempts.best_score("choux"), 90);
        assert!((attempts.average_score("choux") - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn statistics_without_attempts_are_zero() {
        let (_, attempts) = store();
        assert_eq!(attempts.statistics("none"), AttemptStatistics::default());
        assert_eq!(attempts.best_score("none"), 0);
        assert_eq!(attempts.average_score("none"), 0.0);
    }

    #[test]
    fn corrupt_storage_degrades_to_empty() {
        let (backing, attempts) = store();
        backing.set(keys::QUIZ_ATTEMPTS, "not json at all").unwrap();
        assert!(attempts.all().is_empty());
        assert!(attempts.can_retake("choux", 1));
    }

    #[test]
    fn retake_budget_per_user() {
        let (_, attempts) = store();
        attempts.save(attempt("choux", 50, false, 60));
        attempts.save(attempt("choux", 60, false, 60));
        assert!(!attempts.can_retake("choux", 2));
        assert!(!attempts.can_user_retake("choux", "baker", 2));
        assert!(attempts.can_user_retake("choux", "apprentice", 2));
    }

    #[test]
    fn unreadable_history_is_not_overwritten() {
        let (backing, attempts) = store();
        let stored = r#"[{"id":"0b6f4d7e-8f43-4c55-9a53-3c2a1f0e9d11","quiz_id":"choux"}]"#;
        backing.set(keys::QUIZ_ATTEMPTS, stored).unwrap();

        let err = attempts
            .try_save(attempt("ganache", 90, true, 60))
            .unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
        attempts.save(attempt("ganache", 90, true, 60));

        assert_eq!(
            backing.get(keys::QUIZ_ATTEMPTS).unwrap().as_deref(),
            Some(stored)
        );
    }

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }
        fn set(&self, _: &str, _: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".into()))
        }
        fn remove(&self, _: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_is_swallowed_by_save() {
        let attempts = AttemptStore::new(Arc::new(ReadOnlyStore));
        attempts.save(attempt("choux", 50, false, 60));
        assert!(attempts.all().is_empty());
        assert!(attempts.try_save(attempt("choux", 50, false, 60)).is_err());
    }

    #[test]
    fn attempt_from_results_copies_score() {
        let results = crate::scoring::score(&[], &AnswerSheet::new());
        let attempt = QuizAttempt::from_results("q", "u", AnswerSheet::new(), &results);
        assert_eq!(attempt.percentage, 0);
        assert!(!attempt.passed);
        assert_eq!(attempt.quiz_id, "q");
    }
}
