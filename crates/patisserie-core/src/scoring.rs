//! Score Aggregator.
//!
//! Runs every question through the Answer Matcher, totals the points, and
//! derives pass/fail plus the strengths, weaknesses and recommendations
//! shown after a quiz.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::matcher;
use crate::model::{AnswerSheet, Question, Quiz};
use crate::results::{percentage, saturating_sum, QuestionResult, QuizResults};

/// Passing percentage used unless a quiz-defined score is chosen.
pub const DEFAULT_PASSING_THRESHOLD: u32 = 70;

/// Questions answered slower than this are called out as a weakness.
pub const SLOW_QUESTION_SECS: u32 = 120;

/// Ratio of correct questions that counts as a strong performance.
const STRONG_PERFORMANCE_RATIO: f64 = 0.8;

/// Which threshold decides pass/fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassPolicy {
    /// Always use the scorer's fixed threshold.
    #[default]
    Fixed,
    /// Use the quiz's `passing_score` when it has one.
    #[serde(alias = "quiz-defined")]
    Quiz,
}

/// Scores quizzes against a configured pass policy.
#[derive(Debug, Clone)]
pub struct Scorer {
    threshold: u32,
    policy: PassPolicy,
}

impl Default for Scorer {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_PASSING_THRESHOLD,
            policy: PassPolicy::Fixed,
        }
    }
}

impl Scorer {
    pub fn new(threshold: u32, policy: PassPolicy) -> Self {
        Self { threshold, policy }
    }

    /// The threshold this scorer applies to `quiz`.
    pub fn threshold_for(&self, quiz: &Quiz) -> u32 {
        match (self.policy, quiz.passing_score) {
            (PassPolicy::Quiz, Some(quiz_score)) => quiz_score,
            _ => self.threshold,
        }
    }

    /// Score an answer sheet for a quiz.
    pub fn score_quiz(&self, quiz: &Quiz, answers: &AnswerSheet) -> QuizResults {
        let threshold = self.threshold_for(quiz);
        if let Some(quiz_score) = quiz.passing_score {
            if quiz_score != threshold {
                tracing::warn!(
                    quiz = %quiz.id,
                    quiz_passing_score = quiz_score,
                    applied = threshold,
                    "quiz passing score differs from the applied threshold"
                );
            }
        }

        let mut results = score_with_threshold(&quiz.questions, answers, threshold);
        results.quiz_passing_score = quiz.passing_score;
        results
    }
}

/// Score answers against the default 70% threshold.
pub fn score(questions: &[Question], answers: &AnswerSheet) -> QuizResults {
    score_with_threshold(questions, answers, DEFAULT_PASSING_THRESHOLD)
}

/// Score answers against an explicit passing threshold.
pub fn score_with_threshold(
    questions: &[Question],
    answers: &AnswerSheet,
    threshold: u32,
) -> QuizResults {
    let question_results: Vec<QuestionResult> = questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let answer = answers.get(&index);
            let is_correct = matcher::is_correct(question, answer);
            QuestionResult {
                question_id: question.id.clone(),
                question_type: question.question_type(),
                answered: answer.is_some(),
                is_correct,
                points_earned: if is_correct { question.points } else { 0 },
                points_possible: question.points,
                time_spent_secs: answer.map(|a| a.time_spent_secs).unwrap_or(0),
                correct_answer: question.answer.clone(),
                explanation: question.explanation.clone(),
            }
        })
        .collect();

    let score = saturating_sum(question_results.iter().map(|r| r.points_earned));
    let max_score = saturating_sum(question_results.iter().map(|r| r.points_possible));
    let percentage = percentage(score, max_score);
    let time_spent_secs = saturating_sum(question_results.iter().map(|r| r.time_spent_secs));

    tracing::debug!(score, max_score, percentage, "quiz scored");

    QuizResults {
        score,
        max_score,
        percentage,
        passed: percentage >= threshold,
        passing_threshold: threshold,
        quiz_passing_score: None,
        time_spent_secs,
        strengths: strengths(&question_results),
        weaknesses: weaknesses(&question_results),
        recommendations: recommendations(&question_results, percentage),
        question_results,
    }
}

fn strengths(results: &[QuestionResult]) -> Vec<String> {
    let mut strengths = Vec::new();
    if results.is_empty() {
        return strengths;
    }

    let correct = results.iter().filter(|r| r.is_correct).count();
    let all_correct = correct == results.len();

    if all_correct {
        strengths.push("Perfect score! You answered every question correctly.".to_string());
    } else if correct as f64 / results.len() as f64 >= STRONG_PERFORMANCE_RATIO {
        strengths.push("Strong performance: you answered most questions correctly.".to_string());
    }

    let types: BTreeSet<_> = results.iter().map(|r| r.question_type).collect();
    if types.len() >= 2 && all_correct {
        strengths.push(format!(
            "Performed well across question types ({}).",
            types
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    strengths
}

fn weaknesses(results: &[QuestionResult]) -> Vec<String> {
    let mut weaknesses = Vec::new();

    let incorrect = results.iter().filter(|r| !r.is_correct).count();
    if incorrect > 0 {
        weaknesses.push(format!(
            "{incorrect} question{} answered incorrectly.",
            if incorrect == 1 { "" } else { "s" }
        ));
    }

    let slow = results
        .iter()
        .filter(|r| r.time_spent_secs > SLOW_QUESTION_SECS)
        .count();
    if slow > 0 {
        weaknesses.push(format!(
            "Spent more than {} minutes on {slow} question{}; revisit those steps until they feel routine.",
            SLOW_QUESTION_SECS / 60,
            if slow == 1 { "" } else { "s" }
        ));
    }

    weaknesses
}

fn recommendations(results: &[QuestionResult], percentage: u32) -> Vec<String> {
    let banding = if percentage < 50 {
        "Review the fundamentals of this technique before retaking the quiz."
    } else if percentage < 70 {
        "Practice the key steps once more, then retake the quiz."
    } else if percentage < 90 {
        "Good work! Polish the few areas you missed to reach mastery."
    } else {
        "Excellent! You are ready for more advanced techniques."
    };

    let mut recommendations = vec![banding.to_string()];
    if results.iter().any(|r| !r.is_correct) {
        recommendations
            .push("Review the explanations for the questions you answered incorrectly.".to_string());
    }
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Answer, AnswerKey, ChoiceKey, Response, TruthKey};

    fn true_false(id: &str, correct: bool, points: u32) -> Question {
        Question {
            id: id.into(),
            prompt: "?".into(),
            answer: AnswerKey::TrueFalse {
                correct: TruthKey::Bool(correct),
            },
            points,
            time_limit_secs: None,
            hints: vec![],
            explanation: format!("explanation for {id}"),
        }
    }

    fn choice(id: &str, correct: usize, points: u32) -> Question {
        Question {
            id: id.into(),
            prompt: "?".into(),
            answer: AnswerKey::MultipleChoice {
                options: vec!["a".into(), "b".into(), "c".into()],
                correct: ChoiceKey::Single(correct),
            },
            points,
            time_limit_secs: None,
            hints: vec![],
            explanation: String::new(),
        }
    }

    fn quiz(passing_score: Option<u32>) -> Quiz {
        Quiz {
            id: "meringue".into(),
            title: "Meringue".into(),
            description: String::new(),
            questions: (0..10).map(|i| true_false(&i.to_string(), true, 1)).collect(),
            passing_score,
            max_attempts: None,
            time_limit_minutes: None,
        }
    }

    fn sheet_with_correct(n: usize, total: usize) -> AnswerSheet {
        (0..total)
            .map(|i| (i, Answer::new(Response::Bool(i < n)).with_time(10)))
            .collect()
    }

    #[test]
    fn seven_of_ten_is_seventy_percent_and_passes() {
        let q = quiz(None);
        let results = score(&q.questions, &sheet_with_correct(7, 10));
        assert_eq!(results.score, 7);
        assert_eq!(results.max_score, 10);
        assert_eq!(results.percentage, 70);
        assert!(results.passed);
        assert_eq!(results.time_spent_secs, 100);
    }

    #[test]
    fn empty_quiz_scores_zero() {
        let results = score(&[], &AnswerSheet::new());
        assert_eq!(results.percentage, 0);
        assert_eq!(results.max_score, 0);
        assert!(!results.passed);
        assert!(results.strengths.is_empty());
    }

    #[test]
    fn points_are_all_or_nothing() {
        let questions = vec![choice("a", 1, 5), choice("b", 0, 3)];
        let answers = AnswerSheet::from([
            (0, Answer::new(Response::Choice(1))),
            (1, Answer::new(Response::Choice(2))),
        ]);
        let results = score(&questions, &answers);
        assert_eq!(results.question_results[0].points_earned, 5);
        assert_eq!(results.question_results[1].points_earned, 0);
        assert_eq!(results.score, 5);
        assert_eq!(results.percentage, 63);
    }

    #[test]
    fn unanswered_questions_count_against_the_score() {
        let questions = vec![choice("a", 1, 1), choice("b", 0, 1)];
        let answers = AnswerSheet::from([(0, Answer::new(Response::Choice(1)))]);
        let results = score(&questions, &answers);
        assert!(!results.question_results[1].answered);
        assert_eq!(results.percentage, 50);
        assert_eq!(results.incorrect_count(), 1);
    }

    #[test]
    fn perfect_mixed_quiz_reports_both_strengths() {
        let questions = vec![choice("a", 1, 1), true_false("b", false, 1)];
        let answers = AnswerSheet::from([
            (0, Answer::new(Response::Choice(1))),
            (1, Answer::new(Response::Bool(false))),
        ]);
        let results = score(&questions, &answers);
        assert_eq!(results.strengths.len(), 2);
        assert!(results.strengths[0].contains("Perfect"));
        assert!(results.strengths[1].contains("question types"));
        assert!(results.weaknesses.is_empty());
        assert_eq!(results.recommendations.len(), 1);
        assert!(results.recommendations[0].contains("advanced"));
    }

    #[test]
    fn strong_performance_at_eighty_percent() {
        let q = quiz(None);
        let results = score(&q.questions, &sheet_with_correct(8, 10));
        assert_eq!(results.strengths.len(), 1);
        assert!(results.strengths[0].contains("Strong"));
        assert!(results.recommendations[0].contains("Polish"));
        assert!(results.recommendations[1].contains("explanations"));
    }

    #[test]
    fn weaknesses_note_incorrect_and_slow_questions() {
        let questions = vec![choice("a", 1, 1), choice("b", 0, 1)];
        let answers = AnswerSheet::from([
            (0, Answer::new(Response::Choice(1)).with_time(121)),
            (1, Answer::new(Response::Choice(2)).with_time(120)),
        ]);
        let results = score(&questions, &answers);
        assert_eq!(results.weaknesses.len(), 2);
        assert!(results.weaknesses[0].starts_with("1 question answered"));
        assert!(results.weaknesses[1].contains("1 question;"));
    }

    #[test]
    fn recommendation_bands() {
        let q = quiz(None);
        let low = score(&q.questions, &sheet_with_correct(4, 10));
        assert!(low.recommendations[0].contains("fundamentals"));
        let mid = score(&q.questions, &sheet_with_correct(6, 10));
        assert!(mid.recommendations[0].contains("Practice"));
    }

    #[test]
    fn huge_time_spent_saturates() {
        let questions = vec![true_false("a", true, 1), true_false("b", true, 1)];
        let answers = AnswerSheet::from([
            (0, Answer::new(Response::Bool(true)).with_time(u32::MAX)),
            (1, Answer::new(Response::Bool(true)).with_time(1)),
        ]);
        let results = score(&questions, &answers);
        assert_eq!(results.time_spent_secs, u32::MAX);
        assert_eq!(results.percentage, 100);
    }

    #[test]
    fn huge_point_values_saturate() {
        let questions = vec![true_false("a", true, u32::MAX), true_false("b", true, 1)];
        let answers = AnswerSheet::from([
            (0, Answer::new(Response::Bool(true))),
            (1, Answer::new(Response::Bool(false))),
        ]);
        let results = score(&questions, &answers);
        assert_eq!(results.score, u32::MAX);
        assert_eq!(results.max_score, u32::MAX);
        assert_eq!(results.percentage, 100);
        assert!(results.passed);
    }

    #[test]
    fn fixed_policy_ignores_quiz_passing_score() {
        let q = quiz(Some(80));
        let results = Scorer::default().score_quiz(&q, &sheet_with_correct(7, 10));
        assert!(results.passed);
        assert_eq!(results.passing_threshold, 70);
        assert_eq!(results.quiz_passing_score, Some(80));
        assert!(results.has_threshold_discrepancy());
    }

    #[test]
    fn quiz_policy_applies_quiz_passing_score() {
        let q = quiz(Some(80));
        let scorer = Scorer::new(DEFAULT_PASSING_THRESHOLD, PassPolicy::Quiz);
        let results = scorer.score_quiz(&q, &sheet_with_correct(7, 10));
        assert!(!results.passed);
        assert_eq!(results.passing_threshold, 80);
        assert!(!results.has_threshold_discrepancy());
    }

    #[test]
    fn quiz_policy_falls_back_without_quiz_score() {
        let q = quiz(None);
        let scorer = Scorer::new(60, PassPolicy::Quiz);
        assert_eq!(scorer.threshold_for(&q), 60);
    }
}
