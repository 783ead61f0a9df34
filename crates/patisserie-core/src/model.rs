//! Core quiz data model for patisserie.
//!
//! Questions carry an [`AnswerKey`] whose variant fixes the question type,
//! and learners submit a [`Response`] whose variant must fit that key. The
//! Answer Matcher in [`crate::matcher`] resolves the pair exhaustively.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The supported question formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    Sequence,
    DragDrop,
    FillBlank,
    Matching,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::MultipleChoice => write!(f, "multiple-choice"),
            QuestionType::TrueFalse => write!(f, "true-false"),
            QuestionType::Sequence => write!(f, "sequence"),
            QuestionType::DragDrop => write!(f, "drag-drop"),
            QuestionType::FillBlank => write!(f, "fill-blank"),
            QuestionType::Matching => write!(f, "matching"),
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "multiple-choice" => Ok(QuestionType::MultipleChoice),
            "true-false" => Ok(QuestionType::TrueFalse),
            "sequence" => Ok(QuestionType::Sequence),
            "drag-drop" => Ok(QuestionType::DragDrop),
            "fill-blank" => Ok(QuestionType::FillBlank),
            "matching" => Ok(QuestionType::Matching),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// Correct selection for a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceKey {
    /// Exactly one option is correct.
    Single(usize),
    /// Several options must be selected together.
    Set(Vec<usize>),
}

/// Correct value of a true/false question.
///
/// Content authors encode it as a boolean, as `1`/`0`, or as `"true"`/`"false"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TruthKey {
    Bool(bool),
    Number(i64),
    Text(String),
}

impl TruthKey {
    /// Normalize to a boolean. Anything other than `true`, `1` or `"true"` is false.
    pub fn as_bool(&self) -> bool {
        match self {
            TruthKey::Bool(b) => *b,
            TruthKey::Number(n) => *n == 1,
            TruthKey::Text(t) => t.trim().eq_ignore_ascii_case("true"),
        }
    }
}

/// One step of a sequence question.
///
/// `order` is the step's canonical position. Submissions only need `order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
    pub order: u32,
}

/// A fill-in-the-blank slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blank {
    /// Identifier the learner's answer is keyed by.
    pub id: String,
    /// Canonical answer.
    pub answer: String,
    /// Other accepted spellings.
    #[serde(default)]
    pub alternatives: Vec<String>,
}

impl Blank {
    /// Case-insensitive, whitespace-trimmed comparison against the canonical
    /// answer and every alternative.
    pub fn accepts(&self, submitted: &str) -> bool {
        let submitted = normalize_blank(submitted);
        normalize_blank(&self.answer) == submitted
            || self
                .alternatives
                .iter()
                .any(|alt| normalize_blank(alt) == submitted)
    }
}

fn normalize_blank(s: &str) -> String {
    s.trim().to_lowercase()
}

/// A left/right pair in a matching question (or a learner's pairing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPair {
    pub left: String,
    pub right: String,
}

/// Where the learner dropped a drag-drop item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub item: String,
    pub target: String,
}

/// The correct answer of a question, one variant per question type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AnswerKey {
    MultipleChoice {
        #[serde(default)]
        options: Vec<String>,
        correct: ChoiceKey,
    },
    TrueFalse {
        correct: TruthKey,
    },
    Sequence {
        #[serde(default)]
        items: Vec<SequenceItem>,
        correct_order: Vec<u32>,
    },
    /// Item `i` belongs on target `i`.
    DragDrop {
        items: Vec<String>,
        targets: Vec<String>,
    },
    FillBlank {
        blanks: Vec<Blank>,
    },
    Matching {
        pairs: Vec<MatchPair>,
    },
}

impl AnswerKey {
    pub fn question_type(&self) -> QuestionType {
        match self {
            AnswerKey::MultipleChoice { .. } => QuestionType::MultipleChoice,
            AnswerKey::TrueFalse { .. } => QuestionType::TrueFalse,
            AnswerKey::Sequence { .. } => QuestionType::Sequence,
            AnswerKey::DragDrop { .. } => QuestionType::DragDrop,
            AnswerKey::FillBlank { .. } => QuestionType::FillBlank,
            AnswerKey::Matching { .. } => QuestionType::Matching,
        }
    }
}

/// A learner's submitted value for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum Response {
    Choice(usize),
    Choices(Vec<usize>),
    Bool(bool),
    Text(String),
    Sequence(Vec<SequenceItem>),
    Placements(Vec<Placement>),
    Blanks(BTreeMap<String, String>),
    Pairs(Vec<MatchPair>),
}

/// A submitted answer together with the time the learner spent on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub response: Response,
    #[serde(default)]
    pub time_spent_secs: u32,
}

impl Answer {
    pub fn new(response: Response) -> Self {
        Self {
            response,
            time_spent_secs: 0,
        }
    }

    pub fn with_time(mut self, secs: u32) -> Self {
        self.time_spent_secs = secs;
        self
    }
}

/// Answers for one attempt, keyed by question index. Missing entries are
/// skipped or timed-out questions.
pub type AnswerSheet = BTreeMap<usize, Answer>;

/// A single quiz question. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub answer: AnswerKey,
    #[serde(default = "default_points")]
    pub points: u32,
    #[serde(default)]
    pub time_limit_secs: Option<u32>,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub explanation: String,
}

fn default_points() -> u32 {
    1
}

impl Question {
    pub fn question_type(&self) -> QuestionType {
        self.answer.question_type()
    }
}

/// A quiz attached to a technique or module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub questions: Vec<Question>,
    /// Quiz-specific passing percentage. Only applied under
    /// [`crate::scoring::PassPolicy::Quiz`].
    #[serde(default)]
    pub passing_score: Option<u32>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub time_limit_minutes: Option<u32>,
}

impl Quiz {
    /// Sum of all question points.
    pub fn max_score(&self) -> u32 {
        crate::results::saturating_sum(self.questions.iter().map(|q| q.points))
    }
}
