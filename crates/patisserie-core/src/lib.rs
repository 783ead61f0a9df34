//! patisserie-core: quiz scoring, prerequisite evaluation and progress
//! tracking for the patisserie learning app.
//!
//! Answers are matched per question type, totalled into [`results::QuizResults`],
//! and recorded by the [`attempts::AttemptStore`]. The
//! [`completion::ProgressTracker`] runs the Prerequisite Evaluator whenever a
//! module is completed so dependent modules unlock on their own. All state
//! goes through the [`storage::KeyValueStore`] trait.

pub mod attempts;
pub mod catalog;
pub mod completion;
pub mod config;
pub mod content;
pub mod curriculum;
pub mod error;
pub mod matcher;
pub mod model;
pub mod prerequisites;
pub mod progress;
pub mod results;
pub mod scoring;
pub mod storage;
