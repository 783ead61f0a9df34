//! End-to-end learning flow over the bundled content.
//!
//! Walks a learner from the first module of the foundations path through to
//! the croissant module, scoring the foundations quiz on the way.

use std::collections::BTreeMap;
use std::sync::Arc;

use patisserie_core::attempts::{AttemptStore, QuizAttempt};
use patisserie_core::completion::{Achievement, ProgressTracker};
use patisserie_core::content::{bundled, validate_content};
use patisserie_core::curriculum::{ModuleId, PathId};
use patisserie_core::model::{
    Answer, AnswerSheet, MatchPair, Placement, Response, SequenceItem,
};
use patisserie_core::progress::ProgressStatus;
use patisserie_core::scoring::{score, PassPolicy, Scorer};
use patisserie_core::storage::{JsonFileStore, KeyValueStore, MemoryStore};

fn module(id: &str) -> ModuleId {
    ModuleId::new(id)
}

fn foundations_answers() -> AnswerSheet {
    let step = |order| SequenceItem {
        id: String::new(),
        text: String::new(),
        order,
    };
    let place = |item: &str, target: &str| Placement {
        item: item.into(),
        target: target.into(),
    };
    let pair = |left: &str, right: &str| MatchPair {
        left: left.into(),
        right: right.into(),
    };

    AnswerSheet::from([
        (0, Answer::new(Response::Choice(1)).with_time(30)),
        (1, Answer::new(Response::Bool(true)).with_time(10)),
        (
            2,
            Answer::new(Response::Sequence(vec![step(0), step(1), step(2), step(3)])),
        ),
        (
            3,
            Answer::new(Response::Placements(vec![
                place("Pâte à choux", "Éclair shell"),
                place("Pâte sucrée", "Tart shell"),
                place("Crème pâtissière", "Filling"),
            ])),
        ),
        (
            4,
            Answer::new(Response::Blanks(BTreeMap::from([(
                "starch".to_string(),
                " Corn Starch ".to_string(),
            )]))),
        ),
        // Wrong: the two-point matching question.
        (
            5,
            Answer::new(Response::Pairs(vec![
                pair("Blind baking", "Pricking dough so it stays flat"),
                pair("Docking", "Baking a shell without its filling"),
                pair("Nappe", "Coats the back of a spoon"),
            ])),
        ),
    ])
}

#[test]
fn bundled_content_is_consistent() {
    let library = bundled();
    assert_eq!(library.paths.len(), 3);
    assert!(validate_content(&library).is_empty());
}

#[test]
fn scoring_the_foundations_quiz() {
    let library = bundled();
    let quiz = library.quiz("foundations-quiz").unwrap();
    let answers = foundations_answers();

    // 5 of 7 points: 71%.
    let fixed = Scorer::default().score_quiz(quiz, &answers);
    assert_eq!((fixed.score, fixed.max_score, fixed.percentage), (5, 7, 71));
    assert!(fixed.passed);
    assert!(fixed.has_threshold_discrepancy());
    assert_eq!(fixed.time_spent_secs, 40);

    let quiz_defined = Scorer::new(70, PassPolicy::Quiz).score_quiz(quiz, &answers);
    assert_eq!(quiz_defined.passing_threshold, 75);
    assert!(!quiz_defined.passed);

    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let attempts = AttemptStore::new(store);
    attempts.save(QuizAttempt::from_results(quiz.id.clone(), "baker", answers, &fixed));
    let blank = score(&quiz.questions, &AnswerSheet::new());
    attempts.save(QuizAttempt::from_results(
        quiz.id.clone(),
        "baker",
        AnswerSheet::new(),
        &blank,
    ));

    let stats = attempts.statistics(&quiz.id);
    assert_eq!(stats.total_attempts, 2);
    assert_eq!(stats.best_score, 71);
    assert!((stats.pass_rate - 50.0).abs() < f64::EPSILON);
    assert!(attempts.can_retake(&quiz.id, 3));
    assert!(!attempts.can_retake(&quiz.id, 2));
}

#[test]
fn from_first_module_to_croissants() {
    let library = bundled();
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let tracker = ProgressTracker::new(store, library.paths.clone());

    let foundations = PathId::new("pastry-foundations");
    let choux = PathId::new("choux-mastery");
    let laminated = PathId::new("laminated-doughs");

    assert!(tracker.can_access_path(&foundations));
    assert!(!tracker.can_access_path(&choux));
    assert_eq!(tracker.start_path(&choux), None);

    assert_eq!(
        tracker.start_path(&foundations),
        Some(vec![module("kitchen-essentials")])
    );

    let outcome = tracker.complete_module(&module("kitchen-essentials"), &foundations, None);
    assert_eq!(
        outcome.newly_unlocked_modules,
        vec![module("pate-sucree"), module("creme-patissiere")]
    );
    assert_eq!(outcome.achievements, vec![Achievement::FirstModule]);

    tracker.complete_module(&module("pate-sucree"), &foundations, None);
    let outcome = tracker.complete_module(&module("creme-patissiere"), &foundations, None);
    assert_eq!(outcome.newly_unlocked_modules, vec![module("foundations-quiz")]);

    // A quiz score below the fruit tart's threshold keeps it locked.
    let outcome = tracker.complete_module(&module("foundations-quiz"), &foundations, Some(71));
    assert!(outcome.newly_unlocked_modules.is_empty());
    let check = tracker
        .check_module(&foundations, &module("fruit-tart"))
        .unwrap();
    assert!(!check.can_unlock);
    assert_eq!(check.unmet_conditions().count(), 1);

    // Retaking with a better score unlocks it; the best score counts.
    let outcome = tracker.complete_module(&module("foundations-quiz"), &foundations, Some(86));
    assert_eq!(outcome.newly_unlocked_modules, vec![module("fruit-tart")]);
    assert_eq!(
        tracker
            .module_progress(&foundations, &module("foundations-quiz"))
            .unwrap()
            .attempts,
        2
    );

    let outcome = tracker.complete_module(&module("fruit-tart"), &foundations, Some(100));
    assert!(outcome.path_completed);
    assert!(outcome.achievements.contains(&Achievement::PathComplete));
    assert!(outcome.achievements.contains(&Achievement::PerfectScore));
    assert_eq!(
        tracker.path_progress(&foundations).unwrap().status,
        ProgressStatus::Completed
    );

    assert!(tracker.can_access_path(&choux));
    assert!(tracker.start_path(&choux).is_some());
    for id in ["panade", "piping-choux", "eclairs"] {
        tracker.complete_module(&module(id), &choux, None);
    }

    assert!(tracker.start_path(&laminated).is_some());
    tracker.complete_module(&module("detrempe"), &laminated, None);
    assert!(tracker.start_module(&laminated, &module("lamination")));
    assert!(tracker.record_time(&laminated, &module("lamination"), 60));

    // Sixty minutes of practice is not enough for croissants.
    let outcome = tracker.complete_module(&module("lamination"), &laminated, None);
    assert!(outcome.newly_unlocked_modules.is_empty());
    assert!(!tracker.is_module_accessible(&laminated, &module("croissants")));

    // Conditions are re-evaluated on every check.
    assert!(tracker.record_time(&laminated, &module("lamination"), 75));
    let check = tracker
        .check_module(&laminated, &module("croissants"))
        .unwrap();
    assert!(check.can_unlock);
    assert_eq!(check.progress_percent, 100);
    assert!(tracker.start_module(&laminated, &module("croissants")));
    assert_eq!(tracker.current_module(), Some(module("croissants")));
}

#[test]
fn progress_survives_a_new_tracker() {
    let dir = tempfile::tempdir().unwrap();
    let library = bundled();
    let foundations = PathId::new("pastry-foundations");

    {
        let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(dir.path()));
        let tracker = ProgressTracker::new(store, library.paths.clone());
        tracker.start_path(&foundations);
        tracker.complete_module(&module("kitchen-essentials"), &foundations, Some(90));
    }

    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(dir.path()));
    let tracker = ProgressTracker::new(store, library.paths.clone());
    let progress = tracker
        .module_progress(&foundations, &module("kitchen-essentials"))
        .unwrap();
    assert_eq!(progress.status, ProgressStatus::Completed);
    assert_eq!(progress.score, Some(90));
    assert!(tracker.is_module_accessible(&foundations, &module("pate-sucree")));
    assert_eq!(tracker.current_path(), Some(foundations));
}
