//! Answer Matcher: binary correctness for every question type.
//!
//! All per-type rules live behind [`matches_key`], a single exhaustive match
//! over [`AnswerKey`]. A response whose shape does not fit the key is simply
//! incorrect; nothing here panics or returns an error.

use std::collections::HashSet;

use crate::model::{
    Answer, AnswerKey, Blank, ChoiceKey, MatchPair, Placement, Question, Response, TruthKey,
};

/// Decide whether `answer` is a correct answer to `question`.
///
/// `None` means the learner skipped the question or ran out of time.
pub fn is_correct(question: &Question, answer: Option<&Answer>) -> bool {
    match answer {
        Some(answer) => matches_key(&question.answer, &answer.response),
        None => false,
    }
}

/// Match a response against an answer key.
pub fn matches_key(key: &AnswerKey, response: &Response) -> bool {
    match key {
        AnswerKey::MultipleChoice { correct, .. } => choice_matches(correct, response),
        AnswerKey::TrueFalse { correct } => truth_matches(correct, response),
        AnswerKey::Sequence { correct_order, .. } => sequence_matches(correct_order, response),
        AnswerKey::DragDrop { items, targets } => placements_match(items, targets, response),
        AnswerKey::FillBlank { blanks } => blanks_match(blanks, response),
        AnswerKey::Matching { pairs } => pairs_match(pairs, response),
    }
}

fn choice_matches(correct: &ChoiceKey, response: &Response) -> bool {
    match (correct, response) {
        (ChoiceKey::Single(expected), Response::Choice(selected)) => expected == selected,
        (ChoiceKey::Single(expected), Response::Choices(selected)) => {
            selected.as_slice() == [*expected]
        }
        (ChoiceKey::Set(expected), Response::Choices(selected)) => {
            !expected.is_empty()
                && selected.len() == expected.len()
                && expected.iter().all(|index| selected.contains(index))
        }
        (ChoiceKey::Set(expected), Response::Choice(selected)) => {
            expected.as_slice() == [*selected]
        }
        _ => false,
    }
}

fn truth_matches(correct: &TruthKey, response: &Response) -> bool {
    let submitted = match response {
        Response::Bool(b) => Some(*b),
        Response::Choice(1) => Some(true),
        Response::Choice(0) => Some(false),
        Response::Text(text) => {
            let text = text.trim();
            if text.eq_ignore_ascii_case("true") {
                Some(true)
            } else if text.eq_ignore_ascii_case("false") {
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    };
    submitted == Some(correct.as_bool())
}

fn sequence_matches(correct_order: &[u32], response: &Response) -> bool {
    let Response::Sequence(steps) = response else {
        return false;
    };
    !correct_order.is_empty()
        && steps.len() == correct_order.len()
        && steps
            .iter()
            .zip(correct_order)
            .all(|(step, expected)| step.order == *expected)
}

fn placements_match(items: &[String], targets: &[String], response: &Response) -> bool {
    let Response::Placements(placements) = response else {
        return false;
    };
    if items.is_empty() || placements.len() != items.len() {
        return false;
    }

    let placed: HashSet<&str> = placements.iter().map(|p| p.item.as_str()).collect();
    if placed.len() != items.len() {
        return false;
    }

    placements
        .iter()
        .all(|placement| placement_is_correct(items, targets, placement))
}

fn placement_is_correct(items: &[String], targets: &[String], placement: &Placement) -> bool {
    items
        .iter()
        .position(|item| *item == placement.item)
        .and_then(|index| targets.get(index))
        .is_some_and(|target| *target == placement.target)
}

fn blanks_match(blanks: &[Blank], response: &Response) -> bool {
    if blanks.is_empty() {
        return false;
    }
    match response {
        Response::Blanks(filled) => blanks.iter().all(|blank| {
            filled
                .get(&blank.id)
                .is_some_and(|value| blank.accepts(value))
        }),
        // Single-blank questions may be answered with plain text.
        Response::Text(value) => blanks.len() == 1 && blanks[0].accepts(value),
        _ => false,
    }
}

fn pairs_match(pairs: &[MatchPair], response: &Response) -> bool {
    let Response::Pairs(submitted) = response else {
        return false;
    };
    if pairs.is_empty() || submitted.len() != pairs.len() {
        return false;
    }
    pairs.iter().all(|expected| {
        submitted
            .iter()
            .find(|pair| pair.left == expected.left)
            .is_some_and(|pair| pair.right == expected.right)
    })
}
