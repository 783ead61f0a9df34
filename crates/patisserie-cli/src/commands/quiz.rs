//! The `patisserie quiz` and `patisserie stats` commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use patisserie_core::attempts::QuizAttempt;
use patisserie_core::curriculum::{ModuleId, PathId};
use patisserie_core::model::AnswerSheet;
use patisserie_report::html::{generate_quiz_html, write_quiz_html};
use patisserie_report::markdown::{quiz_markdown, write_quiz_markdown};
use patisserie_report::{describe_answer, write_report, QuizReport};

use super::progress::ensure_accessible;
use super::{ensure_format, Session};

pub fn execute(
    quiz_id: String,
    answers_path: PathBuf,
    format: String,
    output: Option<PathBuf>,
    complete: Option<(String, String)>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    ensure_format(&format)?;
    let session = Session::load(config_path)?;
    let quiz = session
        .library
        .quiz(&quiz_id)
        .with_context(|| format!("unknown quiz '{quiz_id}'"))?;

    let content = std::fs::read_to_string(&answers_path)
        .with_context(|| format!("failed to read answers: {}", answers_path.display()))?;
    let answers: AnswerSheet = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse answers: {}", answers_path.display()))?;

    let attempts = session.attempts();
    let max_attempts = session.config.max_attempts_for(quiz);
    anyhow::ensure!(
        attempts.can_user_retake(&quiz.id, &session.config.user_id, max_attempts),
        "no attempts left for quiz '{}' ({max_attempts} allowed)",
        quiz.id
    );

    let tracker = session.tracker();
    let target = complete.map(|(path, module)| (PathId::new(path), ModuleId::new(module)));
    if let Some((path_id, module_id)) = &target {
        ensure_accessible(&tracker, path_id, module_id)?;
    }

    let results = session.config.scorer().score_quiz(quiz, &answers);
    tracing::info!(
        "scored '{}': {}/{} ({}%)",
        quiz.id,
        results.score,
        results.max_score,
        results.percentage
    );

    let attempt = QuizAttempt::from_results(
        quiz.id.clone(),
        session.config.user_id.clone(),
        answers,
        &results,
    );
    attempts
        .try_save(attempt)
        .context("failed to record quiz attempt")?;

    if let Some((path_id, module_id)) = &target {
        if results.passed {
            let outcome = tracker.complete_module(module_id, path_id, Some(results.percentage));
            for note in &outcome.notifications {
                eprintln!("{note}");
            }
        } else {
            eprintln!("Quiz not passed; '{module_id}' stays incomplete.");
        }
    }

    let report = QuizReport::new(quiz, session.config.user_id.clone(), results)
        .with_statistics(attempts.statistics(&quiz.id));

    if let Some(path) = output.as_deref() {
        match format.as_str() {
            "json" => report.save_json(path)?,
            "markdown" | "md" => write_quiz_markdown(&report, path)?,
            "html" => write_quiz_html(&report, path)?,
            _ => write_report(&quiz_text(&report), path)?,
        }
        eprintln!("Report written to {}", path.display());
        return Ok(());
    }

    let rendered = match format.as_str() {
        "text" => quiz_text(&report),
        "json" => serde_json::to_string_pretty(&report)?,
        "markdown" | "md" => quiz_markdown(&report),
        "html" => generate_quiz_html(&report),
        other => anyhow::bail!("unknown format: {other}"),
    };
    println!("{rendered}");
    Ok(())
}

fn quiz_text(report: &QuizReport) -> String {
    let results = &report.results;

    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Type", "Result", "Points"]);
    for (index, question) in results.question_results.iter().enumerate() {
        let status = if question.is_correct {
            "correct".to_string()
        } else if question.answered {
            format!("incorrect ({})", describe_answer(&question.correct_answer))
        } else {
            "skipped".to_string()
        };
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(report.prompts.get(index).map_or("", String::as_str)),
            Cell::new(question.question_type),
            Cell::new(status),
            Cell::new(format!(
                "{}/{}",
                question.points_earned, question.points_possible
            )),
        ]);
    }

    let mut text = format!("{}\n{table}\n", report.quiz_title);
    text.push_str(&format!(
        "\nScore: {}/{} ({}%) {} (threshold {}%)\n",
        results.score,
        results.max_score,
        results.percentage,
        if results.passed { "PASSED" } else { "FAILED" },
        results.passing_threshold,
    ));
    if results.has_threshold_discrepancy() {
        if let Some(quiz_score) = results.quiz_passing_score {
            text.push_str(&format!(
                "Note: the quiz sets its own passing score of {quiz_score}%.\n"
            ));
        }
    }
    for (heading, items) in [
        ("Strengths", &results.strengths),
        ("Areas to improve", &results.weaknesses),
        ("Recommendations", &results.recommendations),
    ] {
        if !items.is_empty() {
            text.push_str(&format!("\n{heading}:\n"));
            for item in items {
                text.push_str(&format!("  - {item}\n"));
            }
        }
    }
    if let Some(stats) = &report.statistics {
        text.push_str(&format!(
            "\nAttempts: {} | best {}% | average {:.1}%\n",
            stats.total_attempts, stats.best_score, stats.average_score
        ));
    }
    text
}

pub fn stats(quiz_id: String, config_path: Option<PathBuf>) -> Result<()> {
    let session = Session::load(config_path)?;
    let quiz = session
        .library
        .quiz(&quiz_id)
        .with_context(|| format!("unknown quiz '{quiz_id}'"))?;

    let attempts = session.attempts();
    let history = attempts.for_quiz(&quiz.id);
    if history.is_empty() {
        println!("No attempts recorded for '{}'.", quiz.id);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Completed", "User", "Score", "Percent", "Passed", "Time"]);
    for attempt in &history {
        table.add_row(vec![
            Cell::new(attempt.completed_at.format("%Y-%m-%d %H:%M")),
            Cell::new(&attempt.user_id),
            Cell::new(format!("{}/{}", attempt.score, attempt.max_score)),
            Cell::new(format!("{}%", attempt.percentage)),
            Cell::new(if attempt.passed { "yes" } else { "no" }),
            Cell::new(format!("{}s", attempt.time_spent_secs)),
        ]);
    }
    println!("{}\n{table}", quiz.title);

    let stats = attempts.statistics(&quiz.id);
    let max_attempts = session.config.max_attempts_for(quiz);
    println!(
        "\nAttempts: {}/{max_attempts} | best {}% | average {:.1}% | pass rate {:.1}% | avg time {:.0}s",
        stats.total_attempts,
        stats.best_score,
        stats.average_score,
        stats.pass_rate,
        stats.average_time_spent_secs,
    );
    if !attempts.can_user_retake(&quiz.id, &session.config.user_id, max_attempts) {
        println!("No attempts left.");
    }

    Ok(())
}
