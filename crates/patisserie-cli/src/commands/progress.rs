//! Progress commands: `start`, `complete`, `check`, `reset` and `progress`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use patisserie_core::completion::ProgressTracker;
use patisserie_core::curriculum::{LearningPath, ModuleId, PathId};
use patisserie_core::prerequisites::PrerequisiteCheck;
use patisserie_report::html::{generate_progress_html, write_progress_html};
use patisserie_report::markdown::{progress_markdown, write_progress_markdown};
use patisserie_report::{write_report, ProgressReport};

use super::{ensure_format, Session};

fn find_path<'a>(tracker: &'a ProgressTracker, path_id: &PathId) -> Result<&'a LearningPath> {
    tracker
        .path(path_id)
        .with_context(|| format!("unknown path '{path_id}'"))
}

fn find_module(path: &LearningPath, module_id: &ModuleId) -> Result<()> {
    anyhow::ensure!(
        path.contains_module(module_id),
        "unknown module '{module_id}' in path '{}'",
        path.id
    );
    Ok(())
}

fn missing(check: &PrerequisiteCheck) -> String {
    let unmet: Vec<String> = check.unmet_conditions().map(|c| c.description.clone()).collect();
    if unmet.is_empty() {
        String::new()
    } else {
        format!(": {}", unmet.join("; "))
    }
}

/// Fail unless both the path and the module can be worked on.
pub(super) fn ensure_accessible(
    tracker: &ProgressTracker,
    path_id: &PathId,
    module_id: &ModuleId,
) -> Result<()> {
    find_module(find_path(tracker, path_id)?, module_id)?;
    if let Some(check) = tracker.check_path(path_id).filter(|c| !c.is_accessible()) {
        anyhow::bail!("path '{path_id}' is locked{}", missing(&check));
    }
    if let Some(check) = tracker
        .check_module(path_id, module_id)
        .filter(|c| !c.is_accessible())
    {
        anyhow::bail!("module '{module_id}' is locked{}", missing(&check));
    }
    Ok(())
}

pub fn start(path: String, module: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let session = Session::load(config_path)?;
    let tracker = session.tracker();
    let path_id = PathId::new(path);

    match module {
        Some(module) => {
            let module_id = ModuleId::new(module);
            ensure_accessible(&tracker, &path_id, &module_id)?;
            anyhow::ensure!(
                tracker.start_module(&path_id, &module_id),
                "could not start module '{module_id}'"
            );
            println!("Started module '{module_id}'");
        }
        None => {
            let title = find_path(&tracker, &path_id)?.title.clone();
            let Some(unlocked) = tracker.start_path(&path_id) else {
                let detail = tracker
                    .check_path(&path_id)
                    .map(|c| missing(&c))
                    .unwrap_or_default();
                anyhow::bail!("path '{path_id}' is locked{detail}");
            };
            println!("Started path '{title}'");
            if !unlocked.is_empty() {
                let ids: Vec<&str> = unlocked.iter().map(ModuleId::as_str).collect();
                println!("Unlocked: {}", ids.join(", "));
            }
        }
    }

    if let Some(current) = tracker.current_module() {
        println!("Current module: {current}");
    }
    Ok(())
}

pub fn complete(
    path: String,
    module: String,
    score: Option<u32>,
    minutes: Option<u32>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    if let Some(score) = score {
        anyhow::ensure!(score <= 100, "score must be between 0 and 100");
    }

    let session = Session::load(config_path)?;
    let tracker = session.tracker();
    let (path_id, module_id) = (PathId::new(path), ModuleId::new(module));
    ensure_accessible(&tracker, &path_id, &module_id)?;

    if let Some(minutes) = minutes {
        // Time is recorded first so time-based conditions see it.
        anyhow::ensure!(
            tracker.start_module(&path_id, &module_id),
            "could not start module '{module_id}'"
        );
        anyhow::ensure!(
            tracker.record_time(&path_id, &module_id, minutes),
            "could not record time for module '{module_id}'"
        );
    }

    let outcome = tracker.complete_module(&module_id, &path_id, score);
    if outcome.notifications.is_empty() {
        println!("Module '{module_id}' was already completed.");
    }
    for note in &outcome.notifications {
        println!("{note}");
    }
    for achievement in &outcome.achievements {
        println!("Achievement: {achievement}");
    }
    match tracker.current_module() {
        Some(next) if tracker.current_path().as_ref() == Some(&path_id) => {
            println!("Next module: {next}");
        }
        _ => {}
    }

    Ok(())
}

pub fn check(path: String, module: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let session = Session::load(config_path)?;
    let tracker = session.tracker();
    let path_id = PathId::new(path);
    let path = find_path(&tracker, &path_id)?;

    let check = match module {
        Some(module) => {
            let module_id = ModuleId::new(module);
            find_module(path, &module_id)?;
            tracker.check_module(&path_id, &module_id)
        }
        None => tracker.check_path(&path_id),
    }
    .with_context(|| format!("could not check '{path_id}'"))?;

    let state = if check.is_unlocked {
        "unlocked"
    } else if check.can_unlock {
        "ready to unlock"
    } else {
        "locked"
    };
    println!("{}: {state} ({}% of conditions met)", check.target_id, check.progress_percent);

    if !check.conditions.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Condition", "Kind", "Required", "Current", "Met"]);
        for condition in &check.conditions {
            table.add_row(vec![
                Cell::new(&condition.condition_id),
                Cell::new(condition.kind),
                Cell::new(condition.required_value),
                Cell::new(condition.current_value),
                Cell::new(if condition.is_met { "yes" } else { "no" }),
            ]);
        }
        println!("{table}");
    }
    if !check.missing_prerequisites.is_empty() {
        println!("Missing: {}", check.missing_prerequisites.join(", "));
    }

    Ok(())
}

pub fn reset(path: String, module: String, config_path: Option<PathBuf>) -> Result<()> {
    let session = Session::load(config_path)?;
    let tracker = session.tracker();
    let (path_id, module_id) = (PathId::new(path), ModuleId::new(module));
    find_module(find_path(&tracker, &path_id)?, &module_id)?;

    anyhow::ensure!(
        tracker.reset_module(&path_id, &module_id),
        "could not reset module '{module_id}'"
    );
    println!("Reset module '{module_id}'");
    Ok(())
}

pub fn show(format: String, output: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<()> {
    ensure_format(&format)?;
    let session = Session::load(config_path)?;
    let tracker = session.tracker();
    let report = ProgressReport::build(tracker.paths(), &tracker.state());

    if let Some(path) = output.as_deref() {
        match format.as_str() {
            "json" => report.save_json(path)?,
            "markdown" | "md" => write_progress_markdown(&report, path)?,
            "html" => write_progress_html(&report, path)?,
            _ => write_report(&progress_text(&tracker, &report), path)?,
        }
        eprintln!("Report written to {}", path.display());
        return Ok(());
    }

    let rendered = match format.as_str() {
        "text" => progress_text(&tracker, &report),
        "json" => serde_json::to_string_pretty(&report)?,
        "markdown" | "md" => progress_markdown(&report),
        "html" => generate_progress_html(&report),
        other => anyhow::bail!("unknown format: {other}"),
    };
    println!("{rendered}");
    Ok(())
}

fn progress_text(tracker: &ProgressTracker, report: &ProgressReport) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Path", "Status", "Modules", "Completion", "Time"]);
    for path in &report.paths {
        table.add_row(vec![
            Cell::new(&path.title),
            Cell::new(path.status),
            Cell::new(format!("{}/{}", path.completed_modules, path.total_modules)),
            Cell::new(format!("{}%", path.completion_percent)),
            Cell::new(format!("{} min", path.time_spent_minutes)),
        ]);
    }
    let mut text = table.to_string();
    if let Some(current) = tracker.current_path() {
        text.push_str(&format!("\nCurrent path: {current}"));
    }
    if let Some(current) = tracker.current_module() {
        text.push_str(&format!("\nCurrent module: {current}"));
    }
    text
}
