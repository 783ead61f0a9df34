//! Markdown rendering.

use std::path::Path;

use anyhow::Result;
use patisserie_core::progress::ProgressStatus;

use crate::{describe_answer, write_report, ProgressReport, QuizReport};

/// Render a scored quiz as Markdown.
pub fn quiz_markdown(report: &QuizReport) -> String {
    let results = &report.results;
    let mut md = String::new();

    md.push_str(&format!("# {}\n\n", report.quiz_title));
    md.push_str(&format!(
        "**Score:** {}/{} ({}%) | **Result:** {} | **Threshold:** {}%\n\n",
        results.score,
        results.max_score,
        results.percentage,
        if results.passed { "PASSED" } else { "FAILED" },
        results.passing_threshold,
    ));
    if results.has_threshold_discrepancy() {
        if let Some(quiz_score) = results.quiz_passing_score {
            md.push_str(&format!(
                "> The quiz sets its own passing score of {quiz_score}%, which was not applied.\n\n"
            ));
        }
    }

    md.push_str("## Questions\n\n");
    md.push_str("| # | Question | Type | Result | Points |\n");
    md.push_str("|---|----------|------|--------|--------|\n");
    for (index, question) in results.question_results.iter().enumerate() {
        let status = if question.is_correct {
            "correct"
        } else if question.answered {
            "incorrect"
        } else {
            "skipped"
        };
        md.push_str(&format!(
            "| {} | {} | {} | {} | {}/{} |\n",
            index + 1,
            escape_cell(report.prompt(index)),
            question.question_type,
            status,
            question.points_earned,
            question.points_possible,
        ));
    }

    let missed: Vec<_> = results
        .question_results
        .iter()
        .enumerate()
        .filter(|(_, q)| !q.is_correct)
        .collect();
    if !missed.is_empty() {
        md.push_str("\n## Review\n\n");
        for (index, question) in missed {
            md.push_str(&format!(
                "- **Q{}:** {}\n",
                index + 1,
                describe_answer(&question.correct_answer)
            ));
            if !question.explanation.is_empty() {
                md.push_str(&format!("  {}\n", question.explanation));
            }
        }
    }

    push_list(&mut md, "Strengths", &results.strengths);
    push_list(&mut md, "Areas to improve", &results.weaknesses);
    push_list(&mut md, "Recommendations", &results.recommendations);

    if let Some(stats) = &report.statistics {
        md.push_str("\n## History\n\n");
        md.push_str(&format!(
            "{} attempts | best {}% | average {:.1}% | pass rate {:.1}%\n",
            stats.total_attempts, stats.best_score, stats.average_score, stats.pass_rate
        ));
    }

    md
}

/// Render learning progress as Markdown.
pub fn progress_markdown(report: &ProgressReport) -> String {
    let mut md = String::new();
    md.push_str("# Learning progress\n\n");

    if report.paths.is_empty() {
        md.push_str("No learning paths available.\n");
        return md;
    }

    md.push_str("| Path | Status | Modules | Completion | Time |\n");
    md.push_str("|------|--------|---------|------------|------|\n");
    for path in &report.paths {
        md.push_str(&format!(
            "| {} | {} | {}/{} | {}% | {} min |\n",
            escape_cell(&path.title),
            path.status,
            path.completed_modules,
            path.total_modules,
            path.completion_percent,
            path.time_spent_minutes,
        ));
    }

    for path in report
        .paths
        .iter()
        .filter(|p| p.status != ProgressStatus::NotStarted)
    {
        md.push_str(&format!("\n## {}\n\n", path.title));
        for module in &path.modules {
            let mark = match module.status {
                ProgressStatus::Completed => "[x]",
                _ => "[ ]",
            };
            let mut line = format!("- {mark} {}", module.title);
            if let Some(score) = module.score {
                line.push_str(&format!(" ({score}%)"));
            }
            if !module.unlocked && module.status == ProgressStatus::NotStarted {
                line.push_str(" (locked)");
            }
            md.push_str(&line);
            md.push('\n');
        }
    }

    md
}

fn push_list(md: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    md.push_str(&format!("\n## {heading}\n\n"));
    for item in items {
        md.push_str(&format!("- {item}\n"));
    }
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

pub fn write_quiz_markdown(report: &QuizReport, path: &Path) -> Result<()> {
    write_report(&quiz_markdown(report), path)
}

pub fn write_progress_markdown(report: &ProgressReport, path: &Path) -> Result<()> {
    write_report(&progress_markdown(report), path)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fixtures;
    use patisserie_core::completion::ProgressTracker;
    use patisserie_core::curriculum::{LearningPath, Module, ModuleId, PathId};
    use patisserie_core::storage::MemoryStore;

    #[test]
    fn quiz_markdown_output() {
        let md = quiz_markdown(&fixtures::report());
        assert!(md.starts_with("# Ganache <Basics>"));
        assert!(md.contains("**Score:** 2/4 (50%)"));
        assert!(md.contains("FAILED"));
        assert!(md.contains("passing score of 80%"));
        assert!(md.contains("| 3 | Stir from the ____ outward. | fill-blank | skipped | 0/1 |"));
        assert!(md.contains("- **Q2:** false"));
        assert!(md.contains("- **Q3:** centre"));
        assert!(md.contains("## History"));
    }

    #[test]
    fn progress_markdown_output() {
        let paths = vec![LearningPath::new("tarts", "Tarts").with_modules(vec![
            Module::new("shell", "Shell"),
            Module::new("filling", "Filling").with_prerequisites(&["shell"]),
            Module::new("glaze", "Glaze").with_prerequisites(&["filling"]),
        ])];
        let tracker = ProgressTracker::new(Arc::new(MemoryStore::new()), paths.clone());
        let tarts = PathId::new("tarts");
        tracker.start_path(&tarts);
        tracker.complete_module(&ModuleId::new("shell"), &tarts, Some(95));

        let md = progress_markdown(&ProgressReport::build(&paths, &tracker.state()));
        assert!(md.contains("| Tarts | in-progress | 1/3 | 33% | 0 min |"));
        assert!(md.contains("- [x] Shell (95%)"));
        assert!(md.contains("- [ ] Filling\n"));
        assert!(md.contains("- [ ] Glaze (locked)"));
    }

    #[test]
    fn progress_markdown_without_paths() {
        let md = progress_markdown(&ProgressReport::build(&[], &Default::default()));
        assert!(md.contains("No learning paths available."));
    }

    #[test]
    fn markdown_report_written_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("quiz.md");

        write_quiz_markdown(&fixtures::report(), &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Ganache <Basics>"));
    }
}
