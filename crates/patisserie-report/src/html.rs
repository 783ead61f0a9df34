//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS inlined.

use anyhow::Result;
use std::path::Path;

use patisserie_core::progress::ProgressStatus;

use crate::{describe_answer, write_report, ProgressReport, QuizReport};

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn open_document(html: &mut String, title: &str) {
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!("<title>{}</title>\n", html_escape(title)));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");
}

fn close_document(html: &mut String) {
    html.push_str("</body>\n</html>");
}

/// Generate an HTML page for a scored quiz.
pub fn generate_quiz_html(report: &QuizReport) -> String {
    let results = &report.results;
    let mut html = String::new();
    open_document(&mut html, &format!("Quiz results: {}", report.quiz_title));

    // Header
    html.push_str("<header>\n");
    html.push_str(&format!("<h1>{}</h1>\n", html_escape(&report.quiz_title)));
    html.push_str(&format!(
        "<p class=\"meta\">Learner: <strong>{}</strong> | {}</p>\n",
        html_escape(&report.user_id),
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    // Score
    let verdict = if results.passed { "pass" } else { "fail" };
    html.push_str("<section class=\"dashboard\">\n");
    html.push_str(&format!(
        "<p class=\"score {verdict}\">{}/{} points ({}%), {}</p>\n",
        results.score,
        results.max_score,
        results.percentage,
        if results.passed { "passed" } else { "not passed" }
    ));
    html.push_str(&progress_bar(results.percentage));
    html.push_str(&format!(
        "<p class=\"meta\">Passing threshold: {}%</p>\n",
        results.passing_threshold
    ));
    if results.has_threshold_discrepancy() {
        if let Some(quiz_score) = results.quiz_passing_score {
            html.push_str(&format!(
                "<p class=\"note\">This quiz sets its own passing score of {quiz_score}%, which was not applied.</p>\n"
            ));
        }
    }
    html.push_str("</section>\n");

    // Per-question results
    html.push_str("<section class=\"results\">\n");
    html.push_str("<h2>Questions</h2>\n");
    html.push_str("<table>\n");
    html.push_str("<thead><tr><th>#</th><th>Question</th><th>Type</th><th>Points</th><th>Correct answer</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for (index, question) in results.question_results.iter().enumerate() {
        let class = if question.is_correct { "pass" } else { "fail" };
        let mut prompt = html_escape(report.prompt(index));
        if !question.answered {
            prompt.push_str(" <em>(skipped)</em>");
        }
        if !question.is_correct && !question.explanation.is_empty() {
            prompt.push_str(&format!(
                "<br><small>{}</small>",
                html_escape(&question.explanation)
            ));
        }
        html.push_str(&format!(
            "<tr class=\"{class}\"><td>{}</td><td>{prompt}</td><td>{}</td><td>{}/{}</td><td>{}</td></tr>\n",
            index + 1,
            question.question_type,
            question.points_earned,
            question.points_possible,
            html_escape(&describe_answer(&question.correct_answer)),
        ));
    }
    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    // Feedback
    html.push_str("<section class=\"feedback\">\n");
    push_list(&mut html, "Strengths", &results.strengths);
    push_list(&mut html, "Areas to improve", &results.weaknesses);
    push_list(&mut html, "Recommendations", &results.recommendations);
    html.push_str("</section>\n");

    if let Some(stats) = &report.statistics {
        html.push_str("<section class=\"history\">\n<h2>History</h2>\n");
        html.push_str("<table>\n<tbody>\n");
        html.push_str(&format!(
            "<tr><th>Attempts</th><td>{}</td></tr>\n<tr><th>Best score</th><td>{}%</td></tr>\n<tr><th>Average score</th><td>{:.1}%</td></tr>\n<tr><th>Pass rate</th><td>{:.1}%</td></tr>\n",
            stats.total_attempts, stats.best_score, stats.average_score, stats.pass_rate
        ));
        html.push_str("</tbody></table>\n</section>\n");
    }

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(report).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    close_document(&mut html);
    html
}

/// Generate an HTML page for learning progress.
pub fn generate_progress_html(report: &ProgressReport) -> String {
    let mut html = String::new();
    open_document(&mut html, "Learning progress");

    html.push_str("<header>\n<h1>Learning progress</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">{} paths | {}</p>\n",
        report.paths.len(),
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    for path in &report.paths {
        html.push_str("<section class=\"path\">\n");
        html.push_str(&format!(
            "<h2>{} <span class=\"status\">{}</span></h2>\n",
            html_escape(&path.title),
            path.status
        ));
        html.push_str(&progress_bar(path.completion_percent));
        html.push_str(&format!(
            "<p class=\"meta\">{}/{} modules | {} min</p>\n",
            path.completed_modules, path.total_modules, path.time_spent_minutes
        ));
        html.push_str("<table>\n<thead><tr><th>Module</th><th>Status</th><th>Score</th></tr></thead>\n<tbody>\n");
        for module in &path.modules {
            let class = match module.status {
                ProgressStatus::Completed => "pass",
                _ if !module.unlocked => "locked",
                _ => "",
            };
            let status = if module.unlocked || module.status != ProgressStatus::NotStarted {
                module.status.to_string()
            } else {
                "locked".to_string()
            };
            html.push_str(&format!(
                "<tr class=\"{class}\"><td>{}</td><td>{status}</td><td>{}</td></tr>\n",
                html_escape(&module.title),
                module
                    .score
                    .map_or_else(|| "-".to_string(), |s| format!("{s}%")),
            ));
        }
        html.push_str("</tbody></table>\n</section>\n");
    }

    close_document(&mut html);
    html
}

/// Write a quiz report page to a file.
pub fn write_quiz_html(report: &QuizReport, path: &Path) -> Result<()> {
    write_report(&generate_quiz_html(report), path)
}

/// Write a progress page to a file.
pub fn write_progress_html(report: &ProgressReport, path: &Path) -> Result<()> {
    write_report(&generate_progress_html(report), path)
}

fn push_list(html: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    html.push_str(&format!("<h3>{heading}</h3>\n<ul>\n"));
    for item in items {
        html.push_str(&format!("<li>{}</li>\n", html_escape(item)));
    }
    html.push_str("</ul>\n");
}

fn progress_bar(percent: u32) -> String {
    let percent = percent.min(100);
    let color = if percent >= 80 {
        "#22c55e"
    } else if percent >= 50 {
        "#eab308"
    } else {
        "#ef4444"
    };
    format!(
        "<svg width=\"400\" height=\"16\" xmlns=\"http://www.w3.org/2000/svg\">\n  <rect x=\"0\" y=\"0\" width=\"400\" height=\"16\" fill=\"var(--border)\" rx=\"4\"/>\n  <rect x=\"0\" y=\"0\" width=\"{}\" height=\"16\" fill=\"{color}\" rx=\"4\"/>\n</svg>\n",
        percent * 4
    )
}

const CSS: &str = r#"
:root { --bg: #fffaf3; --fg: #2b1d0e; --border: #eadfce; --pass: #dcfce7; --fail: #fde2e2; --locked: #f3f4f6; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #1c1917; --fg: #faf5ef; --border: #44403c; --pass: #064e3b; --fail: #7f1d1d; --locked: #292524; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #78716c; }
.score { font-size: 1.5rem; font-weight: bold; }
.note { border-left: 4px solid #eab308; padding-left: 1rem; }
.status { font-size: 0.9rem; font-weight: normal; color: #78716c; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
.locked { background: var(--locked); color: #a8a29e; }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 0.5rem 0; }
"#;
