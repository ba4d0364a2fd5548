//! Markdown run summaries

use std::time::Duration;

use crate::fleet::{FleetReport, FleetStatus};
use crate::orchestrator::SyncOutcome;
use crate::tag_policy::TagDecision;

/// Render an elapsed time rounded to whole seconds, e.g. `1m5s`
pub fn format_elapsed(elapsed: Duration) -> String {
    let mut secs = elapsed.as_secs();
    if elapsed.subsec_millis() >= 500 {
        secs += 1;
    }

    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

fn format_repo(outcome: &SyncOutcome, web_base: &str) -> String {
    let repo = outcome.repo();
    format!(
        "**[`{}`]({}/{})**",
        repo.name(),
        web_base.trim_end_matches('/'),
        repo
    )
}

fn format_status(outcome: &SyncOutcome) -> &'static str {
    if outcome.is_success() {
        "✅"
    } else {
        "❌"
    }
}

fn format_pull_request(outcome: &SyncOutcome) -> String {
    match outcome.pull_request() {
        Some(pr) => format!("[**{}**]({}) #{}", pr.title, pr.url, pr.number),
        None if outcome.is_success() => "No changes needed.".to_string(),
        None => "Could not create.".to_string(),
    }
}

fn outcome_table(outcomes: &[SyncOutcome], web_base: &str) -> Vec<String> {
    let mut lines = vec![
        "| Repository | Success | Pull Request | T-Start |".to_string(),
        "|:-|:-:|:-|-:|".to_string(),
    ];

    for outcome in outcomes {
        lines.push(format!(
            "| {} | {} | {} | {} |",
            format_repo(outcome, web_base),
            format_status(outcome),
            format_pull_request(outcome),
            format_elapsed(outcome.elapsed())
        ));
    }

    lines
}

fn outcome_errors(outcomes: &[SyncOutcome], web_base: &str) -> Vec<String> {
    outcomes
        .iter()
        .filter_map(|outcome| {
            outcome
                .error()
                .map(|e| format!("- ❌ {} ({})", format_repo(outcome, web_base), e))
        })
        .collect()
}

/// Table of per-target results followed by the list of errors, if any
fn render_outcomes(outcomes: &[SyncOutcome], web_base: &str) -> String {
    let mut lines = outcome_table(outcomes, web_base);

    let errors = outcome_errors(outcomes, web_base);
    if !errors.is_empty() {
        lines.push(String::new());
        lines.extend(errors);
    }

    lines.join("\n")
}

/// Summary of a single-repository sync under `Overview` and `Errors` headings
pub fn render_repo_summary(outcome: &SyncOutcome, web_base: &str) -> String {
    let outcomes = std::slice::from_ref(outcome);

    let mut lines = vec!["### Overview".to_string()];
    lines.extend(outcome_table(outcomes, web_base));

    let errors = outcome_errors(outcomes, web_base);
    if !errors.is_empty() {
        lines.push("### Errors".to_string());
        lines.extend(errors);
    }

    lines.join("\n")
}

/// Headline plus the outcome table of a fleet run
pub fn render_fleet_summary(report: &FleetReport, web_base: &str) -> String {
    let headline = match report.status() {
        FleetStatus::AllSynced => format!(
            "### 🟢 All Repos Now Use `{}` For Workflows",
            report.version
        ),
        FleetStatus::PartiallySynced => format!(
            "### 🟡 Some Repos Now Use `{}` For Workflows",
            report.version
        ),
        FleetStatus::NoneSynced => "### 🔴 No Workflows Changed".to_string(),
    };

    let mut sections = vec![headline, render_outcomes(&report.outcomes, web_base)];
    if let Some(e) = &report.marker_error {
        sections.push(format!("*The sync marker could not be advanced: {}*", e));
    }

    sections.join("\n")
}

/// Result of the tagging step
pub fn render_tag_summary(decision: &TagDecision) -> String {
    let verb = if decision.action.creates_tag() {
        "Created"
    } else {
        "Updated"
    };

    let mut lines = vec![format!("### 🏷️ Tag `{}` {}", decision.action.tag(), verb)];
    if let Some(reason) = &decision.sync_reason {
        lines.push(format!(
            "*Workflows need to be synchronized, because {}.*",
            reason
        ));
    }

    lines.join("\n")
}
