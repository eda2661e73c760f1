//! Formatting for run output.
//!
//! Pure functions returning strings; callers decide where they go.

use chrono::Duration;
use colored::{ColoredString, Colorize};
use std::fmt::Write;

use crate::config::Config;
use crate::editor::Provider;
use crate::state::{RunRecord, StageOutcome};

/// Requirements longer than this are cut in the banner.
const MAX_BANNER_REQUIREMENT: usize = 60;

/// Banner information for display at run start.
#[derive(Debug, Clone)]
pub(crate) struct BannerInfo {
    pub editor: String,
    pub model: String,
    pub requirement: String,
    pub attempts: (u32, u32, u32),
    pub cache_enabled: bool,
}

impl BannerInfo {
    pub fn new(requirement: &str, config: &Config, provider: Provider, no_cache: bool) -> Self {
        Self {
            editor: provider.to_string(),
            model: config.llm.model.clone(),
            requirement: requirement.to_string(),
            attempts: (
                config.workflow.compile_attempts,
                config.workflow.static_analysis_attempts,
                config.workflow.test_attempts,
            ),
            cache_enabled: config.cache.enabled && !no_cache,
        }
    }
}

/// Formats a duration for display (e.g., "2m 5s").
pub(crate) fn format_duration(duration: &Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

fn shorten(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    if first_line.chars().count() <= max_chars && !text.contains('\n') {
        return first_line.to_string();
    }
    let cut: String = first_line.chars().take(max_chars).collect();
    format!("{cut}…")
}

/// Formats the startup banner.
pub(crate) fn format_banner(info: &BannerInfo) -> String {
    let mut out = String::new();
    let (compile, lint, test) = info.attempts;

    let _ = writeln!(&mut out, "\n{}", "━".repeat(50).dimmed());
    let _ = writeln!(&mut out, "{}", "   🔧 mend".yellow().bold());
    let _ = writeln!(&mut out, "{}", "━".repeat(50).dimmed());
    let _ = writeln!(&mut out, "  Editor:     {}", info.editor.cyan().bold());
    let _ = writeln!(&mut out, "  Model:      {}", info.model.cyan());
    let _ = writeln!(
        &mut out,
        "  Task:       {}",
        shorten(&info.requirement, MAX_BANNER_REQUIREMENT).cyan()
    );
    let _ = writeln!(
        &mut out,
        "  Attempts:   compile {} · lint {} · test {}",
        compile.to_string().cyan(),
        lint.to_string().cyan(),
        test.to_string().cyan()
    );
    let cache = if info.cache_enabled {
        "enabled".green()
    } else {
        "disabled".red()
    };
    let _ = writeln!(&mut out, "  Cache:      {cache}");
    let _ = writeln!(&mut out, "{}", "━".repeat(50).dimmed());

    out
}

fn outcome_label(outcome: Option<StageOutcome>) -> ColoredString {
    match outcome {
        Some(StageOutcome::Passed) => "passed".green().bold(),
        Some(StageOutcome::ExhaustedAborted) => "failed, run stopped".red().bold(),
        Some(StageOutcome::ExhaustedTolerated) => "failed, tolerated".yellow(),
        None => "skipped".dimmed(),
    }
}

/// Formats a run record, used after a run and by `mend status`.
pub(crate) fn format_record(record: &RunRecord) -> String {
    let mut out = String::new();
    let elapsed = record.finished_at.signed_duration_since(record.started_at);

    let _ = writeln!(&mut out, "\n{}", "━".repeat(50).dimmed());
    let _ = writeln!(&mut out, "  Run:        {}", record.run_id.dimmed());
    let _ = writeln!(&mut out, "  Project:    {}", record.project.cyan());
    let _ = writeln!(
        &mut out,
        "  Task:       {}",
        shorten(&record.requirement, MAX_BANNER_REQUIREMENT).cyan()
    );
    let _ = writeln!(
        &mut out,
        "  Started:    {}",
        record
            .started_at
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string()
            .cyan()
    );
    let _ = writeln!(&mut out, "  Duration:   {}", format_duration(&elapsed).cyan());
    let _ = writeln!(&mut out);
    let _ = writeln!(&mut out, "  Compile:    {}", outcome_label(record.compile));
    let _ = writeln!(
        &mut out,
        "  Lint:       {}",
        outcome_label(record.static_analysis)
    );
    let _ = writeln!(&mut out, "  Tests:      {}", outcome_label(record.test));

    if let Some(ref diagnosis) = record.test_diagnosis {
        if !diagnosis.is_empty() {
            let _ = writeln!(&mut out, "\n  Last test diagnosis:");
            for file in &diagnosis.files {
                let _ = writeln!(&mut out, "    file     {}", file.display());
            }
            for package in &diagnosis.packages {
                let _ = writeln!(&mut out, "    package  {package}");
            }
        }
    }

    let _ = writeln!(&mut out, "\n  Files ({}):", record.files.len());
    for file in &record.files {
        let _ = writeln!(&mut out, "    {}", file.display().to_string().dimmed());
    }
    let _ = writeln!(&mut out, "{}", "━".repeat(50).dimmed());

    out
}

/// One line verdict printed after a run.
pub(crate) fn format_verdict(record: &RunRecord) -> String {
    if !record.compiled() {
        format!(
            "\n{} The build never passed; the repository is left as the last edit made it.",
            "✗".red().bold()
        )
    } else if record.test == Some(StageOutcome::ExhaustedTolerated)
        || record.static_analysis == Some(StageOutcome::ExhaustedTolerated)
    {
        format!(
            "\n{} Build passes; some checks are still failing.",
            "⚠".yellow().bold()
        )
    } else {
        format!("\n{} Done.", "✓".green().bold())
    }
}
