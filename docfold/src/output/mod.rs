//! User-facing output.
//!
//! - [`formatter`]: leveled messages honoring quiet and verbose modes
//! - [`progress`]: rendering of job progress events
//!
//! Machine-readable output (`--json`) is one JSON object per line on stdout.

pub mod formatter;
pub mod progress;

pub use formatter::{MessageLevel, OutputFormatter};
pub use progress::{ProgressBar, ProgressStyle};

use serde::Serialize;

use crate::bookmarks::BookmarkOutcome;
use crate::executor::MergeOutcome;
use crate::input::InputFile;
use crate::plan::{MergeMode, MergePlan};
use crate::utils::format_file_size;

/// Create an output formatter from configuration.
pub fn create_formatter(config: &crate::config::Config) -> OutputFormatter {
    OutputFormatter::from_config(config)
}

/// Serialize `value` as one JSON line.
pub fn json_line<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error":"{e}"}}"#))
}

/// One-line description of a plan.
pub fn describe_plan(plan: &MergePlan) -> String {
    let route = plan
        .route
        .map(|r| r.to_string())
        .unwrap_or_else(|| "-".to_string());
    match plan.mode {
        MergeMode::Fast | MergeMode::Safe => format!(
            "{} mode ({}), route {route}: {} total, memory budget {}, arguments {}/{} chars",
            plan.mode,
            plan.reason,
            format_file_size(plan.total_bytes),
            format_file_size(plan.memory_limit_bytes),
            plan.arg_chars,
            plan.arg_limit_chars
        ),
        _ => format!("{} ({}), route {route}", plan.mode, plan.reason),
    }
}

/// Show the plan and the inputs it covers.
pub fn display_plan(formatter: &OutputFormatter, files: &[InputFile], plan: &MergePlan) {
    formatter.section("Merge plan");
    formatter.info(&describe_plan(plan));
    if plan.unsupported > 0 {
        formatter.warning(&format!("{} unsupported file(s)", plan.unsupported));
    }
    for (index, file) in files.iter().enumerate() {
        let kind = file
            .kind
            .map(|k| format!("{k:?}"))
            .unwrap_or_else(|| "unsupported".to_string());
        formatter.detail(
            &format!("{:>3}", index + 1),
            &format!("{} ({}, {kind})", file.name, format_file_size(file.size)),
        );
    }
}

/// Report the terminal outcome of a job.
pub fn display_outcome(formatter: &OutputFormatter, outcome: &MergeOutcome) {
    match outcome {
        MergeOutcome::Completed {
            output,
            bookmarks,
            merge_calls,
            fast_path,
        } => {
            formatter.success(&format!("Wrote {}", output.display()));
            formatter.detail("merge calls", &merge_calls.to_string());
            formatter.detail("fast path", if *fast_path { "yes" } else { "no" });
            match bookmarks {
                BookmarkOutcome::Added(n) => formatter.detail("bookmarks", &n.to_string()),
                BookmarkOutcome::NotRequested => {}
                BookmarkOutcome::Failed(reason) => {
                    formatter.warning(&format!("Bookmarks were not added: {reason}"));
                }
            }
        }
        MergeOutcome::Canceled => formatter.warning("Merge canceled"),
    }
}
