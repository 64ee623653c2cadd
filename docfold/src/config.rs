//! Configuration module for docfold.
//!
//! This module turns CLI arguments into a validated, normalized configuration
//! that drives planning and execution. It handles:
//! - Output format and overwrite behavior
//! - External tool locations and engine selection
//! - Merge tunables (split trigger, chunk size, argument and memory budgets)
//! - Validation of argument combinations

use anyhow::{Result, bail};
use serde::Serialize;

use crate::DocFoldError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const MIB: u64 = 1024 * 1024;

/// Inputs at or above this size are split into page-range segments.
pub const SPLIT_TRIGGER_BYTES: u64 = 500 * MIB;

/// Maximum number of inputs handed to a single external merge call.
pub const MAX_INPUTS_PER_MERGE_CALL: usize = 24;

/// Argument-length ceiling checked before committing to the fast path.
pub const DIRECT_ARG_CHAR_LIMIT: usize = 26_000;

/// Share of free memory the fast path may assume.
pub const FAST_FREE_MEMORY_RATIO: f64 = 0.22;

/// Share of total memory the fast path may assume.
pub const FAST_TOTAL_MEMORY_RATIO: f64 = 0.08;

/// Lower bound of the fast-path memory budget.
pub const MIN_FAST_MEMORY_BYTES: u64 = 384 * MIB;

/// Upper bound of the fast-path memory budget.
pub const MAX_FAST_MEMORY_BYTES: u64 = 1200 * MIB;

/// Default stem used when no output name is given.
pub const DEFAULT_OUTPUT_STEM: &str = "merged-output";

/// Requested format of the merged artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Paginated document.
    #[default]
    Pdf,
    /// Slide deck.
    Pptx,
}

impl OutputFormat {
    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Pptx => "pptx",
        }
    }

    /// Whether this format is the paginated-document format.
    pub fn is_paginated(&self) -> bool {
        matches!(self, Self::Pdf)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = DocFoldError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "pptx" => Ok(Self::Pptx),
            _ => Err(DocFoldError::invalid_config(format!(
                "Invalid output format: {s}. Must be one of: pdf, pptx"
            ))),
        }
    }
}

/// Output file overwrite behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwriteMode {
    /// Prompt the user before overwriting (default).
    #[default]
    Prompt,
    /// Always overwrite without prompting.
    Force,
    /// Never overwrite, error if file exists.
    NoClobber,
}

/// When navigation entries are written into the finished document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookmarkPolicy {
    /// Only for merges that combine converted sources into a PDF.
    #[default]
    Auto,
    /// Also for plain PDF merges.
    Always,
    /// Never add bookmarks.
    Never,
}

impl FromStr for BookmarkPolicy {
    type Err = DocFoldError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            _ => Err(DocFoldError::invalid_config(format!(
                "Invalid bookmark policy: {s}. Must be one of: auto, always, never"
            ))),
        }
    }
}

/// Which document engine performs page counting, extraction and merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    /// The external `qpdf` binary.
    #[default]
    Qpdf,
    /// The in-process lopdf engine.
    Native,
}

impl FromStr for EngineKind {
    type Err = DocFoldError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "qpdf" => Ok(Self::Qpdf),
            "native" => Ok(Self::Native),
            _ => Err(DocFoldError::invalid_config(format!(
                "Invalid engine: {s}. Must be one of: qpdf, native"
            ))),
        }
    }
}

/// Locations of external tools. `None` means "search PATH".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolPaths {
    /// Path to the qpdf binary.
    pub qpdf: Option<PathBuf>,
    /// Path to the LibreOffice `soffice` binary.
    pub soffice: Option<PathBuf>,
    /// Command that composes several decks/images into one deck.
    pub deck_composer: Option<PathBuf>,
}

/// Tunables of the planner and the chunked executor.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeLimits {
    /// Inputs at or above this size are split before merging.
    pub split_trigger_bytes: u64,
    /// Maximum inputs per external merge call.
    pub max_inputs_per_call: usize,
    /// Argument-length ceiling for the fast path.
    pub arg_limit_chars: usize,
    /// Share of free memory usable by the fast path.
    pub free_memory_ratio: f64,
    /// Share of total memory usable by the fast path.
    pub total_memory_ratio: f64,
    /// Lower bound of the fast memory budget.
    pub min_fast_memory_bytes: u64,
    /// Upper bound of the fast memory budget.
    pub max_fast_memory_bytes: u64,
    /// Fixed fast memory budget replacing the host-derived ceiling.
    pub memory_budget_override: Option<u64>,
}

impl Default for MergeLimits {
    fn default() -> Self {
        Self {
            split_trigger_bytes: SPLIT_TRIGGER_BYTES,
            max_inputs_per_call: MAX_INPUTS_PER_MERGE_CALL,
            arg_limit_chars: DIRECT_ARG_CHAR_LIMIT,
            free_memory_ratio: FAST_FREE_MEMORY_RATIO,
            total_memory_ratio: FAST_TOTAL_MEMORY_RATIO,
            min_fast_memory_bytes: MIN_FAST_MEMORY_BYTES,
            max_fast_memory_bytes: MAX_FAST_MEMORY_BYTES,
            memory_budget_override: None,
        }
    }
}

impl MergeLimits {
    /// Validate the tunables.
    ///
    /// # Errors
    ///
    /// Returns an error if a size or count is zero, a ratio is outside
    /// `(0, 1]`, or the memory floor exceeds the cap.
    pub fn validate(&self) -> Result<()> {
        if self.split_trigger_bytes == 0 {
            bail!("Split trigger must be at least 1 byte");
        }

        // One slot is reserved for the accumulator when folding segments.
        if self.max_inputs_per_call < 2 {
            bail!("Inputs per merge call must be at least 2");
        }

        if self.arg_limit_chars == 0 {
            bail!("Argument length limit must be positive");
        }

        for ratio in [self.free_memory_ratio, self.total_memory_ratio] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                bail!("Memory ratios must be within (0, 1], got {ratio}");
            }
        }

        if self.min_fast_memory_bytes > self.max_fast_memory_bytes {
            bail!(
                "Fast memory floor ({}) exceeds cap ({})",
                self.min_fast_memory_bytes,
                self.max_fast_memory_bytes
            );
        }

        Ok(())
    }
}

/// Complete configuration for a merge operation.
///
/// Derived and validated from CLI arguments.
#[derive(Debug, Clone)]
pub struct Config {
    /// Input file paths (in merge order).
    pub inputs: Vec<PathBuf>,

    /// Output file path.
    pub output: PathBuf,

    /// Requested output format.
    pub format: OutputFormat,

    /// Only compute and show the plan.
    pub dry_run: bool,

    /// Verbose output mode.
    pub verbose: bool,

    /// Quiet mode - suppress non-error output.
    pub quiet: bool,

    /// Emit progress events as JSON lines.
    pub json: bool,

    /// File overwrite behavior.
    pub overwrite_mode: OverwriteMode,

    /// Bookmark post-processing policy.
    pub bookmarks: BookmarkPolicy,

    /// Document engine selection.
    pub engine: EngineKind,

    /// External tool locations.
    pub tools: ToolPaths,

    /// Directory under which job workspaces are created.
    pub workspace_root: PathBuf,

    /// Planner and executor tunables.
    pub limits: MergeLimits,
}

impl Config {
    /// Returns a reference to inputs.
    pub fn inputs(&self) -> &[PathBuf] {
        self.inputs.as_ref()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No input files are specified
    /// - Verbose and quiet modes are both enabled
    /// - The output path is also an input
    /// - A merge limit is invalid
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            bail!("No input files specified");
        }

        if self.verbose && self.quiet {
            bail!("Cannot use both --verbose and --quiet");
        }

        for input in &self.inputs {
            if input == &self.output {
                bail!(
                    "Output file cannot be the same as an input file: {}",
                    self.output.display()
                );
            }
        }

        self.limits.validate()?;

        Ok(())
    }

    /// Check if output should be displayed.
    ///
    /// Returns false if in quiet mode and not doing a dry run.
    pub fn should_print(&self) -> bool {
        !self.quiet || self.dry_run
    }
}

/// Default parent directory of job workspaces.
pub fn default_workspace_root() -> PathBuf {
    std::env::temp_dir().join("docfold")
}

/// Sanitize a user-supplied output file name and append the format extension.
///
/// Path separators and characters that are invalid on common filesystems
/// are replaced with `-`. Empty names fall back to [`DEFAULT_OUTPUT_STEM`].
///
/// # Examples
///
/// ```
/// use docfold::config::{sanitize_output_name, OutputFormat};
///
/// assert_eq!(sanitize_output_name("q1/report", OutputFormat::Pdf), "q1-report.pdf");
/// assert_eq!(sanitize_output_name("deck.PPTX", OutputFormat::Pptx), "deck.PPTX");
/// assert_eq!(sanitize_output_name("  ", OutputFormat::Pdf), "merged-output.pdf");
/// ```
pub fn sanitize_output_name(name: &str, format: OutputFormat) -> String {
    let trimmed = name.trim();
    let base = if trimmed.is_empty() {
        DEFAULT_OUTPUT_STEM
    } else {
        trimmed
    };

    let mut sanitized = String::with_capacity(base.len());
    let mut in_run = false;
    for ch in base.chars() {
        if matches!(ch, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') {
            if !in_run {
                sanitized.push('-');
            }
            in_run = true;
        } else {
            sanitized.push(ch);
            in_run = false;
        }
    }

    let suffix = format!(".{}", format.extension());
    if sanitized.to_lowercase().ends_with(&suffix) {
        sanitized
    } else {
        sanitized + &suffix
    }
}

/// Resolve the final output path for a requested format.
///
/// A path without an extension gets the format's extension appended.
pub fn output_path_for(path: &Path, format: OutputFormat) -> PathBuf {
    match path.extension() {
        Some(_) => path.to_path_buf(),
        None => path.with_extension(format.extension()),
    }
}
