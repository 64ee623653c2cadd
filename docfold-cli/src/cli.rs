//! CLI argument parsing for docfold.
//!
//! This module defines the command-line interface structure using `clap`.
//! It is also compiled by `build.rs` to render the man page, so it only
//! depends on `clap` and the `docfold` library.

use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;

use docfold::config::{
    BookmarkPolicy, Config, EngineKind, MergeLimits, OutputFormat, OverwriteMode, ToolPaths,
    default_workspace_root, output_path_for,
};
use docfold::error::{DocFoldError, Result};

const MIB: u64 = 1024 * 1024;

/// Merge PDFs, slide decks and images into a single document.
///
/// Plain PDF batches are merged with a single engine call when memory and
/// command-length budgets allow it, and otherwise in bounded chunks with
/// oversized files split by page range. Decks and images are converted with
/// LibreOffice first.
#[derive(Parser, Debug)]
#[command(name = "docfold")]
#[command(version)]
#[command(about = "Merge PDFs, slide decks and images into a single document", long_about = None)]
#[command(author)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Input files to merge (in order)
    ///
    /// Accepts PDFs, .pptx/.ppt decks and images, as paths or glob
    /// patterns. Files are merged in the order provided.
    ///
    /// Examples:
    ///   docfold intro.pdf slides.pptx photo.png -o handout.pdf
    ///   docfold 'chapter*.pdf' -o book.pdf
    #[arg(value_name = "FILE")]
    pub inputs: Vec<PathBuf>,

    /// Output file path
    ///
    /// The format's extension is appended when the path has none.
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Output format
    ///
    /// - pdf: paginated document (any mix of inputs)
    /// - pptx: slide deck (decks and images only)
    #[arg(short = 'F', long, value_name = "FORMAT", default_value = "pdf")]
    #[arg(value_parser = ["pdf", "pptx"])]
    pub format: String,

    /// Dry run - show the merge plan without merging
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Verbose output - show per-file details and debug diagnostics
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Emit progress events and the final outcome as JSON lines on stdout
    #[arg(long)]
    pub json: bool,

    /// Force overwrite of existing output file without confirmation
    #[arg(short, long)]
    pub force: bool,

    /// Never overwrite existing output file
    #[arg(long, conflicts_with = "force")]
    pub no_clobber: bool,

    /// When to add one bookmark per source
    ///
    /// - auto: only when decks or images are merged into a PDF (default)
    /// - always: also for plain PDF merges
    /// - never: no bookmarks
    #[arg(short, long, value_name = "WHEN", default_value = "auto")]
    #[arg(value_parser = ["auto", "always", "never"])]
    pub bookmarks: String,

    /// Document engine
    ///
    /// - qpdf: external qpdf binary (default)
    /// - native: in-process engine, no external tools
    #[arg(short, long, value_name = "ENGINE", default_value = "qpdf")]
    #[arg(value_parser = ["qpdf", "native"])]
    pub engine: String,

    /// Path to the qpdf binary (searched on PATH otherwise)
    #[arg(long, value_name = "PATH", env = "DOCFOLD_QPDF")]
    pub qpdf: Option<PathBuf>,

    /// Path to the LibreOffice soffice binary (searched on PATH otherwise)
    #[arg(long, value_name = "PATH", env = "DOCFOLD_SOFFICE")]
    pub soffice: Option<PathBuf>,

    /// Command that combines several decks/images into one deck
    ///
    /// Invoked as `<composer> <format> <output> <source>...`.
    #[arg(long, value_name = "PATH", env = "DOCFOLD_DECK_COMPOSER")]
    pub deck_composer: Option<PathBuf>,

    /// Directory for per-job scratch space
    #[arg(long, value_name = "DIR", env = "DOCFOLD_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Fixed memory budget for the single-call merge, in MiB
    ///
    /// Replaces the budget derived from the host's free and total memory.
    #[arg(long, value_name = "MIB")]
    pub memory_budget: Option<u64>,

    /// Inputs at or above this size are split by page range, in MiB
    #[arg(long, value_name = "MIB", default_value_t = 500)]
    pub split_threshold: u64,

    /// Read input file list from a file (one path per line)
    ///
    /// Paths from the list are appended after direct inputs. Lines starting
    /// with '#' and blank lines are ignored.
    #[arg(long, value_name = "FILE")]
    pub input_list: Option<PathBuf>,
}

impl Cli {
    /// Convert CLI arguments into a validated Config.
    ///
    /// # Errors
    ///
    /// Returns an error if a choice cannot be parsed or validation fails.
    pub fn to_config(&self) -> Result<Config> {
        let format = OutputFormat::from_str(&self.format)?;
        let bookmarks = BookmarkPolicy::from_str(&self.bookmarks)?;
        let engine = EngineKind::from_str(&self.engine)?;

        let overwrite_mode = if self.force {
            OverwriteMode::Force
        } else if self.no_clobber {
            OverwriteMode::NoClobber
        } else {
            OverwriteMode::Prompt
        };

        let limits = MergeLimits {
            split_trigger_bytes: self.split_threshold.saturating_mul(MIB),
            memory_budget_override: self.memory_budget.map(|mib| mib.saturating_mul(MIB)),
            ..MergeLimits::default()
        };

        let config = Config {
            inputs: self.inputs.clone(),
            output: output_path_for(&self.output, format),
            format,
            dry_run: self.dry_run,
            verbose: self.verbose,
            quiet: self.quiet,
            json: self.json,
            overwrite_mode,
            bookmarks,
            engine,
            tools: ToolPaths {
                qpdf: self.qpdf.clone(),
                soffice: self.soffice.clone(),
                deck_composer: self.deck_composer.clone(),
            },
            workspace_root: self
                .workspace
                .clone()
                .unwrap_or_else(default_workspace_root),
            limits,
        };

        config.validate().map_err(|e| {
            DocFoldError::invalid_config(format!("Configuration validation failed: {e}"))
        })?;

        Ok(config)
    }

    /// Validate CLI arguments before processing.
    ///
    /// # Errors
    ///
    /// Returns an error if neither inputs nor an input list were given, or a
    /// size option is zero.
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() && self.input_list.is_none() {
            return Err(DocFoldError::invalid_config("No input files specified"));
        }

        if self.split_threshold == 0 {
            return Err(DocFoldError::invalid_config(
                "Split threshold must be at least 1 MiB",
            ));
        }

        if self.memory_budget == Some(0) {
            return Err(DocFoldError::invalid_config(
                "Memory budget must be at least 1 MiB",
            ));
        }

        Ok(())
    }
}
