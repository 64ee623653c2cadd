//! Route classification and merge planning.
//!
//! Planning is a pure function of the input records, the requested output
//! and a host memory snapshot. It can be called any number of times without
//! touching job state, which makes it suitable for `--dry-run` and for
//! re-evaluating a plan while inputs are still being edited.

pub mod budget;

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{MergeLimits, OutputFormat};
use crate::convert::{BatchStrategy, batch_strategy};
use crate::error::{DocFoldError, Result};
use crate::input::{InputFile, InputKind};

pub use budget::{MemorySnapshot, estimate_arg_chars, memory_ceiling, merge_invocation_args};

/// High-level strategy bucket chosen from input kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    /// Every input is a paginated document.
    UniformDocuments,
    /// No paginated documents; decks, legacy decks and images only.
    UniformConvertible,
    /// Paginated documents together with decks or images.
    Mixed,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UniformDocuments => "uniform-documents",
            Self::UniformConvertible => "uniform-convertible",
            Self::Mixed => "mixed",
        };
        f.write_str(name)
    }
}

/// Planner decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Single direct merge call.
    Fast,
    /// Chunked accumulating merge.
    Safe,
    /// The request cannot be executed.
    Unsupported,
    /// Nothing to merge.
    None,
    /// Conversion route; never uses the single-call path.
    Ready,
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fast => "fast",
            Self::Safe => "safe",
            Self::Unsupported => "unsupported",
            Self::None => "none",
            Self::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// Why the planner chose its mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanReason {
    /// Empty input list.
    NoFiles,
    /// The direct invocation would exceed the argument-length limit.
    CommandLength,
    /// Total input size exceeds the memory ceiling.
    Memory,
    /// Both budgets predict the fast path will succeed.
    WithinLimits,
    /// Mixed batch paired with a non-paginated output format.
    MixedRequiresPdf,
    /// PDF-only batch paired with a non-paginated output format.
    DocumentsRequirePdf,
    /// Deck composition is needed but no composer is configured.
    ComposerUnavailable,
    /// At least one input has an unrecognized kind.
    UnsupportedFiles,
    /// Inputs go through the conversion adapters.
    RequiresConversion,
}

impl fmt::Display for PlanReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoFiles => "no_files",
            Self::CommandLength => "command_length",
            Self::Memory => "memory",
            Self::WithinLimits => "within_limits",
            Self::MixedRequiresPdf => "mixed_requires_pdf",
            Self::DocumentsRequirePdf => "documents_require_pdf",
            Self::ComposerUnavailable => "composer_unavailable",
            Self::UnsupportedFiles => "unsupported_files",
            Self::RequiresConversion => "requires_conversion",
        };
        f.write_str(name)
    }
}

/// Result of a planning query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergePlan {
    /// Chosen mode.
    pub mode: MergeMode,
    /// Reason for the mode.
    pub reason: PlanReason,
    /// Sum of input sizes (unknown sizes count as one byte).
    pub total_bytes: u64,
    /// Memory ceiling for the fast path.
    pub memory_limit_bytes: u64,
    /// Estimated length of the direct merge invocation.
    pub arg_chars: usize,
    /// Argument-length limit the estimate was checked against.
    pub arg_limit_chars: usize,
    /// Route, when the inputs could be classified.
    pub route: Option<Route>,
    /// Number of inputs with an unrecognized kind.
    pub unsupported: usize,
}

impl MergePlan {
    /// Account for the converter's ability to compose decks.
    ///
    /// A deck-target batch that needs composition is downgraded to
    /// `unsupported` when no composer is available, so the rejection happens
    /// before a job starts.
    pub fn with_composer(self, files: &[InputFile], format: OutputFormat, available: bool) -> Self {
        let composes = self.mode == MergeMode::Ready
            && self.route == Some(Route::UniformConvertible)
            && !format.is_paginated()
            && batch_strategy(&paths(files), format) == BatchStrategy::Compose;

        if composes && !available {
            Self {
                mode: MergeMode::Unsupported,
                reason: PlanReason::ComposerUnavailable,
                ..self
            }
        } else {
            self
        }
    }

    /// Turn a non-executable plan into the matching rejection.
    ///
    /// # Errors
    ///
    /// Returns an error for `none` and `unsupported` plans.
    pub fn ensure_executable(&self, files: &[InputFile], format: OutputFormat) -> Result<()> {
        match (self.mode, self.reason) {
            (MergeMode::None, _) => Err(DocFoldError::NoFilesToMerge),
            (MergeMode::Unsupported, PlanReason::MixedRequiresPdf) => {
                Err(DocFoldError::MixedRequiresPdf {
                    requested: format.to_string(),
                })
            }
            (MergeMode::Unsupported, PlanReason::DocumentsRequirePdf) => {
                Err(DocFoldError::DocumentsRequirePdf {
                    requested: format.to_string(),
                })
            }
            (MergeMode::Unsupported, PlanReason::ComposerUnavailable) => {
                Err(DocFoldError::engine_unavailable(
                    "deck composer",
                    "combining several decks, or any image, into one deck requires --deck-composer",
                ))
            }
            (MergeMode::Unsupported, _) => Err(DocFoldError::UnsupportedInput {
                paths: unsupported_paths(files),
            }),
            _ => Ok(()),
        }
    }
}

fn paths(files: &[InputFile]) -> Vec<&Path> {
    files.iter().map(|f| f.path.as_path()).collect()
}

fn unsupported_paths(files: &[InputFile]) -> Vec<PathBuf> {
    files
        .iter()
        .filter(|f| f.kind.is_none())
        .map(|f| f.path.clone())
        .collect()
}

/// Decide the route for an ordered input list.
///
/// Returns `Ok(None)` for an empty list.
///
/// # Errors
///
/// Returns [`DocFoldError::UnsupportedInput`] if any input kind is unknown.
pub fn classify(files: &[InputFile]) -> Result<Option<Route>> {
    let unsupported = unsupported_paths(files);
    if !unsupported.is_empty() {
        return Err(DocFoldError::UnsupportedInput { paths: unsupported });
    }

    if files.is_empty() {
        return Ok(None);
    }

    let documents = files
        .iter()
        .filter(|f| f.kind == Some(InputKind::PaginatedDoc))
        .count();

    let route = if documents == files.len() {
        Route::UniformDocuments
    } else if documents == 0 {
        Route::UniformConvertible
    } else {
        Route::Mixed
    };

    Ok(Some(route))
}

/// Compute a merge plan.
///
/// Pure given `snapshot`: no job state is read or written.
pub fn plan(
    files: &[InputFile],
    output: &Path,
    format: OutputFormat,
    snapshot: MemorySnapshot,
    limits: &MergeLimits,
) -> MergePlan {
    let input_paths = paths(files);
    let memory_limit_bytes = memory_ceiling(snapshot, limits);
    let arg_chars = estimate_arg_chars(&input_paths, output);
    let total_bytes = files.iter().map(InputFile::effective_size).sum();

    let base = MergePlan {
        mode: MergeMode::None,
        reason: PlanReason::NoFiles,
        total_bytes,
        memory_limit_bytes,
        arg_chars,
        arg_limit_chars: limits.arg_limit_chars,
        route: None,
        unsupported: 0,
    };

    if files.is_empty() {
        return MergePlan {
            total_bytes: 0,
            ..base
        };
    }

    let route = match classify(files) {
        Ok(Some(route)) => route,
        Ok(None) => return base,
        Err(_) => {
            return MergePlan {
                mode: MergeMode::Unsupported,
                reason: PlanReason::UnsupportedFiles,
                unsupported: files.iter().filter(|f| f.kind.is_none()).count(),
                ..base
            };
        }
    };

    let (mode, reason) = match route {
        Route::Mixed if !format.is_paginated() => {
            (MergeMode::Unsupported, PlanReason::MixedRequiresPdf)
        }
        Route::UniformDocuments if !format.is_paginated() => {
            (MergeMode::Unsupported, PlanReason::DocumentsRequirePdf)
        }
        Route::UniformDocuments if arg_chars > limits.arg_limit_chars => {
            (MergeMode::Safe, PlanReason::CommandLength)
        }
        Route::UniformDocuments if total_bytes > memory_limit_bytes => {
            (MergeMode::Safe, PlanReason::Memory)
        }
        Route::UniformDocuments => (MergeMode::Fast, PlanReason::WithinLimits),
        Route::UniformConvertible | Route::Mixed => {
            (MergeMode::Ready, PlanReason::RequiresConversion)
        }
    };

    MergePlan {
        mode,
        reason,
        route: Some(route),
        ..base
    }
}
