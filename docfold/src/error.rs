//! Error types for docfold.
//!
//! This module defines every error a merge job can surface. Errors are
//! grouped so callers can tell an external tool problem apart from an
//! orchestration bug, a rejected request, or a user cancellation.
//!
//! # Error Categories
//!
//! - **Cancellation**: the user stopped the job. Not a failure.
//! - **Rejected input**: unsupported kinds, mixed batches with a deck target.
//! - **Tool failures**: the document engine or office converter exited badly.
//! - **Environment**: the external engine cannot be found or executed.
//! - **Invariant violations**: the executor finished without an artifact.

use std::io;
use std::path::PathBuf;

/// Result type alias for docfold operations.
pub type Result<T> = std::result::Result<T, DocFoldError>;

/// Main error type for docfold operations.
#[derive(Debug, thiserror::Error)]
pub enum DocFoldError {
    /// Input file was not found.
    #[error("File not found: {}", .path.display())]
    FileNotFound {
        /// Path to the file that was not found.
        path: PathBuf,
    },

    /// Input path exists but is not a regular file.
    #[error("Not a file: {}", .path.display())]
    NotAFile {
        /// Path that is not a file.
        path: PathBuf,
    },

    /// No files were provided for merging.
    #[error("No input files specified for merging")]
    NoFilesToMerge,

    /// One or more inputs have an extension docfold cannot handle.
    #[error(
        "Unsupported input file(s): {}\n  Supported: pdf, pptx, ppt, png, jpg, jpeg, bmp, gif, webp, tif, tiff",
        .paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
    )]
    UnsupportedInput {
        /// Offending paths, in input order.
        paths: Vec<PathBuf>,
    },

    /// A batch mixing PDFs with decks or images was paired with a deck target.
    #[error("Mixed PDF + slide deck/image batches can only be exported as PDF (requested: {requested})")]
    MixedRequiresPdf {
        /// The output format that was requested.
        requested: String,
    },

    /// A batch of PDFs only was paired with a deck target.
    #[error("PDF-only batches can only be exported as PDF (requested: {requested})")]
    DocumentsRequirePdf {
        /// The output format that was requested.
        requested: String,
    },

    /// Another merge job is currently running.
    #[error("A merge is already in progress")]
    JobAlreadyActive,

    /// An external tool exited with a non-success status.
    #[error("{tool} failed (exit code {})\n  {diagnostics}", .code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()))]
    ToolFailed {
        /// Name of the tool that failed.
        tool: String,
        /// Exit code, when the process exited normally.
        code: Option<i32>,
        /// Captured diagnostic output of the tool.
        diagnostics: String,
    },

    /// An external tool could not be located or started.
    #[error("Required tool is unavailable: {tool}\n  Reason: {reason}")]
    EngineUnavailable {
        /// Name of the missing tool.
        tool: String,
        /// Why it is considered unavailable.
        reason: String,
    },

    /// The executor finished its steps without producing an artifact.
    #[error("No merged output was produced")]
    NoOutputProduced,

    /// Output file already exists and overwrite is not allowed.
    #[error("Output file already exists: {}\n  Use --force to overwrite or choose a different output path", .path.display())]
    OutputExists {
        /// Path to the existing output file.
        path: PathBuf,
    },

    /// Failed to create the output file or a workspace file.
    #[error("Failed to create output file: {}\n  Reason: {source}", .path.display())]
    FailedToCreateOutput {
        /// Path where output should be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Failed to write to the output file.
    #[error("Failed to write to output file: {}\n  Reason: {source}", .path.display())]
    FailedToWrite {
        /// Path being written to.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Failed to read the input list file.
    #[error("Failed to read input list file: {}\n  Reason: {source}", .path.display())]
    FailedToReadInputList {
        /// Path to the input list file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Failed to load a PDF with the native engine.
    #[error("Failed to load PDF: {}\n  Reason: {reason}", .path.display())]
    FailedToLoadPdf {
        /// Path to the PDF file.
        path: PathBuf,
        /// Reason for the failure.
        reason: String,
    },

    /// Bookmark post-processing failed.
    #[error("Failed to add bookmarks to: {}\n  Reason: {reason}", .path.display())]
    BookmarkFailed {
        /// Path of the document being bookmarked.
        path: PathBuf,
        /// Details about the failure.
        reason: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong with the configuration.
        message: String,
    },

    /// The job was cancelled by the user.
    #[error("Merge canceled by user")]
    Cancelled,

    /// Generic I/O error.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: io::Error,
    },

    /// Generic error with a custom message.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl From<lopdf::Error> for DocFoldError {
    fn from(err: lopdf::Error) -> Self {
        Self::other(err.to_string())
    }
}

impl From<anyhow::Error> for DocFoldError {
    fn from(err: anyhow::Error) -> Self {
        Self::other(err.to_string())
    }
}

impl From<tokio::task::JoinError> for DocFoldError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::other(format!("Background task failed: {err}"))
    }
}

impl DocFoldError {
    /// Create a FileNotFound error.
    pub fn file_not_found(path: PathBuf) -> Self {
        Self::FileNotFound { path }
    }

    /// Create a NotAFile error.
    pub fn not_a_file(path: PathBuf) -> Self {
        Self::NotAFile { path }
    }

    /// Create a FailedToLoadPdf error.
    pub fn failed_to_load_pdf(path: PathBuf, reason: impl Into<String>) -> Self {
        Self::FailedToLoadPdf {
            path,
            reason: reason.into(),
        }
    }

    /// Create an OutputExists error.
    pub fn output_exists(path: PathBuf) -> Self {
        Self::OutputExists { path }
    }

    /// Create a ToolFailed error.
    pub fn tool_failed(
        tool: impl Into<String>,
        code: Option<i32>,
        diagnostics: impl Into<String>,
    ) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            code,
            diagnostics: diagnostics.into(),
        }
    }

    /// Create an EngineUnavailable error.
    pub fn engine_unavailable(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EngineUnavailable {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an Other error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Whether this error represents a user cancellation.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether this error was raised before any job-specific work started.
    ///
    /// Rejections leave no workspace behind and never touch the output path.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::NoFilesToMerge
                | Self::UnsupportedInput { .. }
                | Self::MixedRequiresPdf { .. }
                | Self::DocumentsRequirePdf { .. }
                | Self::JobAlreadyActive
                | Self::InvalidConfig { .. }
                | Self::FileNotFound { .. }
                | Self::NotAFile { .. }
                | Self::OutputExists { .. }
        )
    }

    /// Check if this error should stop all processing immediately.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::BookmarkFailed { .. })
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FileNotFound { .. } => 2,
            Self::NotAFile { .. } => 2,
            Self::FailedToReadInputList { .. } => 2,
            Self::NoFilesToMerge => 1,
            Self::UnsupportedInput { .. } => 1,
            Self::MixedRequiresPdf { .. } => 1,
            Self::DocumentsRequirePdf { .. } => 1,
            Self::InvalidConfig { .. } => 1,
            Self::JobAlreadyActive => 1,
            Self::FailedToLoadPdf { .. } => 3,
            Self::OutputExists { .. } => 4,
            Self::FailedToCreateOutput { .. } => 5,
            Self::FailedToWrite { .. } => 5,
            Self::Io { .. } => 5,
            Self::ToolFailed { .. } => 6,
            Self::BookmarkFailed { .. } => 6,
            Self::NoOutputProduced => 7,
            Self::EngineUnavailable { .. } => 8,
            Self::Cancelled => 130, // Standard exit code for SIGINT
            Self::Other { .. } => 1,
        }
    }
}
