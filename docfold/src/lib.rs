//! docfold - Merge PDFs, slide decks and images into a single document.
//!
//! The library plans and runs one merge job at a time:
//!
//! - Planning picks a route from the input kinds and, for plain paginated
//!   documents, decides between a single direct merge call and a chunked
//!   accumulating merge that stays within memory and argument-length budgets
//! - Oversized inputs are split into page ranges before accumulation
//! - Decks and images are converted through an external office suite
//! - Jobs report progress over a channel and can be canceled at any point;
//!   intermediate files never outlive the job
//!
//! # Examples
//!
//! ## Planning
//!
//! ```
//! use docfold::config::{MergeLimits, OutputFormat};
//! use docfold::input::InputFile;
//! use docfold::plan::{MemorySnapshot, MergeMode, plan};
//! use std::path::Path;
//!
//! let files = vec![InputFile::new("a.pdf", 10_000), InputFile::new("b.pdf", 20_000)];
//! let snapshot = MemorySnapshot::new(8 << 30, 16 << 30);
//! let plan = plan(&files, Path::new("out.pdf"), OutputFormat::Pdf, snapshot, &MergeLimits::default());
//! assert_eq!(plan.mode, MergeMode::Fast);
//! ```
//!
//! ## Running a merge
//!
//! ```no_run
//! use docfold::config::{BookmarkPolicy, MergeLimits, OutputFormat, default_workspace_root};
//! use docfold::convert::SofficeConverter;
//! use docfold::engine::NativeEngine;
//! use docfold::input::load_inputs;
//! use docfold::service::{MergeRequest, MergeService};
//! use std::sync::Arc;
//!
//! # async fn example() -> docfold::Result<()> {
//! let service = MergeService::new(
//!     Arc::new(NativeEngine::new()),
//!     Arc::new(SofficeConverter::new(None, None)),
//!     MergeLimits::default(),
//!     default_workspace_root(),
//! );
//! let files = load_inputs(["a.pdf", "b.pdf"]).await?;
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<docfold::job::ProgressEvent>();
//! tokio::spawn(async move {
//!     while let Some(event) = rx.recv().await {
//!         println!("{}% {}", event.percent, event.label);
//!     }
//! });
//! service
//!     .merge(
//!         MergeRequest {
//!             files,
//!             output: "merged.pdf".into(),
//!             format: OutputFormat::Pdf,
//!             bookmarks: BookmarkPolicy::Auto,
//!         },
//!         Some(tx),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bookmarks;
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod executor;
pub mod input;
pub mod io;
pub mod job;
pub mod output;
pub mod plan;
pub mod process;
pub mod service;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{DocFoldError, Result};
pub use executor::MergeOutcome;
pub use service::{MergeRequest, MergeService};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
