//! Document engines.
//!
//! The executor depends on exactly three operations of a paginated-document
//! engine: counting pages, extracting an inclusive page range, and
//! concatenating documents in order. [`DocumentEngine`] captures that
//! contract; [`QpdfEngine`] delegates to the external `qpdf` binary and
//! [`NativeEngine`] performs the same work in-process with lopdf.

pub mod native;
pub mod provision;
pub mod qpdf;

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{EngineKind, ToolPaths};
use crate::error::Result;
use crate::job::JobState;

pub use native::NativeEngine;
pub use provision::ensure_engine;
pub use qpdf::QpdfEngine;

/// Inclusive, 1-based page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageSpan {
    /// First page.
    pub start: u32,
    /// Last page.
    pub end: u32,
}

impl PageSpan {
    /// Create a span. `start` must not exceed `end`.
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start >= 1 && start <= end);
        Self { start, end }
    }

    /// Number of pages covered.
    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Always false; spans cover at least one page.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `page` lies within the span.
    pub fn contains(&self, page: u32) -> bool {
        (self.start..=self.end).contains(&page)
    }
}

impl fmt::Display for PageSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Page-level operations on paginated documents.
///
/// Implementations honor cancellation of `job` where they run external
/// processes. None of them inspect page contents.
#[async_trait]
pub trait DocumentEngine: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &str;

    /// Number of pages in `path`. Always at least 1 on success.
    async fn page_count(&self, path: &Path, job: Option<&JobState>) -> Result<u32>;

    /// Write the pages of `span` from `source` into a new document at `out`.
    async fn extract_range(
        &self,
        source: &Path,
        span: PageSpan,
        out: &Path,
        job: Option<&JobState>,
    ) -> Result<()>;

    /// Concatenate all pages of `inputs`, in order, into `out`.
    async fn merge(&self, inputs: &[PathBuf], out: &Path, job: Option<&JobState>) -> Result<()>;
}

/// Build the engine selected by `kind`.
///
/// # Errors
///
/// Returns [`crate::DocFoldError::EngineUnavailable`] if the external engine
/// cannot be located or started.
pub async fn build_engine(kind: EngineKind, tools: &ToolPaths) -> Result<Arc<dyn DocumentEngine>> {
    match kind {
        EngineKind::Qpdf => {
            let program = ensure_engine(qpdf::QPDF_PROGRAM, tools.qpdf.as_deref()).await?;
            Ok(Arc::new(QpdfEngine::new(program)))
        }
        EngineKind::Native => Ok(Arc::new(NativeEngine::new())),
    }
}
