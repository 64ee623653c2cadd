//! Per-job scratch directory.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DocFoldError, Result};

/// Scratch directory owned by one job.
///
/// Every intermediate artifact of the job lives here: step merges, split
/// segments and conversion outputs. [`Workspace::cleanup`] removes the whole
/// tree and may be called any number of times.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create `<parent>/<job id>`.
    ///
    /// # Errors
    ///
    /// Returns [`DocFoldError::FailedToCreateOutput`] if the directory cannot
    /// be created.
    pub async fn create(parent: &Path, job_id: Uuid) -> Result<Self> {
        let root = parent.join(job_id.to_string());
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|source| DocFoldError::FailedToCreateOutput {
                path: root.clone(),
                source,
            })?;

        debug!(workspace = %root.display(), "workspace created");
        Ok(Self { root })
    }

    /// Workspace root.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Whether `path` lives inside the workspace.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }

    /// Path of the `step`-th accumulation result.
    pub fn step_path(&self, step: usize) -> PathBuf {
        self.root.join(format!("merged-step-{step:05}.pdf"))
    }

    /// Path of segment `segment` of input `file_index` (both zero-based).
    pub fn split_path(&self, file_index: usize, segment: usize) -> PathBuf {
        self.root
            .join(format!("split-{:04}-{:04}.pdf", file_index + 1, segment + 1))
    }

    /// Create and return a subdirectory for conversion outputs.
    ///
    /// # Errors
    ///
    /// Returns [`DocFoldError::FailedToCreateOutput`] if it cannot be created.
    pub async fn subdir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.root.join(name);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| DocFoldError::FailedToCreateOutput {
                path: dir.clone(),
                source,
            })?;
        Ok(dir)
    }

    /// Conversion directory for input `index` (zero-based).
    pub async fn conversion_dir(&self, index: usize) -> Result<PathBuf> {
        self.subdir(&format!("convert-{:04}", index + 1)).await
    }

    /// Remove the workspace and everything in it. Failures are logged only.
    pub async fn cleanup(&self) {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => debug!(workspace = %self.root.display(), "workspace removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                workspace = %self.root.display(),
                error = %e,
                "failed to remove workspace"
            ),
        }
    }
}
