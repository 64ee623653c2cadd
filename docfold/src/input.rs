//! Input records handed over by the presentation layer.
//!
//! An [`InputFile`] carries everything the planner and executor need:
//! path, display name, size in bytes and the kind derived from the
//! extension. Records are immutable once a job starts, and their order is
//! the order of pages/slides in the merged output.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DocFoldError, Result};
use crate::utils::collect_paths_for_patterns;

/// Kind of an input file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputKind {
    /// A paginated document (`.pdf`).
    PaginatedDoc,
    /// A modern slide deck (`.pptx`).
    Deck,
    /// A legacy slide deck (`.ppt`).
    LegacyDeck,
    /// A raster image.
    Image,
}

impl InputKind {
    /// Classify a path by extension (case-insensitive).
    ///
    /// Returns `None` for extensions docfold does not handle.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::PaginatedDoc),
            "pptx" => Some(Self::Deck),
            "ppt" => Some(Self::LegacyDeck),
            "png" | "jpg" | "jpeg" | "bmp" | "gif" | "webp" | "tif" | "tiff" => Some(Self::Image),
            _ => None,
        }
    }

    /// Whether this kind has to pass through a conversion adapter before it
    /// can be merged as pages.
    pub fn needs_conversion(&self) -> bool {
        !matches!(self, Self::PaginatedDoc)
    }
}

/// A file submitted for merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFile {
    /// Location on disk.
    pub path: PathBuf,
    /// Display name (file name by default).
    pub name: String,
    /// Size in bytes as reported by the caller.
    pub size: u64,
    /// Kind, or `None` when the extension is not recognized.
    pub kind: Option<InputKind>,
}

impl InputFile {
    /// Build a record from a path and a known size.
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let kind = InputKind::from_path(&path);

        Self {
            path,
            name,
            size,
            kind,
        }
    }

    /// Build a record by reading the file's metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not exist or is not a regular file.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(DocFoldError::file_not_found(path.to_path_buf()));
            }
            Err(err) => return Err(err.into()),
        };

        if !metadata.is_file() {
            return Err(DocFoldError::not_a_file(path.to_path_buf()));
        }

        Ok(Self::new(path, metadata.len()))
    }

    /// Size used for budgeting; an unknown (zero) size counts as one byte.
    pub fn effective_size(&self) -> u64 {
        self.size.max(1)
    }
}

/// Resolve CLI patterns into input records, preserving order.
///
/// # Errors
///
/// Returns an error if a pattern is invalid or a resolved path is missing or
/// not a file.
pub async fn load_inputs<T>(patterns: T) -> Result<Vec<InputFile>>
where
    T: IntoIterator,
    T::Item: AsRef<str>,
{
    let paths = collect_paths_for_patterns(patterns)?;
    let mut files = Vec::with_capacity(paths.len());

    for path in &paths {
        files.push(InputFile::from_path(path).await?);
    }

    Ok(files)
}

/// Read additional input paths from a list file.
///
/// One path per line; lines starting with `#` and blank lines are skipped.
///
/// # Errors
///
/// Returns an error if the list file cannot be read.
pub async fn read_input_list(path: &Path) -> Result<Vec<PathBuf>> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        DocFoldError::FailedToReadInputList {
            path: path.to_path_buf(),
            source: e,
        }
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(PathBuf::from)
        .collect())
}
