//! Atomic writes of documents and finished artifacts.
//!
//! Every write lands in a hidden sibling temp file first and is renamed into
//! place, so a destination is either untouched or complete.

use lopdf::Document;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{DocFoldError, Result};

const BUFFER_SIZE: usize = 64 * 1024;

/// Temp path used while writing `path`.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

/// Save a document atomically.
///
/// # Errors
///
/// Returns [`DocFoldError::FailedToCreateOutput`] or
/// [`DocFoldError::FailedToWrite`] on I/O failure.
pub async fn save_document(mut doc: Document, path: &Path) -> Result<()> {
    let path_buf = path.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let write_path = temp_path_for(&path_buf);

        let file = std::fs::File::create(&write_path).map_err(|e| {
            DocFoldError::FailedToCreateOutput {
                path: write_path.clone(),
                source: e,
            }
        })?;

        let mut writer = std::io::BufWriter::with_capacity(BUFFER_SIZE, file);
        let written = doc
            .save_to(&mut writer)
            .map_err(std::io::Error::other)
            .and_then(|_| writer.flush());

        if let Err(e) = written {
            let _ = std::fs::remove_file(&write_path);
            return Err(DocFoldError::FailedToWrite {
                path: write_path,
                source: e,
            });
        }

        std::fs::rename(&write_path, &path_buf).map_err(|e| {
            let _ = std::fs::remove_file(&write_path);
            DocFoldError::FailedToWrite {
                path: path_buf.clone(),
                source: e,
            }
        })
    })
    .await?
}

/// Copy a finished artifact to its destination atomically.
///
/// The source is left in place.
///
/// # Errors
///
/// Returns [`DocFoldError::FailedToWrite`] if the copy or rename fails.
pub async fn copy_atomic(source: &Path, destination: &Path) -> Result<()> {
    let write_path = temp_path_for(destination);

    if let Err(e) = tokio::fs::copy(source, &write_path).await {
        let _ = tokio::fs::remove_file(&write_path).await;
        return Err(DocFoldError::FailedToWrite {
            path: destination.to_path_buf(),
            source: e,
        });
    }

    if let Err(e) = tokio::fs::rename(&write_path, destination).await {
        let _ = tokio::fs::remove_file(&write_path).await;
        return Err(DocFoldError::FailedToWrite {
            path: destination.to_path_buf(),
            source: e,
        });
    }

    Ok(())
}

/// Remove a file if it exists. Missing files are not an error.
pub async fn remove_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DocFoldError::FailedToWrite {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
