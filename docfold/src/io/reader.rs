//! Loading paginated documents for in-process work.
//!
//! Parsing runs on the blocking pool so large files do not stall the
//! runtime that is also supervising external processes.

use lopdf::Document;
use std::path::Path;

use crate::error::{DocFoldError, Result};

/// Load a document from disk.
///
/// # Errors
///
/// Returns [`DocFoldError::FileNotFound`] for a missing path and
/// [`DocFoldError::FailedToLoadPdf`] when the file does not parse.
///
/// # Examples
///
/// ```no_run
/// # use docfold::io::load_document;
/// # use std::path::Path;
/// # async fn example() -> docfold::Result<()> {
/// let doc = load_document(Path::new("report.pdf")).await?;
/// println!("{} pages", doc.get_pages().len());
/// # Ok(())
/// # }
/// ```
pub async fn load_document(path: &Path) -> Result<Document> {
    let path_buf = path.to_path_buf();

    if !tokio::fs::try_exists(&path_buf).await.unwrap_or(false) {
        return Err(DocFoldError::file_not_found(path_buf));
    }

    tokio::task::spawn_blocking(move || {
        Document::load(&path_buf)
            .map_err(|e| DocFoldError::failed_to_load_pdf(path_buf.clone(), e.to_string()))
    })
    .await?
}
