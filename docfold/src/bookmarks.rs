//! Navigation entries for merged documents.
//!
//! After a merge that combines distinct named sources into one paginated
//! document, one outline entry per source is written at the page where that
//! source starts. Entry positions come from the running page count of the
//! sources; duplicate start pages (sources that contributed no pages) are
//! dropped, keeping the first.

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{DocFoldError, Result};
use crate::io::{load_document, save_document};

/// One outline entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkEntry {
    /// Source base name without extension.
    pub title: String,
    /// Zero-based index of the first page of the source.
    pub start_page_index: usize,
}

/// Result of the bookmark pass. The merge succeeds regardless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status", content = "detail")]
pub enum BookmarkOutcome {
    /// The pass did not apply to this merge.
    NotRequested,
    /// Entries were written.
    Added(usize),
    /// The pass failed; the merged output is intact but has no outline.
    Failed(String),
}

/// Compute entries from `(title, page_count)` pairs in merge order.
pub fn compute_entries<S: AsRef<str>>(sources: &[(S, u32)]) -> Vec<BookmarkEntry> {
    let mut entries: Vec<BookmarkEntry> = Vec::with_capacity(sources.len());
    let mut offset = 0usize;

    for (title, pages) in sources {
        let taken = entries
            .last()
            .is_some_and(|last| last.start_page_index == offset);
        if !taken {
            entries.push(BookmarkEntry {
                title: title.as_ref().to_string(),
                start_page_index: offset,
            });
        }
        offset += *pages as usize;
    }

    entries
}

/// Encode a title as a PDF text string.
///
/// ASCII stays a literal string; anything else becomes UTF-16BE with a BOM.
fn text_string(title: &str) -> Object {
    if title.is_ascii() {
        Object::String(title.as_bytes().to_vec(), StringFormat::Literal)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in title.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

/// Replace the document outline with `entries`.
///
/// Entries pointing past the last page are skipped. Returns the number of
/// entries written.
///
/// # Errors
///
/// Returns an error if the document has no catalog.
pub fn write_outline(doc: &mut Document, entries: &[BookmarkEntry]) -> Result<usize> {
    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let items: Vec<(&str, ObjectId)> = entries
        .iter()
        .filter_map(|entry| {
            pages
                .get(entry.start_page_index)
                .map(|&page_id| (entry.title.as_str(), page_id))
        })
        .collect();

    if items.is_empty() {
        return Ok(0);
    }

    let outline_id = doc.new_object_id();
    let item_ids: Vec<ObjectId> = items.iter().map(|_| doc.new_object_id()).collect();

    for (i, ((title, page_id), &item_id)) in items.iter().zip(&item_ids).enumerate() {
        let mut item = Dictionary::new();
        item.set("Title", text_string(title));
        item.set("Parent", Object::Reference(outline_id));
        item.set(
            "Dest",
            Object::Array(vec![
                Object::Reference(*page_id),
                Object::Name(b"XYZ".to_vec()),
                Object::Null,
                Object::Null,
                Object::Null,
            ]),
        );
        if i > 0 {
            item.set("Prev", Object::Reference(item_ids[i - 1]));
        }
        if let Some(&next) = item_ids.get(i + 1) {
            item.set("Next", Object::Reference(next));
        }
        doc.objects.insert(item_id, Object::Dictionary(item));
    }

    let mut outline = Dictionary::new();
    outline.set("Type", Object::Name(b"Outlines".to_vec()));
    outline.set("Count", Object::Integer(item_ids.len() as i64));
    outline.set("First", Object::Reference(item_ids[0]));
    outline.set("Last", Object::Reference(item_ids[item_ids.len() - 1]));
    doc.objects.insert(outline_id, Object::Dictionary(outline));

    let catalog = doc
        .catalog_mut()
        .map_err(|e| DocFoldError::other(format!("Failed to get catalog: {e}")))?;
    catalog.set("Outlines", Object::Reference(outline_id));
    catalog.set("PageMode", Object::Name(b"UseOutlines".to_vec()));

    Ok(item_ids.len())
}

/// Add an outline to the finished document at `path`, in place.
///
/// # Errors
///
/// Returns [`DocFoldError::BookmarkFailed`]; callers treat it as non-fatal.
pub async fn apply_bookmarks(path: &Path, entries: &[BookmarkEntry]) -> Result<usize> {
    let fail = |reason: String| DocFoldError::BookmarkFailed {
        path: path.to_path_buf(),
        reason,
    };

    let mut doc = load_document(path).await.map_err(|e| fail(e.to_string()))?;
    let added = write_outline(&mut doc, entries).map_err(|e| fail(e.to_string()))?;
    if added > 0 {
        save_document(doc, path).await.map_err(|e| fail(e.to_string()))?;
    }

    debug!(path = %path.display(), added, "bookmarks written");
    Ok(added)
}

/// Run the bookmark pass and fold any failure into the outcome.
pub async fn bookmark_outcome(path: &Path, entries: &[BookmarkEntry]) -> BookmarkOutcome {
    match apply_bookmarks(path, entries).await {
        Ok(added) => BookmarkOutcome::Added(added),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "bookmark pass failed");
            BookmarkOutcome::Failed(err.to_string())
        }
    }
}
