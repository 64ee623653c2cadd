//! In-process document engine built on lopdf.
//!
//! Work runs on the blocking pool. Cancellation is observed between calls
//! only; a single in-process merge cannot be interrupted.

use async_trait::async_trait;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::path::{Path, PathBuf};

use super::{DocumentEngine, PageSpan};
use crate::error::{DocFoldError, Result};
use crate::io::{load_document, save_document};
use crate::job::JobState;

/// Engine that manipulates documents with lopdf.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEngine;

impl NativeEngine {
    /// Create the engine.
    pub fn new() -> Self {
        Self
    }
}

fn check(job: Option<&JobState>) -> Result<()> {
    job.map_or(Ok(()), JobState::ensure_active)
}

/// Keep only the pages of `span`, preserving order.
pub fn retain_span(doc: &mut Document, span: PageSpan) -> Result<()> {
    let page_count = doc.get_pages().len() as u32;
    if span.end > page_count {
        return Err(DocFoldError::other(format!(
            "Page range {span} exceeds document length of {page_count} pages"
        )));
    }

    let doomed: Vec<u32> = (1..=page_count).filter(|p| !span.contains(*p)).collect();
    if !doomed.is_empty() {
        doc.delete_pages(&doomed);
        doc.prune_objects();
    }
    Ok(())
}

/// Page attributes a page may take from an ancestor `Pages` node.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Ancestor depth at which a `Parent` chain is treated as cyclic.
const MAX_TREE_DEPTH: usize = 64;

fn inherited_value(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// Copy inherited attributes onto every page so pages no longer depend on
/// their ancestors.
pub fn inline_inherited_attributes(doc: &mut Document) -> Result<()> {
    for page_id in doc.get_pages().into_values() {
        let missing: Vec<(&[u8], Object)> = {
            let page = doc.get_dictionary(page_id)?;
            INHERITABLE
                .iter()
                .filter(|key| !page.has(**key))
                .filter_map(|key| inherited_value(doc, page, key).map(|value| (*key, value)))
                .collect()
        };
        if missing.is_empty() {
            continue;
        }

        let page = doc.get_dictionary_mut(page_id)?;
        for (key, value) in missing {
            page.set(key, value);
        }
    }
    Ok(())
}

/// Concatenate documents in order into one.
///
/// The page tree of the result is flattened: every page hangs directly off
/// the root `Pages` node of the first document. Attributes a page inherited
/// from its original tree are copied onto the page first.
pub fn concatenate(mut documents: Vec<Document>) -> Result<Document> {
    if documents.is_empty() {
        return Err(DocFoldError::NoFilesToMerge);
    }
    for doc in &mut documents {
        inline_inherited_attributes(doc)?;
    }

    let mut merged = documents.remove(0);
    let mut page_ids: Vec<ObjectId> = merged.get_pages().into_values().collect();
    let mut max_id = merged.max_id;

    for mut doc in documents {
        doc.renumber_objects_with(max_id + 1);
        max_id = doc.max_id;

        page_ids.extend(doc.get_pages().into_values());
        merged.objects.extend(doc.objects);
    }
    merged.max_id = max_id;

    rebuild_page_tree(&mut merged, &page_ids)?;
    Ok(merged)
}

fn rebuild_page_tree(doc: &mut Document, page_ids: &[ObjectId]) -> Result<()> {
    let pages_id = doc
        .catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|e| DocFoldError::other(format!("Failed to get pages reference: {e}")))?;

    for &page_id in page_ids {
        if let Ok(page) = doc.get_dictionary_mut(page_id) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    let pages = doc
        .get_dictionary_mut(pages_id)
        .map_err(|e| DocFoldError::other(format!("Failed to get pages object: {e}")))?;
    pages.set(
        "Kids",
        Object::Array(page_ids.iter().map(|&id| Object::Reference(id)).collect()),
    );
    pages.set("Count", Object::Integer(page_ids.len() as i64));

    Ok(())
}

#[async_trait]
impl DocumentEngine for NativeEngine {
    fn name(&self) -> &str {
        "native"
    }

    async fn page_count(&self, path: &Path, job: Option<&JobState>) -> Result<u32> {
        check(job)?;
        let doc = load_document(path).await?;
        let count = doc.get_pages().len() as u32;
        if count == 0 {
            return Err(DocFoldError::failed_to_load_pdf(
                path.to_path_buf(),
                "PDF has no pages",
            ));
        }
        Ok(count)
    }

    async fn extract_range(
        &self,
        source: &Path,
        span: PageSpan,
        out: &Path,
        job: Option<&JobState>,
    ) -> Result<()> {
        check(job)?;
        let mut doc = load_document(source).await?;
        retain_span(&mut doc, span)?;
        check(job)?;
        save_document(doc, out).await
    }

    async fn merge(&self, inputs: &[PathBuf], out: &Path, job: Option<&JobState>) -> Result<()> {
        let mut documents = Vec::with_capacity(inputs.len());
        for input in inputs {
            check(job)?;
            documents.push(load_document(input).await?);
        }

        let merged = tokio::task::spawn_blocking(move || concatenate(documents)).await??;
        check(job)?;
        save_document(merged, out).await
    }
}
