//! End-to-end merges of real PDFs with the in-process engine.

use lopdf::{Dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use docfold::bookmarks::BookmarkOutcome;
use docfold::config::{BookmarkPolicy, MergeLimits, OutputFormat};
use docfold::engine::NativeEngine;
use docfold::input::InputFile;
use docfold::{MergeOutcome, MergeRequest, MergeService};

use crate::common::{FakeConverter, MIB};

fn labelled_pdf(pages: u32, label: &str) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();

    for n in 1..=pages {
        let content = format!("BT /F1 12 Tf 72 720 Td ({label}-{n}) Tj ET");
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        page.set("Contents", Object::Reference(content_id));
        page.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ]),
        );
        kids.push(Object::Reference(doc.add_object(page)));
    }

    let mut tree = Dictionary::new();
    tree.set("Type", Object::Name(b"Pages".to_vec()));
    tree.set("Count", Object::Integer(i64::from(pages)));
    tree.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(tree));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc
}

fn page_labels(path: &Path) -> Vec<String> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .into_values()
        .map(|id| {
            let content = doc.get_page_content(id).unwrap();
            let text = String::from_utf8_lossy(&content).into_owned();
            let start = text.find('(').unwrap() + 1;
            let end = text.find(')').unwrap();
            text[start..end].to_string()
        })
        .collect()
}

fn write_pdf(dir: &TempDir, name: &str, pages: u32, size: u64) -> InputFile {
    let path = dir.path().join(name);
    labelled_pdf(pages, name.trim_end_matches(".pdf"))
        .save(&path)
        .unwrap();
    InputFile::new(path, size)
}

fn service(dir: &TempDir, limits: MergeLimits) -> MergeService {
    MergeService::new(
        Arc::new(NativeEngine::new()),
        FakeConverter::new(),
        limits,
        dir.path().join("work"),
    )
}

fn outline_titles(path: &Path) -> Vec<String> {
    let doc = Document::load(path).unwrap();
    let outlines = doc
        .catalog()
        .unwrap()
        .get(b"Outlines")
        .unwrap()
        .as_reference()
        .unwrap();
    let mut next = doc
        .get_dictionary(outlines)
        .unwrap()
        .get(b"First")
        .and_then(Object::as_reference)
        .ok();

    let mut titles = Vec::new();
    while let Some(id) = next {
        let item = doc.get_dictionary(id).unwrap();
        let title = item.get(b"Title").unwrap().as_str().unwrap();
        titles.push(String::from_utf8_lossy(title).into_owned());
        next = item.get(b"Next").and_then(Object::as_reference).ok();
    }
    titles
}

#[tokio::test]
async fn test_chunked_merge_with_split_and_bookmarks() {
    let dir = TempDir::new().unwrap();
    let limits = MergeLimits {
        split_trigger_bytes: 10 * MIB,
        max_inputs_per_call: 2,
        memory_budget_override: Some(1),
        ..MergeLimits::default()
    };
    let service = service(&dir, limits);

    let files = vec![
        write_pdf(&dir, "a.pdf", 3, MIB),
        write_pdf(&dir, "b.pdf", 5, 25 * MIB),
        write_pdf(&dir, "c.pdf", 2, MIB),
    ];
    let output = dir.path().join("merged.pdf");

    let outcome = service
        .merge(
            MergeRequest {
                files,
                output: output.clone(),
                format: OutputFormat::Pdf,
                bookmarks: BookmarkPolicy::Always,
            },
            None,
        )
        .await
        .unwrap();

    assert_eq!(
        page_labels(&output),
        vec!["a-1", "a-2", "a-3", "b-1", "b-2", "b-3", "b-4", "b-5", "c-1", "c-2"]
    );
    assert_eq!(outline_titles(&output), vec!["a", "b", "c"]);

    match outcome {
        MergeOutcome::Completed {
            bookmarks,
            merge_calls,
            fast_path,
            ..
        } => {
            assert_eq!(bookmarks, BookmarkOutcome::Added(3));
            assert!(!fast_path);
            // b splits into 3 ranges folded one at a time, then c
            assert_eq!(merge_calls, 4);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(!dir.path().join("work").read_dir().unwrap().any(|_| true));
}

#[tokio::test]
async fn test_fast_merge_without_bookmarks() {
    let dir = TempDir::new().unwrap();
    let limits = MergeLimits {
        memory_budget_override: Some(u64::MAX),
        ..MergeLimits::default()
    };
    let service = service(&dir, limits);

    let files = vec![write_pdf(&dir, "x.pdf", 1, 100), write_pdf(&dir, "y.pdf", 2, 100)];
    let output: PathBuf = dir.path().join("fast.pdf");

    let outcome = service
        .merge(
            MergeRequest {
                files,
                output: output.clone(),
                format: OutputFormat::Pdf,
                bookmarks: BookmarkPolicy::Auto,
            },
            None,
        )
        .await
        .unwrap();

    assert_eq!(page_labels(&output), vec!["x-1", "y-1", "y-2"]);
    assert!(matches!(
        outcome,
        MergeOutcome::Completed {
            fast_path: true,
            bookmarks: BookmarkOutcome::NotRequested,
            ..
        }
    ));
    let doc = Document::load(&output).unwrap();
    assert!(!doc.catalog().unwrap().has(b"Outlines"));
}
