//! Conversion routes and request rejections.

use docfold::bookmarks::BookmarkOutcome;
use docfold::config::{BookmarkPolicy, OutputFormat};
use docfold::input::InputFile;
use docfold::plan::{MergeMode, PlanReason, Route};
use docfold::{DocFoldError, MergeOutcome, MergeRequest};

use crate::common::{FakeConverter, Harness, doc, fast_limits, read_pages, safe_limits, write_pages};

fn deck(h: &Harness, name: &str, slides: &[&str]) -> InputFile {
    let path = h.path().join(name);
    write_pages(&path, slides);
    InputFile::new(path, 2048)
}

fn image(h: &Harness, name: &str) -> InputFile {
    let path = h.path().join(name);
    std::fs::write(&path, b"\x89PNG").unwrap();
    InputFile::new(path, 4)
}

#[tokio::test]
async fn test_mixed_batch_to_pdf() {
    let h = Harness::new(safe_limits());
    let files = vec![
        doc(h.path(), "intro.pdf", "intro", 2, 1000),
        deck(&h, "slides.pptx", &["slide-1", "slide-2", "slide-3"]),
        image(&h, "photo.png"),
    ];
    let output = h.output("handout.pdf");

    let plan = h.service.plan(&files, &output, OutputFormat::Pdf);
    assert_eq!(plan.route, Some(Route::Mixed));
    assert_eq!(plan.mode, MergeMode::Ready);

    let outcome = h
        .service
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

    assert_eq!(
        h.converter.calls(),
        vec!["batch pdf slides".to_string(), "image photo".to_string()]
    );
    assert_eq!(
        read_pages(&output),
        vec!["intro-1", "intro-2", "slide-1", "slide-2", "slide-3", "img-photo"]
    );

    // the fake output is not a real PDF: the outline pass fails, the merge does not
    match outcome {
        MergeOutcome::Completed { bookmarks, .. } => {
            assert!(matches!(bookmarks, BookmarkOutcome::Failed(_)));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(h.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_images_to_pdf_without_bookmarks() {
    let h = Harness::new(safe_limits());
    let files = vec![image(&h, "a.png"), image(&h, "b.jpg")];
    let output = h.output("album.pdf");

    let outcome = h
        .service
        .merge(
            MergeRequest {
                files,
                output: output.clone(),
                format: OutputFormat::Pdf,
                bookmarks: BookmarkPolicy::Never,
            },
            None,
        )
        .await
        .unwrap();

    assert_eq!(read_pages(&output), vec!["img-a", "img-b"]);
    assert!(matches!(
        outcome,
        MergeOutcome::Completed {
            bookmarks: BookmarkOutcome::NotRequested,
            ..
        }
    ));
}

#[tokio::test]
async fn test_convertible_batch_to_deck() {
    let h = Harness::new(safe_limits());
    let files = vec![
        deck(&h, "a.pptx", &["a-1"]),
        deck(&h, "old.ppt", &["old-1", "old-2"]),
        image(&h, "pic.png"),
    ];
    let output = h.output("talk.pptx");

    let outcome = h
        .service
        .merge(
            MergeRequest {
                files,
                output: output.clone(),
                format: OutputFormat::Pptx,
                bookmarks: BookmarkPolicy::Auto,
            },
            None,
        )
        .await
        .unwrap();

    assert_eq!(
        h.converter.calls(),
        vec!["modernize old".to_string(), "batch pptx a,old,pic".to_string()]
    );
    assert!(h.engine.calls().is_empty());
    assert_eq!(read_pages(&output)[..3], ["a-1", "old-1", "old-2"]);
    assert!(matches!(
        outcome,
        MergeOutcome::Completed {
            merge_calls: 0,
            bookmarks: BookmarkOutcome::NotRequested,
            ..
        }
    ));
    assert_eq!(h.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_mixed_batch_to_deck_is_rejected() {
    let h = Harness::new(safe_limits());
    let files = vec![
        doc(h.path(), "a.pdf", "a", 1, 1000),
        deck(&h, "b.pptx", &["b-1"]),
    ];
    let output = h.output("out.pptx");

    let plan = h.service.plan(&files, &output, OutputFormat::Pptx);
    assert_eq!(plan.mode, MergeMode::Unsupported);
    assert_eq!(plan.reason, PlanReason::MixedRequiresPdf);

    let err = h
        .service
        .merge(
            MergeRequest {
                files,
                output: output.clone(),
                format: OutputFormat::Pptx,
                bookmarks: BookmarkPolicy::Auto,
            },
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DocFoldError::MixedRequiresPdf { .. }));
    assert!(err.is_rejection());
    assert!(!output.exists());
    assert!(h.converter.calls().is_empty());
    assert_eq!(h.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_pdf_batch_to_deck_is_rejected() {
    let h = Harness::new(fast_limits());
    let files = vec![
        doc(h.path(), "a.pdf", "a", 1, 1000),
        doc(h.path(), "b.pdf", "b", 1, 1000),
    ];
    let output = h.output("out.pptx");

    let plan = h.service.plan(&files, &output, OutputFormat::Pptx);
    assert_eq!(plan.mode, MergeMode::Unsupported);
    assert_eq!(plan.reason, PlanReason::DocumentsRequirePdf);

    let err = h
        .service
        .merge(
            MergeRequest {
                files,
                output: output.clone(),
                format: OutputFormat::Pptx,
                bookmarks: BookmarkPolicy::Auto,
            },
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DocFoldError::DocumentsRequirePdf { .. }));
    assert!(err.is_rejection());
    assert!(h.engine.calls().is_empty());
    assert!(!output.exists());
    assert_eq!(h.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_deck_composition_without_composer_is_rejected_up_front() {
    let h = Harness::with_converter(safe_limits(), FakeConverter::without_composer());
    let files = vec![
        deck(&h, "old.ppt", &["old-1"]),
        deck(&h, "b.pptx", &["b-1"]),
    ];
    let output = h.output("talk.pptx");

    let plan = h.service.plan(&files, &output, OutputFormat::Pptx);
    assert_eq!(plan.mode, MergeMode::Unsupported);
    assert_eq!(plan.reason, PlanReason::ComposerUnavailable);

    let err = h
        .service
        .merge(
            MergeRequest {
                files,
                output: output.clone(),
                format: OutputFormat::Pptx,
                bookmarks: BookmarkPolicy::Auto,
            },
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DocFoldError::EngineUnavailable { .. }));
    // the legacy deck was never converted
    assert!(h.converter.calls().is_empty());
    assert!(!h.service.registry().is_active());
    assert!(!output.exists());
    assert_eq!(h.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_single_legacy_deck_needs_no_composer() {
    let h = Harness::with_converter(safe_limits(), FakeConverter::without_composer());
    let files = vec![deck(&h, "old.ppt", &["old-1", "old-2"])];
    let output = h.output("talk.pptx");

    h.service
        .merge(
            MergeRequest {
                files,
                output: output.clone(),
                format: OutputFormat::Pptx,
                bookmarks: BookmarkPolicy::Auto,
            },
            None,
        )
        .await
        .unwrap();

    assert_eq!(
        h.converter.calls(),
        vec!["modernize old".to_string(), "batch pptx old".to_string()]
    );
    assert_eq!(read_pages(&output), vec!["old-1", "old-2"]);
}

#[tokio::test]
async fn test_unsupported_input_is_rejected() {
    let h = Harness::new(safe_limits());
    let notes = h.path().join("notes.txt");
    std::fs::write(&notes, "hello").unwrap();
    let files = vec![doc(h.path(), "a.pdf", "a", 1, 1000), InputFile::new(&notes, 5)];

    let err = h
        .service
        .merge(
            MergeRequest {
                files,
                output: h.output("out.pdf"),
                format: OutputFormat::Pdf,
                bookmarks: BookmarkPolicy::Auto,
            },
            None,
        )
        .await
        .unwrap_err();

    match err {
        DocFoldError::UnsupportedInput { paths } => assert_eq!(paths, vec![notes]),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(h.engine.calls().is_empty());
}

#[tokio::test]
async fn test_empty_request_is_rejected() {
    let h = Harness::new(safe_limits());
    let err = h
        .service
        .merge(
            MergeRequest {
                files: Vec::new(),
                output: h.output("out.pdf"),
                format: OutputFormat::Pdf,
                bookmarks: BookmarkPolicy::Auto,
            },
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DocFoldError::NoFilesToMerge));
    assert_eq!(h.leftover_workspaces(), 0);
}
