//! Cancellation, cleanup and the single active job.

use docfold::config::{BookmarkPolicy, MergeLimits, OutputFormat};
use docfold::io::temp_path_for;
use docfold::job::ProgressPhase;
use docfold::{DocFoldError, MergeOutcome, MergeRequest};

use crate::common::{
    Harness, MIB, doc, drain, fast_limits, progress_channel, read_pages, safe_limits, small_docs,
};

fn request(files: Vec<docfold::input::InputFile>, output: std::path::PathBuf) -> MergeRequest {
    MergeRequest {
        files,
        output,
        format: OutputFormat::Pdf,
        bookmarks: BookmarkPolicy::Never,
    }
}

#[tokio::test]
async fn test_cancel_between_chunks() {
    let h = Harness::new(safe_limits());
    let files = small_docs(h.path(), 60, 1000);
    let output = h.output("out.pdf");
    h.engine.cancel_after_merges(1, h.service.registry().clone());
    let (tx, mut rx) = progress_channel();

    let outcome = h
        .service
        .merge(request(files, output.clone()), Some(tx))
        .await
        .unwrap();

    assert_eq!(outcome, MergeOutcome::Canceled);
    assert_eq!(h.engine.merges().len(), 1);
    assert!(!output.exists());
    assert_eq!(h.leftover_workspaces(), 0);

    let events = drain(&mut rx);
    let last = events.last().unwrap();
    assert_eq!(last.phase, ProgressPhase::Canceled);
    assert_eq!(last.percent, 0);
    assert!(!last.done);
    assert!(events.iter().all(|e| e.phase != ProgressPhase::Done));
}

#[tokio::test]
async fn test_cancel_while_splitting() {
    let limits = MergeLimits {
        split_trigger_bytes: 10 * MIB,
        ..safe_limits()
    };
    let h = Harness::new(limits);
    let files = vec![
        doc(h.path(), "a.pdf", "a", 1, 1000),
        doc(h.path(), "big.pdf", "big", 9, 30 * MIB),
    ];
    let output = h.output("out.pdf");
    h.engine.cancel_after_extracts(1, h.service.registry().clone());
    let (tx, mut rx) = progress_channel();

    let outcome = h
        .service
        .merge(request(files, output.clone()), Some(tx))
        .await
        .unwrap();

    assert_eq!(outcome, MergeOutcome::Canceled);
    assert_eq!(h.engine.extracts().len(), 1);
    assert!(h.engine.merges().is_empty());
    assert!(!output.exists());
    assert_eq!(h.leftover_workspaces(), 0);

    let events = drain(&mut rx);
    assert_eq!(events.last().unwrap().phase, ProgressPhase::Canceled);
    assert!(events.iter().all(|e| e.phase != ProgressPhase::Done));
}

#[tokio::test]
async fn test_cancel_between_conversions() {
    let h = Harness::new(safe_limits());
    let files = vec![
        doc(h.path(), "intro.pdf", "intro", 1, 1000),
        doc(h.path(), "slides.pptx", "slide", 2, 1000),
        doc(h.path(), "notes.pptx", "note", 2, 1000),
    ];
    let output = h.output("out.pdf");
    h.converter.cancel_after(1, h.service.registry().clone());
    let (tx, mut rx) = progress_channel();

    let outcome = h
        .service
        .merge(request(files, output.clone()), Some(tx))
        .await
        .unwrap();

    assert_eq!(outcome, MergeOutcome::Canceled);
    assert_eq!(h.converter.calls(), vec!["batch pdf slides".to_string()]);
    assert!(h.engine.merges().is_empty());
    assert!(!output.exists());
    assert_eq!(h.leftover_workspaces(), 0);

    let events = drain(&mut rx);
    assert_eq!(events.last().unwrap().phase, ProgressPhase::Canceled);
}

#[tokio::test]
async fn test_cancel_during_fast_merge_keeps_old_output() {
    let h = Harness::new(fast_limits());
    let files = small_docs(h.path(), 4, 1000);
    let output = h.output("out.pdf");
    std::fs::write(&output, "old\n").unwrap();
    h.engine.cancel_after_merges(1, h.service.registry().clone());

    let outcome = h.service.merge(request(files, output.clone()), None).await.unwrap();

    assert_eq!(outcome, MergeOutcome::Canceled);
    // no fallback after a cancel
    assert_eq!(h.engine.merges().len(), 1);
    assert_eq!(read_pages(&output), vec!["old"]);
    assert!(!temp_path_for(&output).exists());
    assert_eq!(h.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_slot_is_free_after_cancel() {
    let h = Harness::new(safe_limits());
    let files = small_docs(h.path(), 30, 1000);
    h.engine.cancel_after_merges(1, h.service.registry().clone());

    let first = h
        .service
        .merge(request(files.clone(), h.output("a.pdf")), None)
        .await
        .unwrap();
    assert_eq!(first, MergeOutcome::Canceled);
    assert!(!h.service.registry().is_active());

    // disarm the trigger
    h.engine
        .cancel_after_merges(usize::MAX, docfold::job::JobRegistry::new());
    let second = h
        .service
        .merge(request(files, h.output("b.pdf")), None)
        .await
        .unwrap();
    assert!(matches!(second, MergeOutcome::Completed { .. }));
}

#[tokio::test]
async fn test_cancel_without_job_is_noop() {
    let h = Harness::new(safe_limits());
    assert!(!h.service.request_cancel());
}

#[tokio::test]
async fn test_second_job_rejected_while_active() {
    let h = Harness::new(safe_limits());
    let files = small_docs(h.path(), 2, 1000);
    let _held = h.service.registry().try_acquire().unwrap();

    let err = h
        .service
        .merge(request(files, h.output("out.pdf")), None)
        .await
        .unwrap_err();

    assert!(matches!(err, DocFoldError::JobAlreadyActive));
    assert!(h.engine.calls().is_empty());
    assert_eq!(h.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_repeated_cancel_is_harmless() {
    let h = Harness::new(safe_limits());
    let guard = h.service.registry().try_acquire().unwrap();

    assert!(h.service.request_cancel());
    assert!(h.service.request_cancel());
    assert!(guard.job().is_cancel_requested());
    // the job-level call reports that the flag was already set
    assert!(!guard.job().request_cancel());
}
