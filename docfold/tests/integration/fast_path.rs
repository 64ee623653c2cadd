//! Single-call merges and the fallback to chunked mode.

use docfold::config::{BookmarkPolicy, MergeLimits, OutputFormat};
use docfold::io::temp_path_for;
use docfold::plan::{MergeMode, PlanReason};
use docfold::{MergeOutcome, MergeRequest};

use crate::common::{Harness, drain, fast_limits, progress_channel, read_pages, small_docs};

#[tokio::test]
async fn test_fast_path_merges_in_one_call() {
    let h = Harness::new(fast_limits());
    let files = small_docs(h.path(), 5, 1000);
    let expected: Vec<String> = files.iter().flat_map(|f| read_pages(&f.path)).collect();
    let output = h.output("out.pdf");

    let plan = h.service.plan(&files, &output, OutputFormat::Pdf);
    assert_eq!(plan.mode, MergeMode::Fast);

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

    let merges = h.engine.merges();
    assert_eq!(merges.len(), 1);
    assert_eq!(merges[0].0.len(), 5);
    assert_eq!(read_pages(&output), expected);
    assert!(!temp_path_for(&output).exists());
    assert!(matches!(
        outcome,
        MergeOutcome::Completed {
            fast_path: true,
            merge_calls: 1,
            ..
        }
    ));
    assert_eq!(h.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_fast_failure_falls_back_silently() {
    let h = Harness::new(fast_limits());
    let files = small_docs(h.path(), 5, 1000);
    let expected: Vec<String> = files.iter().flat_map(|f| read_pages(&f.path)).collect();
    let output = h.output("out.pdf");
    h.engine.fail_first_merge();
    let (tx, mut rx) = progress_channel();

    let outcome = h
        .service
        .merge(
            MergeRequest {
                files,
                output: output.clone(),
                format: OutputFormat::Pdf,
                bookmarks: BookmarkPolicy::Never,
            },
            Some(tx),
        )
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        MergeOutcome::Completed {
            fast_path: false,
            ..
        }
    ));
    // the failed direct attempt plus one chunk
    assert_eq!(h.engine.merges().len(), 2);
    assert_eq!(read_pages(&output), expected);
    assert!(!temp_path_for(&output).exists());

    let labels: Vec<String> = drain(&mut rx).into_iter().map(|e| e.label).collect();
    let fast = labels.iter().position(|l| l == "Fast mode: merging directly").unwrap();
    let switch = labels.iter().position(|l| l == "Switching to safe mode (slower)").unwrap();
    assert!(fast < switch);
}

#[tokio::test]
async fn test_long_command_skips_fast_attempt() {
    let limits = MergeLimits {
        arg_limit_chars: 50,
        ..fast_limits()
    };
    let h = Harness::new(limits);
    let files = small_docs(h.path(), 3, 1000);
    let output = h.output("out.pdf");

    let plan = h.service.plan(&files, &output, OutputFormat::Pdf);
    assert_eq!(plan.mode, MergeMode::Safe);
    assert_eq!(plan.reason, PlanReason::CommandLength);

    h.service
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

    let merges = h.engine.merges();
    assert_eq!(merges.len(), 1);
    assert!(merges[0].1.starts_with(h.workspace_root()));
}

#[tokio::test]
async fn test_existing_output_replaced_only_on_success() {
    let h = Harness::new(fast_limits());
    let files = small_docs(h.path(), 2, 1000);
    let output = h.output("out.pdf");
    std::fs::write(&output, "old\n").unwrap();

    h.service
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

    assert_eq!(read_pages(&output), vec!["f00-1", "f01-1"]);
}
