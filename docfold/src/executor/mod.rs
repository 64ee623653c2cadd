//! Merge execution.
//!
//! The executor runs one job along the route its plan selected:
//!
//! - uniform paginated documents try the fast path first when the plan
//!   allows it, then fall back to safe accumulation;
//! - mixed or convertible inputs with a paginated target are converted one
//!   by one and then accumulated;
//! - convertible inputs with a deck target are composed in one call.
//!
//! The workspace is removed and any active external process is killed on
//! every exit path. Once cancellation has been requested, every failure is
//! reported as a cancellation.

pub mod accumulator;
pub mod split;
pub mod workspace;

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bookmarks::{BookmarkEntry, BookmarkOutcome, bookmark_outcome, compute_entries};
use crate::config::{BookmarkPolicy, MergeLimits, OutputFormat};
use crate::convert::OfficeConverter;
use crate::engine::DocumentEngine;
use crate::error::{DocFoldError, Result};
use crate::input::{InputFile, InputKind};
use crate::io::{copy_atomic, remove_if_exists, temp_path_for};
use crate::job::{JobState, ProgressReporter};
use crate::plan::{MergeMode, MergePlan, Route};
use crate::utils::display_stem;

pub use accumulator::Accumulator;
pub use split::{SplitSegment, plan_segments};
pub use workspace::Workspace;

/// One accepted merge request.
#[derive(Debug)]
pub struct MergeJob {
    /// Job identifier.
    pub id: Uuid,
    /// Inputs in merge order.
    pub files: Vec<InputFile>,
    /// Destination path.
    pub output: PathBuf,
    /// Requested output format.
    pub format: OutputFormat,
    /// Route chosen at planning time.
    pub route: Route,
    /// Navigation entry policy.
    pub bookmarks: BookmarkPolicy,
    /// Scratch directory.
    pub workspace: Workspace,
}

/// Terminal result of a job that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum MergeOutcome {
    /// The output was written.
    #[serde(rename_all = "camelCase")]
    Completed {
        /// Where the output was written.
        output: PathBuf,
        /// Result of the bookmark pass.
        bookmarks: BookmarkOutcome,
        /// Merge-engine calls made.
        merge_calls: usize,
        /// Whether the direct single-call merge succeeded.
        fast_path: bool,
    },
    /// The user stopped the job. The output path was not written.
    Canceled,
}

struct Finished {
    merge_calls: usize,
    fast_path: bool,
    bookmarks: BookmarkOutcome,
}

/// Runs one [`MergeJob`].
pub struct Executor<'a> {
    engine: &'a dyn DocumentEngine,
    converter: &'a dyn OfficeConverter,
    limits: &'a MergeLimits,
    job: &'a JobState,
    progress: ProgressReporter,
}

impl<'a> Executor<'a> {
    /// Executor publishing through `progress`.
    pub fn new(
        engine: &'a dyn DocumentEngine,
        converter: &'a dyn OfficeConverter,
        limits: &'a MergeLimits,
        job: &'a JobState,
        progress: ProgressReporter,
    ) -> Self {
        Self {
            engine,
            converter,
            limits,
            job,
            progress,
        }
    }

    /// Run `merge_job` according to `plan`.
    ///
    /// Cancellation yields `Ok(MergeOutcome::Canceled)`, never an error. The
    /// workspace is gone when this returns.
    ///
    /// # Errors
    ///
    /// Returns the first non-cancellation failure.
    pub async fn run(&self, merge_job: &MergeJob, plan: &MergePlan) -> Result<MergeOutcome> {
        let result = self.execute(merge_job, plan).await;

        self.job.terminate_active();
        merge_job.workspace.cleanup().await;

        match result {
            Ok(finished) => Ok(MergeOutcome::Completed {
                output: merge_job.output.clone(),
                bookmarks: finished.bookmarks,
                merge_calls: finished.merge_calls,
                fast_path: finished.fast_path,
            }),
            Err(err) if err.is_cancellation() || self.job.is_cancel_requested() => {
                debug!(job = %merge_job.id, error = %err, "job stopped after cancel request");
                self.progress.canceled(self.job.completed_units());
                info!(job = %merge_job.id, "merge canceled");
                Ok(MergeOutcome::Canceled)
            }
            Err(err) => Err(err),
        }
    }

    fn status(&self, label: impl Into<String>) {
        let label = label.into();
        self.progress.merging(self.job.completed_units(), &label);
        self.job.set_label(label);
    }

    fn complete(&self, units: usize) {
        self.job.add_completed(units);
        self.progress
            .merging(self.job.completed_units(), &self.job.current_label());
    }

    async fn execute(&self, merge_job: &MergeJob, plan: &MergePlan) -> Result<Finished> {
        self.job.ensure_active()?;
        self.status("Preparing merge engine...");

        match (merge_job.route, merge_job.format) {
            (Route::UniformDocuments, OutputFormat::Pdf) => {
                self.merge_documents(merge_job, plan).await
            }
            (Route::UniformDocuments, format) => Err(DocFoldError::DocumentsRequirePdf {
                requested: format.to_string(),
            }),
            (Route::UniformConvertible, OutputFormat::Pptx) => self.compose_deck(merge_job).await,
            (Route::UniformConvertible | Route::Mixed, OutputFormat::Pdf) => {
                self.merge_converted(merge_job).await
            }
            (Route::Mixed, format) => Err(DocFoldError::MixedRequiresPdf {
                requested: format.to_string(),
            }),
        }
    }

    async fn merge_documents(&self, merge_job: &MergeJob, plan: &MergePlan) -> Result<Finished> {
        let entries = match merge_job.bookmarks {
            BookmarkPolicy::Always => Some(self.bookmark_entries(&merge_job.files).await?),
            BookmarkPolicy::Auto | BookmarkPolicy::Never => None,
        };

        if plan.mode == MergeMode::Fast && self.try_fast(merge_job).await? {
            let bookmarks = self.apply_bookmarks(&merge_job.output, entries).await;
            self.progress.done();
            return Ok(Finished {
                merge_calls: 1,
                fast_path: true,
                bookmarks,
            });
        }

        let (result, merge_calls) = self.accumulate(&merge_job.files, &merge_job.workspace).await?;
        let bookmarks = self.finish(&result, &merge_job.output, entries).await?;
        Ok(Finished {
            merge_calls,
            fast_path: false,
            bookmarks,
        })
    }

    /// One merge call straight into the destination.
    ///
    /// Returns `false` when the call failed for a reason other than
    /// cancellation; the caller then takes the safe path. The destination is
    /// only replaced once the merge has fully succeeded.
    async fn try_fast(&self, merge_job: &MergeJob) -> Result<bool> {
        self.status("Fast mode: merging directly");

        let staging = temp_path_for(&merge_job.output);
        let inputs: Vec<PathBuf> = merge_job.files.iter().map(|f| f.path.clone()).collect();

        match self.fast_merge(&inputs, &staging, &merge_job.output).await {
            Ok(()) => {
                self.job.set_completed(self.progress.total());
                info!(job = %merge_job.id, engine = self.engine.name(), "merged in a single call");
                Ok(true)
            }
            Err(err) => {
                let _ = remove_if_exists(&staging).await;
                if err.is_cancellation() || self.job.is_cancel_requested() {
                    return Err(err);
                }
                warn!(error = %err, "direct merge failed, falling back to safe mode");
                self.status("Switching to safe mode (slower)");
                Ok(false)
            }
        }
    }

    async fn fast_merge(&self, inputs: &[PathBuf], staging: &Path, output: &Path) -> Result<()> {
        self.engine.merge(inputs, staging, Some(self.job)).await?;
        self.job.ensure_active()?;
        tokio::fs::rename(staging, output)
            .await
            .map_err(|source| DocFoldError::FailedToWrite {
                path: output.to_path_buf(),
                source,
            })
    }

    /// Fold `files` into one document inside the workspace.
    ///
    /// Small inputs are buffered and flushed in chunks; an oversized input
    /// flushes the buffer, is split into page ranges and its segments are
    /// folded in order.
    async fn accumulate(&self, files: &[InputFile], workspace: &Workspace) -> Result<(PathBuf, usize)> {
        let max_inputs = self.limits.max_inputs_per_call;
        let mut acc = Accumulator::new(self.engine, workspace, self.job, max_inputs);
        let mut pending: Vec<PathBuf> = Vec::with_capacity(max_inputs);

        for (index, file) in files.iter().enumerate() {
            self.job.ensure_active()?;

            if file.effective_size() < self.limits.split_trigger_bytes {
                self.status(format!("Queued: {}", file.name));
                pending.push(file.path.clone());
                if pending.len() >= max_inputs {
                    self.flush(&mut acc, &mut pending).await?;
                }
                continue;
            }

            self.flush(&mut acc, &mut pending).await?;
            let segments = self.split(file, index, workspace).await?;

            self.status(format!("Merging split parts: {}", file.name));
            let paths: Vec<PathBuf> = segments.into_iter().map(|s| s.temp_path).collect();
            acc.fold_segments(&paths).await?;
            self.complete(1);
        }

        self.flush(&mut acc, &mut pending).await?;
        self.job.ensure_active()?;

        let merge_calls = acc.merge_calls();
        let result = acc.into_current().ok_or(DocFoldError::NoOutputProduced)?;
        Ok((result, merge_calls))
    }

    async fn flush(&self, acc: &mut Accumulator<'_>, pending: &mut Vec<PathBuf>) -> Result<()> {
        let max_inputs = self.limits.max_inputs_per_call;
        for chunk in pending.chunks(max_inputs) {
            self.job.ensure_active()?;
            let done = self.job.completed_units();
            self.status(format!(
                "Merging files ({}/{})",
                (done + chunk.len()).min(self.progress.total()),
                self.progress.total()
            ));
            acc.fold(chunk).await?;
            self.complete(chunk.len());
        }
        pending.clear();
        Ok(())
    }

    async fn split(&self, file: &InputFile, index: usize, workspace: &Workspace) -> Result<Vec<SplitSegment>> {
        let pages = self.engine.page_count(&file.path, Some(self.job)).await?;
        let spans = plan_segments(file.effective_size(), pages, self.limits.split_trigger_bytes);
        debug!(file = %file.name, pages, segments = spans.len(), "splitting");

        let mut segments = Vec::with_capacity(spans.len());
        for (segment, span) in spans.into_iter().enumerate() {
            self.job.ensure_active()?;
            self.status(format!("Splitting {} ({span})", file.name));

            let temp_path = workspace.split_path(index, segment);
            self.engine
                .extract_range(&file.path, span, &temp_path, Some(self.job))
                .await?;
            segments.push(SplitSegment {
                source: file.path.clone(),
                span,
                temp_path,
            });
        }
        Ok(segments)
    }

    /// Convert every non-document input to a paginated document, then
    /// accumulate the parts.
    async fn merge_converted(&self, merge_job: &MergeJob) -> Result<Finished> {
        let mut parts = Vec::with_capacity(merge_job.files.len());

        for (index, file) in merge_job.files.iter().enumerate() {
            self.job.ensure_active()?;
            let part = match file.kind {
                Some(InputKind::PaginatedDoc) => file.clone(),
                Some(kind) => {
                    self.status(format!("Converting {}", file.name));
                    let dir = merge_job.workspace.conversion_dir(index).await?;
                    let produced = if kind == InputKind::Image {
                        self.converter
                            .image_to_single_page_document(&file.path, &dir, Some(self.job))
                            .await?
                    } else {
                        self.converter
                            .deck_batch_to_final_format(
                                std::slice::from_ref(&file.path),
                                OutputFormat::Pdf,
                                &dir,
                                Some(self.job),
                            )
                            .await?
                    };
                    converted_part(file, produced).await?
                }
                None => {
                    return Err(DocFoldError::UnsupportedInput {
                        paths: vec![file.path.clone()],
                    });
                }
            };
            parts.push(part);
        }

        let entries = match merge_job.bookmarks {
            BookmarkPolicy::Never => None,
            BookmarkPolicy::Auto | BookmarkPolicy::Always => {
                Some(self.bookmark_entries(&parts).await?)
            }
        };

        let (result, merge_calls) = self.accumulate(&parts, &merge_job.workspace).await?;
        let bookmarks = self.finish(&result, &merge_job.output, entries).await?;
        Ok(Finished {
            merge_calls,
            fast_path: false,
            bookmarks,
        })
    }

    /// Modernize legacy decks, then compose everything into one deck.
    async fn compose_deck(&self, merge_job: &MergeJob) -> Result<Finished> {
        let mut sources = Vec::with_capacity(merge_job.files.len());

        for (index, file) in merge_job.files.iter().enumerate() {
            self.job.ensure_active()?;
            if file.kind == Some(InputKind::LegacyDeck) {
                self.status(format!("Converting {}", file.name));
                let dir = merge_job.workspace.conversion_dir(index).await?;
                let modern = self
                    .converter
                    .legacy_deck_to_modern_deck(&file.path, &dir, Some(self.job))
                    .await?;
                sources.push(modern);
            } else {
                sources.push(file.path.clone());
            }
        }

        self.job.ensure_active()?;
        self.status(format!("Composing {} files", sources.len()));
        let dir = merge_job.workspace.subdir("compose").await?;
        let artifact = self
            .converter
            .deck_batch_to_final_format(&sources, OutputFormat::Pptx, &dir, Some(self.job))
            .await?;
        self.job.set_completed(self.progress.total());

        let bookmarks = self.finish(&artifact, &merge_job.output, None).await?;
        Ok(Finished {
            merge_calls: 0,
            fast_path: false,
            bookmarks,
        })
    }

    async fn bookmark_entries(&self, parts: &[InputFile]) -> Result<Vec<BookmarkEntry>> {
        let mut counts = Vec::with_capacity(parts.len());
        for part in parts {
            self.job.ensure_active()?;
            let pages = self.engine.page_count(&part.path, Some(self.job)).await?;
            counts.push((display_stem(Path::new(&part.name)), pages));
        }
        Ok(compute_entries(&counts))
    }

    async fn apply_bookmarks(&self, output: &Path, entries: Option<Vec<BookmarkEntry>>) -> BookmarkOutcome {
        match entries {
            Some(entries) if !entries.is_empty() => bookmark_outcome(output, &entries).await,
            _ => BookmarkOutcome::NotRequested,
        }
    }

    /// Copy the final artifact to the destination, then run the bookmark
    /// pass on the copy.
    async fn finish(
        &self,
        artifact: &Path,
        output: &Path,
        entries: Option<Vec<BookmarkEntry>>,
    ) -> Result<BookmarkOutcome> {
        self.job.ensure_active()?;
        self.job.set_label("Writing file to disk");
        self.progress.writing();

        copy_atomic(artifact, output).await?;
        debug!(artifact = %artifact.display(), output = %output.display(), "output written");

        let bookmarks = self.apply_bookmarks(output, entries).await;
        self.progress.done();
        Ok(bookmarks)
    }
}

/// Record for a conversion result, keeping the source's display name.
async fn converted_part(source: &InputFile, produced: PathBuf) -> Result<InputFile> {
    let size = tokio::fs::metadata(&produced).await?.len();
    Ok(InputFile {
        path: produced,
        name: source.name.clone(),
        size,
        kind: Some(InputKind::PaginatedDoc),
    })
}
