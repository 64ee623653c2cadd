//! Shared fixtures for integration tests.
//!
//! [`RecordingEngine`] and [`FakeConverter`] model documents as text files
//! with one page label per line, so page order survives every merge, split
//! and conversion and can be asserted directly.

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;

use docfold::config::{MergeLimits, OutputFormat};
use docfold::convert::OfficeConverter;
use docfold::engine::{DocumentEngine, PageSpan};
use docfold::error::{DocFoldError, Result};
use docfold::input::InputFile;
use docfold::job::{JobRegistry, JobState, ProgressEvent};
use docfold::service::MergeService;

pub const MIB: u64 = 1024 * 1024;

/// One engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    PageCount(PathBuf),
    Extract(PathBuf, PageSpan),
    Merge(Vec<PathBuf>, PathBuf),
}

/// Requests cancellation once a call count is reached.
#[derive(Default)]
struct CancelTrigger(Mutex<Option<(usize, JobRegistry)>>);

impl CancelTrigger {
    fn arm(&self, after: usize, registry: JobRegistry) {
        *self.0.lock().unwrap() = Some((after, registry));
    }

    fn observe(&self, done: usize) {
        if let Some((after, registry)) = self.0.lock().unwrap().as_ref() {
            if done >= *after {
                registry.request_cancel();
            }
        }
    }
}

/// Line-based engine that records every call.
#[derive(Default)]
pub struct RecordingEngine {
    calls: Mutex<Vec<EngineCall>>,
    fail_first_merge: AtomicBool,
    cancel_after_merges: CancelTrigger,
    cancel_after_extracts: CancelTrigger,
}

impl RecordingEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next merge call fail with a tool error.
    pub fn fail_first_merge(&self) {
        self.fail_first_merge.store(true, Ordering::SeqCst);
    }

    /// Request cancellation through `registry` once `count` merges finished.
    pub fn cancel_after_merges(&self, count: usize, registry: JobRegistry) {
        self.cancel_after_merges.arm(count, registry);
    }

    /// Request cancellation through `registry` once `count` ranges were extracted.
    pub fn cancel_after_extracts(&self, count: usize, registry: JobRegistry) {
        self.cancel_after_extracts.arm(count, registry);
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn merges(&self) -> Vec<(Vec<PathBuf>, PathBuf)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::Merge(inputs, out) => Some((inputs, out)),
                _ => None,
            })
            .collect()
    }

    pub fn extracts(&self) -> Vec<PageSpan> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::Extract(_, span) => Some(span),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl DocumentEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    async fn page_count(&self, path: &Path, job: Option<&JobState>) -> Result<u32> {
        if let Some(job) = job {
            job.ensure_active()?;
        }
        self.record(EngineCall::PageCount(path.to_path_buf()));
        Ok(read_pages(path).len() as u32)
    }

    async fn extract_range(
        &self,
        source: &Path,
        span: PageSpan,
        out: &Path,
        job: Option<&JobState>,
    ) -> Result<()> {
        if let Some(job) = job {
            job.ensure_active()?;
        }
        self.record(EngineCall::Extract(source.to_path_buf(), span));
        let pages = read_pages(source);
        let slice = &pages[span.start as usize - 1..span.end as usize];
        write_pages(out, slice);
        self.cancel_after_extracts.observe(self.extracts().len());
        Ok(())
    }

    async fn merge(&self, inputs: &[PathBuf], out: &Path, job: Option<&JobState>) -> Result<()> {
        if let Some(job) = job {
            job.ensure_active()?;
        }
        self.record(EngineCall::Merge(inputs.to_vec(), out.to_path_buf()));

        if self.fail_first_merge.swap(false, Ordering::SeqCst) {
            // leave a partial file behind, like a crashed tool would
            std::fs::write(out, "partial").unwrap();
            return Err(DocFoldError::tool_failed("recording", Some(2), "simulated failure"));
        }

        let mut pages = Vec::new();
        for input in inputs {
            pages.extend(read_pages(input));
        }
        write_pages(out, &pages);

        self.cancel_after_merges.observe(self.merges().len());
        Ok(())
    }
}

/// Converter that turns decks into one page per line and images into one page.
#[derive(Default)]
pub struct FakeConverter {
    calls: Mutex<Vec<String>>,
    no_composer: AtomicBool,
    cancel_after: CancelTrigger,
}

impl FakeConverter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Converter that cannot compose deck batches.
    pub fn without_composer() -> Arc<Self> {
        let converter = Self::default();
        converter.no_composer.store(true, Ordering::SeqCst);
        Arc::new(converter)
    }

    /// Request cancellation through `registry` once `count` conversions finished.
    pub fn cancel_after(&self, count: usize, registry: JobRegistry) {
        self.cancel_after.arm(count, registry);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        let done = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(call);
            calls.len()
        };
        self.cancel_after.observe(done);
    }
}

fn stem(path: &Path) -> String {
    path.file_stem().unwrap().to_string_lossy().into_owned()
}

#[async_trait]
impl OfficeConverter for FakeConverter {
    fn name(&self) -> &str {
        "fake"
    }

    fn can_compose(&self) -> bool {
        !self.no_composer.load(Ordering::SeqCst)
    }

    async fn legacy_deck_to_modern_deck(
        &self,
        source: &Path,
        out_dir: &Path,
        _job: Option<&JobState>,
    ) -> Result<PathBuf> {
        let out = out_dir.join(format!("{}.pptx", stem(source)));
        std::fs::copy(source, &out)?;
        self.record(format!("modernize {}", stem(source)));
        Ok(out)
    }

    async fn image_to_single_page_document(
        &self,
        source: &Path,
        out_dir: &Path,
        _job: Option<&JobState>,
    ) -> Result<PathBuf> {
        let out = out_dir.join(format!("{}.pdf", stem(source)));
        write_pages(&out, &[format!("img-{}", stem(source))]);
        self.record(format!("image {}", stem(source)));
        Ok(out)
    }

    async fn deck_batch_to_final_format(
        &self,
        sources: &[PathBuf],
        format: OutputFormat,
        out_dir: &Path,
        _job: Option<&JobState>,
    ) -> Result<PathBuf> {
        let names: Vec<String> = sources.iter().map(|s| stem(s)).collect();

        let out = out_dir.join(format!("batch.{}", format.extension()));
        let mut pages = Vec::new();
        for source in sources {
            pages.extend(read_pages(source));
        }
        write_pages(&out, &pages);
        self.record(format!("batch {} {}", format.extension(), names.join(",")));
        Ok(out)
    }
}

pub fn read_pages(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

pub fn write_pages<S: AsRef<str>>(path: &Path, pages: &[S]) {
    let mut text = String::new();
    for page in pages {
        text.push_str(page.as_ref());
        text.push('\n');
    }
    std::fs::write(path, text).unwrap();
}

/// Write a document named `name` with `pages` pages labelled `<label>-<n>`
/// and return it as an input of the claimed `size`.
pub fn doc(dir: &Path, name: &str, label: &str, pages: u32, size: u64) -> InputFile {
    let path = dir.join(name);
    let labels: Vec<String> = (1..=pages).map(|n| format!("{label}-{n}")).collect();
    write_pages(&path, &labels);
    InputFile::new(path, size)
}

/// `count` one-page documents `f00.pdf`, `f01.pdf`, ... of `size` bytes each.
pub fn small_docs(dir: &Path, count: usize, size: u64) -> Vec<InputFile> {
    (0..count)
        .map(|i| doc(dir, &format!("f{i:02}.pdf"), &format!("f{i:02}"), 1, size))
        .collect()
}

/// Limits that force the chunked path regardless of host memory.
pub fn safe_limits() -> MergeLimits {
    MergeLimits {
        memory_budget_override: Some(1),
        ..MergeLimits::default()
    }
}

/// Limits that allow the single-call path for small test batches.
pub fn fast_limits() -> MergeLimits {
    MergeLimits {
        memory_budget_override: Some(u64::MAX),
        ..MergeLimits::default()
    }
}

/// A service over fakes with its workspace root inside a temp dir.
pub struct Harness {
    pub dir: TempDir,
    pub engine: Arc<RecordingEngine>,
    pub converter: Arc<FakeConverter>,
    pub service: MergeService,
}

impl Harness {
    pub fn new(limits: MergeLimits) -> Self {
        Self::with_converter(limits, FakeConverter::new())
    }

    pub fn with_converter(limits: MergeLimits, converter: Arc<FakeConverter>) -> Self {
        let dir = TempDir::new().unwrap();
        let engine = RecordingEngine::new();
        let service = MergeService::new(
            engine.clone(),
            converter.clone(),
            limits,
            dir.path().join("work"),
        );
        Self {
            dir,
            engine,
            converter,
            service,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn output(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn workspace_root(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    /// Job workspaces still on disk.
    pub fn leftover_workspaces(&self) -> usize {
        std::fs::read_dir(self.workspace_root())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

/// Sender plus a function draining everything it received.
pub fn progress_channel() -> (
    mpsc::UnboundedSender<ProgressEvent>,
    mpsc::UnboundedReceiver<ProgressEvent>,
) {
    mpsc::unbounded_channel()
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
