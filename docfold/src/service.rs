//! Entry point tying planning, the job registry and execution together.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::config::{BookmarkPolicy, Config, MergeLimits, OutputFormat};
use crate::convert::{OfficeConverter, SofficeConverter};
use crate::engine::{DocumentEngine, build_engine};
use crate::error::{DocFoldError, Result};
use crate::executor::{Executor, MergeJob, MergeOutcome, Workspace};
use crate::input::InputFile;
use crate::job::{JobRegistry, ProgressReporter, ProgressSender};
use crate::plan::{MemorySnapshot, MergePlan, plan};

/// A merge as submitted by a caller.
#[derive(Debug, Clone)]
pub struct MergeRequest {
    /// Inputs in merge order.
    pub files: Vec<InputFile>,
    /// Destination path.
    pub output: PathBuf,
    /// Requested output format.
    pub format: OutputFormat,
    /// Navigation entry policy.
    pub bookmarks: BookmarkPolicy,
}

/// Plans and runs merges, one at a time.
///
/// ```no_run
/// use docfold::config::{BookmarkPolicy, OutputFormat};
/// use docfold::input::load_inputs;
/// use docfold::service::{MergeRequest, MergeService};
/// use docfold::config::Config;
///
/// # async fn example(config: Config) -> docfold::Result<()> {
/// let service = MergeService::from_config(&config).await?;
/// let files = load_inputs(["a.pdf", "b.pdf"]).await?;
/// let outcome = service
///     .merge(
///         MergeRequest {
///             files,
///             output: "merged.pdf".into(),
///             format: OutputFormat::Pdf,
///             bookmarks: BookmarkPolicy::Auto,
///         },
///         None,
///     )
///     .await?;
/// println!("{outcome:?}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MergeService {
    registry: JobRegistry,
    engine: Arc<dyn DocumentEngine>,
    converter: Arc<dyn OfficeConverter>,
    limits: MergeLimits,
    workspace_root: PathBuf,
}

impl MergeService {
    /// Service over explicit adapters.
    pub fn new(
        engine: Arc<dyn DocumentEngine>,
        converter: Arc<dyn OfficeConverter>,
        limits: MergeLimits,
        workspace_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry: JobRegistry::new(),
            engine,
            converter,
            limits,
            workspace_root: workspace_root.into(),
        }
    }

    /// Service for a CLI configuration.
    ///
    /// The document engine is located and checked here so a missing engine
    /// surfaces before any job starts.
    ///
    /// # Errors
    ///
    /// Returns [`DocFoldError::EngineUnavailable`] if the engine cannot be
    /// started.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let engine = build_engine(config.engine, &config.tools).await?;
        let converter = Arc::new(SofficeConverter::new(
            config.tools.soffice.clone(),
            config.tools.deck_composer.clone(),
        ));
        info!(engine = engine.name(), "merge engine ready");

        Ok(Self::new(
            engine,
            converter,
            config.limits.clone(),
            config.workspace_root.clone(),
        ))
    }

    /// The job registry, for cancellation from another task.
    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Merge limits in effect.
    pub fn limits(&self) -> &MergeLimits {
        &self.limits
    }

    /// Plan against the host's current memory.
    pub fn plan(&self, files: &[InputFile], output: &Path, format: OutputFormat) -> MergePlan {
        self.plan_with(files, output, format, MemorySnapshot::host())
    }

    /// Plan against a given memory snapshot.
    ///
    /// Deck-target batches that need a composer are reported as
    /// unsupported when the converter has none.
    pub fn plan_with(
        &self,
        files: &[InputFile],
        output: &Path,
        format: OutputFormat,
        snapshot: MemorySnapshot,
    ) -> MergePlan {
        plan(files, output, format, snapshot, &self.limits).with_composer(
            files,
            format,
            self.converter.can_compose(),
        )
    }

    /// Run a merge with a plan computed from the host's memory.
    ///
    /// # Errors
    ///
    /// See [`MergeService::merge_with`].
    pub async fn merge(
        &self,
        request: MergeRequest,
        progress: Option<ProgressSender>,
    ) -> Result<MergeOutcome> {
        let plan = self.plan(&request.files, &request.output, request.format);
        self.merge_with(request, plan, progress).await
    }

    /// Run a merge under an already computed plan.
    ///
    /// Rejections (no inputs, unsupported inputs, PDFs with a deck target,
    /// a deck composition without a composer, another job active) happen
    /// before a workspace exists.
    ///
    /// # Errors
    ///
    /// Returns the rejection or the job's first failure. Cancellation is
    /// reported as [`MergeOutcome::Canceled`].
    pub async fn merge_with(
        &self,
        request: MergeRequest,
        plan: MergePlan,
        progress: Option<ProgressSender>,
    ) -> Result<MergeOutcome> {
        let plan = plan.with_composer(&request.files, request.format, self.converter.can_compose());
        plan.ensure_executable(&request.files, request.format)?;
        let route = plan.route.ok_or(DocFoldError::NoFilesToMerge)?;

        let guard = self.registry.try_acquire()?;
        let job = guard.job();
        info!(
            job = %job.id(),
            files = request.files.len(),
            mode = %plan.mode,
            reason = %plan.reason,
            route = %route,
            "merge started"
        );

        let workspace = Workspace::create(&self.workspace_root, job.id()).await?;
        let reporter = ProgressReporter::new(progress, request.files.len());
        let merge_job = MergeJob {
            id: job.id(),
            files: request.files,
            output: request.output,
            format: request.format,
            route,
            bookmarks: request.bookmarks,
            workspace,
        };

        let executor = Executor::new(
            self.engine.as_ref(),
            self.converter.as_ref(),
            &self.limits,
            job,
            reporter,
        );
        let outcome = executor.run(&merge_job, &plan).await;
        info!(job = %merge_job.id, ok = outcome.is_ok(), "merge finished");
        outcome
    }

    /// Ask the active job, if any, to stop.
    ///
    /// Returns whether a job was active.
    pub fn request_cancel(&self) -> bool {
        self.registry.request_cancel()
    }
}
