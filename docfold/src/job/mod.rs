//! Job state and the single-slot job registry.
//!
//! A [`JobState`] exists for exactly as long as one merge job runs. The
//! executor advances its counters and registers each external process it
//! starts; the cancellation path flips the flag and kills whatever process
//! is active. [`JobRegistry`] guarantees that at most one job is active at a
//! time by a check-and-set on acquisition.

pub mod progress;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DocFoldError, Result};
use crate::process::ProcessHandle;

pub use progress::{ProgressEvent, ProgressPhase, ProgressReporter, ProgressSender};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mutable state of the running job.
#[derive(Debug)]
pub struct JobState {
    id: Uuid,
    cancel_requested: AtomicBool,
    cancel_signal: watch::Sender<bool>,
    completed_units: AtomicUsize,
    current_label: Mutex<String>,
    active_process: Mutex<Option<Arc<dyn ProcessHandle>>>,
}

impl JobState {
    fn new() -> Self {
        let (cancel_signal, _) = watch::channel(false);
        Self {
            id: Uuid::new_v4(),
            cancel_requested: AtomicBool::new(false),
            cancel_signal,
            completed_units: AtomicUsize::new(0),
            current_label: Mutex::new(String::new()),
            active_process: Mutex::new(None),
        }
    }

    /// Unique id of this job.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether cancellation has been requested.
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    /// Fail with [`DocFoldError::Cancelled`] once cancellation was requested.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` if the job has been asked to stop.
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_cancel_requested() {
            Err(DocFoldError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Request cancellation.
    ///
    /// Idempotent. The first call kills the active external process, if any.
    /// Returns `true` if this call flipped the flag.
    pub fn request_cancel(&self) -> bool {
        if self.cancel_requested.swap(true, Ordering::SeqCst) {
            return false;
        }

        info!(job = %self.id, "cancellation requested");
        self.cancel_signal.send_replace(true);

        let active = lock(&self.active_process).clone();
        if let Some(handle) = active {
            handle.terminate();
        }
        true
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        let mut rx = self.cancel_signal.subscribe();
        if rx.wait_for(|requested| *requested).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Number of inputs fully folded into the output so far.
    pub fn completed_units(&self) -> usize {
        self.completed_units.load(Ordering::SeqCst)
    }

    /// Add to the completed-unit counter.
    pub fn add_completed(&self, units: usize) {
        self.completed_units.fetch_add(units, Ordering::SeqCst);
    }

    /// Overwrite the completed-unit counter.
    pub fn set_completed(&self, units: usize) {
        self.completed_units.store(units, Ordering::SeqCst);
    }

    /// Label of the step in progress.
    pub fn current_label(&self) -> String {
        lock(&self.current_label).clone()
    }

    /// Replace the label of the step in progress.
    pub fn set_label(&self, label: impl Into<String>) {
        *lock(&self.current_label) = label.into();
    }

    /// The external process currently running for this job.
    pub fn active_process(&self) -> Option<Arc<dyn ProcessHandle>> {
        lock(&self.active_process).clone()
    }

    /// Make `handle` the active process until the returned guard drops.
    ///
    /// A process registered after cancellation is killed right away.
    pub fn register_process(&self, handle: Arc<dyn ProcessHandle>) -> ProcessRegistration<'_> {
        *lock(&self.active_process) = Some(Arc::clone(&handle));
        if self.is_cancel_requested() {
            handle.terminate();
        }
        ProcessRegistration { job: self }
    }

    /// Kill the active process, if any, and clear the slot.
    pub fn terminate_active(&self) {
        let active = lock(&self.active_process).take();
        if let Some(handle) = active {
            handle.terminate();
        }
    }
}

/// Clears the job's active-process slot on drop.
#[derive(Debug)]
pub struct ProcessRegistration<'a> {
    job: &'a JobState,
}

impl Drop for ProcessRegistration<'_> {
    fn drop(&mut self) {
        *lock(&self.job.active_process) = None;
    }
}

/// Registry holding at most one active job.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    slot: Arc<Mutex<Option<Arc<JobState>>>>,
}

impl JobRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for a new job.
    ///
    /// # Errors
    ///
    /// Returns [`DocFoldError::JobAlreadyActive`] if a job is running.
    pub fn try_acquire(&self) -> Result<JobGuard> {
        let mut slot = lock(&self.slot);
        if slot.is_some() {
            return Err(DocFoldError::JobAlreadyActive);
        }

        let job = Arc::new(JobState::new());
        *slot = Some(Arc::clone(&job));
        debug!(job = %job.id(), "job slot acquired");

        Ok(JobGuard {
            registry: self.clone(),
            job,
        })
    }

    /// The running job, if any.
    pub fn active(&self) -> Option<Arc<JobState>> {
        lock(&self.slot).clone()
    }

    /// Whether a job is running.
    pub fn is_active(&self) -> bool {
        lock(&self.slot).is_some()
    }

    /// Ask the running job to stop.
    ///
    /// Returns whether a job was active. Does not wait for the job to wind
    /// down; its terminal progress event signals that.
    pub fn request_cancel(&self) -> bool {
        match self.active() {
            Some(job) => {
                job.request_cancel();
                true
            }
            None => false,
        }
    }
}

/// Ownership of the registry slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct JobGuard {
    registry: JobRegistry,
    job: Arc<JobState>,
}

impl JobGuard {
    /// State of the guarded job.
    pub fn job(&self) -> &Arc<JobState> {
        &self.job
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        let mut slot = lock(&self.registry.slot);
        if slot.as_ref().is_some_and(|active| Arc::ptr_eq(active, &self.job)) {
            *slot = None;
            debug!(job = %self.job.id(), "job slot released");
        }
    }
}
