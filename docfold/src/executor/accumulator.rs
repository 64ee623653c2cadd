//! Running merge result for the safe path.

use std::path::{Path, PathBuf};
use tracing::debug;

use super::workspace::Workspace;
use crate::engine::DocumentEngine;
use crate::error::Result;
use crate::io::remove_if_exists;
use crate::job::JobState;

/// The running merge result.
///
/// Each fold merges `[current?, ...chunk]` into a fresh step file in the
/// workspace and makes that the new current result. The superseded result
/// is deleted when it is a workspace artifact; caller-owned inputs are never
/// touched. A single item folded into an empty accumulator is adopted
/// without a merge call.
pub struct Accumulator<'a> {
    engine: &'a dyn DocumentEngine,
    workspace: &'a Workspace,
    job: &'a JobState,
    max_inputs: usize,
    current: Option<PathBuf>,
    step: usize,
    merge_calls: usize,
}

impl<'a> Accumulator<'a> {
    /// Empty accumulator allowing at most `max_inputs` inputs per merge call
    /// for segments.
    pub fn new(
        engine: &'a dyn DocumentEngine,
        workspace: &'a Workspace,
        job: &'a JobState,
        max_inputs: usize,
    ) -> Self {
        Self {
            engine,
            workspace,
            job,
            max_inputs: max_inputs.max(2),
            current: None,
            step: 0,
            merge_calls: 0,
        }
    }

    /// Current result, if anything has been folded in.
    pub fn current(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    /// Number of merge calls made so far.
    pub fn merge_calls(&self) -> usize {
        self.merge_calls
    }

    /// Consume the accumulator and return the final result.
    pub fn into_current(self) -> Option<PathBuf> {
        self.current
    }

    /// Fold one chunk of small inputs.
    ///
    /// # Errors
    ///
    /// Propagates engine failures and cancellation.
    pub async fn fold(&mut self, chunk: &[PathBuf]) -> Result<()> {
        self.job.ensure_active()?;
        match chunk {
            [] => Ok(()),
            [single] if self.current.is_none() => {
                self.current = Some(single.clone());
                Ok(())
            }
            _ => self.merge_step(chunk).await,
        }
    }

    /// Fold the segments of one split input, in order.
    ///
    /// While a current result exists one input slot is reserved for it, so
    /// no call exceeds the per-call limit. Segments are deleted once folded.
    ///
    /// # Errors
    ///
    /// Propagates engine failures and cancellation.
    pub async fn fold_segments(&mut self, segments: &[PathBuf]) -> Result<()> {
        let mut remaining = segments;

        while !remaining.is_empty() {
            self.job.ensure_active()?;

            let capacity = if self.current.is_some() {
                self.max_inputs - 1
            } else {
                self.max_inputs
            };
            let (chunk, rest) = remaining.split_at(capacity.min(remaining.len()));

            if self.current.is_none() && chunk.len() == 1 {
                self.current = Some(chunk[0].clone());
            } else {
                self.merge_step(chunk).await?;
                for segment in chunk {
                    let _ = remove_if_exists(segment).await;
                }
            }
            remaining = rest;
        }

        Ok(())
    }

    async fn merge_step(&mut self, chunk: &[PathBuf]) -> Result<()> {
        self.step += 1;
        let out = self.workspace.step_path(self.step);

        let mut inputs = Vec::with_capacity(chunk.len() + 1);
        inputs.extend(self.current.iter().cloned());
        inputs.extend_from_slice(chunk);

        self.engine.merge(&inputs, &out, Some(self.job)).await?;
        self.merge_calls += 1;
        debug!(step = self.step, inputs = inputs.len(), "accumulated");

        if let Some(previous) = self.current.replace(out) {
            if self.workspace.contains(&previous) {
                let _ = remove_if_exists(&previous).await;
            }
        }
        Ok(())
    }
}
