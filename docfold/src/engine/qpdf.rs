//! qpdf-backed document engine.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::{DocumentEngine, PageSpan};
use crate::error::{DocFoldError, Result};
use crate::job::JobState;
use crate::plan::merge_invocation_args;
use crate::process::run_tool;

/// Program name searched on `PATH`.
pub const QPDF_PROGRAM: &str = "qpdf";

/// Exit codes qpdf uses for success; 3 means "succeeded with warnings".
pub const QPDF_SUCCESS_CODES: &[i32] = &[0, 3];

/// Engine delegating to the qpdf command line tool.
#[derive(Debug, Clone)]
pub struct QpdfEngine {
    program: PathBuf,
}

impl QpdfEngine {
    /// Engine invoking the binary at `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Path of the invoked binary.
    pub fn program(&self) -> &Path {
        &self.program
    }
}

/// Arguments writing `span` of `source` to `out`.
pub fn extract_range_args(source: &Path, span: PageSpan, out: &Path) -> Vec<OsString> {
    vec![
        OsString::from("--empty"),
        OsString::from("--pages"),
        source.as_os_str().to_owned(),
        OsString::from(span.to_string()),
        OsString::from("--"),
        out.as_os_str().to_owned(),
    ]
}

fn parse_page_count(stdout: &str, path: &Path) -> Result<u32> {
    match stdout.trim().parse::<u32>() {
        Ok(count) if count > 0 => Ok(count),
        _ => Err(DocFoldError::tool_failed(
            QPDF_PROGRAM,
            Some(0),
            format!(
                "Unable to determine page count for {}",
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string())
            ),
        )),
    }
}

#[async_trait]
impl DocumentEngine for QpdfEngine {
    fn name(&self) -> &str {
        QPDF_PROGRAM
    }

    async fn page_count(&self, path: &Path, job: Option<&JobState>) -> Result<u32> {
        let args = [OsString::from("--show-npages"), path.as_os_str().to_owned()];
        let output = run_tool(&self.program, &args, job, QPDF_SUCCESS_CODES).await?;
        parse_page_count(&output.stdout, path)
    }

    async fn extract_range(
        &self,
        source: &Path,
        span: PageSpan,
        out: &Path,
        job: Option<&JobState>,
    ) -> Result<()> {
        let args = extract_range_args(source, span, out);
        run_tool(&self.program, &args, job, QPDF_SUCCESS_CODES).await?;
        Ok(())
    }

    async fn merge(&self, inputs: &[PathBuf], out: &Path, job: Option<&JobState>) -> Result<()> {
        if inputs.is_empty() {
            return Err(DocFoldError::other("No input files for merge call"));
        }
        let args = merge_invocation_args(inputs, out);
        run_tool(&self.program, &args, job, QPDF_SUCCESS_CODES).await?;
        Ok(())
    }
}
