//! LibreOffice-backed conversions.
//!
//! Single-source conversions run `soffice --headless --convert-to <ext>
//! --outdir <dir> <source>`. Composing several sources into one deck is
//! outside what `soffice` does from the command line, so it is delegated to
//! a configurable composer command invoked as
//! `<composer> <format> <output> <source>...`.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::debug;

use super::{BatchStrategy, OfficeConverter, batch_strategy};
use crate::config::OutputFormat;
use crate::engine::ensure_engine;
use crate::error::{DocFoldError, Result};
use crate::job::JobState;
use crate::process::{run_tool, tool_name};

/// Program name searched on `PATH`.
pub const SOFFICE_PROGRAM: &str = "soffice";

/// Converter driving a headless LibreOffice.
#[derive(Debug)]
pub struct SofficeConverter {
    explicit: Option<PathBuf>,
    resolved: OnceCell<PathBuf>,
    composer: Option<PathBuf>,
}

impl SofficeConverter {
    /// Converter using `soffice` (explicit path or `PATH`) and an optional
    /// deck composer.
    ///
    /// The binary is located and checked on first use, so merges that need no
    /// conversion never require LibreOffice.
    pub fn new(soffice: Option<PathBuf>, composer: Option<PathBuf>) -> Self {
        Self {
            explicit: soffice,
            resolved: OnceCell::new(),
            composer,
        }
    }

    async fn program(&self) -> Result<&Path> {
        let path = self
            .resolved
            .get_or_try_init(|| ensure_engine(SOFFICE_PROGRAM, self.explicit.as_deref()))
            .await?;
        Ok(path.as_path())
    }

    async fn convert_one(
        &self,
        source: &Path,
        extension: &str,
        out_dir: &Path,
        job: Option<&JobState>,
    ) -> Result<PathBuf> {
        let program = self.program().await?;
        let args = convert_args(source, extension, out_dir);
        run_tool(program, &args, job, &[0]).await?;

        let produced = expected_output(source, extension, out_dir);
        if !tokio::fs::try_exists(&produced).await.unwrap_or(false) {
            return Err(DocFoldError::tool_failed(
                tool_name(program),
                Some(0),
                format!(
                    "conversion of {} did not produce {}",
                    source.display(),
                    produced.display()
                ),
            ));
        }

        debug!(source = %source.display(), produced = %produced.display(), "converted");
        Ok(produced)
    }
}

/// Arguments for a single headless conversion.
pub fn convert_args(source: &Path, extension: &str, out_dir: &Path) -> Vec<OsString> {
    vec![
        OsString::from("--headless"),
        OsString::from("--convert-to"),
        OsString::from(extension),
        OsString::from("--outdir"),
        out_dir.as_os_str().to_owned(),
        source.as_os_str().to_owned(),
    ]
}

/// Where `soffice` writes the result: `<out_dir>/<stem>.<extension>`.
pub fn expected_output(source: &Path, extension: &str, out_dir: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "converted".to_string());
    out_dir.join(format!("{stem}.{extension}"))
}

#[async_trait]
impl OfficeConverter for SofficeConverter {
    fn name(&self) -> &str {
        SOFFICE_PROGRAM
    }

    fn can_compose(&self) -> bool {
        self.composer.is_some()
    }

    async fn legacy_deck_to_modern_deck(
        &self,
        source: &Path,
        out_dir: &Path,
        job: Option<&JobState>,
    ) -> Result<PathBuf> {
        self.convert_one(source, "pptx", out_dir, job).await
    }

    async fn image_to_single_page_document(
        &self,
        source: &Path,
        out_dir: &Path,
        job: Option<&JobState>,
    ) -> Result<PathBuf> {
        self.convert_one(source, "pdf", out_dir, job).await
    }

    async fn deck_batch_to_final_format(
        &self,
        sources: &[PathBuf],
        format: OutputFormat,
        out_dir: &Path,
        job: Option<&JobState>,
    ) -> Result<PathBuf> {
        let extension = format.extension();

        if sources.is_empty() {
            return Err(DocFoldError::NoFilesToMerge);
        }

        match batch_strategy(sources, format) {
            BatchStrategy::PassThrough => Ok(sources[0].clone()),
            BatchStrategy::ConvertOne => {
                self.convert_one(&sources[0], extension, out_dir, job).await
            }
            BatchStrategy::Compose => {
                let composer = self.composer.as_deref().ok_or_else(|| {
                    DocFoldError::engine_unavailable(
                        "deck composer",
                        "combining several decks, or any image, into one deck requires --deck-composer",
                    )
                })?;

                let output = out_dir.join(format!("composed.{extension}"));
                let mut args = vec![OsString::from(extension), output.as_os_str().to_owned()];
                args.extend(sources.iter().map(|s| s.as_os_str().to_owned()));
                run_tool(composer, &args, job, &[0]).await?;

                if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
                    return Err(DocFoldError::tool_failed(
                        tool_name(composer),
                        Some(0),
                        format!("composer did not produce {}", output.display()),
                    ));
                }
                Ok(output)
            }
        }
    }
}
