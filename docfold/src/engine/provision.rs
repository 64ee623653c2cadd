//! Locating and checking external tools before a job starts.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{DocFoldError, Result};
use crate::process::run_tool;

/// Resolve the invocable path of an external tool and check it runs.
///
/// An explicit path must point at an existing file; otherwise `name` is
/// searched on `PATH`. The resolved binary is checked with `--version`.
///
/// # Errors
///
/// Returns [`DocFoldError::EngineUnavailable`] if the tool cannot be found or
/// the check fails.
pub async fn ensure_engine(name: &str, explicit: Option<&Path>) -> Result<PathBuf> {
    let program = match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(DocFoldError::engine_unavailable(
                    name,
                    format!("{} does not exist", path.display()),
                ));
            }
            path.to_path_buf()
        }
        None => {
            let path_var = std::env::var_os("PATH").unwrap_or_default();
            find_in_path(name, &path_var).ok_or_else(|| {
                DocFoldError::engine_unavailable(name, "not found on PATH")
            })?
        }
    };

    debug!(tool = name, path = %program.display(), "checking version");
    let version = run_tool(&program, &[OsString::from("--version")], None, &[0]).await;
    match version {
        Ok(output) => {
            let version = output.stdout.lines().next().unwrap_or_default().trim();
            info!(tool = name, path = %program.display(), version, "tool ready");
            Ok(program)
        }
        Err(DocFoldError::EngineUnavailable { reason, .. }) => {
            Err(DocFoldError::engine_unavailable(name, reason))
        }
        Err(err) => Err(DocFoldError::engine_unavailable(
            name,
            format!("version check failed: {err}"),
        )),
    }
}

/// Search the directories of a `PATH`-style value for an executable file.
pub fn find_in_path(name: &str, path_var: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(path_var)
        .flat_map(|dir| candidate_names(name).into_iter().map(move |n| dir.join(n)))
        .find(|candidate| candidate.is_file())
}

#[cfg(windows)]
fn candidate_names(name: &str) -> Vec<String> {
    if Path::new(name).extension().is_some() {
        vec![name.to_string()]
    } else {
        vec![format!("{name}.exe"), format!("{name}.cmd"), name.to_string()]
    }
}

#[cfg(not(windows))]
fn candidate_names(name: &str) -> Vec<String> {
    vec![name.to_string()]
}
