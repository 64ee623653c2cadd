//! External process supervision.
//!
//! Every external tool call goes through [`run_tool`], which registers the
//! spawned child with the running job so a cancellation request can
//! terminate it, including any descendants it spawned.

use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{DocFoldError, Result};
use crate::job::JobState;

/// A running external process that can be forcibly stopped.
pub trait ProcessHandle: Send + Sync + fmt::Debug {
    /// OS process id, if the process is still known.
    fn id(&self) -> Option<u32>;

    /// Kill the process and every process it spawned.
    ///
    /// Must be safe to call more than once and after the process exited.
    fn terminate(&self);
}

/// Handle to a child started by [`run_tool`].
///
/// On Unix the child leads its own process group, so the whole group is
/// signalled. On Windows `taskkill /T` walks the tree.
#[derive(Debug, Clone, Copy)]
pub struct ChildProcessHandle {
    pid: Option<u32>,
}

impl ChildProcessHandle {
    /// Wrap a process id.
    pub fn new(pid: Option<u32>) -> Self {
        Self { pid }
    }
}

impl ProcessHandle for ChildProcessHandle {
    fn id(&self) -> Option<u32> {
        self.pid
    }

    fn terminate(&self) {
        let Some(pid) = self.pid else {
            return;
        };
        debug!(pid, "terminating process tree");
        kill_tree(pid);
    }
}

/// Start a signalling command without waiting for it.
///
/// The command is reaped on a detached thread; `terminate` must not block.
#[cfg(any(unix, windows))]
fn spawn_detached(mut command: std::process::Command, pid: u32) {
    let spawned = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    match spawned {
        Ok(mut signaller) => {
            std::thread::spawn(move || {
                let _ = signaller.wait();
            });
        }
        Err(err) => warn!(pid, error = %err, "failed to signal process tree"),
    }
}

#[cfg(unix)]
fn kill_tree(pid: u32) {
    let mut command = std::process::Command::new("kill");
    command.args(["-KILL", "--", &format!("-{pid}")]);
    spawn_detached(command, pid);
}

#[cfg(windows)]
fn kill_tree(pid: u32) {
    let mut command = std::process::Command::new("taskkill");
    command.args(["/PID", &pid.to_string(), "/T", "/F"]);
    spawn_detached(command, pid);
}

#[cfg(not(any(unix, windows)))]
fn kill_tree(_pid: u32) {}

/// Captured output of a successful tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code.
    pub code: Option<i32>,
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

/// Short name of a tool for messages and logs.
pub fn tool_name(program: &Path) -> String {
    program
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("tool")
        .to_string()
}

/// Run an external tool to completion.
///
/// When `job` is given, the child is registered as the job's active process
/// and the call returns [`DocFoldError::Cancelled`] as soon as cancellation
/// is requested, after the process tree has been killed.
///
/// # Errors
///
/// - [`DocFoldError::Cancelled`] if the job was or becomes cancelled.
/// - [`DocFoldError::EngineUnavailable`] if the program cannot be started.
/// - [`DocFoldError::ToolFailed`] if the exit code is not in `success_codes`.
pub async fn run_tool(
    program: &Path,
    args: &[OsString],
    job: Option<&JobState>,
    success_codes: &[i32],
) -> Result<ToolOutput> {
    let tool = tool_name(program);
    if let Some(job) = job {
        job.ensure_active()?;
    }

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    debug!(%tool, ?args, "spawning");
    let mut child = command.spawn().map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            DocFoldError::engine_unavailable(&tool, err.to_string())
        } else {
            DocFoldError::engine_unavailable(&tool, format!("failed to start: {err}"))
        }
    })?;

    let handle: Arc<dyn ProcessHandle> = Arc::new(ChildProcessHandle::new(child.id()));
    let _registration = job.map(|job| job.register_process(Arc::clone(&handle)));

    let stdout = collect(child.stdout.take());
    let stderr = collect(child.stderr.take());

    let status = match job {
        Some(job) => {
            let outcome = tokio::select! {
                status = child.wait() => Some(status),
                _ = job.cancelled() => None,
            };
            match outcome {
                Some(status) => status?,
                None => {
                    handle.terminate();
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    debug!(%tool, "terminated after cancellation");
                    return Err(DocFoldError::Cancelled);
                }
            }
        }
        None => child.wait().await?,
    };

    let stdout = String::from_utf8_lossy(&stdout.await?).into_owned();
    let stderr = String::from_utf8_lossy(&stderr.await?).into_owned();
    let code = status.code();

    match code {
        Some(code) if success_codes.contains(&code) => {
            debug!(%tool, code, "finished");
            Ok(ToolOutput {
                code: Some(code),
                stdout,
                stderr,
            })
        }
        _ => {
            let diagnostics = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            warn!(%tool, ?code, "tool exited with failure");
            Err(DocFoldError::tool_failed(tool, code, diagnostics))
        }
    }
}

fn collect<R>(stream: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            let _ = stream.read_to_end(&mut buf).await;
        }
        buf
    })
}
