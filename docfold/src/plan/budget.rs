//! Resource budget estimation.
//!
//! Two budgets gate the single-call fast path: a memory ceiling derived from
//! the host's free and total memory, and a character estimate of the
//! external merge invocation checked against a fixed argument-length limit.

use std::ffi::OsString;
use std::path::Path;

use crate::config::MergeLimits;

/// Host memory figures at a point in time. Zero means "unknown".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemorySnapshot {
    /// Memory available to new processes, in bytes.
    pub free_bytes: u64,
    /// Physical memory, in bytes.
    pub total_bytes: u64,
}

impl MemorySnapshot {
    /// A snapshot with explicit figures.
    pub fn new(free_bytes: u64, total_bytes: u64) -> Self {
        Self {
            free_bytes,
            total_bytes,
        }
    }

    /// A snapshot where neither figure is known.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Read the current host figures.
    ///
    /// Never fails; figures that cannot be read are reported as unknown.
    pub fn host() -> Self {
        read_host_memory().unwrap_or_default()
    }
}

#[cfg(target_os = "linux")]
fn read_host_memory() -> Option<MemorySnapshot> {
    let content = std::fs::read_to_string("/proc/meminfo").ok()?;
    let mut available = None;
    let mut free = None;
    let mut total = None;

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let key = parts.next();
        let kib = parts.next().and_then(|v| v.parse::<u64>().ok());
        match (key, kib) {
            (Some("MemAvailable:"), Some(kib)) => available = Some(kib * 1024),
            (Some("MemFree:"), Some(kib)) => free = Some(kib * 1024),
            (Some("MemTotal:"), Some(kib)) => total = Some(kib * 1024),
            _ => {}
        }
    }

    Some(MemorySnapshot::new(
        available.or(free).unwrap_or(0),
        total.unwrap_or(0),
    ))
}

#[cfg(target_os = "macos")]
fn read_host_memory() -> Option<MemorySnapshot> {
    let output = std::process::Command::new("sysctl")
        .args(["-n", "hw.memsize"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let total = String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse::<u64>()
        .ok()?;
    Some(MemorySnapshot::new(0, total))
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn read_host_memory() -> Option<MemorySnapshot> {
    None
}

/// Memory ceiling for the fast path.
///
/// `clamp(min(free × free_ratio, total × total_ratio, cap), floor)`.
/// Unknown figures do not constrain the minimum. A configured override
/// replaces the computation entirely.
pub fn memory_ceiling(snapshot: MemorySnapshot, limits: &MergeLimits) -> u64 {
    if let Some(budget) = limits.memory_budget_override {
        return budget;
    }

    let scaled = |bytes: u64, ratio: f64| -> u64 {
        if bytes == 0 {
            u64::MAX
        } else {
            (bytes as f64 * ratio).floor() as u64
        }
    };

    let by_free = scaled(snapshot.free_bytes, limits.free_memory_ratio);
    let by_total = scaled(snapshot.total_bytes, limits.total_memory_ratio);
    let candidate = by_free.min(by_total).min(limits.max_fast_memory_bytes);

    candidate.max(limits.min_fast_memory_bytes)
}

/// The literal argument list of a single direct merge invocation.
pub fn merge_invocation_args<P: AsRef<Path>>(inputs: &[P], output: &Path) -> Vec<OsString> {
    let mut args = Vec::with_capacity(inputs.len() + 4);
    args.push(OsString::from("--empty"));
    args.push(OsString::from("--pages"));
    args.extend(inputs.iter().map(|p| p.as_ref().as_os_str().to_owned()));
    args.push(OsString::from("--"));
    args.push(output.as_os_str().to_owned());
    args
}

/// Character estimate of the direct merge invocation.
///
/// Each argument token contributes its length plus 3 (separator and quoting).
pub fn estimate_arg_chars<P: AsRef<Path>>(inputs: &[P], output: &Path) -> usize {
    merge_invocation_args(inputs, output)
        .iter()
        .map(|arg| arg.to_string_lossy().chars().count() + 3)
        .sum()
}
