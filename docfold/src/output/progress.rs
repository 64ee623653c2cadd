//! Terminal rendering of job progress.
//!
//! # Examples
//!
//! ```
//! use docfold::job::ProgressReporter;
//! use docfold::output::progress::{ProgressBar, ProgressStyle};
//! use tokio::sync::mpsc;
//!
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! let reporter = ProgressReporter::new(Some(tx), 4);
//! reporter.merging(2, "Merging files (2/4)");
//!
//! let mut bar = ProgressBar::new(ProgressStyle::Counter);
//! let event = rx.try_recv().unwrap();
//! bar.apply(&event);
//! assert_eq!(bar.percent(), 48);
//! ```

use std::io::{self, Write};
use std::time::{Duration, Instant};

use crate::job::{ProgressEvent, ProgressPhase};

/// Style of progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStyle {
    /// Redrawn bar on a terminal: `label [=====>    ] 52% 3/6 4s`
    Bar,
    /// One line per label change, for logs and pipes.
    Counter,
}

/// Renders [`ProgressEvent`]s.
pub struct ProgressBar {
    style: ProgressStyle,
    percent: u8,
    completed: usize,
    total: usize,
    label: String,
    start_time: Instant,
    last_render: Option<Instant>,
    update_interval: Duration,
    enabled: bool,
}

impl ProgressBar {
    /// Create an enabled renderer.
    pub fn new(style: ProgressStyle) -> Self {
        Self {
            style,
            percent: 0,
            completed: 0,
            total: 0,
            label: String::new(),
            start_time: Instant::now(),
            last_render: None,
            update_interval: Duration::from_millis(100),
            enabled: true,
        }
    }

    /// Bar on a terminal, counter lines otherwise.
    pub fn auto() -> Self {
        use std::io::IsTerminal;
        let style = if io::stderr().is_terminal() {
            ProgressStyle::Bar
        } else {
            ProgressStyle::Counter
        };
        Self::new(style)
    }

    /// A renderer that tracks state but prints nothing.
    pub fn disabled() -> Self {
        let mut bar = Self::new(ProgressStyle::Counter);
        bar.enabled = false;
        bar
    }

    /// Last percent seen.
    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// Last label seen.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Record an event and redraw.
    ///
    /// Bar redraws are rate-limited except for terminal events.
    pub fn apply(&mut self, event: &ProgressEvent) {
        let label_changed = event.label != self.label;
        self.percent = event.percent;
        self.completed = event.completed;
        self.total = event.total;
        self.label.clone_from(&event.label);

        if !self.enabled {
            return;
        }

        let terminal = matches!(event.phase, ProgressPhase::Done | ProgressPhase::Canceled);
        match self.style {
            ProgressStyle::Bar => {
                let due = self
                    .last_render
                    .is_none_or(|at| at.elapsed() >= self.update_interval);
                if due || terminal {
                    self.last_render = Some(Instant::now());
                    eprint!("\r\x1b[K{}", self.render_bar());
                    if terminal {
                        eprintln!();
                    }
                    io::stderr().flush().ok();
                }
            }
            ProgressStyle::Counter => {
                if label_changed || terminal {
                    eprintln!("{}", self.render_counter());
                }
            }
        }
    }

    /// Clear the bar from the terminal.
    pub fn clear(&self) {
        if self.enabled && self.style == ProgressStyle::Bar {
            eprint!("\r\x1b[K");
            io::stderr().flush().ok();
        }
    }

    fn render_bar(&self) -> String {
        let width = 30;
        let filled = width * usize::from(self.percent.min(100)) / 100;
        let bar = format!(
            "[{}{}]",
            "=".repeat(filled.saturating_sub(1)) + if filled > 0 { ">" } else { "" },
            " ".repeat(width - filled)
        );

        format!(
            "{} {bar} {}% {}/{} {}",
            self.label,
            self.percent,
            self.completed,
            self.total,
            format_duration(self.start_time.elapsed())
        )
    }

    fn render_counter(&self) -> String {
        format!(
            "[{:>3}%] {}/{} {}",
            self.percent, self.completed, self.total, self.label
        )
    }
}

/// Format a duration as a human-readable string.
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}
