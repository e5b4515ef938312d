/// Logging collaborator for a minimizer run.
///
/// The core hands [`RunEvent`]s to an [`EventSink`]. [`TracingSink`] renders
/// them through its own `tracing` dispatcher to stdout and to an append-mode
/// log file; it is built explicitly in `main` and never installed as the
/// process-wide default subscriber.
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing::Dispatch;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;

use crate::event::{RunEvent, Severity};

/// Receives semantic events from the core.
pub trait EventSink {
    fn emit(&mut self, event: &RunEvent);
}

/// Collects events in memory.
impl EventSink for Vec<RunEvent> {
    fn emit(&mut self, event: &RunEvent) {
        self.push(event.clone());
    }
}

/// Local wall-clock timestamps for the log file, e.g. `2024-05-01 09:30:00.123`.
struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// [`EventSink`] backed by a private `tracing` dispatcher.
pub struct TracingSink {
    dispatch: Dispatch,
}

impl TracingSink {
    /// Builds a sink writing to stdout and appending to `log_file`.
    ///
    /// With `debug = false` only INFO and above are kept, which hides
    /// [`Severity::Verbose`] events.
    pub fn new(debug: bool, log_file: &Path) -> Result<Self> {
        if let Some(parent) = log_file.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .with_context(|| format!("Failed to open log file: {}", log_file.display()))?;

        Ok(Self { dispatch: build_dispatch(level_for(debug), file) })
    }
}

impl EventSink for TracingSink {
    fn emit(&mut self, event: &RunEvent) {
        tracing::dispatcher::with_default(&self.dispatch, || {
            let kind = event.kind();
            match event.severity() {
                Severity::Info => tracing::info!(event = kind, "{event}"),
                Severity::Diagnostic => tracing::warn!(event = kind, "{event}"),
                Severity::Verbose => tracing::debug!(event = kind, "{event}"),
            }
        });
    }
}

fn level_for(debug: bool) -> LevelFilter {
    if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    }
}

fn build_dispatch(level: LevelFilter, file: File) -> Dispatch {
    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .without_time()
        .with_filter(level);

    let log_file = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_timer(LocalTime)
        .with_filter(level);

    Dispatch::new(tracing_subscriber::registry().with(console).with(log_file))
}
