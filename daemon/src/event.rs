use std::fmt;

use crate::config::Config;
use crate::process_matcher::ProcessQueryError;
use crate::run::RunSummary;
use crate::window_minimizer::{ShowState, WindowHandle, WindowQueryError};

/// How loudly an event should be reported by a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Progress and outcomes of a pass. Always reported.
    Info,
    /// A single process or window could not be handled and was skipped.
    Diagnostic,
    /// Expected noise (protected system processes, per-window state reads).
    /// Only reported when `debug = true`.
    Verbose,
}

/// Semantic events produced while minimizing windows.
///
/// The core never formats or writes these itself; they are handed to an
/// [`EventSink`](crate::logging::EventSink).
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    RunStarted { targets: usize },
    CheckingTarget { target: String },
    /// No running process has an image path matching the target.
    NoProcessFound { target: String },
    /// A process was left out of matching because its image path was unreadable.
    ProcessSkipped { pid: u32, reason: ProcessQueryError },
    ProcessingPid { pid: u32 },
    /// The window's show-state was read before deciding what to do with it.
    WindowInspected { pid: u32, window: WindowHandle, state: ShowState },
    WindowMinimized { pid: u32, window: WindowHandle },
    AlreadyMinimized { pid: u32, window: WindowHandle },
    WindowSkipped { pid: u32, window: WindowHandle, reason: WindowQueryError },
    /// The owning process of a window could not be resolved, so it could not
    /// be attributed to any pid.
    WindowOwnerUnknown { window: WindowHandle, reason: WindowQueryError },
    /// The process owns no top-level window (e.g. a console or background process).
    NoWindowFound { pid: u32 },
    RunFinished { summary: RunSummary },
}

impl RunEvent {
    pub fn severity(&self) -> Severity {
        match self {
            RunEvent::ProcessSkipped { reason, .. } => match reason {
                ProcessQueryError::Os { .. } => Severity::Diagnostic,
                ProcessQueryError::AccessDenied
                | ProcessQueryError::Exited
                | ProcessQueryError::Unavailable => Severity::Verbose,
            },
            RunEvent::WindowSkipped { .. } | RunEvent::WindowOwnerUnknown { .. } => {
                Severity::Diagnostic
            }
            RunEvent::WindowInspected { .. } => Severity::Verbose,
            _ => Severity::Info,
        }
    }

    /// Stable identifier attached to every log line as the `event` field.
    pub fn kind(&self) -> &'static str {
        match self {
            RunEvent::RunStarted { .. } => "run_started",
            RunEvent::CheckingTarget { .. } => "checking_target",
            RunEvent::NoProcessFound { .. } => "no_process_found",
            RunEvent::ProcessSkipped { .. } => "process_skipped",
            RunEvent::ProcessingPid { .. } => "processing_pid",
            RunEvent::WindowInspected { .. } => "window_inspected",
            RunEvent::WindowMinimized { .. } => "window_minimized",
            RunEvent::AlreadyMinimized { .. } => "already_minimized",
            RunEvent::WindowSkipped { .. } => "window_skipped",
            RunEvent::WindowOwnerUnknown { .. } => "window_owner_unknown",
            RunEvent::NoWindowFound { .. } => "no_window_found",
            RunEvent::RunFinished { .. } => "run_finished",
        }
    }
}

impl fmt::Display for RunEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunEvent::RunStarted { targets } => write!(f, "=== Run started ({targets} targets) ==="),
            RunEvent::CheckingTarget { target } => write!(f, "Checking: {target}"),
            RunEvent::NoProcessFound { target } => write!(f, "  -> No process found for {target}"),
            RunEvent::ProcessSkipped { pid, reason } => {
                write!(f, "  -> Skipped PID {pid}: {reason}")
            }
            RunEvent::ProcessingPid { pid } => write!(f, "  -> Processing PID {pid}"),
            RunEvent::WindowInspected { window, state, .. } => {
                write!(f, "    -> Window {window} is {state}")
            }
            RunEvent::WindowMinimized { window, .. } => write!(f, "    -> Minimized: {window}"),
            RunEvent::AlreadyMinimized { window, .. } => {
                write!(f, "    -> Already minimized: {window}")
            }
            RunEvent::WindowSkipped { window, reason, .. } => {
                write!(f, "    -> Skipped window {window}: {reason}")
            }
            RunEvent::WindowOwnerUnknown { window, reason } => {
                write!(f, "    -> Owner of window {window} unknown: {reason}")
            }
            RunEvent::NoWindowFound { pid } => write!(f, "    -> No window found for PID {pid}"),
            RunEvent::RunFinished { summary } => write!(f, "=== Run finished: {summary} ==="),
        }
    }
}

/// Messages delivered to the repeat-mode loop between passes.
pub enum ControlEvent {
    /// The config file changed on disk and was successfully re-parsed.
    ConfigReloaded(Config),
    /// Ctrl+C received; stop after the current pass.
    Shutdown,
}
