use std::fmt;

use thiserror::Error;

use crate::event::RunEvent;
use crate::logging::EventSink;

/// Opaque identifier of a top-level window (the raw `HWND` value on Windows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Display mode of a window at the moment it was inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(windows), allow(dead_code))]
pub enum ShowState {
    Normal,
    Minimized,
    Maximized,
    /// Any other raw show command reported by the OS.
    Other(u32),
}

impl fmt::Display for ShowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShowState::Normal => f.write_str("normal"),
            ShowState::Minimized => f.write_str("minimized"),
            ShowState::Maximized => f.write_str("maximized"),
            ShowState::Other(cmd) => write!(f, "show command {cmd}"),
        }
    }
}

/// Why a single window could not be inspected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(not(windows), allow(dead_code))]
pub enum WindowQueryError {
    /// The window was destroyed after enumeration.
    #[error("window no longer exists")]
    Destroyed,
    #[error("{operation} failed: {message}")]
    Os { operation: &'static str, message: String },
}

/// The desktop's set of top-level windows.
pub trait WindowSystem {
    /// Snapshot of every top-level window present right now.
    fn top_level_windows(&self) -> Vec<WindowHandle>;
    fn owner_pid(&self, window: WindowHandle) -> Result<u32, WindowQueryError>;
    fn show_state(&self, window: WindowHandle) -> Result<ShowState, WindowQueryError>;
    /// Requests minimization. The OS completes it asynchronously; callers do
    /// not wait for or verify the transition.
    fn minimize(&mut self, window: WindowHandle);
}

/// What happened to one window during a pass.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowAction {
    Minimized { previous: ShowState },
    AlreadyMinimized,
    Skipped(WindowQueryError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowOutcome {
    pub window: WindowHandle,
    pub action: WindowAction,
}

/// Result of [`minimize_windows_of_process`] for one pid.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimizeReport {
    pub pid: u32,
    /// At least one top-level window owned by `pid` was seen.
    pub window_found: bool,
    /// One entry per window owned by `pid`. Windows whose owner could not be
    /// resolved belong to no known pid and are only reported as events.
    pub outcomes: Vec<WindowOutcome>,
}

impl MinimizeReport {
    fn new(pid: u32) -> Self {
        Self { pid, window_found: false, outcomes: Vec::new() }
    }

    pub fn minimized(&self) -> usize {
        self.count(|a| matches!(a, WindowAction::Minimized { .. }))
    }

    pub fn already_minimized(&self) -> usize {
        self.count(|a| matches!(a, WindowAction::AlreadyMinimized))
    }

    pub fn skipped(&self) -> usize {
        self.count(|a| matches!(a, WindowAction::Skipped(_)))
    }

    fn count(&self, pred: impl Fn(&WindowAction) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.action)).count()
    }
}

/// Minimizes every top-level window owned by `pid` that is not already
/// minimized.
///
/// The window set is read once and folded into a [`MinimizeReport`]. Windows
/// whose owner or show-state cannot be read are skipped and reported; they
/// never stop the pass. A window with an unknown owner is reported without a
/// pid and is not counted among `pid`'s outcomes. Calling this again with no
/// outside change only produces [`WindowAction::AlreadyMinimized`] outcomes.
pub fn minimize_windows_of_process(
    pid: u32,
    windows: &mut dyn WindowSystem,
    sink: &mut dyn EventSink,
) -> MinimizeReport {
    let snapshot = windows.top_level_windows();

    let report = snapshot.into_iter().fold(MinimizeReport::new(pid), |mut report, window| {
        let action = match windows.owner_pid(window) {
            Ok(owner) if owner != pid => return report,
            Ok(_) => {
                report.window_found = true;
                inspect_and_minimize(pid, window, windows, sink)
            }
            Err(reason) => {
                sink.emit(&RunEvent::WindowOwnerUnknown { window, reason });
                return report;
            }
        };

        if let WindowAction::Skipped(reason) = &action {
            sink.emit(&RunEvent::WindowSkipped { pid, window, reason: reason.clone() });
        }
        report.outcomes.push(WindowOutcome { window, action });
        report
    });

    if !report.window_found {
        sink.emit(&RunEvent::NoWindowFound { pid });
    }
    report
}

fn inspect_and_minimize(
    pid: u32,
    window: WindowHandle,
    windows: &mut dyn WindowSystem,
    sink: &mut dyn EventSink,
) -> WindowAction {
    let state = match windows.show_state(window) {
        Ok(state) => state,
        Err(reason) => return WindowAction::Skipped(reason),
    };
    sink.emit(&RunEvent::WindowInspected { pid, window, state });

    if state == ShowState::Minimized {
        sink.emit(&RunEvent::AlreadyMinimized { pid, window });
        return WindowAction::AlreadyMinimized;
    }

    windows.minimize(window);
    sink.emit(&RunEvent::WindowMinimized { pid, window });
    WindowAction::Minimized { previous: state }
}
