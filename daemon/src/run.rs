use std::fmt;

use crate::event::RunEvent;
use crate::logging::EventSink;
use crate::process_matcher::{find_processes_by_path, ProcessSource};
use crate::window_minimizer::{minimize_windows_of_process, WindowSystem};

/// Counters for one pass over all targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub targets_checked: usize,
    pub targets_without_process: usize,
    pub processes_matched: usize,
    pub processes_without_window: usize,
    pub windows_minimized: usize,
    pub windows_already_minimized: usize,
    pub windows_skipped: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} targets ({} without process), {} processes ({} without window), \
             {} minimized, {} already minimized, {} skipped",
            self.targets_checked,
            self.targets_without_process,
            self.processes_matched,
            self.processes_without_window,
            self.windows_minimized,
            self.windows_already_minimized,
            self.windows_skipped,
        )
    }
}

/// Runs one pass: every target is resolved to pids and every window of every
/// matched pid is minimized. Never fails; per-item problems end up in `sink`.
pub fn run_pass(
    targets: &[String],
    processes: &mut dyn ProcessSource,
    windows: &mut dyn WindowSystem,
    sink: &mut dyn EventSink,
) -> RunSummary {
    let mut summary = RunSummary::default();
    sink.emit(&RunEvent::RunStarted { targets: targets.len() });

    for target in targets {
        summary.targets_checked += 1;
        sink.emit(&RunEvent::CheckingTarget { target: target.clone() });

        let pids = find_processes_by_path(target, processes, sink);
        if pids.is_empty() {
            summary.targets_without_process += 1;
            sink.emit(&RunEvent::NoProcessFound { target: target.clone() });
            continue;
        }

        for pid in pids {
            summary.processes_matched += 1;
            sink.emit(&RunEvent::ProcessingPid { pid });

            let report = minimize_windows_of_process(pid, windows, sink);
            if !report.window_found {
                summary.processes_without_window += 1;
            }
            summary.windows_minimized += report.minimized();
            summary.windows_already_minimized += report.already_minimized();
            summary.windows_skipped += report.skipped();
        }
    }

    sink.emit(&RunEvent::RunFinished { summary: summary.clone() });
    summary
}
