use thiserror::Error;

use crate::event::RunEvent;
use crate::logging::EventSink;

/// Why a process's image path could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(not(windows), allow(dead_code))]
pub enum ProcessQueryError {
    #[error("access denied")]
    AccessDenied,
    /// The process exited between enumeration and inspection.
    #[error("process exited")]
    Exited,
    #[error("no image path reported")]
    Unavailable,
    #[error("{message}")]
    Os { message: String },
}

/// One entry of a process table snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRecord {
    pub pid: u32,
    pub image_path: Result<String, ProcessQueryError>,
}

/// Source of live process snapshots.
pub trait ProcessSource {
    /// Enumerates the processes running right now, in a stable order.
    fn snapshot(&mut self) -> Vec<ProcessRecord>;
}

/// Canonicalizes a Windows path for comparison: forward slashes become
/// backslashes and the whole string is lower-cased.
pub fn normalize_path(path: &str) -> String {
    path.replace('/', "\\").to_lowercase()
}

/// Returns the pids of every process whose image path equals `target` after
/// normalization, in snapshot order.
///
/// A target that matches nothing yields an empty vec. Processes whose image
/// path cannot be read are reported to `sink` and skipped.
pub fn find_processes_by_path(
    target: &str,
    source: &mut dyn ProcessSource,
    sink: &mut dyn EventSink,
) -> Vec<u32> {
    let target = normalize_path(target);

    source
        .snapshot()
        .into_iter()
        .filter_map(|record| match record.image_path {
            Ok(path) => (normalize_path(&path) == target).then_some(record.pid),
            Err(reason) => {
                sink.emit(&RunEvent::ProcessSkipped { pid: record.pid, reason });
                None
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Fixed snapshot handed out on every call.
    pub(crate) struct FakeProcesses(pub Vec<ProcessRecord>);

    impl FakeProcesses {
        pub(crate) fn with(records: &[(u32, Result<&str, ProcessQueryError>)]) -> Self {
            Self(
                records
                    .iter()
                    .map(|(pid, path)| ProcessRecord {
                        pid: *pid,
                        image_path: path.clone().map(str::to_string),
                    })
                    .collect(),
            )
        }
    }

    impl ProcessSource for FakeProcesses {
        fn snapshot(&mut self) -> Vec<ProcessRecord> {
            self.0.clone()
        }
    }

    // ── normalize_path ────────────────────────────────────────────────────────

    #[test]
    fn normalize_lowercases() {
        assert_eq!(normalize_path(r"C:\App\APP.EXE"), r"c:\app\app.exe");
    }

    #[test]
    fn normalize_unifies_separators() {
        assert_eq!(normalize_path("C:/App/app.exe"), r"c:\app\app.exe");
        assert_eq!(normalize_path(r"C:\App/sub\app.exe"), r"c:\app\sub\app.exe");
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_path(r"D:/Games\Steam/Game.EXE");
        assert_eq!(normalize_path(&once), once);
    }

    #[test]
    fn normalize_handles_non_ascii() {
        assert_eq!(normalize_path(r"C:\Ü\Ä.exe"), r"c:\ü\ä.exe");
    }

    // ── find_processes_by_path ────────────────────────────────────────────────

    #[test]
    fn matches_case_and_separator_variants() {
        let mut source = FakeProcesses::with(&[
            (10, Ok(r"c:\app\APP.EXE")),
            (11, Ok("C:/App/app.exe")),
            (12, Ok(r"C:\App\app.exe")),
        ]);
        let mut events: Vec<RunEvent> = Vec::new();
        let pids = find_processes_by_path(r"C:\App\app.exe", &mut source, &mut events);
        assert_eq!(pids, vec![10, 11, 12]);
        assert!(events.is_empty());
    }

    #[test]
    fn no_prefix_or_substring_matching() {
        let mut source = FakeProcesses::with(&[
            (1, Ok(r"C:\App\app.exe.bak")),
            (2, Ok(r"C:\App\app.ex")),
            (3, Ok(r"D:\C:\App\app.exe")),
            (4, Ok(r"C:\App\other\app.exe")),
        ]);
        let mut events: Vec<RunEvent> = Vec::new();
        let pids = find_processes_by_path(r"C:\App\app.exe", &mut source, &mut events);
        assert!(pids.is_empty());
    }

    #[test]
    fn unmatched_target_returns_empty_without_events() {
        let mut source = FakeProcesses::with(&[(1, Ok(r"C:\Windows\explorer.exe"))]);
        let mut events: Vec<RunEvent> = Vec::new();
        let pids = find_processes_by_path(r"C:\Missing\none.exe", &mut source, &mut events);
        assert!(pids.is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn empty_snapshot_returns_empty() {
        let mut source = FakeProcesses(Vec::new());
        let mut events: Vec<RunEvent> = Vec::new();
        assert!(find_processes_by_path(r"C:\a.exe", &mut source, &mut events).is_empty());
    }

    #[test]
    fn unreadable_process_is_skipped_and_reported() {
        let mut source = FakeProcesses::with(&[
            (4, Err(ProcessQueryError::AccessDenied)),
            (20, Ok(r"C:\App\app.exe")),
            (21, Err(ProcessQueryError::Os { message: "handle invalid".into() })),
            (22, Ok(r"C:\Other\other.exe")),
            (23, Ok(r"c:\app\app.exe")),
        ]);
        let mut events: Vec<RunEvent> = Vec::new();
        let pids = find_processes_by_path(r"C:\App\app.exe", &mut source, &mut events);

        assert_eq!(pids, vec![20, 23]);
        assert_eq!(
            events,
            vec![
                RunEvent::ProcessSkipped { pid: 4, reason: ProcessQueryError::AccessDenied },
                RunEvent::ProcessSkipped {
                    pid: 21,
                    reason: ProcessQueryError::Os { message: "handle invalid".into() },
                },
            ]
        );
    }
}
