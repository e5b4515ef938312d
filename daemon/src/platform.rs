/// OS bindings for the process table and the desktop's window set.
///
/// The process list comes from `sysinfo` on every platform. On Windows each
/// image path is then resolved with `QueryFullProcessImageNameW` so that
/// access-denied and exited processes can be told apart, and windows are
/// driven through the Win32 window manager API.
///
/// On non-Windows platforms the window set is always empty, so every matched
/// process reports "no window found".
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

use crate::process_matcher::{ProcessQueryError, ProcessRecord, ProcessSource};
use crate::window_minimizer::{ShowState, WindowHandle, WindowQueryError, WindowSystem};

// ── Process table ─────────────────────────────────────────────────────────────

/// Live process table, re-read on every [`ProcessSource::snapshot`] call.
pub struct SystemProcesses {
    sys: System,
}

impl SystemProcesses {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }
}

impl ProcessSource for SystemProcesses {
    fn snapshot(&mut self) -> Vec<ProcessRecord> {
        self.sys
            .refresh_processes_specifics(ProcessesToUpdate::All, true, refresh_kind());

        let mut records: Vec<ProcessRecord> = self
            .sys
            .processes()
            .iter()
            .map(|(pid, process)| ProcessRecord {
                pid: pid.as_u32(),
                image_path: image_path(pid.as_u32(), process),
            })
            .collect();

        // sysinfo hands processes out in hash order.
        records.sort_unstable_by_key(|r| r.pid);
        records
    }
}

/// Image paths are read through Win32 on Windows, so sysinfo only lists pids.
#[cfg(windows)]
fn refresh_kind() -> ProcessRefreshKind {
    ProcessRefreshKind::new()
}

#[cfg(not(windows))]
fn refresh_kind() -> ProcessRefreshKind {
    ProcessRefreshKind::new().with_exe(sysinfo::UpdateKind::OnlyIfNotSet)
}

#[cfg(windows)]
fn image_path(pid: u32, _process: &sysinfo::Process) -> Result<String, ProcessQueryError> {
    imp::query_image_path(pid)
}

#[cfg(not(windows))]
fn image_path(_pid: u32, process: &sysinfo::Process) -> Result<String, ProcessQueryError> {
    process
        .exe()
        .map(|p| p.to_string_lossy().into_owned())
        .ok_or(ProcessQueryError::Unavailable)
}

// ── Window set ────────────────────────────────────────────────────────────────

/// The current desktop's top-level windows.
pub struct DesktopWindows;

#[cfg(windows)]
impl WindowSystem for DesktopWindows {
    fn top_level_windows(&self) -> Vec<WindowHandle> {
        imp::enum_top_level_windows()
    }

    fn owner_pid(&self, window: WindowHandle) -> Result<u32, WindowQueryError> {
        imp::owner_pid(window)
    }

    fn show_state(&self, window: WindowHandle) -> Result<ShowState, WindowQueryError> {
        imp::show_state(window)
    }

    fn minimize(&mut self, window: WindowHandle) {
        imp::minimize(window)
    }
}

#[cfg(not(windows))]
impl WindowSystem for DesktopWindows {
    fn top_level_windows(&self) -> Vec<WindowHandle> {
        Vec::new()
    }

    fn owner_pid(&self, _window: WindowHandle) -> Result<u32, WindowQueryError> {
        Err(WindowQueryError::Destroyed)
    }

    fn show_state(&self, _window: WindowHandle) -> Result<ShowState, WindowQueryError> {
        Err(WindowQueryError::Destroyed)
    }

    fn minimize(&mut self, _window: WindowHandle) {}
}

/// Maps a raw `WINDOWPLACEMENT::showCmd` value.
#[cfg(any(windows, test))]
pub fn show_state_from_cmd(cmd: u32) -> ShowState {
    match cmd {
        SW_SHOWNORMAL => ShowState::Normal,
        SW_SHOWMINIMIZED => ShowState::Minimized,
        SW_SHOWMAXIMIZED => ShowState::Maximized,
        other => ShowState::Other(other),
    }
}

// Values of the Win32 SW_* show commands reported by GetWindowPlacement.
#[cfg(any(windows, test))]
const SW_SHOWNORMAL: u32 = 1;
#[cfg(any(windows, test))]
const SW_SHOWMINIMIZED: u32 = 2;
#[cfg(any(windows, test))]
const SW_SHOWMAXIMIZED: u32 = 3;

// ── Windows implementation ────────────────────────────────────────────────────

#[cfg(windows)]
mod imp {
    use windows::core::PWSTR;
    use windows::Win32::Foundation::{
        CloseHandle, GetLastError, BOOL, ERROR_ACCESS_DENIED, ERROR_INVALID_PARAMETER,
        ERROR_INVALID_WINDOW_HANDLE, HWND, LPARAM,
    };
    use windows::Win32::System::Threading::{
        OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
        PROCESS_QUERY_LIMITED_INFORMATION,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        EnumWindows, GetWindowPlacement, GetWindowThreadProcessId, ShowWindow, SW_MINIMIZE,
        WINDOWPLACEMENT,
    };

    use super::show_state_from_cmd;
    use crate::process_matcher::ProcessQueryError;
    use crate::window_minimizer::{ShowState, WindowHandle, WindowQueryError};

    /// Resolves the full Win32 image path of `pid`.
    pub fn query_image_path(pid: u32) -> Result<String, ProcessQueryError> {
        // The System Idle Process has no image.
        if pid == 0 {
            return Err(ProcessQueryError::Unavailable);
        }

        unsafe {
            let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid)
                .map_err(process_error)?;

            let mut buf: Vec<u16> = vec![0; 4096];
            let mut size: u32 = buf.len() as u32;
            let result = QueryFullProcessImageNameW(
                handle,
                PROCESS_NAME_WIN32,
                PWSTR(buf.as_mut_ptr()),
                &mut size,
            );
            let _ = CloseHandle(handle);

            result.map_err(process_error)?;
            if size == 0 {
                return Err(ProcessQueryError::Unavailable);
            }
            Ok(String::from_utf16_lossy(&buf[..size as usize]))
        }
    }

    fn process_error(e: windows::core::Error) -> ProcessQueryError {
        if e.code() == ERROR_ACCESS_DENIED.to_hresult() {
            ProcessQueryError::AccessDenied
        } else if e.code() == ERROR_INVALID_PARAMETER.to_hresult() {
            // OpenProcess on a pid that no longer exists.
            ProcessQueryError::Exited
        } else {
            ProcessQueryError::Os { message: e.message().to_string() }
        }
    }

    /// Collects every top-level window handle into a `Vec`.
    pub fn enum_top_level_windows() -> Vec<WindowHandle> {
        unsafe extern "system" fn enum_proc(hwnd: HWND, lparam: LPARAM) -> BOOL {
            // Safety: `enum_top_level_windows` passes a live `Vec` via LPARAM.
            let handles = &mut *(lparam.0 as *mut Vec<WindowHandle>);
            handles.push(WindowHandle(hwnd.0));
            BOOL(1)
        }

        let mut handles: Vec<WindowHandle> = Vec::new();
        unsafe {
            let _ = EnumWindows(Some(enum_proc), LPARAM(&mut handles as *mut _ as isize));
        }
        handles
    }

    pub fn owner_pid(window: WindowHandle) -> Result<u32, WindowQueryError> {
        let mut pid: u32 = 0;
        let thread_id =
            unsafe { GetWindowThreadProcessId(HWND(window.0), Some(&mut pid as *mut u32)) };
        if thread_id == 0 {
            let err = unsafe { GetLastError() };
            if err == ERROR_INVALID_WINDOW_HANDLE {
                return Err(WindowQueryError::Destroyed);
            }
            return Err(WindowQueryError::Os {
                operation: "GetWindowThreadProcessId",
                message: windows::core::Error::from(err.to_hresult()).message().to_string(),
            });
        }
        Ok(pid)
    }

    pub fn show_state(window: WindowHandle) -> Result<ShowState, WindowQueryError> {
        let mut placement = WINDOWPLACEMENT {
            length: std::mem::size_of::<WINDOWPLACEMENT>() as u32,
            ..Default::default()
        };
        unsafe { GetWindowPlacement(HWND(window.0), &mut placement) }.map_err(|e| {
            if e.code() == ERROR_INVALID_WINDOW_HANDLE.to_hresult() {
                WindowQueryError::Destroyed
            } else {
                WindowQueryError::Os {
                    operation: "GetWindowPlacement",
                    message: e.message().to_string(),
                }
            }
        })?;
        Ok(show_state_from_cmd(placement.showCmd))
    }

    pub fn minimize(window: WindowHandle) {
        // The return value is the previous visibility, not a success flag.
        unsafe {
            let _ = ShowWindow(HWND(window.0), SW_MINIMIZE);
        }
    }
}
