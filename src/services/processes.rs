//! Running process enumeration.
//!
//! Lists the processes that own at least one visible, titled top-level
//! window, a deliberate filter to keep the list relevant to an interactive
//! user rather than a completeness guarantee. Every OS handle opened during
//! the walk is closed before the pass returns.

use crate::error::EngineError;
use crate::models::ProcessInfo;

#[cfg(windows)]
use camino::Utf8PathBuf;
#[cfg(windows)]
use std::collections::HashMap;
#[cfg(windows)]
use windows::{
    Win32::Foundation::{BOOL, CloseHandle, HANDLE, HWND, LPARAM},
    Win32::System::ProcessStatus::GetModuleBaseNameW,
    Win32::System::Threading::{
        OpenProcess, PROCESS_NAME_FORMAT, PROCESS_QUERY_LIMITED_INFORMATION,
        QueryFullProcessImageNameW,
    },
    Win32::UI::WindowsAndMessaging::{
        EnumWindows, GetWindowTextW, GetWindowThreadProcessId, IsWindowVisible,
    },
    core::PWSTR,
};

/// Source of the live process list. The system implementation walks OS
/// windows; tests substitute fixed lists.
pub trait ProcessEnumerator: Send + Sync {
    fn list_processes(&self) -> Result<Vec<ProcessInfo>, EngineError>;
}

/// Window-walking enumerator over the host OS.
pub struct WindowEnumerator;

impl ProcessEnumerator for WindowEnumerator {
    fn list_processes(&self) -> Result<Vec<ProcessInfo>, EngineError> {
        enumerate()
    }
}

/// Shell and infrastructure executables that own windows but are never
/// profile-management targets.
const SHELL_PROCESSES: &[&str] = &[
    "explorer.exe",
    "searchhost.exe",
    "shellexperiencehost.exe",
    "startmenuexperiencehost.exe",
    "textinputhost.exe",
    "applicationframehost.exe",
    "systemsettings.exe",
    "runtimebroker.exe",
    "dwm.exe",
    "csrss.exe",
    "winlogon.exe",
    "services.exe",
    "lsass.exe",
    "svchost.exe",
];

pub(crate) fn is_shell_process(name: &str) -> bool {
    let lower = name.to_lowercase();
    SHELL_PROCESSES.iter().any(|shell| *shell == lower)
}

/// Process handle that closes itself when the walk moves on.
#[cfg(windows)]
struct OwnedHandle(HANDLE);

#[cfg(windows)]
impl Drop for OwnedHandle {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

#[cfg(windows)]
struct WindowWalk {
    seen: HashMap<u32, ProcessInfo>,
}

#[cfg(windows)]
unsafe extern "system" fn walk_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
    const CONTINUE: BOOL = BOOL(1);

    let walk = unsafe { &mut *(lparam.0 as *mut WindowWalk) };

    if !unsafe { IsWindowVisible(hwnd) }.as_bool() {
        return CONTINUE;
    }

    let mut title_buffer = [0u16; 512];
    let title_len = unsafe { GetWindowTextW(hwnd, &mut title_buffer) };
    if title_len == 0 {
        return CONTINUE;
    }
    let window_title = String::from_utf16_lossy(&title_buffer[..title_len as usize]);
    if window_title.trim().is_empty() {
        return CONTINUE;
    }

    let mut process_id: u32 = 0;
    unsafe { GetWindowThreadProcessId(hwnd, Some(&mut process_id)) };
    if process_id == 0 {
        return CONTINUE;
    }

    // One entry per process, however many windows it owns.
    if walk.seen.contains_key(&process_id) {
        return CONTINUE;
    }

    if let Some((process_name, executable_path)) = resolve_process(process_id) {
        if is_shell_process(&process_name) {
            return CONTINUE;
        }

        walk.seen.insert(
            process_id,
            ProcessInfo {
                process_id,
                process_name,
                window_title,
                executable_path,
            },
        );
    }

    CONTINUE
}

/// Resolve name and image path for a pid. Returns `None` when the process
/// cannot be opened or named at all (it is skipped, not fatal); a path the OS
/// refuses to disclose degrades to `None` for that field only.
#[cfg(windows)]
fn resolve_process(pid: u32) -> Option<(String, Option<Utf8PathBuf>)> {
    unsafe {
        let handle = OwnedHandle(OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid).ok()?);

        let mut name_buffer = [0u16; 260];
        let name_len = GetModuleBaseNameW(handle.0, None, &mut name_buffer);
        if name_len == 0 {
            return None;
        }
        let process_name = String::from_utf16_lossy(&name_buffer[..name_len as usize]);

        let mut path_buffer = [0u16; 1024];
        let mut path_len = path_buffer.len() as u32;
        let executable_path = if QueryFullProcessImageNameW(
            handle.0,
            PROCESS_NAME_FORMAT(0),
            PWSTR(path_buffer.as_mut_ptr()),
            &mut path_len,
        )
        .is_ok()
        {
            Some(Utf8PathBuf::from(String::from_utf16_lossy(
                &path_buffer[..path_len as usize],
            )))
        } else {
            tracing::debug!("image path for pid {pid} not resolvable, leaving it absent");
            None
        };

        Some((process_name, executable_path))
    }
}

/// Walk all top-level windows and return their owning processes, ordered by
/// executable name then pid.
#[cfg(windows)]
fn enumerate() -> Result<Vec<ProcessInfo>, EngineError> {
    let mut walk = WindowWalk {
        seen: HashMap::new(),
    };

    unsafe {
        EnumWindows(
            Some(walk_callback),
            LPARAM(&mut walk as *mut _ as isize),
        )
        .map_err(|e| EngineError::StoreRead(format!("window enumeration failed: {e}")))?;
    }

    let mut processes: Vec<ProcessInfo> = walk.seen.into_values().collect();
    processes.sort_by(|a, b| {
        a.process_name
            .to_lowercase()
            .cmp(&b.process_name.to_lowercase())
            .then(a.process_id.cmp(&b.process_id))
    });

    Ok(processes)
}

#[cfg(not(windows))]
fn enumerate() -> Result<Vec<ProcessInfo>, EngineError> {
    Ok(Vec::new())
}
