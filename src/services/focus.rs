//! Foreground window detection.
//!
//! Resolves the process owning the currently focused window. Called at
//! sub-second cadence, so every OS handle acquired here is released before
//! the call returns: the process handle lives in a drop guard and nothing
//! else is retained between calls.

use crate::error::EngineError;
use crate::models::FocusInfo;

#[cfg(windows)]
use windows::Win32::{
    Foundation::{CloseHandle, HANDLE, HWND},
    System::ProcessStatus::GetModuleBaseNameW,
    System::Threading::{OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION},
    UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowTextW, GetWindowThreadProcessId},
};

/// Source of the focused process. The system implementation asks the OS;
/// tests script the answer.
pub trait FocusTracker: Send + Sync {
    /// `None` when no window holds focus (desktop) or the focused window
    /// cannot be resolved to a process.
    fn current_focus(&self) -> Result<Option<FocusInfo>, EngineError>;
}

/// Foreground-window tracker over the host OS.
pub struct ForegroundTracker;

impl FocusTracker for ForegroundTracker {
    fn current_focus(&self) -> Result<Option<FocusInfo>, EngineError> {
        current_focus()
    }
}

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
fn current_focus() -> Result<Option<FocusInfo>, EngineError> {
    unsafe {
        let hwnd: HWND = GetForegroundWindow();
        if hwnd.0.is_null() {
            return Ok(None);
        }

        let mut process_id: u32 = 0;
        GetWindowThreadProcessId(hwnd, Some(&mut process_id));
        if process_id == 0 {
            return Ok(None);
        }

        let mut title_buffer = [0u16; 512];
        let title_len = GetWindowTextW(hwnd, &mut title_buffer);
        let window_title = String::from_utf16_lossy(&title_buffer[..title_len as usize]);

        let Some(process_name) = process_name(process_id) else {
            // Focused window belongs to a process we may not open; nothing to
            // reconcile against.
            return Ok(None);
        };

        Ok(Some(FocusInfo {
            process_id,
            process_name,
            window_title,
        }))
    }
}

#[cfg(not(windows))]
fn current_focus() -> Result<Option<FocusInfo>, EngineError> {
    Ok(None)
}

#[cfg(windows)]
fn process_name(pid: u32) -> Option<String> {
    unsafe {
        let handle = OwnedHandle(OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid).ok()?);

        let mut name_buffer = [0u16; 260];
        let len = GetModuleBaseNameW(handle.0, None, &mut name_buffer);
        if len > 0 {
            Some(String::from_utf16_lossy(&name_buffer[..len as usize]))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(windows))]
    #[test]
    fn test_non_windows_focus_is_none() {
        let focus = ForegroundTracker.current_focus().unwrap();
        assert!(focus.is_none());
    }
}
