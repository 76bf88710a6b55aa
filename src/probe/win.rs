use anyhow::Result;
use tracing::error;
use windows::{
    core::PWSTR,
    Win32::{
        Foundation::{CloseHandle, BOOL},
        System::Threading::{
            OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
            PROCESS_QUERY_LIMITED_INFORMATION,
        },
        UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowTextW, GetWindowThreadProcessId},
    },
};

use super::{FocusProbe, FocusSnapshot};

#[tracing::instrument]
fn get_foreground_snapshot() -> Result<Option<FocusSnapshot>> {
    let window = unsafe { GetForegroundWindow() };

    if window.is_invalid() {
        // No window is focused, for example during a desktop switch.
        return Ok(None);
    }

    let mut text: [u16; 4096] = [0; 4096];
    let len = unsafe { GetWindowTextW(window, &mut text) };
    let title = (len > 0).then(|| String::from_utf16_lossy(&text[..len as usize]));

    let mut pid = 0u32;
    unsafe { GetWindowThreadProcessId(window, Some(&mut pid)) };
    let owner_name = if pid != 0 {
        match unsafe { get_process_image_name(pid, &mut text) } {
            Ok(path) => process_base_name(&path),
            Err(e) => {
                error!("Failed to resolve owning process name {e:?}");
                None
            }
        }
    } else {
        None
    };

    Ok(Some(FocusSnapshot {
        title: title.map(Into::into),
        owner_name: owner_name.map(Into::into),
    }))
}

unsafe fn get_process_image_name(pid: u32, text: &mut [u16]) -> Result<String> {
    let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, BOOL::from(false), pid)?;
    let mut length = text.len() as u32;
    let result = QueryFullProcessImageNameW(
        handle,
        PROCESS_NAME_WIN32,
        PWSTR(text.as_mut_ptr()),
        &mut length,
    );
    CloseHandle(handle).inspect_err(|e| error!("Failed to close process handle {e:?}"))?;
    result?;
    Ok(String::from_utf16_lossy(&text[..length as usize]))
}

fn process_base_name(path: &str) -> Option<String> {
    path.rsplit(['\\', '/'])
        .next()
        .map(|name| name.trim_end_matches(".exe").to_string())
}

pub struct WindowsFocusProbe {}

impl WindowsFocusProbe {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for WindowsFocusProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusProbe for WindowsFocusProbe {
    fn poll(&mut self) -> Result<Option<FocusSnapshot>> {
        get_foreground_snapshot().inspect_err(|e| error!("Failed to get foreground window {e:?}"))
    }
}
