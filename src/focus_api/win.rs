use anyhow::{Result, anyhow};
use tracing::error;
use windows::Win32::{
    System::{Console::GetConsoleWindow, SystemInformation::GetTickCount64},
    UI::{
        Input::KeyboardAndMouse::{GetLastInputInfo, LASTINPUTINFO},
        WindowsAndMessaging::GetForegroundWindow,
    },
};

use super::{FocusMonitor, FocusSample};

/// The console hosting this process counts as focused when it is the
/// foreground window. Processes detached from any console count as focused.
pub fn is_console_focused() -> Result<bool> {
    let console = unsafe { GetConsoleWindow() };
    if console.is_invalid() {
        return Ok(true);
    }

    let foreground = unsafe { GetForegroundWindow() };
    if foreground.is_invalid() {
        return Err(anyhow!("Failed to get foreground window"));
    }

    Ok(foreground == console)
}

pub fn get_idle_time() -> Result<u32> {
    let mut last: LASTINPUTINFO = LASTINPUTINFO {
        cbSize: size_of::<LASTINPUTINFO>() as u32,
        dwTime: 0,
    };
    let is_success = unsafe { GetLastInputInfo(&mut last) };
    if !is_success.as_bool() {
        error!("Failed to retrieve user idle time");
        return Err(anyhow!("Failed to retrieve user idle time"));
    }

    let tick_count = unsafe { GetTickCount64() };
    let duration = tick_count - last.dwTime as u64;
    if duration > u32::MAX as u64 {
        Ok(u32::MAX)
    } else {
        Ok(duration as u32)
    }
}

pub struct WindowsFocusMonitor {}

impl WindowsFocusMonitor {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for WindowsFocusMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusMonitor for WindowsFocusMonitor {
    fn sample(&mut self) -> Result<FocusSample> {
        let focused =
            is_console_focused().inspect_err(|e| error!("Failed to get foreground window {e:?}"))?;
        let idle_ms = get_idle_time().inspect_err(|e| error!("Failed to get idle time {e:?}"))?;
        Ok(FocusSample { focused, idle_ms })
    }
}
