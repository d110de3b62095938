//! Window capture-exclusion and click-through flags
//!
//! All calls are best-effort: a failure means the window keeps taking
//! input or stays visible to capture, never that the app stops.

use crate::PlatformResult;

/// Window handle crossing crate boundaries as a raw integer
pub type RawWindow = isize;

/// Let pointer input fall through to whatever is underneath
#[cfg(windows)]
pub fn set_click_through(window: RawWindow) -> PlatformResult<()> {
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::WindowsAndMessaging::{
        GetWindowLongW, SetWindowLongW, GWL_EXSTYLE, WS_EX_COMPOSITED, WS_EX_LAYERED,
        WS_EX_TOOLWINDOW, WS_EX_TRANSPARENT,
    };

    let hwnd = HWND(window as *mut _);
    unsafe {
        let ex_style = GetWindowLongW(hwnd, GWL_EXSTYLE) as u32
            | WS_EX_LAYERED.0
            | WS_EX_TRANSPARENT.0
            | WS_EX_TOOLWINDOW.0
            | WS_EX_COMPOSITED.0;
        SetWindowLongW(hwnd, GWL_EXSTYLE, ex_style as i32);
    }
    Ok(())
}

#[cfg(not(windows))]
pub fn set_click_through(_window: RawWindow) -> PlatformResult<()> {
    Ok(())
}

/// Exclude a window from (or restore it into) screen capture.
///
/// When the strict exclude mode is rejected, falls back to the weaker
/// per-monitor affinity, which still hides the window from most
/// capture paths.
#[cfg(windows)]
pub fn set_display_affinity(window: RawWindow, exclude: bool) -> PlatformResult<()> {
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::WindowsAndMessaging::{
        SetWindowDisplayAffinity, WDA_EXCLUDEFROMCAPTURE, WDA_MONITOR, WDA_NONE,
    };

    let hwnd = HWND(window as *mut _);
    let affinity = if exclude { WDA_EXCLUDEFROMCAPTURE } else { WDA_NONE };
    unsafe {
        if let Err(err) = SetWindowDisplayAffinity(hwnd, affinity) {
            if !exclude {
                return Err(err.into());
            }
            log::debug!("exclude-from-capture affinity rejected ({err}), trying monitor affinity");
            SetWindowDisplayAffinity(hwnd, WDA_MONITOR)?;
        }
    }
    Ok(())
}

#[cfg(not(windows))]
pub fn set_display_affinity(_window: RawWindow, _exclude: bool) -> PlatformResult<()> {
    Ok(())
}
