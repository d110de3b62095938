//! Monitor enumeration
//!
//! Every query walks the OS display list again; topology changes
//! whenever a display is plugged, unplugged or rearranged, so snapshots
//! are never cached.

use crate::{DisplayProvider, Monitor};
use geometry::Rect;

/// Displays as reported by the OS
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeDisplays;

impl DisplayProvider for NativeDisplays {
    fn monitors(&self) -> Vec<Monitor> {
        list_monitors()
    }

    fn virtual_screen(&self) -> Rect {
        virtual_screen_bounds()
    }

    fn primary_screen(&self) -> Rect {
        primary_screen_bounds()
    }
}

/// Enumerate attached monitors in platform order
#[cfg(windows)]
pub fn list_monitors() -> Vec<Monitor> {
    use windows::Win32::Foundation::{BOOL, LPARAM, RECT};
    use windows::Win32::Graphics::Gdi::{
        EnumDisplayMonitors, GetMonitorInfoW, HDC, HMONITOR, MONITORINFO, MONITORINFOEXW,
    };

    unsafe extern "system" fn enum_monitor_callback(
        monitor: HMONITOR,
        _hdc: HDC,
        _clip: *mut RECT,
        lparam: LPARAM,
    ) -> BOOL {
        let monitors = &mut *(lparam.0 as *mut Vec<Monitor>);

        let mut info = MONITORINFOEXW {
            monitorInfo: MONITORINFO {
                cbSize: std::mem::size_of::<MONITORINFOEXW>() as u32,
                ..Default::default()
            },
            ..Default::default()
        };

        if GetMonitorInfoW(monitor, &mut info as *mut MONITORINFOEXW as *mut MONITORINFO).as_bool()
        {
            let device_len = info
                .szDevice
                .iter()
                .position(|&c| c == 0)
                .unwrap_or(info.szDevice.len());
            monitors.push(Monitor {
                id: String::from_utf16_lossy(&info.szDevice[..device_len]),
                bounds: rect_from_win32(&info.monitorInfo.rcMonitor),
                work_area: rect_from_win32(&info.monitorInfo.rcWork),
                is_primary: info.monitorInfo.dwFlags & 1 != 0, // MONITORINFOF_PRIMARY
            });
        }

        BOOL(1) // Continue enumeration
    }

    let mut monitors: Vec<Monitor> = Vec::new();
    unsafe {
        let _ = EnumDisplayMonitors(
            None,
            None,
            Some(enum_monitor_callback),
            LPARAM(&mut monitors as *mut Vec<Monitor> as isize),
        );
    }
    monitors
}

#[cfg(not(windows))]
pub fn list_monitors() -> Vec<Monitor> {
    Vec::new()
}

/// Bounds of the union of all monitors
#[cfg(windows)]
pub fn virtual_screen_bounds() -> Rect {
    use windows::Win32::UI::WindowsAndMessaging::{
        GetSystemMetrics, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
        SM_YVIRTUALSCREEN,
    };

    unsafe {
        Rect::new(
            GetSystemMetrics(SM_XVIRTUALSCREEN),
            GetSystemMetrics(SM_YVIRTUALSCREEN),
            GetSystemMetrics(SM_CXVIRTUALSCREEN) as u32,
            GetSystemMetrics(SM_CYVIRTUALSCREEN) as u32,
        )
    }
}

#[cfg(not(windows))]
pub fn virtual_screen_bounds() -> Rect {
    Rect::default()
}

/// Bounds of the primary monitor, origin of the virtual desktop
#[cfg(windows)]
pub fn primary_screen_bounds() -> Rect {
    use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

    unsafe {
        Rect::new(
            0,
            0,
            GetSystemMetrics(SM_CXSCREEN) as u32,
            GetSystemMetrics(SM_CYSCREEN) as u32,
        )
    }
}

#[cfg(not(windows))]
pub fn primary_screen_bounds() -> Rect {
    Rect::default()
}

#[cfg(windows)]
fn rect_from_win32(rect: &windows::Win32::Foundation::RECT) -> Rect {
    Rect::new(
        rect.left,
        rect.top,
        (rect.right - rect.left) as u32,
        (rect.bottom - rect.top) as u32,
    )
}
