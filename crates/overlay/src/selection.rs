//! Full-screen region picker.
//!
//! A translucent veil over the whole virtual desktop; the user drags a
//! rectangle, release commits it, Escape cancels. The veil window is
//! excluded from capture so a grab taken right afterwards never shows
//! it.

use geometry::Rect;

use crate::OverlayResult;

/// Runs the modal picker and blocks until the user releases the mouse
/// or cancels. `Ok(None)` means cancelled; a zero-area selection is
/// returned as-is and left to the caller to reject.
pub fn select_region() -> OverlayResult<Option<Rect>> {
    imp::select_region()
}

/// Mouse-drag bookkeeping, kept apart from the window plumbing.
#[derive(Debug, Default)]
struct DragState {
    anchor: Option<(i32, i32)>,
    current: Option<Rect>,
}

impl DragState {
    fn press(&mut self, x: i32, y: i32) {
        self.anchor = Some((x, y));
        self.current = Some(Rect::from_corners(x, y, x, y));
    }

    /// Returns true when the rubber band moved and needs a repaint.
    fn drag(&mut self, x: i32, y: i32) -> bool {
        match self.anchor {
            Some((ax, ay)) => {
                self.current = Some(Rect::from_corners(ax, ay, x, y));
                true
            }
            None => false,
        }
    }

    /// Commits the drag. A release without a preceding press is a stray
    /// event and yields nothing.
    fn release(&mut self, x: i32, y: i32) -> Option<Rect> {
        let (ax, ay) = self.anchor.take()?;
        self.current = None;
        Some(Rect::from_corners(ax, ay, x, y))
    }

    fn rubber_band(&self) -> Option<Rect> {
        self.current
    }
}

#[cfg(windows)]
mod imp {
    use std::cell::RefCell;

    use geometry::Rect;
    use windows::core::w;
    use windows::Win32::Foundation::{COLORREF, HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
    use windows::Win32::Graphics::Gdi::{
        BeginPaint, CreatePen, DeleteObject, EndPaint, GetStockObject, InvalidateRect, Rectangle,
        SelectObject, UpdateWindow, BLACK_BRUSH, HBRUSH, HOLLOW_BRUSH, PAINTSTRUCT, PS_SOLID,
    };
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::Input::KeyboardAndMouse::{ReleaseCapture, SetCapture};
    use windows::Win32::UI::WindowsAndMessaging::{
        CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW,
        LoadCursorW, RegisterClassExW, SetForegroundWindow, SetLayeredWindowAttributes,
        ShowWindow, TranslateMessage, CS_HREDRAW, CS_VREDRAW, IDC_CROSS, LWA_ALPHA, MSG, SW_SHOW,
        WM_CLOSE, WM_KEYDOWN, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MOUSEMOVE, WM_PAINT, WNDCLASSEXW,
        WS_EX_LAYERED, WS_EX_TOPMOST, WS_POPUP,
    };

    use super::DragState;
    use crate::OverlayResult;

    /// Veil translucency over the desktop.
    const VEIL_ALPHA: u8 = 38;
    /// Rubber-band color, BGR.
    const BAND_COLOR: u32 = 0x00FF_9600;
    const BAND_THICKNESS: i32 = 2;

    thread_local! {
        static PICKER_STATE: RefCell<Option<Box<PickerState>>> = RefCell::new(None);
    }

    struct PickerState {
        /// Top-left of the veil window in screen coordinates; client
        /// positions are offset by this to get screen positions.
        origin: (i32, i32),
        drag: DragState,
        result: Option<Option<Rect>>,
    }

    pub(super) fn select_region() -> OverlayResult<Option<Rect>> {
        let bounds = veil_bounds();

        unsafe {
            let hmodule = GetModuleHandleW(None)?;
            let hinstance = HINSTANCE(hmodule.0);

            let wc = WNDCLASSEXW {
                cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
                style: CS_HREDRAW | CS_VREDRAW,
                lpfnWndProc: Some(picker_wnd_proc),
                hInstance: hinstance,
                hCursor: LoadCursorW(None, IDC_CROSS)?,
                hbrBackground: HBRUSH(GetStockObject(BLACK_BRUSH).0),
                lpszClassName: w!("SpyglassRegionPicker"),
                ..Default::default()
            };

            RegisterClassExW(&wc);

            PICKER_STATE.with(|s| {
                *s.borrow_mut() = Some(Box::new(PickerState {
                    origin: (bounds.x, bounds.y),
                    drag: DragState::default(),
                    result: None,
                }));
            });

            let hwnd = CreateWindowExW(
                WS_EX_TOPMOST | WS_EX_LAYERED,
                w!("SpyglassRegionPicker"),
                w!("Spyglass Selection"),
                WS_POPUP,
                bounds.x,
                bounds.y,
                bounds.width as i32,
                bounds.height as i32,
                None,
                None,
                hinstance,
                None,
            )?;

            SetLayeredWindowAttributes(hwnd, COLORREF(0), VEIL_ALPHA, LWA_ALPHA)?;
            if let Err(err) = platform::set_display_affinity(hwnd.0 as isize, true) {
                log::debug!("picker affinity failed: {err}");
            }

            ShowWindow(hwnd, SW_SHOW);
            SetForegroundWindow(hwnd);
            let _ = UpdateWindow(hwnd);

            let mut msg = MSG::default();
            loop {
                let ret = GetMessageW(&mut msg, None, 0, 0);
                if !ret.as_bool() {
                    break;
                }
                TranslateMessage(&msg);
                DispatchMessageW(&msg);

                let has_result = PICKER_STATE.with(|s| {
                    s.borrow()
                        .as_ref()
                        .map(|state| state.result.is_some())
                        .unwrap_or(false)
                });
                if has_result {
                    break;
                }
            }

            let result =
                PICKER_STATE.with(|s| s.borrow().as_ref().and_then(|state| state.result.clone()));

            let _ = DestroyWindow(hwnd);
            PICKER_STATE.with(|s| {
                *s.borrow_mut() = None;
            });

            Ok(result.flatten())
        }
    }

    /// Virtual desktop extent, or the primary monitor when the metrics
    /// come back degenerate.
    fn veil_bounds() -> Rect {
        let bounds = platform::virtual_screen_bounds();
        if bounds.is_empty() {
            platform::primary_screen_bounds()
        } else {
            bounds
        }
    }

    unsafe extern "system" fn picker_wnd_proc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        match msg {
            WM_PAINT => {
                paint_band(hwnd);
                LRESULT(0)
            }

            WM_LBUTTONDOWN => {
                let (x, y) = screen_pos(lparam);
                SetCapture(hwnd);
                PICKER_STATE.with(|s| {
                    if let Some(ref mut state) = *s.borrow_mut() {
                        state.drag.press(x, y);
                    }
                });
                LRESULT(0)
            }

            WM_MOUSEMOVE => {
                let (x, y) = screen_pos(lparam);
                let moved = PICKER_STATE.with(|s| {
                    s.borrow_mut()
                        .as_mut()
                        .map(|state| state.drag.drag(x, y))
                        .unwrap_or(false)
                });
                if moved {
                    let _ = InvalidateRect(hwnd, None, true);
                }
                LRESULT(0)
            }

            WM_LBUTTONUP => {
                let (x, y) = screen_pos(lparam);
                let _ = ReleaseCapture();
                PICKER_STATE.with(|s| {
                    if let Some(ref mut state) = *s.borrow_mut() {
                        if let Some(rect) = state.drag.release(x, y) {
                            state.result = Some(Some(rect));
                        }
                    }
                });
                LRESULT(0)
            }

            WM_KEYDOWN => {
                const VK_ESCAPE: usize = 0x1B;
                if wparam.0 == VK_ESCAPE {
                    PICKER_STATE.with(|s| {
                        if let Some(ref mut state) = *s.borrow_mut() {
                            state.result = Some(None);
                        }
                    });
                }
                LRESULT(0)
            }

            WM_CLOSE => {
                PICKER_STATE.with(|s| {
                    if let Some(ref mut state) = *s.borrow_mut() {
                        if state.result.is_none() {
                            state.result = Some(None);
                        }
                    }
                });
                LRESULT(0)
            }

            _ => DefWindowProcW(hwnd, msg, wparam, lparam),
        }
    }

    /// Client coordinates from the mouse lparam, shifted into screen
    /// space by the veil origin.
    unsafe fn screen_pos(lparam: LPARAM) -> (i32, i32) {
        let x = (lparam.0 & 0xFFFF) as i16 as i32;
        let y = ((lparam.0 >> 16) & 0xFFFF) as i16 as i32;
        PICKER_STATE.with(|s| {
            s.borrow()
                .as_ref()
                .map(|state| (x + state.origin.0, y + state.origin.1))
                .unwrap_or((x, y))
        })
    }

    unsafe fn paint_band(hwnd: HWND) {
        let mut ps = PAINTSTRUCT::default();
        let hdc = BeginPaint(hwnd, &mut ps);

        let band = PICKER_STATE.with(|s| {
            s.borrow()
                .as_ref()
                .and_then(|state| state.drag.rubber_band().map(|rect| (rect, state.origin)))
        });

        if let Some((rect, origin)) = band {
            let pen = CreatePen(PS_SOLID, BAND_THICKNESS, COLORREF(BAND_COLOR));
            let old_pen = SelectObject(hdc, pen);
            let old_brush = SelectObject(hdc, GetStockObject(HOLLOW_BRUSH));

            let left = rect.x - origin.0;
            let top = rect.y - origin.1;
            let _ = Rectangle(
                hdc,
                left,
                top,
                left + rect.width as i32,
                top + rect.height as i32,
            );

            let _ = SelectObject(hdc, old_pen);
            let _ = SelectObject(hdc, old_brush);
            let _ = DeleteObject(pen);
        }

        let _ = EndPaint(hwnd, &ps);
    }
}

#[cfg(not(windows))]
mod imp {
    use geometry::Rect;

    use crate::OverlayResult;

    pub(super) fn select_region() -> OverlayResult<Option<Rect>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_starts_a_zero_size_band() {
        let mut drag = DragState::default();
        drag.press(50, 60);
        assert_eq!(drag.rubber_band(), Some(Rect::new(50, 60, 0, 0)));
    }

    #[test]
    fn drag_tracks_the_pointer_from_the_anchor() {
        let mut drag = DragState::default();
        drag.press(100, 100);
        assert!(drag.drag(260, 180));
        assert_eq!(drag.rubber_band(), Some(Rect::new(100, 100, 160, 80)));
    }

    #[test]
    fn release_normalizes_an_upward_leftward_drag() {
        let mut drag = DragState::default();
        drag.press(300, 250);
        drag.drag(120, 90);
        let rect = drag.release(120, 90).unwrap();
        assert_eq!(rect, Rect::new(120, 90, 180, 160));
        assert!(drag.rubber_band().is_none());
    }

    #[test]
    fn stray_events_without_a_press_are_ignored() {
        let mut drag = DragState::default();
        assert!(!drag.drag(10, 10));
        assert!(drag.release(10, 10).is_none());
    }

    #[test]
    fn release_is_single_shot() {
        let mut drag = DragState::default();
        drag.press(0, 0);
        assert!(drag.release(10, 10).is_some());
        assert!(drag.release(20, 20).is_none());
    }
}
