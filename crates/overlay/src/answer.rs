//! Borderless answer overlay (topmost, click-through, capture-excluded).
//!
//! The overlay never takes focus and never receives input; it exists
//! only to float streamed answer text next to the captured region.
//! Placement is recomputed from the remembered region on every content
//! change so the window grows and shrinks with the answer.

use geometry::Rect;
use platform::{DisplayProvider, RawWindow};

use crate::text;
use crate::OverlayResult;

/// Window translucency, 0 transparent to 255 opaque.
#[cfg(windows)]
const OVERLAY_ALPHA: u8 = 224;

/// Background fill, BGR.
#[cfg(windows)]
const BACKGROUND: u32 = 0x0028_2828;

/// Answer text color, BGR.
#[cfg(windows)]
const TEXT_COLOR: u32 = 0x00F0_F0F0;

pub struct AnswerOverlay {
    window: RawWindow,
    text: String,
    placeholder: String,
    target_display_id: String,
    exclude_from_capture: bool,
    last_region: Option<Rect>,
}

impl AnswerOverlay {
    /// Creates the hidden overlay window. `placeholder` is shown
    /// whenever no answer text is set.
    pub fn create(placeholder: &str) -> OverlayResult<Self> {
        let overlay = Self {
            window: imp::create_window()?,
            text: String::new(),
            placeholder: placeholder.to_string(),
            target_display_id: String::new(),
            exclude_from_capture: true,
            last_region: None,
        };
        overlay.sync_content();
        Ok(overlay)
    }

    /// Shows the overlay next to `region`, or in the corner of the
    /// target screen when no region is given. The region is remembered
    /// so later content changes re-run placement against it.
    pub fn show(&mut self, region: Option<Rect>, displays: &dyn DisplayProvider) {
        self.last_region = region;
        self.sync_content();
        let bounds = self.compute_bounds(displays);
        imp::apply_bounds(self.window, bounds, true);
        self.apply_window_flags();
    }

    pub fn hide(&self) {
        imp::hide_window(self.window);
    }

    pub fn is_visible(&self) -> bool {
        imp::is_window_visible(self.window)
    }

    /// Replaces the answer text and resizes in place. Visibility is
    /// untouched: a hidden overlay stays hidden, a visible one reflows
    /// without being raised.
    pub fn set_answer(&mut self, answer: &str, displays: &dyn DisplayProvider) {
        self.text = answer.to_string();
        self.sync_content();
        let bounds = self.compute_bounds(displays);
        imp::apply_bounds(self.window, bounds, false);
        imp::repaint(self.window);
    }

    /// Swaps the placeholder, refreshing the window if the placeholder
    /// is what is currently displayed.
    pub fn set_placeholder(&mut self, placeholder: &str, displays: &dyn DisplayProvider) {
        self.placeholder = placeholder.to_string();
        if self.text.trim().is_empty() {
            self.sync_content();
            let bounds = self.compute_bounds(displays);
            imp::apply_bounds(self.window, bounds, false);
            imp::repaint(self.window);
        }
    }

    /// Selects which monitor hosts the overlay. Matching is by
    /// identifier substring; an unknown or empty id falls back to the
    /// primary monitor.
    pub fn set_target_display_id(&mut self, id: &str) {
        self.target_display_id = id.trim().to_lowercase();
    }

    pub fn set_exclude_from_capture(&mut self, exclude: bool) {
        self.exclude_from_capture = exclude;
        if let Err(err) = platform::set_display_affinity(self.window, exclude) {
            log::warn!("overlay display affinity failed: {err}");
        }
    }

    pub fn last_region(&self) -> Option<Rect> {
        self.last_region
    }

    fn display_text(&self) -> &str {
        if self.text.trim().is_empty() {
            &self.placeholder
        } else {
            &self.text
        }
    }

    fn sync_content(&self) {
        imp::store_content(self.display_text());
    }

    fn compute_bounds(&self, displays: &dyn DisplayProvider) -> Rect {
        let screen = self.target_screen(displays);
        let content = |width: i32| text::content_height(self.display_text(), width);
        match self.last_region {
            Some(region) if region.intersects(&screen) => {
                geometry::compute_overlay_bounds(region, screen, content)
            }
            _ => geometry::compute_overlay_bounds_for_screen(screen, content),
        }
    }

    fn target_screen(&self, displays: &dyn DisplayProvider) -> Rect {
        displays
            .find_monitor(&self.target_display_id)
            .map(|monitor| monitor.work_area)
            .unwrap_or_else(|| displays.primary_screen())
    }

    /// Click-through and capture affinity drop under some desktop
    /// transitions, so both are reapplied on every show.
    fn apply_window_flags(&self) {
        if let Err(err) = platform::set_click_through(self.window) {
            log::warn!("overlay click-through failed: {err}");
        }
        if let Err(err) = platform::set_display_affinity(self.window, self.exclude_from_capture) {
            log::warn!("overlay display affinity failed: {err}");
        }
    }
}

impl Drop for AnswerOverlay {
    fn drop(&mut self) {
        imp::destroy_window(self.window);
        self.window = 0;
    }
}

#[cfg(windows)]
mod imp {
    use std::cell::RefCell;
    use std::sync::Once;

    use platform::RawWindow;
    use windows::core::{w, PCWSTR};
    use windows::Win32::Foundation::{COLORREF, HINSTANCE, HWND, LPARAM, LRESULT, RECT, WPARAM};
    use windows::Win32::Graphics::Gdi::{
        BeginPaint, CreateFontW, CreateSolidBrush, DeleteObject, EndPaint, FillRect,
        InvalidateRect, SelectObject, SetBkMode, SetTextColor, TextOutW, CLIP_DEFAULT_PRECIS,
        DEFAULT_CHARSET, DEFAULT_PITCH, DEFAULT_QUALITY, FF_SWISS, FW_NORMAL, OUT_DEFAULT_PRECIS,
        PAINTSTRUCT, TRANSPARENT,
    };
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::WindowsAndMessaging::{
        CreateWindowExW, DefWindowProcW, DestroyWindow, GetClientRect, IsWindowVisible,
        RegisterClassExW, SetLayeredWindowAttributes, SetWindowPos, ShowWindow, CS_HREDRAW,
        CS_VREDRAW, HTTRANSPARENT, HWND_TOPMOST, LWA_ALPHA, SWP_NOACTIVATE, SWP_NOZORDER,
        SWP_SHOWWINDOW, SW_HIDE, WM_NCHITTEST, WM_PAINT, WNDCLASSEXW, WS_EX_LAYERED,
        WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_EX_TRANSPARENT, WS_POPUP,
    };

    use super::{BACKGROUND, OVERLAY_ALPHA, TEXT_COLOR};
    use crate::text;
    use crate::OverlayResult;

    const OVERLAY_CLASS: PCWSTR = w!("SpyglassAnswerOverlay");
    const FONT_HEIGHT: i32 = 16;

    thread_local! {
        static CONTENT: RefCell<String> = RefCell::new(String::new());
    }

    static REGISTER: Once = Once::new();

    fn register_class() -> OverlayResult<()> {
        let mut result: OverlayResult<()> = Ok(());
        REGISTER.call_once(|| unsafe {
            let hmodule = match GetModuleHandleW(None) {
                Ok(h) => h,
                Err(e) => {
                    result = Err(e.into());
                    return;
                }
            };
            let wc = WNDCLASSEXW {
                cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
                style: CS_HREDRAW | CS_VREDRAW,
                lpfnWndProc: Some(overlay_wnd_proc),
                hInstance: HINSTANCE(hmodule.0),
                lpszClassName: OVERLAY_CLASS,
                ..Default::default()
            };

            let _ = RegisterClassExW(&wc);
        });

        result
    }

    pub(super) fn create_window() -> OverlayResult<RawWindow> {
        register_class()?;

        unsafe {
            let hmodule = GetModuleHandleW(None)?;
            let hinstance = HINSTANCE(hmodule.0);

            let hwnd = CreateWindowExW(
                WS_EX_TOPMOST | WS_EX_TOOLWINDOW | WS_EX_TRANSPARENT | WS_EX_NOACTIVATE
                    | WS_EX_LAYERED,
                OVERLAY_CLASS,
                w!("Spyglass Answer"),
                WS_POPUP,
                0,
                0,
                geometry::OVERLAY_WIDTH,
                geometry::OVERLAY_MIN_HEIGHT,
                None,
                None,
                hinstance,
                None,
            )?;

            SetLayeredWindowAttributes(hwnd, COLORREF(0), OVERLAY_ALPHA, LWA_ALPHA)?;

            Ok(hwnd.0 as isize)
        }
    }

    pub(super) fn store_content(content: &str) {
        CONTENT.with(|cell| {
            *cell.borrow_mut() = content.to_string();
        });
    }

    pub(super) fn apply_bounds(window: RawWindow, bounds: geometry::Rect, raise: bool) {
        if window == 0 {
            return;
        }
        unsafe {
            let hwnd = HWND(window as *mut std::ffi::c_void);
            if raise {
                let _ = SetWindowPos(
                    hwnd,
                    HWND_TOPMOST,
                    bounds.x,
                    bounds.y,
                    bounds.width as i32,
                    bounds.height as i32,
                    SWP_NOACTIVATE | SWP_SHOWWINDOW,
                );
            } else {
                let _ = SetWindowPos(
                    hwnd,
                    None,
                    bounds.x,
                    bounds.y,
                    bounds.width as i32,
                    bounds.height as i32,
                    SWP_NOZORDER | SWP_NOACTIVATE,
                );
            }
        }
    }

    pub(super) fn hide_window(window: RawWindow) {
        if window == 0 {
            return;
        }
        unsafe {
            ShowWindow(HWND(window as *mut std::ffi::c_void), SW_HIDE);
        }
    }

    pub(super) fn is_window_visible(window: RawWindow) -> bool {
        if window == 0 {
            return false;
        }
        unsafe { IsWindowVisible(HWND(window as *mut std::ffi::c_void)).as_bool() }
    }

    pub(super) fn repaint(window: RawWindow) {
        if window == 0 {
            return;
        }
        unsafe {
            let _ = InvalidateRect(HWND(window as *mut std::ffi::c_void), None, true);
        }
    }

    pub(super) fn destroy_window(window: RawWindow) {
        if window == 0 {
            return;
        }
        unsafe {
            let _ = DestroyWindow(HWND(window as *mut std::ffi::c_void));
        }
        CONTENT.with(|cell| cell.borrow_mut().clear());
    }

    unsafe extern "system" fn overlay_wnd_proc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        match msg {
            WM_NCHITTEST => LRESULT(HTTRANSPARENT as isize),
            WM_PAINT => {
                paint_answer(hwnd);
                LRESULT(0)
            }
            _ => DefWindowProcW(hwnd, msg, wparam, lparam),
        }
    }

    unsafe fn paint_answer(hwnd: HWND) {
        let mut ps = PAINTSTRUCT::default();
        let hdc = BeginPaint(hwnd, &mut ps);

        let mut rect = RECT::default();
        let _ = GetClientRect(hwnd, &mut rect);
        let width = rect.right - rect.left;
        let height = rect.bottom - rect.top;

        let brush = CreateSolidBrush(COLORREF(BACKGROUND));
        FillRect(hdc, &rect, brush);
        let _ = DeleteObject(brush);

        let font = CreateFontW(
            FONT_HEIGHT,
            0,
            0,
            0,
            FW_NORMAL.0 as i32,
            0,
            0,
            0,
            DEFAULT_CHARSET.0 as u32,
            OUT_DEFAULT_PRECIS.0 as u32,
            CLIP_DEFAULT_PRECIS.0 as u32,
            DEFAULT_QUALITY.0 as u32,
            (DEFAULT_PITCH.0 | FF_SWISS.0) as u32,
            w!("Microsoft YaHei UI"),
        );
        let old_font = SelectObject(hdc, font);

        SetBkMode(hdc, TRANSPARENT);
        SetTextColor(hdc, COLORREF(TEXT_COLOR));

        CONTENT.with(|cell| {
            let content = cell.borrow();
            let rows = text::wrap_text(&content, text::columns_for_width(width));
            let mut y = text::PADDING;
            for row in &rows {
                if y + text::LINE_HEIGHT > height - text::PADDING {
                    break;
                }
                if !row.is_empty() {
                    let wide: Vec<u16> = row.encode_utf16().chain(std::iter::once(0)).collect();
                    let _ = TextOutW(hdc, text::PADDING, y, &wide[..wide.len() - 1]);
                }
                y += text::LINE_HEIGHT;
            }
        });

        SelectObject(hdc, old_font);
        let _ = DeleteObject(font);

        let _ = EndPaint(hwnd, &ps);
    }
}

#[cfg(not(windows))]
mod imp {
    use platform::RawWindow;

    use crate::OverlayResult;

    pub(super) fn create_window() -> OverlayResult<RawWindow> {
        Ok(0)
    }

    pub(super) fn store_content(_content: &str) {}

    pub(super) fn apply_bounds(_window: RawWindow, _bounds: geometry::Rect, _raise: bool) {}

    pub(super) fn hide_window(_window: RawWindow) {}

    pub(super) fn is_window_visible(_window: RawWindow) -> bool {
        false
    }

    pub(super) fn repaint(_window: RawWindow) {}

    pub(super) fn destroy_window(_window: RawWindow) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::{Monitor, StaticDisplays};

    fn single_monitor() -> StaticDisplays {
        StaticDisplays::new(vec![Monitor {
            id: "\\\\.\\DISPLAY1".to_string(),
            bounds: Rect::new(0, 0, 1920, 1080),
            work_area: Rect::new(0, 0, 1920, 1040),
            is_primary: true,
        }])
    }

    fn two_monitors() -> StaticDisplays {
        StaticDisplays::new(vec![
            Monitor {
                id: "\\\\.\\DISPLAY1".to_string(),
                bounds: Rect::new(0, 0, 1920, 1080),
                work_area: Rect::new(0, 0, 1920, 1040),
                is_primary: true,
            },
            Monitor {
                id: "\\\\.\\DISPLAY2".to_string(),
                bounds: Rect::new(1920, 0, 2560, 1440),
                work_area: Rect::new(1920, 0, 2560, 1400),
                is_primary: false,
            },
        ])
    }

    #[test]
    fn placeholder_shown_until_answer_arrives() {
        let displays = single_monitor();
        let mut overlay = AnswerOverlay::create("no answer yet").unwrap();
        assert_eq!(overlay.display_text(), "no answer yet");

        overlay.set_answer("42", &displays);
        assert_eq!(overlay.display_text(), "42");

        overlay.set_answer("   ", &displays);
        assert_eq!(overlay.display_text(), "no answer yet");
    }

    #[test]
    fn placement_follows_remembered_region() {
        let displays = single_monitor();
        let mut overlay = AnswerOverlay::create("…").unwrap();
        overlay.show(Some(Rect::new(100, 100, 200, 150)), &displays);

        let bounds = overlay.compute_bounds(&displays);
        assert_eq!(bounds.x, 308);
        assert_eq!(bounds.width, 420);
    }

    #[test]
    fn no_region_uses_screen_corner() {
        let displays = single_monitor();
        let mut overlay = AnswerOverlay::create("…").unwrap();
        overlay.show(None, &displays);

        let bounds = overlay.compute_bounds(&displays);
        assert_eq!(bounds.x, 1920 - 8 - 420);
        assert_eq!(bounds.y, 8);
    }

    #[test]
    fn region_off_target_screen_falls_back_to_corner() {
        let displays = two_monitors();
        let mut overlay = AnswerOverlay::create("…").unwrap();
        overlay.set_target_display_id("display2");
        overlay.show(Some(Rect::new(100, 100, 200, 150)), &displays);

        let bounds = overlay.compute_bounds(&displays);
        // region lives on DISPLAY1, overlay is pinned to DISPLAY2
        assert_eq!(bounds.x, 1920 + 2560 - 8 - 420);
        assert_eq!(bounds.y, 8);
    }

    #[test]
    fn display_id_matching_is_trimmed_and_case_insensitive() {
        let displays = two_monitors();
        let mut overlay = AnswerOverlay::create("…").unwrap();
        overlay.set_target_display_id("  DISPLAY2  ");
        assert_eq!(
            overlay.target_screen(&displays),
            Rect::new(1920, 0, 2560, 1400)
        );

        overlay.set_target_display_id("");
        assert_eq!(overlay.target_screen(&displays), Rect::new(0, 0, 1920, 1040));
    }

    #[test]
    fn longer_answers_grow_the_overlay() {
        let displays = single_monitor();
        let mut overlay = AnswerOverlay::create("…").unwrap();
        overlay.show(Some(Rect::new(100, 100, 200, 150)), &displays);

        overlay.set_answer("short", &displays);
        let short = overlay.compute_bounds(&displays);

        overlay.set_answer(&"long answer text ".repeat(80), &displays);
        let long = overlay.compute_bounds(&displays);

        assert!(long.height > short.height);
        assert_eq!(long.x, short.x);
    }
}
