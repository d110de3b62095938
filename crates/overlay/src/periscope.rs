//! Periscope: a small topmost window live-mirroring one monitor.
//!
//! The capture loop is cooperative. Each timer tick grabs the mirrored
//! monitor once, paints, and only then waits for the next tick, so a
//! slow grab stretches the interval instead of piling work up. The
//! window itself is always excluded from capture; without that the
//! mirror would feed back into itself when it overlaps the mirrored
//! monitor.

use geometry::Rect;
use image::RgbaImage;
use platform::PlatformResult;

/// Tick interval used when the configured one is zero or negative.
pub const DEFAULT_REFRESH_MS: u32 = 120;

/// Mirror parameters, usually assembled from configuration.
#[derive(Debug, Clone)]
pub struct PeriscopeSettings {
    /// Substring match against monitor device names.
    pub display_id: String,
    pub refresh_ms: u32,
    /// Requested canvas size; floored to the minimum canvas.
    pub width: u32,
    pub height: u32,
    /// Consecutive grab failures before the mirror gives up.
    /// Zero keeps it retrying forever.
    pub failure_limit: u32,
}

impl Default for PeriscopeSettings {
    fn default() -> Self {
        Self {
            display_id: String::new(),
            refresh_ms: DEFAULT_REFRESH_MS,
            width: 640,
            height: 360,
            failure_limit: 25,
        }
    }
}

/// State machine for the mirror loop, separated from the window so the
/// start/stop/failure rules can run without a desktop.
///
/// The session performs no capture of its own; each tick is handed a
/// grab function. Between `begin` and the first tick nothing is
/// grabbed, and a session halted before its first tick never grabs at
/// all.
pub struct CaptureSession {
    capture_bounds: Rect,
    refresh_ms: u32,
    running: bool,
    consecutive_failures: u32,
    failure_limit: u32,
}

/// What one timer tick did.
#[derive(Debug)]
pub enum TickOutcome {
    /// Session was not running; nothing was grabbed.
    Skipped,
    /// A fresh frame of the mirrored monitor.
    Frame(RgbaImage),
    /// Grab failed; previous frame stays on screen.
    Failed { consecutive: u32 },
    /// Failure limit reached; the session stopped itself.
    Halted { failures: u32 },
}

impl CaptureSession {
    pub fn new(capture_bounds: Rect, refresh_ms: u32, failure_limit: u32) -> Self {
        Self {
            capture_bounds,
            refresh_ms: if refresh_ms > 0 {
                refresh_ms
            } else {
                DEFAULT_REFRESH_MS
            },
            running: false,
            consecutive_failures: 0,
            failure_limit,
        }
    }

    /// Arms the session. Returns false when it was already running.
    pub fn begin(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.consecutive_failures = 0;
        true
    }

    /// Disarms the session. Returns false when it was not running.
    pub fn halt(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        true
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn refresh_ms(&self) -> u32 {
        self.refresh_ms
    }

    pub fn capture_bounds(&self) -> Rect {
        self.capture_bounds
    }

    pub fn tick<G>(&mut self, mut grab: G) -> TickOutcome
    where
        G: FnMut(Rect) -> PlatformResult<RgbaImage>,
    {
        if !self.running {
            return TickOutcome::Skipped;
        }
        match grab(self.capture_bounds) {
            Ok(frame) => {
                self.consecutive_failures = 0;
                TickOutcome::Frame(frame)
            }
            Err(_) => {
                self.consecutive_failures += 1;
                if self.failure_limit > 0 && self.consecutive_failures >= self.failure_limit {
                    self.running = false;
                    TickOutcome::Halted {
                        failures: self.consecutive_failures,
                    }
                } else {
                    TickOutcome::Failed {
                        consecutive: self.consecutive_failures,
                    }
                }
            }
        }
    }
}

pub use imp::Periscope;

#[cfg(windows)]
mod imp {
    use std::cell::RefCell;
    use std::sync::Once;

    use image::imageops::FilterType;
    use image::RgbaImage;
    use platform::{DisplayProvider, RawWindow};
    use windows::core::{w, PCWSTR};
    use windows::Win32::Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, RECT, WPARAM};
    use windows::Win32::Graphics::Gdi::{
        BeginPaint, EndPaint, GetStockObject, InvalidateRect, SetDIBitsToDevice, BITMAPINFO,
        BITMAPINFOHEADER, BI_RGB, BLACK_BRUSH, DIB_RGB_COLORS, HBRUSH, PAINTSTRUCT,
    };
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::WindowsAndMessaging::{
        CreateWindowExW, DefWindowProcW, DestroyWindow, GetClientRect, KillTimer, LoadCursorW,
        RegisterClassExW, SetTimer, ShowWindow, IDC_ARROW, SW_HIDE, SW_SHOW, WM_CLOSE, WM_PAINT,
        WM_TIMER, WNDCLASSEXW, WS_EX_TOPMOST, WS_OVERLAPPEDWINDOW,
    };

    use super::{CaptureSession, PeriscopeSettings, TickOutcome};
    use crate::OverlayResult;

    const PERISCOPE_CLASS: PCWSTR = w!("SpyglassPeriscope");
    const TICK_TIMER: usize = 1;

    thread_local! {
        static PERISCOPE_STATE: RefCell<Option<Box<PeriscopeState>>> = RefCell::new(None);
    }

    struct PeriscopeState {
        session: CaptureSession,
        frame: Option<FrameBuffer>,
        on_halt: Option<Box<dyn Fn(u32)>>,
    }

    /// BGRA rows sized to the client area at the time of the grab.
    struct FrameBuffer {
        data: Vec<u8>,
        width: i32,
        height: i32,
    }

    enum TimerAction {
        Nothing,
        Repaint,
        Halt(u32),
    }

    /// Titled topmost mirror window. One at a time; opening a second
    /// replaces the loop state of the first.
    pub struct Periscope {
        window: RawWindow,
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
                lpfnWndProc: Some(periscope_wnd_proc),
                hInstance: HINSTANCE(hmodule.0),
                hCursor: match LoadCursorW(None, IDC_ARROW) {
                    Ok(c) => c,
                    Err(e) => {
                        result = Err(e.into());
                        return;
                    }
                },
                hbrBackground: HBRUSH(GetStockObject(BLACK_BRUSH).0),
                lpszClassName: PERISCOPE_CLASS,
                ..Default::default()
            };

            let _ = RegisterClassExW(&wc);
        });

        result
    }

    impl Periscope {
        /// Creates the mirror window, hidden, centered on the primary
        /// monitor. `on_halt` fires on the UI thread if the failure
        /// limit ever stops the loop.
        pub fn open(
            settings: &PeriscopeSettings,
            displays: &dyn DisplayProvider,
            on_halt: Box<dyn Fn(u32)>,
        ) -> OverlayResult<Self> {
            register_class()?;

            let capture_bounds = displays
                .find_monitor(&settings.display_id)
                .map(|monitor| monitor.bounds)
                .unwrap_or_else(|| displays.primary_screen());
            let (canvas_w, canvas_h) =
                geometry::periscope_canvas_size(settings.width, settings.height);
            let (x, y) = displays.primary_screen().center_for(canvas_w, canvas_h);

            let session =
                CaptureSession::new(capture_bounds, settings.refresh_ms, settings.failure_limit);

            unsafe {
                let hmodule = GetModuleHandleW(None)?;
                let hinstance = HINSTANCE(hmodule.0);

                let hwnd = CreateWindowExW(
                    WS_EX_TOPMOST,
                    PERISCOPE_CLASS,
                    w!("Periscope"),
                    WS_OVERLAPPEDWINDOW,
                    x,
                    y,
                    canvas_w as i32,
                    canvas_h as i32,
                    None,
                    None,
                    hinstance,
                    None,
                )?;

                PERISCOPE_STATE.with(|s| {
                    *s.borrow_mut() = Some(Box::new(PeriscopeState {
                        session,
                        frame: None,
                        on_halt: Some(on_halt),
                    }));
                });

                Ok(Self {
                    window: hwnd.0 as isize,
                })
            }
        }

        /// Shows the window and arms the tick timer. The first grab
        /// happens on the first tick, one interval from now.
        pub fn start(&self) -> OverlayResult<()> {
            let refresh = PERISCOPE_STATE.with(|s| {
                s.borrow_mut().as_mut().and_then(|state| {
                    if state.session.begin() {
                        Some(state.session.refresh_ms())
                    } else {
                        None
                    }
                })
            });
            let Some(refresh) = refresh else {
                return Ok(());
            };

            unsafe {
                let hwnd = HWND(self.window as *mut std::ffi::c_void);
                ShowWindow(hwnd, SW_SHOW);
                if let Err(err) = platform::set_display_affinity(self.window, true) {
                    log::debug!("periscope affinity failed: {err}");
                }
                if SetTimer(hwnd, TICK_TIMER, refresh, None) == 0 {
                    PERISCOPE_STATE.with(|s| {
                        if let Some(state) = s.borrow_mut().as_mut() {
                            state.session.halt();
                        }
                    });
                    ShowWindow(hwnd, SW_HIDE);
                    return Err(windows::core::Error::from_win32().into());
                }
            }
            Ok(())
        }

        /// Stops the tick loop and hides the window. Idempotent.
        pub fn stop(&self) {
            let stopped = PERISCOPE_STATE.with(|s| {
                s.borrow_mut()
                    .as_mut()
                    .map(|state| state.session.halt())
                    .unwrap_or(false)
            });
            if !stopped {
                return;
            }
            unsafe {
                let hwnd = HWND(self.window as *mut std::ffi::c_void);
                let _ = KillTimer(hwnd, TICK_TIMER);
                ShowWindow(hwnd, SW_HIDE);
            }
        }

        pub fn is_running(&self) -> bool {
            PERISCOPE_STATE.with(|s| {
                s.borrow()
                    .as_ref()
                    .map(|state| state.session.is_running())
                    .unwrap_or(false)
            })
        }
    }

    impl Drop for Periscope {
        fn drop(&mut self) {
            unsafe {
                let hwnd = HWND(self.window as *mut std::ffi::c_void);
                let _ = KillTimer(hwnd, TICK_TIMER);
                let _ = DestroyWindow(hwnd);
            }
            PERISCOPE_STATE.with(|s| {
                *s.borrow_mut() = None;
            });
        }
    }

    unsafe extern "system" fn periscope_wnd_proc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        match msg {
            WM_TIMER => {
                handle_tick(hwnd);
                LRESULT(0)
            }

            WM_PAINT => {
                paint_frame(hwnd);
                LRESULT(0)
            }

            WM_CLOSE => {
                // Closing the window stops the mirror; the owner keeps
                // the handle and may start a fresh one later.
                let stopped = PERISCOPE_STATE.with(|s| {
                    s.borrow_mut()
                        .as_mut()
                        .map(|state| state.session.halt())
                        .unwrap_or(false)
                });
                if stopped {
                    let _ = KillTimer(hwnd, TICK_TIMER);
                }
                ShowWindow(hwnd, SW_HIDE);
                LRESULT(0)
            }

            _ => DefWindowProcW(hwnd, msg, wparam, lparam),
        }
    }

    unsafe fn handle_tick(hwnd: HWND) {
        let action = PERISCOPE_STATE.with(|s| {
            let mut guard = s.borrow_mut();
            let Some(state) = guard.as_mut() else {
                return TimerAction::Nothing;
            };
            if !state.session.is_running() {
                return TimerAction::Nothing;
            }
            match state.session.tick(platform::grab_rect) {
                TickOutcome::Frame(frame) => {
                    state.frame = Some(prepare_frame(hwnd, frame));
                    TimerAction::Repaint
                }
                TickOutcome::Failed { consecutive } => {
                    log::debug!("periscope grab failed ({consecutive} in a row)");
                    TimerAction::Nothing
                }
                TickOutcome::Halted { failures } => TimerAction::Halt(failures),
                TickOutcome::Skipped => TimerAction::Nothing,
            }
        });

        match action {
            TimerAction::Nothing => {}
            TimerAction::Repaint => {
                let _ = InvalidateRect(hwnd, None, false);
            }
            TimerAction::Halt(failures) => {
                log::warn!("periscope stopped after {failures} consecutive grab failures");
                let _ = KillTimer(hwnd, TICK_TIMER);
                ShowWindow(hwnd, SW_HIDE);
                let callback = PERISCOPE_STATE
                    .with(|s| s.borrow_mut().as_mut().and_then(|state| state.on_halt.take()));
                if let Some(callback) = callback {
                    callback(failures);
                }
            }
        }
    }

    /// Stretches the grabbed frame to the current client size and
    /// reorders to the BGRA layout the blit expects.
    fn prepare_frame(hwnd: HWND, frame: RgbaImage) -> FrameBuffer {
        let mut client = RECT::default();
        unsafe {
            let _ = GetClientRect(hwnd, &mut client);
        }
        let width = (client.right - client.left).max(1) as u32;
        let height = (client.bottom - client.top).max(1) as u32;

        let resized = image::imageops::resize(&frame, width, height, FilterType::Triangle);
        let mut data = resized.into_raw();
        for pixel in data.chunks_exact_mut(4) {
            pixel.swap(0, 2);
        }

        FrameBuffer {
            data,
            width: width as i32,
            height: height as i32,
        }
    }

    unsafe fn paint_frame(hwnd: HWND) {
        let mut ps = PAINTSTRUCT::default();
        let hdc = BeginPaint(hwnd, &mut ps);

        PERISCOPE_STATE.with(|s| {
            if let Some(state) = s.borrow().as_ref() {
                if let Some(frame) = state.frame.as_ref() {
                    let bmi = BITMAPINFO {
                        bmiHeader: BITMAPINFOHEADER {
                            biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                            biWidth: frame.width,
                            biHeight: -frame.height, // Top-down
                            biPlanes: 1,
                            biBitCount: 32,
                            biCompression: BI_RGB.0,
                            ..Default::default()
                        },
                        ..Default::default()
                    };

                    SetDIBitsToDevice(
                        hdc,
                        0,
                        0,
                        frame.width as u32,
                        frame.height as u32,
                        0,
                        0,
                        0,
                        frame.height as u32,
                        frame.data.as_ptr() as *const _,
                        &bmi,
                        DIB_RGB_COLORS,
                    );
                }
            }
        });

        let _ = EndPaint(hwnd, &ps);
    }
}

#[cfg(not(windows))]
mod imp {
    use platform::DisplayProvider;

    use super::PeriscopeSettings;
    use crate::{OverlayError, OverlayResult};

    pub struct Periscope;

    impl Periscope {
        pub fn open(
            _settings: &PeriscopeSettings,
            _displays: &dyn DisplayProvider,
            _on_halt: Box<dyn Fn(u32)>,
        ) -> OverlayResult<Self> {
            Err(OverlayError::Unsupported)
        }

        pub fn start(&self) -> OverlayResult<()> {
            Ok(())
        }

        pub fn stop(&self) {}

        pub fn is_running(&self) -> bool {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use platform::PlatformError;
    use std::cell::Cell;

    fn session() -> CaptureSession {
        CaptureSession::new(Rect::new(0, 0, 1920, 1080), 120, 3)
    }

    fn frame() -> RgbaImage {
        RgbaImage::new(4, 4)
    }

    #[test]
    fn begin_and_halt_are_single_shot() {
        let mut s = session();
        assert!(s.begin());
        assert!(!s.begin());
        assert!(s.halt());
        assert!(!s.halt());
    }

    #[test]
    fn nothing_is_grabbed_before_the_first_tick() {
        let grabs = Cell::new(0u32);
        let mut s = session();
        s.begin();
        s.halt();

        // A tick arriving after the stop must not touch the screen.
        let outcome = s.tick(|_| {
            grabs.set(grabs.get() + 1);
            Ok(frame())
        });
        assert!(matches!(outcome, TickOutcome::Skipped));
        assert_eq!(grabs.get(), 0);
    }

    #[test]
    fn tick_grabs_the_configured_bounds() {
        let seen = Cell::new(Rect::default());
        let mut s = CaptureSession::new(Rect::new(1920, 0, 2560, 1440), 120, 0);
        s.begin();
        let outcome = s.tick(|bounds| {
            seen.set(bounds);
            Ok(frame())
        });
        assert!(matches!(outcome, TickOutcome::Frame(_)));
        assert_eq!(seen.get(), Rect::new(1920, 0, 2560, 1440));
    }

    #[test]
    fn failure_streak_halts_at_the_limit() {
        let mut s = session();
        s.begin();

        let fail = |_| -> platform::PlatformResult<RgbaImage> {
            Err(PlatformError::Grab("display lost".into()))
        };
        assert!(matches!(
            s.tick(fail),
            TickOutcome::Failed { consecutive: 1 }
        ));
        assert!(matches!(
            s.tick(fail),
            TickOutcome::Failed { consecutive: 2 }
        ));
        assert!(matches!(s.tick(fail), TickOutcome::Halted { failures: 3 }));
        assert!(!s.is_running());
        assert!(matches!(s.tick(fail), TickOutcome::Skipped));
    }

    #[test]
    fn a_good_frame_resets_the_failure_streak() {
        let mut s = session();
        s.begin();

        let fail = |_| -> platform::PlatformResult<RgbaImage> {
            Err(PlatformError::Grab("display lost".into()))
        };
        s.tick(fail);
        s.tick(fail);
        assert!(matches!(s.tick(|_| Ok(frame())), TickOutcome::Frame(_)));
        // Two more failures stay below the limit of three.
        s.tick(fail);
        assert!(matches!(
            s.tick(fail),
            TickOutcome::Failed { consecutive: 2 }
        ));
        assert!(s.is_running());
    }

    #[test]
    fn zero_limit_never_halts() {
        let mut s = CaptureSession::new(Rect::new(0, 0, 100, 100), 120, 0);
        s.begin();
        let fail = |_| -> platform::PlatformResult<RgbaImage> {
            Err(PlatformError::Grab("display lost".into()))
        };
        for _ in 0..200 {
            assert!(matches!(s.tick(fail), TickOutcome::Failed { .. }));
        }
        assert!(s.is_running());
    }

    #[test]
    fn nonpositive_refresh_falls_back_to_the_default() {
        let s = CaptureSession::new(Rect::new(0, 0, 100, 100), 0, 0);
        assert_eq!(s.refresh_ms(), DEFAULT_REFRESH_MS);
        let s = CaptureSession::new(Rect::new(0, 0, 100, 100), 250, 0);
        assert_eq!(s.refresh_ms(), 250);
    }

    #[test]
    fn restart_clears_the_failure_streak() {
        let mut s = session();
        s.begin();
        let fail = |_| -> platform::PlatformResult<RgbaImage> {
            Err(PlatformError::Grab("display lost".into()))
        };
        s.tick(fail);
        s.tick(fail);
        s.halt();
        s.begin();
        assert!(matches!(
            s.tick(fail),
            TickOutcome::Failed { consecutive: 1 }
        ));
    }
}
