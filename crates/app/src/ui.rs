//! Main control panel
//!
//! One plain Win32 window with classic controls. Everything mutable
//! lives in a thread-local `App` owned by the UI thread; background
//! work re-enters through the dispatcher, so control handles, the
//! overlay and the periscope never cross threads.

use geometry::Rect;
use overlay::PeriscopeSettings;
use platform::Monitor;

use crate::config::Config;
use crate::i18n::Translator;

/// Status-line rendering of a captured region.
pub(crate) fn format_region(region: Rect) -> String {
    format!(
        "({}, {}, {}, {})",
        region.x, region.y, region.width, region.height
    )
}

/// Text for the display-list box, one monitor per line. An empty
/// snapshot is reported as a single default display so the box never
/// goes blank.
pub(crate) fn build_display_list(i18n: &Translator, monitors: &[Monitor]) -> String {
    if monitors.is_empty() {
        let header = i18n.format("label.detected_displays", &["1"]);
        return format!("{header}\r\n[0] default");
    }
    let mut lines = vec![i18n.format("label.detected_displays", &[&monitors.len().to_string()])];
    for (index, monitor) in monitors.iter().enumerate() {
        let bounds = monitor.bounds;
        let primary = if monitor.is_primary { " primary" } else { "" };
        lines.push(format!(
            "[{index}] {} {},{} {}x{}{primary}",
            monitor.id, bounds.x, bounds.y, bounds.width, bounds.height
        ));
    }
    lines.join("\r\n")
}

/// Periscope parameters from configuration. Negative values clamp to
/// zero and the capture session substitutes its defaults from there.
pub(crate) fn periscope_settings(config: &Config, display_id: &str) -> PeriscopeSettings {
    let defaults = PeriscopeSettings::default();
    PeriscopeSettings {
        display_id: display_id.trim().to_string(),
        refresh_ms: config
            .get_int("PERISCOPE_REFRESH_MS", defaults.refresh_ms as i64)
            .max(0) as u32,
        width: config
            .get_int("PERISCOPE_WINDOW_WIDTH", defaults.width as i64)
            .max(0) as u32,
        height: config
            .get_int("PERISCOPE_WINDOW_HEIGHT", defaults.height as i64)
            .max(0) as u32,
        failure_limit: config
            .get_int("PERISCOPE_FAILURE_LIMIT", defaults.failure_limit as i64)
            .max(0) as u32,
    }
}

#[cfg(windows)]
pub use imp::{autostart_periscope, request_capture_solve, MainWindow};

#[cfg(windows)]
mod imp {
    use std::cell::RefCell;
    use std::sync::atomic::{AtomicIsize, Ordering};
    use std::sync::Arc;

    use geometry::Rect;
    use overlay::{select_region, AnswerOverlay, Periscope};
    use platform::{DisplayProvider, NativeDisplays};
    use solver::VisionService;
    use windows::core::{w, PCWSTR};
    use windows::Win32::Foundation::{COLORREF, HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
    use windows::Win32::Graphics::Gdi::{
        CreateSolidBrush, SetBkMode, UpdateWindow, HDC, TRANSPARENT,
    };
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::Controls::BST_CHECKED;
    use windows::Win32::UI::Input::KeyboardAndMouse::EnableWindow;
    use windows::Win32::UI::WindowsAndMessaging::*;

    use super::{build_display_list, format_region, periscope_settings};
    use crate::config::Config;
    use crate::dispatch::{UiDispatcher, WM_APP_DISPATCH};
    use crate::i18n::Translator;

    /// Window dimensions
    const WINDOW_WIDTH: i32 = 560;
    const WINDOW_HEIGHT: i32 = 620;

    const MARGIN: i32 = 20;
    const BTN_WIDTH: i32 = 160;
    const BTN_HEIGHT: i32 = 32;
    const BTN_SPACING: i32 = 12;
    const LABEL_WIDTH: i32 = 190;
    const EDIT_WIDTH: i32 = 200;
    const EDIT_HEIGHT: i32 = 24;

    /// Control IDs
    const ID_BTN_SELECT: u16 = 101;
    const ID_BTN_SOLVE: u16 = 102;
    const ID_BTN_TOGGLE: u16 = 103;
    const ID_BTN_APPLY: u16 = 104;
    const ID_BTN_REFRESH: u16 = 105;
    const ID_BTN_PERISCOPE: u16 = 106;
    const ID_EDIT_OVERLAY_ID: u16 = 201;
    const ID_CHECK_EXCLUDE: u16 = 202;
    const ID_EDIT_PERISCOPE_ID: u16 = 203;
    const ID_COMBO_LANGUAGE: u16 = 204;

    const BG_COLOR: u32 = 0x00F5_F5F5; // Light gray background
    static BG_BRUSH: AtomicIsize = AtomicIsize::new(0);

    /// Locales offered in the language combo, in display order.
    const LOCALES: [&str; 2] = ["zh_CN", "en_US"];

    thread_local! {
        static APP: RefCell<Option<App>> = RefCell::new(None);
    }

    // Raw control handles; the UI thread owns every one of them.
    struct Controls {
        btn_select: isize,
        btn_solve: isize,
        btn_toggle: isize,
        btn_apply: isize,
        btn_refresh: isize,
        btn_periscope: isize,
        edit_overlay_id: isize,
        edit_periscope_id: isize,
        check_exclude: isize,
        combo_language: isize,
        section_actions: isize,
        section_display: isize,
        label_overlay_id: isize,
        label_periscope_id: isize,
        label_language: isize,
        display_list: isize,
        status: isize,
    }

    struct App {
        window: isize,
        controls: Controls,
        i18n: Translator,
        config: Config,
        displays: NativeDisplays,
        overlay: AnswerOverlay,
        periscope: Option<Periscope>,
        vision: Arc<VisionService>,
        region: Option<Rect>,
        is_processing: bool,
    }

    fn with_app<R>(f: impl FnOnce(&mut App) -> R) -> Option<R> {
        APP.with(|cell| cell.borrow_mut().as_mut().map(f))
    }

    fn isize_to_hwnd(val: isize) -> HWND {
        HWND(val as *mut std::ffi::c_void)
    }

    /// Main window
    pub struct MainWindow {
        hwnd: HWND,
    }

    impl MainWindow {
        const CLASS_NAME: PCWSTR = w!("SpyglassMain");

        /// Create the main window and the hidden answer overlay, wire
        /// both to configuration, and park the whole bundle in the
        /// thread-local so command handlers can reach it.
        pub fn create(
            config: Config,
            i18n: Translator,
            vision: Arc<VisionService>,
        ) -> anyhow::Result<Self> {
            unsafe {
                let hmodule = GetModuleHandleW(None)?;
                let hinstance = HINSTANCE(hmodule.0);

                let bg_brush = CreateSolidBrush(COLORREF(BG_COLOR));
                BG_BRUSH.store(bg_brush.0 as isize, Ordering::Relaxed);

                let wc = WNDCLASSEXW {
                    cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
                    style: CS_HREDRAW | CS_VREDRAW,
                    lpfnWndProc: Some(Self::wnd_proc),
                    hInstance: hinstance,
                    hCursor: LoadCursorW(None, IDC_ARROW)?,
                    hbrBackground: bg_brush,
                    lpszClassName: Self::CLASS_NAME,
                    ..Default::default()
                };

                RegisterClassExW(&wc);

                // Center on the primary monitor
                let screen_width = GetSystemMetrics(SM_CXSCREEN);
                let screen_height = GetSystemMetrics(SM_CYSCREEN);
                let x = (screen_width - WINDOW_WIDTH) / 2;
                let y = (screen_height - WINDOW_HEIGHT) / 2;

                let hwnd = CreateWindowExW(
                    WINDOW_EX_STYLE::default(),
                    Self::CLASS_NAME,
                    w!("Spyglass"),
                    WS_OVERLAPPED | WS_CAPTION | WS_SYSMENU | WS_MINIMIZEBOX,
                    x,
                    y,
                    WINDOW_WIDTH,
                    WINDOW_HEIGHT,
                    HWND::default(),
                    HMENU::default(),
                    hinstance,
                    None,
                )?;

                let controls = create_controls(hwnd, hinstance)?;

                let placeholder = i18n.tr("overlay.no_answer");
                let overlay = AnswerOverlay::create(&placeholder)?;

                let mut app = App {
                    window: hwnd.0 as isize,
                    controls,
                    i18n,
                    config,
                    displays: NativeDisplays,
                    overlay,
                    periscope: None,
                    vision,
                    region: None,
                    is_processing: false,
                };

                let overlay_id = app.config.get_or("OVERLAY_DISPLAY_ID", "");
                let exclude = app.config.get_bool("OVERLAY_EXCLUDE_FROM_CAPTURE", true);
                app.overlay.set_target_display_id(&overlay_id);
                app.overlay.set_exclude_from_capture(exclude);
                set_text(app.controls.edit_overlay_id, &overlay_id);
                set_checked(app.controls.check_exclude, exclude);
                set_text(
                    app.controls.edit_periscope_id,
                    &app.config.get_or("PERISCOPE_DISPLAY_ID", ""),
                );
                populate_language_combo(app.controls.combo_language, app.i18n.locale());

                update_texts(&mut app);
                refresh_display_list(&mut app);

                APP.with(|cell| {
                    *cell.borrow_mut() = Some(app);
                });

                Ok(Self { hwnd })
            }
        }

        /// Show the window
        pub fn show(&self) {
            unsafe {
                ShowWindow(self.hwnd, SW_SHOW);
                let _ = UpdateWindow(self.hwnd);
            }
        }

        pub fn raw(&self) -> isize {
            self.hwnd.0 as isize
        }

        /// Run message loop
        pub fn run_message_loop() -> i32 {
            unsafe {
                let mut msg = MSG::default();
                while GetMessageW(&mut msg, None, 0, 0).into() {
                    let _ = TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                }
                msg.wParam.0 as i32
            }
        }

        unsafe extern "system" fn wnd_proc(
            hwnd: HWND,
            msg: u32,
            wparam: WPARAM,
            lparam: LPARAM,
        ) -> LRESULT {
            match msg {
                WM_COMMAND => {
                    let id = (wparam.0 & 0xFFFF) as u16;
                    let code = ((wparam.0 >> 16) & 0xFFFF) as u32;

                    match id {
                        ID_BTN_SELECT => on_select_region(),
                        ID_BTN_SOLVE => request_capture_solve(),
                        ID_BTN_TOGGLE => on_toggle_overlay(),
                        ID_BTN_APPLY => on_apply_display_settings(),
                        ID_BTN_REFRESH => {
                            let _ = with_app(refresh_display_list);
                        }
                        ID_BTN_PERISCOPE => on_toggle_periscope(),
                        ID_COMBO_LANGUAGE if code == CBN_SELCHANGE as u32 => on_language_changed(),
                        _ => {}
                    }

                    LRESULT(0)
                }

                WM_CTLCOLORSTATIC => {
                    let brush = BG_BRUSH.load(Ordering::Relaxed);
                    if brush == 0 {
                        return DefWindowProcW(hwnd, msg, wparam, lparam);
                    }
                    SetBkMode(HDC(wparam.0 as *mut std::ffi::c_void), TRANSPARENT);
                    LRESULT(brush)
                }

                WM_APP_DISPATCH => {
                    UiDispatcher::global().drain();
                    LRESULT(0)
                }

                WM_CLOSE => {
                    let _ = DestroyWindow(hwnd);
                    LRESULT(0)
                }

                WM_DESTROY => {
                    // Dropping the app tears down the overlay and the
                    // periscope while the thread still pumps messages.
                    APP.with(|cell| {
                        *cell.borrow_mut() = None;
                    });
                    PostQuitMessage(0);
                    LRESULT(0)
                }

                _ => DefWindowProcW(hwnd, msg, wparam, lparam),
            }
        }
    }

    #[rustfmt::skip]
    unsafe fn create_controls(hwnd: HWND, hinstance: HINSTANCE) -> windows::core::Result<Controls> {
        let button = WS_CHILD | WS_VISIBLE | WINDOW_STYLE(BS_PUSHBUTTON as u32);
        let label = WS_CHILD | WS_VISIBLE;
        let edit = WS_CHILD | WS_VISIBLE | WS_BORDER | WINDOW_STYLE(ES_AUTOHSCROLL as u32);
        let checkbox = WS_CHILD | WS_VISIBLE | WINDOW_STYLE(BS_AUTOCHECKBOX as u32);
        let combo = WS_CHILD | WS_VISIBLE | WS_VSCROLL | WINDOW_STYLE(CBS_DROPDOWNLIST as u32);

        Ok(Controls {
            section_actions: create_control(hwnd, hinstance, w!("STATIC"), label, 0, MARGIN, 16, 300, 20)?,
            btn_select: create_control(hwnd, hinstance, w!("BUTTON"), button, ID_BTN_SELECT, MARGIN, 44, BTN_WIDTH, BTN_HEIGHT)?,
            btn_solve: create_control(hwnd, hinstance, w!("BUTTON"), button, ID_BTN_SOLVE, MARGIN + BTN_WIDTH + BTN_SPACING, 44, BTN_WIDTH, BTN_HEIGHT)?,
            btn_toggle: create_control(hwnd, hinstance, w!("BUTTON"), button, ID_BTN_TOGGLE, MARGIN + (BTN_WIDTH + BTN_SPACING) * 2, 44, BTN_WIDTH, BTN_HEIGHT)?,
            section_display: create_control(hwnd, hinstance, w!("STATIC"), label, 0, MARGIN, 96, 300, 20)?,
            label_overlay_id: create_control(hwnd, hinstance, w!("STATIC"), label, 0, MARGIN, 126, LABEL_WIDTH, 20)?,
            edit_overlay_id: create_control(hwnd, hinstance, w!("EDIT"), edit, ID_EDIT_OVERLAY_ID, MARGIN + LABEL_WIDTH + 4, 124, EDIT_WIDTH, EDIT_HEIGHT)?,
            check_exclude: create_control(hwnd, hinstance, w!("BUTTON"), checkbox, ID_CHECK_EXCLUDE, MARGIN, 156, 400, 24)?,
            btn_apply: create_control(hwnd, hinstance, w!("BUTTON"), button, ID_BTN_APPLY, MARGIN, 188, BTN_WIDTH, BTN_HEIGHT)?,
            btn_refresh: create_control(hwnd, hinstance, w!("BUTTON"), button, ID_BTN_REFRESH, MARGIN + BTN_WIDTH + BTN_SPACING, 188, BTN_WIDTH, BTN_HEIGHT)?,
            label_periscope_id: create_control(hwnd, hinstance, w!("STATIC"), label, 0, MARGIN, 234, LABEL_WIDTH, 20)?,
            edit_periscope_id: create_control(hwnd, hinstance, w!("EDIT"), edit, ID_EDIT_PERISCOPE_ID, MARGIN + LABEL_WIDTH + 4, 232, EDIT_WIDTH, EDIT_HEIGHT)?,
            btn_periscope: create_control(hwnd, hinstance, w!("BUTTON"), button, ID_BTN_PERISCOPE, MARGIN, 264, BTN_WIDTH, BTN_HEIGHT)?,
            label_language: create_control(hwnd, hinstance, w!("STATIC"), label, 0, MARGIN, 310, LABEL_WIDTH, 20)?,
            combo_language: create_control(hwnd, hinstance, w!("COMBOBOX"), combo, ID_COMBO_LANGUAGE, MARGIN + LABEL_WIDTH + 4, 306, 160, 200)?,
            display_list: create_control(hwnd, hinstance, w!("STATIC"), label, 0, MARGIN, 344, 520, 150)?,
            status: create_control(hwnd, hinstance, w!("STATIC"), label, 0, MARGIN, 502, 520, 40)?,
        })
    }

    unsafe fn create_control(
        parent: HWND,
        hinstance: HINSTANCE,
        class: PCWSTR,
        style: WINDOW_STYLE,
        id: u16,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> windows::core::Result<isize> {
        let hwnd = CreateWindowExW(
            WINDOW_EX_STYLE::default(),
            class,
            PCWSTR::null(),
            style,
            x,
            y,
            width,
            height,
            parent,
            HMENU(id as _),
            hinstance,
            None,
        )?;
        Ok(hwnd.0 as isize)
    }

    fn set_text(handle: isize, text: &str) {
        if handle == 0 {
            return;
        }
        let wide: Vec<u16> = text.encode_utf16().chain(std::iter::once(0)).collect();
        unsafe {
            let _ = SetWindowTextW(isize_to_hwnd(handle), PCWSTR(wide.as_ptr()));
        }
    }

    fn control_text(handle: isize) -> String {
        unsafe {
            let hwnd = isize_to_hwnd(handle);
            let len = GetWindowTextLengthW(hwnd);
            if len <= 0 {
                return String::new();
            }
            let mut buffer = vec![0u16; len as usize + 1];
            let copied = GetWindowTextW(hwnd, &mut buffer);
            String::from_utf16_lossy(&buffer[..copied.max(0) as usize])
        }
    }

    fn set_checked(handle: isize, checked: bool) {
        let value = if checked { BST_CHECKED.0 as usize } else { 0 };
        unsafe {
            SendMessageW(isize_to_hwnd(handle), BM_SETCHECK, WPARAM(value), LPARAM(0));
        }
    }

    fn is_checked(handle: isize) -> bool {
        unsafe {
            SendMessageW(isize_to_hwnd(handle), BM_GETCHECK, WPARAM(0), LPARAM(0)).0 as u32
                == BST_CHECKED.0
        }
    }

    fn populate_language_combo(handle: isize, current: &str) {
        let hwnd = isize_to_hwnd(handle);
        unsafe {
            SendMessageW(hwnd, CB_RESETCONTENT, WPARAM(0), LPARAM(0));
            for locale in LOCALES {
                let wide: Vec<u16> = locale.encode_utf16().chain(std::iter::once(0)).collect();
                SendMessageW(hwnd, CB_ADDSTRING, WPARAM(0), LPARAM(wide.as_ptr() as isize));
            }
            let index = LOCALES.iter().position(|l| *l == current).unwrap_or(0);
            SendMessageW(hwnd, CB_SETCURSEL, WPARAM(index), LPARAM(0));
        }
    }

    fn set_status(app: &App, text: &str) {
        set_text(app.controls.status, text);
    }

    fn enable_capture_buttons(app: &App, enabled: bool) {
        unsafe {
            let _ = EnableWindow(isize_to_hwnd(app.controls.btn_solve), enabled);
            let _ = EnableWindow(isize_to_hwnd(app.controls.btn_select), enabled);
        }
    }

    /// Re-labels every control for the active locale. Also resets the
    /// status line, so a language switch reads as a fresh start.
    fn update_texts(app: &mut App) {
        set_text(app.window, &app.i18n.tr("app.title"));
        set_text(app.controls.section_actions, &app.i18n.tr("section.actions"));
        set_text(app.controls.section_display, &app.i18n.tr("section.display"));
        set_text(app.controls.btn_select, &app.i18n.tr("button.select_region"));
        set_text(app.controls.btn_solve, &app.i18n.tr("button.capture_solve"));
        set_text(app.controls.btn_toggle, &app.i18n.tr("button.toggle_overlay"));
        set_text(app.controls.btn_apply, &app.i18n.tr("button.apply_display"));
        set_text(app.controls.btn_refresh, &app.i18n.tr("button.refresh_displays"));
        set_text(
            app.controls.label_overlay_id,
            &app.i18n.tr("label.overlay_display_id"),
        );
        set_text(
            app.controls.check_exclude,
            &app.i18n.tr("label.exclude_capture"),
        );
        set_text(
            app.controls.label_periscope_id,
            &app.i18n.tr("label.periscope_display_id"),
        );
        set_text(app.controls.label_language, &app.i18n.tr("label.language"));
        set_text(app.controls.status, &app.i18n.tr("status.region_not_set"));
        update_periscope_button(app);

        let displays = app.displays;
        let placeholder = app.i18n.tr("overlay.no_answer");
        app.overlay.set_placeholder(&placeholder, &displays);
    }

    fn update_periscope_button(app: &App) {
        let running = app
            .periscope
            .as_ref()
            .map(|periscope| periscope.is_running())
            .unwrap_or(false);
        let key = if running {
            "button.stop_periscope"
        } else {
            "button.start_periscope"
        };
        set_text(app.controls.btn_periscope, &app.i18n.tr(key));
    }

    fn refresh_display_list(app: &mut App) {
        let monitors = app.displays.monitors();
        let text = build_display_list(&app.i18n, &monitors);
        set_text(app.controls.display_list, &text);
    }

    fn on_select_region() {
        let _ = with_app(|app| {
            set_status(app, &app.i18n.tr("status.selecting"));
        });

        // Modal; the thread-local must not stay borrowed while the
        // picker pumps messages.
        let picked = select_region();

        let _ = with_app(|app| match picked {
            Ok(Some(region)) if !region.is_empty() => {
                app.region = Some(region);
                let displays = app.displays;
                app.overlay.show(Some(region), &displays);
                let note = app.i18n.tr("overlay.region_selected");
                app.overlay.set_answer(&note, &displays);
                let status = app.i18n.format("status.region", &[&format_region(region)]);
                set_status(app, &status);
            }
            Ok(_) => {
                set_status(app, &app.i18n.tr("status.region_not_set"));
            }
            Err(ref err) => {
                log::error!("region selection failed: {err}");
                set_status(app, &app.i18n.tr("status.region_not_set"));
            }
        });
    }

    /// Grabs the selected region and streams the answer into the
    /// overlay. Reached from the solve button and the global hotkey.
    pub fn request_capture_solve() {
        let job = with_app(|app| {
            if app.is_processing {
                set_status(app, &app.i18n.tr("status.analyzing"));
                return None;
            }
            let Some(region) = app.region else {
                set_status(app, &app.i18n.tr("status.region_not_set"));
                return None;
            };

            app.is_processing = true;
            set_status(app, &app.i18n.tr("status.analyzing"));
            enable_capture_buttons(app, false);

            let displays = app.displays;
            app.overlay.show(Some(region), &displays);
            let processing = app.i18n.tr("overlay.processing");
            app.overlay.set_answer(&processing, &displays);

            Some((region, Arc::clone(&app.vision)))
        })
        .flatten();

        let Some((region, vision)) = job else {
            return;
        };

        std::thread::spawn(move || {
            let outcome = run_solve(region, &vision);
            UiDispatcher::global().post(move || finish_solve(outcome));
        });
    }

    fn run_solve(region: Rect, vision: &VisionService) -> anyhow::Result<String> {
        let frame = platform::grab_rect(region)?;
        let mut answer = String::new();
        vision.recognize_stream(frame, |chunk| {
            answer.push_str(chunk);
            let text = answer.clone();
            UiDispatcher::global().post(move || show_answer(&text));
        })?;
        Ok(answer)
    }

    fn show_answer(text: &str) {
        let _ = with_app(|app| {
            let displays = app.displays;
            app.overlay.set_answer(text, &displays);
        });
    }

    fn finish_solve(outcome: anyhow::Result<String>) {
        let _ = with_app(|app| {
            app.is_processing = false;
            enable_capture_buttons(app, true);

            let displays = app.displays;
            match &outcome {
                Ok(answer) => {
                    app.overlay.set_answer(answer, &displays);
                    set_status(app, &app.i18n.tr("status.done"));
                }
                Err(err) => {
                    log::error!("capture and solve failed: {err:#}");
                    let message = app.i18n.format("overlay.error", &[&err.to_string()]);
                    app.overlay.set_answer(&message, &displays);
                    set_status(app, &app.i18n.tr("status.error"));
                }
            }
        });
    }

    fn on_toggle_overlay() {
        let _ = with_app(|app| {
            if app.overlay.is_visible() {
                app.overlay.hide();
            } else {
                let displays = app.displays;
                let region = app.region;
                app.overlay.show(region, &displays);
            }
        });
    }

    fn on_apply_display_settings() {
        let _ = with_app(|app| {
            let id = control_text(app.controls.edit_overlay_id);
            app.overlay.set_target_display_id(&id);
            let exclude = is_checked(app.controls.check_exclude);
            app.overlay.set_exclude_from_capture(exclude);
            if app.overlay.is_visible() {
                let displays = app.displays;
                let region = app.region;
                app.overlay.show(region, &displays);
            }
        });
    }

    fn on_toggle_periscope() {
        let _ = with_app(|app| {
            if let Some(periscope) = app.periscope.take() {
                periscope.stop();
                set_status(app, &app.i18n.tr("status.periscope_stopped"));
                update_periscope_button(app);
                return;
            }
            let display_id = control_text(app.controls.edit_periscope_id);
            start_periscope(app, &display_id);
        });
    }

    fn start_periscope(app: &mut App, display_id: &str) {
        if display_id.trim().is_empty() {
            set_status(app, &app.i18n.tr("status.periscope_missing_id"));
            return;
        }

        let settings = periscope_settings(&app.config, display_id);
        let displays = app.displays;
        // Fires on the UI thread from the mirror's own tick handler,
        // never while the thread-local is borrowed.
        let on_halt: Box<dyn Fn(u32)> = Box::new(|failures| {
            let _ = with_app(|app| {
                app.periscope = None;
                let detail = format!("{failures} grab failures in a row");
                let status = app.i18n.format("status.periscope_failed", &[&detail]);
                set_status(app, &status);
                update_periscope_button(app);
            });
        });

        let started = Periscope::open(&settings, &displays, on_halt).and_then(|periscope| {
            periscope.start()?;
            Ok(periscope)
        });
        match started {
            Ok(periscope) => {
                app.periscope = Some(periscope);
                set_status(app, &app.i18n.tr("status.periscope_started"));
            }
            Err(err) => {
                log::error!("periscope start failed: {err}");
                let status = app.i18n.format("status.periscope_failed", &[&err.to_string()]);
                set_status(app, &status);
            }
        }
        update_periscope_button(app);
    }

    /// Starts the periscope at launch when configuration names a
    /// display for it.
    pub fn autostart_periscope() {
        let _ = with_app(|app| {
            let configured = app.config.get_or("PERISCOPE_DISPLAY_ID", "");
            if configured.trim().is_empty() {
                return;
            }
            start_periscope(app, &configured);
        });
    }

    fn on_language_changed() {
        let _ = with_app(|app| {
            let index = unsafe {
                SendMessageW(
                    isize_to_hwnd(app.controls.combo_language),
                    CB_GETCURSEL,
                    WPARAM(0),
                    LPARAM(0),
                )
                .0
            };
            let Some(locale) = LOCALES.get(index as usize) else {
                return;
            };
            if app.i18n.set_locale(locale) {
                update_texts(app);
                refresh_display_list(app);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::Monitor;

    fn monitor(id: &str, bounds: Rect, is_primary: bool) -> Monitor {
        Monitor {
            id: id.to_string(),
            bounds,
            work_area: bounds,
            is_primary,
        }
    }

    #[test]
    fn region_status_matches_capture_coordinates() {
        assert_eq!(
            format_region(Rect::new(10, -20, 300, 200)),
            "(10, -20, 300, 200)"
        );
    }

    #[test]
    fn display_list_names_every_monitor() {
        let i18n = Translator::new("en_US");
        let monitors = vec![
            monitor(r"\\.\DISPLAY1", Rect::new(0, 0, 1920, 1080), true),
            monitor(r"\\.\DISPLAY2", Rect::new(1920, 0, 2560, 1440), false),
        ];
        let text = build_display_list(&i18n, &monitors);
        let lines: Vec<&str> = text.split("\r\n").collect();
        assert_eq!(lines[0], "Detected displays: 2");
        assert_eq!(lines[1], r"[0] \\.\DISPLAY1 0,0 1920x1080 primary");
        assert_eq!(lines[2], r"[1] \\.\DISPLAY2 1920,0 2560x1440");
    }

    #[test]
    fn empty_display_list_reports_one_default() {
        let i18n = Translator::new("en_US");
        let text = build_display_list(&i18n, &[]);
        assert_eq!(text, "Detected displays: 1\r\n[0] default");
    }

    #[test]
    fn periscope_settings_read_configuration() {
        let config = Config::from_pairs(&[
            ("PERISCOPE_REFRESH_MS", "250"),
            ("PERISCOPE_WINDOW_WIDTH", "800"),
            ("PERISCOPE_WINDOW_HEIGHT", "450"),
            ("PERISCOPE_FAILURE_LIMIT", "10"),
        ]);
        let settings = periscope_settings(&config, "  DISPLAY2 ");
        assert_eq!(settings.display_id, "DISPLAY2");
        assert_eq!(settings.refresh_ms, 250);
        assert_eq!((settings.width, settings.height), (800, 450));
        assert_eq!(settings.failure_limit, 10);
    }

    #[test]
    fn periscope_settings_fall_back_to_defaults() {
        let config = Config::from_pairs(&[("PERISCOPE_REFRESH_MS", "soon")]);
        let settings = periscope_settings(&config, "DISPLAY1");
        assert_eq!(settings.refresh_ms, 120);
        assert_eq!((settings.width, settings.height), (640, 360));
        assert_eq!(settings.failure_limit, 25);
    }

    #[test]
    fn negative_periscope_values_clamp_to_zero() {
        let config = Config::from_pairs(&[("PERISCOPE_FAILURE_LIMIT", "-3")]);
        let settings = periscope_settings(&config, "DISPLAY1");
        assert_eq!(settings.failure_limit, 0);
    }
}
