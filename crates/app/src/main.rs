//! Spyglass - screen region capture with a streamed vision answer overlay

#![windows_subsystem = "windows"]

mod config;
mod dispatch;
mod i18n;
mod ui;

use crate::config::Config;
use crate::i18n::Translator;

#[cfg(windows)]
fn main() -> anyhow::Result<()> {
    use std::sync::Arc;

    use crate::dispatch::UiDispatcher;
    use crate::ui::MainWindow;
    use platform::HotkeyListener;
    use solver::{BackendClient, VisionService};
    use windows::Win32::UI::HiDpi::{
        SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Set DPI awareness before any window exists
    unsafe {
        let _ = SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2);
    }

    let config = Config::load_default();

    let backend_url = config.get_or("BACKEND_URL", "http://localhost:8080");
    let backend = Arc::new(BackendClient::new(&backend_url)?);
    let vision = Arc::new(VisionService::new(backend));

    let locale = config.get_or("APP_LOCALE", i18n::DEFAULT_LOCALE);
    let i18n = Translator::new(&locale);

    let window = MainWindow::create(config, i18n, vision)?;
    UiDispatcher::global().attach(window.raw());

    // Ctrl+P captures the selected region from anywhere
    const VK_P: u32 = 0x50;
    let mut hotkey = match HotkeyListener::start(VK_P, || {
        UiDispatcher::global().post(ui::request_capture_solve);
    }) {
        Ok(listener) => Some(listener),
        Err(err) => {
            log::warn!("global hotkey unavailable: {err}");
            None
        }
    };

    window.show();
    ui::autostart_periscope();

    let exit_code = MainWindow::run_message_loop();

    if let Some(listener) = hotkey.as_mut() {
        listener.stop();
    }

    log::info!("exiting with code {exit_code}");
    Ok(())
}

#[cfg(not(windows))]
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    anyhow::bail!("this program drives Win32 windows and only runs on Windows");
}
