//! Global hotkey listener
//!
//! One dedicated thread per listener so the blocked message wait never
//! touches the UI loop. Stopping posts a quit message to the listener
//! thread's queue and joins it.

#[cfg(windows)]
mod imp {
    use crate::{PlatformError, PlatformResult};
    use windows::Win32::Foundation::{LPARAM, WPARAM};
    use windows::Win32::System::Threading::GetCurrentThreadId;
    use windows::Win32::UI::Input::KeyboardAndMouse::{RegisterHotKey, UnregisterHotKey, MOD_CONTROL};
    use windows::Win32::UI::WindowsAndMessaging::{
        GetMessageW, PeekMessageW, PostThreadMessageW, MSG, PM_NOREMOVE, WM_HOTKEY, WM_QUIT,
        WM_USER,
    };

    const HOTKEY_ID: i32 = 1;

    /// System-wide Ctrl+key listener
    pub struct HotkeyListener {
        thread: Option<std::thread::JoinHandle<()>>,
        thread_id: u32,
    }

    impl HotkeyListener {
        /// Register Ctrl+`vk` globally. `on_press` runs on the listener
        /// thread for every chord press and must hand real work off
        /// elsewhere.
        pub fn start<F>(vk: u32, on_press: F) -> PlatformResult<Self>
        where
            F: Fn() + Send + 'static,
        {
            let (ready_tx, ready_rx) = crossbeam_channel::bounded::<PlatformResult<u32>>(1);

            let thread = std::thread::Builder::new()
                .name("global-hotkey".into())
                .spawn(move || unsafe {
                    let mut msg = MSG::default();
                    // Touch the queue before publishing the thread id so a
                    // quit posted right after startup is not dropped.
                    let _ = PeekMessageW(&mut msg, None, WM_USER, WM_USER, PM_NOREMOVE);

                    if RegisterHotKey(None, HOTKEY_ID, MOD_CONTROL, vk).is_err() {
                        let _ = ready_tx.send(Err(PlatformError::HotkeyRegistration));
                        return;
                    }
                    let _ = ready_tx.send(Ok(GetCurrentThreadId()));

                    while GetMessageW(&mut msg, None, 0, 0).0 > 0 {
                        if msg.message == WM_HOTKEY {
                            on_press();
                        }
                    }

                    let _ = UnregisterHotKey(None, HOTKEY_ID);
                })?;

            let thread_id = ready_rx
                .recv()
                .map_err(|_| PlatformError::HotkeyRegistration)??;
            log::info!("global hotkey registered: Ctrl+0x{vk:02X}");

            Ok(Self {
                thread: Some(thread),
                thread_id,
            })
        }

        /// Post a quit to the listener thread and join it
        pub fn stop(&mut self) {
            if let Some(thread) = self.thread.take() {
                unsafe {
                    let _ = PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
                }
                let _ = thread.join();
            }
        }
    }

    impl Drop for HotkeyListener {
        fn drop(&mut self) {
            self.stop();
        }
    }
}

#[cfg(not(windows))]
mod imp {
    use crate::{PlatformError, PlatformResult};

    /// System-wide Ctrl+key listener (unavailable on this platform)
    pub struct HotkeyListener;

    impl HotkeyListener {
        pub fn start<F>(_vk: u32, _on_press: F) -> PlatformResult<Self>
        where
            F: Fn() + Send + 'static,
        {
            Err(PlatformError::Unsupported)
        }

        pub fn stop(&mut self) {}
    }
}

pub use imp::HotkeyListener;
