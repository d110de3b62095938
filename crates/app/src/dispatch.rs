//! Hands work from background threads to the UI thread.
//!
//! Worker threads queue closures here and poke the main window with a
//! `WM_APP` message; the window procedure drains the queue on the UI
//! thread, where every control and overlay handle lives.

use crossbeam_channel::{unbounded, Receiver, Sender};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

#[cfg(windows)]
pub const WM_APP_DISPATCH: u32 = windows::Win32::UI::WindowsAndMessaging::WM_APP + 1;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

static DISPATCHER: OnceCell<UiDispatcher> = OnceCell::new();

pub struct UiDispatcher {
    queue_tx: Sender<Task>,
    queue_rx: Receiver<Task>,
    window: Mutex<isize>,
}

impl UiDispatcher {
    fn new() -> Self {
        let (queue_tx, queue_rx) = unbounded();
        Self {
            queue_tx,
            queue_rx,
            window: Mutex::new(0),
        }
    }

    pub fn global() -> &'static UiDispatcher {
        DISPATCHER.get_or_init(UiDispatcher::new)
    }

    /// Registers the window that gets poked when tasks arrive.
    pub fn attach(&self, window: isize) {
        *self.window.lock() = window;
    }

    /// Queues a task and wakes the UI message loop.
    pub fn post<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let _ = self.queue_tx.send(Box::new(task));
        self.wake();
    }

    /// Runs every queued task. UI thread only.
    pub fn drain(&self) {
        while let Ok(task) = self.queue_rx.try_recv() {
            task();
        }
    }

    #[cfg(windows)]
    fn wake(&self) {
        use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
        use windows::Win32::UI::WindowsAndMessaging::PostMessageW;

        let raw = *self.window.lock();
        if raw == 0 {
            return;
        }
        let hwnd = HWND(raw as *mut core::ffi::c_void);
        unsafe {
            let _ = PostMessageW(hwnd, WM_APP_DISPATCH, WPARAM(0), LPARAM(0));
        }
    }

    #[cfg(not(windows))]
    fn wake(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn drain_runs_tasks_in_posting_order() {
        let dispatcher = UiDispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let seen = Arc::clone(&seen);
            dispatcher.post(move || seen.lock().push(i));
        }
        dispatcher.drain();
        assert_eq!(*seen.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn tasks_run_exactly_once() {
        let dispatcher = UiDispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        dispatcher.post(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        dispatcher.drain();
        dispatcher.drain();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn posts_from_other_threads_arrive() {
        let dispatcher = Arc::new(UiDispatcher::new());
        let hits = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let dispatcher = Arc::clone(&dispatcher);
            let hits = Arc::clone(&hits);
            handles.push(std::thread::spawn(move || {
                let counter = Arc::clone(&hits);
                dispatcher.post(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            }));
        }
        for handle in handles {
            let _ = handle.join();
        }
        dispatcher.drain();
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }
}
