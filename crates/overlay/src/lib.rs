//! Overlay windows for Spyglass
//!
//! Three window types live here: the borderless answer overlay, the
//! full-screen region picker and the periscope display mirror. All of
//! them are owned by the UI thread; background workers must marshal
//! back through the app dispatcher before touching one.

pub mod answer;
pub mod periscope;
pub mod selection;
pub mod text;

pub use answer::AnswerOverlay;
pub use periscope::{CaptureSession, Periscope, PeriscopeSettings, TickOutcome};
pub use selection::select_region;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OverlayError {
    #[cfg(windows)]
    #[error("Windows API error: {0}")]
    Windows(#[from] windows::core::Error),

    #[error(transparent)]
    Platform(#[from] platform::PlatformError),

    #[error("overlay windows are not supported on this platform")]
    Unsupported,
}

pub type OverlayResult<T> = Result<T, OverlayError>;
