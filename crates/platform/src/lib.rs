//! Display and window services for Spyglass
//!
//! Monitor enumeration, window capture-exclusion flags, GDI pixel
//! grabs and the global hotkey listener. All native calls live behind
//! Windows-only paths; elsewhere they degrade to empty results or
//! no-ops so the rest of the workspace builds and tests anywhere.

pub mod grab;
pub mod hotkey;
pub mod monitors;
pub mod window_flags;

pub use grab::grab_rect;
pub use hotkey::HotkeyListener;
pub use monitors::{list_monitors, primary_screen_bounds, virtual_screen_bounds, NativeDisplays};
pub use window_flags::{set_click_through, set_display_affinity, RawWindow};

use geometry::Rect;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[cfg(windows)]
    #[error("Windows API error: {0}")]
    Windows(#[from] windows::core::Error),

    #[error("screen grab failed: {0}")]
    Grab(String),

    #[error("global hotkey registration failed")]
    HotkeyRegistration,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not supported on this platform")]
    Unsupported,
}

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Immutable snapshot of one attached display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monitor {
    /// Device name, e.g. `\\.\DISPLAY1`
    pub id: String,
    /// Full monitor extent in virtual-desktop coordinates
    pub bounds: Rect,
    /// Usable area excluding taskbars
    pub work_area: Rect,
    pub is_primary: bool,
}

/// Source of display snapshots.
///
/// Implementations re-enumerate on every call; monitor topology can
/// change between queries, so nothing here caches.
pub trait DisplayProvider: Send + Sync {
    fn monitors(&self) -> Vec<Monitor>;
    fn virtual_screen(&self) -> Rect;
    fn primary_screen(&self) -> Rect;

    fn find_monitor(&self, target: &str) -> Option<Monitor> {
        let monitors = self.monitors();
        select_monitor(&monitors, target).cloned()
    }
}

/// Resolve a free-text display id against a monitor snapshot.
///
/// An empty id picks the primary-flagged monitor, else the first
/// enumerated. A non-empty id picks the first monitor whose device
/// name contains it case-insensitively, else the first enumerated.
/// `None` only when the snapshot is empty.
pub fn select_monitor<'a>(monitors: &'a [Monitor], target: &str) -> Option<&'a Monitor> {
    if monitors.is_empty() {
        return None;
    }
    let needle = target.trim().to_lowercase();
    if needle.is_empty() {
        return monitors
            .iter()
            .find(|m| m.is_primary)
            .or_else(|| monitors.first());
    }
    monitors
        .iter()
        .find(|m| m.id.to_lowercase().contains(&needle))
        .or_else(|| monitors.first())
}

/// Fixed display list for tests and headless runs
#[derive(Debug, Clone, Default)]
pub struct StaticDisplays {
    monitors: Vec<Monitor>,
}

impl StaticDisplays {
    pub fn new(monitors: Vec<Monitor>) -> Self {
        Self { monitors }
    }
}

impl DisplayProvider for StaticDisplays {
    fn monitors(&self) -> Vec<Monitor> {
        self.monitors.clone()
    }

    fn virtual_screen(&self) -> Rect {
        let mut iter = self.monitors.iter();
        let Some(first) = iter.next() else {
            return Rect::default();
        };
        let mut left = first.bounds.x;
        let mut top = first.bounds.y;
        let mut right = first.bounds.right();
        let mut bottom = first.bounds.bottom();
        for monitor in iter {
            left = left.min(monitor.bounds.x);
            top = top.min(monitor.bounds.y);
            right = right.max(monitor.bounds.right());
            bottom = bottom.max(monitor.bounds.bottom());
        }
        Rect::new(left, top, (right - left) as u32, (bottom - top) as u32)
    }

    fn primary_screen(&self) -> Rect {
        self.monitors
            .iter()
            .find(|m| m.is_primary)
            .or_else(|| self.monitors.first())
            .map(|m| m.bounds)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor(id: &str, bounds: Rect, is_primary: bool) -> Monitor {
        Monitor {
            id: id.to_string(),
            bounds,
            work_area: bounds,
            is_primary,
        }
    }

    fn two_displays() -> Vec<Monitor> {
        vec![
            monitor(r"\\.\DISPLAY1", Rect::new(0, 0, 1920, 1080), true),
            monitor(r"\\.\DISPLAY2", Rect::new(1920, 0, 1280, 1024), false),
        ]
    }

    #[test]
    fn empty_id_prefers_the_primary_monitor() {
        let monitors = two_displays();
        let found = select_monitor(&monitors, "").unwrap();
        assert_eq!(found.id, r"\\.\DISPLAY1");
    }

    #[test]
    fn empty_id_falls_back_to_first_when_nothing_is_primary() {
        let monitors = vec![
            monitor("A", Rect::new(0, 0, 100, 100), false),
            monitor("B", Rect::new(100, 0, 100, 100), false),
        ];
        assert_eq!(select_monitor(&monitors, "").unwrap().id, "A");
    }

    #[test]
    fn substring_match_is_case_insensitive() {
        let monitors = two_displays();
        let found = select_monitor(&monitors, "display2").unwrap();
        assert_eq!(found.id, r"\\.\DISPLAY2");
        let padded = select_monitor(&monitors, "  DISPLAY2  ").unwrap();
        assert_eq!(padded.id, r"\\.\DISPLAY2");
    }

    #[test]
    fn unmatched_id_falls_back_to_first_monitor() {
        let monitors = two_displays();
        let found = select_monitor(&monitors, "display9").unwrap();
        assert_eq!(found.id, r"\\.\DISPLAY1");
    }

    #[test]
    fn empty_snapshot_resolves_to_none() {
        assert!(select_monitor(&[], "").is_none());
        assert!(select_monitor(&[], "display1").is_none());
    }

    #[test]
    fn static_displays_union_spans_all_bounds() {
        let provider = StaticDisplays::new(two_displays());
        assert_eq!(provider.virtual_screen(), Rect::new(0, 0, 3200, 1080));
        assert_eq!(provider.primary_screen(), Rect::new(0, 0, 1920, 1080));
    }

    #[test]
    fn find_monitor_goes_through_the_selection_policy() {
        let provider = StaticDisplays::new(two_displays());
        assert_eq!(
            provider.find_monitor("2").map(|m| m.id),
            Some(r"\\.\DISPLAY2".to_string())
        );
        assert!(StaticDisplays::default().find_monitor("").is_none());
    }
}
