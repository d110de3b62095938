//! Screen-plane math for Spyglass
//!
//! Rectangles in virtual-desktop coordinates plus the pure placement
//! rules for the answer overlay and the periscope canvas. No I/O and
//! no platform calls, so everything here tests on any OS.

pub mod placement;

pub use placement::{
    compute_overlay_bounds, compute_overlay_bounds_for_screen, periscope_canvas_size, GAP,
    OVERLAY_MAX_HEIGHT, OVERLAY_MIN_HEIGHT, OVERLAY_WIDTH, PERISCOPE_MIN_HEIGHT,
    PERISCOPE_MIN_WIDTH,
};

/// Rectangle in physical pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Normalized rectangle spanning two arbitrary drag points
    pub fn from_corners(ax: i32, ay: i32, bx: i32, by: i32) -> Self {
        Self {
            x: ax.min(bx),
            y: ay.min(by),
            width: (ax - bx).unsigned_abs(),
            height: (ay - by).unsigned_abs(),
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right() && self.right() > other.x &&
        self.y < other.bottom() && self.bottom() > other.y
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Top-left corner for a `width` x `height` box centered inside `self`
    pub fn center_for(&self, width: u32, height: u32) -> (i32, i32) {
        let x = self.x + (self.width as i32 - width as i32) / 2;
        let y = self.y + (self.height as i32 - height as i32) / 2;
        (x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_corners_is_drag_direction_invariant() {
        let a = Rect::from_corners(10, 20, 110, 240);
        let b = Rect::from_corners(110, 240, 10, 20);
        let c = Rect::from_corners(110, 20, 10, 240);
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a, Rect::new(10, 20, 100, 220));
    }

    #[test]
    fn from_corners_same_point_is_empty() {
        let r = Rect::from_corners(5, 5, 5, 5);
        assert_eq!((r.width, r.height), (0, 0));
        assert!(r.is_empty());
    }

    #[test]
    fn contains_excludes_right_and_bottom_edges() {
        let r = Rect::new(0, 0, 10, 10);
        assert!(r.contains(0, 0));
        assert!(r.contains(9, 9));
        assert!(!r.contains(10, 5));
        assert!(!r.contains(5, 10));
    }

    #[test]
    fn intersects_detects_overlap_and_rejects_touching_edges() {
        let a = Rect::new(0, 0, 100, 100);
        assert!(a.intersects(&Rect::new(50, 50, 100, 100)));
        assert!(a.intersects(&Rect::new(-10, -10, 20, 20)));
        // Edge contact is not overlap.
        assert!(!a.intersects(&Rect::new(100, 0, 50, 50)));
        assert!(!a.intersects(&Rect::new(0, 100, 50, 50)));
        assert!(!a.intersects(&Rect::new(200, 200, 10, 10)));
    }

    #[test]
    fn center_for_splits_remaining_space() {
        let screen = Rect::new(0, 0, 1920, 1080);
        assert_eq!(screen.center_for(640, 360), (640, 360));
        let offset = Rect::new(100, 200, 800, 600);
        assert_eq!(offset.center_for(200, 100), (400, 450));
    }
}
