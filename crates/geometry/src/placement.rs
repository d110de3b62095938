//! Answer-overlay placement
//!
//! Places the overlay next to the captured region on the target screen,
//! trying the sides first and stacking above/below only when neither
//! side has room. Content height is injected by the caller so the
//! engine knows nothing about fonts or widgets.

use crate::Rect;

/// Margin kept between the overlay, the region, and screen edges
pub const GAP: i32 = 8;
/// Preferred overlay width
pub const OVERLAY_WIDTH: i32 = 420;
/// Autosize floor
pub const OVERLAY_MIN_HEIGHT: i32 = 200;
/// Autosize ceiling
pub const OVERLAY_MAX_HEIGHT: i32 = 1200;
/// Narrowest the overlay may shrink when squeezed beside a region
const MIN_SIDE_WIDTH: i32 = 120;

/// Smallest periscope canvas
pub const PERISCOPE_MIN_WIDTH: u32 = 240;
pub const PERISCOPE_MIN_HEIGHT: u32 = 180;

/// Compute overlay bounds beside `region` on `screen`.
///
/// `content_height` maps an overlay width to the unclamped pixel height
/// of the current content rendered at that width. Placement order:
/// full width right, full width left, shrink right, shrink left, then
/// stack on whichever of above/below has more room.
pub fn compute_overlay_bounds<F>(region: Rect, screen: Rect, content_height: F) -> Rect
where
    F: Fn(i32) -> i32,
{
    if !region.intersects(&screen) {
        return compute_overlay_bounds_for_screen(screen, content_height);
    }

    let (sx, sy) = (screen.x, screen.y);
    let (sw, sh) = (screen.width as i32, screen.height as i32);
    let max_width = OVERLAY_WIDTH.min(sw - GAP * 2).max(MIN_SIDE_WIDTH);
    let preferred = preferred_height(max_width, sh, &content_height);

    let (rx, ry) = (region.x, region.y);
    let (rw, rh) = (region.width as i32, region.height as i32);
    let space_right = (sx + sw) - (rx + rw) - GAP;
    let space_left = rx - sx - GAP;

    let mut width = max_width;
    let x = if space_right >= max_width {
        rx + rw + GAP
    } else if space_left >= max_width {
        rx - GAP - max_width
    } else if space_right >= space_left && space_right > 0 {
        width = max_width.min(space_right).max(MIN_SIDE_WIDTH);
        rx + rw + GAP
    } else if space_left > 0 {
        width = max_width.min(space_left).max(MIN_SIDE_WIDTH);
        rx - GAP - width
    } else {
        // No side room at all: stack above or below the region.
        let space_above = ry - sy - GAP;
        let space_below = (sy + sh) - (ry + rh) - GAP;
        let height = preferred.min(space_above.max(space_below).max(OVERLAY_MIN_HEIGHT));
        let y = if space_below >= height {
            ry + rh + GAP
        } else {
            ry - GAP - height
        };
        let fallback_width = max_width.min(sw - GAP * 2);
        let fallback_x = clamp(rx, sx + GAP, sx + sw - GAP - fallback_width);
        return Rect::new(fallback_x, y, fallback_width.max(1) as u32, height.max(1) as u32);
    };

    let height = preferred.min(sh - GAP * 2);
    let y = clamp(ry, sy + GAP, sy + sh - GAP - height);
    Rect::new(x, y, width.max(1) as u32, height.max(1) as u32)
}

/// Overlay bounds when no usable region exists: top-right corner of the
/// screen with the usual margin.
pub fn compute_overlay_bounds_for_screen<F>(screen: Rect, content_height: F) -> Rect
where
    F: Fn(i32) -> i32,
{
    let (sx, sy) = (screen.x, screen.y);
    let (sw, sh) = (screen.width as i32, screen.height as i32);
    let width = OVERLAY_WIDTH.min(sw - GAP * 2).max(MIN_SIDE_WIDTH);
    let height = preferred_height(width, sh, &content_height);
    let x = sx + sw - GAP - width;
    let y = sy + GAP;
    Rect::new(x, y, width.max(1) as u32, height.max(1) as u32)
}

/// Periscope canvas size for a configured size, never below the floor
pub fn periscope_canvas_size(width: u32, height: u32) -> (u32, u32) {
    (
        width.max(PERISCOPE_MIN_WIDTH),
        height.max(PERISCOPE_MIN_HEIGHT),
    )
}

fn preferred_height<F>(width: i32, screen_height: i32, content_height: &F) -> i32
where
    F: Fn(i32) -> i32,
{
    let max_height = OVERLAY_MAX_HEIGHT.min(screen_height - GAP * 2);
    content_height(width).min(max_height).max(OVERLAY_MIN_HEIGHT)
}

fn clamp(value: i32, minimum: i32, maximum: i32) -> i32 {
    value.min(maximum).max(minimum)
}
