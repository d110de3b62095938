//! Screen pixel grabs using GDI

use crate::PlatformResult;
use geometry::Rect;
use image::RgbaImage;

/// Copy the pixels under `rect` (virtual-desktop coordinates) into an
/// RGBA image.
#[cfg(windows)]
pub fn grab_rect(rect: Rect) -> PlatformResult<RgbaImage> {
    use crate::PlatformError;
    use windows::Win32::Graphics::Gdi::{
        BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC,
        GetDIBits, ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS,
        SRCCOPY,
    };

    if rect.width == 0 || rect.height == 0 {
        return Err(PlatformError::Grab("empty capture rect".into()));
    }
    let width = rect.width as i32;
    let height = rect.height as i32;

    unsafe {
        let screen_dc = GetDC(None);
        if screen_dc.is_invalid() {
            return Err(PlatformError::Grab("failed to get screen DC".into()));
        }

        let mem_dc = CreateCompatibleDC(screen_dc);
        let bitmap = CreateCompatibleBitmap(screen_dc, width, height);
        let old_bitmap = SelectObject(mem_dc, bitmap);

        let blitted = BitBlt(mem_dc, 0, 0, width, height, screen_dc, rect.x, rect.y, SRCCOPY);

        let mut bmi = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width,
                biHeight: -height, // Top-down DIB
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                biSizeImage: 0,
                biXPelsPerMeter: 0,
                biYPelsPerMeter: 0,
                biClrUsed: 0,
                biClrImportant: 0,
            },
            bmiColors: [Default::default()],
        };

        let mut data = vec![0u8; (rect.width * rect.height * 4) as usize];
        let copied = GetDIBits(
            mem_dc,
            bitmap,
            0,
            rect.height,
            Some(data.as_mut_ptr() as *mut _),
            &mut bmi,
            DIB_RGB_COLORS,
        );

        SelectObject(mem_dc, old_bitmap);
        DeleteObject(bitmap);
        DeleteDC(mem_dc);
        ReleaseDC(None, screen_dc);

        blitted?;
        if copied == 0 {
            return Err(PlatformError::Grab("GetDIBits returned no scanlines".into()));
        }

        // GDI hands back BGRA; swap to RGBA in place.
        for pixel in data.chunks_exact_mut(4) {
            pixel.swap(0, 2);
        }

        RgbaImage::from_raw(rect.width, rect.height, data)
            .ok_or_else(|| PlatformError::Grab("pixel buffer size mismatch".into()))
    }
}

#[cfg(not(windows))]
pub fn grab_rect(_rect: Rect) -> PlatformResult<RgbaImage> {
    Err(crate::PlatformError::Unsupported)
}
