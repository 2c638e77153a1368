//! Alpha blending math for watermark compositing.
//!
//! Watermarks are applied with straight (non-premultiplied) alpha blending,
//! using the watermark's own alpha channel as the mask:
//! `out = alpha * watermark + (1 - alpha) * base`
//!
//! The formula is applied to all four channels, so the base's alpha is
//! blended too.

use image::RgbaImage;

/// Blend one channel value. `alpha` is in `0..=255`.
#[inline]
fn blend_channel(src: u8, dst: u8, alpha: u32) -> u8 {
    let mixed = u32::from(src) * alpha + u32::from(dst) * (255 - alpha);
    // Rounded division by 255; the result never exceeds 255.
    #[allow(clippy::cast_possible_truncation)]
    {
        ((mixed + 127) / 255) as u8
    }
}

/// Visible part of an overlay placed at `(pos_x, pos_y)`, as `(width, height)`.
///
/// Returns `None` when nothing of the overlay lands on the canvas.
fn clipped_extent(
    canvas: &RgbaImage,
    overlay: &RgbaImage,
    pos_x: u32,
    pos_y: u32,
) -> Option<(u32, u32)> {
    let x2 = pos_x.saturating_add(overlay.width()).min(canvas.width());
    let y2 = pos_y.saturating_add(overlay.height()).min(canvas.height());

    if pos_x >= x2 || pos_y >= y2 {
        return None;
    }
    Some((x2 - pos_x, y2 - pos_y))
}

/// Paint `overlay` onto `canvas` using the overlay's alpha as a blend mask.
///
/// Fully transparent overlay pixels leave the canvas untouched and fully
/// opaque ones replace it. Parts of the overlay falling outside the canvas
/// are clipped.
pub fn paste_masked(canvas: &mut RgbaImage, overlay: &RgbaImage, pos_x: u32, pos_y: u32) {
    let Some((w, h)) = clipped_extent(canvas, overlay, pos_x, pos_y) else {
        return;
    };

    for dy in 0..h {
        for dx in 0..w {
            let src = overlay.get_pixel(dx, dy);
            let alpha = u32::from(src[3]);

            if alpha == 0 {
                continue;
            }

            let dst = canvas.get_pixel_mut(pos_x + dx, pos_y + dy);
            if alpha == 255 {
                *dst = *src;
                continue;
            }

            for ch in 0..4 {
                dst[ch] = blend_channel(src[ch], dst[ch], alpha);
            }
        }
    }
}

/// Paint `overlay` onto `canvas` with no mask: every pixel in the overlay's
/// rectangle is overwritten, alpha included. Out-of-bounds parts are clipped.
pub fn paste_opaque(canvas: &mut RgbaImage, overlay: &RgbaImage, pos_x: u32, pos_y: u32) {
    let Some((w, h)) = clipped_extent(canvas, overlay, pos_x, pos_y) else {
        return;
    };

    for dy in 0..h {
        for dx in 0..w {
            canvas.put_pixel(pos_x + dx, pos_y + dy, *overlay.get_pixel(dx, dy));
        }
    }
}
