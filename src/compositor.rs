//! Watermark placement: downscaling, position clamping and painting.

use std::borrow::Cow;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};

use crate::blending;
use crate::error::Result;
use crate::loader;

/// A watermark bitmap, loaded once and reused read-only for every image.
#[derive(Debug, Clone)]
pub struct Watermark {
    image: RgbaImage,
    masked: bool,
}

/// Where a watermark lands on a particular base image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Left edge in base image pixels.
    pub x: u32,
    /// Top edge in base image pixels.
    pub y: u32,
    /// Painted width (after any downscale).
    pub width: u32,
    /// Painted height (after any downscale).
    pub height: u32,
}

impl Watermark {
    /// Wrap an RGBA bitmap. Its alpha channel is used as the blend mask.
    #[must_use]
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image,
            masked: true,
        }
    }

    /// Wrap a decoded image of any color type.
    ///
    /// Images without an alpha channel are painted opaquely, overwriting
    /// their whole rectangle.
    #[must_use]
    pub fn from_dynamic(image: DynamicImage) -> Self {
        let masked = image.color().has_alpha();
        Self {
            image: image.into_rgba8(),
            masked,
        }
    }

    /// Load a watermark from any file [`loader::load_image`] accepts.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Decode`] if the file cannot be decoded.
    pub fn load(path: &Path) -> Result<Self> {
        loader::load_image(path).map(Self::new)
    }

    /// The original, never-resized bitmap.
    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Whether the alpha channel is used as a blend mask.
    #[must_use]
    pub fn is_masked(&self) -> bool {
        self.masked
    }

    /// Original `(width, height)`.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Size the watermark will be painted at on a `base_w` x `base_h` image.
    ///
    /// A watermark wider or taller than the base is shrunk to fit within half
    /// the base in each direction, keeping its aspect ratio. Smaller
    /// watermarks keep their size; nothing is ever upscaled.
    #[must_use]
    pub fn fitted_dimensions(&self, base_w: u32, base_h: u32) -> (u32, u32) {
        let (w, h) = self.dimensions();
        if (w <= base_w && h <= base_h) || w == 0 || h == 0 {
            return (w, h);
        }
        fit_within(w, h, base_w / 2, base_h / 2)
    }

    /// The bitmap to paint on a `base_w` x `base_h` image.
    ///
    /// Borrows the original when no resize is needed; otherwise returns a
    /// Lanczos3-resampled copy, so the original never accumulates resize
    /// loss across a batch.
    #[must_use]
    pub fn prepare_for(&self, base_w: u32, base_h: u32) -> Cow<'_, RgbaImage> {
        let (w, h) = self.fitted_dimensions(base_w, base_h);
        if (w, h) == self.dimensions() {
            return Cow::Borrowed(&self.image);
        }

        log::debug!(
            "Downscaling watermark {}x{} -> {w}x{h} for {base_w}x{base_h} image",
            self.image.width(),
            self.image.height()
        );
        Cow::Owned(imageops::resize(&self.image, w, h, FilterType::Lanczos3))
    }

    /// Compute where the watermark lands for a requested `(x, y)`.
    ///
    /// Returns `None` if the watermark cannot be fully contained in the base
    /// even after downscaling.
    #[must_use]
    pub fn placement(&self, base_w: u32, base_h: u32, x: i64, y: i64) -> Option<Placement> {
        let (width, height) = self.fitted_dimensions(base_w, base_h);
        let (x, y) = clamp_position((base_w, base_h), (width, height), x, y)?;
        Some(Placement {
            x,
            y,
            width,
            height,
        })
    }
}

/// Largest size with the aspect ratio of `width` x `height` that fits in
/// `max_width` x `max_height`.
///
/// Each side is rounded to the nearest pixel and kept in `1..=max`, so the
/// aspect ratio holds to within rounding.
#[must_use]
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width.min(max_width), height.min(max_height));
    }

    let ratio = (f64::from(max_width) / f64::from(width))
        .min(f64::from(max_height) / f64::from(height));

    let scale = |side: u32, max: u32| -> u32 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let scaled = (f64::from(side) * ratio).round() as u32;
        scaled.clamp(1, max.max(1))
    };

    (scale(width, max_width), scale(height, max_height))
}

/// Clamp a requested top-left position so a `mark`-sized rectangle stays
/// inside `base`.
///
/// Each axis is clamped independently into `[0, base - mark]`. Returns
/// `None` when `mark` is larger than `base` on either axis.
#[must_use]
pub fn clamp_position(base: (u32, u32), mark: (u32, u32), x: i64, y: i64) -> Option<(u32, u32)> {
    let max_x = base.0.checked_sub(mark.0)?;
    let max_y = base.1.checked_sub(mark.1)?;
    Some((clamp_axis(x, max_x), clamp_axis(y, max_y)))
}

fn clamp_axis(value: i64, max: u32) -> u32 {
    u32::try_from(value.clamp(0, i64::from(max))).unwrap_or(max)
}

/// Paint `watermark` onto a copy of `base` at the requested position.
///
/// Neither input is modified. With no watermark, or with a watermark that
/// still does not fit after downscaling, the copy is returned unmarked.
/// The output always has the dimensions of `base`.
#[must_use]
pub fn composite(base: &RgbaImage, watermark: Option<&Watermark>, x: i64, y: i64) -> RgbaImage {
    let mut canvas = base.clone();
    let Some(watermark) = watermark else {
        return canvas;
    };

    let (base_w, base_h) = base.dimensions();
    let Some(place) = watermark.placement(base_w, base_h, x, y) else {
        let (w, h) = watermark.fitted_dimensions(base_w, base_h);
        log::warn!("Watermark {w}x{h} does not fit a {base_w}x{base_h} image; left unmarked");
        return canvas;
    };

    let mark = watermark.prepare_for(base_w, base_h);
    if watermark.is_masked() {
        blending::paste_masked(&mut canvas, &mark, place.x, place.y);
    } else {
        blending::paste_opaque(&mut canvas, &mark, place.x, place.y);
    }
    canvas
}
