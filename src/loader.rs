//! Decoding of photos and watermarks into RGBA bitmaps.
//!
//! Three decode paths are selected by file extension:
//! - `svg` is rasterized with `resvg` at the document's intrinsic size (96 DPI).
//! - `heic`/`heif` go through `libheif` (requires the `heic` feature).
//! - everything else goes through the `image` crate, with the format sniffed
//!   from the file content rather than trusted from the extension.
//!
//! Whatever the path, the result is an [`RgbaImage`]. Inputs without
//! transparency come out fully opaque.

use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use image::{ImageFormat, ImageReader, Rgba, RgbaImage};
use resvg::{tiny_skia, usvg};

use crate::error::{Error, Result};

/// Identifier used in errors for inline base64 payloads.
const BASE64_SOURCE: &str = "base64 input";

/// Decode strategy for an input, chosen from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Scalable vector document (`.svg`).
    Vector,
    /// Camera-native high efficiency image (`.heic`, `.heif`).
    Heif,
    /// Any other raster format handled by the `image` crate.
    Raster,
}

impl SourceKind {
    /// Classify a path by its (case-insensitive) extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match lowercase_extension(path).as_deref() {
            Some("svg") => Self::Vector,
            Some("heic" | "heif") => Self::Heif,
            _ => Self::Raster,
        }
    }
}

pub(crate) fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Check whether a path names something [`load_image`] can decode.
///
/// This is wider than the batch allow-list: SVG, HEIF and every raster
/// format known to the `image` crate are accepted.
#[must_use]
pub fn is_loadable_image(path: &Path) -> bool {
    match SourceKind::from_path(path) {
        SourceKind::Vector | SourceKind::Heif => true,
        SourceKind::Raster => ImageFormat::from_path(path).is_ok(),
    }
}

/// Load an image file and normalize it to RGBA.
///
/// # Errors
///
/// Returns [`Error::Decode`] naming the path if the file cannot be read or
/// decoded.
pub fn load_image(path: &Path) -> Result<RgbaImage> {
    let kind = SourceKind::from_path(path);
    log::debug!("Loading {} ({kind:?})", path.display());

    let image = match kind {
        SourceKind::Vector => decode_svg(path)?,
        SourceKind::Heif => decode_heif(path)?,
        SourceKind::Raster => decode_raster(path)?,
    };

    log::debug!(
        "Loaded {} at {}x{}",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(image)
}

/// Load an image from base64 text, optionally prefixed with a
/// `data:image/...;base64,` header.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the text is not valid base64 or the decoded
/// bytes are not a supported raster image.
pub fn load_base64(text: &str) -> Result<RgbaImage> {
    let bytes = decode_base64_payload(text)?;
    log::debug!("Decoded {} bytes of base64 image data", bytes.len());
    load_from_memory(&bytes, BASE64_SOURCE)
}

/// Decode raster image bytes and normalize them to RGBA.
///
/// `source_id` only labels errors.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the bytes are not a supported raster image.
pub fn load_from_memory(bytes: &[u8], source_id: &str) -> Result<RgbaImage> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| Error::decode(source_id, e))
}

/// Strip an optional data-URI header and decode the base64 payload.
///
/// Whitespace inside the payload (line-wrapped pastes) is ignored.
///
/// # Errors
///
/// Returns [`Error::Decode`] on a header without payload or malformed base64.
pub fn decode_base64_payload(text: &str) -> Result<Vec<u8>> {
    let trimmed = text.trim();
    let payload = if trimmed.starts_with("data:image") {
        trimmed
            .split_once(',')
            .map(|(_, payload)| payload)
            .ok_or_else(|| Error::decode(BASE64_SOURCE, "data URI header without payload"))?
    } else {
        trimmed
    };

    let compact: String = payload.split_ascii_whitespace().collect();
    general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| Error::decode(BASE64_SOURCE, e))
}

/// Rasterize SVG document bytes at their intrinsic size.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the document cannot be parsed or has an
/// empty canvas.
pub fn rasterize_svg(data: &[u8], source_id: &str) -> Result<RgbaImage> {
    let options = usvg::Options::default();
    let tree = usvg::Tree::from_data(data, &options).map_err(|e| Error::decode(source_id, e))?;

    let size = tree.size().to_int_size();
    let (width, height) = (size.width(), size.height());
    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| Error::decode(source_id, format!("cannot allocate {width}x{height} canvas")))?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    // tiny-skia stores premultiplied alpha; bitmaps here are straight alpha.
    let mut out = RgbaImage::new(width, height);
    for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    Ok(out)
}

fn decode_svg(path: &Path) -> Result<RgbaImage> {
    let id = path.display().to_string();
    let data = std::fs::read(path).map_err(|e| Error::decode(&id, e))?;
    rasterize_svg(&data, &id)
}

fn decode_raster(path: &Path) -> Result<RgbaImage> {
    let id = path.display().to_string();
    let reader = ImageReader::open(path)
        .and_then(ImageReader::with_guessed_format)
        .map_err(|e| Error::decode(&id, e))?;
    let image = reader.decode().map_err(|e| Error::decode(&id, e))?;
    Ok(image.to_rgba8())
}

#[cfg(feature = "heic")]
fn decode_heif(path: &Path) -> Result<RgbaImage> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let id = path.display().to_string();
    let path_str = path
        .to_str()
        .ok_or_else(|| Error::decode(&id, "path is not valid UTF-8"))?;

    let lib = LibHeif::new();
    let ctx = HeifContext::read_from_file(path_str).map_err(|e| Error::decode(&id, e))?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| Error::decode(&id, e))?;
    let decoded = lib
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgba), None)
        .map_err(|e| Error::decode(&id, e))?;

    let (width, height) = (decoded.width(), decoded.height());
    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| Error::decode(&id, "no interleaved RGBA plane"))?;

    // Rows may be padded past width * 4 bytes.
    let row_len = width as usize * 4;
    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in plane.data.chunks(plane.stride).take(height as usize) {
        let row = row
            .get(..row_len)
            .ok_or_else(|| Error::decode(&id, "truncated pixel row"))?;
        pixels.extend_from_slice(row);
    }

    RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| Error::decode(&id, "truncated pixel data"))
}

#[cfg(not(feature = "heic"))]
#[allow(clippy::unnecessary_wraps)]
fn decode_heif(path: &Path) -> Result<RgbaImage> {
    Err(Error::decode(
        path.display().to_string(),
        "HEIC/HEIF decoding requires the `heic` feature",
    ))
}
