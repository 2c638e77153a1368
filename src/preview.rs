//! Single-image previews written to a well-known file.
//!
//! Every preview overwrites the same file. Writes go to a temporary sibling
//! that is renamed into place, and previews on one [`Previewer`] are
//! serialized, so a viewer polling the file never reads a half-written PNG.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use image::buffer::ConvertBuffer;
use image::{ImageFormat, RgbImage, RgbaImage};

use crate::compositor::{self, Watermark};
use crate::engine;
use crate::error::{Error, Result};
use crate::loader;

/// File name of the default preview, placed in the system temp directory.
pub const PREVIEW_FILE_NAME: &str = "photo_watermark_preview.png";

/// Renders watermarked previews to a fixed path.
#[derive(Debug)]
pub struct Previewer {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl Default for Previewer {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join(PREVIEW_FILE_NAME))
    }
}

impl Previewer {
    /// Create a previewer writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Where previews are written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Watermark `image` and write the result as the current preview.
    ///
    /// Returns the preview path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`] or [`Error::Io`] if the preview cannot be
    /// written.
    pub fn preview(
        &self,
        image: &RgbaImage,
        watermark: Option<&Watermark>,
        x: i64,
        y: i64,
    ) -> Result<PathBuf> {
        let marked = compositor::composite(image, watermark, x, y);
        self.write(&marked)?;
        log::info!("Preview written to {}", self.path.display());
        Ok(self.path.clone())
    }

    /// Decode a base64 image (optionally a data URI) and preview it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] for an invalid payload; the previous preview
    /// is left in place.
    pub fn preview_base64(
        &self,
        text: &str,
        watermark: Option<&Watermark>,
        x: i64,
        y: i64,
    ) -> Result<PathBuf> {
        let image = loader::load_base64(text)?;
        self.preview(&image, watermark, x, y)
    }

    /// Preview the first supported image under `folder` that decodes.
    ///
    /// Images that fail to decode are logged and skipped. Returns
    /// `Ok(None)` when the folder holds no usable image.
    ///
    /// # Errors
    ///
    /// Returns an error only if writing the preview fails.
    pub fn preview_first_in_folder(
        &self,
        folder: &Path,
        watermark: Option<&Watermark>,
        x: i64,
        y: i64,
    ) -> Result<Option<PathBuf>> {
        for candidate in engine::find_images(folder) {
            match loader::load_image(&candidate) {
                Ok(image) => {
                    log::debug!("Previewing {}", candidate.display());
                    return self.preview(&image, watermark, x, y).map(Some);
                }
                Err(e) => log::warn!("{e}"),
            }
        }

        log::warn!("No compatible images found under {}", folder.display());
        Ok(None)
    }

    fn write(&self, image: &RgbaImage) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

        let rgb: RgbImage = image.convert();
        let staged = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
        {
            let mut writer = BufWriter::new(staged.as_file());
            rgb.write_to(&mut writer, ImageFormat::Png)
                .map_err(|source| Error::Write {
                    path: self.path.clone(),
                    source,
                })?;
            writer.flush().map_err(|e| Error::io(staged.path(), e))?;
        }

        staged
            .persist(&self.path)
            .map_err(|e| Error::io(&self.path, e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose, Engine as _};
    use image::{Rgb, Rgba};

    fn previewer(dir: &Path) -> Previewer {
        Previewer::new(dir.join("preview.png"))
    }

    fn red_mark() -> Watermark {
        Watermark::new(RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn default_preview_lives_in_temp_dir() {
        let p = Previewer::default();
        assert_eq!(p.path(), std::env::temp_dir().join(PREVIEW_FILE_NAME));
    }

    #[test]
    fn preview_writes_rgb_png_of_composite() {
        let dir = tempfile::tempdir().unwrap();
        let p = previewer(dir.path());
        let base = RgbaImage::from_pixel(20, 10, Rgba([0, 0, 0, 255]));

        let path = p.preview(&base, Some(&red_mark()), 100, 100).unwrap();

        let written = image::open(&path).unwrap();
        assert_eq!(written.color(), image::ColorType::Rgb8);
        let rgb = written.to_rgb8();
        assert_eq!(rgb.dimensions(), (20, 10));
        assert_eq!(rgb.get_pixel(19, 9), &Rgb([255, 0, 0]));
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn preview_overwrites_previous_one() {
        let dir = tempfile::tempdir().unwrap();
        let p = previewer(dir.path());

        p.preview(&RgbaImage::new(8, 8), None, 0, 0).unwrap();
        p.preview(&RgbaImage::new(3, 5), None, 0, 0).unwrap();

        assert_eq!(image::open(p.path()).unwrap().to_rgb8().dimensions(), (3, 5));
        // Only the preview itself remains; no staging files leak.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn base64_preview_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let p = previewer(dir.path());

        let mut png = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(RgbImage::from_pixel(6, 6, Rgb([0, 255, 0])))
            .write_to(&mut png, ImageFormat::Png)
            .unwrap();
        let text = format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(png.into_inner())
        );

        let path = p.preview_base64(&text, Some(&red_mark()), 0, 0).unwrap();
        let rgb = image::open(path).unwrap().to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(rgb.get_pixel(5, 5), &Rgb([0, 255, 0]));
    }

    #[test]
    fn invalid_base64_leaves_no_preview() {
        let dir = tempfile::tempdir().unwrap();
        let p = previewer(dir.path());

        let err = p.preview_base64("not-base64!!", None, 0, 0).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
        assert!(!p.path().exists());
    }

    #[test]
    fn folder_preview_skips_undecodable_images() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("a_broken.png"), b"junk").unwrap();
        RgbImage::new(9, 7).save(src.path().join("b_good.png")).unwrap();

        let p = previewer(out.path());
        let path = p
            .preview_first_in_folder(src.path(), Some(&red_mark()), 0, 0)
            .unwrap()
            .unwrap();
        assert_eq!(image::open(path).unwrap().to_rgb8().dimensions(), (9, 7));
    }

    #[test]
    fn folder_without_images_yields_none() {
        let src = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("readme.txt"), b"hi").unwrap();

        let p = previewer(src.path());
        assert!(p
            .preview_first_in_folder(src.path(), None, 0, 0)
            .unwrap()
            .is_none());
    }

    #[test]
    fn concurrent_previews_leave_a_complete_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = previewer(dir.path());
        let mark = red_mark();

        std::thread::scope(|s| {
            for size in 5..13u32 {
                let (p, mark) = (&p, &mark);
                s.spawn(move || {
                    let base = RgbaImage::new(size, size);
                    p.preview(&base, Some(mark), 1, 1).unwrap();
                });
            }
        });

        let (w, h) = image::open(p.path()).unwrap().to_rgb8().dimensions();
        assert_eq!(w, h);
        assert!((5..13).contains(&w));
    }
}
