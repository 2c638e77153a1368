//! Batch watermarking engine.

use std::path::{Path, PathBuf};

use image::buffer::ConvertBuffer;
use image::{ImageFormat, RgbImage, RgbaImage};
use walkdir::WalkDir;

use crate::compositor::{self, Watermark};
use crate::config::{BatchRequest, DEFAULT_OFFSET};
use crate::error::{Error, Result};
use crate::loader;
use crate::observer::BatchObserver;

/// Options controlling where the watermark is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkOptions {
    /// Requested left offset; clamped per image.
    pub x: i64,
    /// Requested top offset; clamped per image.
    pub y: i64,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            x: DEFAULT_OFFSET,
            y: DEFAULT_OFFSET,
        }
    }
}

/// Result of processing a single image file.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    /// Input file.
    pub path: PathBuf,
    /// Where the watermarked copy was (or would have been) written.
    pub output: PathBuf,
    /// Whether the file was decoded, watermarked and written.
    pub success: bool,
    /// Human-readable status message.
    pub message: String,
}

/// Final counts of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Files watermarked and written.
    pub processed: usize,
    /// Files that could not be decoded or written.
    pub failed: usize,
}

impl BatchSummary {
    /// Number of matching files seen.
    #[must_use]
    pub fn total(&self) -> usize {
        self.processed + self.failed
    }

    fn record(&mut self, outcome: &FileOutcome) {
        if outcome.success {
            self.processed += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// A loaded watermark plus its placement options.
///
/// Create once per run and reuse for every image; the watermark bitmap is
/// never modified.
#[derive(Debug, Clone)]
pub struct WatermarkEngine {
    watermark: Watermark,
    options: WatermarkOptions,
}

impl WatermarkEngine {
    /// Create an engine around an already loaded watermark.
    #[must_use]
    pub fn new(watermark: Watermark, options: WatermarkOptions) -> Self {
        Self { watermark, options }
    }

    /// Load the watermark from `path` and create an engine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the watermark cannot be decoded.
    pub fn from_path(path: &Path, options: WatermarkOptions) -> Result<Self> {
        let watermark = Watermark::load(path)?;
        log::info!(
            "Loaded watermark {} ({}x{})",
            path.display(),
            watermark.dimensions().0,
            watermark.dimensions().1
        );
        Ok(Self::new(watermark, options))
    }

    /// The watermark applied by this engine.
    #[must_use]
    pub fn watermark(&self) -> &Watermark {
        &self.watermark
    }

    /// The placement options.
    #[must_use]
    pub fn options(&self) -> WatermarkOptions {
        self.options
    }

    /// Watermark a decoded image, returning a new bitmap.
    #[must_use]
    pub fn apply(&self, image: &RgbaImage) -> RgbaImage {
        compositor::composite(image, Some(&self.watermark), self.options.x, self.options.y)
    }

    /// Process a single image file: load, watermark, save.
    ///
    /// Missing parent directories of `output` are created. Failures are
    /// reported in the returned [`FileOutcome`], never as a panic or error.
    #[must_use]
    pub fn process_file(&self, input: &Path, output: &Path) -> FileOutcome {
        let mut result = FileOutcome {
            path: input.to_path_buf(),
            output: output.to_path_buf(),
            success: false,
            message: String::new(),
        };

        let image = match loader::load_image(input) {
            Ok(img) => img,
            Err(e) => {
                result.message = e.to_string();
                return result;
            }
        };

        let marked = self.apply(&image);

        if let Some(parent) = output.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                result.message = Error::io(parent, e).to_string();
                return result;
            }
        }

        match save_image(&marked, output) {
            Ok(()) => {
                result.success = true;
                result.message = "Watermark applied".to_string();
            }
            Err(e) => {
                result.message = e.to_string();
            }
        }

        result
    }

    /// Watermark every supported image under `source_dir` into a mirrored
    /// tree under `output_dir`.
    ///
    /// A file that fails to decode or write is counted and reported to
    /// `observer`; the run carries on with the rest. Uses parallel iteration
    /// when the `cli` feature is enabled (via rayon). Observer events arrive
    /// after all files are processed, in [`find_images`] order.
    pub fn process_directory(
        &self,
        source_dir: &Path,
        output_dir: &Path,
        observer: &dyn BatchObserver,
    ) -> BatchSummary {
        let inputs = find_images(source_dir);
        log::debug!(
            "Found {} candidate images under {}",
            inputs.len(),
            source_dir.display()
        );

        let process = |input: &PathBuf| {
            let output = mirror_output_path(input, source_dir, output_dir);
            self.process_file(input, &output)
        };

        #[cfg(feature = "cli")]
        let outcomes: Vec<FileOutcome> = {
            use rayon::prelude::*;
            inputs.par_iter().map(process).collect()
        };

        #[cfg(not(feature = "cli"))]
        let outcomes: Vec<FileOutcome> = inputs.iter().map(process).collect();

        let mut summary = BatchSummary::default();
        for outcome in &outcomes {
            if outcome.success {
                observer.on_file_done(outcome);
            } else {
                observer.on_file_failed(outcome);
            }
            summary.record(outcome);
        }
        observer.on_finished(&summary);
        summary
    }
}

/// Run a whole batch from a [`BatchRequest`].
///
/// # Errors
///
/// Returns [`Error::Validation`] if the request is invalid and
/// [`Error::Decode`] if the watermark cannot be loaded. Per-file failures are
/// only counted in the summary.
pub fn run_batch(request: &BatchRequest, observer: &dyn BatchObserver) -> Result<BatchSummary> {
    request.validate()?;
    let options = WatermarkOptions {
        x: request.x,
        y: request.y,
    };
    let engine = WatermarkEngine::from_path(&request.watermark, options)?;
    Ok(engine.process_directory(&request.source, &request.output, observer))
}

/// Check if a file has an extension from the batch allow-list.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match loader::lowercase_extension(path) {
        Some(ext) => matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "heic"),
        None => false,
    }
}

/// Recursively list supported images under `dir`, depth first, with each
/// directory's entries in file name order.
///
/// Directory symlinks are not descended into; symlinks to files are listed
/// like regular files. Unreadable entries are logged and skipped.
#[must_use]
pub fn find_images(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                log::warn!("Skipping unreadable entry under {}: {e}", dir.display());
                None
            }
        })
        .filter(|e| {
            let is_file = e.file_type().is_file() || (e.path_is_symlink() && e.path().is_file());
            is_file && is_supported_image(e.path())
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Map an input file under `source_dir` to its place under `output_dir`.
///
/// Example: `src/a/b.jpg` with source `src` and output `out` becomes
/// `out/a/b.jpg`. Inputs outside `source_dir` land directly in `output_dir`.
#[must_use]
pub fn mirror_output_path(input: &Path, source_dir: &Path, output_dir: &Path) -> PathBuf {
    match input.strip_prefix(source_dir) {
        Ok(relative) => output_dir.join(relative),
        Err(_) => output_dir.join(input.file_name().unwrap_or_default()),
    }
}

/// Drop the alpha channel and write `img` as PNG.
///
/// The encoding is always PNG regardless of the file name, so a mirrored
/// `photo.jpg` holds PNG data.
///
/// # Errors
///
/// Returns [`Error::Write`] if encoding or writing fails.
pub fn save_image(img: &RgbaImage, path: &Path) -> Result<()> {
    let rgb: RgbImage = img.convert();
    rgb.save_with_format(path, ImageFormat::Png)
        .map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })
}
