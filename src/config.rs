//! Validated parameters for a batch run.
//!
//! These checks belong to whatever shell collects the values from a user;
//! the processing functions assume they already passed.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Default watermark offset on both axes, in pixels.
pub const DEFAULT_OFFSET: i64 = 10;

/// Everything a batch run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    /// Folder scanned recursively for photos.
    pub source: PathBuf,
    /// Watermark image file.
    pub watermark: PathBuf,
    /// Root of the mirrored output tree.
    pub output: PathBuf,
    /// Requested left offset of the watermark.
    pub x: i64,
    /// Requested top offset of the watermark.
    pub y: i64,
}

impl BatchRequest {
    /// Check that all paths are given and that the inputs exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.source.as_os_str().is_empty()
            || self.watermark.as_os_str().is_empty()
            || self.output.as_os_str().is_empty()
        {
            return Err(Error::Validation(
                "source folder, watermark and output folder are all required".to_string(),
            ));
        }
        if !self.source.is_dir() {
            return Err(Error::Validation(format!(
                "source folder does not exist: {}",
                self.source.display()
            )));
        }
        if !self.watermark.is_file() {
            return Err(Error::Validation(format!(
                "watermark file does not exist: {}",
                self.watermark.display()
            )));
        }
        Ok(())
    }
}

/// Parse a user-entered coordinate.
///
/// # Errors
///
/// Returns [`Error::Validation`] if `text` is not an integer.
pub fn parse_coordinate(text: &str) -> Result<i64> {
    let trimmed = text.trim();
    trimmed
        .parse()
        .map_err(|_| Error::Validation(format!("coordinate must be an integer, got {trimmed:?}")))
}
