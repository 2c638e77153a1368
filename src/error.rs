//! Error types for the photo-watermark crate.

use std::path::PathBuf;

/// Errors that can occur while loading, compositing, or writing images.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An image file or base64 payload could not be decoded.
    #[error("failed to decode {source_id}: {reason}")]
    Decode {
        /// Path or identifier of the offending input.
        source_id: String,
        /// Underlying cause, as text.
        reason: String,
    },

    /// An encoded image could not be written to its destination.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying encoder or I/O error.
        #[source]
        source: image::ImageError,
    },

    /// A filesystem operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path the operation was acting on.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// User-supplied parameters were rejected before any processing.
    #[error("invalid input: {0}")]
    Validation(String),
}

impl Error {
    /// Build a [`Error::Decode`] from anything displayable.
    pub(crate) fn decode(source_id: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Decode {
            source_id: source_id.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
