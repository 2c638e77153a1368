//! Stamp a watermark image onto every photo in a folder.
//!
//! Photos are decoded into RGBA bitmaps, the watermark is alpha-blended on at
//! a requested position (clamped so it always stays inside the photo, and
//! shrunk first if it is bigger than the photo), and the result is written
//! as PNG into an output tree mirroring the input folder.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use photo_watermark::{LogObserver, WatermarkEngine, WatermarkOptions};
//!
//! let engine = WatermarkEngine::from_path(Path::new("logo.svg"), WatermarkOptions::default())
//!     .expect("failed to load watermark");
//! let summary = engine.process_directory(Path::new("photos"), Path::new("out"), &LogObserver);
//! println!("{} processed, {} failed", summary.processed, summary.failed);
//! ```
//!
//! # Previews
//!
//! A single composited image can be written to a fixed preview file, from a
//! decoded bitmap, a base64 payload, or the first usable photo in a folder.
//!
//! ```no_run
//! use std::path::Path;
//! use photo_watermark::{Previewer, Watermark};
//!
//! let mark = Watermark::load(Path::new("logo.png")).unwrap();
//! let previewer = Previewer::default();
//! let path = previewer
//!     .preview_base64("data:image/png;base64,iVBORw0KGgo...", Some(&mark), 10, 10)
//!     .unwrap();
//! println!("preview at {}", path.display());
//! ```

#![deny(missing_docs)]

pub mod blending;
pub mod compositor;
pub mod config;
mod engine;
pub mod error;
pub mod loader;
pub mod observer;
mod preview;

pub use compositor::{composite, Placement, Watermark};
pub use config::{parse_coordinate, BatchRequest, DEFAULT_OFFSET};
pub use engine::{
    find_images, is_supported_image, mirror_output_path, run_batch, save_image, BatchSummary,
    FileOutcome, WatermarkEngine, WatermarkOptions,
};
pub use error::{Error, Result};
pub use loader::{load_base64, load_image, load_from_memory};
pub use observer::{BatchObserver, LogObserver, NullObserver};
pub use preview::{Previewer, PREVIEW_FILE_NAME};
