use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use photo_watermark::{
    composite, load_image, run_batch, save_image, BatchObserver, BatchRequest, BatchSummary,
    Error, FileOutcome, NullObserver, Watermark, WatermarkEngine, WatermarkOptions,
};

#[derive(Default)]
struct Recorder {
    done: Mutex<Vec<PathBuf>>,
    failed: Mutex<Vec<(PathBuf, String)>>,
    finished: Mutex<Option<BatchSummary>>,
}

impl BatchObserver for Recorder {
    fn on_file_done(&self, outcome: &FileOutcome) {
        self.done.lock().unwrap().push(outcome.path.clone());
    }

    fn on_file_failed(&self, outcome: &FileOutcome) {
        self.failed
            .lock()
            .unwrap()
            .push((outcome.path.clone(), outcome.message.clone()));
    }

    fn on_finished(&self, summary: &BatchSummary) {
        *self.finished.lock().unwrap() = Some(*summary);
    }
}

fn write_photo(path: &Path, w: u32, h: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    RgbImage::from_pixel(w, h, Rgb([200, 200, 200]))
        .save(path)
        .unwrap();
}

fn write_mark(path: &Path) {
    RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]))
        .save(path)
        .unwrap();
}

#[test]
fn batch_counts_only_matching_files_and_leaves_others_alone() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let mark_dir = tempfile::tempdir().unwrap();
    let mark = mark_dir.path().join("mark.png");
    write_mark(&mark);

    write_photo(&src.path().join("a.png"), 50, 40);
    write_photo(&src.path().join("nested").join("b.jpg"), 60, 60);
    std::fs::write(src.path().join("c.JPEG"), b"corrupt bytes").unwrap();
    std::fs::write(src.path().join("notes.txt"), b"keep me").unwrap();

    let recorder = Recorder::default();
    let request = BatchRequest {
        source: src.path().to_path_buf(),
        watermark: mark,
        output: out.path().to_path_buf(),
        x: 5,
        y: 5,
    };
    let summary = run_batch(&request, &recorder).unwrap();

    assert_eq!(summary.processed + summary.failed, 3);
    assert_eq!(summary, BatchSummary { processed: 2, failed: 1 });
    assert_eq!(*recorder.finished.lock().unwrap(), Some(summary));

    let failed = recorder.failed.lock().unwrap();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].0.ends_with("c.JPEG"));
    assert!(failed[0].1.contains("c.JPEG"));

    assert!(out.path().join("a.png").is_file());
    assert!(out.path().join("nested").join("b.jpg").is_file());
    assert!(!out.path().join("c.JPEG").exists());
    assert!(!out.path().join("notes.txt").exists());
    assert_eq!(
        std::fs::read(src.path().join("notes.txt")).unwrap(),
        b"keep me"
    );
}

#[test]
fn batch_output_is_watermarked_png_with_source_dimensions() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_photo(&src.path().join("deep").join("er").join("p.jpg"), 30, 20);

    let engine = WatermarkEngine::new(
        Watermark::new(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]))),
        WatermarkOptions { x: -100, y: 100 },
    );
    let summary = engine.process_directory(src.path(), out.path(), &NullObserver);
    assert_eq!(summary.processed, 1);

    let written = out.path().join("deep").join("er").join("p.jpg");
    let bytes = std::fs::read(&written).unwrap();
    assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Png);

    let img = image::load_from_memory(&bytes).unwrap().to_rgb8();
    assert_eq!(img.dimensions(), (30, 20));
    // Clamped to the bottom-left corner.
    assert_eq!(img.get_pixel(0, 19), &Rgb([0, 0, 255]));
    assert_eq!(img.get_pixel(3, 16), &Rgb([0, 0, 255]));
    assert_ne!(img.get_pixel(4, 19), &Rgb([0, 0, 255]));
}

#[test]
fn one_watermark_serves_images_of_different_sizes() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_photo(&src.path().join("small.png"), 40, 40);
    write_photo(&src.path().join("large.png"), 400, 300);

    let svg_dir = tempfile::tempdir().unwrap();
    let svg = svg_dir.path().join("mark.svg");
    std::fs::write(
        &svg,
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="50"><rect width="100" height="50" fill="#000"/></svg>"##,
    )
    .unwrap();

    let engine = WatermarkEngine::from_path(&svg, WatermarkOptions { x: 0, y: 0 }).unwrap();
    let summary = engine.process_directory(src.path(), out.path(), &NullObserver);
    assert_eq!(summary, BatchSummary { processed: 2, failed: 0 });

    // Shrunk to fit half of 40x40 on the small photo...
    let small = image::open(out.path().join("small.png")).unwrap().to_rgb8();
    assert!(small.get_pixel(2, 2).0.iter().all(|&c| c < 8));
    assert_eq!(small.get_pixel(25, 5), &Rgb([200, 200, 200]));
    // ...and full size on the large one, from the same unmodified watermark.
    let large = image::open(out.path().join("large.png")).unwrap().to_rgb8();
    assert_eq!(large.get_pixel(98, 48), &Rgb([0, 0, 0]));
    assert_eq!(large.get_pixel(100, 10), &Rgb([200, 200, 200]));
    assert_eq!(engine.watermark().dimensions(), (100, 50));
}

#[test]
fn unwritable_destination_counts_as_failure() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_photo(&src.path().join("sub").join("a.png"), 10, 10);
    write_photo(&src.path().join("b.png"), 10, 10);
    // A file where the mirrored subdirectory should go.
    std::fs::write(out.path().join("sub"), b"in the way").unwrap();

    let engine = WatermarkEngine::new(
        Watermark::new(RgbaImage::new(2, 2)),
        WatermarkOptions::default(),
    );
    let recorder = Recorder::default();
    let summary = engine.process_directory(src.path(), out.path(), &recorder);

    assert_eq!(summary, BatchSummary { processed: 1, failed: 1 });
    assert_eq!(
        *recorder.done.lock().unwrap(),
        vec![src.path().join("b.png")]
    );
}

#[test]
fn invalid_request_is_rejected_before_processing() {
    let out = tempfile::tempdir().unwrap();
    let request = BatchRequest {
        source: out.path().join("missing"),
        watermark: out.path().join("mark.png"),
        output: out.path().join("result"),
        x: 0,
        y: 0,
    };

    let err = run_batch(&request, &NullObserver).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(!out.path().join("result").exists());
}

#[test]
fn undecodable_watermark_aborts_the_run() {
    let src = tempfile::tempdir().unwrap();
    let mark = src.path().join("mark.png");
    std::fs::write(&mark, b"nope").unwrap();

    let request = BatchRequest {
        source: src.path().to_path_buf(),
        watermark: mark,
        output: src.path().join("out"),
        x: 0,
        y: 0,
    };
    assert!(matches!(
        run_batch(&request, &NullObserver),
        Err(Error::Decode { .. })
    ));
}

#[test]
fn png_round_trip_without_watermark_is_lossless() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.png");
    let output = dir.path().join("out.png");

    let mut original = RgbImage::new(16, 9);
    for (x, y, px) in original.enumerate_pixels_mut() {
        #[allow(clippy::cast_possible_truncation)]
        {
            *px = Rgb([(x * 16) as u8, (y * 28) as u8, ((x + y) * 7) as u8]);
        }
    }
    original.save(&input).unwrap();

    let loaded = load_image(&input).unwrap();
    save_image(&composite(&loaded, None, 0, 0), &output).unwrap();

    assert_eq!(image::open(&output).unwrap().to_rgb8(), original);
}
