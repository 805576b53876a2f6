//! Shared test utilities for the slide-album test suite.
//!
//! Synthetic source images generated with the `image` crate, so tests never
//! depend on fixture files.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let tmp = source_dir(&[("a.jpg", 640, 480), ("b.jpg", 480, 640)]);
//! let collection = ImageCollection::from_directory(tmp.path()).unwrap();
//! ```

use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tempfile::TempDir;

// =========================================================================
// Image files
// =========================================================================

/// Gradient with a little structure, so resampling filters have something
/// to work on.
fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            if (x / 8 + y / 8) % 2 == 0 { 40 } else { 200 },
        ])
    })
}

/// Write a baseline JPEG of the given size.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let file = BufWriter::new(File::create(path).unwrap());
    JpegEncoder::new_with_quality(file, 90)
        .encode_image(&gradient(width, height))
        .unwrap();
}

/// Write a PNG of the given size.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    gradient(width, height)
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}

/// Write a file with a JPEG signature and garbage after it.
pub fn create_corrupt_image(path: &Path) {
    std::fs::write(path, [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', 0x00]).unwrap();
}

// =========================================================================
// Source directories
// =========================================================================

/// Temp directory holding one JPEG per `(name, width, height)`.
pub fn source_dir(images: &[(&str, u32, u32)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (name, width, height) in images {
        create_test_jpeg(&tmp.path().join(name), *width, *height);
    }
    tmp
}

#[test]
fn test_jpeg_has_requested_size() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("a.jpg");
    create_test_jpeg(&path, 33, 17);
    assert_eq!(image::image_dimensions(&path).unwrap(), (33, 17));
}
