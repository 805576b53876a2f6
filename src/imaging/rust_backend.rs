//! Pure Rust image processing backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `ImageReader::into_dimensions` (header only, content sniffing) |
//! | Decode (JPEG, PNG, TIFF, WebP) | `ImageReader` with content sniffing |
//! | Resize, fast | `Nearest` pre-shrink to 2x, then `CatmullRom` |
//! | Resize, high quality | `Lanczos3` |
//! | Encode | `image::codecs::jpeg::JpegEncoder` |

use super::backend::{BackendError, ImageBackend};
use super::params::{Interpolation, Quality, ResizeParams};
use crate::types::Size;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::LazyLock;

/// Extensions whose decoders are compiled in.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// True if the path has one of the [`supported_input_extensions`] (case-insensitive).
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

/// Backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Load and decode an image from disk, sniffing the format from content so
/// extensionless basenames still decode.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| BackendError::DecodeFailed(format!("{}: {}", path.display(), e)))
}

/// Resample `source` to exactly `size` under the given policy.
pub(crate) fn scale(source: &DynamicImage, size: Size, interpolation: Interpolation) -> DynamicImage {
    let (w, h) = (size.width, size.height);
    if source.width() == w && source.height() == h {
        return source.clone();
    }
    match interpolation {
        Interpolation::Fast => {
            let (w2, h2) = (w.saturating_mul(2), h.saturating_mul(2));
            if source.width() >= w2 && source.height() >= h2 {
                source
                    .resize_exact(w2, h2, FilterType::Nearest)
                    .resize_exact(w, h, FilterType::CatmullRom)
            } else {
                source.resize_exact(w, h, FilterType::CatmullRom)
            }
        }
        Interpolation::HighQuality => source.resize_exact(w, h, FilterType::Lanczos3),
    }
}

fn encode_jpeg<W: Write>(
    writer: W,
    image: &DynamicImage,
    quality: Quality,
) -> Result<(), BackendError> {
    // JPEG has no alpha channel
    let rgb = image.to_rgb8();
    let quality = quality.value().min(100) as u8;
    JpegEncoder::new_with_quality(writer, quality)
        .encode_image(&rgb)
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {e}")))
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Size, BackendError> {
        let (width, height) = ImageReader::open(path)?
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| BackendError::DecodeFailed(format!("{}: {}", path.display(), e)))?;
        Ok(Size::new(width, height))
    }

    fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        load_image(path)
    }

    fn resize(&self, source: &DynamicImage, params: &ResizeParams) -> Result<(), BackendError> {
        let scaled = scale(source, params.size, params.interpolation);
        let mut writer = BufWriter::new(File::create(&params.output)?);
        encode_jpeg(&mut writer, &scaled, params.quality)?;
        writer.flush()?;
        Ok(())
    }

    fn encode(&self, source: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
        let mut bytes = Vec::new();
        encode_jpeg(&mut bytes, source, quality)?;
        Ok(bytes)
    }
}
