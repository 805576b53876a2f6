//! Per-image metadata: captions and capture time.
//!
//! ## Captions
//!
//! The assembler asks a [`CaptionSource`] for each image that was not given a
//! caption up front. The default [`FileCaptions`] resolves, first non-empty
//! value wins:
//!
//! - sidecar `.txt` next to the image (`IMG_0042.jpg` → `IMG_0042.txt`)
//! - IPTC Caption-Abstract embedded in the JPEG
//! - the JPEG comment segment
//!
//! Sidecars win because the user created them on purpose for this album.
//! Writing captions back into image files is left to external tools.
//!
//! ## Capture time
//!
//! [`read_capture_time`] reads EXIF `DateTimeOriginal`, falling back to the
//! `DateTime` tag. Images with neither sort as [`undated`].

use crate::collection::SourceImage;
use crate::imaging::embedded_text::read_embedded_text;
use chrono::{NaiveDate, NaiveDateTime};
use rexif::{ExifData, ExifTag};
use std::path::Path;

/// Supplies an optional caption per image.
pub trait CaptionSource {
    fn caption(&self, image: &SourceImage) -> Option<String>;
}

/// Captions from sidecar files and embedded JPEG metadata.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileCaptions;

impl CaptionSource for FileCaptions {
    fn caption(&self, image: &SourceImage) -> Option<String> {
        let sidecar = read_sidecar(image.path());
        let embedded = read_embedded_text(image.path());
        resolve(&[
            sidecar.as_deref(),
            embedded.iptc_caption.as_deref(),
            embedded.comment.as_deref(),
        ])
    }
}

/// Never supplies a caption.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCaptions;

impl CaptionSource for NoCaptions {
    fn caption(&self, _image: &SourceImage) -> Option<String> {
        None
    }
}

/// Resolve a metadata field from multiple sources.
///
/// Takes a list of optional values in priority order and returns the first
/// non-None, non-empty value, trimmed.
pub fn resolve(sources: &[Option<&str>]) -> Option<String> {
    sources
        .iter()
        .filter_map(|opt| {
            opt.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
        .next()
}

/// Read a sidecar `.txt` file for an image.
///
/// Given `album/IMG_0042.jpg`, looks for `album/IMG_0042.txt`; an
/// extensionless `album/A` looks for `album/A.txt`. Returns `None` if the
/// file doesn't exist or is blank.
pub fn read_sidecar(image_path: &Path) -> Option<String> {
    let sidecar = image_path.with_extension("txt");
    if sidecar == image_path {
        return None;
    }
    std::fs::read_to_string(sidecar)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Timestamp used for images without a readable capture time.
pub fn undated() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1972, 11, 11)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap_or_default()
}

/// EXIF capture time of an image file, if present and parsable.
pub fn read_capture_time(path: &Path) -> Option<NaiveDateTime> {
    let bytes = std::fs::read(path).ok()?;
    let exif = rexif::parse_buffer_quiet(&bytes).0.ok()?;
    [ExifTag::DateTimeOriginal, ExifTag::DateTime]
        .into_iter()
        .find_map(|tag| exif_value(&exif, tag).and_then(|v| parse_exif_datetime(&v)))
}

fn exif_value(exif: &ExifData, tag: ExifTag) -> Option<String> {
    exif.entries
        .iter()
        .find(|entry| entry.tag == tag)
        .map(|entry| entry.value_more_readable.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_exif_datetime(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim_end_matches('\0'), EXIF_DATETIME_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::create_test_jpeg;
    use std::fs;
    use tempfile::TempDir;

    // =========================================================================
    // resolve() tests
    // =========================================================================

    #[test]
    fn resolve_picks_first_non_none() {
        assert_eq!(
            resolve(&[Some("Sidecar"), Some("Embedded")]),
            Some("Sidecar".to_string())
        );
    }

    #[test]
    fn resolve_skips_none_and_blank() {
        assert_eq!(
            resolve(&[None, Some("  \n\t  "), Some("Fallback")]),
            Some("Fallback".to_string())
        );
    }

    #[test]
    fn resolve_returns_none_when_all_none() {
        assert_eq!(resolve(&[None, None]), None);
        assert_eq!(resolve(&[]), None);
    }

    // =========================================================================
    // read_sidecar() tests
    // =========================================================================

    #[test]
    fn read_sidecar_finds_matching_txt() {
        let dir = TempDir::new().unwrap();
        let img = dir.path().join("IMG_0042.jpg");
        fs::write(&img, b"fake image").unwrap();
        fs::write(dir.path().join("IMG_0042.txt"), "\n  Low tide  \n").unwrap();

        assert_eq!(read_sidecar(&img), Some("Low tide".to_string()));
    }

    #[test]
    fn read_sidecar_for_extensionless_basename() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("A.txt"), "first").unwrap();
        assert_eq!(read_sidecar(&dir.path().join("A")), Some("first".to_string()));
    }

    #[test]
    fn read_sidecar_ignores_the_image_itself() {
        let dir = TempDir::new().unwrap();
        let notes = dir.path().join("notes.txt");
        fs::write(&notes, "not a caption of itself").unwrap();
        assert_eq!(read_sidecar(&notes), None);
    }

    #[test]
    fn read_sidecar_returns_none_when_missing_or_blank() {
        let dir = TempDir::new().unwrap();
        let img = dir.path().join("a.jpg");
        assert_eq!(read_sidecar(&img), None);
        fs::write(dir.path().join("a.txt"), "   ").unwrap();
        assert_eq!(read_sidecar(&img), None);
    }

    // =========================================================================
    // CaptionSource
    // =========================================================================

    #[test]
    fn file_captions_prefers_sidecar() {
        let dir = TempDir::new().unwrap();
        let img = dir.path().join("a.jpg");
        create_test_jpeg(&img, 8, 8);
        fs::write(dir.path().join("a.txt"), "From sidecar").unwrap();

        let image = SourceImage::new(&img).unwrap();
        assert_eq!(FileCaptions.caption(&image), Some("From sidecar".to_string()));
        assert_eq!(NoCaptions.caption(&image), None);
    }

    #[test]
    fn file_captions_none_for_plain_jpeg() {
        let dir = TempDir::new().unwrap();
        let img = dir.path().join("plain.jpg");
        create_test_jpeg(&img, 8, 8);
        assert_eq!(FileCaptions.caption(&SourceImage::new(&img).unwrap()), None);
    }

    // =========================================================================
    // Capture time
    // =========================================================================

    #[test]
    fn parse_exif_datetime_format() {
        let parsed = parse_exif_datetime("2011:05:01 13:45:10").unwrap();
        assert_eq!(parsed.to_string(), "2011-05-01 13:45:10");
        assert!(parse_exif_datetime("0000:00:00 00:00:00").is_none());
        assert!(parse_exif_datetime("yesterday").is_none());
    }

    #[test]
    fn undated_is_fixed() {
        assert_eq!(undated().to_string(), "1972-11-11 12:00:00");
    }

    #[test]
    fn capture_time_missing_without_exif() {
        let dir = TempDir::new().unwrap();
        let img = dir.path().join("a.jpg");
        create_test_jpeg(&img, 8, 8);
        assert_eq!(read_capture_time(&img), None);
        assert_eq!(read_capture_time(&dir.path().join("absent.jpg")), None);
    }
}
