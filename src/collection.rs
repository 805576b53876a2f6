//! Source images for one assembly run.
//!
//! A [`SourceImage`] is keyed by its basename (the file name, extension
//! included), which is also the file name of every rendition in
//! `slides/<size>/`. Basenames must be unique within a run:
//! [`ImageCollection::add`] rejects a duplicate before anything is
//! processed and leaves the collection untouched.
//!
//! Order matters. The collection order is the processing order, which in
//! turn fixes `filenames.json`, resolution code numbering and archive member
//! order. [`ImageCollection::from_directory`] sorts by file name;
//! [`ImageCollection::sort_by_capture_time`] reorders by EXIF time.

use crate::imaging::{BackendError, ImageBackend, is_supported_image};
use crate::metadata::{read_capture_time, undated};
use crate::types::Size;
use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("duplicate image name: {0}")]
    DuplicateName(String),
    #[error("path has no file name: {}", .0.display())]
    NoFileName(PathBuf),
}

/// One source image.
#[derive(Debug, Clone)]
pub struct SourceImage {
    basename: String,
    path: PathBuf,
    dimensions: OnceLock<Size>,
    /// Caption supplied by the caller; when `None` the assembler asks its
    /// caption source.
    pub caption: Option<String>,
    pub captured_at: Option<NaiveDateTime>,
}

impl SourceImage {
    /// Image whose basename is the file name of `path`.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, CollectionError> {
        let path = path.into();
        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| CollectionError::NoFileName(path.clone()))?;
        Ok(Self::with_basename(basename, path))
    }

    /// Image published under an explicit basename.
    pub fn with_basename(basename: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            basename: basename.into(),
            path: path.into(),
            dimensions: OnceLock::new(),
            caption: None,
            captured_at: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pixel dimensions, read from the file header on first use.
    pub fn dimensions(&self, backend: &dyn ImageBackend) -> Result<Size, BackendError> {
        if let Some(size) = self.dimensions.get() {
            return Ok(*size);
        }
        let size = backend.identify(&self.path)?;
        Ok(*self.dimensions.get_or_init(|| size))
    }

    /// Dimensions if already known.
    pub fn known_dimensions(&self) -> Option<Size> {
        self.dimensions.get().copied()
    }

    /// Remember dimensions learned from a full decode.
    pub(crate) fn record_dimensions(&self, size: Size) {
        let _ = self.dimensions.set(size);
    }
}

/// Ordered set of uniquely named source images.
#[derive(Debug, Default, Clone)]
pub struct ImageCollection {
    images: Vec<SourceImage>,
    names: HashSet<String>,
}

impl ImageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an image. A duplicate basename is rejected and the collection
    /// is left unchanged.
    pub fn add(&mut self, image: SourceImage) -> Result<(), CollectionError> {
        if self.names.contains(image.basename()) {
            return Err(CollectionError::DuplicateName(image.basename().to_string()));
        }
        self.names.insert(image.basename().to_string());
        self.images.push(image);
        Ok(())
    }

    /// Build from paths in the given order.
    pub fn from_paths<I, P>(paths: I) -> Result<Self, CollectionError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut collection = Self::new();
        for path in paths {
            collection.add(SourceImage::new(path)?)?;
        }
        Ok(collection)
    }

    /// Every supported image directly inside `dir`, sorted by file name.
    /// Hidden files and subdirectories are skipped.
    pub fn from_directory(dir: &Path) -> Result<Self, CollectionError> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && is_supported_image(p)
                    && !p
                        .file_name()
                        .is_some_and(|n| n.to_string_lossy().starts_with('.'))
            })
            .collect();
        paths.sort();
        Self::from_paths(paths)
    }

    /// Fill in capture times from EXIF for images that don't have one.
    pub fn load_capture_times(&mut self) {
        for image in self.images.iter_mut().filter(|i| i.captured_at.is_none()) {
            image.captured_at = read_capture_time(&image.path);
        }
    }

    /// Reorder by capture time, oldest first. Undated images sort as
    /// [`undated`]; ties keep their current order.
    pub fn sort_by_capture_time(&mut self) {
        self.load_capture_times();
        let fallback = undated();
        self.images
            .sort_by_key(|image| image.captured_at.unwrap_or(fallback));
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SourceImage> {
        self.images.iter()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn basenames(&self) -> Vec<&str> {
        self.images.iter().map(SourceImage::basename).collect()
    }
}

impl<'a> IntoIterator for &'a ImageCollection {
    type Item = &'a SourceImage;
    type IntoIter = std::slice::Iter<'a, SourceImage>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::test_helpers::source_dir;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    // =========================================================================
    // SourceImage
    // =========================================================================

    #[test]
    fn basename_is_file_name() {
        let image = SourceImage::new("/photos/IMG_0042.jpg").unwrap();
        assert_eq!(image.basename(), "IMG_0042.jpg");
        assert_eq!(image.path(), Path::new("/photos/IMG_0042.jpg"));
    }

    #[test]
    fn path_without_file_name_is_rejected() {
        assert!(matches!(
            SourceImage::new("/"),
            Err(CollectionError::NoFileName(_))
        ));
    }

    #[test]
    fn dimensions_are_read_once() {
        let backend = MockBackend::new().with_image("a.jpg", 640, 480);
        let image = SourceImage::new("/src/a.jpg").unwrap();
        assert_eq!(image.known_dimensions(), None);

        assert_eq!(image.dimensions(&backend).unwrap(), Size::new(640, 480));
        assert_eq!(image.dimensions(&backend).unwrap(), Size::new(640, 480));

        let identifies = backend
            .get_operations()
            .iter()
            .filter(|op| matches!(op, RecordedOp::Identify(_)))
            .count();
        assert_eq!(identifies, 1);
    }

    #[test]
    fn recorded_dimensions_skip_identify() {
        let backend = MockBackend::new();
        let image = SourceImage::new("/src/a.jpg").unwrap();
        image.record_dimensions(Size::new(10, 20));
        assert_eq!(image.dimensions(&backend).unwrap(), Size::new(10, 20));
        assert!(backend.get_operations().is_empty());
    }

    // =========================================================================
    // ImageCollection::add
    // =========================================================================

    #[test]
    fn duplicate_basename_is_rejected_without_mutation() {
        let mut collection = ImageCollection::new();
        collection.add(SourceImage::new("/a/photo.jpg").unwrap()).unwrap();
        collection.add(SourceImage::new("/a/other.jpg").unwrap()).unwrap();

        let err = collection
            .add(SourceImage::new("/b/photo.jpg").unwrap())
            .unwrap_err();
        assert!(matches!(err, CollectionError::DuplicateName(ref n) if n == "photo.jpg"));
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.basenames(), vec!["photo.jpg", "other.jpg"]);
        assert_eq!(collection.iter().next().unwrap().path(), Path::new("/a/photo.jpg"));
    }

    #[test]
    fn from_paths_keeps_order() {
        let collection = ImageCollection::from_paths(["/x/B", "/x/A", "/x/C"]).unwrap();
        assert_eq!(collection.basenames(), vec!["B", "A", "C"]);
    }

    #[test]
    fn from_paths_rejects_duplicates() {
        let result = ImageCollection::from_paths(["/x/a.jpg", "/y/a.jpg"]);
        assert!(matches!(result, Err(CollectionError::DuplicateName(_))));
    }

    // =========================================================================
    // from_directory
    // =========================================================================

    #[test]
    fn from_directory_lists_supported_images_sorted() {
        let tmp = TempDir::new().unwrap();
        for name in ["b.jpg", "a.JPEG", "c.png", "notes.txt", ".hidden.jpg"] {
            fs::write(tmp.path().join(name), b"x").unwrap();
        }
        fs::create_dir(tmp.path().join("sub.jpg")).unwrap();

        let collection = ImageCollection::from_directory(tmp.path()).unwrap();
        assert_eq!(collection.basenames(), vec!["a.JPEG", "b.jpg", "c.png"]);
    }

    #[test]
    fn from_directory_missing_dir_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let result = ImageCollection::from_directory(&tmp.path().join("absent"));
        assert!(matches!(result, Err(CollectionError::Io(_))));
    }

    // =========================================================================
    // Capture time ordering
    // =========================================================================

    #[test]
    fn sort_by_capture_time_orders_oldest_first() {
        let mut collection = ImageCollection::new();
        let mut late = SourceImage::new("/x/late.jpg").unwrap();
        late.captured_at = Some(at(2020, 6, 1));
        let mut early = SourceImage::new("/x/early.jpg").unwrap();
        early.captured_at = Some(at(2019, 1, 1));
        collection.add(late).unwrap();
        collection.add(early).unwrap();

        collection.sort_by_capture_time();
        assert_eq!(collection.basenames(), vec!["early.jpg", "late.jpg"]);
    }

    #[test]
    fn images_without_exif_keep_name_order() {
        let tmp = source_dir(&[("c.jpg", 8, 8), ("a.jpg", 8, 8), ("b.jpg", 8, 8)]);
        let mut collection = ImageCollection::from_directory(tmp.path()).unwrap();

        collection.sort_by_capture_time();
        assert_eq!(collection.basenames(), vec!["a.jpg", "b.jpg", "c.jpg"]);
        assert!(collection.iter().all(|i| i.captured_at.is_none()));
    }

    #[test]
    fn undated_images_sort_as_1972_and_keep_relative_order() {
        let mut collection = ImageCollection::new();
        let mut dated = SourceImage::new("/x/dated.jpg").unwrap();
        dated.captured_at = Some(at(1990, 1, 1));
        collection.add(dated).unwrap();
        collection.add(SourceImage::new("/x/u1.jpg").unwrap()).unwrap();
        collection.add(SourceImage::new("/x/u2.jpg").unwrap()).unwrap();

        collection.sort_by_capture_time();
        assert_eq!(collection.basenames(), vec!["u1.jpg", "u2.jpg", "dated.jpg"]);
    }
}
