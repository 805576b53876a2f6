//! Preview bitmaps for the album editor.
//!
//! The editor asks for a preview of an image at some display box every time
//! the selection changes. [`ThumbnailCache`] keeps two maps:
//!
//! - a **working** bitmap per path: the source decoded once and shrunk with
//!   a nearest-neighbour filter to twice the fit of the requested box (at
//!   least 240x240), never larger than the source. A request for a box
//!   bigger than the one the working bitmap was made for decodes again.
//! - **shaped** bitmaps per `(path, box)`: the working bitmap scaled with a
//!   triangle filter to exactly fit the requested box.
//!
//! Each path has a usage counter that goes up on every serve. A new shaped
//! entry is only stored while the path has been served fewer than three
//! times; after that further sizes are computed on demand and dropped.
//! Nothing is ever evicted. The cache lives as long as the editor session.

use crate::imaging::{BackendError, ImageBackend, ScaleError, fit};
use crate::types::Size;
use image::DynamicImage;
use image::imageops::FilterType;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Box used when the caller passes a zero width or height, and the minimum
/// box a working bitmap is made for.
pub const DEFAULT_BOX: u32 = 240;

/// Serves before a path stops admitting new shaped entries.
const SHAPED_ADMISSION_LIMIT: u32 = 3;

#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("cannot decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        source: BackendError,
    },
    #[error(transparent)]
    Scale(#[from] ScaleError),
}

/// Counters for one editor session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailStats {
    /// Requests answered straight from the shaped map.
    pub hits: u32,
    /// Shaped bitmaps computed.
    pub shaped: u32,
    /// Source files decoded.
    pub decodes: u32,
}

impl ThumbnailStats {
    pub fn total(&self) -> u32 {
        self.hits + self.shaped
    }
}

impl fmt::Display for ThumbnailStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} shaped ({} total, {} decoded)",
                self.hits,
                self.shaped,
                self.total(),
                self.decodes
            )
        } else {
            write!(f, "{} shaped, {} decoded", self.shaped, self.decodes)
        }
    }
}

struct WorkingEntry {
    /// Request box this bitmap was made for.
    made_for: Size,
    bitmap: Arc<DynamicImage>,
}

/// Two-level preview cache. Single-threaded; every method takes `&mut self`.
pub struct ThumbnailCache {
    backend: Arc<dyn ImageBackend>,
    working: HashMap<PathBuf, WorkingEntry>,
    shaped: HashMap<(PathBuf, Size), Arc<DynamicImage>>,
    usage: HashMap<PathBuf, u32>,
    stats: ThumbnailStats,
}

impl ThumbnailCache {
    pub fn new(backend: Arc<dyn ImageBackend>) -> Self {
        Self {
            backend,
            working: HashMap::new(),
            shaped: HashMap::new(),
            usage: HashMap::new(),
            stats: ThumbnailStats::default(),
        }
    }

    /// Preview of `path` fitted into `width`x`height`. Zero in either
    /// dimension selects the default 240x240 box.
    pub fn get(
        &mut self,
        path: &Path,
        width: u32,
        height: u32,
    ) -> Result<Arc<DynamicImage>, ThumbnailError> {
        let request = if width == 0 || height == 0 {
            Size::new(DEFAULT_BOX, DEFAULT_BOX)
        } else {
            Size::new(width, height)
        };
        let key = (path.to_path_buf(), request);

        if let Some(bitmap) = self.shaped.get(&key) {
            let bitmap = Arc::clone(bitmap);
            self.stats.hits += 1;
            self.bump_usage(path);
            return Ok(bitmap);
        }

        let working = self.working_bitmap(path, request)?;
        let native = Size::new(working.width(), working.height());
        let target = fit(native, request)?;
        let bitmap = if target == native {
            working
        } else {
            Arc::new(working.resize_exact(target.width, target.height, FilterType::Triangle))
        };
        self.stats.shaped += 1;

        let prior = self.bump_usage(path);
        if prior < SHAPED_ADMISSION_LIMIT {
            self.shaped.insert(key, Arc::clone(&bitmap));
        } else {
            debug!(path = %path.display(), %request, "shaped preview not admitted");
        }
        Ok(bitmap)
    }

    fn bump_usage(&mut self, path: &Path) -> u32 {
        let count = self.usage.entry(path.to_path_buf()).or_insert(0);
        let prior = *count;
        *count += 1;
        prior
    }

    fn working_bitmap(
        &mut self,
        path: &Path,
        request: Size,
    ) -> Result<Arc<DynamicImage>, ThumbnailError> {
        let mut needed = Size::new(request.width.max(DEFAULT_BOX), request.height.max(DEFAULT_BOX));
        if let Some(entry) = self.working.get(path) {
            if needed.fits_within(entry.made_for) {
                return Ok(Arc::clone(&entry.bitmap));
            }
            // Grow per dimension so boxes already covered stay covered
            needed = Size::new(
                needed.width.max(entry.made_for.width),
                needed.height.max(entry.made_for.height),
            );
        }

        let source = self
            .backend
            .decode(path)
            .map_err(|source| ThumbnailError::Decode {
                path: path.to_path_buf(),
                source,
            })?;
        self.stats.decodes += 1;

        let native = Size::new(source.width(), source.height());
        let fitted = fit(native, needed)?;
        let doubled = Size::new(fitted.width.saturating_mul(2), fitted.height.saturating_mul(2));
        let bitmap = if doubled.fits_within(native) && doubled != native {
            source.resize_exact(doubled.width, doubled.height, FilterType::Nearest)
        } else {
            source
        };
        debug!(
            path = %path.display(),
            source = %native,
            working = %Size::new(bitmap.width(), bitmap.height()),
            "decoded preview source"
        );

        let bitmap = Arc::new(bitmap);
        self.working.insert(
            path.to_path_buf(),
            WorkingEntry {
                made_for: needed,
                bitmap: Arc::clone(&bitmap),
            },
        );
        Ok(bitmap)
    }

    /// Whether a shaped entry exists for this exact request.
    pub fn contains(&self, path: &Path, width: u32, height: u32) -> bool {
        self.shaped
            .contains_key(&(path.to_path_buf(), Size::new(width, height)))
    }

    pub fn shaped_len(&self) -> usize {
        self.shaped.len()
    }

    pub fn working_len(&self) -> usize {
        self.working.len()
    }

    /// How many times `path` has been served.
    pub fn usage(&self, path: &Path) -> u32 {
        self.usage.get(path).copied().unwrap_or(0)
    }

    pub fn stats(&self) -> ThumbnailStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};

    fn cache_with(backend: MockBackend) -> (ThumbnailCache, Arc<MockBackend>) {
        let backend = Arc::new(backend);
        (ThumbnailCache::new(backend.clone()), backend)
    }

    fn decode_count(backend: &MockBackend) -> usize {
        backend
            .get_operations()
            .iter()
            .filter(|op| matches!(op, RecordedOp::Decode(_)))
            .count()
    }

    // =========================================================================
    // Shaped cache
    // =========================================================================

    #[test]
    fn repeated_request_is_a_hit() {
        let (mut cache, backend) = cache_with(MockBackend::new().with_image("a.jpg", 2000, 1500));
        let path = Path::new("/photos/a.jpg");

        let first = cache.get(path, 160, 160).unwrap();
        let second = cache.get(path, 160, 160).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!((first.width(), first.height()), (160, 120));
        assert_eq!(decode_count(&backend), 1);
        assert_eq!(
            cache.stats(),
            ThumbnailStats {
                hits: 1,
                shaped: 1,
                decodes: 1
            }
        );
        assert_eq!(cache.usage(path), 2);
    }

    #[test]
    fn fourth_size_after_three_serves_is_not_admitted() {
        let (mut cache, _backend) =
            cache_with(MockBackend::new().with_image("a.jpg", 2000, 1500));
        let path = Path::new("/photos/a.jpg");

        for w in [100, 110, 120] {
            cache.get(path, w, w).unwrap();
        }
        assert_eq!(cache.shaped_len(), 3);

        let fourth = cache.get(path, 130, 130).unwrap();
        assert_eq!(fourth.width(), 130);
        assert_eq!(cache.shaped_len(), 3);
        assert!(!cache.contains(path, 130, 130));
    }

    #[test]
    fn existing_entries_still_served_after_limit() {
        let (mut cache, _backend) =
            cache_with(MockBackend::new().with_image("a.jpg", 800, 600));
        let path = Path::new("/photos/a.jpg");

        let first = cache.get(path, 100, 100).unwrap();
        for _ in 0..5 {
            cache.get(path, 200, 200).unwrap();
        }
        let again = cache.get(path, 100, 100).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
    }

    #[test]
    fn zero_dimension_selects_default_box() {
        let (mut cache, _backend) =
            cache_with(MockBackend::new().with_image("a.jpg", 1000, 1000));
        let path = Path::new("/photos/a.jpg");

        let bitmap = cache.get(path, 0, 50).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (240, 240));
        assert!(cache.contains(path, DEFAULT_BOX, DEFAULT_BOX));
    }

    // =========================================================================
    // Working cache
    // =========================================================================

    #[test]
    fn working_bitmap_is_twice_the_fit() {
        let (mut cache, _backend) =
            cache_with(MockBackend::new().with_image("a.jpg", 2000, 1500));
        let path = Path::new("/photos/a.jpg");

        cache.get(path, 100, 100).unwrap();
        let working = &cache.working[path];
        assert_eq!(working.made_for, Size::new(240, 240));
        assert_eq!(
            (working.bitmap.width(), working.bitmap.height()),
            (480, 360)
        );
    }

    #[test]
    fn working_bitmap_never_exceeds_source() {
        let (mut cache, _backend) = cache_with(MockBackend::new().with_image("s.jpg", 300, 200));
        let path = Path::new("/photos/s.jpg");

        let bitmap = cache.get(path, 0, 0).unwrap();
        let working = &cache.working[path];
        assert_eq!(
            (working.bitmap.width(), working.bitmap.height()),
            (300, 200)
        );
        assert_eq!((bitmap.width(), bitmap.height()), (240, 160));
    }

    #[test]
    fn smaller_requests_reuse_working_bitmap() {
        let (mut cache, backend) = cache_with(MockBackend::new().with_image("a.jpg", 2000, 1500));
        let path = Path::new("/photos/a.jpg");

        cache.get(path, 200, 200).unwrap();
        cache.get(path, 64, 64).unwrap();
        cache.get(path, 240, 100).unwrap();
        assert_eq!(decode_count(&backend), 1);
        assert_eq!(cache.working_len(), 1);
    }

    #[test]
    fn larger_request_decodes_again() {
        let (mut cache, backend) = cache_with(MockBackend::new().with_image("a.jpg", 2000, 1500));
        let path = Path::new("/photos/a.jpg");

        cache.get(path, 160, 160).unwrap();
        let large = cache.get(path, 600, 600).unwrap();

        assert_eq!(decode_count(&backend), 2);
        assert_eq!((large.width(), large.height()), (600, 450));
        assert_eq!(cache.working[path].made_for, Size::new(600, 600));
    }

    #[test]
    fn differently_shaped_request_widens_working_box() {
        let (mut cache, backend) = cache_with(MockBackend::new().with_image("a.jpg", 4000, 3000));
        let path = Path::new("/photos/a.jpg");

        cache.get(path, 600, 600).unwrap();
        cache.get(path, 240, 800).unwrap();
        assert_eq!(cache.working[path].made_for, Size::new(600, 800));

        cache.get(path, 500, 500).unwrap();
        assert_eq!(decode_count(&backend), 2);
        assert_eq!(cache.working[path].made_for, Size::new(600, 800));
        assert_eq!(cache.stats().decodes, 2);
    }

    // =========================================================================
    // Errors and stats
    // =========================================================================

    #[test]
    fn decode_failure_returns_error_and_caches_nothing() {
        let (mut cache, _backend) = cache_with(MockBackend::new().failing_decode("bad.jpg"));
        let path = Path::new("/photos/bad.jpg");

        let err = cache.get(path, 100, 100).unwrap_err();
        assert!(matches!(err, ThumbnailError::Decode { .. }));
        assert_eq!(cache.shaped_len(), 0);
        assert_eq!(cache.working_len(), 0);
        assert_eq!(cache.usage(path), 0);
    }

    #[test]
    fn stats_display() {
        let fresh = ThumbnailStats {
            hits: 0,
            shaped: 2,
            decodes: 1,
        };
        assert_eq!(fresh.to_string(), "2 shaped, 1 decoded");

        let warm = ThumbnailStats {
            hits: 5,
            shaped: 2,
            decodes: 1,
        };
        assert_eq!(warm.to_string(), "5 cached, 2 shaped (7 total, 1 decoded)");
    }
}
