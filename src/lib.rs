//! # Slide Album
//!
//! Assembles a photo collection into a static, multi-resolution album for a
//! slideshow viewer. Every source image is scaled into a fixed list of pixel
//! boxes, the per-image lists of fitted sizes are deduplicated into short
//! codes, and a handful of JSON manifests tell the viewer what exists.
//!
//! # Pipeline
//!
//! ```text
//! source dir ─► ImageCollection ─► AlbumAssembler ─► <dest>/slides/<WxH>/<basename>
//!                                        │
//!                                        └──────────► <dest>/slides/*.json
//! ```
//!
//! Per image, the assembler decodes once, fits the source into each target
//! box, hands the fitted sizes to a [`registry::ResolutionRegistry`] for a
//! code, and submits one resize job per box to a bounded
//! [`pool::ResizeWorkerPool`]. The pool is drained before the next image is
//! decoded. After the last image [`manifest::ManifestWriter`] writes the
//! manifests atomically.
//!
//! Separately, [`thumbnail_cache::ThumbnailCache`] serves preview bitmaps to
//! an interactive editor.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`assemble`] | Run orchestration, cancellation, progress events, failure report |
//! | [`collection`] | Source images: unique basenames, directory scan, capture-time order |
//! | [`registry`] | Resolution set → `resNN` code deduplication |
//! | [`pool`] | Bounded rayon pool with a per-image drain barrier |
//! | [`manifest`] | The five viewer JSON files, atomic writes, `resolutions.json` reader |
//! | [`thumbnail_cache`] | Two-level preview cache for the editor |
//! | [`archive`] | Collector interface for the downloadable archive of originals |
//! | [`metadata`] | Captions (sidecar, IPTC, JPEG comment) and EXIF capture time |
//! | [`config`] | `album.toml` loading, merging, validation, presentation options |
//! | [`imaging`] | Fit math, quality ladder, backend trait and the `image`-crate backend |
//! | [`types`] | `Size`, `TargetSize`, `ResolutionSet` |
//! | [`output`] | CLI progress formatting |
//! | [`logging`] | `tracing` subscriber setup |
//!
//! # Design Decisions
//!
//! ## No Upscaling
//!
//! A source that already fits a target box keeps its native size for that
//! box. Small images therefore get a resolution set of their own rather than
//! being blown up to the shared one, and the viewer never loads pixels that
//! carry no detail.
//!
//! ## One Image at a Time
//!
//! Parallelism is within an image only: its renditions are resized
//! concurrently and drained before the next source is decoded. Peak memory is
//! one decoded source plus `workers` scaled copies, and output order (file
//! list, codes, archive members) is the collection order regardless of the
//! worker count.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resampling and JPEG encoding use the `image` crate, so the
//! binary has no system dependencies.

pub mod archive;
pub mod assemble;
pub mod collection;
pub mod config;
pub mod imaging;
pub mod logging;
pub mod manifest;
pub mod metadata;
pub mod output;
pub mod pool;
pub mod registry;
pub mod thumbnail_cache;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
