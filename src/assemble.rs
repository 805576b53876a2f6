//! Album assembly: source images in, slides and manifests out.
//!
//! [`AlbumAssembler::assemble`] walks an [`ImageCollection`] in order and,
//! for every image:
//!
//! 1. decodes the source once (a failure skips just this image)
//! 2. computes its resolution set across all target sizes and looks up the
//!    set's code in the run's [`ResolutionRegistry`]
//! 3. hands the original to the archive collector, if one is attached
//! 4. copies the original into `original_size/` when configured
//! 5. submits one resize job per box size and drains the pool
//! 6. records basename, caption and code for the manifest
//!
//! After the last image the five manifest files are written into
//! `<dest>/slides/`. Failures of single images or single renditions are
//! collected in the [`AssemblyReport`]; only directory preparation, the
//! worker pool and the manifest write abort a run.
//!
//! ## Output Structure
//!
//! ```text
//! <dest>/slides/
//! ├── directories.json
//! ├── filenames.json
//! ├── captions.json
//! ├── resolutions.json
//! ├── info.json
//! ├── 160x160/IMG_0042.jpg      # thumbnail box first
//! ├── 480x320/IMG_0042.jpg
//! ├── ...
//! └── original_size/IMG_0042.jpg  # only with include_original
//! ```

use crate::archive::ArchiveCollector;
use crate::collection::{ImageCollection, SourceImage};
use crate::config::{AlbumConfig, ConfigError, effective_workers};
use crate::imaging::{ImageBackend, Quality, ResizeParams, resolution_set};
use crate::manifest::{AlbumManifest, ManifestError, ManifestWriter};
use crate::metadata::{CaptionSource, FileCaptions};
use crate::pool::{PoolError, ResizeJob, ResizeWorkerPool};
use crate::registry::ResolutionRegistry;
use crate::types::{Size, TargetSize};
use image::DynamicImage;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Directory below the destination root holding renditions and manifests.
pub const SLIDES_DIR: &str = "slides";

/// Label used for archive failures in the report.
pub const ARCHIVE_LABEL: &str = "archive";

/// Member directory used when the destination has no usable name.
const FALLBACK_ARCHIVE_DIR: &str = "album";

#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("cannot create {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error("archive: {0}")]
    Archive(std::io::Error),
    #[error("manifest: {0}")]
    Manifest(#[from] ManifestError),
    #[error("assembly cancelled")]
    Cancelled,
}

/// Cooperative cancellation, checked before each image.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyState {
    Init,
    DirectoryPrep,
    PerImage,
    ManifestEmit,
    Done,
    Error,
}

/// Why one image (or one of its renditions) did not make it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Source unreadable; the image is left out of the manifest.
    Decode(String),
    /// One resize, copy or archive step failed; the image stays in.
    Encode { label: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFailure {
    pub basename: String,
    pub kind: FailureKind,
}

impl fmt::Display for ImageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FailureKind::Decode(message) => write!(f, "{}: {}", self.basename, message),
            FailureKind::Encode { label, message } => {
                write!(f, "{} [{}]: {}", self.basename, label, message)
            }
        }
    }
}

/// Overall result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Complete,
    Partial,
    Aborted,
}

impl RunOutcome {
    pub fn from_result(result: &Result<AssemblyReport, AssembleError>) -> Self {
        match result {
            Ok(report) => report.outcome(),
            Err(_) => RunOutcome::Aborted,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Complete => f.write_str("complete"),
            RunOutcome::Partial => f.write_str("partial"),
            RunOutcome::Aborted => f.write_str("aborted"),
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyReport {
    pub slides_dir: PathBuf,
    /// Basenames written to the manifest, in processing order.
    pub assembled: Vec<String>,
    pub failures: Vec<ImageFailure>,
    /// Distinct resolution sets seen.
    pub resolution_codes: usize,
}

impl AssemblyReport {
    pub fn outcome(&self) -> RunOutcome {
        if self.failures.is_empty() {
            RunOutcome::Complete
        } else {
            RunOutcome::Partial
        }
    }
}

/// How one rendition of an image turned out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantStatus {
    Written,
    Copied,
    Archived,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantInfo {
    pub label: String,
    pub status: VariantStatus,
}

/// Progress events, one per image plus one at the start.
#[derive(Debug, Clone, PartialEq)]
pub enum AssemblyEvent {
    RunStarted {
        image_count: usize,
        directories: Vec<String>,
    },
    ImageAssembled {
        /// 1-based position in the collection.
        index: usize,
        basename: String,
        source: Size,
        code: String,
        caption: Option<String>,
        variants: Vec<VariantInfo>,
    },
    ImageSkipped {
        index: usize,
        basename: String,
        reason: String,
    },
}

/// Per-run accumulators; dropped when the manifest is written.
struct RunState {
    registry: ResolutionRegistry,
    filenames: Vec<String>,
    captions: BTreeMap<String, String>,
    assignments: BTreeMap<String, String>,
    failures: Vec<ImageFailure>,
}

/// Drives one or more assembly runs with a fixed configuration.
pub struct AlbumAssembler {
    config: AlbumConfig,
    backend: Arc<dyn ImageBackend>,
    captions: Box<dyn CaptionSource>,
    archive: Option<Box<dyn ArchiveCollector>>,
    cancel: CancelToken,
    events: Option<Sender<AssemblyEvent>>,
    state: AssemblyState,
}

impl AlbumAssembler {
    /// Validates `config`; captions default to [`FileCaptions`].
    pub fn new(config: AlbumConfig, backend: Arc<dyn ImageBackend>) -> Result<Self, AssembleError> {
        config.validate()?;
        Ok(Self {
            config,
            backend,
            captions: Box::new(FileCaptions),
            archive: None,
            cancel: CancelToken::new(),
            events: None,
            state: AssemblyState::Init,
        })
    }

    pub fn with_captions(mut self, captions: Box<dyn CaptionSource>) -> Self {
        self.captions = captions;
        self
    }

    /// Collect originals for an archive, re-encoded at `[archive] quality`.
    pub fn with_archive(mut self, archive: Box<dyn ArchiveCollector>) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_events(mut self, events: Sender<AssemblyEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> AssemblyState {
        self.state
    }

    pub fn config(&self) -> &AlbumConfig {
        &self.config
    }

    fn transition(&mut self, next: AssemblyState) {
        debug!(from = ?self.state, to = ?next, "assembly state");
        self.state = next;
    }

    fn emit(&self, event: AssemblyEvent) {
        if let Some(events) = &self.events {
            // A closed receiver only means nobody is watching progress
            let _ = events.send(event);
        }
    }

    /// Assemble `collection` into `<dest>/slides/`.
    pub fn assemble(
        &mut self,
        collection: &ImageCollection,
        dest: &Path,
    ) -> Result<AssemblyReport, AssembleError> {
        self.transition(AssemblyState::Init);
        let result = self.run(collection, dest);
        match &result {
            Ok(report) => {
                self.transition(AssemblyState::Done);
                info!(
                    images = report.assembled.len(),
                    failures = report.failures.len(),
                    codes = report.resolution_codes,
                    outcome = %report.outcome(),
                    "assembly finished"
                );
            }
            Err(e) => {
                self.transition(AssemblyState::Error);
                warn!(error = %e, "assembly aborted");
            }
        }
        result
    }

    fn run(
        &mut self,
        collection: &ImageCollection,
        dest: &Path,
    ) -> Result<AssemblyReport, AssembleError> {
        let targets = self.config.target_sizes();
        let qualities = self.config.qualities();
        let directories: Vec<String> = targets.iter().map(TargetSize::dir_name).collect();
        let slides_dir = dest.join(SLIDES_DIR);

        self.transition(AssemblyState::DirectoryPrep);
        for dir in &directories {
            let path = slides_dir.join(dir);
            fs::create_dir_all(&path).map_err(|source| AssembleError::Directory { path, source })?;
        }
        let workers = effective_workers(&self.config.processing);
        let mut pool = ResizeWorkerPool::new(workers, Arc::clone(&self.backend))?;

        info!(
            images = collection.len(),
            sizes = directories.len(),
            workers,
            dest = %dest.display(),
            "assembly started"
        );
        self.emit(AssemblyEvent::RunStarted {
            image_count: collection.len(),
            directories: directories.clone(),
        });

        self.transition(AssemblyState::PerImage);
        let archive_dir = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| FALLBACK_ARCHIVE_DIR.to_string());
        let mut run = RunState {
            registry: ResolutionRegistry::new(),
            filenames: Vec::new(),
            captions: BTreeMap::new(),
            assignments: BTreeMap::new(),
            failures: Vec::new(),
        };

        for (pos, image) in collection.iter().enumerate() {
            if self.cancel.is_cancelled() {
                pool.drain();
                return Err(AssembleError::Cancelled);
            }
            let index = pos + 1;

            let decoded = self
                .backend
                .decode(image.path())
                .map_err(|e| e.to_string())
                .and_then(|source| {
                    let native = Size::new(source.width(), source.height());
                    let set = resolution_set(native, &targets).map_err(|e| e.to_string())?;
                    Ok((source, native, set))
                });
            let (source, native, set) = match decoded {
                Ok(decoded) => decoded,
                Err(reason) => {
                    warn!(image = image.basename(), error = %reason, "skipping unreadable image");
                    run.failures.push(ImageFailure {
                        basename: image.basename().to_string(),
                        kind: FailureKind::Decode(reason.clone()),
                    });
                    self.emit(AssemblyEvent::ImageSkipped {
                        index,
                        basename: image.basename().to_string(),
                        reason,
                    });
                    continue;
                }
            };
            image.record_dimensions(native);

            let code = run.registry.code_for(&set);
            debug!(image = image.basename(), %native, code = %code, "resolution set");

            let source = Arc::new(source);
            let mut variants = Vec::new();

            if self.archive.is_some() {
                let member = format!("{}/{}", archive_dir, image.basename());
                let status = match self.archive_original(image, &source, &member) {
                    Ok(()) => VariantStatus::Archived,
                    Err(message) => {
                        record_encode_failure(&mut run.failures, image, ARCHIVE_LABEL, &message);
                        VariantStatus::Failed(message)
                    }
                };
                variants.push(VariantInfo {
                    label: ARCHIVE_LABEL.to_string(),
                    status,
                });
            }

            for ((target, size), quality) in targets.iter().zip(set.sizes()).zip(&qualities) {
                let label = target.dir_name();
                let output = slides_dir.join(&label).join(image.basename());
                match target {
                    TargetSize::Original => {
                        let status = match fs::copy(image.path(), &output) {
                            Ok(_) => VariantStatus::Copied,
                            Err(e) => {
                                let message = e.to_string();
                                record_encode_failure(&mut run.failures, image, &label, &message);
                                VariantStatus::Failed(message)
                            }
                        };
                        variants.push(VariantInfo { label, status });
                    }
                    TargetSize::Box(_) => {
                        pool.submit(ResizeJob {
                            source: Arc::clone(&source),
                            params: ResizeParams {
                                output,
                                size: *size,
                                quality: *quality,
                                interpolation: self.config.images.interpolation,
                            },
                            label,
                        });
                    }
                }
            }

            let outcomes = pool.drain();
            debug!(image = image.basename(), jobs = outcomes.len(), "image drained");
            for outcome in outcomes {
                let status = match outcome.result {
                    Ok(()) => VariantStatus::Written,
                    Err(e) => {
                        let message = e.to_string();
                        warn!(
                            image = image.basename(),
                            size = %outcome.label,
                            error = %message,
                            "rendition failed"
                        );
                        record_encode_failure(&mut run.failures, image, &outcome.label, &message);
                        VariantStatus::Failed(message)
                    }
                };
                variants.push(VariantInfo {
                    label: outcome.label,
                    status,
                });
            }

            let caption = image
                .caption
                .clone()
                .or_else(|| self.captions.caption(image));
            run.filenames.push(image.basename().to_string());
            run.assignments
                .insert(image.basename().to_string(), code.clone());
            if let Some(caption) = &caption {
                run.captions
                    .insert(image.basename().to_string(), caption.clone());
            }

            self.emit(AssemblyEvent::ImageAssembled {
                index,
                basename: image.basename().to_string(),
                source: native,
                code,
                caption,
                variants,
            });
        }

        if let Some(archive) = self.archive.as_mut() {
            archive.finish().map_err(AssembleError::Archive)?;
        }

        self.transition(AssemblyState::ManifestEmit);
        let manifest = AlbumManifest {
            filenames: run.filenames,
            captions: run.captions,
            resolutions: run.registry.invert(),
            assignments: run.assignments,
            directories,
            info: self.config.presentation.to_info(),
        };
        ManifestWriter::new(&slides_dir).write(&manifest)?;

        Ok(AssemblyReport {
            slides_dir,
            assembled: manifest.filenames,
            failures: run.failures,
            resolution_codes: run.registry.len(),
        })
    }

    fn archive_original(
        &mut self,
        image: &SourceImage,
        source: &DynamicImage,
        member: &str,
    ) -> Result<(), String> {
        let quality = Quality::new(self.config.archive.quality);
        let bytes = if quality.is_lossless_copy() {
            fs::read(image.path()).map_err(|e| e.to_string())?
        } else {
            self.backend
                .encode(source, quality)
                .map_err(|e| e.to_string())?
        };
        let Some(archive) = self.archive.as_mut() else {
            return Ok(());
        };
        archive.append(member, &bytes).map_err(|e| e.to_string())
    }
}

fn record_encode_failure(
    failures: &mut Vec<ImageFailure>,
    image: &SourceImage,
    label: &str,
    message: &str,
) {
    failures.push(ImageFailure {
        basename: image.basename().to_string(),
        kind: FailureKind::Encode {
            label: label.to_string(),
            message: message.to_string(),
        },
    });
}
