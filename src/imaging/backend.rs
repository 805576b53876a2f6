//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the operations the assembler and the
//! resize pool need: identify, decode, resize-and-encode, and encode.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use the [`MockBackend`](tests::MockBackend) below.

use super::params::{Quality, ResizeParams};
use crate::types::Size;
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    DecodeFailed(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Trait for image processing backends.
///
/// `Send + Sync` because one backend instance is shared by every worker of
/// the resize pool.
pub trait ImageBackend: Send + Sync {
    /// Read image dimensions without a full decode.
    fn identify(&self, path: &Path) -> Result<Size, BackendError>;

    /// Decode a source image into memory.
    fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError>;

    /// Scale `source` to `params.size` and write it as a JPEG to `params.output`.
    fn resize(&self, source: &DynamicImage, params: &ResizeParams) -> Result<(), BackendError>;

    /// Encode `source` at its native size as JPEG bytes.
    fn encode(&self, source: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError>;
}
