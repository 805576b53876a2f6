//! Image processing on the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `ImageReader::into_dimensions` |
//! | **Embedded captions** | custom parser (JPEG APP13 IPTC + COM segment) |
//! | **Resize -> JPEG** | Lanczos3 or Nearest + CatmullRom, `JpegEncoder` |
//!
//! The module is split into:
//! - **Calculations**: pure functions for fitting and quality interpolation (unit testable)
//! - **Parameters**: data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
pub(crate) mod embedded_text;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use calculations::{ScaleError, fit, interpolate_qualities, rendition_size, resolution_set};
pub use params::{Interpolation, Quality, ResizeParams};
pub use rust_backend::{RustBackend, is_supported_image, supported_input_extensions};
