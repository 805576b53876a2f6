//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the assembler (which decides what renditions to create)
//! and the [`backend`](super::backend) (which does the pixel work), so the
//! pipeline can run against a mock backend in tests.
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1-100, default 90). Clamped on construction.
//! - [`Interpolation`]: resampling policy, chosen once per run.
//! - [`ResizeParams`]: output path, fitted dimensions, quality and policy for one rendition.

use crate::types::Size;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Quality 100 means "keep the original bytes" wherever a verbatim copy is possible.
    pub fn is_lossless_copy(self) -> bool {
        self.0 >= 100
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Resampling policy.
///
/// - `Fast`: nearest-neighbour pre-shrink to twice the target when the source
///   is at least that large, then Catmull-Rom to the final size.
/// - `HighQuality`: a single Lanczos3 pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Interpolation {
    Fast,
    #[default]
    HighQuality,
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interpolation::Fast => f.write_str("fast"),
            Interpolation::HighQuality => f.write_str("high-quality"),
        }
    }
}

/// Parameters for writing one scaled rendition.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub output: PathBuf,
    pub size: Size,
    pub quality: Quality,
    pub interpolation: Interpolation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn quality_100_is_lossless_copy() {
        assert!(Quality::new(100).is_lossless_copy());
        assert!(!Quality::new(99).is_lossless_copy());
    }

    #[test]
    fn interpolation_parses_kebab_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            interpolation: Interpolation,
        }
        let w: Wrapper = toml::from_str(r#"interpolation = "high-quality""#).unwrap();
        assert_eq!(w.interpolation, Interpolation::HighQuality);
        let w: Wrapper = toml::from_str(r#"interpolation = "fast""#).unwrap();
        assert_eq!(w.interpolation, Interpolation::Fast);
    }

    #[test]
    fn interpolation_default_is_high_quality() {
        assert_eq!(Interpolation::default(), Interpolation::HighQuality);
    }
}
