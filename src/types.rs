//! Value types shared by the assembler, the manifest and the configuration.
//!
//! [`Size`] serializes as a two-element `[width, height]` array, which is the
//! shape the viewer expects inside `resolutions.json` and what users write in
//! `album.toml` (`sizes = [[480, 320], [960, 640]]`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Directory name used for the original-size sentinel.
pub const ORIGINAL_SIZE_DIR: &str = "original_size";

/// A pixel size or pixel box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True if `self` fits inside `bounds` without scaling.
    pub fn fits_within(self, bounds: Size) -> bool {
        self.width <= bounds.width && self.height <= bounds.height
    }
}

impl From<[u32; 2]> for Size {
    fn from([width, height]: [u32; 2]) -> Self {
        Self { width, height }
    }
}

impl From<Size> for [u32; 2] {
    fn from(size: Size) -> Self {
        [size.width, size.height]
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One configured output size.
///
/// `Original` keeps the native size: the source file is copied verbatim
/// into [`ORIGINAL_SIZE_DIR`] and never re-encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetSize {
    Box(Size),
    Original,
}

impl TargetSize {
    pub const fn boxed(width: u32, height: u32) -> Self {
        TargetSize::Box(Size::new(width, height))
    }

    /// Directory under `slides/` holding renditions at this size.
    pub fn dir_name(&self) -> String {
        match self {
            TargetSize::Box(size) => size.to_string(),
            TargetSize::Original => ORIGINAL_SIZE_DIR.to_string(),
        }
    }
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSize::Box(size) => write!(f, "{size}"),
            TargetSize::Original => f.write_str("original"),
        }
    }
}

/// Fitted sizes for one image, one entry per configured [`TargetSize`],
/// in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolutionSet(pub Vec<Size>);

impl ResolutionSet {
    pub fn sizes(&self) -> &[Size] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Size>> for ResolutionSet {
    fn from(sizes: Vec<Size>) -> Self {
        Self(sizes)
    }
}
