//! Album configuration.
//!
//! Handles loading, validating, and merging `album.toml`. Stock defaults
//! are overridden by whatever the user file specifies; the file is sparse,
//! so it only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [images]
//! sizes = [[480, 320], [960, 640], [1440, 900], [1920, 1200]]
//! include_original = false
//! low_res_quality = 85      # JPEG quality of the thumbnail size
//! high_res_quality = 70     # JPEG quality of the largest size
//! interpolation = "high-quality"   # or "fast"
//!
//! [processing]
//! workers = 1               # 0 = one per CPU core
//!
//! [archive]
//! enabled = false
//! quality = 100             # 100 = original bytes, lower = re-encode
//!
//! [collection]
//! sort_by_capture_time = false
//!
//! [presentation]
//! title = ""
//! subtitle = ""
//! bottom_line = ""
//! display_duration = 5000   # milliseconds per slide
//! image_fading = -750       # fade time in ms; negative = cross-fade
//! layout_type = "fullscreen"
//! layout_data = "IOF"
//! presentation_type = "gallery"
//! disable_scrolling = true
//! thumbnail_width = 160
//! thumbnail_height = 160
//! gallery_horizontal_padding = 70
//! gallery_vertical_padding = 30
//! ```
//!
//! The thumbnail box always comes first in the list of target sizes; the
//! `sizes` array lists the larger display sizes after it.
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Interpolation, Quality, interpolate_qualities};
use crate::types::{Size, TargetSize};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up in the source directory when no config path is given.
pub const CONFIG_FILENAME: &str = "album.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Album configuration loaded from `album.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlbumConfig {
    /// Output sizes, quality and resampling.
    pub images: ImagesConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Optional collection of originals for a downloadable archive.
    pub archive: ArchiveConfig,
    /// Source ordering.
    pub collection: CollectionConfig,
    /// Viewer options written to `info.json`.
    pub presentation: PresentationConfig,
}

impl AlbumConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let images = &self.images;
        for (name, value) in [
            ("images.low_res_quality", images.low_res_quality),
            ("images.high_res_quality", images.high_res_quality),
            ("archive.quality", self.archive.quality),
        ] {
            if !(1..=100).contains(&value) {
                return Err(ConfigError::Validation(format!("{name} must be 1-100")));
            }
        }
        if self.presentation.layout_data.trim().is_empty() {
            return Err(ConfigError::Validation(
                "presentation.layout_data must not be empty".into(),
            ));
        }
        validate_sizes(self.presentation.thumbnail_size(), &images.sizes)
    }

    /// Every size to render, thumbnail first, original last if enabled.
    pub fn target_sizes(&self) -> Vec<TargetSize> {
        let mut targets = vec![TargetSize::Box(self.presentation.thumbnail_size())];
        targets.extend(self.images.sizes.iter().copied().map(TargetSize::Box));
        if self.images.include_original {
            targets.push(TargetSize::Original);
        }
        targets
    }

    /// JPEG quality for each entry of [`target_sizes`](Self::target_sizes).
    pub fn qualities(&self) -> Vec<Quality> {
        interpolate_qualities(
            self.images.low_res_quality,
            self.images.high_res_quality,
            self.target_sizes().len(),
        )
        .into_iter()
        .map(Quality::new)
        .collect()
    }
}

/// Check the configured display sizes against the thumbnail box.
///
/// Each size must be at least the thumbnail in both dimensions and differ
/// from it, and each must grow from its predecessor: not smaller in either
/// dimension and not equal.
pub fn validate_sizes(thumbnail: Size, sizes: &[Size]) -> Result<(), ConfigError> {
    if thumbnail.width == 0 || thumbnail.height == 0 {
        return Err(ConfigError::Validation(format!(
            "thumbnail size {thumbnail} must be non-zero"
        )));
    }
    let mut previous = thumbnail;
    for &size in sizes {
        if !thumbnail.fits_within(size) || size == thumbnail {
            return Err(ConfigError::Validation(format!(
                "images.sizes: {size} must be larger than the thumbnail size {thumbnail}"
            )));
        }
        if !previous.fits_within(size) || size == previous {
            return Err(ConfigError::Validation(format!(
                "images.sizes must be strictly increasing: {size} follows {previous}"
            )));
        }
        previous = size;
    }
    Ok(())
}

/// Output size settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Display sizes as `[width, height]` boxes, after the thumbnail.
    pub sizes: Vec<Size>,
    /// Also copy each original verbatim into `original_size/`.
    pub include_original: bool,
    /// Quality of the first (thumbnail) size.
    pub low_res_quality: u32,
    /// Quality of the last size.
    pub high_res_quality: u32,
    pub interpolation: Interpolation,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            sizes: vec![
                Size::new(480, 320),
                Size::new(960, 640),
                Size::new(1440, 900),
                Size::new(1920, 1200),
            ],
            include_original: false,
            low_res_quality: 85,
            high_res_quality: 70,
            interpolation: Interpolation::HighQuality,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Resize workers per image. `0` means one per CPU core.
    /// Values larger than the core count are clamped down.
    pub workers: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self { workers: 1 }
    }
}

/// Resolve the effective worker count from config.
///
/// - `0` → use all available cores
/// - `n` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_workers(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    match config.workers {
        0 => cores,
        n => n.min(cores),
    }
}

/// Archive collection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    pub enabled: bool,
    /// 100 keeps the original file bytes; anything lower re-encodes.
    pub quality: u32,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            quality: 100,
        }
    }
}

/// Source ordering settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectionConfig {
    /// Order images by EXIF capture time instead of file name.
    pub sort_by_capture_time: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutType {
    #[default]
    Fullscreen,
    Tiled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationType {
    #[default]
    Gallery,
    Slideshow,
}

impl fmt::Display for LayoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LayoutType::Fullscreen => "fullscreen",
            LayoutType::Tiled => "tiled",
        })
    }
}

impl fmt::Display for PresentationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PresentationType::Gallery => "gallery",
            PresentationType::Slideshow => "slideshow",
        })
    }
}

/// Viewer options, written to `info.json` as a map of strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PresentationConfig {
    pub title: String,
    pub subtitle: String,
    pub bottom_line: String,
    /// Milliseconds each slide stays on screen.
    pub display_duration: u32,
    /// Fade time in milliseconds; negative values cross-fade.
    pub image_fading: i32,
    pub layout_type: LayoutType,
    /// Layout variant letters understood by the viewer, e.g. `"IOF"`.
    pub layout_data: String,
    pub presentation_type: PresentationType,
    pub disable_scrolling: bool,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    pub gallery_horizontal_padding: u32,
    pub gallery_vertical_padding: u32,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            subtitle: String::new(),
            bottom_line: String::new(),
            display_duration: 5000,
            image_fading: -750,
            layout_type: LayoutType::Fullscreen,
            layout_data: "IOF".to_string(),
            presentation_type: PresentationType::Gallery,
            disable_scrolling: true,
            thumbnail_width: 160,
            thumbnail_height: 160,
            gallery_horizontal_padding: 70,
            gallery_vertical_padding: 30,
        }
    }
}

const KEY_TITLE: &str = "title";
const KEY_SUBTITLE: &str = "subtitle";
const KEY_BOTTOM_LINE: &str = "bottom line";
const KEY_DISPLAY_DURATION: &str = "display duration";
const KEY_IMAGE_FADING: &str = "image fading";
const KEY_LAYOUT_TYPE: &str = "layout type";
const KEY_LAYOUT_DATA: &str = "layout data";
const KEY_PRESENTATION_TYPE: &str = "presentation type";
const KEY_DISABLE_SCROLLING: &str = "disable scrolling";
const KEY_THUMBNAIL_WIDTH: &str = "thumbnail width";
const KEY_THUMBNAIL_HEIGHT: &str = "thumbnail height";
const KEY_GALLERY_HPADDING: &str = "gallery horizontal padding";
const KEY_GALLERY_VPADDING: &str = "gallery vertical padding";

impl PresentationConfig {
    pub fn thumbnail_size(&self) -> Size {
        Size::new(self.thumbnail_width, self.thumbnail_height)
    }

    /// The `info.json` map: every value a string, keys as the viewer reads them.
    pub fn to_info(&self) -> BTreeMap<String, String> {
        [
            (KEY_TITLE, self.title.clone()),
            (KEY_SUBTITLE, self.subtitle.clone()),
            (KEY_BOTTOM_LINE, self.bottom_line.clone()),
            (KEY_DISPLAY_DURATION, self.display_duration.to_string()),
            (KEY_IMAGE_FADING, self.image_fading.to_string()),
            (KEY_LAYOUT_TYPE, self.layout_type.to_string()),
            (KEY_LAYOUT_DATA, self.layout_data.clone()),
            (KEY_PRESENTATION_TYPE, self.presentation_type.to_string()),
            (KEY_DISABLE_SCROLLING, self.disable_scrolling.to_string()),
            (KEY_THUMBNAIL_WIDTH, self.thumbnail_width.to_string()),
            (KEY_THUMBNAIL_HEIGHT, self.thumbnail_height.to_string()),
            (KEY_GALLERY_HPADDING, self.gallery_horizontal_padding.to_string()),
            (KEY_GALLERY_VPADDING, self.gallery_vertical_padding.to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    /// Rebuild from an `info.json` map. Unknown keys are ignored; missing or
    /// unparsable values keep their defaults.
    pub fn from_info(info: &BTreeMap<String, String>) -> Self {
        fn parsed<T: std::str::FromStr>(info: &BTreeMap<String, String>, key: &str, slot: &mut T) {
            if let Some(value) = info.get(key).and_then(|v| v.trim().parse().ok()) {
                *slot = value;
            }
        }
        fn text(info: &BTreeMap<String, String>, key: &str, slot: &mut String) {
            if let Some(value) = info.get(key) {
                slot.clone_from(value);
            }
        }

        let mut config = Self::default();
        text(info, KEY_TITLE, &mut config.title);
        text(info, KEY_SUBTITLE, &mut config.subtitle);
        text(info, KEY_BOTTOM_LINE, &mut config.bottom_line);
        text(info, KEY_LAYOUT_DATA, &mut config.layout_data);
        parsed(info, KEY_DISPLAY_DURATION, &mut config.display_duration);
        parsed(info, KEY_IMAGE_FADING, &mut config.image_fading);
        parsed(info, KEY_DISABLE_SCROLLING, &mut config.disable_scrolling);
        parsed(info, KEY_THUMBNAIL_WIDTH, &mut config.thumbnail_width);
        parsed(info, KEY_THUMBNAIL_HEIGHT, &mut config.thumbnail_height);
        parsed(info, KEY_GALLERY_HPADDING, &mut config.gallery_horizontal_padding);
        parsed(info, KEY_GALLERY_VPADDING, &mut config.gallery_vertical_padding);
        match info.get(KEY_LAYOUT_TYPE).map(String::as_str) {
            Some("tiled") => config.layout_type = LayoutType::Tiled,
            Some("fullscreen") => config.layout_type = LayoutType::Fullscreen,
            _ => {}
        }
        match info.get(KEY_PRESENTATION_TYPE).map(String::as_str) {
            Some("slideshow") => config.presentation_type = PresentationType::Slideshow,
            Some("gallery") => config.presentation_type = PresentationType::Gallery,
            _ => {}
        }
        config
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged on top of.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(AlbumConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<AlbumConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AlbumConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load an explicitly named config file. A missing file is an error.
pub fn load_config_file(path: &Path) -> Result<AlbumConfig, ConfigError> {
    resolve_config(Some(load_raw_config(path)?))
}

/// Load `album.toml` from a directory, falling back to stock defaults when
/// the directory has none.
pub fn load_config(dir: &Path) -> Result<AlbumConfig, ConfigError> {
    let path = dir.join(CONFIG_FILENAME);
    let overlay = if path.exists() {
        Some(load_raw_config(&path)?)
    } else {
        None
    };
    resolve_config(overlay)
}

/// Returns a fully-commented stock `album.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Album Configuration
# ===================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Output sizes
# ---------------------------------------------------------------------------
[images]
# Display sizes as [width, height] boxes. The thumbnail size from
# [presentation] is always rendered first; list larger sizes here in
# increasing order. Each image is fitted inside each box, never upscaled.
sizes = [[480, 320], [960, 640], [1440, 900], [1920, 1200]]

# Also copy every original, untouched, into slides/original_size/.
include_original = false

# JPEG quality is interpolated linearly from the thumbnail to the largest size.
low_res_quality = 85
high_res_quality = 70

# "high-quality" (Lanczos3) or "fast" (nearest-neighbour pre-shrink + bicubic).
interpolation = "high-quality"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Parallel resize workers per image. 0 = one per CPU core.
workers = 1

# ---------------------------------------------------------------------------
# Archive of originals
# ---------------------------------------------------------------------------
[archive]
enabled = false
# 100 keeps the original file bytes; lower values re-encode as JPEG.
quality = 100

# ---------------------------------------------------------------------------
# Source ordering
# ---------------------------------------------------------------------------
[collection]
# Order images by EXIF capture time instead of file name.
sort_by_capture_time = false

# ---------------------------------------------------------------------------
# Viewer presentation (written to slides/info.json)
# ---------------------------------------------------------------------------
[presentation]
title = ""
subtitle = ""
bottom_line = ""
# Milliseconds per slide in slideshow mode.
display_duration = 5000
# Fade time in milliseconds; negative values cross-fade.
image_fading = -750
# "fullscreen" or "tiled".
layout_type = "fullscreen"
layout_data = "IOF"
# "gallery" or "slideshow".
presentation_type = "gallery"
disable_scrolling = true
thumbnail_width = 160
thumbnail_height = 160
gallery_horizontal_padding = 70
gallery_vertical_padding = 30
"##
}
