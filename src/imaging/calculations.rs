//! Pure calculation functions for image dimensions and encode quality.
//!
//! All functions here are pure and testable without any I/O or images.

use crate::types::{ResolutionSet, Size, TargetSize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScaleError {
    #[error("invalid dimension: cannot fit {size} into {bounds}")]
    InvalidDimension { size: Size, bounds: Size },
}

/// Fit `source` inside `target`, preserving aspect ratio.
///
/// Width-constrained first: `x = tx`, `y = sy * tx / sx`. If that overflows
/// the box height, height-constrained instead: `y = ty`, `x = sx * ty / sy`.
/// Divisions truncate, so the same inputs always produce the same pixels.
///
/// ```
/// # use slide_album::imaging::fit;
/// # use slide_album::types::Size;
/// assert_eq!(fit(Size::new(640, 480), Size::new(160, 160)).unwrap(), Size::new(160, 120));
/// assert_eq!(fit(Size::new(480, 640), Size::new(160, 160)).unwrap(), Size::new(120, 160));
/// ```
pub fn fit(source: Size, target: Size) -> Result<Size, ScaleError> {
    if source.width == 0 || source.height == 0 || target.width == 0 || target.height == 0 {
        return Err(ScaleError::InvalidDimension {
            size: source,
            bounds: target,
        });
    }
    let (sx, sy) = (u64::from(source.width), u64::from(source.height));
    let (tx, ty) = (u64::from(target.width), u64::from(target.height));

    let y = sy * tx / sx;
    if y <= ty {
        // y <= ty, so it fits back into u32
        return Ok(Size::new(target.width, y as u32));
    }
    let x = sx * ty / sy;
    Ok(Size::new(x as u32, target.height))
}

/// Fitted size for one configured target, as rendered by the assembler.
///
/// Sources that already fit inside the box keep their native size; the
/// `Original` sentinel always does.
pub fn rendition_size(source: Size, target: TargetSize) -> Result<Size, ScaleError> {
    match target {
        TargetSize::Original => Ok(source),
        TargetSize::Box(bounds) if source.fits_within(bounds) => {
            if source.width == 0 || source.height == 0 {
                return Err(ScaleError::InvalidDimension {
                    size: source,
                    bounds,
                });
            }
            Ok(source)
        }
        TargetSize::Box(bounds) => fit(source, bounds),
    }
}

/// Compute the full [`ResolutionSet`] of a source across all targets, in order.
pub fn resolution_set(source: Size, targets: &[TargetSize]) -> Result<ResolutionSet, ScaleError> {
    targets
        .iter()
        .map(|&target| rendition_size(source, target))
        .collect::<Result<Vec<_>, _>>()
        .map(ResolutionSet)
}

/// Per-size JPEG quality, linearly interpolated from `low` (first size) to
/// `high` (last size) and rounded half-up.
///
/// A single size gets `low`.
pub fn interpolate_qualities(low: u32, high: u32, count: usize) -> Vec<u32> {
    match count {
        0 => Vec::new(),
        1 => vec![low],
        n => {
            let delta = (f64::from(high) - f64::from(low)) / (n - 1) as f64;
            (0..n)
                .map(|i| (f64::from(low) + delta * i as f64 + 0.5).floor() as u32)
                .collect()
        }
    }
}
