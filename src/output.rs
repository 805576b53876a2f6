//! CLI output formatting for assembly runs.
//!
//! Output is **image-centric**: every source image gets a header line with
//! its positional index and basename, followed by indented context lines
//! (caption, one line per rendition with its status). Diagnostics go through
//! `tracing` to stderr; everything here is user-facing progress on stdout.
//!
//! # Output Format
//!
//! ```text
//! Assembling 3 images
//!     Sizes: 160x160, 480x320, 960x640
//!     001 IMG_0042.jpg (res00, 4000x3000)
//!         Caption: Low tide at the harbour
//!         160x160: written
//!         480x320: written
//!         960x640: failed (No space left on device)
//!     002 IMG_0043.jpg skipped
//!         Error: Decode failed: IMG_0043.jpg: unexpected EOF
//!     003 IMG_0044.jpg (res00, 4000x3000)
//!         ...
//!
//! Assembled 2 of 3 images, 1 resolution code (partial)
//!     IMG_0042.jpg [960x640]: No space left on device
//!     IMG_0043.jpg: Decode failed: IMG_0043.jpg: unexpected EOF
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::assemble::{AssemblyEvent, AssemblyReport, VariantStatus};

/// Longest caption shown on a progress line.
const CAPTION_WIDTH: usize = 60;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Caption as a single display line: `<br />` markers and newlines become
/// spaces, then truncated to `max` characters with `...`.
fn caption_line(caption: &str, max: usize) -> String {
    let flat = caption
        .replace("<br />", " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max).collect();
        format!("{cut}...")
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ============================================================================
// Progress events
// ============================================================================

/// Format a single assembly progress event as display lines.
pub fn format_assembly_event(event: &AssemblyEvent) -> Vec<String> {
    match event {
        AssemblyEvent::RunStarted {
            image_count,
            directories,
        } => vec![
            format!("Assembling {}", plural(*image_count, "image", "images")),
            format!("{}Sizes: {}", indent(1), directories.join(", ")),
        ],
        AssemblyEvent::ImageAssembled {
            index,
            basename,
            source,
            code,
            caption,
            variants,
        } => {
            let mut lines = vec![format!(
                "{}{} {} ({}, {})",
                indent(1),
                format_index(*index),
                basename,
                code,
                source
            )];
            if let Some(caption) = caption.as_deref().filter(|c| !c.trim().is_empty()) {
                lines.push(format!(
                    "{}Caption: {}",
                    indent(2),
                    caption_line(caption, CAPTION_WIDTH)
                ));
            }
            for variant in variants {
                let status = match &variant.status {
                    VariantStatus::Written => "written".to_string(),
                    VariantStatus::Copied => "copied".to_string(),
                    VariantStatus::Archived => "archived".to_string(),
                    VariantStatus::Failed(message) => format!("failed ({message})"),
                };
                lines.push(format!("{}{}: {}", indent(2), variant.label, status));
            }
            lines
        }
        AssemblyEvent::ImageSkipped {
            index,
            basename,
            reason,
        } => vec![
            format!("{}{} {} skipped", indent(1), format_index(*index), basename),
            format!("{}Error: {}", indent(2), reason),
        ],
    }
}

pub fn print_assembly_event(event: &AssemblyEvent) {
    for line in format_assembly_event(event) {
        println!("{}", line);
    }
}

// ============================================================================
// Run summary
// ============================================================================

/// Format the end-of-run summary, listing every recorded failure.
pub fn format_report(report: &AssemblyReport, image_count: usize) -> Vec<String> {
    let mut lines = vec![format!(
        "Assembled {} of {}, {} ({})",
        report.assembled.len(),
        plural(image_count, "image", "images"),
        plural(report.resolution_codes, "resolution code", "resolution codes"),
        report.outcome()
    )];
    for failure in &report.failures {
        lines.push(format!("{}{}", indent(1), failure));
    }
    lines
}

pub fn print_report(report: &AssemblyReport, image_count: usize) {
    println!();
    for line in format_report(report, image_count) {
        println!("{}", line);
    }
    println!("Slides: {}", report.slides_dir.display());
}
