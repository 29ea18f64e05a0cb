//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Optimize
//!
//! ```text
//! Optimizing 3 images (jpeg, quality 80, max 1920x1080)
//! 001 sunset.png → optimized_sunset.jpg
//!     3840x2160 → 1920x1080
//!     2.4 MB → 312.5 KB (-87%)
//! 002 notes.svg
//!     Failed: Decode failed: SVG is vector content and cannot be rasterized
//!
//! Optimized 2 of 3 images: 2.6 MB → 340.1 KB (-87%)
//! Wrote archive optimized.zip (338.0 KB)
//! ```
//!
//! ## Plan
//!
//! ```text
//! 3840x2160 → 1920x1080 (max 1920x1080)
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::imaging::{Bounds, Dimensions, EncodeSettings};
use crate::optimize::OptimizeError;
use crate::types::OptimizedResult;
use serde::Serialize;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Human-readable byte count (B, KB, MB, GB; 1 KB = 1024 B).
pub fn format_size(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// `before → after (-NN%)`, with `+NN%` when the output grew.
fn size_change(before: usize, after: usize) -> String {
    let percent = if before == 0 {
        0.0
    } else {
        (after as f64 / before as f64 - 1.0) * 100.0
    };
    format!(
        "{} → {} ({:+.0}%)",
        format_size(before),
        format_size(after),
        percent
    )
}

// ============================================================================
// Optimize
// ============================================================================

/// Header line for an optimize run.
pub fn format_optimize_header(count: usize, settings: &EncodeSettings, bounds: Bounds) -> String {
    let noun = if count == 1 { "image" } else { "images" };
    format!(
        "Optimizing {} {} ({}, quality {}, max {}x{})",
        count,
        noun,
        settings.format,
        settings.quality.value(),
        bounds.max_width,
        bounds.max_height
    )
}

/// Lines for one source: its result on success, the error on failure.
pub fn format_result(
    index: usize,
    source_name: &str,
    result: &Result<OptimizedResult, OptimizeError>,
) -> Vec<String> {
    match result {
        Ok(r) => vec![
            format!("{} {} → {}", format_index(index), source_name, r.filename),
            format!("    {} → {}", r.source_dimensions, r.output_dimensions),
            format!("    {}", size_change(r.original_size, r.output_size)),
        ],
        Err(e) => vec![
            format!("{} {}", format_index(index), source_name),
            format!("    Failed: {}", e),
        ],
    }
}

/// Summary line across all results.
pub fn format_summary(results: &[Result<OptimizedResult, OptimizeError>]) -> String {
    let ok: Vec<&OptimizedResult> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    let before: usize = ok.iter().map(|r| r.original_size).sum();
    let after: usize = ok.iter().map(|r| r.output_size).sum();
    let noun = if results.len() == 1 { "image" } else { "images" };

    if ok.is_empty() {
        return format!("Optimized 0 of {} {}", results.len(), noun);
    }
    format!(
        "Optimized {} of {} {}: {}",
        ok.len(),
        results.len(),
        noun,
        size_change(before, after)
    )
}

/// Full optimize report: header, one block per source, summary.
pub fn format_optimize_output(
    names: &[String],
    results: &[Result<OptimizedResult, OptimizeError>],
    settings: &EncodeSettings,
    bounds: Bounds,
) -> Vec<String> {
    let mut lines = vec![format_optimize_header(results.len(), settings, bounds)];
    for (i, (name, result)) in names.iter().zip(results).enumerate() {
        lines.extend(format_result(i + 1, name, result));
    }
    lines.push(String::new());
    lines.push(format_summary(results));
    lines
}

/// Print optimize output to stdout.
pub fn print_optimize_output(
    names: &[String],
    results: &[Result<OptimizedResult, OptimizeError>],
    settings: &EncodeSettings,
    bounds: Bounds,
) {
    for line in format_optimize_output(names, results, settings, bounds) {
        println!("{}", line);
    }
}

pub fn format_archive_line(path: &str, size: usize) -> String {
    format!("Wrote archive {} ({})", path, format_size(size))
}

// ============================================================================
// JSON report
// ============================================================================

/// One entry of the `--json` report.
#[derive(Debug, Serialize)]
pub struct JsonEntry<'a> {
    pub source: &'a str,
    #[serde(flatten)]
    pub result: Option<&'a OptimizedResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn json_entries<'a>(
    names: &'a [String],
    results: &'a [Result<OptimizedResult, OptimizeError>],
) -> Vec<JsonEntry<'a>> {
    names
        .iter()
        .zip(results)
        .map(|(name, result)| JsonEntry {
            source: name,
            result: result.as_ref().ok(),
            error: result.as_ref().err().map(|e| e.to_string()),
        })
        .collect()
}

// ============================================================================
// Plan
// ============================================================================

pub fn format_plan(source: Dimensions, planned: Dimensions, bounds: Bounds) -> String {
    format!(
        "{} → {} (max {}x{})",
        source, planned, bounds.max_width, bounds.max_height
    )
}
