//! Suggested output filenames.
//!
//! Every result is named `optimized_<base>.<ext>`, where `<base>` is the
//! original filename with any directory and its last extension removed, and
//! `<ext>` comes from the output format (`jpg`, `png`, `webp`):
//!
//! - `holiday.png` + JPEG → `optimized_holiday.jpg`
//! - `archive.tar.gz` + PNG → `optimized_archive.tar.png`
//! - `photos/cat.JPEG` + WebP → `optimized_cat.webp`
//!
//! Names are not deduplicated; two sources with the same base name produce
//! the same suggestion.

use crate::imaging::OutputFormat;

const PREFIX: &str = "optimized_";

/// Fallback base when the original name has nothing usable left.
const FALLBACK_BASE: &str = "image";

/// Strip directories and the last extension from a filename.
///
/// A leading dot is part of the name, not an extension separator
/// (`.hidden` stays `.hidden`).
pub fn base_name(filename: &str) -> &str {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(dot) => &name[..dot],
    }
}

/// Build the suggested filename for an optimized output.
pub fn suggested_filename(original: &str, format: OutputFormat) -> String {
    let base = base_name(original.trim());
    let base = if base.is_empty() { FALLBACK_BASE } else { base };
    format!("{}{}.{}", PREFIX, base, format.extension())
}
