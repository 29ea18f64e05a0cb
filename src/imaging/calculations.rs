//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Plan output dimensions that fit within `(max_w, max_h)`.
///
/// Sources already inside the bounds are returned unchanged; nothing is
/// ever upscaled. Otherwise the width is clamped first, then the height is
/// re-checked and may override the first pass. Each axis is rounded to the
/// nearest integer after its clamp, so the final result can land a pixel
/// short of a bound. That double rounding is kept as-is.
///
/// # Arguments
/// * `src_w`, `src_h` - Source dimensions (both > 0)
/// * `max_w`, `max_h` - Maximum bounds (both > 0)
///
/// # Returns
/// * `(width, height)` - Planned output dimensions
///
/// # Examples
/// ```
/// # use imgpress::imaging::plan_dimensions;
/// // 4K UHD into 1080p bounds → exact fit
/// assert_eq!(plan_dimensions(3840, 2160, 1920, 1080), (1920, 1080));
///
/// // Wide panorama: width binds, height falls well under its max
/// assert_eq!(plan_dimensions(3840, 1080, 1920, 1080), (1920, 540));
/// ```
pub fn plan_dimensions(src_w: u32, src_h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if src_w <= max_w && src_h <= max_h {
        return (src_w, src_h);
    }

    let aspect = src_w as f64 / src_h as f64;
    let (mut w, mut h) = (src_w, src_h);

    if w > max_w {
        w = max_w;
        h = (w as f64 / aspect).round() as u32;
    }

    if h > max_h {
        h = max_h;
        w = (h as f64 * aspect).round() as u32;
    }

    (w, h)
}
