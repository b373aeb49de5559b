//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate dimensions that fit inside a bounding box, preserving aspect ratio.
///
/// Never upscales: a source that already fits is returned unchanged. Both
/// output edges are at least 1px.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `bounds` - Box the result must fit in (width, height)
///
/// # Returns
/// * `(width, height)` - Fitted dimensions
///
/// # Examples
/// ```
/// # use photomark::imaging::calculate_fit_dimensions;
/// // 4000x3000 into an 800x600 preview → exact 4:3 downscale
/// assert_eq!(calculate_fit_dimensions((4000, 3000), (800, 600)), (800, 600));
///
/// // Already smaller than the box → untouched
/// assert_eq!(calculate_fit_dimensions((320, 200), (800, 600)), (320, 200));
/// ```
pub fn calculate_fit_dimensions(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;

    if src_w <= max_w && src_h <= max_h {
        return source;
    }
    if src_w == 0 || src_h == 0 {
        return source;
    }

    let scale = (max_w as f64 / src_w as f64).min(max_h as f64 / src_h as f64);
    let w = ((src_w as f64 * scale).round() as u32).clamp(1, max_w.max(1));
    let h = ((src_h as f64 * scale).round() as u32).clamp(1, max_h.max(1));
    (w, h)
}

/// Font size for templates that ask for automatic sizing: one twentieth of
/// the shorter image edge, never below 12px.
pub fn calculate_auto_font_size(image: (u32, u32)) -> u32 {
    let short_edge = image.0.min(image.1);
    ((short_edge as f64 / 20.0).round() as u32).max(12)
}
