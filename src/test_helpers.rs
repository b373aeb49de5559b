//! Shared test utilities for the photomark test suite.
//!
//! Synthetic images with known pixel content, so tests never need fixture
//! files. Tests of the outline font path use [`system_font`] and return early
//! on machines without one.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let before = gradient_rgb(200, 150);
//! let after = compositor.apply(&DynamicImage::ImageRgb8(before.clone()), &spec);
//! let changed = changed_pixels(&DynamicImage::ImageRgb8(before).to_rgba8(), &after);
//! ```

use crate::imaging::fonts::default_font_dirs;
use ab_glyph::{Font, FontVec};
use image::{ImageEncoder, Rgb, RgbImage, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

// =========================================================================
// Synthetic images
// =========================================================================

/// RGB image whose red channel follows x and green channel follows y.
pub fn gradient_rgb(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Write a baseline JPEG of a gradient to `path`.
pub fn write_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = gradient_rgb(width, height);
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

// =========================================================================
// Pixel comparison
// =========================================================================

/// Coordinates where two same-size images differ. Panics on a size mismatch.
pub fn changed_pixels(before: &RgbaImage, after: &RgbaImage) -> Vec<(u32, u32)> {
    assert_eq!(
        before.dimensions(),
        after.dimensions(),
        "images differ in size"
    );
    before
        .enumerate_pixels()
        .filter(|(x, y, p)| after.get_pixel(*x, *y) != *p)
        .map(|(x, y, _)| (x, y))
        .collect()
}

/// Bounding rectangle `(x, y, width, height)` of a set of pixel coordinates.
pub fn bounding_rect(points: &[(u32, u32)]) -> Option<(i32, i32, u32, u32)> {
    let (&(x, y), rest) = points.split_first()?;
    let (mut x0, mut y0, mut x1, mut y1) = (x, y, x, y);
    for &(x, y) in rest {
        x0 = x0.min(x);
        y0 = y0.min(y);
        x1 = x1.max(x);
        y1 = y1.max(y);
    }
    Some((x0 as i32, y0 as i32, x1 - x0 + 1, y1 - y0 + 1))
}

/// Bounding rectangle of the non-transparent pixels of an overlay.
pub fn ink_bounds(overlay: &RgbaImage) -> Option<(i32, i32, u32, u32)> {
    let inked: Vec<(u32, u32)> = overlay
        .enumerate_pixels()
        .filter(|(_, _, p)| p[3] > 0)
        .map(|(x, y, _)| (x, y))
        .collect();
    bounding_rect(&inked)
}

// =========================================================================
// System fonts
// =========================================================================

/// An installed `.ttf` with Latin glyphs, preferring DejaVu Sans.
/// `None` when the platform font directories hold no usable font.
pub fn system_font() -> Option<PathBuf> {
    static FOUND: OnceLock<Option<PathBuf>> = OnceLock::new();
    FOUND.get_or_init(find_system_font).clone()
}

fn find_system_font() -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = default_font_dirs()
        .into_iter()
        .filter(|dir| dir.is_dir())
        .flat_map(|dir| {
            WalkDir::new(dir)
                .max_depth(4)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .collect::<Vec<_>>()
        })
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("ttf"))
        })
        .collect();
    candidates.sort_by_key(|path| !path.ends_with("DejaVuSans.ttf"));

    candidates.into_iter().find(|path| {
        let Ok(data) = std::fs::read(path) else {
            return false;
        };
        let Ok(font) = FontVec::try_from_vec_and_index(data, 0) else {
            return false;
        };
        "HgWyLinetwo".chars().all(|c| font.glyph_id(c).0 != 0)
    })
}
