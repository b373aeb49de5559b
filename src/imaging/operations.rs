//! High-level image operations.
//!
//! These functions combine the compositor, fit-to-box math and the codec.
//! Preview and export share [`Compositor::apply`], so a preview is the
//! exported pixels scaled down, never a separate rendering path.

use super::calculations::calculate_fit_dimensions;
use super::codec::{self, Result};
use super::compositor::Compositor;
use super::params::{ExportFormat, Quality, WatermarkSpec};
use image::DynamicImage;
use image::imageops::FilterType;
use std::path::{Path, PathBuf};

/// A watermarked file that was written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedImage {
    pub path: PathBuf,
    pub format: ExportFormat,
    pub width: u32,
    pub height: u32,
}

/// Downscale `image` to fit inside `bounds`, preserving aspect ratio.
///
/// Uses Lanczos3. Images that already fit are returned unchanged.
pub fn resize_to_fit(image: &DynamicImage, bounds: (u32, u32)) -> DynamicImage {
    let source = (image.width(), image.height());
    let (width, height) = calculate_fit_dimensions(source, bounds);
    if (width, height) == source {
        return image.clone();
    }
    image.resize_exact(width, height, FilterType::Lanczos3)
}

/// Render `spec` at full resolution, then fit the result into `bounds`.
pub fn render_preview(
    compositor: &Compositor,
    image: &DynamicImage,
    spec: &WatermarkSpec,
    bounds: (u32, u32),
) -> DynamicImage {
    let rendered = DynamicImage::ImageRgba8(compositor.apply(image, spec));
    resize_to_fit(&rendered, bounds)
}

/// Watermark an already-decoded image and save it as `format`.
pub fn export_watermarked(
    compositor: &Compositor,
    image: &DynamicImage,
    spec: &WatermarkSpec,
    output: &Path,
    format: ExportFormat,
    quality: Quality,
) -> Result<ExportedImage> {
    let rendered = DynamicImage::ImageRgba8(compositor.apply(image, spec));
    codec::save_image(&rendered, output, format, quality)?;
    Ok(ExportedImage {
        path: output.to_path_buf(),
        format,
        width: rendered.width(),
        height: rendered.height(),
    })
}

/// Load `source`, watermark it and save it to `output`.
///
/// Nothing is written when loading or rendering fails.
pub fn watermark_file(
    compositor: &Compositor,
    source: &Path,
    output: &Path,
    spec: &WatermarkSpec,
    format: ExportFormat,
    quality: Quality,
) -> Result<ExportedImage> {
    let image = codec::load_image(source)?;
    let exported = export_watermarked(compositor, &image, spec, output, format, quality)?;
    tracing::info!(
        source = %source.display(),
        output = %output.display(),
        format = %format,
        "watermarked"
    );
    Ok(exported)
}
