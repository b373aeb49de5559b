//! Parameter types for watermark rendering and export.
//!
//! These structs describe *what* to render, not *how*. A [`WatermarkSpec`] is
//! built fresh for every preview frame or export call and is never mutated in
//! place; two specs with equal fields render identical pixels.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 95). Clamped on construction.
//! - [`WatermarkSpec`]: Text, optional font file, size, RGBA color and placement.
//! - [`ExportFormat`]: The four writable formats: JPEG, PNG, BMP, TIFF.

use super::placement::Placement;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Quality setting for lossy image encoding (1-100).
///
/// Only JPEG output reads it; the other formats are lossless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(95)
    }
}

/// Default watermark font size in pixels per em.
pub const DEFAULT_FONT_SIZE: u32 = 40;

/// Everything needed to render one watermark.
///
/// `color[3]` is the blend strength of the whole watermark: 255 draws the
/// text fully opaque, 0 leaves the image untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkSpec {
    pub text: String,
    /// Font file to try first. Missing or unreadable files fall through to
    /// the font chain without error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
    pub font_size: u32,
    /// `[r, g, b, a]`.
    pub color: [u8; 4],
    pub placement: Placement,
}

impl WatermarkSpec {
    /// A watermark with default styling: 40px, white at alpha 128, bottom-right.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_path: None,
            font_size: DEFAULT_FONT_SIZE,
            color: [255, 255, 255, 128],
            placement: Placement::default(),
        }
    }

    pub fn with_font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }

    /// Font size in pixels; zero is raised to 1.
    pub fn with_font_size(mut self, size: u32) -> Self {
        self.font_size = size.max(1);
        self
    }

    pub fn with_color(mut self, color: [u8; 4]) -> Self {
        self.color = color;
        self
    }

    /// Color from wide integer channels, each clamped to `0..=255`.
    pub fn with_color_channels(self, r: i64, g: i64, b: i64, a: i64) -> Self {
        self.with_color([clamp_channel(r), clamp_channel(g), clamp_channel(b), clamp_channel(a)])
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Font size with the `> 0` invariant enforced, for specs built by hand
    /// or deserialized from elsewhere.
    pub fn effective_font_size(&self) -> u32 {
        self.font_size.max(1)
    }

    pub fn alpha(&self) -> u8 {
        self.color[3]
    }
}

/// Clamp an integer color channel into `0..=255`.
pub fn clamp_channel(value: i64) -> u8 {
    value.clamp(0, 255) as u8
}

/// Output formats the exporter can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Jpeg,
    Png,
    Bmp,
    Tiff,
}

impl ExportFormat {
    /// Format for a file extension (case-insensitive), e.g. `"JPG"` → JPEG.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg),
            "png" => Some(ExportFormat::Png),
            "bmp" => Some(ExportFormat::Bmp),
            "tif" | "tiff" => Some(ExportFormat::Tiff),
            _ => None,
        }
    }

    /// Format implied by a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Preferred file extension.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Png => "png",
            ExportFormat::Bmp => "bmp",
            ExportFormat::Tiff => "tiff",
        }
    }

    /// Whether the encoded file can carry an alpha channel.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, ExportFormat::Jpeg)
    }

    pub(crate) fn image_format(self) -> image::ImageFormat {
        match self {
            ExportFormat::Jpeg => image::ImageFormat::Jpeg,
            ExportFormat::Png => image::ImageFormat::Png,
            ExportFormat::Bmp => image::ImageFormat::Bmp,
            ExportFormat::Tiff => image::ImageFormat::Tiff,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportFormat::Jpeg => "JPEG",
            ExportFormat::Png => "PNG",
            ExportFormat::Bmp => "BMP",
            ExportFormat::Tiff => "TIFF",
        };
        f.write_str(name)
    }
}
