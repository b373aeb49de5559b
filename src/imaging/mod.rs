//! Watermark rendering: pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (JPEG, PNG, BMP, TIFF) |
//! | **Fonts** | `ab_glyph` outlines, built-in bitmap font as last resort |
//! | **Composite** | custom Porter-Duff "over" on an RGBA overlay |
//! | **Preview** | `resize_exact` with `Lanczos3`, never upscaling |
//! | **Encode** | `image` encoders; JPEG flattened onto white |
//!
//! The module is split into:
//! - **Placement**: The geometry resolver (anchors, relative, manual)
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing a watermark and an export
//! - **Fonts**: [`FontProvider`] trait + [`FontChain`] fallback order
//! - **Compositor**: measure → place → draw → blend
//! - **Operations**: High-level functions combining compositor + codec

pub mod builtin_font;
mod calculations;
pub mod codec;
pub mod compositor;
pub mod fonts;
pub mod operations;
mod params;
pub mod placement;
pub mod text;

pub use calculations::{calculate_auto_font_size, calculate_fit_dimensions};
pub use codec::{
    ImagingError, load_image, save_image, save_image_inferred, supported_input_extensions,
};
pub use compositor::{Compositor, WatermarkLayout, apply_watermark};
pub use fonts::{FontChain, FontProvider};
pub use operations::{
    ExportedImage, export_watermarked, render_preview, resize_to_fit, watermark_file,
};
pub use params::{DEFAULT_FONT_SIZE, ExportFormat, Quality, WatermarkSpec, clamp_channel};
pub use placement::{Anchor, BOTTOM_BIAS, MARGIN, Placement, resolve_position};
pub use text::{LoadedFont, TextBox};
