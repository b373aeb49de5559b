//! Watermark compositor: font → measure → place → draw → blend.
//!
//! [`Compositor::apply`] is a pure function of `(image, spec)` given a fixed
//! font chain. The caller's image is only read; all work happens on an RGBA
//! copy and a same-size transparent overlay, so a preview frame and a batch
//! export of the same inputs produce byte-identical pixels.
//!
//! Blending is the Porter-Duff "over" operator with each layer's own alpha.
//! The watermark's strength lives entirely in the overlay alpha
//! (`coverage × color[3]`).

use super::builtin_font;
use super::fonts::FontChain;
use super::params::WatermarkSpec;
use super::placement::{MARGIN, resolve_position};
use super::text::{LoadedFont, TextBox};
use image::{DynamicImage, Rgba, RgbaImage};

/// Where and how big the watermark ends up on a given image.
///
/// Callers use this for hit-testing (dragging the watermark in a preview)
/// without rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkLayout {
    /// Layout origin handed to the text drawer.
    pub origin: (i32, i32),
    /// Tight ink box, relative to `origin`.
    pub text_box: TextBox,
    /// Which font the chain settled on.
    pub font: String,
}

impl WatermarkLayout {
    /// The ink rectangle in image coordinates: `(x, y, width, height)`.
    pub fn ink_rect(&self) -> (i32, i32, u32, u32) {
        (
            self.origin.0 + self.text_box.left,
            self.origin.1 + self.text_box.top,
            self.text_box.width,
            self.text_box.height,
        )
    }
}

/// Renders watermarks with a fixed font chain and margin.
#[derive(Debug)]
pub struct Compositor {
    fonts: FontChain,
    margin: i32,
}

impl Compositor {
    pub fn new(fonts: FontChain) -> Self {
        Self {
            fonts,
            margin: MARGIN,
        }
    }

    pub fn with_margin(mut self, margin: i32) -> Self {
        self.margin = margin;
        self
    }

    pub fn fonts(&self) -> &FontChain {
        &self.fonts
    }

    pub fn margin(&self) -> i32 {
        self.margin
    }

    fn plan(&self, image_size: (u32, u32), spec: &WatermarkSpec) -> (LoadedFont, WatermarkLayout) {
        let font = self
            .fonts
            .resolve(spec.font_path.as_deref(), spec.effective_font_size());
        if font.is_builtin() {
            let missing = missing_builtin_glyphs(&spec.text);
            if missing > 0 {
                tracing::warn!(missing, "built-in font lacks glyphs for some characters; drawing boxes");
            }
        }
        let text_box = font.measure(&spec.text);
        let origin = resolve_position(image_size, text_box.size(), spec.placement, self.margin);
        let layout = WatermarkLayout {
            origin,
            text_box,
            font: font.describe(),
        };
        (font, layout)
    }

    /// Compute the layout for `spec` on an image of `image_size` without drawing.
    pub fn layout(&self, image_size: (u32, u32), spec: &WatermarkSpec) -> WatermarkLayout {
        self.plan(image_size, spec).1
    }

    /// Render `spec` onto a copy of `image`.
    ///
    /// Images without alpha are widened to RGBA with alpha 255. The result
    /// has the same dimensions as the input.
    pub fn apply(&self, image: &DynamicImage, spec: &WatermarkSpec) -> RgbaImage {
        let mut working = image.to_rgba8();
        let (width, height) = working.dimensions();
        let (font, layout) = self.plan((width, height), spec);

        tracing::debug!(
            width,
            height,
            x = layout.origin.0,
            y = layout.origin.1,
            text_width = layout.text_box.width,
            text_height = layout.text_box.height,
            font = %layout.font,
            "compositing watermark"
        );

        if layout.text_box.is_empty() || spec.alpha() == 0 {
            return working;
        }

        let mut overlay = RgbaImage::new(width, height);
        font.draw(&mut overlay, layout.origin, &spec.text, spec.color);
        composite_over(&mut working, &overlay);
        working
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(FontChain::platform_default())
    }
}

/// Visible characters the bitmap font would draw as boxes.
fn missing_builtin_glyphs(text: &str) -> usize {
    text.chars()
        .filter(|&c| !c.is_whitespace() && !builtin_font::covers(c))
        .count()
}

/// Render `spec` onto a copy of `image` with the platform font chain and the
/// default margin.
pub fn apply_watermark(image: &DynamicImage, spec: &WatermarkSpec) -> RgbaImage {
    Compositor::default().apply(image, spec)
}

/// Alpha-composite `top` over `bottom` in place. Both images must be the
/// same size; extra pixels of the larger one are ignored.
pub fn composite_over(bottom: &mut RgbaImage, top: &RgbaImage) {
    let width = bottom.width().min(top.width());
    let height = bottom.height().min(top.height());
    for y in 0..height {
        for x in 0..width {
            let fg = *top.get_pixel(x, y);
            if fg[3] == 0 {
                continue;
            }
            let bg = bottom.get_pixel_mut(x, y);
            *bg = blend_over(*bg, fg);
        }
    }
}

/// Porter-Duff "over": `fg` on top of `bg`, channels rounded to nearest.
pub fn blend_over(bg: Rgba<u8>, fg: Rgba<u8>) -> Rgba<u8> {
    match fg[3] {
        0 => return bg,
        255 => return fg,
        _ => {}
    }

    let fg_alpha = fg[3] as f32 / 255.0;
    let bg_alpha = bg[3] as f32 / 255.0;
    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    let channel = |f: u8, b: u8| -> u8 {
        let value = (f as f32 * fg_alpha + b as f32 * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        value.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(fg[0], bg[0]),
        channel(fg[1], bg[1]),
        channel(fg[2], bg[2]),
        (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::placement::{Anchor, Placement};
    use crate::test_helpers::{bounding_rect, changed_pixels, gradient_rgb, system_font};

    fn compositor() -> Compositor {
        Compositor::new(FontChain::builtin_only())
    }

    // =========================================================================
    // blend_over
    // =========================================================================

    #[test]
    fn blend_transparent_foreground_is_noop() {
        let bg = Rgba([10, 20, 30, 255]);
        assert_eq!(blend_over(bg, Rgba([255, 0, 0, 0])), bg);
    }

    #[test]
    fn blend_opaque_foreground_replaces() {
        let fg = Rgba([1, 2, 3, 255]);
        assert_eq!(blend_over(Rgba([200, 200, 200, 255]), fg), fg);
    }

    #[test]
    fn blend_half_white_over_black() {
        let out = blend_over(Rgba([0, 0, 0, 255]), Rgba([255, 255, 255, 128]));
        // 255 * 128/255 = 128
        assert_eq!(out, Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn blend_onto_transparent_keeps_foreground_color() {
        let out = blend_over(Rgba([0, 0, 0, 0]), Rgba([255, 0, 0, 100]));
        assert_eq!(out, Rgba([255, 0, 0, 100]));
    }

    // =========================================================================
    // Compositor
    // =========================================================================

    #[test]
    fn apply_keeps_dimensions_and_adds_alpha() {
        let source = DynamicImage::ImageRgb8(gradient_rgb(120, 80));
        let spec = WatermarkSpec::new("Hello");
        let out = compositor().apply(&source, &spec);
        assert_eq!(out.dimensions(), (120, 80));
        assert!(out.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn apply_does_not_touch_source() {
        let source = DynamicImage::ImageRgb8(gradient_rgb(120, 80));
        let before = source.clone();
        let _ = compositor().apply(&source, &WatermarkSpec::new("Hello"));
        assert_eq!(source, before);
    }

    #[test]
    fn apply_is_deterministic() {
        let source = DynamicImage::ImageRgb8(gradient_rgb(200, 150));
        let spec = WatermarkSpec::new("Deterministic")
            .with_color([250, 10, 10, 170])
            .with_placement(Placement::relative(0.3, 0.6));
        let c = compositor();
        let first = c.apply(&source, &spec);
        let second = c.apply(&source, &spec.clone());
        assert_eq!(first.as_raw(), second.as_raw());
    }

    #[test]
    fn apply_changes_only_the_ink_rectangle() {
        let source = DynamicImage::ImageRgb8(gradient_rgb(200, 150));
        let spec = WatermarkSpec::new("Mark")
            .with_color([255, 255, 255, 255])
            .with_placement(Placement::preset(Anchor::TopLeft));
        let c = compositor();
        let layout = c.layout((200, 150), &spec);
        let out = c.apply(&source, &spec);

        let (x0, y0, w, h) = layout.ink_rect();
        let changed = changed_pixels(&source.to_rgba8(), &out);
        assert!(!changed.is_empty());
        for (x, y) in changed {
            assert!(x as i32 >= x0 && (x as i32) < x0 + w as i32);
            assert!(y as i32 >= y0 && (y as i32) < y0 + h as i32);
        }
    }

    #[test]
    fn layout_places_ink_box_by_anchor() {
        let spec = WatermarkSpec::new("ABC").with_placement(Placement::preset(Anchor::BottomRight));
        let layout = compositor().layout((400, 300), &spec);
        let (w, h) = layout.text_box.size();
        assert_eq!(
            layout.origin,
            (400 - w as i32 - 10, 300 - h as i32 - 10 - 20)
        );
        assert_eq!(layout.font, "built-in bitmap font");
    }

    #[test]
    fn custom_margin_moves_presets() {
        let spec = WatermarkSpec::new("A").with_placement(Placement::preset(Anchor::TopLeft));
        let layout = compositor().with_margin(25).layout((400, 300), &spec);
        assert_eq!(layout.origin, (25, 25));
    }

    #[test]
    fn manual_placement_draws_at_given_origin() {
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(100, 60, Rgba([0, 0, 0, 255])));
        let spec = WatermarkSpec::new("|")
            .with_color([255, 255, 255, 255])
            .with_placement(Placement::manual(30, 20));
        let out = compositor().apply(&source, &spec);
        // '|' inks columns 4..=5 of its cell, rows 0..=13
        assert_eq!(*out.get_pixel(34, 20), Rgba([255, 255, 255, 255]));
        assert_eq!(*out.get_pixel(35, 33), Rgba([255, 255, 255, 255]));
        assert_eq!(*out.get_pixel(33, 20), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn zero_alpha_or_empty_text_is_identity() {
        let source = DynamicImage::ImageRgb8(gradient_rgb(64, 64));
        let c = compositor();
        let invisible = WatermarkSpec::new("Hidden").with_color([255, 255, 255, 0]);
        assert_eq!(c.apply(&source, &invisible), source.to_rgba8());
        let empty = WatermarkSpec::new("");
        assert_eq!(c.apply(&source, &empty), source.to_rgba8());
    }

    #[test]
    fn text_larger_than_image_is_clipped_not_an_error() {
        let source = DynamicImage::ImageRgb8(gradient_rgb(16, 8));
        let spec = WatermarkSpec::new("A very long watermark line").with_color([0, 0, 0, 255]);
        let out = compositor().apply(&source, &spec);
        assert_eq!(out.dimensions(), (16, 8));
    }

    #[test]
    fn partial_alpha_blends_proportionally() {
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(60, 30, Rgba([0, 0, 0, 255])));
        let spec = WatermarkSpec::new("|")
            .with_color([255, 255, 255, 64])
            .with_placement(Placement::manual(0, 0));
        let out = compositor().apply(&source, &spec);
        // 255 * 64/255 = 64
        assert_eq!(*out.get_pixel(4, 0), Rgba([64, 64, 64, 255]));
    }

    #[test]
    fn missing_builtin_glyphs_ignores_ascii_and_whitespace() {
        assert_eq!(missing_builtin_glyphs("(c) 2024 Photo"), 0);
        assert_eq!(missing_builtin_glyphs("水印 test\n"), 2);
        assert_eq!(missing_builtin_glyphs("café"), 1);
    }

    // =========================================================================
    // Outline fonts (skipped when the machine has no TrueType font)
    // =========================================================================

    #[test]
    fn outline_changes_exactly_the_ink_rect_for_every_anchor() {
        let Some(font_path) = system_font() else { return };
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(600, 400, Rgba([0, 0, 0, 255])));
        let c = compositor();

        for anchor in Anchor::ALL {
            let spec = WatermarkSpec::new("Hg Wy\nLine two")
                .with_font_path(&font_path)
                .with_font_size(48)
                .with_color([255, 255, 255, 255])
                .with_placement(Placement::preset(anchor));
            let layout = c.layout((600, 400), &spec);
            assert_ne!(layout.font, "built-in bitmap font");

            let out = c.apply(&source, &spec);
            let changed = changed_pixels(&source.to_rgba8(), &out);
            assert_eq!(bounding_rect(&changed), Some(layout.ink_rect()), "{anchor}");
        }
    }

    #[test]
    fn outline_layout_grows_with_font_size() {
        let Some(font_path) = system_font() else { return };
        let c = compositor();
        let sized = |size| {
            let spec = WatermarkSpec::new("Watermark")
                .with_font_path(&font_path)
                .with_font_size(size);
            c.layout((2000, 1000), &spec).text_box
        };
        let (small, large) = (sized(30), sized(90));
        let width_ratio = large.width as f32 / small.width as f32;
        let height_ratio = large.height as f32 / small.height as f32;
        assert!((width_ratio - 3.0).abs() < 0.25, "width ratio {width_ratio}");
        assert!((height_ratio - 3.0).abs() < 0.35, "height ratio {height_ratio}");
    }

    #[test]
    fn apply_watermark_is_deterministic_with_platform_fonts() {
        let source = DynamicImage::ImageRgb8(gradient_rgb(320, 200));
        let spec = WatermarkSpec::new("© Photomark 水印")
            .with_color([255, 255, 255, 200])
            .with_placement(Placement::preset(Anchor::BottomRight));
        let first = apply_watermark(&source, &spec);
        assert_eq!(first.dimensions(), (320, 200));
        assert_ne!(first, source.to_rgba8());
        for _ in 0..2 {
            assert_eq!(apply_watermark(&source, &spec).as_raw(), first.as_raw());
        }
    }
}
