//! Text measurement and drawing for resolved fonts.
//!
//! Both font kinds go through one rasterizer callback, `plot(x, y, coverage)`,
//! so the box that [`LoadedFont::measure`] reports is exactly the set of
//! pixels [`LoadedFont::draw`] touches. The box comes from the ink, not from
//! font metrics: what the user drags in a preview is what gets placed.
//!
//! Coordinates are relative to the layout origin, the top-left of the first
//! line's ascender. Ink usually starts a few pixels right of and below the
//! origin; [`TextBox::left`] and [`TextBox::top`] carry that offset.

use super::builtin_font::BuiltinFont;
use ab_glyph::{Font, FontVec, GlyphId, PxScale, ScaleFont, point};
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FontLoadError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Not a usable font file: {0}")]
    Invalid(PathBuf),
}

/// Tight ink bounds of a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextBox {
    /// Offset of the first inked column from the layout origin.
    pub left: i32,
    /// Offset of the first inked row from the layout origin.
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl TextBox {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A TrueType/OpenType face scaled so that one em is `size` pixels.
pub struct OutlineFont {
    font: FontVec,
    scale: PxScale,
    source: PathBuf,
}

impl OutlineFont {
    /// Load the first face of a `.ttf`, `.otf` or `.ttc` file.
    pub fn from_file(path: &Path, size: u32) -> Result<Self, FontLoadError> {
        let data = std::fs::read(path).map_err(|source| FontLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(data, size, path)
    }

    pub fn from_bytes(data: Vec<u8>, size: u32, source: &Path) -> Result<Self, FontLoadError> {
        let font = FontVec::try_from_vec_and_index(data, 0)
            .map_err(|_| FontLoadError::Invalid(source.to_path_buf()))?;
        let units_per_em = font.units_per_em().unwrap_or(1000.0);
        let px = size.max(1) as f32 * font.height_unscaled() / units_per_em;
        Ok(Self {
            font,
            scale: PxScale::from(px),
            source: source.to_path_buf(),
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    fn rasterize(&self, text: &str, plot: &mut dyn FnMut(i32, i32, f32)) {
        let scaled = self.font.as_scaled(self.scale);
        let line_height = scaled.height() + scaled.line_gap();

        for (line_index, line) in text.split('\n').enumerate() {
            let baseline = scaled.ascent() + line_index as f32 * line_height;
            let mut caret = 0.0f32;
            let mut previous: Option<GlyphId> = None;

            for c in line.chars() {
                let id = scaled.glyph_id(c);
                if let Some(prev) = previous {
                    caret += scaled.kern(prev, id);
                }
                let glyph = id.with_scale_and_position(self.scale, point(caret, baseline));
                caret += scaled.h_advance(id);
                previous = Some(id);

                if let Some(outlined) = self.font.outline_glyph(glyph) {
                    let bounds = outlined.px_bounds();
                    let (min_x, min_y) = (bounds.min.x as i32, bounds.min.y as i32);
                    outlined.draw(|gx, gy, coverage| {
                        plot(min_x + gx as i32, min_y + gy as i32, coverage);
                    });
                }
            }
        }
    }
}

impl std::fmt::Debug for OutlineFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutlineFont")
            .field("source", &self.source)
            .field("scale", &self.scale.y)
            .finish()
    }
}

/// Result of walking the font chain.
#[derive(Debug)]
pub enum LoadedFont {
    Outline(OutlineFont),
    Builtin(BuiltinFont),
}

impl LoadedFont {
    pub fn is_builtin(&self) -> bool {
        matches!(self, LoadedFont::Builtin(_))
    }

    /// Human-readable origin for logs.
    pub fn describe(&self) -> String {
        match self {
            LoadedFont::Outline(font) => font.source().display().to_string(),
            LoadedFont::Builtin(_) => "built-in bitmap font".to_string(),
        }
    }

    fn rasterize(&self, text: &str, plot: &mut dyn FnMut(i32, i32, f32)) {
        match self {
            LoadedFont::Outline(font) => font.rasterize(text, plot),
            LoadedFont::Builtin(font) => font.rasterize(text, plot),
        }
    }

    /// Tight ink box of `text`. Empty or whitespace-only text measures as a
    /// zero-size box at the origin.
    ///
    /// Ink is every pixel that would be visible when drawn at full alpha, so
    /// an opaque [`draw`](Self::draw) touches exactly this box.
    pub fn measure(&self, text: &str) -> TextBox {
        let mut extent: Option<(i32, i32, i32, i32)> = None;
        self.rasterize(text, &mut |x, y, coverage| {
            if coverage_alpha(coverage, u8::MAX) == 0 {
                return;
            }
            extent = Some(match extent {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        });

        match extent {
            None => TextBox::default(),
            Some((x0, y0, x1, y1)) => TextBox {
                left: x0,
                top: y0,
                width: (x1 - x0 + 1) as u32,
                height: (y1 - y0 + 1) as u32,
            },
        }
    }

    /// Draw `text` onto a transparent overlay with its layout origin at
    /// `origin`.
    ///
    /// Every inked pixel gets the full RGB of `color` and an alpha of
    /// `coverage × color[3]`. Where glyphs overlap the larger alpha wins,
    /// so the overlay never holds partially premultiplied colors. Pixels
    /// outside the overlay are clipped.
    pub fn draw(&self, overlay: &mut RgbaImage, origin: (i32, i32), text: &str, color: [u8; 4]) {
        let (width, height) = (overlay.width() as i32, overlay.height() as i32);
        let [r, g, b, a] = color;

        self.rasterize(text, &mut |x, y, coverage| {
            let (px, py) = (origin.0 + x, origin.1 + y);
            if px < 0 || py < 0 || px >= width || py >= height {
                return;
            }
            let alpha = coverage_alpha(coverage, a);
            if alpha == 0 {
                return;
            }
            let pixel = overlay.get_pixel_mut(px as u32, py as u32);
            if alpha > pixel[3] {
                *pixel = Rgba([r, g, b, alpha]);
            }
        });
    }
}

fn coverage_alpha(coverage: f32, alpha: u8) -> u8 {
    (coverage.clamp(0.0, 1.0) * alpha as f32).round() as u8
}
