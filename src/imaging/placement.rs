//! Watermark placement: maps a placement directive to a top-left pixel origin.
//!
//! All functions here are pure: no I/O, no fonts, no pixels. The compositor
//! measures the text first and then asks [`resolve_position`] where the
//! measured box goes.
//!
//! ## Modes
//!
//! | Mode | Result |
//! |---|---|
//! | [`Placement::Preset`] | closed-form formula per [`Anchor`] |
//! | [`Placement::Relative`] | fractions mapped linearly onto the drawable range |
//! | [`Placement::Manual`] | the stored pixel position, verbatim |
//!
//! The drawable range is `[margin, W - tw - margin] × [margin, H - th - margin - BOTTOM_BIAS]`.
//! When the text is larger than the image the range collapses and the result
//! is clamped to the margin corner; coordinates may still fall outside the
//! canvas, in which case the overlay simply clips.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default distance between the text box and the image edge.
pub const MARGIN: i32 = 10;

/// Extra lift applied to the bottom row of anchors and to the lower bound
/// of relative placement, on top of [`MARGIN`].
///
/// A fixed visual tuning constant: bottom-anchored text sits clear of the
/// edge. There is no derivation behind the value.
pub const BOTTOM_BIAS: i32 = 20;

/// Fraction used when a relative coordinate is not a usable number.
const RELATIVE_FALLBACK: f64 = 0.5;

/// One of the nine named anchor regions (top/mid/bottom × left/center/right).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    TopLeft,
    TopCenter,
    TopRight,
    MidLeft,
    MidCenter,
    MidRight,
    BottomLeft,
    BottomCenter,
    #[default]
    BottomRight,
}

impl Anchor {
    pub const ALL: [Anchor; 9] = [
        Anchor::TopLeft,
        Anchor::TopCenter,
        Anchor::TopRight,
        Anchor::MidLeft,
        Anchor::MidCenter,
        Anchor::MidRight,
        Anchor::BottomLeft,
        Anchor::BottomCenter,
        Anchor::BottomRight,
    ];

    /// Canonical kebab-case name, e.g. `"mid-center"`.
    pub fn name(self) -> &'static str {
        match self {
            Anchor::TopLeft => "top-left",
            Anchor::TopCenter => "top-center",
            Anchor::TopRight => "top-right",
            Anchor::MidLeft => "mid-left",
            Anchor::MidCenter => "mid-center",
            Anchor::MidRight => "mid-right",
            Anchor::BottomLeft => "bottom-left",
            Anchor::BottomCenter => "bottom-center",
            Anchor::BottomRight => "bottom-right",
        }
    }

    /// Parse an anchor name. Case-insensitive, `_` is accepted for `-`.
    ///
    /// Returns `None` for anything that is not one of the nine names.
    pub fn parse(name: &str) -> Option<Anchor> {
        let normalized = name.trim().to_ascii_lowercase().replace('_', "-");
        Anchor::ALL.into_iter().find(|a| a.name() == normalized)
    }

    /// Parse an anchor name, falling back to [`Anchor::BottomRight`].
    pub fn from_name(name: &str) -> Anchor {
        Anchor::parse(name).unwrap_or_default()
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where the watermark goes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Placement {
    /// One of the nine named anchors.
    Preset { anchor: Anchor },
    /// Fractions of the drawable range; `0.0` is the minimum corner, `1.0`
    /// the maximum.
    Relative { fx: f64, fy: f64 },
    /// Absolute top-left pixel coordinates, used as-is.
    Manual { x: i32, y: i32 },
}

impl Placement {
    pub fn preset(anchor: Anchor) -> Self {
        Placement::Preset { anchor }
    }

    pub fn relative(fx: f64, fy: f64) -> Self {
        Placement::Relative { fx, fy }
    }

    pub fn manual(x: i32, y: i32) -> Self {
        Placement::Manual { x, y }
    }
}

impl Default for Placement {
    fn default() -> Self {
        Placement::preset(Anchor::default())
    }
}

/// Clamp a relative fraction into `[0, 1]`; non-finite input becomes `0.5`.
pub fn sanitize_fraction(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        RELATIVE_FALLBACK
    }
}

/// Resolve the top-left draw origin for a text box of `text_size` on an image
/// of `image_size`.
///
/// Never fails. Degenerate inputs (text wider or taller than the image)
/// produce coordinates that may be negative or clamp to the margin corner.
///
/// # Examples
/// ```
/// # use photomark::imaging::{Anchor, Placement, resolve_position, MARGIN};
/// let pos = resolve_position((1000, 800), (200, 50), Placement::preset(Anchor::BottomRight), MARGIN);
/// assert_eq!(pos, (790, 720));
/// ```
pub fn resolve_position(
    image_size: (u32, u32),
    text_size: (u32, u32),
    placement: Placement,
    margin: i32,
) -> (i32, i32) {
    let (img_w, img_h) = (to_i32(image_size.0), to_i32(image_size.1));
    let (text_w, text_h) = (to_i32(text_size.0), to_i32(text_size.1));
    // Free space and ranges saturate instead of overflowing for extreme margins.
    let free_w = img_w.saturating_sub(text_w);
    let free_h = img_h.saturating_sub(text_h);

    match placement {
        Placement::Preset { anchor } => {
            let x = match anchor {
                Anchor::TopLeft | Anchor::MidLeft | Anchor::BottomLeft => margin,
                Anchor::TopCenter | Anchor::MidCenter | Anchor::BottomCenter => {
                    free_w.div_euclid(2)
                }
                Anchor::TopRight | Anchor::MidRight | Anchor::BottomRight => {
                    free_w.saturating_sub(margin)
                }
            };
            let y = match anchor {
                Anchor::TopLeft | Anchor::TopCenter | Anchor::TopRight => margin,
                Anchor::MidLeft | Anchor::MidCenter | Anchor::MidRight => free_h.div_euclid(2),
                Anchor::BottomLeft | Anchor::BottomCenter | Anchor::BottomRight => free_h
                    .saturating_sub(margin)
                    .saturating_sub(BOTTOM_BIAS),
            };
            (x, y)
        }
        Placement::Relative { fx, fy } => {
            let fx = sanitize_fraction(fx);
            let fy = sanitize_fraction(fy);
            let double_margin = margin.saturating_mul(2);
            let range_x = free_w.saturating_sub(double_margin).max(0);
            let range_y = free_h
                .saturating_sub(double_margin)
                .saturating_sub(BOTTOM_BIAS)
                .max(0);
            (
                margin.saturating_add(scale_fraction(fx, range_x)),
                margin.saturating_add(scale_fraction(fy, range_y)),
            )
        }
        Placement::Manual { x, y } => (x, y),
    }
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// `round(fraction * range)` with ties to even, so `0.5 * 5` lands on 2.
fn scale_fraction(fraction: f64, range: i32) -> i32 {
    (fraction * range as f64).round_ties_even() as i32
}
