//! Watermark template documents.
//!
//! A template is the JSON a user saves and reloads between sessions:
//!
//! ```json
//! {
//!   "text": "© 2024 Jane Doe",
//!   "font_size": 40,
//!   "font_size_auto": false,
//!   "opacity": 50,
//!   "color": [255, 255, 255],
//!   "position_mode": "bottom-right",
//!   "offset_x": null,
//!   "offset_y": null
//! }
//! ```
//!
//! `position_mode` is an anchor name (`top-left` … `bottom-right`),
//! `"relative"` (offsets are fractions of the drawable range) or
//! `"manual"`/`"custom"` (offsets are pixels). Anything else falls back to
//! `bottom-right`.
//!
//! `opacity` is 0–100. Older documents stored the raw alpha (0–255); any
//! value above 100 is read as alpha and clamped to 255.
//!
//! Unknown fields are ignored so documents written by newer tools still load.

use crate::imaging::{
    Anchor, DEFAULT_FONT_SIZE, Placement, WatermarkSpec, calculate_auto_font_size,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

const MODE_RELATIVE: &str = "relative";
const MODE_MANUAL: &str = "manual";
const MODE_CUSTOM: &str = "custom";

/// A saved watermark template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkTemplate {
    pub text: String,
    pub font_size: u32,
    /// Size the text from the image instead of `font_size`.
    pub font_size_auto: bool,
    /// 0–100, or a legacy 0–255 alpha when above 100.
    pub opacity: f64,
    /// `[r, g, b]`; out-of-range values are clamped.
    pub color: [i64; 3],
    pub position_mode: String,
    pub offset_x: Value,
    pub offset_y: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
}

impl Default for WatermarkTemplate {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: DEFAULT_FONT_SIZE,
            font_size_auto: false,
            opacity: 50.0,
            color: [255, 255, 255],
            position_mode: Anchor::BottomRight.name().to_string(),
            offset_x: Value::Null,
            offset_y: Value::Null,
            font_path: None,
        }
    }
}

/// Map template opacity to an alpha byte: `round(opacity × 255 / 100)`,
/// halves to even like the placement resolver, so 30 gives 76.
///
/// Values above 100 are legacy alphas and pass through, clamped to 255.
/// Negative or non-finite values give 0.
pub fn opacity_to_alpha(opacity: f64) -> u8 {
    if !opacity.is_finite() || opacity <= 0.0 {
        return 0;
    }
    let alpha = if opacity > 100.0 {
        opacity
    } else {
        opacity * 255.0 / 100.0
    };
    alpha.round_ties_even().min(255.0) as u8
}

/// Map an alpha byte back to opacity: `round(alpha × 100 / 255)`, halves to even.
pub fn alpha_to_opacity(alpha: u8) -> u8 {
    (alpha as f64 * 100.0 / 255.0).round_ties_even() as u8
}

/// A JSON offset as a number. Numeric strings count; anything else is `None`.
fn offset_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn offset_pixels(value: &Value) -> i32 {
    offset_number(value)
        .map(|n| n.round_ties_even().clamp(i32::MIN as f64, i32::MAX as f64) as i32)
        .unwrap_or(0)
}

impl WatermarkTemplate {
    pub fn from_json(json: &str) -> Result<Self, TemplateError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, TemplateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn save(&self, path: &Path) -> Result<(), TemplateError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn alpha(&self) -> u8 {
        opacity_to_alpha(self.opacity)
    }

    /// The placement this template describes.
    pub fn placement(&self) -> Placement {
        let mode = self.position_mode.trim().to_ascii_lowercase();
        match mode.as_str() {
            MODE_RELATIVE => Placement::relative(
                offset_number(&self.offset_x).unwrap_or(0.5),
                offset_number(&self.offset_y).unwrap_or(0.5),
            ),
            MODE_MANUAL | MODE_CUSTOM => {
                Placement::manual(offset_pixels(&self.offset_x), offset_pixels(&self.offset_y))
            }
            _ => Placement::preset(Anchor::from_name(&mode)),
        }
    }

    /// The spec this template describes, using `font_size` as-is.
    pub fn to_spec(&self) -> WatermarkSpec {
        let [r, g, b] = self.color;
        let mut spec = WatermarkSpec::new(self.text.clone())
            .with_font_size(self.font_size)
            .with_color_channels(r, g, b, self.alpha() as i64)
            .with_placement(self.placement());
        spec.font_path = self.font_path.clone();
        spec
    }

    /// Like [`to_spec`](Self::to_spec), but resolves `font_size_auto`
    /// against the target image.
    pub fn to_spec_for_image(&self, image_size: (u32, u32)) -> WatermarkSpec {
        let spec = self.to_spec();
        if self.font_size_auto {
            spec.with_font_size(calculate_auto_font_size(image_size))
        } else {
            spec
        }
    }

    /// The template that reproduces `spec`. Opacity is re-expressed on the
    /// 0–100 scale.
    pub fn from_spec(spec: &WatermarkSpec) -> Self {
        let (position_mode, offset_x, offset_y) = match spec.placement {
            Placement::Preset { anchor } => (anchor.name().to_string(), Value::Null, Value::Null),
            Placement::Relative { fx, fy } => (
                MODE_RELATIVE.to_string(),
                Value::from(fx),
                Value::from(fy),
            ),
            Placement::Manual { x, y } => (MODE_MANUAL.to_string(), Value::from(x), Value::from(y)),
        };
        let [r, g, b, a] = spec.color;
        Self {
            text: spec.text.clone(),
            font_size: spec.font_size,
            font_size_auto: false,
            opacity: alpha_to_opacity(a) as f64,
            color: [r as i64, g as i64, b as i64],
            position_mode,
            offset_x,
            offset_y,
            font_path: spec.font_path.clone(),
        }
    }
}
