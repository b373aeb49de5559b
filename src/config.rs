//! Engine configuration module.
//!
//! Handles loading, validating, and merging `photomark.toml`. Stock defaults
//! are overridden by whatever the user file specifies; everything else keeps
//! its default.
//!
//! ## Config File Location
//!
//! `photomark.toml` is looked up in the working directory, or passed
//! explicitly with `--config`:
//!
//! ```text
//! photos/
//! ├── photomark.toml      # optional
//! ├── IMG_0001.jpg
//! └── IMG_0002.jpg
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [fonts]
//! search_dirs = []           # Empty = platform font directories
//! cjk_candidates = ["msyh.ttc", "simhei.ttf", "simsun.ttc", "Deng.ttf",
//!                   "NotoSansCJK-Regular.ttc", "NotoSansCJKsc-Regular.otf"]
//! western_fallback = "arial" # Tried after the CJK list
//!
//! [layout]
//! margin = 10                # Distance from the image edge for presets
//!
//! [export]
//! quality = 95               # JPEG quality (1-100)
//!
//! [preview]
//! max_width = 800
//! max_height = 600
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::fonts::{
    BuiltinProvider, CJK_FONT_FILES, ExplicitPath, FontFiles, FontProvider, WESTERN_FONT,
    default_font_dirs,
};
use crate::imaging::{Compositor, FontChain, MARGIN, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in a directory by [`load_config`].
pub const CONFIG_FILE_NAME: &str = "photomark.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Engine configuration loaded from `photomark.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Where to look for font files, and which ones.
    pub fonts: FontsConfig,
    /// Preset placement margin.
    pub layout: LayoutConfig,
    /// Encoding settings for written files.
    pub export: ExportConfig,
    /// Bounding box for preview renders.
    pub preview: PreviewConfig,
}

impl EngineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.export.quality == 0 || self.export.quality > 100 {
            return Err(ConfigError::Validation(
                "export.quality must be 1-100".into(),
            ));
        }
        if self.preview.max_width == 0 || self.preview.max_height == 0 {
            return Err(ConfigError::Validation(
                "preview.max_width and preview.max_height must be non-zero".into(),
            ));
        }
        if self.layout.margin < 0 {
            return Err(ConfigError::Validation(
                "layout.margin must not be negative".into(),
            ));
        }
        if self.fonts.western_fallback.trim().is_empty() {
            return Err(ConfigError::Validation(
                "fonts.western_fallback must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Encoding quality for JPEG output.
    pub fn quality(&self) -> Quality {
        Quality::new(self.export.quality)
    }

    pub fn preview_bounds(&self) -> (u32, u32) {
        (self.preview.max_width, self.preview.max_height)
    }

    /// A compositor using this config's font chain and margin.
    pub fn compositor(&self) -> Compositor {
        Compositor::new(FontChain::from_config(&self.fonts)).with_margin(self.layout.margin)
    }
}

/// Font lookup settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontsConfig {
    /// Directories searched (recursively) for font files.
    /// When empty, the platform's standard font directories are used.
    pub search_dirs: Vec<PathBuf>,
    /// CJK-capable font file names, in priority order.
    pub cjk_candidates: Vec<String>,
    /// Western font tried after the CJK list. A bare name like `arial`
    /// matches `arial.ttf` and `arial.otf`.
    pub western_fallback: String,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            search_dirs: Vec::new(),
            cjk_candidates: CJK_FONT_FILES.iter().map(|s| s.to_string()).collect(),
            western_fallback: WESTERN_FONT.to_string(),
        }
    }
}

/// Resolve the directories to search for fonts.
///
/// - empty → platform defaults
/// - otherwise → exactly the configured list
pub fn effective_font_dirs(config: &FontsConfig) -> Vec<PathBuf> {
    if config.search_dirs.is_empty() {
        default_font_dirs()
    } else {
        config.search_dirs.clone()
    }
}

impl FontChain {
    /// Build the standard chain from `[fonts]`. An empty CJK list drops that
    /// link entirely.
    pub fn from_config(config: &FontsConfig) -> Self {
        let dirs = effective_font_dirs(config);
        let mut providers: Vec<Box<dyn FontProvider>> = vec![Box::new(ExplicitPath)];
        if !config.cjk_candidates.is_empty() {
            providers.push(Box::new(FontFiles::new(
                "cjk",
                dirs.clone(),
                config.cjk_candidates.clone(),
            )));
        }
        providers.push(Box::new(FontFiles::named(&config.western_fallback, dirs)));
        providers.push(Box::new(BuiltinProvider));
        FontChain::new(providers)
    }
}

/// Placement settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    /// Distance in pixels between preset anchors and the image edge.
    pub margin: i32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self { margin: MARGIN }
    }
}

/// Output encoding settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// JPEG quality (1-100). Lossless formats ignore it.
    pub quality: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            quality: Quality::default().value() as u32,
        }
    }
}

/// Preview render bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_width: 800,
            max_height: 600,
        }
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(EngineConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
pub fn load_raw_config_file(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(value)
}

/// Load `photomark.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `photomark.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(None);
    }
    load_raw_config_file(&config_path).map(Some)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<EngineConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: EngineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `photomark.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the defaults.
pub fn load_config(dir: &Path) -> Result<EngineConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Load config from an explicit file path. The file must exist.
pub fn load_config_file(path: &Path) -> Result<EngineConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config_file(path)?;
    resolve_config(base, Some(overlay))
}

/// Returns a fully-commented stock `photomark.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Photomark Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file as photomark.toml in the directory you run photomark from,
# or pass it explicitly with --config.
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Fonts
# ---------------------------------------------------------------------------
[fonts]
# Directories searched (including subdirectories) for font files.
# Leave empty to use the platform's standard font directories.
search_dirs = []

# CJK-capable fonts, tried in order before the Western fallback so that
# Chinese, Japanese and Korean text keeps its glyphs.
cjk_candidates = [
    "msyh.ttc",
    "simhei.ttf",
    "simsun.ttc",
    "Deng.ttf",
    "NotoSansCJK-Regular.ttc",
    "NotoSansCJKsc-Regular.otf",
]

# Western font tried after the CJK list. A bare name matches .ttf and .otf.
# If nothing is found, a built-in bitmap font (ASCII only) is used.
western_fallback = "arial"

# ---------------------------------------------------------------------------
# Layout
# ---------------------------------------------------------------------------
[layout]
# Distance in pixels between preset positions and the image edge.
# Bottom anchors sit a further 20px higher.
margin = 10

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[export]
# JPEG quality (1 = smallest file, 100 = best). PNG, BMP and TIFF ignore it.
quality = 95

# ---------------------------------------------------------------------------
# Preview
# ---------------------------------------------------------------------------
[preview]
# Previews are scaled down (never up) to fit this box.
max_width = 800
max_height = 600
"##
}
