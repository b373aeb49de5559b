//! Font resolution: an ordered chain of [`FontProvider`]s.
//!
//! The default chain is:
//!
//! 1. [`ExplicitPath`]: the watermark's `font_path`, if it exists and parses.
//! 2. [`FontFiles`] with CJK-capable faces (Microsoft YaHei, SimHei, SimSun,
//!    DengXian, Noto CJK), searched in the platform font directories.
//! 3. [`FontFiles`] for a generic Western face (`arial`).
//! 4. [`BuiltinProvider`]: the bitmap font, which always succeeds.
//!
//! CJK candidates come before the Western face because Western fonts (and the
//! bitmap font) silently drop non-Latin glyphs. Provider misses are logged at
//! debug level and never surface as errors; landing on the built-in font is
//! logged as a warning.

use super::builtin_font::BuiltinFont;
use super::text::{LoadedFont, OutlineFont};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

/// CJK-capable font files, in priority order.
pub const CJK_FONT_FILES: &[&str] = &[
    "msyh.ttc",
    "simhei.ttf",
    "simsun.ttc",
    "Deng.ttf",
    "NotoSansCJK-Regular.ttc",
    "NotoSansCJKsc-Regular.otf",
];

/// Generic Western font tried after the CJK list.
pub const WESTERN_FONT: &str = "arial";

/// How deep to look below each font directory (`/usr/share/fonts/opentype/noto/…`).
const SEARCH_DEPTH: usize = 4;

/// One link in the font chain.
pub trait FontProvider: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> String;

    /// Try to produce a font at `size` pixels per em. `path` is the caller's
    /// explicit font file, which most providers ignore.
    fn try_load(&self, path: Option<&Path>, size: u32) -> Option<LoadedFont>;
}

/// Loads the caller-supplied font file.
#[derive(Debug, Default)]
pub struct ExplicitPath;

impl FontProvider for ExplicitPath {
    fn name(&self) -> String {
        "explicit font path".to_string()
    }

    fn try_load(&self, path: Option<&Path>, size: u32) -> Option<LoadedFont> {
        let path = path?;
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "explicit font path does not exist");
            return None;
        }
        load_outline(path, size)
    }
}

/// Searches font directories for the first loadable file among a list of
/// file names. Names are matched case-insensitively, earlier names win.
///
/// The directory walk runs once per provider; later lookups reuse the
/// matched paths and only re-read the font file.
#[derive(Debug, Clone)]
pub struct FontFiles {
    label: String,
    dirs: Vec<PathBuf>,
    file_names: Vec<String>,
    found: OnceLock<Vec<PathBuf>>,
}

impl FontFiles {
    pub fn new(label: impl Into<String>, dirs: Vec<PathBuf>, file_names: Vec<String>) -> Self {
        Self {
            label: label.into(),
            dirs,
            file_names,
            found: OnceLock::new(),
        }
    }

    /// A font referred to by family name, the way `arial` is: a bare name
    /// is tried as `.ttf` and `.otf`, a name with an extension as-is.
    pub fn named(name: &str, dirs: Vec<PathBuf>) -> Self {
        let file_names = if Path::new(name).extension().is_some() {
            vec![name.to_string()]
        } else {
            vec![format!("{name}.ttf"), format!("{name}.otf")]
        };
        Self::new(name, dirs, file_names)
    }

    /// Existing files matching the configured names, in priority order.
    pub fn candidates(&self) -> &[PathBuf] {
        self.found.get_or_init(|| self.scan())
    }

    fn scan(&self) -> Vec<PathBuf> {
        let wanted: Vec<String> = self.file_names.iter().map(|n| n.to_lowercase()).collect();
        let mut found: HashMap<String, PathBuf> = HashMap::new();

        for dir in &self.dirs {
            if !dir.is_dir() {
                continue;
            }
            for entry in WalkDir::new(dir)
                .max_depth(SEARCH_DEPTH)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if !entry.file_type().is_file() {
                    continue;
                }
                let Some(file_name) = entry.file_name().to_str() else {
                    continue;
                };
                let key = file_name.to_lowercase();
                if wanted.contains(&key) {
                    found.entry(key).or_insert_with(|| entry.into_path());
                }
            }
        }

        wanted.iter().filter_map(|name| found.remove(name)).collect()
    }
}

impl FontProvider for FontFiles {
    fn name(&self) -> String {
        self.label.clone()
    }

    fn try_load(&self, _path: Option<&Path>, size: u32) -> Option<LoadedFont> {
        self.candidates()
            .iter()
            .find_map(|candidate| load_outline(candidate, size))
    }
}

/// Always yields the built-in bitmap font.
#[derive(Debug, Default)]
pub struct BuiltinProvider;

impl FontProvider for BuiltinProvider {
    fn name(&self) -> String {
        "built-in".to_string()
    }

    fn try_load(&self, _path: Option<&Path>, _size: u32) -> Option<LoadedFont> {
        Some(LoadedFont::Builtin(BuiltinFont))
    }
}

fn load_outline(path: &Path, size: u32) -> Option<LoadedFont> {
    match OutlineFont::from_file(path, size) {
        Ok(font) => Some(LoadedFont::Outline(font)),
        Err(e) => {
            tracing::debug!(error = %e, "skipping font file");
            None
        }
    }
}

/// Standard font directories for the build target.
pub fn default_font_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if cfg!(target_os = "windows") {
        let windir = std::env::var_os("WINDIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\Windows"));
        dirs.push(windir.join("Fonts"));
        if let Some(local) = std::env::var_os("LOCALAPPDATA") {
            dirs.push(PathBuf::from(local).join(r"Microsoft\Windows\Fonts"));
        }
    } else if cfg!(target_os = "macos") {
        dirs.push(PathBuf::from("/System/Library/Fonts"));
        dirs.push(PathBuf::from("/Library/Fonts"));
        if let Some(home) = std::env::var_os("HOME") {
            dirs.push(PathBuf::from(home).join("Library/Fonts"));
        }
    } else {
        dirs.push(PathBuf::from("/usr/share/fonts"));
        dirs.push(PathBuf::from("/usr/local/share/fonts"));
        if let Some(home) = std::env::var_os("HOME") {
            let home = PathBuf::from(home);
            dirs.push(home.join(".local/share/fonts"));
            dirs.push(home.join(".fonts"));
        }
    }

    dirs
}

/// Ordered list of font providers; the first hit wins.
///
/// [`FontChain::resolve`] always returns a font: if every provider misses,
/// the built-in bitmap font is used.
pub struct FontChain {
    providers: Vec<Box<dyn FontProvider>>,
}

impl FontChain {
    pub fn new(providers: Vec<Box<dyn FontProvider>>) -> Self {
        Self { providers }
    }

    /// The standard chain over `dirs`: explicit path, CJK list, Western
    /// fallback, built-in.
    pub fn with_dirs(dirs: Vec<PathBuf>, cjk_files: &[String], western: &str) -> Self {
        Self::new(vec![
            Box::new(ExplicitPath),
            Box::new(FontFiles::new("cjk", dirs.clone(), cjk_files.to_vec())),
            Box::new(FontFiles::named(western, dirs)),
            Box::new(BuiltinProvider),
        ])
    }

    /// The standard chain over this platform's font directories.
    pub fn platform_default() -> Self {
        let cjk: Vec<String> = CJK_FONT_FILES.iter().map(|s| s.to_string()).collect();
        Self::with_dirs(default_font_dirs(), &cjk, WESTERN_FONT)
    }

    /// Explicit path, then straight to the built-in font. No system lookups.
    pub fn builtin_only() -> Self {
        Self::new(vec![Box::new(ExplicitPath), Box::new(BuiltinProvider)])
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Walk the chain for `path` at `size` pixels per em.
    pub fn resolve(&self, path: Option<&Path>, size: u32) -> LoadedFont {
        for provider in &self.providers {
            match provider.try_load(path, size) {
                Some(font) => {
                    if font.is_builtin() {
                        warn_builtin();
                    } else {
                        tracing::debug!(provider = %provider.name(), font = %font.describe(), size, "resolved font");
                    }
                    return font;
                }
                None => tracing::debug!(provider = %provider.name(), "font provider missed"),
            }
        }
        warn_builtin();
        LoadedFont::Builtin(BuiltinFont)
    }
}

impl Default for FontChain {
    fn default() -> Self {
        Self::platform_default()
    }
}

impl std::fmt::Debug for FontChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontChain")
            .field("providers", &self.provider_names())
            .finish()
    }
}

fn warn_builtin() {
    tracing::warn!("no TrueType font found, using built-in bitmap font");
}
