//! Font discovery, loading, and glyph access
//!
//! # Overview
//!
//! Resolves font family names to parsed font faces sized for rendering.
//! Lookups walk the platform font directories, fall back through a chain
//! of common families when the requested one is missing, and cache the
//! parsed result per `(family, size)` pair so repeated renders reuse the
//! same face.
//!
//! A missing family is not an error; the caller gets the first usable
//! fallback and a warning is logged. Only a host with no loadable font
//! at all produces a hard error.

use crate::error::{RenderError, RenderResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Families tried in order when the requested one cannot be found
const FALLBACK_FAMILIES: &[&str] = &[
    "DejaVu Sans",
    "Liberation Sans",
    "FreeSans",
    "Arial",
    "Helvetica",
];

/// File extensions recognized as loadable fonts
const FONT_EXTENSIONS: &[&str] = &["ttf", "otf"];

// =============================================================================
// Glyph Access
// =============================================================================

/// Rasterized coverage bitmap for a single glyph.
///
/// `coverage` is row-major, `width * height` bytes, 0 = transparent,
/// 255 = fully inked. `xmin`/`ymin` position the bitmap relative to the
/// pen position and baseline.
pub struct GlyphBitmap {
    pub width: usize,
    pub height: usize,
    pub xmin: i32,
    pub ymin: i32,
    pub advance: i32,
    pub coverage: Vec<u8>,
}

/// Glyph metrics and rasterization for a font at a fixed pixel size.
///
/// The raster and layout stages depend on this trait rather than on a
/// concrete font backend, so tests can substitute deterministic
/// synthetic metrics.
pub trait FontFace: Send + Sync {
    /// Distance from the top of the line box to the baseline, in pixels
    fn ascent(&self) -> i32;

    /// Horizontal advance for a single character, in pixels
    fn advance(&self, ch: char) -> i32;

    /// Rasterizes a single character to a coverage bitmap
    fn rasterize(&self, ch: char) -> GlyphBitmap;

    /// Width of a text run: the sum of its characters' advances
    fn text_width(&self, text: &str) -> u32 {
        text.chars().map(|ch| self.advance(ch).max(0)).sum::<i32>() as u32
    }
}

// =============================================================================
// Sized Font
// =============================================================================

/// A parsed font fixed at one pixel size
pub struct SizedFont {
    family: String,
    size: u32,
    px: f32,
    ascent: i32,
    font: fontdue::Font,
}

impl SizedFont {
    fn new(font: fontdue::Font, family: impl Into<String>, size: u32) -> Self {
        let px = size as f32;
        let ascent = font
            .horizontal_line_metrics(px)
            .map(|m| m.ascent.round() as i32)
            .unwrap_or(size as i32);
        Self {
            family: family.into(),
            size,
            px,
            ascent,
            font,
        }
    }

    /// The family name this face was loaded for
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Pixel size this face was rasterized at
    pub fn size(&self) -> u32 {
        self.size
    }
}

impl FontFace for SizedFont {
    fn ascent(&self) -> i32 {
        self.ascent
    }

    fn advance(&self, ch: char) -> i32 {
        self.font.metrics(ch, self.px).advance_width as i32
    }

    fn rasterize(&self, ch: char) -> GlyphBitmap {
        let (metrics, coverage) = self.font.rasterize(ch, self.px);
        GlyphBitmap {
            width: metrics.width,
            height: metrics.height,
            xmin: metrics.xmin,
            ymin: metrics.ymin,
            advance: metrics.advance_width as i32,
            coverage,
        }
    }
}

// =============================================================================
// Font Library
// =============================================================================

type FaceKey = (String, u32);

/// Discovers and caches font faces.
///
/// The cache is keyed by `(lowercased family, size)`. Entries are inserted
/// once and never mutated, so cached faces can be shared freely across
/// worker threads.
pub struct FontLibrary {
    search_dirs: Vec<PathBuf>,
    cache: RwLock<HashMap<FaceKey, Arc<SizedFont>>>,
}

impl FontLibrary {
    /// Creates a library that searches the platform font directories
    pub fn new() -> Self {
        Self::with_search_dirs(default_font_dirs())
    }

    /// Creates a library with an explicit set of directories to search
    pub fn with_search_dirs(search_dirs: Vec<PathBuf>) -> Self {
        Self {
            search_dirs,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the face for `family` at `size`, loading and caching it on
    /// first use.
    ///
    /// Falls back through [`FALLBACK_FAMILIES`] and finally to any loadable
    /// font when the family is missing. Fails with `NoUsableFont` only when
    /// no font on the host can be parsed.
    pub fn sized(&self, family: &str, size: u32) -> RenderResult<Arc<SizedFont>> {
        let key = (family.to_lowercase(), size);

        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(face) = cache.get(&key) {
                return Ok(Arc::clone(face));
            }
        }

        let face = Arc::new(self.load_face(family, size)?);

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let entry = cache.entry(key).or_insert(face);
        Ok(Arc::clone(entry))
    }

    /// Number of faces currently cached
    pub fn cached_faces(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn load_face(&self, family: &str, size: u32) -> RenderResult<SizedFont> {
        if let Some(path) = self.find_font_file(family) {
            if let Some(font) = parse_font_file(&path) {
                debug!("Loaded font '{}' from {}", family, path.display());
                return Ok(SizedFont::new(font, family, size));
            }
        }

        warn!(
            "Font family '{}' not found, trying fallback families",
            family
        );
        for fallback in FALLBACK_FAMILIES {
            if fallback.eq_ignore_ascii_case(family) {
                continue;
            }
            if let Some(path) = self.find_font_file(fallback) {
                if let Some(font) = parse_font_file(&path) {
                    warn!("Using fallback font '{}' for '{}'", fallback, family);
                    return Ok(SizedFont::new(font, family, size));
                }
            }
        }

        if let Some((path, font)) = self.load_any_font() {
            warn!(
                "No fallback family found for '{}', using {}",
                family,
                path.display()
            );
            return Ok(SizedFont::new(font, family, size));
        }

        Err(RenderError::NoUsableFont)
    }

    /// Finds a font file whose stem matches the family name.
    ///
    /// Matching ignores case and spaces, so "DejaVu Sans" matches
    /// `DejaVuSans.ttf`. An exact stem match is preferred over a partial
    /// one, then the shortest name wins (the regular cut of a family
    /// tends to have the shortest filename).
    fn find_font_file(&self, family: &str) -> Option<PathBuf> {
        let needle = family.to_lowercase().replace(' ', "");
        if needle.is_empty() {
            return None;
        }

        let mut best: Option<(bool, usize, PathBuf)> = None;
        for path in self.walk_font_files() {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let stem = stem.to_lowercase().replace(' ', "");
            if !stem.contains(&needle) {
                continue;
            }
            let candidate = (stem != needle, stem.len(), path);
            match &best {
                Some(current) if *current <= candidate => {}
                _ => best = Some(candidate),
            }
        }
        best.map(|(_, _, path)| path)
    }

    fn load_any_font(&self) -> Option<(PathBuf, fontdue::Font)> {
        for path in self.walk_font_files() {
            if let Some(font) = parse_font_file(&path) {
                return Some((path, font));
            }
        }
        None
    }

    fn walk_font_files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.search_dirs.iter().flat_map(|dir| {
            WalkDir::new(dir)
                .follow_links(true)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|path| {
                    path.extension()
                        .and_then(|ext| ext.to_str())
                        .map(|ext| FONT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                        .unwrap_or(false)
                })
        })
    }
}

impl Default for FontLibrary {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_font_file(path: &Path) -> Option<fontdue::Font> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to read font file {}: {}", path.display(), e);
            return None;
        }
    };
    match fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default()) {
        Ok(font) => Some(font),
        Err(e) => {
            warn!("Failed to parse font file {}: {}", path.display(), e);
            None
        }
    }
}

/// Platform font directories plus the user's font directory
fn default_font_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = [
        "/usr/share/fonts",
        "/usr/local/share/fonts",
        "/System/Library/Fonts",
        "/Library/Fonts",
        "C:\\Windows\\Fonts",
    ]
    .iter()
    .map(PathBuf::from)
    .collect();

    if let Some(user_fonts) = dirs::font_dir() {
        dirs.push(user_fonts);
    }

    dirs.retain(|dir| dir.is_dir());
    dirs
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn dir_with_files(names: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for name in names {
            // contents are irrelevant for discovery tests
            fs::write(dir.path().join(name), b"not a real font").unwrap();
        }
        dir
    }

    // -------------------------------------------------------------------------
    // Discovery Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_find_font_file_case_insensitive() {
        let dir = dir_with_files(&["Arial.ttf"]);
        let lib = FontLibrary::with_search_dirs(vec![dir.path().to_path_buf()]);
        let found = lib.find_font_file("arial").unwrap();
        assert_eq!(found.file_name().unwrap(), "Arial.ttf");
    }

    #[test]
    fn test_find_font_file_ignores_spaces() {
        let dir = dir_with_files(&["DejaVuSans.ttf"]);
        let lib = FontLibrary::with_search_dirs(vec![dir.path().to_path_buf()]);
        assert!(lib.find_font_file("DejaVu Sans").is_some());
    }

    #[test]
    fn test_find_font_file_prefers_exact_stem() {
        let dir = dir_with_files(&["ArialBD.ttf", "Arial.ttf", "ArialItalic.otf"]);
        let lib = FontLibrary::with_search_dirs(vec![dir.path().to_path_buf()]);
        let found = lib.find_font_file("Arial").unwrap();
        assert_eq!(found.file_name().unwrap(), "Arial.ttf");
    }

    #[test]
    fn test_find_font_file_skips_non_font_extensions() {
        let dir = dir_with_files(&["Arial.txt", "Arial.ttc"]);
        let lib = FontLibrary::with_search_dirs(vec![dir.path().to_path_buf()]);
        assert!(lib.find_font_file("Arial").is_none());
    }

    #[test]
    fn test_no_usable_font_error() {
        let dir = dir_with_files(&[]);
        let lib = FontLibrary::with_search_dirs(vec![dir.path().to_path_buf()]);
        let result = lib.sized("Arial", 24);
        assert!(matches!(result, Err(RenderError::NoUsableFont)));
    }

    #[test]
    fn test_unparseable_font_falls_through_to_error() {
        // a file that matches by name but is not a real font must not
        // satisfy the lookup
        let dir = dir_with_files(&["Arial.ttf"]);
        let lib = FontLibrary::with_search_dirs(vec![dir.path().to_path_buf()]);
        let result = lib.sized("Arial", 24);
        assert!(matches!(result, Err(RenderError::NoUsableFont)));
        assert_eq!(lib.cached_faces(), 0);
    }

    // -------------------------------------------------------------------------
    // FontFace Trait Tests
    // -------------------------------------------------------------------------

    struct FixedAdvanceFace;

    impl FontFace for FixedAdvanceFace {
        fn ascent(&self) -> i32 {
            10
        }
        fn advance(&self, _ch: char) -> i32 {
            7
        }
        fn rasterize(&self, _ch: char) -> GlyphBitmap {
            GlyphBitmap {
                width: 0,
                height: 0,
                xmin: 0,
                ymin: 0,
                advance: 7,
                coverage: Vec::new(),
            }
        }
    }

    #[test]
    fn test_text_width_sums_advances() {
        let face = FixedAdvanceFace;
        assert_eq!(face.text_width(""), 0);
        assert_eq!(face.text_width("abc"), 21);
        // spaces count like any other character
        assert_eq!(face.text_width("a b"), 21);
    }
}
