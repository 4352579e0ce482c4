//! Font loading and text measurement using `ttf-parser`.
//!
//! Faces arrive from the stylesheet's web-font imports (Google Fonts CSS is
//! fetched and its `@font-face` blocks parsed); when nothing can be fetched
//! the manager falls back to synthetic Helvetica-like metrics and the PDF
//! renderer uses the built-in fonts.

use std::collections::HashMap;

use crate::assets;

/// A loaded font face with metrics.
#[derive(Clone)]
pub struct FontData {
    /// Raw font bytes (kept alive for ttf-parser's zero-copy API).
    pub bytes: Vec<u8>,
    pub units_per_em: f32,
    pub ascender: f32,
    pub descender: f32,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct FontKey {
    pub family: String,
    pub bold: bool,
    pub italic: bool,
}

impl FontKey {
    fn new(family: &str, bold: bool, italic: bool) -> Self {
        Self {
            family: family.to_string(),
            bold,
            italic,
        }
    }
}

/// Manages loaded fonts.
pub struct FontManager {
    fonts: HashMap<FontKey, FontData>,
    default_key: FontKey,
}

impl FontManager {
    pub fn new() -> Self {
        Self {
            fonts: HashMap::new(),
            default_key: FontKey::new("Helvetica", false, false),
        }
    }

    /// Load a TTF/OTF face from bytes.
    pub fn load_font(
        &mut self,
        family: &str,
        bold: bool,
        italic: bool,
        bytes: Vec<u8>,
    ) -> Result<(), String> {
        let face = ttf_parser::Face::parse(&bytes, 0)
            .map_err(|e| format!("failed to parse font '{family}': {e}"))?;
        let data = FontData {
            units_per_em: face.units_per_em() as f32,
            ascender: face.ascender() as f32,
            descender: face.descender() as f32,
            bytes,
        };
        self.fonts.insert(FontKey::new(family, bold, italic), data);
        Ok(())
    }

    /// Register synthetic Helvetica-like metrics so measurement always works.
    pub fn ensure_default(&mut self) {
        for (bold, italic) in [(false, false), (true, false), (false, true), (true, true)] {
            let key = FontKey::new("Helvetica", bold, italic);
            self.fonts.entry(key).or_insert(FontData {
                bytes: Vec::new(),
                units_per_em: 1000.0,
                ascender: 750.0,
                descender: -250.0,
            });
        }
    }

    /// Fetch the faces referenced by stylesheet `@import` URLs.
    ///
    /// Each import is expected to be a font CSS endpoint (the Google Fonts
    /// `css2` form). Every failure is logged and skipped; the document still
    /// renders with fallback fonts.
    pub fn load_web_imports(&mut self, imports: &[String]) {
        for url in imports {
            let css = match assets::fetch_url(url) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    log::warn!("web font import skipped — {e}");
                    continue;
                }
            };
            for face in parse_font_faces(&css) {
                let wanted: Vec<FontKey> = face
                    .keys()
                    .into_iter()
                    .filter(|k| !self.fonts.contains_key(k))
                    .collect();
                if wanted.is_empty() {
                    continue;
                }
                match assets::fetch_url(&face.url) {
                    Ok(bytes) => {
                        for key in wanted {
                            if let Err(e) =
                                self.load_font(&key.family, key.bold, key.italic, bytes.clone())
                            {
                                log::warn!("web font skipped — {e}");
                            }
                        }
                    }
                    Err(e) => log::warn!("web font download skipped — {e}"),
                }
            }
        }
    }

    /// Get font data for a key, trying the regular face of the same family
    /// before the default.
    pub fn get(&self, key: &FontKey) -> &FontData {
        if let Some(data) = self.fonts.get(key) {
            return data;
        }
        let regular = FontKey::new(&key.family, false, false);
        if let Some(data) = self.fonts.get(&regular) {
            return data;
        }
        self.fonts
            .get(&self.default_key)
            .expect("default font metrics registered")
    }

    /// Font bytes for PDF embedding, if a real face is loaded.
    pub fn font_bytes(&self, key: &FontKey) -> Option<&[u8]> {
        self.fonts.get(key).and_then(|d| {
            if d.bytes.is_empty() {
                None
            } else {
                Some(d.bytes.as_slice())
            }
        })
    }

    /// All keys with embeddable bytes.
    pub fn embeddable_keys(&self) -> Vec<FontKey> {
        self.fonts
            .iter()
            .filter(|(_, d)| !d.bytes.is_empty())
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Measure the width of a string at a given size (pt).
    ///
    /// With real bytes, glyph advances are summed; otherwise an average
    /// character width heuristic (0.5 × size, bold ~10 % wider) is used.
    pub fn measure_text_width(
        &self,
        text: &str,
        font_size: f32,
        bold: bool,
        italic: bool,
        family: &str,
    ) -> f32 {
        let data = self.get(&FontKey::new(family, bold, italic));

        if data.bytes.is_empty() {
            let avg = if bold { 0.55 } else { 0.5 };
            return text.chars().count() as f32 * font_size * avg;
        }

        if let Ok(face) = ttf_parser::Face::parse(&data.bytes, 0) {
            let scale = font_size / data.units_per_em;
            let mut width = 0.0f32;
            for ch in text.chars() {
                if let Some(gid) = face.glyph_index(ch) {
                    width += face.glyph_hor_advance(gid).unwrap_or(0) as f32 * scale;
                } else {
                    width += font_size * 0.5;
                }
            }
            width
        } else {
            text.chars().count() as f32 * font_size * 0.5
        }
    }

    /// Line height in pt.
    pub fn line_height_px(&self, font_size: f32, line_height_factor: f32) -> f32 {
        font_size * line_height_factor
    }

    /// Ascender in pt for the given face.
    pub fn ascender_px(&self, font_size: f32, bold: bool, italic: bool, family: &str) -> f32 {
        let data = self.get(&FontKey::new(family, bold, italic));
        data.ascender * (font_size / data.units_per_em)
    }
}

impl Default for FontManager {
    fn default() -> Self {
        let mut mgr = Self::new();
        mgr.ensure_default();
        mgr
    }
}

// ---------------------------------------------------------------------------
// @font-face parsing
// ---------------------------------------------------------------------------

/// One `@font-face` block from a font CSS response.
#[derive(Debug, Clone, PartialEq)]
pub struct FontFace {
    pub family: String,
    /// Weight range; a single weight has `min == max`. Variable fonts
    /// announce e.g. `font-weight: 200 900`.
    pub weight_min: u16,
    pub weight_max: u16,
    pub italic: bool,
    pub url: String,
}

impl FontFace {
    /// The manager keys this face can serve: regular when the range dips
    /// below 600, bold when it reaches 600.
    fn keys(&self) -> Vec<FontKey> {
        let mut keys = Vec::new();
        if self.weight_min < 600 {
            keys.push(FontKey::new(&self.family, false, self.italic));
        }
        if self.weight_max >= 600 {
            keys.push(FontKey::new(&self.family, true, self.italic));
        }
        keys
    }
}

/// Parse the `@font-face` blocks out of a font CSS response.
pub fn parse_font_faces(css: &str) -> Vec<FontFace> {
    let mut faces = Vec::new();
    let mut rest = css;
    while let Some(start) = rest.find("@font-face") {
        let after = &rest[start..];
        let Some(open) = after.find('{') else { break };
        let Some(close) = after[open..].find('}') else {
            break;
        };
        let block = &after[open + 1..open + close];
        if let Some(face) = parse_face_block(block) {
            faces.push(face);
        }
        rest = &after[open + close + 1..];
    }
    faces
}

fn parse_face_block(block: &str) -> Option<FontFace> {
    let mut family = None;
    let mut weight_min = 400u16;
    let mut weight_max = 400u16;
    let mut italic = false;
    let mut url = None;

    for decl in block.split(';') {
        let mut parts = decl.splitn(2, ':');
        let (Some(prop), Some(val)) = (parts.next(), parts.next()) else {
            continue;
        };
        let val = val.trim();
        match prop.trim().to_ascii_lowercase().as_str() {
            "font-family" => {
                family = Some(val.trim_matches(|c| c == '\'' || c == '"').to_string());
            }
            "font-weight" => {
                let weights: Vec<u16> = val
                    .split_whitespace()
                    .filter_map(|w| w.parse().ok())
                    .collect();
                if let Some(&first) = weights.first() {
                    weight_min = first;
                    weight_max = *weights.last().unwrap_or(&first);
                }
            }
            "font-style" => {
                italic = val.starts_with("italic") || val.starts_with("oblique");
            }
            "src" => {
                if let Some(i) = val.find("url(") {
                    let after = &val[i + 4..];
                    if let Some(end) = after.find(')') {
                        let u = after[..end].trim_matches(|c| c == '\'' || c == '"');
                        url = Some(u.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    Some(FontFace {
        family: family?,
        weight_min,
        weight_max,
        italic,
        url: url?,
    })
}

// ---------------------------------------------------------------------------
// Word wrapping
// ---------------------------------------------------------------------------

/// Word-wrap text to fit within `max_width` pt. Returns one string per line.
pub fn wrap_text(
    text: &str,
    font_size: f32,
    bold: bool,
    italic: bool,
    family: &str,
    max_width: f32,
    fonts: &FontManager,
) -> Vec<String> {
    if max_width <= 0.0 || text.is_empty() {
        return vec![text.to_string()];
    }

    let mut lines: Vec<String> = Vec::new();
    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current_line = String::new();
        for word in &words {
            let candidate = if current_line.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current_line, word)
            };
            let w = fonts.measure_text_width(&candidate, font_size, bold, italic, family);
            if w > max_width && !current_line.is_empty() {
                lines.push(current_line);
                current_line = word.to_string();
            } else {
                current_line = candidate;
            }
        }
        if !current_line.is_empty() {
            lines.push(current_line);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_text_width() {
        let mgr = FontManager::default();
        let w = mgr.measure_text_width("Hello", 16.0, false, false, "Helvetica");
        // 5 chars × 16 × 0.5 = 40
        assert!((w - 40.0).abs() < 0.1);
    }

    #[test]
    fn unknown_family_falls_back_to_default_metrics() {
        let mgr = FontManager::default();
        let w = mgr.measure_text_width("abcd", 10.0, false, false, "Cormorant Garamond");
        assert!(w > 0.0);
    }

    #[test]
    fn word_wrap_basic() {
        let mgr = FontManager::default();
        let lines = wrap_text(
            "Hello world foo bar",
            16.0,
            false,
            false,
            "Helvetica",
            60.0,
            &mgr,
        );
        assert!(lines.len() >= 2, "expected wrapping, got {:?}", lines);
    }

    #[test]
    fn wrap_respects_explicit_newlines() {
        let mgr = FontManager::default();
        let lines = wrap_text("one\ntwo", 12.0, false, false, "Helvetica", 500.0, &mgr);
        assert_eq!(lines, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn parses_static_font_face() {
        let css = r#"
/* latin */
@font-face {
  font-family: 'Source Sans 3';
  font-style: normal;
  font-weight: 400;
  src: url(https://fonts.gstatic.com/s/sourcesans3/v15/abc.ttf) format('truetype');
}
"#;
        let faces = parse_font_faces(css);
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].family, "Source Sans 3");
        assert_eq!(faces[0].weight_min, 400);
        assert!(!faces[0].italic);
        assert!(faces[0].url.ends_with(".ttf"));
    }

    #[test]
    fn variable_weight_range_serves_regular_and_bold() {
        let css = r#"
@font-face {
  font-family: 'Cormorant Garamond';
  font-style: italic;
  font-weight: 300 700;
  src: url(https://fonts.gstatic.com/s/cg/v1/var.ttf) format('truetype');
}
"#;
        let faces = parse_font_faces(css);
        assert_eq!(faces.len(), 1);
        let keys = faces[0].keys();
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().all(|k| k.italic));
        assert!(keys.iter().any(|k| k.bold) && keys.iter().any(|k| !k.bold));
    }
}
