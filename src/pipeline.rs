//! Pipeline – ties together parsing, styling, font loading, layout,
//! pagination, and rendering into a single function call.

use std::path::PathBuf;

use crate::dom::{document_parts, parse_html, ElementNode, Tag};
use crate::error::{CvError, Result};
use crate::fonts::FontManager;
use crate::layout::compute_layout;
use crate::pagination::{paginate, DocumentLayout, PAGE_MARGIN_PT};
use crate::render::render_pdf;
use crate::style::{build_styled_tree, resolve_style, Stylesheet};

/// Fixed supplemental stylesheet applied to every document in addition to
/// whatever the markup embeds. The fonts it imports are fetched from the
/// network; when that fails the document falls back to built-in fonts.
pub const SUPPLEMENTAL_CSS: &str = "@import url('https://fonts.googleapis.com/css2?family=Cormorant+Garamond:wght@400;500;600&family=Source+Sans+3:wght@300;400;500;600&display=swap');";

/// Configuration for the HTML → PDF conversion.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Document title embedded in the PDF metadata.
    pub title: String,
    /// Page width in points (default: A4 = 595.28).
    pub page_width: f32,
    /// Page height in points (default: A4 = 841.89).
    pub page_height: f32,
    /// Page margin in points (default: 40).
    pub page_margin: f32,
    /// Base directory for resolving relative image references.
    pub base_dir: Option<PathBuf>,
    /// Fetch the supplemental web fonts. Tests disable this to stay offline.
    pub web_fonts: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            title: "Curriculum Vitae".to_string(),
            page_width: 595.28,
            page_height: 841.89,
            page_margin: PAGE_MARGIN_PT,
            base_dir: None,
            web_fonts: true,
        }
    }
}

/// Full pipeline: rendered HTML → PDF bytes.
///
/// Returns the bytes together with the paginated layout (page count etc.).
pub fn generate_pdf(html: &str, config: &PipelineConfig) -> Result<(Vec<u8>, DocumentLayout)> {
    let (layout, fonts) = compute_document_layout_with(html, config, |fonts, sheet| {
        if config.web_fonts {
            fonts.load_web_imports(&sheet.imports);
        }
    });

    let bytes = render_pdf(&layout, &fonts, config.base_dir.as_deref())
        .map_err(CvError::Conversion)?;
    Ok((bytes, layout))
}

/// Compute only the paginated layout (no PDF rendering) – useful for tests.
pub fn compute_document_layout(html: &str, config: &PipelineConfig) -> DocumentLayout {
    compute_document_layout_with(html, config, |_, _| {}).0
}

fn compute_document_layout_with(
    html: &str,
    config: &PipelineConfig,
    load_fonts: impl FnOnce(&mut FontManager, &Stylesheet),
) -> (DocumentLayout, FontManager) {
    // 1. Parse HTML and split body from embedded CSS
    let dom = parse_html(html);
    let parts = document_parts(&dom);

    // 2. Parse the stylesheet, supplemental directives first
    let css = format!("{SUPPLEMENTAL_CSS}\n{}", parts.css);
    let sheet = Stylesheet::parse(&css);

    // 3. Load fonts (web imports when enabled, fallbacks otherwise)
    let mut fonts = FontManager::default();
    load_fonts(&mut fonts, &sheet);

    // 4. Resolve styles; body rules seed the root style
    let body = ElementNode::new(Tag::Body);
    let root_style = resolve_style(&body, None, &sheet);
    let styled = build_styled_tree(&parts.body, Some(&root_style), &sheet);

    // 5. Layout
    let boxes = compute_layout(
        &styled,
        config.page_width,
        config.page_margin,
        &fonts,
        config.base_dir.as_deref(),
    );

    // 6. Paginate
    let layout = paginate(
        &boxes,
        &config.title,
        config.page_width,
        config.page_height,
        config.page_margin,
        &fonts,
    );
    (layout, fonts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_config() -> PipelineConfig {
        PipelineConfig {
            web_fonts: false,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn pipeline_basic() {
        let html = "<h1>Jane Doe</h1><p>Software Engineer</p>";
        let (bytes, layout) = generate_pdf(html, &offline_config()).unwrap();
        assert!(!bytes.is_empty());
        assert!(!layout.pages.is_empty());
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn body_rules_seed_root_style() {
        let html = r#"<html><head><style>
            body { font-size: 10px; }
        </style></head><body><p>text</p></body></html>"#;
        let layout = compute_document_layout(html, &offline_config());
        let rb = &layout.pages[0].boxes[0];
        let text = rb.text.as_ref().expect("text box");
        assert_eq!(text.font_size, 10.0);
    }

    #[test]
    fn supplemental_import_is_always_present() {
        let sheet = Stylesheet::parse(SUPPLEMENTAL_CSS);
        assert_eq!(sheet.imports.len(), 1);
        assert!(sheet.imports[0].contains("fonts.googleapis.com"));
        assert!(sheet.imports[0].contains("Cormorant+Garamond"));
        assert!(sheet.imports[0].contains("Source+Sans+3"));
    }

    #[test]
    fn empty_document_still_produces_a_page() {
        let (bytes, layout) = generate_pdf("", &offline_config()).unwrap();
        assert_eq!(layout.pages.len(), 1);
        assert_eq!(&bytes[0..5], b"%PDF-");
    }
}
