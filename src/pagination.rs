//! Pagination – splits positioned boxes into pages and freezes them into the
//! structures the PDF renderer consumes.
//!
//! Handles:
//! - A4 page boundaries
//! - page-break-before / page-break-after hints
//! - flattening of oversized wrapper boxes so their children split
//! - per-line x offsets for text alignment

use crate::fonts::FontManager;
use crate::layout::{BoxContent, PositionedBox};
use crate::style::{FontStyle, FontWeight, TextAlign, TextDecoration};

/// Default page margins in points.
pub const PAGE_MARGIN_PT: f32 = 40.0;

// ---------------------------------------------------------------------------
// Frozen document structures
// ---------------------------------------------------------------------------

/// A complete paginated document ready for rendering.
#[derive(Debug, Clone)]
pub struct DocumentLayout {
    /// Document title embedded in the PDF metadata.
    pub title: String,
    /// Page size in PDF points (1 pt = 1/72 inch).
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    pub pages: Vec<Page>,
}

/// One page of content.
#[derive(Debug, Clone)]
pub struct Page {
    pub index: usize,
    pub boxes: Vec<RenderBox>,
}

/// A positioned rectangle with optional content, page-absolute coordinates
/// (origin = top-left of the physical page).
#[derive(Debug, Clone)]
pub struct RenderBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,

    pub background_color: Option<[f32; 4]>,
    pub border: Option<BorderSpec>,

    pub text: Option<TextContent>,
    pub image: Option<ImageContent>,

    pub children: Vec<RenderBox>,
}

impl RenderBox {
    fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            background_color: None,
            border: None,
            text: None,
            image: None,
            children: Vec::new(),
        }
    }
}

/// Per-side border widths (top, right, bottom, left) and one colour.
#[derive(Debug, Clone)]
pub struct BorderSpec {
    pub widths: [f32; 4],
    pub color: [f32; 4],
}

#[derive(Debug, Clone)]
pub struct TextContent {
    pub lines: Vec<TextLine>,
    pub font_family: String,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub color: [f32; 4],
    pub line_height: f32,
    pub underline: bool,
    /// List bullet / number prefix (e.g. "• " or "1. ")
    pub list_marker: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TextLine {
    pub text: String,
    /// X offset within the box (carries the alignment).
    pub x_offset: f32,
    /// Y offset from the top of the text area.
    pub y_offset: f32,
    /// Measured line width in pt.
    pub width: f32,
}

#[derive(Debug, Clone)]
pub struct ImageContent {
    pub src: String,
    pub width: f32,
    pub height: f32,
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Recursively expand any pure-container box taller than a single page so its
/// children can split across pages individually.
fn flatten_for_pagination<'a>(
    boxes: &'a [PositionedBox],
    content_height: f32,
) -> Vec<&'a PositionedBox> {
    let mut result = Vec::new();
    for pbox in boxes {
        if pbox.height > content_height
            && matches!(pbox.content, BoxContent::None)
            && !pbox.children.is_empty()
            && !pbox.page_break_inside_avoid
        {
            result.extend(flatten_for_pagination(&pbox.children, content_height));
        } else {
            result.push(pbox);
        }
    }
    result
}

/// Convert positioned boxes into a paginated document.
pub fn paginate(
    boxes: &[PositionedBox],
    title: &str,
    page_width: f32,
    page_height: f32,
    page_margin: f32,
    fonts: &FontManager,
) -> DocumentLayout {
    let mut doc = DocumentLayout {
        title: title.to_string(),
        page_width_pt: page_width,
        page_height_pt: page_height,
        pages: Vec::new(),
    };

    let content_height = page_height - 2.0 * page_margin;
    let flat = flatten_for_pagination(boxes, content_height);

    let mut current_page = Page {
        index: 0,
        boxes: Vec::new(),
    };

    // Document-space y at which the current page begins; box positions are
    // absolute document coordinates, so `pbox.y - page_start_doc_y` is the
    // y-on-page for any box.
    let mut page_start_doc_y = 0.0f32;

    for pbox in &flat {
        if pbox.page_break_before && !current_page.boxes.is_empty() {
            doc.pages.push(current_page);
            current_page = Page {
                index: doc.pages.len(),
                boxes: Vec::new(),
            };
            page_start_doc_y = pbox.y;
        }

        let y_on_page = (pbox.y - page_start_doc_y).max(0.0);
        if y_on_page + pbox.height > content_height && !current_page.boxes.is_empty() {
            doc.pages.push(current_page);
            current_page = Page {
                index: doc.pages.len(),
                boxes: Vec::new(),
            };
            page_start_doc_y = pbox.y;
        }

        let y_on_page = (pbox.y - page_start_doc_y).max(0.0);
        let render_box = build_render_box(pbox, pbox.x, page_margin + y_on_page, fonts);
        current_page.boxes.push(render_box);

        if pbox.page_break_after {
            doc.pages.push(current_page);
            current_page = Page {
                index: doc.pages.len(),
                boxes: Vec::new(),
            };
            page_start_doc_y = pbox.y + pbox.height;
        }
    }

    if !current_page.boxes.is_empty() {
        doc.pages.push(current_page);
    }
    if doc.pages.is_empty() {
        doc.pages.push(Page {
            index: 0,
            boxes: Vec::new(),
        });
    }
    doc
}

/// Recursively build a RenderBox tree with page-absolute coordinates.
///
/// Child y is derived as `parent_abs_y + (child.y − parent.y)` because
/// PositionedBox coordinates are accumulated document-space absolutes.
fn build_render_box(
    pbox: &PositionedBox,
    abs_x: f32,
    abs_y: f32,
    fonts: &FontManager,
) -> RenderBox {
    let mut rb = RenderBox::new(abs_x, abs_y, pbox.width, pbox.height);

    if !pbox.style.background_color.is_transparent() {
        let c = &pbox.style.background_color;
        rb.background_color = Some([c.r, c.g, c.b, c.a]);
    }

    if pbox.style.has_border() {
        let c = &pbox.style.border_color;
        rb.border = Some(BorderSpec {
            widths: [
                pbox.style.border_top,
                pbox.style.border_right,
                pbox.style.border_bottom,
                pbox.style.border_left,
            ],
            color: [c.r, c.g, c.b, c.a],
        });
    }

    match &pbox.content {
        BoxContent::Text { lines, .. } => {
            rb.text = Some(text_content(pbox, lines, fonts));
        }
        BoxContent::Image { src } => {
            rb.image = Some(ImageContent {
                src: src.clone(),
                width: pbox.width,
                height: pbox.height,
            });
        }
        BoxContent::ListItem { marker } => {
            let c = &pbox.style.color;
            let line_height = fonts.line_height_px(pbox.style.font_size, pbox.style.line_height);
            // The bullet / number is drawn via `list_marker` in the left
            // gutter; the item's text comes from its child boxes.
            rb.text = Some(TextContent {
                lines: vec![],
                font_family: pbox.style.font_family.clone(),
                font_size: pbox.style.font_size,
                bold: pbox.style.font_weight == FontWeight::Bold,
                italic: false,
                color: [c.r, c.g, c.b, c.a],
                line_height,
                underline: false,
                list_marker: Some(marker.clone()),
            });
        }
        BoxContent::None => {}
    }

    for child in &pbox.children {
        let child_abs_x = child.x; // already page-absolute
        let child_abs_y = abs_y + (child.y - pbox.y);
        rb.children
            .push(build_render_box(child, child_abs_x, child_abs_y, fonts));
    }

    rb
}

fn text_content(pbox: &PositionedBox, lines: &[String], fonts: &FontManager) -> TextContent {
    let s = &pbox.style;
    let bold = s.font_weight == FontWeight::Bold;
    let italic = s.font_style == FontStyle::Italic;
    let line_height = fonts.line_height_px(s.font_size, s.line_height);
    let inner_width = pbox.width - s.padding_left - s.padding_right;

    let text_lines: Vec<TextLine> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let width = fonts.measure_text_width(line, s.font_size, bold, italic, &s.font_family);
            let x_offset = s.padding_left
                + match s.text_align {
                    TextAlign::Left => 0.0,
                    TextAlign::Center => ((inner_width - width) / 2.0).max(0.0),
                    TextAlign::Right => (inner_width - width).max(0.0),
                };
            TextLine {
                text: line.clone(),
                x_offset,
                y_offset: s.padding_top + i as f32 * line_height,
                width,
            }
        })
        .collect();

    TextContent {
        lines: text_lines,
        font_family: s.font_family.clone(),
        font_size: s.font_size,
        bold,
        italic,
        color: [s.color.r, s.color.g, s.color.b, s.color.a],
        line_height,
        underline: s.text_decoration == TextDecoration::Underline,
        list_marker: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;
    use crate::layout::compute_layout;
    use crate::style::{build_styled_tree, Stylesheet};

    fn paginate_html(html: &str, css: &str) -> DocumentLayout {
        let dom = parse_html(html);
        let sheet = Stylesheet::parse(css);
        let styled = build_styled_tree(&dom, None, &sheet);
        let fonts = FontManager::default();
        let boxes = compute_layout(&styled, 595.0, PAGE_MARGIN_PT, &fonts, None);
        paginate(&boxes, "test", 595.0, 842.0, PAGE_MARGIN_PT, &fonts)
    }

    #[test]
    fn single_page() {
        let doc = paginate_html("<p>Short text</p>", "");
        assert_eq!(doc.pages.len(), 1);
    }

    #[test]
    fn multiple_pages() {
        let mut html = String::new();
        for i in 0..60 {
            html.push_str(&format!("<p>Paragraph {} with some text</p>", i));
        }
        let doc = paginate_html(&html, "");
        assert!(
            doc.pages.len() > 1,
            "expected multiple pages, got {}",
            doc.pages.len()
        );
    }

    #[test]
    fn page_break_before_starts_new_page() {
        let doc = paginate_html(
            r#"<p>First page</p><p class="next">Second page</p>"#,
            ".next { page-break-before: always; }",
        );
        assert!(doc.pages.len() >= 2);
    }

    #[test]
    fn centered_text_gets_x_offset() {
        let doc = paginate_html(
            r#"<h1 class="name">Jane</h1>"#,
            ".name { text-align: center; }",
        );
        let rb = &doc.pages[0].boxes[0];
        let text = rb.text.as_ref().expect("text content");
        assert!(text.lines[0].x_offset > 0.0, "centered line should be offset");
    }

    #[test]
    fn boxes_fall_within_page() {
        let doc = paginate_html("<div><h2>Skills</h2><p>Rust, Python</p></div>", "");
        for page in &doc.pages {
            for rb in &page.boxes {
                assert!(rb.y >= 0.0 && rb.y < doc.page_height_pt);
                assert!(rb.x >= 0.0 && rb.x < doc.page_width_pt);
            }
        }
    }
}
