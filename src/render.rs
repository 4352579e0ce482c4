//! PDF renderer – takes a [`DocumentLayout`] and produces PDF bytes using
//! `printpdf` (v0.8 ops-based API).
//!
//! Text uses embedded web fonts when the font manager fetched them and the
//! built-in Helvetica variants otherwise. Images whose bytes cannot be
//! resolved or decoded are skipped with a warning, never a failure.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use printpdf::*;

use crate::assets;
use crate::fonts::{FontKey, FontManager};
use crate::pagination::*;

/// A printpdf XObject together with the pixel dimensions of the source image.
struct ImageResource {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

/// Render a DocumentLayout into PDF bytes.
pub fn render_pdf(
    layout: &DocumentLayout,
    fonts: &FontManager,
    base_dir: Option<&Path>,
) -> Result<Vec<u8>, String> {
    let page_w = Mm(layout.page_width_pt * 0.352778); // pt → mm
    let page_h = Mm(layout.page_height_pt * 0.352778);

    let mut doc = PdfDocument::new(&layout.title);

    // ── Pre-register embedded fonts ───────────────────────────────────────
    let mut font_ids: HashMap<FontKey, FontId> = HashMap::new();
    let mut font_warnings: Vec<PdfWarnMsg> = Vec::new();
    for key in fonts.embeddable_keys() {
        let Some(bytes) = fonts.font_bytes(&key) else {
            continue;
        };
        match ParsedFont::from_bytes(bytes, 0, &mut font_warnings) {
            Some(parsed) => {
                let id = doc.add_font(&parsed);
                font_ids.insert(key, id);
            }
            None => log::warn!(
                "font '{}' could not be embedded, falling back to built-in",
                key.family
            ),
        }
    }

    // ── Pre-register all images ───────────────────────────────────────────
    let mut all_srcs: HashSet<&str> = HashSet::new();
    for page in &layout.pages {
        for rb in &page.boxes {
            collect_image_srcs(rb, &mut all_srcs);
        }
    }

    let mut image_resources: HashMap<String, ImageResource> = HashMap::new();
    let mut img_warnings: Vec<PdfWarnMsg> = Vec::new();

    for src in &all_srcs {
        let bytes = match assets::load_resource(src, base_dir) {
            Ok(b) => b,
            Err(e) => {
                log::warn!("skipping image — {e}");
                continue;
            }
        };

        // Decode with the `image` crate to obtain pixel dimensions.
        let dyn_img = match ::image::load_from_memory(&bytes) {
            Ok(img) => img,
            Err(e) => {
                log::warn!("skipping image — decode error: {e}");
                continue;
            }
        };
        let (px_width, px_height) = (dyn_img.width(), dyn_img.height());

        let raw = match RawImage::decode_from_bytes(&bytes, &mut img_warnings) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("skipping image — PDF encode error: {e}");
                continue;
            }
        };
        let xobj_id = doc.add_image(&raw);

        image_resources.insert(
            src.to_string(),
            ImageResource {
                xobj_id,
                px_width,
                px_height,
            },
        );
    }

    // ── Render pages ──────────────────────────────────────────────────────
    let mut pages = Vec::new();

    for page in &layout.pages {
        let mut ops = Vec::new();
        for rb in &page.boxes {
            render_box(
                &mut ops,
                rb,
                layout.page_height_pt,
                fonts,
                &font_ids,
                &image_resources,
            );
        }
        pages.push(PdfPage::new(page_w, page_h, ops));
    }

    if pages.is_empty() {
        pages.push(PdfPage::new(page_w, page_h, Vec::new()));
    }

    doc.with_pages(pages);
    Ok(doc.save(&PdfSaveOptions::default(), &mut Vec::new()))
}

/// Convert a UTF-8 string to raw Windows-1252 bytes wrapped in a String so
/// printpdf writes the bytes unchanged into the PDF stream (builtin fonts use
/// WinAnsiEncoding, one byte per glyph).
fn to_winlatin(s: &str) -> String {
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80, // euro
            '\u{201A}' => 0x82, // single low-9 quote
            '\u{201E}' => 0x84, // double low-9 quote
            '\u{2026}' => 0x85, // ellipsis
            '\u{2018}' => 0x91, // left single quote
            '\u{2019}' => 0x92, // right single quote
            '\u{201C}' => 0x93, // left double quote
            '\u{201D}' => 0x94, // right double quote
            '\u{2022}' => 0x95, // bullet
            '\u{2013}' => 0x96, // en-dash
            '\u{2014}' => 0x97, // em-dash
            '\u{00A0}' => 0x20, // non-breaking space -> space
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect();
    // SAFETY: intentionally non-UTF-8 for the 0x80-0x9F range; printpdf
    // passes these bytes straight through, decoded by WinAnsiEncoding.
    #[allow(unsafe_code)]
    unsafe {
        String::from_utf8_unchecked(bytes)
    }
}

/// Recursively collect all unique `image.src` strings from a box tree.
fn collect_image_srcs<'a>(rb: &'a RenderBox, srcs: &mut HashSet<&'a str>) {
    if let Some(img) = &rb.image {
        srcs.insert(img.src.as_str());
    }
    for child in &rb.children {
        collect_image_srcs(child, srcs);
    }
}

fn rgb(color: [f32; 4]) -> Color {
    Color::Rgb(Rgb {
        r: color[0],
        g: color[1],
        b: color[2],
        icc_profile: None,
    })
}

fn line_between(x1: f32, y1: f32, x2: f32, y2: f32) -> Line {
    Line {
        points: vec![
            LinePoint {
                p: Point {
                    x: Pt(x1),
                    y: Pt(y1),
                },
                bezier: false,
            },
            LinePoint {
                p: Point {
                    x: Pt(x2),
                    y: Pt(y2),
                },
                bezier: false,
            },
        ],
        is_closed: false,
    }
}

/// Recursively render a RenderBox and its children into PDF ops.
fn render_box(
    ops: &mut Vec<Op>,
    rb: &RenderBox,
    page_height: f32,
    fonts: &FontManager,
    font_ids: &HashMap<FontKey, FontId>,
    images: &HashMap<String, ImageResource>,
) {
    // PDF origin is bottom-left; layout origin is top-left.
    let pdf_y = page_height - rb.y;

    // Background
    if let Some(bg) = &rb.background_color {
        ops.push(Op::SetFillColor { col: rgb(*bg) });

        let x1 = rb.x;
        let y1 = pdf_y - rb.height;
        let x2 = rb.x + rb.width;
        let y2 = pdf_y;

        ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing {
                    points: vec![
                        LinePoint {
                            p: Point {
                                x: Pt(x1),
                                y: Pt(y1),
                            },
                            bezier: false,
                        },
                        LinePoint {
                            p: Point {
                                x: Pt(x2),
                                y: Pt(y1),
                            },
                            bezier: false,
                        },
                        LinePoint {
                            p: Point {
                                x: Pt(x2),
                                y: Pt(y2),
                            },
                            bezier: false,
                        },
                        LinePoint {
                            p: Point {
                                x: Pt(x1),
                                y: Pt(y2),
                            },
                            bezier: false,
                        },
                    ],
                }],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            },
        });
    }

    // Borders, one side at a time (CV templates mostly use border-bottom).
    if let Some(border) = &rb.border {
        let [top, right, bottom, left] = border.widths;
        let x1 = rb.x;
        let y_top = pdf_y;
        let x2 = rb.x + rb.width;
        let y_bottom = pdf_y - rb.height;

        ops.push(Op::SetOutlineColor {
            col: rgb(border.color),
        });
        let stroke = |ops: &mut Vec<Op>, w: f32, line: Line| {
            if w > 0.0 {
                ops.push(Op::SetOutlineThickness { pt: Pt(w) });
                ops.push(Op::DrawLine { line });
            }
        };
        stroke(ops, top, line_between(x1, y_top, x2, y_top));
        stroke(ops, bottom, line_between(x1, y_bottom, x2, y_bottom));
        stroke(ops, left, line_between(x1, y_top, x1, y_bottom));
        stroke(ops, right, line_between(x2, y_top, x2, y_bottom));
    }

    // Text
    if let Some(text) = &rb.text {
        let key = FontKey {
            family: text.font_family.clone(),
            bold: text.bold,
            italic: text.italic,
        };
        let embedded = font_ids.get(&key);
        let builtin = match (text.bold, text.italic) {
            (true, true) => BuiltinFont::HelveticaBoldOblique,
            (true, false) => BuiltinFont::HelveticaBold,
            (false, true) => BuiltinFont::HelveticaOblique,
            (false, false) => BuiltinFont::Helvetica,
        };
        let ascender =
            fonts.ascender_px(text.font_size, text.bold, text.italic, &text.font_family);

        for tline in &text.lines {
            if tline.text.is_empty() {
                continue;
            }
            let text_x = rb.x + tline.x_offset;
            let text_y = pdf_y - tline.y_offset - ascender;

            ops.push(Op::StartTextSection);
            ops.push(Op::SetTextCursor {
                pos: Point {
                    x: Pt(text_x),
                    y: Pt(text_y),
                },
            });
            ops.push(Op::SetLineHeight {
                lh: Pt(text.line_height),
            });
            ops.push(Op::SetFillColor {
                col: rgb(text.color),
            });
            match embedded {
                Some(font_id) => {
                    ops.push(Op::SetFontSize {
                        size: Pt(text.font_size),
                        font: font_id.clone(),
                    });
                    ops.push(Op::WriteText {
                        items: vec![TextItem::Text(tline.text.clone())],
                        font: font_id.clone(),
                    });
                }
                None => {
                    ops.push(Op::SetFontSizeBuiltinFont {
                        size: Pt(text.font_size),
                        font: builtin,
                    });
                    ops.push(Op::WriteTextBuiltinFont {
                        items: vec![TextItem::Text(to_winlatin(&tline.text))],
                        font: builtin,
                    });
                }
            }
            ops.push(Op::EndTextSection);

            if text.underline {
                let underline_y = text_y - text.font_size * 0.1;
                ops.push(Op::SetOutlineThickness { pt: Pt(0.5) });
                ops.push(Op::SetOutlineColor {
                    col: rgb(text.color),
                });
                ops.push(Op::DrawLine {
                    line: line_between(text_x, underline_y, text_x + tline.width, underline_y),
                });
            }
        }

        // List marker in the left gutter.
        if let Some(marker) = &text.list_marker {
            let marker_x = rb.x - 16.0;
            let marker_y = pdf_y - ascender;
            ops.push(Op::StartTextSection);
            ops.push(Op::SetTextCursor {
                pos: Point {
                    x: Pt(marker_x),
                    y: Pt(marker_y),
                },
            });
            ops.push(Op::SetFillColor {
                col: rgb(text.color),
            });
            match embedded {
                Some(font_id) => {
                    ops.push(Op::SetFontSize {
                        size: Pt(text.font_size),
                        font: font_id.clone(),
                    });
                    ops.push(Op::WriteText {
                        items: vec![TextItem::Text(marker.clone())],
                        font: font_id.clone(),
                    });
                }
                None => {
                    ops.push(Op::SetFontSizeBuiltinFont {
                        size: Pt(text.font_size),
                        font: builtin,
                    });
                    ops.push(Op::WriteTextBuiltinFont {
                        items: vec![TextItem::Text(to_winlatin(marker))],
                        font: builtin,
                    });
                }
            }
            ops.push(Op::EndTextSection);
        }
    }

    // Image – embed from pre-registered XObject.
    if let Some(img) = &rb.image {
        if let Some(res) = images.get(&img.src) {
            let img_bottom_y = page_height - rb.y - img.height;

            // At dpi=72 printpdf renders 1 px = 1 pt, so scale is
            // desired_pt / px_dim.
            let scale_x = if res.px_width > 0 {
                img.width / res.px_width as f32
            } else {
                1.0
            };
            let scale_y = if res.px_height > 0 {
                img.height / res.px_height as f32
            } else {
                1.0
            };

            ops.push(Op::UseXobject {
                id: res.xobj_id.clone(),
                transform: XObjectTransform {
                    translate_x: Some(Pt(rb.x)),
                    translate_y: Some(Pt(img_bottom_y)),
                    dpi: Some(72.0),
                    scale_x: Some(scale_x),
                    scale_y: Some(scale_y),
                    rotate: None,
                },
            });
        }
    }

    for child in &rb.children {
        render_box(ops, child, page_height, fonts, font_ids, images);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_empty_page() {
        let layout = DocumentLayout {
            title: "empty".to_string(),
            page_width_pt: 595.28,
            page_height_pt: 841.89,
            pages: Vec::new(),
        };
        let fonts = FontManager::default();
        let bytes = render_pdf(&layout, &fonts, None).unwrap();
        assert!(bytes.len() > 100, "PDF should have content");
        assert_eq!(&bytes[0..5], b"%PDF-");
    }
}
