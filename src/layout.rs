//! Layout engine – uses Taffy to compute flexbox layout from the styled
//! tree, then converts the result into positioned boxes in document
//! coordinates.

use std::collections::HashMap;
use std::path::Path;

use taffy::prelude::*;

use crate::assets;
use crate::dom::Tag;
use crate::fonts::{wrap_text, FontManager};
use crate::style::{self, ComputedStyle, FontStyle as CssFontStyle, FontWeight, StyledNode};

// ---------------------------------------------------------------------------
// Intermediate layout tree (pre-pagination)
// ---------------------------------------------------------------------------

/// A positioned box in document coordinates (before page splitting).
#[derive(Debug, Clone)]
pub struct PositionedBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub style: ComputedStyle,
    pub content: BoxContent,
    pub children: Vec<PositionedBox>,
    pub page_break_before: bool,
    pub page_break_after: bool,
    pub page_break_inside_avoid: bool,
}

#[derive(Debug, Clone)]
pub enum BoxContent {
    None,
    Text {
        text: String,
        lines: Vec<String>,
    },
    Image {
        src: String,
    },
    /// List item marker
    ListItem {
        marker: String,
    },
}

// ---------------------------------------------------------------------------
// Build Taffy tree from styled nodes
// ---------------------------------------------------------------------------

struct LayoutBuilder<'a> {
    taffy: TaffyTree<()>,
    fonts: &'a FontManager,
    base_dir: Option<&'a Path>,
    node_styles: HashMap<NodeId, ComputedStyle>,
    node_content: HashMap<NodeId, BoxContent>,
    available_width: f32,
}

impl<'a> LayoutBuilder<'a> {
    fn new(fonts: &'a FontManager, base_dir: Option<&'a Path>, available_width: f32) -> Self {
        Self {
            taffy: TaffyTree::new(),
            fonts,
            base_dir,
            node_styles: HashMap::new(),
            node_content: HashMap::new(),
            available_width,
        }
    }

    /// Collect text from an inline subtree. `<br>` becomes a newline that
    /// survives wrapping.
    fn collect_inline_text(node: &StyledNode) -> String {
        match node {
            StyledNode::Text { text, .. } => text.clone(),
            StyledNode::Element { tag, children, .. } => {
                if *tag == Tag::Br {
                    "\n".to_string()
                } else {
                    children
                        .iter()
                        .map(Self::collect_inline_text)
                        .collect::<Vec<_>>()
                        .join("")
                }
            }
        }
    }

    /// True when every child is a text node or an inline element.
    fn all_inline(children: &[StyledNode]) -> bool {
        children.iter().all(|c| match c {
            StyledNode::Text { .. } => true,
            StyledNode::Element { tag, children: gc, .. } => {
                tag.is_inline() && Self::all_inline(gc)
            }
        })
    }

    fn build_node(&mut self, styled: &StyledNode, parent_width: f32) -> NodeId {
        match styled {
            StyledNode::Text { text, style } => self.build_text_node(text, style, parent_width),
            StyledNode::Element {
                tag,
                style,
                children,
                attrs,
            } => self.build_element_node(tag, style, children, attrs, parent_width),
        }
    }

    /// Like build_text_node but carries the enclosing block's margin/padding
    /// and stretches the box to the block's width so text alignment and
    /// full-width borders have room to work.
    fn build_text_node_with_block_style(
        &mut self,
        text: &str,
        block_style: &ComputedStyle,
        parent_width: f32,
    ) -> NodeId {
        let node = self.build_text_node(text, block_style, parent_width);
        let current = self.taffy.style(node).unwrap().clone();
        let text_height = match current.size.height {
            Dimension::Length(h) => h,
            _ => 0.0,
        };
        let block_width = match block_style.width {
            style::Dimension::Px(w) => w,
            style::Dimension::Percent(p) => parent_width * p / 100.0,
            style::Dimension::Auto => parent_width,
        };
        let updated = Style {
            size: Size {
                width: Dimension::Length(block_width.max(1.0)),
                height: Dimension::Length(
                    text_height + block_style.padding_top + block_style.padding_bottom,
                ),
            },
            margin: Rect {
                top: LengthPercentageAuto::Length(block_style.margin_top),
                right: LengthPercentageAuto::Length(block_style.margin_right),
                bottom: LengthPercentageAuto::Length(block_style.margin_bottom),
                left: LengthPercentageAuto::Length(block_style.margin_left),
            },
            padding: Rect {
                top: LengthPercentage::Length(block_style.padding_top),
                right: LengthPercentage::Length(block_style.padding_right),
                bottom: LengthPercentage::Length(block_style.padding_bottom),
                left: LengthPercentage::Length(block_style.padding_left),
            },
            ..current
        };
        self.taffy.set_style(node, updated).unwrap();
        node
    }

    fn build_text_node(&mut self, text: &str, style: &ComputedStyle, parent_width: f32) -> NodeId {
        let bold = style.font_weight == FontWeight::Bold;
        let italic = style.font_style == CssFontStyle::Italic;
        let family = &style.font_family;
        let font_size = style.font_size;
        let line_height_px = self.fonts.line_height_px(font_size, style.line_height);

        let shaped = match style.text_transform {
            style::TextTransform::Uppercase => text.trim().to_uppercase(),
            style::TextTransform::None => text.trim().to_string(),
        };

        let max_w = if parent_width > 0.0 {
            parent_width
        } else {
            self.available_width
        };
        let lines = wrap_text(&shaped, font_size, bold, italic, family, max_w, self.fonts);

        let text_width = lines
            .iter()
            .map(|l| {
                self.fonts
                    .measure_text_width(l, font_size, bold, italic, family)
            })
            .fold(0.0f32, f32::max);
        let text_height = lines.len() as f32 * line_height_px;

        let taffy_style = Style {
            size: Size {
                width: Dimension::Length(text_width),
                height: Dimension::Length(text_height),
            },
            ..Default::default()
        };

        let node = self.taffy.new_leaf(taffy_style).unwrap();
        self.node_styles.insert(node, style.clone());
        self.node_content
            .insert(node, BoxContent::Text { text: shaped, lines });
        node
    }

    fn build_element_node(
        &mut self,
        tag: &Tag,
        style: &ComputedStyle,
        children: &[StyledNode],
        attrs: &HashMap<String, String>,
        parent_width: f32,
    ) -> NodeId {
        // Paragraph-like blocks whose children are all inline merge into a
        // single wrapped text node so spans flow as one run. List items stay
        // element boxes: their marker is attached to the element node below.
        let is_paragraph = matches!(tag, Tag::P | Tag::H1 | Tag::H2 | Tag::H3 | Tag::H4);
        if is_paragraph && !children.is_empty() && Self::all_inline(children) {
            let raw: String = children.iter().map(Self::collect_inline_text).collect();
            // Normalise whitespace per line, keeping <br> newlines.
            let combined = raw
                .split('\n')
                .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string();
            if !combined.is_empty() {
                return self.build_text_node_with_block_style(&combined, style, parent_width);
            }
        }

        // Width available for children
        let my_width = match style.width {
            style::Dimension::Px(w) => w,
            style::Dimension::Percent(p) => parent_width * p / 100.0,
            style::Dimension::Auto => parent_width,
        };
        let inner_width = my_width - style.padding_left - style.padding_right;

        // Per-child width estimate for flex rows so text wraps to column
        // width at build time.
        let is_flex_row = style.display == style::Display::Flex
            && style.flex_direction == style::FlexDirection::Row;

        let elem_child_count = children
            .iter()
            .filter(|c| matches!(c, StyledNode::Element { .. }))
            .count()
            .max(1);

        let child_build_width = if is_flex_row {
            let gap_total = style.gap * (elem_child_count.saturating_sub(1)) as f32;
            ((inner_width - gap_total) / elem_child_count as f32).max(1.0)
        } else {
            inner_width
        };

        let mut child_nodes = Vec::new();
        let mut list_counter = 0u32;

        for child in children {
            // List items get their marker recorded so the renderer can draw
            // the bullet / number in the left gutter.
            let li_marker: Option<String> =
                if let StyledNode::Element { tag: child_tag, .. } = child {
                    if *child_tag == Tag::Li {
                        list_counter += 1;
                        Some(if *tag == Tag::Ol {
                            format!("{}. ", list_counter)
                        } else {
                            "\u{2022} ".to_string()
                        })
                    } else {
                        None
                    }
                } else {
                    None
                };

            let child_id = self.build_node(child, child_build_width);

            if let Some(marker) = li_marker {
                self.node_content
                    .insert(child_id, BoxContent::ListItem { marker });
            }

            child_nodes.push(child_id);
        }

        // Resolve Auto image dimensions from intrinsic size; a flex container
        // with no children and Auto dimensions would otherwise compute 0×0.
        let style_override: Option<ComputedStyle> = if *tag == Tag::Img
            && (matches!(style.width, style::Dimension::Auto)
                || matches!(style.height, style::Dimension::Auto))
        {
            let src = attrs.get("src").map(|s| s.as_str()).unwrap_or("");
            self.resolve_img_auto_dimensions(src, style, parent_width)
        } else {
            None
        };

        let effective_style = style_override.as_ref().unwrap_or(style);
        let taffy_style = self.computed_to_taffy(effective_style);
        let node = self
            .taffy
            .new_with_children(taffy_style, &child_nodes)
            .unwrap();
        self.node_styles.insert(node, effective_style.clone());

        if *tag == Tag::Img {
            let src = attrs.get("src").cloned().unwrap_or_default();
            self.node_content.insert(node, BoxContent::Image { src });
        }

        node
    }

    /// Decode the referenced image and replace Auto width/height with
    /// concrete values derived from its intrinsic dimensions.
    fn resolve_img_auto_dimensions(
        &self,
        src: &str,
        style: &ComputedStyle,
        parent_width: f32,
    ) -> Option<ComputedStyle> {
        let bytes = match assets::load_resource(src, self.base_dir) {
            Ok(b) => b,
            Err(e) => {
                log::warn!("image dimensions unavailable — {e}");
                return None;
            }
        };
        let img = ::image::load_from_memory(&bytes).ok()?;
        let (px_w, px_h) = (img.width() as f32, img.height() as f32);
        if px_w == 0.0 || px_h == 0.0 {
            return None;
        }
        let aspect = px_w / px_h;

        let known_w: Option<f32> = match style.width {
            style::Dimension::Px(v) => Some(v),
            style::Dimension::Percent(p) => Some(parent_width * p / 100.0),
            style::Dimension::Auto => None,
        };
        let known_h: Option<f32> = match style.height {
            style::Dimension::Px(v) => Some(v),
            _ => None,
        };

        let mut s = style.clone();
        match (known_w, known_h) {
            (Some(w), None) => s.height = style::Dimension::Px((w / aspect).max(1.0)),
            (None, Some(h)) => s.width = style::Dimension::Px((h * aspect).max(1.0)),
            // Both Auto → intrinsic pixel dimensions at 1 px = 1 pt.
            (None, None) => {
                s.width = style::Dimension::Px(px_w);
                s.height = style::Dimension::Px(px_h);
            }
            (Some(_), Some(_)) => return None,
        }
        Some(s)
    }

    fn computed_to_taffy(&self, s: &ComputedStyle) -> Style {
        let mut ts = Style::default();

        match s.display {
            style::Display::Flex => {
                ts.display = taffy::Display::Flex;
                ts.flex_direction = match s.flex_direction {
                    style::FlexDirection::Row => taffy::FlexDirection::Row,
                    style::FlexDirection::Column => taffy::FlexDirection::Column,
                };
                ts.flex_wrap = match s.flex_wrap {
                    style::FlexWrap::NoWrap => taffy::FlexWrap::NoWrap,
                    style::FlexWrap::Wrap => taffy::FlexWrap::Wrap,
                };
                ts.justify_content = Some(match s.justify_content {
                    style::JustifyContent::Start => taffy::JustifyContent::Start,
                    style::JustifyContent::End => taffy::JustifyContent::End,
                    style::JustifyContent::Center => taffy::JustifyContent::Center,
                    style::JustifyContent::SpaceBetween => taffy::JustifyContent::SpaceBetween,
                    style::JustifyContent::SpaceAround => taffy::JustifyContent::SpaceAround,
                    style::JustifyContent::SpaceEvenly => taffy::JustifyContent::SpaceEvenly,
                });
                ts.align_items = Some(match s.align_items {
                    style::AlignItems::Start => taffy::AlignItems::Start,
                    style::AlignItems::End => taffy::AlignItems::End,
                    style::AlignItems::Center => taffy::AlignItems::Center,
                    style::AlignItems::Stretch => taffy::AlignItems::Stretch,
                    style::AlignItems::Baseline => taffy::AlignItems::Baseline,
                });
            }
            style::Display::Block | style::Display::InlineBlock => {
                // Block-level elements stack vertically.
                ts.display = taffy::Display::Flex;
                ts.flex_direction = taffy::FlexDirection::Column;
            }
            style::Display::Inline => {
                ts.display = taffy::Display::Flex;
                ts.flex_direction = taffy::FlexDirection::Row;
                ts.flex_wrap = taffy::FlexWrap::Wrap;
            }
            style::Display::None => {
                ts.display = taffy::Display::None;
            }
        }

        ts.size = Size {
            width: self.dim_to_taffy(s.width),
            height: self.dim_to_taffy(s.height),
        };
        // Flex items may compress below their natural content size.
        ts.min_size = Size {
            width: if s.flex_shrink > 0.0 || s.flex_grow > 0.0 {
                taffy::Dimension::Length(0.0)
            } else {
                taffy::Dimension::Auto
            },
            height: taffy::Dimension::Auto,
        };

        ts.flex_grow = s.flex_grow;
        ts.flex_shrink = s.flex_shrink;

        ts.margin = Rect {
            top: LengthPercentageAuto::Length(s.margin_top),
            right: LengthPercentageAuto::Length(s.margin_right),
            bottom: LengthPercentageAuto::Length(s.margin_bottom),
            left: LengthPercentageAuto::Length(s.margin_left),
        };
        ts.padding = Rect {
            top: LengthPercentage::Length(s.padding_top),
            right: LengthPercentage::Length(s.padding_right),
            bottom: LengthPercentage::Length(s.padding_bottom),
            left: LengthPercentage::Length(s.padding_left),
        };
        ts.border = Rect {
            top: LengthPercentage::Length(s.border_top),
            right: LengthPercentage::Length(s.border_right),
            bottom: LengthPercentage::Length(s.border_bottom),
            left: LengthPercentage::Length(s.border_left),
        };
        ts.gap = Size {
            width: LengthPercentage::Length(s.gap),
            height: LengthPercentage::Length(s.gap),
        };

        ts
    }

    fn dim_to_taffy(&self, d: style::Dimension) -> taffy::Dimension {
        match d {
            style::Dimension::Auto => taffy::Dimension::Auto,
            style::Dimension::Px(v) => taffy::Dimension::Length(v),
            style::Dimension::Percent(v) => taffy::Dimension::Percent(v / 100.0),
        }
    }

    /// Extract positioned boxes after layout computation.
    fn extract(&self, node: NodeId, offset_x: f32, offset_y: f32) -> PositionedBox {
        let layout = self.taffy.layout(node).unwrap();
        let style = self.node_styles.get(&node).cloned().unwrap_or_default();
        let content = self
            .node_content
            .get(&node)
            .cloned()
            .unwrap_or(BoxContent::None);

        let x = offset_x + layout.location.x;
        let y = offset_y + layout.location.y;

        let children: Vec<PositionedBox> = self
            .taffy
            .children(node)
            .unwrap_or_default()
            .iter()
            .map(|&child| self.extract(child, x, y))
            .collect();

        PositionedBox {
            x,
            y,
            width: layout.size.width,
            height: layout.size.height,
            page_break_before: style.page_break_before,
            page_break_after: style.page_break_after,
            page_break_inside_avoid: style.page_break_inside_avoid,
            style,
            content,
            children,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute layout for a styled tree, returning top-level positioned boxes in
/// document coordinates.
pub fn compute_layout(
    styled_nodes: &[StyledNode],
    page_width: f32,
    page_margin: f32,
    fonts: &FontManager,
    base_dir: Option<&Path>,
) -> Vec<PositionedBox> {
    let content_width = page_width - 2.0 * page_margin;
    let mut builder = LayoutBuilder::new(fonts, base_dir, content_width);

    let mut child_ids = Vec::new();
    for node in styled_nodes {
        let id = builder.build_node(node, content_width);
        child_ids.push(id);
    }

    let root_style = Style {
        display: taffy::Display::Flex,
        flex_direction: taffy::FlexDirection::Column,
        size: Size {
            width: taffy::Dimension::Length(content_width),
            height: taffy::Dimension::Auto,
        },
        ..Default::default()
    };

    let root = builder
        .taffy
        .new_with_children(root_style, &child_ids)
        .unwrap();

    builder
        .taffy
        .compute_layout(
            root,
            Size {
                width: AvailableSpace::Definite(content_width),
                height: AvailableSpace::MaxContent,
            },
        )
        .unwrap();

    let root_box = builder.extract(root, page_margin, 0.0);
    root_box.children
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;
    use crate::style::{build_styled_tree, Stylesheet};

    fn layout(html: &str, css: &str) -> Vec<PositionedBox> {
        let dom = parse_html(html);
        let sheet = Stylesheet::parse(css);
        let styled = build_styled_tree(&dom, None, &sheet);
        let fonts = FontManager::default();
        compute_layout(&styled, 595.0, 40.0, &fonts, None)
    }

    #[test]
    fn layout_simple_paragraph() {
        let boxes = layout("<p>Hello world</p>", "");
        assert!(!boxes.is_empty());
        assert!(boxes[0].width > 0.0);
        assert!(boxes[0].height > 0.0);
    }

    #[test]
    fn layout_flex_row() {
        let boxes = layout(
            r#"<div class="row"><div class="cell">A</div><div class="cell">B</div></div>"#,
            ".row { display: flex; } .cell { flex: 1; }",
        );
        assert!(!boxes.is_empty());
        let row = &boxes[0];
        assert_eq!(row.children.len(), 2);
        // Cells sit side by side.
        assert!(row.children[1].x > row.children[0].x);
        assert!((row.children[0].y - row.children[1].y).abs() < 0.5);
    }

    #[test]
    fn br_splits_lines() {
        let boxes = layout("<p>one<br>two</p>", "");
        let BoxContent::Text { lines, .. } = &boxes[0].content else {
            panic!("expected merged text");
        };
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn uppercase_transform_applies() {
        let boxes = layout("<h2>Experience</h2>", "h2 { text-transform: uppercase; }");
        let BoxContent::Text { text, .. } = &boxes[0].content else {
            panic!("expected text");
        };
        assert_eq!(text, "EXPERIENCE");
    }

    #[test]
    fn list_items_carry_markers() {
        let boxes = layout("<ol><li>First</li><li>Second</li></ol>", "");
        let ol = &boxes[0];
        assert_eq!(ol.children.len(), 2);
        let BoxContent::ListItem { marker } = &ol.children[1].content else {
            panic!("expected list marker");
        };
        assert_eq!(marker, "2. ");
    }
}
