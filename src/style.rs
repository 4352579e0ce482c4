//! Style resolver – parses the document's embedded CSS and computes a flat
//! [`ComputedStyle`] per element for the layout engine.
//!
//! The supported CSS is the subset CV templates actually use: type and class
//! selectors, the box model, flexbox, typography, and page-break hints.
//! `@import` lines are collected separately so the font manager can fetch
//! remote faces; all other at-rules are skipped together with their blocks.

use crate::dom::{DomNode, ElementNode, Tag};

/// Fully resolved style for a single element.
#[derive(Debug, Clone)]
pub struct ComputedStyle {
    // Display / layout
    pub display: Display,
    pub flex_direction: FlexDirection,
    pub flex_wrap: FlexWrap,
    pub flex_grow: f32,
    pub flex_shrink: f32,
    pub justify_content: JustifyContent,
    pub align_items: AlignItems,
    pub gap: f32,

    // Sizing
    pub width: Dimension,
    pub height: Dimension,

    // Spacing (pt)
    pub margin_top: f32,
    pub margin_right: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub padding_top: f32,
    pub padding_right: f32,
    pub padding_bottom: f32,
    pub padding_left: f32,

    // Border (per-side widths, one colour)
    pub border_top: f32,
    pub border_right: f32,
    pub border_bottom: f32,
    pub border_left: f32,
    pub border_color: Color,

    // Typography
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    pub font_family: String,
    pub color: Color,
    pub text_align: TextAlign,
    pub text_transform: TextTransform,
    pub line_height: f32,
    pub text_decoration: TextDecoration,

    // Background
    pub background_color: Color,

    // Page break
    pub page_break_before: bool,
    pub page_break_after: bool,
    pub page_break_inside_avoid: bool,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Block,
            flex_direction: FlexDirection::Row,
            flex_wrap: FlexWrap::NoWrap,
            flex_grow: 0.0,
            flex_shrink: 1.0,
            justify_content: JustifyContent::Start,
            align_items: AlignItems::Stretch,
            gap: 0.0,
            width: Dimension::Auto,
            height: Dimension::Auto,
            margin_top: 0.0,
            margin_right: 0.0,
            margin_bottom: 0.0,
            margin_left: 0.0,
            padding_top: 0.0,
            padding_right: 0.0,
            padding_bottom: 0.0,
            padding_left: 0.0,
            border_top: 0.0,
            border_right: 0.0,
            border_bottom: 0.0,
            border_left: 0.0,
            border_color: Color::BLACK,
            font_size: 16.0,
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
            font_family: "Helvetica".to_string(),
            color: Color::BLACK,
            text_align: TextAlign::Left,
            text_transform: TextTransform::None,
            line_height: 1.4,
            text_decoration: TextDecoration::None,
            background_color: Color::TRANSPARENT,
            page_break_before: false,
            page_break_after: false,
            page_break_inside_avoid: false,
        }
    }
}

impl ComputedStyle {
    pub fn has_border(&self) -> bool {
        self.border_top > 0.0
            || self.border_right > 0.0
            || self.border_bottom > 0.0
            || self.border_left > 0.0
    }
}

// ---------------------------------------------------------------------------
// Supporting enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    Flex,
    Inline,
    InlineBlock,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexDirection {
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexWrap {
    NoWrap,
    Wrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JustifyContent {
    Start,
    End,
    Center,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignItems {
    Start,
    End,
    Center,
    Stretch,
    Baseline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextTransform {
    None,
    Uppercase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDecoration {
    None,
    Underline,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Auto,
    Px(f32),
    Percent(f32),
}

/// RGBA colour (0.0 – 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub fn is_transparent(&self) -> bool {
        self.a < 0.001
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() == 6 {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()? as f32 / 255.0;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()? as f32 / 255.0;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()? as f32 / 255.0;
            Some(Self { r, g, b, a: 1.0 })
        } else if hex.len() == 3 {
            let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()? as f32 / 255.0;
            let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()? as f32 / 255.0;
            let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()? as f32 / 255.0;
            Some(Self { r, g, b, a: 1.0 })
        } else {
            None
        }
    }

    /// Parse `#hex`, `rgb(r, g, b)`, or a small named set.
    pub fn parse(val: &str) -> Option<Self> {
        let val = val.trim();
        if val.starts_with('#') {
            return Self::from_hex(val);
        }
        if let Some(args) = val.strip_prefix("rgb(").and_then(|v| v.strip_suffix(')')) {
            let nums: Vec<f32> = args
                .split(',')
                .filter_map(|n| n.trim().parse::<f32>().ok())
                .collect();
            if nums.len() == 3 {
                return Some(Self {
                    r: nums[0] / 255.0,
                    g: nums[1] / 255.0,
                    b: nums[2] / 255.0,
                    a: 1.0,
                });
            }
            return None;
        }
        match val {
            "black" => Some(Self::BLACK),
            "white" => Some(Self::WHITE),
            "gray" | "grey" => Some(Self {
                r: 0.5,
                g: 0.5,
                b: 0.5,
                a: 1.0,
            }),
            "transparent" => Some(Self::TRANSPARENT),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Stylesheet parsing
// ---------------------------------------------------------------------------

/// A parsed stylesheet: flat rules plus any `@import` URLs.
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    rules: Vec<Rule>,
    /// URLs from `@import url(...)` lines, in source order.
    pub imports: Vec<String>,
}

#[derive(Debug, Clone)]
struct Rule {
    selector: Selector,
    declarations: Vec<(String, String)>,
    order: usize,
}

/// `tag`, `.class`, or `tag.class`. Anything fancier is ignored.
#[derive(Debug, Clone)]
struct Selector {
    tag: Option<String>,
    class: Option<String>,
}

impl Selector {
    fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty()
            || s.contains(' ')
            || s.contains('>')
            || s.contains(':')
            || s.contains('[')
            || s.contains('*')
        {
            return None;
        }
        let (tag, class) = match s.find('.') {
            Some(0) => (None, Some(s[1..].to_string())),
            Some(i) => (Some(s[..i].to_string()), Some(s[i + 1..].to_string())),
            None => (Some(s.to_string()), None),
        };
        if let Some(c) = &class {
            if c.is_empty() || c.contains('.') {
                return None;
            }
        }
        Some(Self { tag, class })
    }

    fn matches(&self, element: &ElementNode) -> bool {
        if let Some(tag) = &self.tag {
            if element.tag.selector_name() != tag {
                return false;
            }
        }
        if let Some(class) = &self.class {
            if !element.classes().contains(&class.as_str()) {
                return false;
            }
        }
        true
    }

    fn specificity(&self) -> u32 {
        let mut s = 0;
        if self.class.is_some() {
            s += 10;
        }
        if self.tag.is_some() {
            s += 1;
        }
        s
    }
}

impl Stylesheet {
    /// Parse CSS text. Unknown constructs are skipped, never fatal.
    pub fn parse(css: &str) -> Self {
        let css = strip_comments(css);
        let mut sheet = Stylesheet::default();
        let mut rest = css.as_str();
        let mut order = 0usize;

        while !rest.trim_start().is_empty() {
            rest = rest.trim_start();
            if rest.starts_with('@') {
                rest = sheet.parse_at_rule(rest);
                continue;
            }
            let Some(open) = rest.find('{') else { break };
            let selector_list = &rest[..open];
            let after_open = &rest[open + 1..];
            let Some(close) = after_open.find('}') else {
                break;
            };
            let block = &after_open[..close];
            let declarations = parse_declarations(block);
            for sel in selector_list.split(',') {
                if let Some(selector) = Selector::parse(sel) {
                    sheet.rules.push(Rule {
                        selector,
                        declarations: declarations.clone(),
                        order,
                    });
                    order += 1;
                }
            }
            rest = &after_open[close + 1..];
        }
        sheet
    }

    /// Handle `@import`; skip any other at-rule with its block or statement.
    fn parse_at_rule<'a>(&mut self, rest: &'a str) -> &'a str {
        if rest.starts_with("@import") {
            // Font URLs may contain ';' (weight lists), so the statement
            // ends at the first ';' after the url(...) closing paren.
            let stmt_end = match rest.find("url(") {
                Some(i) => {
                    let close = rest[i..].find(')').map(|c| i + c).unwrap_or(rest.len());
                    rest[close..].find(';').map(|s| close + s)
                }
                None => rest.find(';'),
            };
            let (stmt, next) = match stmt_end {
                Some(s) => (&rest[..s], &rest[s + 1..]),
                None => (rest, ""),
            };
            if let Some(url) = extract_url(stmt) {
                self.imports.push(url);
            }
            return next;
        }

        let semi = rest.find(';');
        let brace = rest.find('{');
        match (semi, brace) {
            // Statement form, e.g. @charset "utf-8";
            (Some(s), b) if b.map_or(true, |b| s < b) => &rest[s + 1..],
            // Block form, e.g. @media ... { ... } — skip balanced braces.
            (_, Some(b)) => {
                let mut depth = 0usize;
                for (i, c) in rest[b..].char_indices() {
                    match c {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                return &rest[b + i + 1..];
                            }
                        }
                        _ => {}
                    }
                }
                ""
            }
            (None, None) => "",
        }
    }

    /// All matching rules applied to `style`, class-over-type, source order.
    fn apply_to(&self, style: &mut ComputedStyle, element: &ElementNode) {
        let mut matching: Vec<&Rule> = self
            .rules
            .iter()
            .filter(|r| r.selector.matches(element))
            .collect();
        matching.sort_by_key(|r| (r.selector.specificity(), r.order));
        for rule in matching {
            for (prop, val) in &rule.declarations {
                apply_declaration(style, prop, val);
            }
        }
    }
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start..].find("*/") {
            Some(end) => rest = &rest[start + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Pull the URL out of `@import url('...')` / `@import "..."`.
fn extract_url(stmt: &str) -> Option<String> {
    let inner = match stmt.find("url(") {
        Some(i) => {
            let after = &stmt[i + 4..];
            &after[..after.find(')')?]
        }
        None => stmt.strip_prefix("@import")?,
    };
    let url = inner.trim().trim_matches(|c| c == '\'' || c == '"').trim();
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}

fn parse_declarations(block: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for decl in block.split(';') {
        let decl = decl.trim();
        if decl.is_empty() {
            continue;
        }
        let mut parts = decl.splitn(2, ':');
        let (Some(prop), Some(val)) = (parts.next(), parts.next()) else {
            continue;
        };
        out.push((
            prop.trim().to_ascii_lowercase(),
            val.trim().to_string(),
        ));
    }
    out
}

// ---------------------------------------------------------------------------
// Style resolution
// ---------------------------------------------------------------------------

/// Resolve the style for an element: tag defaults, then stylesheet rules,
/// then the inline `style` attribute. Text properties inherit from the parent.
pub fn resolve_style(
    element: &ElementNode,
    parent: Option<&ComputedStyle>,
    sheet: &Stylesheet,
) -> ComputedStyle {
    let mut style = base_style_for_tag(&element.tag);

    if let Some(p) = parent {
        style.font_size = p.font_size;
        style.font_family = p.font_family.clone();
        style.color = p.color;
        style.text_align = p.text_align;
        style.line_height = p.line_height;
        // Weight/slant inherit too, but tag defaults (headings, em, strong)
        // must win over the inherited value.
        if !matches!(element.tag, Tag::H1 | Tag::H2 | Tag::H3 | Tag::H4 | Tag::Strong) {
            style.font_weight = p.font_weight;
        }
        if element.tag != Tag::Em {
            style.font_style = p.font_style;
        }
        style.text_transform = p.text_transform;
    }

    // Tag defaults that scale with the inherited font size.
    apply_relative_tag_defaults(&mut style, &element.tag);

    sheet.apply_to(&mut style, element);

    if let Some(inline) = element.inline_style() {
        for (prop, val) in parse_declarations(inline) {
            apply_declaration(&mut style, &prop, &val);
        }
    }

    style
}

/// Default styles based on tag semantics (non-inherited parts).
fn base_style_for_tag(tag: &Tag) -> ComputedStyle {
    let mut s = ComputedStyle::default();
    match tag {
        Tag::H1 | Tag::H2 | Tag::H3 | Tag::H4 => {
            s.font_weight = FontWeight::Bold;
        }
        Tag::Strong => {
            s.font_weight = FontWeight::Bold;
            s.display = Display::Inline;
        }
        Tag::Em => {
            s.font_style = FontStyle::Italic;
            s.display = Display::Inline;
        }
        Tag::Span | Tag::A | Tag::Br => {
            s.display = Display::Inline;
        }
        Tag::Img => {
            s.display = Display::InlineBlock;
        }
        Tag::Hr => {
            s.height = Dimension::Px(0.75);
            s.background_color = Color {
                r: 0.6,
                g: 0.6,
                b: 0.6,
                a: 1.0,
            };
            s.margin_top = 8.0;
            s.margin_bottom = 8.0;
        }
        Tag::Head | Tag::Style | Tag::Title | Tag::Meta | Tag::Link | Tag::Unknown(_) => {
            s.display = Display::None;
        }
        _ => {}
    }
    s
}

/// Heading sizes and default block spacing, relative to the inherited size.
fn apply_relative_tag_defaults(s: &mut ComputedStyle, tag: &Tag) {
    match tag {
        Tag::H1 => {
            s.font_size *= 2.0;
            s.margin_top = 16.0;
            s.margin_bottom = 12.0;
        }
        Tag::H2 => {
            s.font_size *= 1.5;
            s.margin_top = 14.0;
            s.margin_bottom = 10.0;
        }
        Tag::H3 => {
            s.font_size *= 1.2;
            s.margin_top = 12.0;
            s.margin_bottom = 8.0;
        }
        Tag::H4 => {
            s.margin_top = 10.0;
            s.margin_bottom = 6.0;
        }
        Tag::P => {
            s.margin_bottom = 10.0;
        }
        Tag::Ul | Tag::Ol => {
            s.margin_bottom = 10.0;
            s.padding_left = 24.0;
        }
        Tag::Li => {
            s.margin_bottom = 4.0;
        }
        _ => {}
    }
}

fn apply_declaration(s: &mut ComputedStyle, prop: &str, val: &str) {
    match prop {
        "display" => {
            s.display = match val {
                "flex" => Display::Flex,
                "block" => Display::Block,
                "inline" => Display::Inline,
                "inline-block" => Display::InlineBlock,
                "none" => Display::None,
                _ => s.display,
            }
        }
        "flex-direction" => {
            s.flex_direction = match val {
                "row" => FlexDirection::Row,
                "column" => FlexDirection::Column,
                _ => s.flex_direction,
            }
        }
        "flex-wrap" => {
            s.flex_wrap = match val {
                "wrap" => FlexWrap::Wrap,
                "nowrap" => FlexWrap::NoWrap,
                _ => s.flex_wrap,
            }
        }
        "flex-grow" => {
            if let Ok(v) = val.parse::<f32>() {
                s.flex_grow = v;
            }
        }
        "flex-shrink" => {
            if let Ok(v) = val.parse::<f32>() {
                s.flex_shrink = v;
            }
        }
        "flex" => {
            // `flex: <grow>` single-number form only.
            if let Ok(v) = val.parse::<f32>() {
                s.flex_grow = v;
                s.flex_shrink = 1.0;
            }
        }
        "justify-content" => {
            s.justify_content = match val {
                "flex-start" | "start" => JustifyContent::Start,
                "flex-end" | "end" => JustifyContent::End,
                "center" => JustifyContent::Center,
                "space-between" => JustifyContent::SpaceBetween,
                "space-around" => JustifyContent::SpaceAround,
                "space-evenly" => JustifyContent::SpaceEvenly,
                _ => s.justify_content,
            }
        }
        "align-items" => {
            s.align_items = match val {
                "flex-start" | "start" => AlignItems::Start,
                "flex-end" | "end" => AlignItems::End,
                "center" => AlignItems::Center,
                "stretch" => AlignItems::Stretch,
                "baseline" => AlignItems::Baseline,
                _ => s.align_items,
            }
        }
        "gap" => {
            if let Some(v) = parse_length(val, s.font_size) {
                s.gap = v;
            }
        }
        "font-size" => {
            if let Some(v) = parse_length(val, s.font_size) {
                s.font_size = v;
            }
        }
        "font-weight" => {
            s.font_weight = match val.parse::<u32>() {
                Ok(n) => {
                    if n >= 600 {
                        FontWeight::Bold
                    } else {
                        FontWeight::Normal
                    }
                }
                Err(_) => match val {
                    "bold" | "bolder" => FontWeight::Bold,
                    "normal" => FontWeight::Normal,
                    _ => s.font_weight,
                },
            }
        }
        "font-style" => {
            s.font_style = match val {
                "italic" | "oblique" => FontStyle::Italic,
                "normal" => FontStyle::Normal,
                _ => s.font_style,
            }
        }
        "font-family" => {
            if let Some(first) = val.split(',').next() {
                let family = first.trim().trim_matches(|c| c == '\'' || c == '"');
                if !family.is_empty() {
                    s.font_family = family.to_string();
                }
            }
        }
        "color" => {
            if let Some(c) = Color::parse(val) {
                s.color = c;
            }
        }
        "background-color" | "background" => {
            if let Some(c) = Color::parse(val) {
                s.background_color = c;
            }
        }
        "text-align" => {
            s.text_align = match val {
                "center" => TextAlign::Center,
                "right" => TextAlign::Right,
                "left" => TextAlign::Left,
                _ => s.text_align,
            }
        }
        "text-transform" => {
            s.text_transform = match val {
                "uppercase" => TextTransform::Uppercase,
                "none" => TextTransform::None,
                _ => s.text_transform,
            }
        }
        "text-decoration" => {
            s.text_decoration = match val {
                "underline" => TextDecoration::Underline,
                "none" => TextDecoration::None,
                _ => s.text_decoration,
            }
        }
        "line-height" => {
            if let Ok(v) = val.parse::<f32>() {
                s.line_height = v;
            } else if let Some(px) = parse_length(val, s.font_size) {
                if s.font_size > 0.0 {
                    s.line_height = px / s.font_size;
                }
            }
        }
        "width" => s.width = parse_dimension(val, s.font_size),
        "height" => s.height = parse_dimension(val, s.font_size),
        "margin" => apply_shorthand_spacing(
            val,
            s.font_size,
            &mut s.margin_top,
            &mut s.margin_right,
            &mut s.margin_bottom,
            &mut s.margin_left,
        ),
        "margin-top" => {
            if let Some(v) = parse_length(val, s.font_size) {
                s.margin_top = v;
            }
        }
        "margin-right" => {
            if let Some(v) = parse_length(val, s.font_size) {
                s.margin_right = v;
            }
        }
        "margin-bottom" => {
            if let Some(v) = parse_length(val, s.font_size) {
                s.margin_bottom = v;
            }
        }
        "margin-left" => {
            if let Some(v) = parse_length(val, s.font_size) {
                s.margin_left = v;
            }
        }
        "padding" => apply_shorthand_spacing(
            val,
            s.font_size,
            &mut s.padding_top,
            &mut s.padding_right,
            &mut s.padding_bottom,
            &mut s.padding_left,
        ),
        "padding-top" => {
            if let Some(v) = parse_length(val, s.font_size) {
                s.padding_top = v;
            }
        }
        "padding-right" => {
            if let Some(v) = parse_length(val, s.font_size) {
                s.padding_right = v;
            }
        }
        "padding-bottom" => {
            if let Some(v) = parse_length(val, s.font_size) {
                s.padding_bottom = v;
            }
        }
        "padding-left" => {
            if let Some(v) = parse_length(val, s.font_size) {
                s.padding_left = v;
            }
        }
        "border" => {
            if let Some((w, c)) = parse_border(val, s.font_size) {
                s.border_top = w;
                s.border_right = w;
                s.border_bottom = w;
                s.border_left = w;
                if let Some(c) = c {
                    s.border_color = c;
                }
            }
        }
        "border-top" => {
            if let Some((w, c)) = parse_border(val, s.font_size) {
                s.border_top = w;
                if let Some(c) = c {
                    s.border_color = c;
                }
            }
        }
        "border-right" => {
            if let Some((w, c)) = parse_border(val, s.font_size) {
                s.border_right = w;
                if let Some(c) = c {
                    s.border_color = c;
                }
            }
        }
        "border-bottom" => {
            if let Some((w, c)) = parse_border(val, s.font_size) {
                s.border_bottom = w;
                if let Some(c) = c {
                    s.border_color = c;
                }
            }
        }
        "border-left" => {
            if let Some((w, c)) = parse_border(val, s.font_size) {
                s.border_left = w;
                if let Some(c) = c {
                    s.border_color = c;
                }
            }
        }
        "border-color" => {
            if let Some(c) = Color::parse(val) {
                s.border_color = c;
            }
        }
        "page-break-before" | "break-before" => {
            s.page_break_before = val == "always" || val == "page";
        }
        "page-break-after" | "break-after" => {
            s.page_break_after = val == "always" || val == "page";
        }
        "page-break-inside" | "break-inside" => {
            s.page_break_inside_avoid = val == "avoid";
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Value parsing
// ---------------------------------------------------------------------------

/// `px` and `pt` are both canvas points here; `em` scales the current
/// font size; bare numbers pass through.
fn parse_length(val: &str, font_size: f32) -> Option<f32> {
    let val = val.trim();
    if let Some(n) = val.strip_suffix("px") {
        return n.trim().parse().ok();
    }
    if let Some(n) = val.strip_suffix("pt") {
        return n.trim().parse().ok();
    }
    if let Some(n) = val.strip_suffix("em") {
        return n.trim().parse::<f32>().ok().map(|v| v * font_size);
    }
    if val == "0" {
        return Some(0.0);
    }
    val.parse().ok()
}

fn parse_dimension(val: &str, font_size: f32) -> Dimension {
    let val = val.trim();
    if val == "auto" {
        Dimension::Auto
    } else if let Some(n) = val.strip_suffix('%') {
        n.trim()
            .parse::<f32>()
            .map(Dimension::Percent)
            .unwrap_or(Dimension::Auto)
    } else {
        parse_length(val, font_size)
            .map(Dimension::Px)
            .unwrap_or(Dimension::Auto)
    }
}

/// `<width> [style] [color]`, e.g. `1px solid #ddd`. Returns width + colour.
fn parse_border(val: &str, font_size: f32) -> Option<(f32, Option<Color>)> {
    if val.trim() == "none" {
        return Some((0.0, None));
    }
    let mut width = None;
    let mut color = None;
    for token in val.split_whitespace() {
        if width.is_none() {
            if let Some(w) = parse_length(token, font_size) {
                width = Some(w);
                continue;
            }
        }
        if let Some(c) = Color::parse(token) {
            color = Some(c);
        }
    }
    width.map(|w| (w, color))
}

fn apply_shorthand_spacing(
    val: &str,
    font_size: f32,
    top: &mut f32,
    right: &mut f32,
    bottom: &mut f32,
    left: &mut f32,
) {
    let parts: Vec<f32> = val
        .split_whitespace()
        .filter_map(|p| parse_length(p, font_size))
        .collect();
    match parts.len() {
        1 => {
            *top = parts[0];
            *right = parts[0];
            *bottom = parts[0];
            *left = parts[0];
        }
        2 => {
            *top = parts[0];
            *bottom = parts[0];
            *right = parts[1];
            *left = parts[1];
        }
        3 => {
            *top = parts[0];
            *right = parts[1];
            *left = parts[1];
            *bottom = parts[2];
        }
        4 => {
            *top = parts[0];
            *right = parts[1];
            *bottom = parts[2];
            *left = parts[3];
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Styled DOM tree
// ---------------------------------------------------------------------------

/// A DOM node annotated with its computed style.
#[derive(Debug, Clone)]
pub enum StyledNode {
    Element {
        tag: Tag,
        style: ComputedStyle,
        children: Vec<StyledNode>,
        /// Original attributes (image src, link href).
        attrs: std::collections::HashMap<String, String>,
    },
    Text {
        text: String,
        style: ComputedStyle,
    },
}

/// Build a styled tree from a DOM tree, resolving styles top-down.
pub fn build_styled_tree(
    nodes: &[DomNode],
    parent_style: Option<&ComputedStyle>,
    sheet: &Stylesheet,
) -> Vec<StyledNode> {
    let mut result = Vec::new();
    for node in nodes {
        match node {
            DomNode::Element(e) => {
                let style = resolve_style(e, parent_style, sheet);
                if style.display == Display::None {
                    continue;
                }
                let children = build_styled_tree(&e.children, Some(&style), sheet);
                result.push(StyledNode::Element {
                    tag: e.tag.clone(),
                    style,
                    children,
                    attrs: e.attributes.clone(),
                });
            }
            DomNode::Text(text) => {
                if !text.trim().is_empty() {
                    let mut style = parent_style.cloned().unwrap_or_default();
                    // Text runs are pure content: no box-model properties.
                    style.border_top = 0.0;
                    style.border_right = 0.0;
                    style.border_bottom = 0.0;
                    style.border_left = 0.0;
                    style.background_color = Color::TRANSPARENT;
                    style.margin_top = 0.0;
                    style.margin_right = 0.0;
                    style.margin_bottom = 0.0;
                    style.margin_left = 0.0;
                    style.padding_top = 0.0;
                    style.padding_right = 0.0;
                    style.padding_bottom = 0.0;
                    style.padding_left = 0.0;
                    result.push(StyledNode::Text {
                        text: text.clone(),
                        style,
                    });
                }
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    fn styled_one(html: &str, css: &str) -> StyledNode {
        let dom = parse_html(html);
        let sheet = Stylesheet::parse(css);
        build_styled_tree(&dom, None, &sheet).remove(0)
    }

    fn style_of(node: &StyledNode) -> &ComputedStyle {
        match node {
            StyledNode::Element { style, .. } => style,
            StyledNode::Text { style, .. } => style,
        }
    }

    #[test]
    fn class_rule_beats_tag_rule() {
        let node = styled_one(
            r#"<p class="lead">x</p>"#,
            "p { font-size: 10px; } .lead { font-size: 14px; }",
        );
        assert_eq!(style_of(&node).font_size, 14.0);
    }

    #[test]
    fn later_rule_wins_at_equal_specificity() {
        let node = styled_one("<p>x</p>", "p { color: #ff0000; } p { color: #00ff00; }");
        assert!((style_of(&node).color.g - 1.0).abs() < 0.01);
    }

    #[test]
    fn inline_style_wins_over_rules() {
        let node = styled_one(
            r#"<p style="font-size: 18px">x</p>"#,
            "p { font-size: 10px; }",
        );
        assert_eq!(style_of(&node).font_size, 18.0);
    }

    #[test]
    fn imports_are_collected() {
        let sheet = Stylesheet::parse(
            "@import url('https://fonts.example/css2?family=X');\nbody { color: #000; }",
        );
        assert_eq!(sheet.imports.len(), 1);
        assert!(sheet.imports[0].starts_with("https://fonts.example"));
        assert_eq!(sheet.rules.len(), 1);
    }

    #[test]
    fn import_url_may_contain_semicolons() {
        let sheet = Stylesheet::parse(
            "@import url('https://fonts.example/css2?family=A:wght@400;700&x=1');\np { color: #000; }",
        );
        assert_eq!(sheet.imports.len(), 1);
        assert!(sheet.imports[0].ends_with("x=1"));
        assert_eq!(sheet.rules.len(), 1);
    }

    #[test]
    fn media_blocks_are_skipped() {
        let sheet = Stylesheet::parse(
            "@media print { p { color: #f00; } }\nh1 { font-weight: bold; }",
        );
        assert_eq!(sheet.rules.len(), 1);
        assert!(sheet.rules[0].selector.tag.as_deref() == Some("h1"));
    }

    #[test]
    fn border_bottom_shorthand() {
        let node = styled_one("<h2>x</h2>", "h2 { border-bottom: 1px solid #cccccc; }");
        let s = style_of(&node);
        assert_eq!(s.border_bottom, 1.0);
        assert_eq!(s.border_top, 0.0);
        assert!((s.border_color.r - 0.8).abs() < 0.01);
    }

    #[test]
    fn text_properties_inherit() {
        let node = styled_one(
            r#"<div class="intro"><p>x</p></div>"#,
            ".intro { color: #336699; font-family: 'Source Sans 3', sans-serif; }",
        );
        let StyledNode::Element { children, .. } = &node else {
            panic!("expected element");
        };
        let p = style_of(&children[0]);
        assert_eq!(p.font_family, "Source Sans 3");
        assert!((p.color.b - 0.6).abs() < 0.01);
    }

    #[test]
    fn uppercase_transform_parses() {
        let node = styled_one("<h2>x</h2>", "h2 { text-transform: uppercase; }");
        assert_eq!(style_of(&node).text_transform, TextTransform::Uppercase);
    }

    #[test]
    fn display_none_prunes_subtree() {
        let dom = parse_html("<div><span class=\"hide\">x</span><span>y</span></div>");
        let sheet = Stylesheet::parse(".hide { display: none; }");
        let styled = build_styled_tree(&dom, None, &sheet);
        let StyledNode::Element { children, .. } = &styled[0] else {
            panic!("expected element");
        };
        assert_eq!(children.len(), 1);
    }

    #[test]
    fn em_lengths_scale_with_font_size() {
        let node = styled_one("<p>x</p>", "p { font-size: 10px; margin-bottom: 1.5em; }");
        assert_eq!(style_of(&node).margin_bottom, 15.0);
    }
}
