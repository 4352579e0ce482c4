//! HTML parser – converts the rendered markup into a small DOM tree.
//!
//! Supported subset:
//! - Document: html, head, body, style, title, meta, link
//! - Structural: div, section, header, footer
//! - Text blocks: p, h1-h4, ul, ol, li
//! - Inline: span, a, em, strong, br
//! - Other: img, hr
//!
//! `<style>` content is kept verbatim as raw text so the style resolver can
//! parse it; anything else unknown is kept in the tree but dropped at the
//! styling stage.

use std::collections::HashMap;

// ---------------------------------------------------------------------------
// DOM types
// ---------------------------------------------------------------------------

/// The tag name of a supported element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Html,
    Head,
    Body,
    Style,
    Title,
    Meta,
    Link,
    Div,
    Section,
    Header,
    Footer,
    P,
    H1,
    H2,
    H3,
    H4,
    Ul,
    Ol,
    Li,
    Span,
    A,
    Em,
    Strong,
    Br,
    Img,
    Hr,
    /// Unrecognised tags are kept so the tree stays navigable.
    Unknown(String),
}

impl Tag {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "html" => Tag::Html,
            "head" => Tag::Head,
            "body" => Tag::Body,
            "style" => Tag::Style,
            "title" => Tag::Title,
            "meta" => Tag::Meta,
            "link" => Tag::Link,
            "div" => Tag::Div,
            "section" => Tag::Section,
            "header" => Tag::Header,
            "footer" => Tag::Footer,
            "p" => Tag::P,
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" => Tag::H3,
            "h4" => Tag::H4,
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "span" => Tag::Span,
            "a" => Tag::A,
            "em" | "i" => Tag::Em,
            "strong" | "b" => Tag::Strong,
            "br" => Tag::Br,
            "img" => Tag::Img,
            "hr" => Tag::Hr,
            _ => Tag::Unknown(s.to_string()),
        }
    }

    /// The canonical name used by stylesheet selectors.
    pub fn selector_name(&self) -> &str {
        match self {
            Tag::Html => "html",
            Tag::Head => "head",
            Tag::Body => "body",
            Tag::Style => "style",
            Tag::Title => "title",
            Tag::Meta => "meta",
            Tag::Link => "link",
            Tag::Div => "div",
            Tag::Section => "section",
            Tag::Header => "header",
            Tag::Footer => "footer",
            Tag::P => "p",
            Tag::H1 => "h1",
            Tag::H2 => "h2",
            Tag::H3 => "h3",
            Tag::H4 => "h4",
            Tag::Ul => "ul",
            Tag::Ol => "ol",
            Tag::Li => "li",
            Tag::Span => "span",
            Tag::A => "a",
            Tag::Em => "em",
            Tag::Strong => "strong",
            Tag::Br => "br",
            Tag::Img => "img",
            Tag::Hr => "hr",
            Tag::Unknown(name) => name.as_str(),
        }
    }

    /// Void elements never carry children.
    pub fn is_void(&self) -> bool {
        matches!(self, Tag::Br | Tag::Img | Tag::Hr | Tag::Meta | Tag::Link)
    }

    /// Raw-text elements swallow their content verbatim until the close tag.
    pub fn is_raw_text(&self) -> bool {
        matches!(self, Tag::Style)
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Tag::Span | Tag::A | Tag::Em | Tag::Strong | Tag::Br)
    }
}

/// A node in the DOM tree.
#[derive(Debug, Clone)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

/// An element node carrying tag, attributes, and children.
#[derive(Debug, Clone)]
pub struct ElementNode {
    pub tag: Tag,
    pub attributes: HashMap<String, String>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn inline_style(&self) -> Option<&str> {
        self.attributes.get("style").map(|s| s.as_str())
    }

    pub fn src(&self) -> Option<&str> {
        self.attributes.get("src").map(|s| s.as_str())
    }

    /// Concatenated raw text of this element's direct text children.
    fn raw_text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                DomNode::Text(t) => Some(t.as_str()),
                DomNode::Element(_) => None,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Parser – recursive descent over the controlled subset
// ---------------------------------------------------------------------------

/// Parse an HTML string into a list of DOM nodes.
///
/// Hand-written recursive descent over the controlled subset the templates
/// produce; a full HTML5 parser would be overkill for this input.
pub fn parse_html(html: &str) -> Vec<DomNode> {
    let mut parser = Parser::new(html);
    parser.parse_nodes()
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse_nodes(&mut self) -> Vec<DomNode> {
        let mut nodes = Vec::new();
        loop {
            self.skip_inter_element_whitespace();
            if self.eof() || self.starts_with("</") {
                break;
            }
            if let Some(node) = self.parse_node() {
                nodes.push(node);
            }
        }
        nodes
    }

    fn parse_node(&mut self) -> Option<DomNode> {
        if self.starts_with("<!--") {
            self.skip_comment();
            return None;
        }
        if self.starts_with("<!") || self.starts_with("<?") {
            // doctype / processing instructions
            while !self.eof() && !self.starts_with(">") {
                self.advance(1);
            }
            if !self.eof() {
                self.advance(1);
            }
            return None;
        }
        if self.starts_with("<") {
            Some(self.parse_element())
        } else {
            Some(self.parse_text())
        }
    }

    fn parse_text(&mut self) -> DomNode {
        let start = self.pos;
        while !self.eof() && !self.starts_with("<") {
            self.advance(1);
        }
        DomNode::Text(decode_entities(&self.input[start..self.pos]))
    }

    fn parse_element(&mut self) -> DomNode {
        self.advance(1); // consume '<'
        let tag_name = self.parse_name();
        let tag = Tag::parse(&tag_name);
        let mut elem = ElementNode::new(tag.clone());

        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let (key, value) = self.parse_attribute();
            elem.attributes.insert(key, value);
        }

        if self.starts_with("/>") {
            self.advance(2);
            return DomNode::Element(elem);
        }
        if self.starts_with(">") {
            self.advance(1);
        }
        if tag.is_void() {
            return DomNode::Element(elem);
        }

        if tag.is_raw_text() {
            elem.children.push(DomNode::Text(self.take_raw_until(&tag_name)));
            return DomNode::Element(elem);
        }

        elem.children = self.parse_nodes();

        // Consume the closing tag.
        if self.starts_with("</") {
            self.advance(2);
            self.parse_name();
            self.skip_whitespace();
            if self.starts_with(">") {
                self.advance(1);
            }
        }

        DomNode::Element(elem)
    }

    /// Consume verbatim content (no entity decoding) up to `</name>`.
    fn take_raw_until(&mut self, name: &str) -> String {
        let close = format!("</{}", name.to_ascii_lowercase());
        let rest = &self.input[self.pos..];
        let end = rest.to_ascii_lowercase().find(&close).unwrap_or(rest.len());
        let content = rest[..end].to_string();
        self.pos += end;
        if self.starts_with("</") {
            self.advance(2);
            self.parse_name();
            self.skip_whitespace();
            if self.starts_with(">") {
                self.advance(1);
            }
        }
        content
    }

    fn parse_name(&mut self) -> String {
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '-' || c == '_' {
                self.advance(1);
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn parse_attribute(&mut self) -> (String, String) {
        let key = self.parse_name();
        self.skip_whitespace();
        if !self.starts_with("=") {
            return (key, String::new());
        }
        self.advance(1);
        self.skip_whitespace();
        (key, self.parse_attr_value())
    }

    fn parse_attr_value(&mut self) -> String {
        for quote in ['"', '\''] {
            if self.current_char_is(quote) {
                self.advance(1);
                let start = self.pos;
                while !self.eof() && !self.current_char_is(quote) {
                    self.advance(1);
                }
                let val = self.input[start..self.pos].to_string();
                if !self.eof() {
                    self.advance(1);
                }
                return decode_entities(&val);
            }
        }
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_whitespace() || c == '>' || c == '/' {
                break;
            }
            self.advance(1);
        }
        self.input[start..self.pos].to_string()
    }

    fn skip_whitespace(&mut self) {
        while !self.eof() && self.current_char().is_whitespace() {
            self.advance(1);
        }
    }

    /// Skip runs of whitespace that sit purely between elements.
    fn skip_inter_element_whitespace(&mut self) {
        let saved = self.pos;
        while !self.eof() && self.current_char().is_whitespace() {
            self.advance(1);
        }
        if !self.eof() && !self.starts_with("<") {
            self.pos = saved;
        }
    }

    fn skip_comment(&mut self) {
        self.advance(4); // <!--
        while !self.eof() && !self.starts_with("-->") {
            self.advance(1);
        }
        if !self.eof() {
            self.advance(3);
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input[self.pos..].chars().next().unwrap()
    }

    fn current_char_is(&self, c: char) -> bool {
        !self.eof() && self.current_char() == c
    }

    fn advance(&mut self, n: usize) {
        for _ in 0..n {
            if let Some(c) = self.input[self.pos..].chars().next() {
                self.pos += c.len_utf8();
            }
        }
    }
}

fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", "\u{00A0}")
        .replace("&bull;", "\u{2022}")
        .replace("&middot;", "\u{00B7}")
        .replace("&ndash;", "\u{2013}")
        .replace("&mdash;", "\u{2014}")
}

// ---------------------------------------------------------------------------
// Document split
// ---------------------------------------------------------------------------

/// The renderable body nodes plus all embedded stylesheet text.
#[derive(Debug, Clone, Default)]
pub struct DocumentParts {
    pub body: Vec<DomNode>,
    pub css: String,
}

/// Split a parsed document into body content and embedded CSS.
///
/// `<style>` elements are collected wherever they appear (head or body);
/// if there is no `<body>`, all top-level non-head content is the body.
pub fn document_parts(nodes: &[DomNode]) -> DocumentParts {
    let mut parts = DocumentParts::default();
    collect_css(nodes, &mut parts.css);
    parts.body = find_body(nodes).unwrap_or_else(|| {
        nodes
            .iter()
            .filter(|n| match n {
                DomNode::Element(e) => !matches!(e.tag, Tag::Head | Tag::Style),
                DomNode::Text(_) => true,
            })
            .cloned()
            .collect()
    });
    parts
}

fn collect_css(nodes: &[DomNode], css: &mut String) {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Style {
                css.push_str(&e.raw_text());
                css.push('\n');
            }
            collect_css(&e.children, css);
        }
    }
}

fn find_body(nodes: &[DomNode]) -> Option<Vec<DomNode>> {
    for node in nodes {
        if let DomNode::Element(e) = node {
            match e.tag {
                Tag::Body => {
                    // Strip any <style> elements nested in the body.
                    return Some(
                        e.children
                            .iter()
                            .filter(|c| {
                                !matches!(c, DomNode::Element(el) if el.tag == Tag::Style)
                            })
                            .cloned()
                            .collect(),
                    );
                }
                Tag::Html => {
                    if let Some(found) = find_body(&e.children) {
                        return Some(found);
                    }
                }
                _ => {}
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_section_with_heading() {
        let html = r#"<section class="work"><h2>Experience</h2></section>"#;
        let nodes = parse_html(html);
        assert_eq!(nodes.len(), 1);
        let DomNode::Element(e) = &nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(e.tag, Tag::Section);
        assert_eq!(e.classes(), vec!["work"]);
        assert_eq!(e.children.len(), 1);
    }

    #[test]
    fn parse_void_elements() {
        let nodes = parse_html(r#"<p>Line one<br>Line two</p><hr>"#);
        assert_eq!(nodes.len(), 2);
        let DomNode::Element(p) = &nodes[0] else {
            panic!("expected <p>");
        };
        assert_eq!(p.children.len(), 3);
        assert!(
            matches!(&p.children[1], DomNode::Element(e) if e.tag == Tag::Br),
            "middle child should be <br>"
        );
    }

    #[test]
    fn style_content_is_raw() {
        let html = "<style>p > a { color: #333; }</style>";
        let parts = document_parts(&parse_html(html));
        assert!(parts.css.contains("p > a { color: #333; }"));
    }

    #[test]
    fn full_document_splits_body_and_css() {
        let html = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><style>body { color: #222; }</style></head>
<body><h1>Jane Doe</h1><p>Engineer &amp; writer</p></body>
</html>"#;
        let parts = document_parts(&parse_html(html));
        assert!(parts.css.contains("color: #222"));
        assert_eq!(parts.body.len(), 2);
        let DomNode::Element(p) = &parts.body[1] else {
            panic!("expected <p>");
        };
        assert!(
            matches!(&p.children[0], DomNode::Text(t) if t == "Engineer & writer"),
            "entities should decode"
        );
    }

    #[test]
    fn em_and_strong_aliases() {
        let nodes = parse_html("<p><b>bold</b> and <i>italic</i></p>");
        let DomNode::Element(p) = &nodes[0] else {
            panic!("expected <p>");
        };
        assert!(matches!(&p.children[0], DomNode::Element(e) if e.tag == Tag::Strong));
        assert!(matches!(&p.children[2], DomNode::Element(e) if e.tag == Tag::Em));
    }

    #[test]
    fn img_attributes() {
        let nodes = parse_html(r#"<img src="photo.jpg" class="portrait" />"#);
        let DomNode::Element(img) = &nodes[0] else {
            panic!("expected <img>");
        };
        assert_eq!(img.tag, Tag::Img);
        assert_eq!(img.src(), Some("photo.jpg"));
    }
}
