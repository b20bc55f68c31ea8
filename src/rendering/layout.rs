/// Block layout for the headless document.
///
/// Every displayed element becomes a block stacked below its previous sibling;
/// text is wrapped at a fixed advance of half the font size per character.
/// `scale()` transforms do not affect flow, they only map the finished
/// subtree to screen space around the element's top-left corner.

use crate::dom::style::{self, ComputedStyle};
use crate::dom::{Document, NodeId, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    fn from_style(style: &ComputedStyle, pattern: &str, percent_base: f32) -> Self {
        let side = |s: &str| style.length(&pattern.replace("{}", s), percent_base).unwrap_or(0.0);
        Self {
            top: side("top"),
            right: side("right"),
            bottom: side("bottom"),
            left: side("left"),
        }
    }

    fn borders(style: &ComputedStyle) -> Self {
        Self {
            top: style.border_width("top"),
            right: style.border_width("right"),
            bottom: style.border_width("bottom"),
            left: style.border_width("left"),
        }
    }

    fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoxModel {
    pub margin: Edges,
    pub border: Edges,
    pub padding: Edges,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoxKind {
    Block,
    Text,
    Image,
}

#[derive(Debug, Clone)]
pub struct LayoutBox {
    pub node: NodeId,
    pub kind: BoxKind,
    /// Border box at 1:1 scale.
    pub rect: Rect,
    /// Border box after transforms.
    pub screen: Rect,
    /// Accumulated (x, y) scale of this box and its ancestors.
    pub scale: (f32, f32),
    pub box_model: BoxModel,
    /// Element style; text boxes carry their parent's.
    pub style: ComputedStyle,
    pub lines: Vec<String>,
}

impl LayoutBox {
    pub fn content_width(&self) -> f32 {
        let bm = &self.box_model;
        (self.rect.width - bm.border.horizontal() - bm.padding.horizontal()).max(0.0)
    }

    pub fn screen_rect(&self) -> Rect {
        self.screen
    }
}

/// Lay out the whole document at viewport width.
pub fn layout_document(doc: &Document) -> Vec<LayoutBox> {
    layout_subtree(doc, doc.root(), doc.viewport().width as f32)
}

/// Lay out `node` at the origin with `width` pixels available.
pub fn layout_subtree(doc: &Document, node: NodeId, width: f32) -> Vec<LayoutBox> {
    let mut cx = LayoutContext { doc, boxes: Vec::new() };
    if doc.element(node).is_some() {
        let style = doc.computed_style(node);
        cx.layout_element(node, style, 0.0, 0.0, width);
    }
    cx.boxes
}

/// Wrap `text` into lines of at most `chars_per_line` characters.
pub fn wrap_text(text: &str, chars_per_line: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        if cur.chars().count() + word.chars().count() + 1 > chars_per_line && !cur.is_empty() {
            lines.push(std::mem::take(&mut cur));
            cur.push_str(word);
        } else {
            if !cur.is_empty() {
                cur.push(' ');
            }
            cur.push_str(word);
        }
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}

/// Horizontal advance of one character.
pub fn char_advance(font_size: f32) -> f32 {
    font_size * 0.5
}

struct LayoutContext<'a> {
    doc: &'a Document,
    boxes: Vec<LayoutBox>,
}

impl LayoutContext<'_> {
    /// Returns the vertical space consumed, margins included.
    fn layout_element(&mut self, node: NodeId, style: ComputedStyle, x: f32, y: f32, avail: f32) -> f32 {
        if !style.is_displayed() {
            return 0.0;
        }
        let doc = self.doc;
        let margin = Edges::from_style(&style, "margin-{}", avail);
        let padding = Edges::from_style(&style, "padding-{}", avail);
        let border = Edges::borders(&style);

        let width = match style.length("width", avail) {
            Some(w) => w + padding.horizontal() + border.horizontal(),
            None => avail - margin.horizontal(),
        }
        .max(0.0);
        let bx = x + margin.left;
        let by = y + margin.top;
        let content_x = bx + border.left + padding.left;
        let content_y = by + border.top + padding.top;
        let content_w = (width - border.horizontal() - padding.horizontal()).max(0.0);

        let is_image = doc.element(node).is_some_and(|e| e.tag == "img");
        let index = self.boxes.len();
        self.boxes.push(LayoutBox {
            node,
            kind: if is_image { BoxKind::Image } else { BoxKind::Block },
            rect: Rect::default(),
            screen: Rect::default(),
            scale: (1.0, 1.0),
            box_model: BoxModel { margin, border, padding },
            style: style.clone(),
            lines: Vec::new(),
        });

        let mut cursor = content_y;
        for &child in doc.children(node) {
            match doc.kind(child) {
                Some(NodeKind::Text(text)) => {
                    cursor += self.layout_text(child, text, &style, content_x, cursor, content_w);
                }
                Some(NodeKind::Element(el)) => {
                    let child_style = style::compute(el, doc.stylesheet(), Some(&style));
                    cursor += self.layout_element(child, child_style, content_x, cursor, content_w);
                }
                None => {}
            }
        }

        let mut content_h = match style.length("height", 0.0) {
            Some(h) => h,
            None if is_image => doc
                .attr(node, "height")
                .and_then(|h| h.parse::<f32>().ok())
                .unwrap_or(0.0),
            None => cursor - content_y,
        };
        if let Some(min) = style.length("min-height", 0.0) {
            content_h = content_h.max(min - padding.vertical() - border.vertical());
        }
        let height = content_h.max(0.0) + padding.vertical() + border.vertical();

        let rect = Rect { x: bx, y: by, width, height };
        self.boxes[index].rect = rect;
        self.boxes[index].screen = rect;

        let (sx, sy) = style::parse_scale(style.get("transform"));
        if (sx, sy) != (1.0, 1.0) {
            for b in &mut self.boxes[index..] {
                b.screen.x = bx + (b.screen.x - bx) * sx;
                b.screen.y = by + (b.screen.y - by) * sy;
                b.screen.width *= sx;
                b.screen.height *= sy;
                b.scale = (b.scale.0 * sx, b.scale.1 * sy);
            }
        }

        margin.vertical() + height
    }

    fn layout_text(&mut self, node: NodeId, text: &str, style: &ComputedStyle, x: f32, y: f32, width: f32) -> f32 {
        let advance = char_advance(style.font_size());
        let chars_per_line = if advance > 0.0 { ((width / advance) as usize).max(1) } else { 1 };
        let lines = wrap_text(text, chars_per_line);
        if lines.is_empty() {
            return 0.0;
        }
        let height = lines.len() as f32 * style.line_height();
        let rect = Rect { x, y, width, height };
        self.boxes.push(LayoutBox {
            node,
            kind: BoxKind::Text,
            rect,
            screen: rect,
            scale: (1.0, 1.0),
            box_model: BoxModel::default(),
            style: style.clone(),
            lines,
        });
        height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Viewport;

    #[test]
    fn layout_stacks_blocks_and_wraps_text() {
        let html = r#"<body><div id="r" style="width: 200px; padding: 10px"><h1>Heading</h1><p>Hello world again and again and again</p></div></body>"#;
        let doc = Document::parse_html(html, Viewport { width: 800, height: 600 });
        let r = doc.get_element_by_id("r").unwrap();
        let boxes = layout_subtree(&doc, r, 800.0);
        assert_eq!(boxes[0].node, r);
        assert_eq!(boxes[0].rect.width, 220.0);
        assert_eq!(boxes[0].content_width(), 200.0);
        let texts: Vec<_> = boxes.iter().filter(|b| b.kind == BoxKind::Text).collect();
        assert_eq!(texts.len(), 2);
        assert!(texts[1].lines.len() > 1);
        assert!(texts[1].rect.y > texts[0].rect.y);
    }

    #[test]
    fn min_height_floors_the_box() {
        let html = r#"<body><div id="r" style="min-height: 300px"></div></body>"#;
        let doc = Document::parse_html(html, Viewport::default());
        let r = doc.get_element_by_id("r").unwrap();
        assert_eq!(doc.natural_size(r), Some((1280.0, 300.0)));
    }

    #[test]
    fn scale_shrinks_screen_box_but_not_flow() {
        let html = r#"<body><div id="r" style="width: 400px; height: 1000px; transform: scale(0.5)"></div><div id="next" style="height: 10px"></div></body>"#;
        let doc = Document::parse_html(html, Viewport::default());
        let r = doc.get_element_by_id("r").unwrap();
        let next = doc.get_element_by_id("next").unwrap();
        let screen = doc.bounding_box(r).unwrap();
        assert_eq!((screen.width, screen.height), (200.0, 500.0));
        assert_eq!(doc.natural_size(r), Some((400.0, 1000.0)));
        assert_eq!(doc.bounding_box(next).unwrap().y, 1000.0);
    }

    #[test]
    fn wrap_respects_line_width() {
        let lines = wrap_text("aa bb cc dd", 5);
        assert_eq!(lines, vec!["aa bb", "cc dd"]);
    }
}
