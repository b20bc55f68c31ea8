//! Headless document model.
//!
//! An arena of element and text nodes addressed by [`NodeId`]. It stands in for
//! the live page the exporter captures from: nodes can be created, cloned,
//! attached and removed, and every element exposes a computed style and a
//! laid-out bounding box. Cloning the whole `Document` yields an independent
//! snapshot whose `NodeId`s still address the same nodes.

pub mod style;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::rendering::layout::{self, Rect};
use crate::{Error, Result, Viewport};
pub use style::{ComputedStyle, InlineStyle, Stylesheet};

/// Handle to a node in a [`Document`]. Handles of removed nodes stay invalid
/// after their slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

/// An element: tag name, attributes (other than `style`) and inline style.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    pub tag: String,
    attrs: Vec<(String, String)>,
    pub style: InlineStyle,
}

impl ElementData {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            style: InlineStyle::default(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute. `style` replaces the inline declarations.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        if name == "style" {
            self.style = InlineStyle::parse(value);
            return;
        }
        match self.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.attrs.push((name, value.to_string())),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

/// A live, mutable document tree.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Slot>,
    free: Vec<usize>,
    root: NodeId,
    body: NodeId,
    viewport: Viewport,
    base_url: Option<Url>,
    stylesheet: Stylesheet,
}

impl Document {
    /// An empty `<html><head></head><body></body></html>` document.
    pub fn new(viewport: Viewport) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: NodeId { index: 0, generation: 0 },
            body: NodeId { index: 0, generation: 0 },
            viewport,
            base_url: None,
            stylesheet: Stylesheet::default(),
        };
        doc.root = doc.create_element("html");
        let head = doc.create_element("head");
        doc.body = doc.create_element("body");
        doc.link(doc.root, head);
        doc.link(doc.root, doc.body);
        doc
    }

    /// Build a document from HTML. `<style>` contents become the stylesheet.
    pub fn parse_html(html: &str, viewport: Viewport) -> Self {
        let parsed = Html::parse_document(html);
        let mut doc = Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: NodeId { index: 0, generation: 0 },
            body: NodeId { index: 0, generation: 0 },
            viewport,
            base_url: None,
            stylesheet: Stylesheet::default(),
        };

        let root_el = parsed.root_element();
        doc.root = doc.import_element(root_el);
        let mut stack: Vec<(ElementRef, NodeId)> = vec![(root_el, doc.root)];
        while let Some((el, id)) = stack.pop() {
            for child in el.children() {
                match child.value() {
                    scraper::Node::Text(text) => {
                        if !text.trim().is_empty() {
                            let t = doc.create_text(text);
                            doc.link(id, t);
                        }
                    }
                    scraper::Node::Element(_) => {
                        if let Some(child_el) = ElementRef::wrap(child) {
                            let child_id = doc.import_element(child_el);
                            doc.link(id, child_id);
                            stack.push((child_el, child_id));
                        }
                    }
                    _ => {}
                }
            }
        }

        doc.body = doc
            .descendants(doc.root)
            .into_iter()
            .find(|id| doc.element(*id).is_some_and(|e| e.tag == "body"))
            .unwrap_or(doc.root);

        if let Ok(style_sel) = Selector::parse("style") {
            for node in parsed.select(&style_sel) {
                let css = node.text().collect::<String>();
                if !css.trim().is_empty() {
                    doc.stylesheet.push_css(&css);
                }
            }
        }
        log::debug!(
            "parsed document: {} nodes, {} style rules",
            doc.nodes.len(),
            doc.stylesheet.len()
        );
        doc
    }

    /// Origin used to decide whether an image is cross-origin.
    pub fn with_base_url(mut self, url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| Error::InvalidInput(format!("{}: {}", url, e)))?;
        self.base_url = Some(parsed);
        Ok(self)
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn stylesheet(&self) -> &Stylesheet {
        &self.stylesheet
    }

    fn import_element(&mut self, el: ElementRef) -> NodeId {
        let mut data = ElementData::new(el.value().name());
        for (k, v) in el.value().attrs() {
            data.set_attr(k, v);
        }
        self.alloc(NodeKind::Element(data))
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let data = Some(NodeData { kind, parent: None, children: Vec::new() });
        if let Some(index) = self.free.pop() {
            let slot = &mut self.nodes[index];
            slot.data = data;
            return NodeId { index, generation: slot.generation };
        }
        self.nodes.push(Slot { generation: 0, data });
        NodeId { index: self.nodes.len() - 1, generation: 0 }
    }

    fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes
            .get(id.index)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.data.as_ref())
    }

    fn data_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes
            .get_mut(id.index)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.data.as_mut())
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        if let Some(c) = self.data_mut(child) {
            c.parent = Some(parent);
        }
        if let Some(p) = self.data_mut(parent) {
            p.children.push(child);
        }
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element(ElementData::new(tag)))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.data(id).is_some()
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if !self.contains(parent) || !self.contains(child) {
            return Err(Error::InvalidNode(format!("append {:?} to {:?}", child, parent)));
        }
        if !matches!(self.kind(parent), Some(NodeKind::Element(_))) {
            return Err(Error::InvalidNode(format!("{:?} cannot have children", parent)));
        }
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return Err(Error::InvalidNode(format!("{:?} is an ancestor of {:?}", child, parent)));
            }
            cursor = self.parent(id);
        }
        self.detach(child);
        self.link(parent, child);
        Ok(())
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.data_mut(id).and_then(|d| d.parent.take()) {
            if let Some(p) = self.data_mut(parent) {
                p.children.retain(|c| *c != id);
            }
        }
    }

    /// Detach `id` from its parent and free it together with its subtree.
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        if !self.contains(id) {
            return Err(Error::InvalidNode(format!("{:?} was already removed", id)));
        }
        if id == self.root {
            return Err(Error::InvalidNode("the document root cannot be removed".into()));
        }
        self.detach(id);
        for node in self.descendants(id) {
            let slot = &mut self.nodes[node.index];
            slot.data = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(node.index);
        }
        Ok(())
    }

    /// Copy `id` and its subtree. The copy is detached.
    pub fn deep_clone(&mut self, id: NodeId) -> Result<NodeId> {
        let kind = self
            .kind(id)
            .cloned()
            .ok_or_else(|| Error::InvalidNode(format!("cannot clone {:?}", id)))?;
        let copy = self.alloc(kind);
        let children = self.children(id).to_vec();
        for child in children {
            let child_copy = self.deep_clone(child)?;
            self.link(copy, child_copy);
        }
        Ok(copy)
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.data(id).map(|d| &d.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.kind(id) {
            Some(NodeKind::Element(e)) => Some(e),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match self.data_mut(id).map(|d| &mut d.kind) {
            Some(NodeKind::Element(e)) => Some(e),
            _ => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attr(name))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        self.element_mut(id)
            .ok_or_else(|| Error::InvalidNode(format!("{:?} is not an element", id)))?
            .set_attr(name, value);
        Ok(())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).and_then(|d| d.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.data(id).map(|d| d.children.as_slice()).unwrap_or(&[])
    }

    /// `id` and everything below it, in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Whether `id` is connected to the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(node) = cursor {
            if node == self.root {
                return true;
            }
            cursor = self.parent(node);
        }
        false
    }

    /// First connected element with the given `id` attribute.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.attr(*n, "id") == Some(id))
    }

    /// Connected elements carrying `class`.
    pub fn elements_by_class(&self, class: &str) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|n| self.element(*n).is_some_and(|e| e.has_class(class)))
            .collect()
    }

    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|n| match self.kind(n) {
                Some(NodeKind::Text(t)) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Cascaded and resolved style of an element. Text nodes report their
    /// parent's style.
    pub fn computed_style(&self, id: NodeId) -> ComputedStyle {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(node) = cursor {
            if self.element(node).is_some() {
                chain.push(node);
            }
            cursor = self.parent(node);
        }
        let mut computed: Option<ComputedStyle> = None;
        for node in chain.into_iter().rev() {
            if let Some(el) = self.element(node) {
                computed = Some(style::compute(el, &self.stylesheet, computed.as_ref()));
            }
        }
        computed.unwrap_or_default()
    }

    /// On-screen box of a connected element, after `scale()` transforms on
    /// it and its ancestors.
    pub fn bounding_box(&self, id: NodeId) -> Option<Rect> {
        if !self.is_attached(id) {
            return None;
        }
        layout::layout_document(self)
            .into_iter()
            .find(|b| b.node == id)
            .map(|b| b.screen_rect())
    }

    /// Width and height of an element's box at 1:1 scale.
    pub fn natural_size(&self, id: NodeId) -> Option<(f32, f32)> {
        if !self.is_attached(id) {
            return None;
        }
        layout::layout_document(self)
            .into_iter()
            .find(|b| b.node == id)
            .map(|b| (b.rect.width, b.rect.height))
    }
}
