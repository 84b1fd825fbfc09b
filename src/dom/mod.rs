// SPDX-License-Identifier: PMPL-1.0-or-later
//! Arena document model.
//!
//! Pages are parsed with the tolerant html5ever parser (through `scraper`)
//! and copied into a flat arena of nodes addressed by [`NodeId`]. Every node
//! carries explicit parent, first/last child and prev/next sibling indices,
//! so the tree can be walked upward (colour inheritance), sideways
//! (adjacent-sibling selectors) and mutated in place by the fixer without
//! reference cycles.

mod serialize;
mod snapshot;

pub use snapshot::ElementDetails;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use std::collections::HashMap;

/// Markers that identify a full page rather than a fragment.
static FULL_DOCUMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(?:!doctype|html|head|body)[\s>/]").expect("valid regex"));

/// Elements whose text never renders as page content
const NON_RENDERED: &[&str] = &["script", "style", "template", "noscript", "head", "title"];

/// Index of a node inside a [`Document`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Raw arena index
    pub fn index(self) -> usize {
        self.0
    }
}

/// Payload of a node
#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Doctype(String),
    Element(ElementData),
    Text(String),
    Comment(String),
}

/// Element name plus attributes in source order
#[derive(Debug, Clone)]
pub struct ElementData {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    /// Look up an attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whitespace separated class tokens
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    /// Whether the class list contains `class` as a whole token
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

/// One arena slot
#[derive(Debug, Clone)]
pub struct Node {
    pub data: NodeData,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
        }
    }
}

/// A parsed, mutable HTML document
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    fragment: bool,
    parse_errors: usize,
}

impl Document {
    /// Parse HTML source. Never fails: malformed markup is recovered by the
    /// parser and the number of recoveries is kept in [`Document::parse_errors`].
    pub fn parse(source: &str) -> Self {
        let html = Html::parse_document(source);
        let mut doc = Document {
            nodes: vec![Node::new(NodeData::Document)],
            fragment: !FULL_DOCUMENT.is_match(source),
            parse_errors: html.errors.len(),
        };

        let mut ids = HashMap::new();
        for node in html.tree.root().descendants() {
            let data = match node.value() {
                scraper::Node::Document | scraper::Node::Fragment => {
                    ids.insert(node.id(), doc.root());
                    continue;
                }
                scraper::Node::Doctype(doctype) => NodeData::Doctype(doctype.name().to_string()),
                scraper::Node::Comment(comment) => NodeData::Comment(owned(comment)),
                scraper::Node::Text(text) => NodeData::Text(owned(text)),
                scraper::Node::Element(element) => NodeData::Element(ElementData {
                    name: element.name().to_string(),
                    attrs: element
                        .attrs()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                }),
                _ => continue,
            };

            let parent = node
                .parent()
                .and_then(|p| ids.get(&p.id()).copied())
                .unwrap_or_else(|| doc.root());
            let id = doc.push(data);
            doc.append_child(parent, id);
            ids.insert(node.id(), id);
        }

        doc
    }

    /// The document node
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// True when the source had no `<html>`, `<head>`, `<body>` or doctype
    pub fn is_fragment(&self) -> bool {
        self.fragment
    }

    /// Number of parse errors the tolerant parser recovered from
    pub fn parse_errors(&self) -> usize {
        self.parse_errors
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Tag name of an element node
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.name.as_str())
    }

    pub fn is_tag(&self, id: NodeId, name: &str) -> bool {
        self.tag(id) == Some(name)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// Attribute value, trimmed, treating blank values as absent
    pub fn non_empty_attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attr(id, name).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Set an attribute. Returns `false` when the attribute already had that value.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> bool {
        let Some(el) = self.element_mut(id) else {
            return false;
        };
        match el.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) if v == value => false,
            Some((_, v)) => {
                *v = value.to_string();
                true
            }
            None => {
                el.attrs.push((name.to_string(), value.to_string()));
                true
            }
        }
    }

    /// Remove an attribute. Returns `true` if it was present.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> bool {
        let Some(el) = self.element_mut(id) else {
            return false;
        };
        let before = el.attrs.len();
        el.attrs.retain(|(k, _)| k != name);
        el.attrs.len() != before
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Parent, if it is an element
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|p| self.element(*p).is_some())
    }

    pub fn children(&self, id: NodeId) -> Siblings<'_> {
        Siblings {
            doc: self,
            next: self.nodes[id.0].first_child,
        }
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).filter(move |c| self.element(*c).is_some())
    }

    /// Ancestors from the parent upward, excluding the document node
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent_element(id),
        }
    }

    /// Pre-order descendants, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            scope: id,
            next: self.nodes[id.0].first_child,
        }
    }

    /// All elements in document order
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.descendants(self.root())
            .filter(move |id| self.element(*id).is_some())
    }

    /// Elements with the given tag in document order
    pub fn elements_by_tag<'a>(&'a self, name: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.elements().filter(move |id| self.is_tag(*id, name))
    }

    pub fn first_by_tag(&self, name: &str) -> Option<NodeId> {
        self.elements_by_tag(name).next()
    }

    pub fn html_element(&self) -> Option<NodeId> {
        self.element_children(self.root())
            .find(|id| self.is_tag(*id, "html"))
    }

    pub fn head(&self) -> Option<NodeId> {
        let html = self.html_element()?;
        self.element_children(html).find(|id| self.is_tag(*id, "head"))
    }

    pub fn body(&self) -> Option<NodeId> {
        let html = self.html_element()?;
        self.element_children(html).find(|id| self.is_tag(*id, "body"))
    }

    pub fn prev_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.nodes[id.0].prev_sibling;
        while let Some(node) = current {
            if self.element(node).is_some() {
                return Some(node);
            }
            current = self.nodes[node.0].prev_sibling;
        }
        None
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.nodes[id.0].next_sibling;
        while let Some(node) = current {
            if self.element(node).is_some() {
                return Some(node);
            }
            current = self.nodes[node.0].next_sibling;
        }
        None
    }

    /// 1-based position among element siblings
    pub fn element_index(&self, id: NodeId) -> usize {
        let mut index = 1;
        let mut current = self.prev_element_sibling(id);
        while let Some(node) = current {
            index += 1;
            current = self.prev_element_sibling(node);
        }
        index
    }

    /// Nearest ancestor with one of the given tags
    pub fn closest_tag(&self, id: NodeId, tags: &[&str]) -> Option<NodeId> {
        self.ancestors(id)
            .find(|a| self.tag(*a).map(|t| tags.contains(&t)).unwrap_or(false))
    }

    /// Rendered text of an element and its descendants
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut skip_until: Option<NodeId> = None;
        for node in self.descendants(id) {
            if let Some(skipped) = skip_until {
                if self.is_inside(node, skipped) {
                    continue;
                }
                skip_until = None;
            }
            match &self.nodes[node.0].data {
                NodeData::Text(text) => out.push_str(text),
                NodeData::Element(el) if NON_RENDERED.contains(&el.name.as_str()) => {
                    skip_until = Some(node);
                }
                _ => {}
            }
        }
        out
    }

    /// Text of the element's own text children, not of its descendants
    pub fn direct_text(&self, id: NodeId) -> String {
        self.children(id)
            .filter_map(|c| match &self.nodes[c.0].data {
                NodeData::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Whether `node` lies strictly inside `container`
    pub fn is_inside(&self, node: NodeId, container: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(p) = current {
            if p == container {
                return true;
            }
            current = self.parent(p);
        }
        false
    }

    /// Elements carrying `id="value"`, in document order
    pub fn elements_with_id<'a>(&'a self, value: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.elements()
            .filter(move |id| self.attr(*id, "id") == Some(value))
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        self.push(NodeData::Element(ElementData {
            name: name.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node::new(data));
        NodeId(self.nodes.len() - 1)
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child {
            return;
        }
        self.detach(child);
        let last = self.nodes[parent.0].last_child;
        {
            let node = &mut self.nodes[child.0];
            node.parent = Some(parent);
            node.prev_sibling = last;
            node.next_sibling = None;
        }
        match last {
            Some(l) => self.nodes[l.0].next_sibling = Some(child),
            None => self.nodes[parent.0].first_child = Some(child),
        }
        self.nodes[parent.0].last_child = Some(child);
    }

    /// Insert `child` as the first child of `parent`
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        match self.nodes[parent.0].first_child {
            Some(first) => self.insert_before(first, child),
            None => self.append_child(parent, child),
        }
    }

    /// Insert `child` immediately before `reference`
    pub fn insert_before(&mut self, reference: NodeId, child: NodeId) {
        if reference == child {
            return;
        }
        self.detach(child);
        let Some(parent) = self.nodes[reference.0].parent else {
            return;
        };
        let prev = self.nodes[reference.0].prev_sibling;
        {
            let node = &mut self.nodes[child.0];
            node.parent = Some(parent);
            node.prev_sibling = prev;
            node.next_sibling = Some(reference);
        }
        self.nodes[reference.0].prev_sibling = Some(child);
        match prev {
            Some(p) => self.nodes[p.0].next_sibling = Some(child),
            None => self.nodes[parent.0].first_child = Some(child),
        }
    }

    /// Unlink a node from its parent and siblings. The node keeps its children.
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let node = &self.nodes[id.0];
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        match prev {
            Some(p) => self.nodes[p.0].next_sibling = next,
            None => {
                if let Some(par) = parent {
                    self.nodes[par.0].first_child = next;
                }
            }
        }
        match next {
            Some(n) => self.nodes[n.0].prev_sibling = prev,
            None => {
                if let Some(par) = parent {
                    self.nodes[par.0].last_child = prev;
                }
            }
        }
        let node = &mut self.nodes[id.0];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }
}

fn owned(text: &str) -> String {
    text.to_string()
}

/// Iterator over a node's children
pub struct Siblings<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Siblings<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.nodes[current.0].next_sibling;
        Some(current)
    }
}

/// Iterator over element ancestors
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent_element(current);
        Some(current)
    }
}

/// Pre-order walk bounded to a subtree
pub struct Descendants<'a> {
    doc: &'a Document,
    scope: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        let nodes = &self.doc.nodes;

        self.next = nodes[current.0].first_child.or_else(|| {
            let mut node = current;
            loop {
                if node == self.scope {
                    return None;
                }
                if let Some(sibling) = nodes[node.0].next_sibling {
                    return Some(sibling);
                }
                node = nodes[node.0].parent?;
                if node == self.scope {
                    return None;
                }
            }
        });

        Some(current)
    }
}
