// SPDX-License-Identifier: PMPL-1.0-or-later
//! HTML serialization for the arena document.
//!
//! Output follows the HTML fragment serialization algorithm closely enough
//! that re-parsing serialized output yields the same tree, which is what
//! makes fixer output stable across repeated runs.

use super::{Document, NodeData, NodeId};

/// Elements with no end tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta",
    "param", "source", "track", "wbr",
];

/// Elements whose text children are emitted without escaping
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript",
];

enum Step {
    Open(NodeId),
    Close(NodeId),
}

impl Document {
    /// Serialize the document. Fragments serialize as fragments.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        if self.is_fragment() {
            for container in [self.head(), self.body()].into_iter().flatten() {
                for child in self.children(container) {
                    self.write_node(child, &mut out);
                }
            }
        } else {
            for child in self.children(self.root()) {
                self.write_node(child, &mut out);
            }
        }
        out
    }

    /// Serialize one node including its own tags
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let mut stack = vec![Step::Open(id)];

        while let Some(step) = stack.pop() {
            match step {
                Step::Open(node) => match &self.node(node).data {
                    NodeData::Document => {
                        let children: Vec<_> = self.children(node).collect();
                        stack.extend(children.into_iter().rev().map(Step::Open));
                    }
                    NodeData::Doctype(name) => {
                        out.push_str("<!DOCTYPE ");
                        out.push_str(name);
                        out.push('>');
                    }
                    NodeData::Comment(text) => {
                        out.push_str("<!--");
                        out.push_str(text);
                        out.push_str("-->");
                    }
                    NodeData::Text(text) => {
                        let raw = self
                            .parent_element(node)
                            .and_then(|p| self.tag(p))
                            .map(|t| RAW_TEXT_ELEMENTS.contains(&t))
                            .unwrap_or(false);
                        if raw {
                            out.push_str(text);
                        } else {
                            escape_text(text, out);
                        }
                    }
                    NodeData::Element(el) => {
                        out.push('<');
                        out.push_str(&el.name);
                        for (name, value) in &el.attrs {
                            out.push(' ');
                            out.push_str(name);
                            out.push_str("=\"");
                            escape_attr(value, out);
                            out.push('"');
                        }
                        out.push('>');

                        if VOID_ELEMENTS.contains(&el.name.as_str()) {
                            continue;
                        }

                        // The parser drops one leading newline in these elements
                        if matches!(el.name.as_str(), "pre" | "textarea" | "listing") {
                            let leading_newline = self
                                .children(node)
                                .next()
                                .map(|first| matches!(&self.node(first).data, NodeData::Text(t) if t.starts_with('\n')))
                                .unwrap_or(false);
                            if leading_newline {
                                out.push('\n');
                            }
                        }

                        stack.push(Step::Close(node));
                        let children: Vec<_> = self.children(node).collect();
                        stack.extend(children.into_iter().rev().map(Step::Open));
                    }
                },
                Step::Close(node) => {
                    if let Some(name) = self.tag(node) {
                        out.push_str("</");
                        out.push_str(name);
                        out.push('>');
                    }
                }
            }
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_round_trip() {
        let doc = Document::parse("<img src=x>");
        assert_eq!(doc.to_html(), "<img src=\"x\">");
    }

    #[test]
    fn test_full_document_round_trip_is_stable() {
        let source = "<!DOCTYPE html><html lang=en><head><title>A &amp; B</title></head>\
                      <body><p class=\"x\">1 &lt; 2</p><script>if (a < b) {}</script></body></html>";
        let once = Document::parse(source).to_html();
        let twice = Document::parse(&once).to_html();
        assert_eq!(once, twice);
        assert!(once.contains("if (a < b) {}"));
        assert!(once.contains("1 &lt; 2"));
    }

    #[test]
    fn test_pre_leading_newline_preserved() {
        let source = "<pre>\n\nindented</pre>";
        let once = Document::parse(source).to_html();
        let twice = Document::parse(&once).to_html();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_attributes_keep_source_order() {
        let source = r#"<input type="email" name="email" id="e" class="field wide" placeholder="you@example.com" data-x="1" required="">"#;
        let mut html = source.to_string();
        for _ in 0..5 {
            html = Document::parse(&html).to_html();
            assert_eq!(html, source);
        }

        let mut doc = Document::parse("<img src=x>");
        let img = doc.first_by_tag("img").expect("img");
        doc.set_attr(img, "alt", "");
        doc.set_attr(img, "data-a11y-fixed", "missing_alt");
        let first = doc.to_html();
        assert_eq!(first, r#"<img src="x" alt="" data-a11y-fixed="missing_alt">"#);
        assert_eq!(Document::parse(&first).to_html(), first);
    }

    #[test]
    fn test_attribute_quotes_escaped() {
        let mut doc = Document::parse("<p>x</p>");
        let p = doc.first_by_tag("p").expect("p");
        doc.set_attr(p, "title", "say \"hi\"");
        assert_eq!(doc.outer_html(p), "<p title=\"say &quot;hi&quot;\">x</p>");
    }
}
