// SPDX-License-Identifier: PMPL-1.0-or-later
//! Locators and bounded element snapshots.
//!
//! Issues must outlive the document they were found in, so they carry a
//! selector string and a copy of the interesting parts of the element
//! instead of a node reference.

use super::{Document, NodeId};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MAX_HTML_CHARS: usize = 250;
const MAX_TEXT_CHARS: usize = 100;

static CSS_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?[A-Za-z_][A-Za-z0-9_-]*$").expect("valid regex"));

/// Snapshot of an element at scan time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDetails {
    /// Tag name
    pub tag: String,
    /// Outer HTML, truncated
    pub html: String,
    /// Rendered text, whitespace-collapsed and truncated
    pub text: String,
    /// Attributes at scan time
    pub attributes: BTreeMap<String, String>,
    /// Positional path such as `/html[1]/body[1]/div[2]`
    pub xpath: String,
}

impl Document {
    /// A selector that identifies `id`, anchored at the nearest ancestor
    /// carrying a document-unique id, otherwise at `html`.
    pub fn locator(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);

        while let Some(node) = current {
            let Some(el) = self.element(node) else {
                break;
            };

            if let Some(value) = el.attr("id") {
                if CSS_IDENT.is_match(value) && self.elements_with_id(value).nth(1).is_none() {
                    segments.push(format!("#{}", value));
                    break;
                }
            }

            match el.name.as_str() {
                "html" | "head" | "body" => segments.push(el.name.clone()),
                name => segments.push(format!("{}:nth-child({})", name, self.element_index(node))),
            }
            current = self.parent_element(node);
        }

        segments.reverse();
        segments.join(" > ")
    }

    /// Positional XPath of an element
    pub fn xpath(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);

        while let Some(node) = current {
            let Some(name) = self.tag(node) else {
                break;
            };
            let mut position = 1;
            let mut sibling = self.prev_element_sibling(node);
            while let Some(s) = sibling {
                if self.tag(s) == Some(name) {
                    position += 1;
                }
                sibling = self.prev_element_sibling(s);
            }
            segments.push(format!("{}[{}]", name, position));
            current = self.parent_element(node);
        }

        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    /// Bounded snapshot of an element
    pub fn snapshot(&self, id: NodeId) -> ElementDetails {
        let text = self
            .text_content(id)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        ElementDetails {
            tag: self.tag(id).unwrap_or("").to_string(),
            html: truncate(&self.outer_html(id), MAX_HTML_CHARS),
            text: truncate(&text, MAX_TEXT_CHARS),
            attributes: self
                .element(id)
                .map(|el| el.attrs.iter().cloned().collect())
                .unwrap_or_default(),
            xpath: self.xpath(id),
        }
    }
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        let mut out: String = value.chars().take(max).collect();
        out.push_str("...");
        out
    }
}
