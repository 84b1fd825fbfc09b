// SPDX-License-Identifier: PMPL-1.0-or-later
//! Minimal CSS reader for inline `style` attributes and `<style>` blocks.
//!
//! This is not a CSS engine. It splits rules and declarations, keeps at-rule
//! blocks aside (they are conditional, so they never take part in the
//! cascade here), and resolves one declared property for one element from
//! inline style plus matching top-level rules.

use crate::dom::{Document, NodeId};
use crate::selector::{self, Query, Specificity};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid regex"));

/// One `property: value` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Lowercased property name
    pub property: String,
    /// Value with `!important` stripped
    pub value: String,
    pub important: bool,
}

/// A top-level style rule
#[derive(Debug, Clone)]
pub struct StyleRule {
    pub selector_text: String,
    /// `None` when the selector failed to compile
    pub query: Option<Query>,
    pub declarations: Vec<Declaration>,
}

/// An `@media`, `@keyframes`, ... block kept verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtRule {
    pub prelude: String,
    pub body: String,
}

/// Rules collected from every `<style>` element of a document
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    pub rules: Vec<StyleRule>,
    pub at_rules: Vec<AtRule>,
}

/// Split a declaration block (`a: b; c: d !important`)
pub fn parse_declarations(block: &str) -> Vec<Declaration> {
    split_top_level(block, ';')
        .into_iter()
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let property = property.trim().to_lowercase();
            if property.is_empty() {
                return None;
            }
            let value = value.trim();
            let (value, important) = match value.to_ascii_lowercase().rfind("!important") {
                Some(pos) => (value[..pos].trim(), true),
                None => (value, false),
            };
            Some(Declaration {
                property,
                value: value.to_string(),
                important,
            })
        })
        .collect()
}

/// Split on `sep` outside parentheses and quotes
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

impl Stylesheet {
    /// Parse CSS source
    pub fn parse(css: &str) -> Self {
        let css = COMMENT.replace_all(css, "").into_owned();
        let mut sheet = Stylesheet::default();
        let chars: Vec<(usize, char)> = css.char_indices().collect();
        let mut prelude_start = 0;
        let mut i = 0;

        while i < chars.len() {
            let (offset, c) = chars[i];
            if c == '}' {
                // Stray closing brace from malformed input
                prelude_start = offset + 1;
                i += 1;
                continue;
            }
            if c != '{' {
                if c == ';' && css[prelude_start..offset].trim_start().starts_with('@') {
                    // Block-less at-rule such as @import
                    prelude_start = offset + 1;
                }
                i += 1;
                continue;
            }

            let prelude = css[prelude_start..offset].trim().to_string();
            let body_start = offset + 1;
            let mut depth = 1;
            let mut j = i + 1;
            while j < chars.len() && depth > 0 {
                match chars[j].1 {
                    '{' => depth += 1,
                    '}' => depth -= 1,
                    _ => {}
                }
                j += 1;
            }
            let body_end = if depth == 0 {
                chars[j - 1].0
            } else {
                css.len()
            };
            let body = &css[body_start..body_end];

            if prelude.starts_with('@') {
                sheet.at_rules.push(AtRule {
                    prelude,
                    body: body.to_string(),
                });
            } else if !prelude.is_empty() {
                let query = match selector::compile(&normalize_selector(&prelude)) {
                    Ok(q) => Some(q),
                    Err(e) => {
                        warn!(selector = %prelude, error = %e, "Skipping style rule with unsupported selector");
                        None
                    }
                };
                sheet.rules.push(StyleRule {
                    selector_text: prelude,
                    query,
                    declarations: parse_declarations(body),
                });
            }

            prelude_start = body_end + 1;
            i = j;
        }

        sheet
    }

    /// Collect the text of every `<style>` element in document order
    pub fn from_document(doc: &Document) -> Self {
        let css: String = doc
            .elements_by_tag("style")
            .map(|style| doc.direct_text(style))
            .collect::<Vec<_>>()
            .join("\n");
        Self::parse(&css)
    }

    /// Whether any at-rule prelude contains `needle` (case-insensitive)
    pub fn has_at_rule_containing(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.at_rules
            .iter()
            .any(|r| r.prelude.to_lowercase().contains(&needle))
    }

    /// Every declaration, including those nested in at-rules, with the
    /// selector text of its rule
    pub fn all_declarations(&self) -> Vec<(String, Declaration)> {
        let mut out: Vec<(String, Declaration)> = self
            .rules
            .iter()
            .flat_map(|r| {
                r.declarations
                    .iter()
                    .map(move |d| (r.selector_text.clone(), d.clone()))
            })
            .collect();
        for at_rule in &self.at_rules {
            let nested = Stylesheet::parse(&at_rule.body);
            out.extend(nested.all_declarations());
        }
        out
    }
}

/// Collapse runs of whitespace so rule preludes written across lines compile
fn normalize_selector(prelude: &str) -> String {
    prelude.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolves declared (not computed) property values for elements
pub struct StyleResolver<'a> {
    doc: &'a Document,
    sheet: Stylesheet,
}

impl<'a> StyleResolver<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            sheet: Stylesheet::from_document(doc),
        }
    }

    pub fn stylesheet(&self) -> &Stylesheet {
        &self.sheet
    }

    /// Inline declarations of an element
    pub fn inline(&self, node: NodeId) -> Vec<Declaration> {
        self.doc
            .attr(node, "style")
            .map(parse_declarations)
            .unwrap_or_default()
    }

    /// The value declared for `property` on `node` itself, honoring
    /// `!important`, specificity and source order. Inheritance is the
    /// caller's concern.
    pub fn declared(&self, node: NodeId, property: &str) -> Option<String> {
        let inline = self
            .inline(node)
            .into_iter()
            .filter(|d| d.property == property)
            .last();

        // (important, from-inline, specificity, order)
        let mut best: Option<((bool, bool, Specificity, usize), String)> = inline
            .map(|d| ((d.important, true, (0, 0, 0), usize::MAX), d.value));

        for (order, rule) in self.sheet.rules.iter().enumerate() {
            let Some(query) = &rule.query else {
                continue;
            };
            let Some(decl) = rule.declarations.iter().filter(|d| d.property == property).last() else {
                continue;
            };
            let Some(specificity) = query.specificity_for(self.doc, node) else {
                continue;
            };
            let key = (decl.important, false, specificity, order);
            let wins = match &best {
                None => true,
                Some((current, _)) => cascade_beats(key, *current),
            };
            if wins {
                best = Some((key, decl.value.clone()));
            }
        }

        best.map(|(_, value)| value)
    }
}

/// Cascade order: importance, then inline over sheet, then specificity, then order
fn cascade_beats(
    candidate: (bool, bool, Specificity, usize),
    current: (bool, bool, Specificity, usize),
) -> bool {
    if candidate.0 != current.0 {
        return candidate.0;
    }
    if candidate.1 != current.1 {
        return candidate.1;
    }
    (candidate.2, candidate.3) > (current.2, current.3)
}
