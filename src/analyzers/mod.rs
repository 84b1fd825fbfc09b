// SPDX-License-Identifier: PMPL-1.0-or-later
//! Accessibility analyzers implementing WCAG 2.1 checks.
//!
//! Each analyzer module covers one family of related success criteria.
//! Analyzers are pure functions over the parsed document: they never look at
//! each other's output and never mutate the tree, so the fixed order below
//! only determines the order of the resulting issue list.

pub mod alt_text;
pub mod aria;
pub mod contrast;
pub mod css;
pub mod forms;
pub mod keyboard;
pub mod language;
pub mod links;
pub mod media;
pub mod semantic;

use crate::config::{self, Config};
use crate::dom::{Document, NodeData, NodeId};
use crate::issue::Issue;
use crate::stylesheet::StyleResolver;
use tracing::debug;

/// Everything a rule may read
pub struct Context<'a> {
    pub doc: &'a Document,
    pub config: &'a Config,
    pub styles: StyleResolver<'a>,
}

impl<'a> Context<'a> {
    pub fn new(doc: &'a Document, config: &'a Config) -> Self {
        Self {
            doc,
            config,
            styles: StyleResolver::new(doc),
        }
    }

    /// Page-level rules (language, landmarks, title, skip links) only make
    /// sense for complete pages, not fragments
    pub fn is_full_document(&self) -> bool {
        !self.doc.is_fragment()
    }
}

/// Trait implemented by all analyzers
pub trait Analyzer: Send + Sync {
    /// Human-readable name of this analyzer
    fn name(&self) -> &str;

    /// Short description of what this analyzer checks
    fn description(&self) -> &str;

    /// Inspect the document and return issues in document order
    fn analyze(&self, ctx: &Context<'_>) -> Vec<Issue>;
}

/// The fixed, ordered analyzer list
pub fn analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(alt_text::AltTextAnalyzer),
        Box::new(forms::FormAnalyzer),
        Box::new(semantic::SemanticAnalyzer),
        Box::new(aria::AriaAnalyzer),
        Box::new(language::LanguageAnalyzer),
        Box::new(links::LinkAnalyzer),
        Box::new(keyboard::KeyboardAnalyzer),
        Box::new(media::MediaAnalyzer),
        Box::new(contrast::ContrastAnalyzer),
        Box::new(css::CssAnalyzer),
    ]
}

/// Run every analyzer over a parsed document.
///
/// Disabled checks are dropped and `auto_fixable` is stamped from the
/// configured fixes.
pub fn analyze_document(doc: &Document, config: &Config) -> Vec<Issue> {
    let ctx = Context::new(doc, config);
    let mut issues = Vec::new();

    for analyzer in analyzers() {
        let found = analyzer.analyze(&ctx);
        debug!(analyzer = analyzer.name(), count = found.len(), "Analyzer finished");
        issues.extend(found);
    }

    issues
        .into_iter()
        .filter(|issue| config.check_enabled(issue.issue_type))
        .map(|mut issue| {
            issue.auto_fixable = config::auto_fixable(issue.issue_type, config);
            issue
        })
        .collect()
}

/// Parse and analyze HTML source
pub fn analyze_html(html: &str, config: &Config) -> Vec<Issue> {
    analyze_document(&Document::parse(html), config)
}

/// Tags that can take keyboard focus without a tabindex
const NATIVELY_FOCUSABLE: &[&str] = &["button", "select", "textarea", "iframe", "summary"];

/// Whether an element takes part in sequential keyboard navigation
pub fn is_focusable(doc: &Document, id: NodeId) -> bool {
    if doc.has_attr(id, "disabled") {
        return false;
    }
    if let Some(tabindex) = doc.attr(id, "tabindex").and_then(|v| v.trim().parse::<i32>().ok()) {
        return tabindex >= 0;
    }
    match doc.tag(id) {
        Some("a") | Some("area") => doc.has_attr(id, "href"),
        Some("input") => !doc
            .attr(id, "type")
            .map(|t| t.eq_ignore_ascii_case("hidden"))
            .unwrap_or(false),
        Some(tag) if NATIVELY_FOCUSABLE.contains(&tag) => true,
        _ => doc
            .attr(id, "contenteditable")
            .map(|v| v.is_empty() || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false),
    }
}

/// Whether an element or one of its ancestors is hidden from rendering
pub fn is_hidden(doc: &Document, id: NodeId) -> bool {
    std::iter::once(id).chain(doc.ancestors(id)).any(|node| {
        doc.has_attr(node, "hidden")
            || doc
                .attr(node, "style")
                .map(|style| {
                    crate::stylesheet::parse_declarations(style).iter().any(|d| {
                        (d.property == "display" && d.value.eq_ignore_ascii_case("none"))
                            || (d.property == "visibility" && d.value.eq_ignore_ascii_case("hidden"))
                    })
                })
                .unwrap_or(false)
    })
}

/// Whether `aria-hidden="true"` is set on the element or an ancestor
pub fn is_aria_hidden(doc: &Document, id: NodeId) -> bool {
    std::iter::once(id)
        .chain(doc.ancestors(id))
        .any(|node| doc.attr(node, "aria-hidden").map(|v| v.trim() == "true").unwrap_or(false))
}

/// Text of the elements referenced by an `aria-labelledby` list
pub fn labelledby_text(doc: &Document, id: NodeId) -> String {
    doc.attr(id, "aria-labelledby")
        .unwrap_or("")
        .split_whitespace()
        .filter_map(|target| doc.elements_with_id(target).next())
        .map(|target| collapse_whitespace(&doc.text_content(target)))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Simplified accessible name computation: `aria-label`, then
/// `aria-labelledby`, then content (text plus `alt` of images), skipping
/// `aria-hidden` subtrees. `title` is deliberately not a name source here,
/// because it is only exposed as a tooltip to most users.
pub fn accessible_name(doc: &Document, id: NodeId) -> String {
    if let Some(label) = doc.non_empty_attr(id, "aria-label") {
        let label = collapse_whitespace(label);
        if !label.is_empty() {
            return label;
        }
    }
    let labelled = labelledby_text(doc, id);
    if !labelled.is_empty() {
        return labelled;
    }
    collapse_whitespace(&name_from_content(doc, id))
}

fn name_from_content(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    let mut skip: Option<NodeId> = None;

    for node in doc.descendants(id) {
        if let Some(skipped) = skip {
            if doc.is_inside(node, skipped) {
                continue;
            }
            skip = None;
        }
        match &doc.node(node).data {
            NodeData::Text(text) => {
                out.push_str(text);
            }
            NodeData::Element(el) => {
                let hidden = el.attr("aria-hidden").map(|v| v.trim() == "true").unwrap_or(false);
                if hidden || matches!(el.name.as_str(), "script" | "style" | "template") {
                    skip = Some(node);
                    continue;
                }
                if let Some(label) = el.attr("aria-label").filter(|l| !l.trim().is_empty()) {
                    out.push(' ');
                    out.push_str(label);
                    out.push(' ');
                    skip = Some(node);
                    continue;
                }
                if el.name == "img" || (el.name == "input" && el.attr("type") == Some("image")) {
                    if let Some(alt) = el.attr("alt") {
                        out.push(' ');
                        out.push_str(alt);
                        out.push(' ');
                    }
                }
            }
            _ => {}
        }
    }
    out
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a CSS length in pixels. Supports `px`, `pt`, `em` and `rem`
/// (relative to a 16px root); other units are indeterminate.
pub fn css_px(value: &str) -> Option<f64> {
    let value = value.trim().to_ascii_lowercase();
    let (number, factor) = if let Some(n) = value.strip_suffix("px") {
        (n, 1.0)
    } else if let Some(n) = value.strip_suffix("rem") {
        (n, 16.0)
    } else if let Some(n) = value.strip_suffix("em") {
        (n, 16.0)
    } else if let Some(n) = value.strip_suffix("pt") {
        (n, 4.0 / 3.0)
    } else if value == "0" {
        ("0", 1.0)
    } else {
        return None;
    };
    number.trim().parse::<f64>().ok().map(|n| n * factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::IssueType;

    #[test]
    fn test_accessible_name_sources() {
        let doc = Document::parse(
            r#"<span id=l>Search</span>
               <a id=a href=/ aria-label="Home">x</a>
               <a id=b href=/ aria-labelledby="l missing">x</a>
               <a id=c href=/><img src=i.png alt="Logo"> <span aria-hidden=true>*</span></a>
               <a id=d href=/ title="Tooltip only"></a>"#,
        );
        let get = |id: &str| doc.elements_with_id(id).next().expect("element");
        assert_eq!(accessible_name(&doc, get("a")), "Home");
        assert_eq!(accessible_name(&doc, get("b")), "Search");
        assert_eq!(accessible_name(&doc, get("c")), "Logo");
        assert_eq!(accessible_name(&doc, get("d")), "");
    }

    #[test]
    fn test_focusable() {
        let doc = Document::parse(
            r#"<a id=a href=#x>x</a><a id=b>x</a><div id=c tabindex=0></div>
               <button id=d disabled>x</button><input id=e type=hidden><span id=f tabindex=-1></span>"#,
        );
        let get = |id: &str| doc.elements_with_id(id).next().expect("element");
        assert!(is_focusable(&doc, get("a")));
        assert!(!is_focusable(&doc, get("b")));
        assert!(is_focusable(&doc, get("c")));
        assert!(!is_focusable(&doc, get("d")));
        assert!(!is_focusable(&doc, get("e")));
        assert!(!is_focusable(&doc, get("f")));
    }

    #[test]
    fn test_css_px() {
        assert_eq!(css_px("16px"), Some(16.0));
        assert_eq!(css_px("1.5rem"), Some(24.0));
        assert_eq!(css_px("18pt"), Some(24.0));
        assert_eq!(css_px("0"), Some(0.0));
        assert_eq!(css_px("50%"), None);
    }

    #[test]
    fn test_disabled_checks_are_dropped() {
        let mut config = Config::default();
        let html = "<img src=x.png>";
        assert_eq!(analyze_html(html, &config).len(), 1);

        config.checks.insert(IssueType::MissingAlt, false);
        assert!(analyze_html(html, &config).is_empty());
    }

    #[test]
    fn test_auto_fixable_is_stamped_from_config() {
        let mut config = Config::default();
        let issues = analyze_html("<img src=x.png>", &config);
        assert!(issues[0].auto_fixable);

        config.fixes.insert(crate::issue::FixKind::MissingAlt, false);
        let issues = analyze_html("<img src=x.png>", &config);
        assert!(!issues[0].auto_fixable);
    }
}
