// SPDX-License-Identifier: PMPL-1.0-or-later
//! Link and button purpose analyzer - WCAG 2.4.4 Link Purpose (Level A),
//! 4.1.2 Name, Role, Value (Level A)
//!
//! - Links and buttons expose an accessible name
//! - Link text is not a generic phrase such as "click here"

use crate::analyzers::{accessible_name, collapse_whitespace, is_hidden, Analyzer, Context};
use crate::dom::{Document, NodeId};
use crate::analyzers::forms::input_type;
use crate::issue::{Issue, IssueType};

/// Link texts that say nothing about the destination
const GENERIC_LINK_TEXT: &[&str] = &[
    "click here", "click", "here", "read more", "more", "learn more", "more info",
    "more information", "link", "this link", "this", "continue", "details", "go", "info",
    "see more", "view more", "find out more",
];

/// Link and button purpose analyzer
pub struct LinkAnalyzer;

impl Analyzer for LinkAnalyzer {
    fn name(&self) -> &str {
        "Link Purpose Analyzer"
    }

    fn description(&self) -> &str {
        "Checks link and button names (WCAG 2.4.4, 4.1.2)"
    }

    fn analyze(&self, ctx: &Context<'_>) -> Vec<Issue> {
        let doc = ctx.doc;
        let mut issues = Vec::new();

        check_links(doc, &mut issues);
        check_buttons(doc, &mut issues);

        issues
    }
}

/// Anchors that are links (have `href`) and are rendered
pub fn links(doc: &Document) -> impl Iterator<Item = NodeId> + '_ {
    doc.elements_by_tag("a")
        .filter(move |id| doc.has_attr(*id, "href") && !is_hidden(doc, *id))
}

/// Buttons needing a name: `<button>`, `role="button"`, and `<input type=button>`
pub fn buttons(doc: &Document) -> impl Iterator<Item = NodeId> + '_ {
    doc.elements().filter(move |id| {
        if is_hidden(doc, *id) {
            return false;
        }
        match doc.tag(*id) {
            Some("button") => true,
            Some("input") => input_type(doc, *id) == "button",
            Some("a") => false,
            _ => doc.attr(*id, "role") == Some("button"),
        }
    })
}

/// Name of a button, including `value` for input buttons
pub fn button_name(doc: &Document, id: NodeId) -> String {
    if doc.is_tag(id, "input") {
        let name = accessible_name(doc, id);
        if !name.is_empty() {
            return name;
        }
        return doc.non_empty_attr(id, "value").unwrap_or("").to_string();
    }
    accessible_name(doc, id)
}

fn is_generic(text: &str) -> bool {
    let normalized = collapse_whitespace(text)
        .to_lowercase()
        .trim_end_matches(|c: char| c.is_ascii_punctuation() || c == '\u{2026}' || c == '\u{bb}' || c == '\u{203a}')
        .trim()
        .to_string();
    GENERIC_LINK_TEXT.contains(&normalized.as_str())
}

fn check_links(doc: &Document, issues: &mut Vec<Issue>) {
    for link in links(doc) {
        let name = accessible_name(doc, link);
        if name.is_empty() {
            let has_image = doc.descendants(link).any(|d| doc.is_tag(d, "img") || doc.is_tag(d, "svg"));
            let message = if has_image {
                "Link contains only an image with no alt text, so it has no accessible name."
            } else {
                "Link has no text and no accessible name."
            };
            issues.push(Issue::new(IssueType::LinkNoAccessibleName, message).at(doc, link));
            continue;
        }

        let labelled = doc.non_empty_attr(link, "aria-label").is_some()
            || doc.non_empty_attr(link, "aria-labelledby").is_some()
            || doc.non_empty_attr(link, "title").is_some();
        if !labelled && is_generic(&name) {
            issues.push(
                Issue::new(
                    IssueType::GenericLinkText,
                    format!("Link text \"{}\" does not describe the destination.", name),
                )
                .at(doc, link)
                .with_suggestion("Use text that names the destination, e.g. \"Read more about pricing\""),
            );
        }
    }
}

fn check_buttons(doc: &Document, issues: &mut Vec<Issue>) {
    for button in buttons(doc) {
        if !button_name(doc, button).is_empty() {
            continue;
        }
        issues.push(
            Issue::new(
                IssueType::ButtonNoAccessibleName,
                "Button has no text content and no accessible name.",
            )
            .at(doc, button)
            .with_suggestion("Add visible text or aria-label describing the action"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn run(html: &str) -> Vec<Issue> {
        let doc = Document::parse(html);
        let config = Config::default();
        LinkAnalyzer.analyze(&Context::new(&doc, &config))
    }

    fn count(issues: &[Issue], t: IssueType) -> usize {
        issues.iter().filter(|i| i.issue_type == t).count()
    }

    #[test]
    fn test_named_links() {
        let html = r#"
            <a href="/pricing">Pricing plans</a>
            <a href="/"><img src="logo.png" alt="Home"></a>
            <a href="/more" aria-label="More about pricing">Read more</a>
            <a name="anchor"></a>
        "#;
        assert!(run(html).is_empty());
    }

    #[test]
    fn test_link_without_name() {
        let issues = run(r#"<a href="/"><img src="logo.png"></a><a href="/x"> </a>"#);
        assert_eq!(count(&issues, IssueType::LinkNoAccessibleName), 2);
        assert!(issues[0].message.contains("only an image"));
    }

    #[test]
    fn test_generic_link_text() {
        let issues = run(
            r#"<a href="/a">Click here</a><a href="/b">Read more...</a><a href="/c">Read more about us</a>
               <a href="/d" title="Pricing details">more</a>"#,
        );
        assert_eq!(count(&issues, IssueType::GenericLinkText), 2);
    }

    #[test]
    fn test_buttons() {
        let issues = run(
            r#"<button>Save</button>
               <button><svg aria-hidden="true"></svg></button>
               <button aria-label="Close"><span aria-hidden="true">x</span></button>
               <div role="button" tabindex="0"></div>
               <input type="button" value="Go"><input type="button">
               <button hidden></button>"#,
        );
        assert_eq!(count(&issues, IssueType::ButtonNoAccessibleName), 3);
    }
}
