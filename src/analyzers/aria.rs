// SPDX-License-Identifier: PMPL-1.0-or-later
//! ARIA validator - WCAG 4.1.2 Name, Role, Value (Level A)
//!
//! Validates correct use of ARIA attributes:
//! - Every `aria-*` attribute exists in WAI-ARIA 1.2
//! - Disclosure buttons reference the region they control
//! - aria-hidden is not set on focusable elements

use crate::analyzers::{is_focusable, Analyzer, Context};
use crate::dom::{Document, NodeId};
use crate::issue::{Issue, IssueType};
use std::collections::BTreeSet;

/// States and properties defined by WAI-ARIA 1.2
pub const VALID_ARIA_ATTRIBUTES: &[&str] = &[
    "aria-activedescendant", "aria-atomic", "aria-autocomplete", "aria-braillelabel",
    "aria-brailleroledescription", "aria-busy", "aria-checked", "aria-colcount",
    "aria-colindex", "aria-colindextext", "aria-colspan", "aria-controls", "aria-current",
    "aria-describedby", "aria-description", "aria-details", "aria-disabled", "aria-dropeffect",
    "aria-errormessage", "aria-expanded", "aria-flowto", "aria-grabbed", "aria-haspopup",
    "aria-hidden", "aria-invalid", "aria-keyshortcuts", "aria-label", "aria-labelledby",
    "aria-level", "aria-live", "aria-modal", "aria-multiline", "aria-multiselectable",
    "aria-orientation", "aria-owns", "aria-placeholder", "aria-posinset", "aria-pressed",
    "aria-readonly", "aria-relevant", "aria-required", "aria-roledescription", "aria-rowcount",
    "aria-rowindex", "aria-rowindextext", "aria-rowspan", "aria-selected", "aria-setsize",
    "aria-sort", "aria-valuemax", "aria-valuemin", "aria-valuenow", "aria-valuetext",
];

/// ARIA validator analyzer
pub struct AriaAnalyzer;

impl Analyzer for AriaAnalyzer {
    fn name(&self) -> &str {
        "ARIA Validator"
    }

    fn description(&self) -> &str {
        "Validates ARIA attributes and references (WCAG 4.1.2)"
    }

    fn analyze(&self, ctx: &Context<'_>) -> Vec<Issue> {
        let doc = ctx.doc;
        let mut issues = Vec::new();

        check_invalid_attributes(doc, &mut issues);
        check_aria_controls(doc, &mut issues);
        check_aria_hidden_focusable(doc, &mut issues);

        issues
    }
}

fn check_invalid_attributes(doc: &Document, issues: &mut Vec<Issue>) {
    for id in doc.elements() {
        let Some(el) = doc.element(id) else {
            continue;
        };
        for (name, _) in &el.attrs {
            if name.starts_with("aria-") && !VALID_ARIA_ATTRIBUTES.contains(&name.as_str()) {
                issues.push(
                    Issue::new(
                        IssueType::InvalidAria,
                        format!("\"{}\" is not a valid ARIA attribute.", name),
                    )
                    .at(doc, id)
                    .with_suggestion(format!("Remove {} or replace it with a valid ARIA attribute", name)),
                );
            }
        }
    }
}

/// Buttons, native or by role, that toggle `aria-expanded`
pub fn disclosure_buttons(doc: &Document) -> impl Iterator<Item = NodeId> + '_ {
    doc.elements().filter(move |id| {
        (doc.is_tag(*id, "button") || doc.attr(*id, "role") == Some("button"))
            && doc.has_attr(*id, "aria-expanded")
    })
}

fn check_aria_controls(doc: &Document, issues: &mut Vec<Issue>) {
    for button in disclosure_buttons(doc) {
        if doc.non_empty_attr(button, "aria-controls").is_some() {
            continue;
        }
        issues.push(
            Issue::new(
                IssueType::MissingAriaControls,
                "Button uses aria-expanded without aria-controls.",
            )
            .at(doc, button)
            .with_suggestion("Add aria-controls=\"<id of the expandable region>\""),
        );
    }
}

fn check_aria_hidden_focusable(doc: &Document, issues: &mut Vec<Issue>) {
    let mut reported = BTreeSet::new();

    for hidden in doc.elements() {
        if doc.attr(hidden, "aria-hidden").map(|v| v.trim()) != Some("true") {
            continue;
        }
        for node in std::iter::once(hidden).chain(doc.descendants(hidden)) {
            if doc.element(node).is_none() || !is_focusable(doc, node) || !reported.insert(node) {
                continue;
            }
            issues.push(
                Issue::new(
                    IssueType::AriaHiddenFocusable,
                    format!(
                        "Focusable <{}> is hidden from assistive technology by aria-hidden=\"true\".",
                        doc.tag(node).unwrap_or("element")
                    ),
                )
                .at(doc, node)
                .with_suggestion("Remove aria-hidden, or add tabindex=\"-1\" to remove it from the tab order"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn run(html: &str) -> Vec<Issue> {
        let doc = Document::parse(html);
        let config = Config::default();
        AriaAnalyzer.analyze(&Context::new(&doc, &config))
    }

    fn count(issues: &[Issue], t: IssueType) -> usize {
        issues.iter().filter(|i| i.issue_type == t).count()
    }

    #[test]
    fn test_valid_aria() {
        let html = r#"
            <button aria-expanded="false" aria-controls="menu">Menu</button>
            <ul id="menu" aria-labelledby="x" hidden><li>a</li></ul>
            <span aria-hidden="true">*</span>
        "#;
        assert!(run(html).is_empty());
    }

    #[test]
    fn test_invalid_attribute() {
        let issues = run(r#"<div aria-lable="x" aria-role="button" aria-label="ok">x</div>"#);
        assert_eq!(count(&issues, IssueType::InvalidAria), 2);
    }

    #[test]
    fn test_missing_aria_controls() {
        let issues = run(
            r#"<button aria-expanded="false">Menu</button>
               <div role="button" tabindex="0" aria-expanded="true">More</div>
               <button aria-expanded="false" aria-controls="">Empty</button>"#,
        );
        assert_eq!(count(&issues, IssueType::MissingAriaControls), 3);
    }

    #[test]
    fn test_aria_hidden_focusable() {
        let issues = run(
            r#"<div aria-hidden="true"><a href="/">x</a><a href="/" tabindex="-1">y</a></div>
               <button aria-hidden="true">z</button>"#,
        );
        assert_eq!(count(&issues, IssueType::AriaHiddenFocusable), 2);
    }
}
