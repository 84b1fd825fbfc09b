// SPDX-License-Identifier: PMPL-1.0-or-later
//! Semantic structure analyzer - WCAG 1.3.1 Info and Relationships (Level A),
//! 2.4.2 Page Titled (Level A), 2.4.6 Headings and Labels (Level AA),
//! 4.1.1 Parsing (Level A)
//!
//! - Headings are non-empty and do not skip levels
//! - A single level-1 heading
//! - A main landmark exists
//! - `id` values are unique
//! - Data tables have header cells
//! - The page has a title

use crate::analyzers::{accessible_name, Analyzer, Context};
use crate::dom::{Document, NodeId};
use crate::issue::{Issue, IssueType};
use std::collections::HashMap;

/// Semantic HTML analyzer
pub struct SemanticAnalyzer;

impl Analyzer for SemanticAnalyzer {
    fn name(&self) -> &str {
        "Semantic HTML Analyzer"
    }

    fn description(&self) -> &str {
        "Checks headings, landmarks, ids, tables and the page title (WCAG 1.3.1, 2.4.2, 2.4.6, 4.1.1)"
    }

    fn analyze(&self, ctx: &Context<'_>) -> Vec<Issue> {
        let doc = ctx.doc;
        let mut issues = Vec::new();

        check_headings(doc, &mut issues);
        if ctx.is_full_document() {
            check_main_landmark(doc, &mut issues);
            check_page_title(doc, &mut issues);
        }
        check_duplicate_ids(doc, &mut issues);
        check_tables(doc, &mut issues);

        issues
    }
}

/// Outline level of a heading: `aria-level` when valid, else the tag level.
/// `role="heading"` elements without `aria-level` are level 2.
pub fn heading_level(doc: &Document, id: NodeId) -> Option<u8> {
    let tag_level = match doc.tag(id)? {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ if doc.attr(id, "role") == Some("heading") => Some(2),
        _ => None,
    }?;

    let aria = doc
        .attr(id, "aria-level")
        .and_then(|v| v.trim().parse::<u8>().ok())
        .filter(|l| *l >= 1);
    Some(aria.unwrap_or(tag_level))
}

/// Headings in document order with their effective level
pub fn headings(doc: &Document) -> Vec<(NodeId, u8)> {
    doc.elements()
        .filter(|id| !matches!(doc.attr(*id, "role"), Some("presentation") | Some("none")))
        .filter_map(|id| heading_level(doc, id).map(|level| (id, level)))
        .collect()
}

fn check_headings(doc: &Document, issues: &mut Vec<Issue>) {
    let mut previous: Option<u8> = None;
    let mut level_one_seen = false;

    for (heading, level) in headings(doc) {
        if accessible_name(doc, heading).is_empty() {
            issues.push(
                Issue::new(IssueType::EmptyHeading, "Heading element contains no text.")
                    .at(doc, heading),
            );
        }

        if let Some(prev) = previous {
            let expected = prev.saturating_add(1);
            if level > expected {
                issues.push(
                    Issue::new(
                        IssueType::HeadingHierarchySkip,
                        format!("Heading level {} follows level {}, skipping a level.", level, prev),
                    )
                    .at(doc, heading)
                    .with_suggestion(format!("Use a level {} heading or set aria-level=\"{}\"", expected, expected)),
                );
            }
        }

        if level == 1 {
            if level_one_seen {
                issues.push(
                    Issue::new(IssueType::MultipleH1, "Page has more than one level-1 heading.")
                        .at(doc, heading),
                );
            }
            level_one_seen = true;
        }

        previous = Some(level);
    }
}

/// Whether the document has a main landmark
pub fn has_main_landmark(doc: &Document) -> bool {
    doc.elements()
        .any(|id| doc.is_tag(id, "main") || doc.attr(id, "role") == Some("main"))
}

fn check_main_landmark(doc: &Document, issues: &mut Vec<Issue>) {
    if has_main_landmark(doc) {
        return;
    }
    let issue = Issue::new(
        IssueType::MissingMainLandmark,
        "Page has no <main> element or role=\"main\" landmark.",
    );
    issues.push(match doc.body() {
        Some(body) => issue.at(doc, body),
        None => issue,
    });
}

fn check_page_title(doc: &Document, issues: &mut Vec<Issue>) {
    let titled = doc
        .elements_by_tag("title")
        .filter(|t| doc.closest_tag(*t, &["svg"]).is_none())
        .any(|t| !doc.direct_text(t).trim().is_empty());
    if !titled {
        let issue = Issue::new(IssueType::MissingPageTitle, "Page has no non-empty <title>.");
        issues.push(match doc.head() {
            Some(head) => issue.at(doc, head),
            None => issue,
        });
    }
}

fn check_duplicate_ids(doc: &Document, issues: &mut Vec<Issue>) {
    let mut seen: HashMap<&str, (NodeId, usize)> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for id in doc.elements() {
        let Some(value) = doc.non_empty_attr(id, "id") else {
            continue;
        };
        match seen.get_mut(value) {
            Some((_, count)) => *count += 1,
            None => {
                seen.insert(value, (id, 1));
                order.push(value);
            }
        }
    }

    for value in order {
        let (first, count) = seen[value];
        if count > 1 {
            issues.push(
                Issue::new(
                    IssueType::DuplicateId,
                    format!("id=\"{}\" is used by {} elements.", value, count),
                )
                .at(doc, first),
            );
        }
    }
}

fn check_tables(doc: &Document, issues: &mut Vec<Issue>) {
    for table in doc.elements_by_tag("table") {
        if matches!(doc.attr(table, "role"), Some("presentation") | Some("none")) {
            continue;
        }
        // Rows of nested tables belong to those tables
        let own = |id: &NodeId| doc.closest_tag(*id, &["table"]) == Some(table);
        let rows: Vec<NodeId> = doc
            .descendants(table)
            .filter(|id| doc.is_tag(*id, "tr") && own(id))
            .collect();
        let widest = rows
            .iter()
            .map(|row| {
                doc.element_children(*row)
                    .filter(|c| matches!(doc.tag(*c), Some("td" | "th")))
                    .count()
            })
            .max()
            .unwrap_or(0);
        // Layout tables of a single row or column are not data tables
        if rows.len() < 2 || widest < 2 {
            continue;
        }

        let has_headers = doc.descendants(table).any(|id| {
            own(&id)
                && (doc.is_tag(id, "th")
                    || matches!(doc.attr(id, "role"), Some("columnheader") | Some("rowheader"))
                    || (doc.is_tag(id, "td") && doc.has_attr(id, "headers")))
        });
        if !has_headers {
            issues.push(
                Issue::new(IssueType::TableNoHeaders, "Data table has no header cells.")
                    .at(doc, table),
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
        SemanticAnalyzer.analyze(&Context::new(&doc, &config))
    }

    fn of_type(issues: &[Issue], t: IssueType) -> Vec<&Issue> {
        issues.iter().filter(|i| i.issue_type == t).collect()
    }

    #[test]
    fn test_good_structure() {
        let html = r#"<!DOCTYPE html>
            <html lang="en"><head><title>Home</title></head>
            <body><main><h1>Title</h1><h2>Section</h2><h3>Sub</h3><h2>Other</h2></main></body></html>"#;
        let issues = run(html);
        assert!(issues.is_empty(), "{:?}", issues);
    }

    #[test]
    fn test_heading_skip_and_first_heading_exempt() {
        let issues = run("<h3>Start</h3><h4>ok</h4><h6>skip</h6><h2>back up</h2>");
        let skips = of_type(&issues, IssueType::HeadingHierarchySkip);
        assert_eq!(skips.len(), 1);
        assert!(skips[0].message.contains("level 6 follows level 4"));
    }

    #[test]
    fn test_aria_level_overrides_tag() {
        let issues = run(r#"<h1>A</h1><h4 aria-level="2">B</h4><div role="heading" aria-level="3">C</div>"#);
        assert!(of_type(&issues, IssueType::HeadingHierarchySkip).is_empty());
    }

    #[test]
    fn test_extreme_aria_level_does_not_overflow() {
        let issues = run(r#"<h1 aria-level="255">A</h1><h2>B</h2><h4>C</h4>"#);
        let skips = of_type(&issues, IssueType::HeadingHierarchySkip);
        assert_eq!(skips.len(), 1);
        assert!(skips[0].message.contains("level 4 follows level 2"));
    }

    #[test]
    fn test_empty_heading_and_multiple_h1() {
        let issues = run(r#"<h1>One</h1><h2> </h2><h1>Two</h1><h2><img src="x.png" alt="Logo"></h2>"#);
        assert_eq!(of_type(&issues, IssueType::EmptyHeading).len(), 1);
        let multiple = of_type(&issues, IssueType::MultipleH1);
        assert_eq!(multiple.len(), 1);
        assert_eq!(multiple[0].severity, crate::issue::Severity::Low);
    }

    #[test]
    fn test_missing_main_only_for_full_documents() {
        let full = run("<html><head><title>x</title></head><body><div>content</div></body></html>");
        assert_eq!(of_type(&full, IssueType::MissingMainLandmark).len(), 1);

        let role = run(r#"<html><head><title>x</title></head><body><div role="main">c</div></body></html>"#);
        assert!(of_type(&role, IssueType::MissingMainLandmark).is_empty());

        let fragment = run("<div>content</div>");
        assert!(of_type(&fragment, IssueType::MissingMainLandmark).is_empty());
    }

    #[test]
    fn test_duplicate_id_points_at_first() {
        let issues = run(r#"<p id="dup">a</p><span id="dup">b</span><p id="dup">c</p><p id="ok">d</p>"#);
        let dups = of_type(&issues, IssueType::DuplicateId);
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].element.as_ref().map(|e| e.tag.as_str()), Some("p"));
        assert!(dups[0].element.as_ref().map(|e| e.text == "a").unwrap_or(false));
    }

    #[test]
    fn test_missing_title() {
        let issues = run("<html><head></head><body><main>x</main></body></html>");
        assert_eq!(of_type(&issues, IssueType::MissingPageTitle).len(), 1);
    }

    #[test]
    fn test_tables() {
        let issues = run(
            r#"<table><tr><td>a</td><td>b</td></tr><tr><td>1</td><td>2</td></tr></table>
               <table><tr><th>h</th><th>i</th></tr><tr><td>1</td><td>2</td></tr></table>
               <table><tr><td>layout</td></tr></table>
               <table role="presentation"><tr><td>a</td><td>b</td></tr><tr><td>1</td><td>2</td></tr></table>"#,
        );
        assert_eq!(of_type(&issues, IssueType::TableNoHeaders).len(), 1);
    }
}
