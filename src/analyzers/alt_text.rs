// SPDX-License-Identifier: PMPL-1.0-or-later
//! Image alt text analyzer - WCAG 1.1.1 Non-text Content (Level A)
//!
//! - Every `<img>` needs an `alt` attribute, or another accessible name
//! - `alt=""` is right for decorative images, but an empty alt on an image
//!   that looks like content hides that content from screen readers

use crate::analyzers::{Analyzer, Context};
use crate::dom::{Document, NodeId};
use crate::issue::{Issue, IssueType};

/// File name fragments that indicate content imagery
const CONTENT_HINTS: &[&str] = &[
    "chart", "graph", "diagram", "map", "infographic", "screenshot", "photo", "portrait",
    "logo", "figure",
];

/// File name and class fragments that indicate decoration
const DECORATIVE_HINTS: &[&str] = &[
    "spacer", "divider", "separator", "decor", "ornament", "shim", "pixel", "bg", "background",
    "border", "shadow", "bullet",
];

/// Analyzer for image alt text compliance
pub struct AltTextAnalyzer;

impl Analyzer for AltTextAnalyzer {
    fn name(&self) -> &str {
        "Alt Text Analyzer"
    }

    fn description(&self) -> &str {
        "Checks <img> elements for proper alt text (WCAG 1.1.1)"
    }

    fn analyze(&self, ctx: &Context<'_>) -> Vec<Issue> {
        let doc = ctx.doc;
        let mut issues = Vec::new();

        for img in doc.elements_by_tag("img") {
            if is_presentational(doc, img) {
                continue;
            }

            match doc.attr(img, "alt") {
                None => {
                    if doc.non_empty_attr(img, "aria-label").is_some()
                        || doc.non_empty_attr(img, "aria-labelledby").is_some()
                    {
                        continue;
                    }
                    issues.push(
                        Issue::new(
                            IssueType::MissingAlt,
                            "Image is missing alt attribute. Every <img> must have an alt attribute.",
                        )
                        .at(doc, img)
                        .with_suggestion(
                            "Add alt=\"description\" for informative images or alt=\"\" for decorative images",
                        ),
                    );
                }
                Some(alt) if alt.trim().is_empty() => {
                    if looks_like_content(doc, img) {
                        issues.push(
                            Issue::new(
                                IssueType::EmptyAlt,
                                "Image has an empty alt attribute but appears to convey content.",
                            )
                            .at(doc, img)
                            .with_suggestion("Describe what the image shows, or confirm it is decorative"),
                        );
                    }
                }
                Some(_) => {}
            }
        }

        issues
    }
}

pub fn is_presentational(doc: &Document, img: NodeId) -> bool {
    matches!(doc.attr(img, "role"), Some("presentation") | Some("none"))
        || doc.attr(img, "aria-hidden").map(|v| v.trim() == "true").unwrap_or(false)
}

/// Conservative: only a title, a figure caption or a content-like file
/// name count as evidence, and decorative hints win over all of them.
fn looks_like_content(doc: &Document, img: NodeId) -> bool {
    // Empty alt inside a link is reported as a nameless link instead
    if doc.closest_tag(img, &["a", "button"]).is_some() {
        return false;
    }

    let src = doc.attr(img, "src").unwrap_or("").to_lowercase();
    let file = src.rsplit('/').next().unwrap_or("");
    let class = doc.attr(img, "class").unwrap_or("").to_lowercase();
    if DECORATIVE_HINTS
        .iter()
        .any(|hint| file.contains(hint) || class.contains(hint))
    {
        return false;
    }

    let captioned = doc
        .closest_tag(img, &["figure"])
        .map(|figure| doc.element_children(figure).any(|c| doc.is_tag(c, "figcaption")))
        .unwrap_or(false);

    doc.non_empty_attr(img, "title").is_some()
        || captioned
        || CONTENT_HINTS.iter().any(|hint| file.contains(hint))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn run(html: &str) -> Vec<Issue> {
        let doc = Document::parse(html);
        let config = Config::default();
        AltTextAnalyzer.analyze(&Context::new(&doc, &config))
    }

    #[test]
    fn test_accessible_images() {
        let html = r#"
            <html>
            <body>
                <img src="logo.png" alt="Company logo">
                <img src="divider.png" alt="">
                <img src="chart.png" alt="Bar chart showing Q4 revenue growth of 15%">
                <img src="icon.svg" aria-label="Settings">
            </body>
            </html>
        "#;
        let issues = run(html);
        assert!(issues.is_empty(), "Expected no issues, got: {:?}", issues);
    }

    #[test]
    fn test_missing_alt() {
        let issues = run(r#"<html><body><img src="photo.jpg"></body></html>"#);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::MissingAlt);
        assert_eq!(issues[0].selector, "html > body > img:nth-child(1)");
        assert_eq!(
            issues[0].element.as_ref().map(|e| e.tag.as_str()),
            Some("img")
        );
    }

    #[test]
    fn test_presentational_images_skipped() {
        let issues = run(r#"<img src="a.png" role="presentation"><img src="b.png" aria-hidden="true">"#);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_empty_alt_on_content_image() {
        let issues = run(
            r#"<img src="/img/sales-chart.png" alt="">
               <figure><img src="x.png" alt=""><figcaption>Team</figcaption></figure>
               <img src="spacer.gif" alt="" title="spacer">
               <a href="/"><img src="photo.png" alt=""></a>"#,
        );
        let types: Vec<_> = issues.iter().map(|i| i.issue_type).collect();
        assert_eq!(types, vec![IssueType::EmptyAlt, IssueType::EmptyAlt]);
    }

    #[test]
    fn test_multiple_missing() {
        let issues = run(r#"<img src="a.png"><img src="b.png" alt="ok"><img src="d.png">"#);
        assert_eq!(issues.len(), 2);
    }
}
