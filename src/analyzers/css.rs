// SPDX-License-Identifier: PMPL-1.0-or-later
//! CSS analysis module - checks on page styles
//!
//! Checks:
//! - Text spacing is not locked with `!important` (WCAG 1.4.12)
//! - Animations and transitions respect prefers-reduced-motion (WCAG 2.3.3)
//! - Interactive targets are not sized below the minimum (WCAG 2.5.8)

use crate::analyzers::{css_px, is_hidden, Analyzer, Context};
use crate::analyzers::forms::input_type;
use crate::dom::{Document, NodeId};
use crate::issue::{Issue, IssueType};
use crate::stylesheet::Declaration;

/// Properties users override to adjust text spacing
const SPACING_PROPERTIES: &[&str] = &["line-height", "letter-spacing", "word-spacing"];

/// CSS accessibility analyzer
pub struct CssAnalyzer;

impl Analyzer for CssAnalyzer {
    fn name(&self) -> &str {
        "CSS Accessibility Analyzer"
    }

    fn description(&self) -> &str {
        "Checks page CSS for text spacing, motion and target size (WCAG 1.4.12, 2.3.3, 2.5.8)"
    }

    fn analyze(&self, ctx: &Context<'_>) -> Vec<Issue> {
        let mut issues = Vec::new();

        check_text_spacing(ctx, &mut issues);
        check_reduced_motion(ctx, &mut issues);
        check_target_size(ctx, &mut issues);

        issues
    }
}

fn locks_spacing(decl: &Declaration) -> bool {
    decl.important && SPACING_PROPERTIES.contains(&decl.property.as_str())
}

fn check_text_spacing(ctx: &Context<'_>, issues: &mut Vec<Issue>) {
    let doc = ctx.doc;

    for (selector, decl) in ctx.styles.stylesheet().all_declarations() {
        if !locks_spacing(&decl) {
            continue;
        }
        issues.push(
            Issue::new(
                IssueType::TextSpacingOverride,
                format!(
                    "\"{}\" sets {}: {} !important, which blocks user text-spacing adjustments.",
                    selector, decl.property, decl.value
                ),
            )
            .with_selector(selector)
            .with_suggestion(format!("Drop !important from {}", decl.property)),
        );
    }

    for id in doc.elements() {
        if let Some(decl) = ctx.styles.inline(id).iter().find(|d| locks_spacing(d)) {
            issues.push(
                Issue::new(
                    IssueType::TextSpacingOverride,
                    format!(
                        "Inline style sets {}: {} !important, which blocks user text-spacing adjustments.",
                        decl.property, decl.value
                    ),
                )
                .at(doc, id)
                .with_suggestion(format!("Drop !important from {}", decl.property)),
            );
        }
    }
}

fn animates(decl: &Declaration) -> bool {
    (decl.property.starts_with("animation") || decl.property.starts_with("transition"))
        && !matches!(decl.value.trim().to_ascii_lowercase().as_str(), "none" | "0s" | "0" | "all 0s")
}

/// Whether the page declares any animation or transition
pub fn has_motion(ctx: &Context<'_>) -> bool {
    let sheet = ctx.styles.stylesheet();
    sheet.at_rules.iter().any(|r| r.prelude.to_ascii_lowercase().starts_with("@keyframes"))
        || sheet.all_declarations().iter().any(|(_, d)| animates(d))
        || ctx.doc.elements().any(|id| ctx.styles.inline(id).iter().any(animates))
}

fn check_reduced_motion(ctx: &Context<'_>, issues: &mut Vec<Issue>) {
    if !has_motion(ctx) || ctx.styles.stylesheet().has_at_rule_containing("prefers-reduced-motion") {
        return;
    }
    issues.push(
        Issue::new(
            IssueType::MotionNoReducedPreference,
            "Page uses animations or transitions but has no prefers-reduced-motion media query.",
        )
        .with_suggestion(
            "Add @media (prefers-reduced-motion: reduce) { *, *::before, *::after { animation: none !important; transition: none !important; } }",
        ),
    );
}

/// Elements users activate with a pointer
pub fn is_interactive(doc: &Document, id: NodeId) -> bool {
    match doc.tag(id) {
        Some("a") => doc.has_attr(id, "href"),
        Some("button") | Some("select") | Some("textarea") | Some("summary") => true,
        Some("input") => input_type(doc, id) != "hidden",
        _ => matches!(
            doc.attr(id, "role"),
            Some("button") | Some("link") | Some("checkbox") | Some("radio") | Some("tab") | Some("menuitem")
        ),
    }
}

fn declared_px(ctx: &Context<'_>, id: NodeId, property: &str) -> Option<f64> {
    ctx.styles.declared(id, property).and_then(|v| css_px(&v))
}

fn check_target_size(ctx: &Context<'_>, issues: &mut Vec<Issue>) {
    let doc = ctx.doc;
    let min = ctx.config.heuristics.min_target_size_px;

    for id in doc.elements() {
        if !is_interactive(doc, id) || is_hidden(doc, id) {
            continue;
        }
        let (Some(width), Some(height)) = (declared_px(ctx, id, "width"), declared_px(ctx, id, "height")) else {
            continue;
        };
        let min_width = declared_px(ctx, id, "min-width").unwrap_or(0.0);
        let min_height = declared_px(ctx, id, "min-height").unwrap_or(0.0);
        let width = width.max(min_width);
        let height = height.max(min_height);
        if width >= min || height >= min {
            continue;
        }
        issues.push(
            Issue::new(
                IssueType::TargetSizeTooSmall,
                format!(
                    "Interactive target is {}x{}px, below the {}px minimum.",
                    width, height, min
                ),
            )
            .at(doc, id)
            .with_suggestion(format!("Make the target at least {0}x{0}px, or add padding", min)),
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
        CssAnalyzer.analyze(&Context::new(&doc, &config))
    }

    fn count(issues: &[Issue], t: IssueType) -> usize {
        issues.iter().filter(|i| i.issue_type == t).count()
    }

    #[test]
    fn test_text_spacing_important() {
        let issues = run(
            r#"<style>p { line-height: 1.2 !important } h1 { letter-spacing: 2px }</style>
               <p style="word-spacing: 0 !important">x</p>"#,
        );
        assert_eq!(count(&issues, IssueType::TextSpacingOverride), 2);
    }

    #[test]
    fn test_reduced_motion() {
        let issues = run("<style>.spin { animation: spin 1s infinite }</style>");
        assert_eq!(count(&issues, IssueType::MotionNoReducedPreference), 1);

        let respected = run(
            "<style>.spin { animation: spin 1s infinite }
             @media (prefers-reduced-motion: reduce) { .spin { animation: none } }</style>",
        );
        assert_eq!(count(&respected, IssueType::MotionNoReducedPreference), 0);

        let inline = run(r#"<div style="transition: opacity 0.3s">x</div>"#);
        assert_eq!(count(&inline, IssueType::MotionNoReducedPreference), 1);

        let still = run("<style>a { transition: none }</style>");
        assert_eq!(count(&still, IssueType::MotionNoReducedPreference), 0);
    }

    #[test]
    fn test_target_size() {
        let issues = run(
            r#"<button style="width: 16px; height: 16px">x</button>
               <a href="/" style="width: 40px; height: 20px">wide</a>
               <button style="width: 16px; height: 16px; min-width: 24px; min-height: 24px">ok</button>
               <div style="width: 10px; height: 10px">not interactive</div>
               <button>unsized</button>"#,
        );
        assert_eq!(count(&issues, IssueType::TargetSizeTooSmall), 1);
    }
}
