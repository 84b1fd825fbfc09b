// SPDX-License-Identifier: PMPL-1.0-or-later
//! Keyboard navigation analyzer - WCAG 2.1.1 Keyboard (Level A),
//! 2.1.2 No Keyboard Trap (Level A), 2.4.1 Bypass Blocks (Level A),
//! 2.4.3 Focus Order (Level A), 2.4.7 Focus Visible (Level AA)
//!
//! Checks for keyboard accessibility:
//! - Click handlers on non-interactive elements are reachable by keyboard
//! - No positive tabindex values (disrupts natural tab order)
//! - Focus indicators are not suppressed with `outline: none`
//! - Pages with navigation, or a run of focusable elements ahead of the main
//!   content, offer a skip link
//! - Modal-looking containers have a way out

use crate::analyzers::{accessible_name, is_focusable, Analyzer, Context};
use crate::dom::{Document, NodeId};
use crate::issue::{Issue, IssueType};
use crate::stylesheet::{Declaration, StyleRule, Stylesheet};
use std::collections::BTreeSet;

/// Elements that carry no keyboard behavior of their own
const NON_INTERACTIVE: &[&str] = &["div", "span", "p", "li", "td", "img", "section", "article"];

/// Class or id fragments that suggest a modal container
const MODAL_HINTS: &[&str] = &["modal", "dialog", "popup", "lightbox", "overlay"];

/// Words that mark a close control
const CLOSE_HINTS: &[&str] = &["close", "dismiss", "cancel", "\u{d7}", "\u{2715}", "\u{2716}"];

/// Fragment targets conventionally used by skip links
const SKIP_TARGETS: &[&str] = &["#main", "#content", "#main-content", "#maincontent"];

/// Tab stops ahead of the main landmark that form a block worth bypassing
pub const BYPASS_MIN_FOCUSABLE: usize = 3;

/// Keyboard navigation analyzer
pub struct KeyboardAnalyzer;

impl Analyzer for KeyboardAnalyzer {
    fn name(&self) -> &str {
        "Keyboard Navigation Analyzer"
    }

    fn description(&self) -> &str {
        "Checks keyboard accessibility (WCAG 2.1.1, 2.1.2, 2.4.1, 2.4.3, 2.4.7)"
    }

    fn analyze(&self, ctx: &Context<'_>) -> Vec<Issue> {
        let doc = ctx.doc;
        let mut issues = Vec::new();

        check_click_handlers(doc, &mut issues);
        check_positive_tabindex(doc, &mut issues);
        if ctx.is_full_document() {
            check_skip_link(doc, &mut issues);
        }
        check_focus_styles(ctx, &mut issues);
        check_keyboard_traps(ctx, &mut issues);

        issues
    }
}

/// Non-interactive elements with a click handler and no way to reach them
/// from the keyboard
pub fn click_only_elements(doc: &Document) -> impl Iterator<Item = NodeId> + '_ {
    doc.elements().filter(move |id| {
        let Some(tag) = doc.tag(*id) else {
            return false;
        };
        if !NON_INTERACTIVE.contains(&tag) || !doc.has_attr(*id, "onclick") {
            return false;
        }
        let has_key_handler = ["onkeydown", "onkeyup", "onkeypress"]
            .iter()
            .any(|h| doc.has_attr(*id, h));
        let has_role = doc.non_empty_attr(*id, "role").is_some();
        let has_tabindex = doc.has_attr(*id, "tabindex");
        !has_key_handler && !(has_role && has_tabindex)
    })
}

fn check_click_handlers(doc: &Document, issues: &mut Vec<Issue>) {
    for id in click_only_elements(doc) {
        let tag = doc.tag(id).unwrap_or("element");
        issues.push(
            Issue::new(
                IssueType::KeyboardInaccessible,
                format!(
                    "<{}> has an onclick handler but cannot be focused or activated from the keyboard.",
                    tag
                ),
            )
            .at(doc, id)
            .with_suggestion(format!(
                "Use a <button> instead of <{}>, or add role=\"button\" tabindex=\"0\" and a key handler",
                tag
            )),
        );
    }
}

/// Parsed positive tabindex of an element
pub fn positive_tabindex(doc: &Document, id: NodeId) -> Option<i32> {
    doc.attr(id, "tabindex")
        .and_then(|v| v.trim().parse::<i32>().ok())
        .filter(|v| *v > 0)
}

fn check_positive_tabindex(doc: &Document, issues: &mut Vec<Issue>) {
    for id in doc.elements() {
        let Some(value) = positive_tabindex(doc, id) else {
            continue;
        };
        issues.push(
            Issue::new(
                IssueType::PositiveTabindex,
                format!(
                    "Element <{}> has tabindex=\"{}\". Positive tabindex disrupts natural tab order.",
                    doc.tag(id).unwrap_or("element"),
                    value
                ),
            )
            .at(doc, id)
            .with_suggestion("Use tabindex=\"0\" to follow the natural document order"),
        );
    }
}

/// Whether an in-page link is a skip link
pub fn is_skip_link(doc: &Document, link: NodeId) -> bool {
    let Some(href) = doc.attr(link, "href").map(str::trim) else {
        return false;
    };
    if !href.starts_with('#') || href.len() < 2 {
        return false;
    }
    let text = format!(
        "{} {}",
        accessible_name(doc, link),
        doc.attr(link, "title").unwrap_or("")
    )
    .to_lowercase();
    if text.contains("skip") || SKIP_TARGETS.contains(&href.to_lowercase().as_str()) {
        return true;
    }
    // Links straight to the main landmark count too
    doc.elements_with_id(&href[1..])
        .any(|target| doc.is_tag(target, "main") || doc.attr(target, "role") == Some("main"))
}

/// Whether the page has navigation worth bypassing
pub fn has_navigation(doc: &Document) -> bool {
    doc.elements()
        .any(|id| doc.is_tag(id, "nav") || doc.attr(id, "role") == Some("navigation"))
}

/// The first `<main>` or `role="main"` element
pub fn main_landmark(doc: &Document) -> Option<NodeId> {
    doc.elements()
        .find(|id| doc.is_tag(*id, "main") || doc.attr(*id, "role") == Some("main"))
}

/// Tab stops that precede the main landmark, skip links excluded.
/// Zero when the page has no main landmark.
pub fn focusable_before_main(doc: &Document) -> usize {
    let Some(main) = main_landmark(doc) else {
        return 0;
    };
    doc.elements()
        .take_while(|id| *id != main)
        .filter(|id| is_focusable(doc, *id) && !is_skip_link(doc, *id))
        .count()
}

/// Whether keyboard users meet a repeated block before the content:
/// navigation, or at least [`BYPASS_MIN_FOCUSABLE`] tab stops ahead of
/// the main landmark. A page with neither has nothing to bypass.
pub fn needs_skip_link(doc: &Document) -> bool {
    has_navigation(doc) || focusable_before_main(doc) >= BYPASS_MIN_FOCUSABLE
}

fn check_skip_link(doc: &Document, issues: &mut Vec<Issue>) {
    if !needs_skip_link(doc) {
        return;
    }
    let has_skip = doc.elements_by_tag("a").any(|a| is_skip_link(doc, a));
    if has_skip {
        return;
    }
    let message = if has_navigation(doc) {
        "Page has navigation but no skip link. Keyboard users must tab through every navigation item.".to_string()
    } else {
        format!(
            "Page has {} focusable elements before the main content but no skip link.",
            focusable_before_main(doc)
        )
    };
    let issue = Issue::new(IssueType::MissingSkipLinks, message)
    .with_suggestion("Add <a href=\"#main\" class=\"skip-link\">Skip to main content</a> as the first child of <body>");
    issues.push(match doc.body() {
        Some(body) => issue.at(doc, body),
        None => issue,
    });
}

/// Every style rule, including those nested in at-rules
fn every_rule(sheet: &Stylesheet) -> Vec<StyleRule> {
    let mut rules = sheet.rules.clone();
    for at_rule in &sheet.at_rules {
        rules.extend(every_rule(&Stylesheet::parse(&at_rule.body)));
    }
    rules
}

fn removes_outline(decl: &Declaration) -> bool {
    let value = decl.value.trim().to_ascii_lowercase();
    match decl.property.as_str() {
        "outline" => value == "none" || value == "0" || value.starts_with("none ") || value.starts_with("0 "),
        "outline-style" => value == "none",
        "outline-width" => value == "0" || value == "0px",
        _ => false,
    }
}

fn has_alternative_indicator(decls: &[Declaration]) -> bool {
    decls.iter().any(|d| {
        (d.property == "box-shadow" && !d.value.trim().eq_ignore_ascii_case("none"))
            || d.property.starts_with("border")
            || d.property.starts_with("background")
            || d.property == "text-decoration"
    })
}

/// Whether a `:focus-visible` rule puts a visible outline back
fn focus_visible_restored(rules: &[StyleRule]) -> bool {
    rules.iter().any(|rule| {
        rule.selector_text.contains(":focus-visible")
            && rule
                .declarations
                .iter()
                .any(|d| d.property.starts_with("outline") && !removes_outline(d))
    })
}

fn check_focus_styles(ctx: &Context<'_>, issues: &mut Vec<Issue>) {
    let doc = ctx.doc;
    let rules = every_rule(ctx.styles.stylesheet());
    if focus_visible_restored(&rules) {
        return;
    }

    for rule in &rules {
        if !rule.selector_text.contains(":focus") {
            continue;
        }
        if rule.declarations.iter().any(removes_outline) && !has_alternative_indicator(&rule.declarations) {
            issues.push(
                Issue::new(
                    IssueType::FocusIndicatorsRemoved,
                    format!(
                        "CSS rule \"{}\" removes the focus outline without a visible replacement.",
                        rule.selector_text
                    ),
                )
                .with_selector(rule.selector_text.clone())
                .with_suggestion("Use a visible focus style, e.g. outline: 2px solid #005fcc, or a box-shadow"),
            );
        }
    }

    for id in doc.elements() {
        if !is_focusable(doc, id) {
            continue;
        }
        let inline = ctx.styles.inline(id);
        if inline.iter().any(removes_outline) && !has_alternative_indicator(&inline) {
            issues.push(
                Issue::new(
                    IssueType::FocusIndicatorsRemoved,
                    "Inline style suppresses the focus indicator with outline: none.",
                )
                .at(doc, id)
                .with_suggestion("Remove outline: none from the inline style"),
            );
        }
    }
}

fn token_hint(value: &str, hints: &[&str]) -> bool {
    let value = value.to_lowercase();
    hints.iter().any(|h| value.contains(h))
}

/// Heuristic confidence that an element is a modal container
pub fn modal_confidence(ctx: &Context<'_>, id: NodeId) -> u32 {
    let doc = ctx.doc;
    let mut score = 0;
    if matches!(doc.attr(id, "role"), Some("dialog") | Some("alertdialog")) {
        score += 2;
    }
    if doc.attr(id, "aria-modal").map(|v| v.trim() == "true").unwrap_or(false) {
        score += 2;
    }
    let hinted = doc
        .element(id)
        .map(|el| el.classes().any(|c| token_hint(c, MODAL_HINTS)))
        .unwrap_or(false)
        || doc.attr(id, "id").map(|v| token_hint(v, MODAL_HINTS)).unwrap_or(false);
    if hinted {
        score += 1;
    }
    if ctx
        .styles
        .declared(id, "position")
        .map(|p| p.trim().eq_ignore_ascii_case("fixed"))
        .unwrap_or(false)
    {
        score += 1;
    }
    score
}

/// Whether the container has a control that closes it
pub fn has_close_control(doc: &Document, container: NodeId) -> bool {
    doc.descendants(container).any(|id| {
        let Some(el) = doc.element(id) else {
            return false;
        };
        if el.attrs.iter().any(|(name, _)| name == "data-dismiss" || name == "data-bs-dismiss" || name == "data-close") {
            return true;
        }
        let interactive = matches!(el.name.as_str(), "button" | "a" | "input")
            || doc.attr(id, "role") == Some("button");
        if !interactive {
            return false;
        }
        let label = format!(
            "{} {} {} {}",
            accessible_name(doc, id),
            doc.attr(id, "title").unwrap_or(""),
            doc.attr(id, "value").unwrap_or(""),
            doc.attr(id, "class").unwrap_or("")
        );
        token_hint(&label, CLOSE_HINTS)
    })
}

fn check_keyboard_traps(ctx: &Context<'_>, issues: &mut Vec<Issue>) {
    let doc = ctx.doc;
    let threshold = ctx.config.heuristics.modal_confidence_threshold;
    let mut flagged: BTreeSet<NodeId> = BTreeSet::new();

    for id in doc.elements() {
        // Native dialogs close on Escape
        if doc.is_tag(id, "dialog") || doc.ancestors(id).any(|a| flagged.contains(&a)) {
            continue;
        }
        let confidence = modal_confidence(ctx, id);
        if confidence < threshold || has_close_control(doc, id) {
            continue;
        }
        flagged.insert(id);
        issues.push(
            Issue::new(
                IssueType::PotentialKeyboardTrap,
                format!(
                    "Modal-like container (confidence {}) has no close or dismiss control. Keyboard users may be unable to leave it.",
                    confidence
                ),
            )
            .at(doc, id)
            .with_suggestion("Add a close button and close the dialog on Escape, or use the native <dialog> element"),
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
        KeyboardAnalyzer.analyze(&Context::new(&doc, &config))
    }

    fn count(issues: &[Issue], t: IssueType) -> usize {
        issues.iter().filter(|i| i.issue_type == t).count()
    }

    #[test]
    fn test_positive_tabindex() {
        let issues = run(r#"<div tabindex="5">Focus me</div><div tabindex="0" role="button">OK</div><span tabindex="-1">x</span>"#);
        assert_eq!(count(&issues, IssueType::PositiveTabindex), 1);
    }

    #[test]
    fn test_onclick_no_keyboard() {
        let issues = run(
            r#"<div onclick="go()">Click me</div>
               <span onclick="go()" role="button" tabindex="0">ok</span>
               <div onclick="go()" onkeydown="go()">ok</div>
               <button onclick="go()">native</button>"#,
        );
        assert_eq!(count(&issues, IssueType::KeyboardInaccessible), 1);
    }

    #[test]
    fn test_skip_links() {
        let without = run("<html><body><nav><a href=\"/\">Home</a></nav><main>x</main></body></html>");
        assert_eq!(count(&without, IssueType::MissingSkipLinks), 1);

        let with = run(
            "<html><body><a href=\"#main\">Skip to content</a><nav><a href=\"/\">Home</a></nav><main id=\"main\">x</main></body></html>",
        );
        assert_eq!(count(&with, IssueType::MissingSkipLinks), 0);

        let to_main = run(
            "<html><body><a href=\"#primary\">Jump</a><nav><a href=\"/\">Home</a></nav><main id=\"primary\">x</main></body></html>",
        );
        assert_eq!(count(&to_main, IssueType::MissingSkipLinks), 0);

        let no_nav = run("<html><body><main>x</main></body></html>");
        assert_eq!(count(&no_nav, IssueType::MissingSkipLinks), 0);
    }

    #[test]
    fn test_skip_links_for_tab_stops_before_main() {
        let header = run(
            r#"<html><body><header><a href="/">Home</a><a href="/shop">Shop</a><input type="search" name="q"></header>
               <main><p>x</p></main></body></html>"#,
        );
        let missing: Vec<&Issue> = header.iter().filter(|i| i.issue_type == IssueType::MissingSkipLinks).collect();
        assert_eq!(missing.len(), 1);
        assert!(missing[0].message.contains("3 focusable elements"));

        let short = run(r#"<html><body><header><a href="/">Home</a><a href="/shop">Shop</a></header><main>x</main></body></html>"#);
        assert_eq!(count(&short, IssueType::MissingSkipLinks), 0);

        let inside_main = run(
            r#"<html><body><main><a href="/a">a</a><a href="/b">b</a><a href="/c">c</a></main></body></html>"#,
        );
        assert_eq!(count(&inside_main, IssueType::MissingSkipLinks), 0);
    }

    #[test]
    fn test_outline_none_in_style_block() {
        let issues = run("<style>*:focus { outline: none; }</style><a href=\"/\">x</a>");
        assert_eq!(count(&issues, IssueType::FocusIndicatorsRemoved), 1);
        assert_eq!(issues[0].selector, "*:focus");
    }

    #[test]
    fn test_outline_none_with_replacement() {
        let issues = run("<style>button:focus { outline: none; box-shadow: 0 0 0 2px blue; }</style>");
        assert_eq!(count(&issues, IssueType::FocusIndicatorsRemoved), 0);

        let restored = run(
            "<style>:focus { outline: 0 } :focus-visible { outline: 2px solid #005fcc }</style>",
        );
        assert_eq!(count(&restored, IssueType::FocusIndicatorsRemoved), 0);
    }

    #[test]
    fn test_inline_outline_none() {
        let issues = run(r#"<a href="/" style="outline: none">x</a><div style="outline:none">not focusable</div>"#);
        assert_eq!(count(&issues, IssueType::FocusIndicatorsRemoved), 1);
    }

    #[test]
    fn test_keyboard_trap_heuristic() {
        let issues = run(
            r#"<div role="dialog" aria-modal="true" class="modal"><p>Subscribe!</p></div>
               <div role="dialog" aria-modal="true"><button class="btn-close" aria-label="Close">x</button></div>
               <div class="modal-body">only a hint</div>
               <dialog open><p>native</p></dialog>"#,
        );
        assert_eq!(count(&issues, IssueType::PotentialKeyboardTrap), 1);
    }

    #[test]
    fn test_keyboard_trap_threshold_is_configurable() {
        let doc = Document::parse(r#"<div class="popup" style="position: fixed">Offer</div>"#);
        let mut config = Config::default();
        let issues = KeyboardAnalyzer.analyze(&Context::new(&doc, &config));
        assert_eq!(count(&issues, IssueType::PotentialKeyboardTrap), 0);

        config.heuristics.modal_confidence_threshold = 2;
        let issues = KeyboardAnalyzer.analyze(&Context::new(&doc, &config));
        assert_eq!(count(&issues, IssueType::PotentialKeyboardTrap), 1);
    }
}
