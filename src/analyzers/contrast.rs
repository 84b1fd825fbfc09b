// SPDX-License-Identifier: PMPL-1.0-or-later
//! Color contrast analyzer - WCAG 1.4.3 Contrast (Minimum) (Level AA)
//!
//! For each element carrying enough direct text, the effective foreground
//! and background colors are resolved by walking up the tree. Each level is
//! checked in priority order:
//!
//! 1. declared style (inline `style` plus matching `<style>` rules)
//! 2. a small palette of utility classes
//! 3. user-agent defaults for links and `<mark>`
//!
//! When either color cannot be established the element is skipped. No
//! default color is ever assumed.

use crate::analyzers::{css_px, is_hidden, Analyzer, Context};
use crate::color::{self, ColorSample};
use crate::dom::{Document, NodeId};
use crate::issue::{Issue, IssueType};
use crate::selector::{self, Query};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// WordPress block-editor preset colors (`has-{name}-color`,
/// `has-{name}-background-color`)
const PRESET_COLORS: &[(&str, &str)] = &[
    ("black", "#000000"),
    ("cyan-bluish-gray", "#abb8c3"),
    ("white", "#ffffff"),
    ("pale-pink", "#f78da7"),
    ("vivid-red", "#cf2e2e"),
    ("luminous-vivid-orange", "#ff6900"),
    ("luminous-vivid-amber", "#fcb900"),
    ("light-green-cyan", "#7bdcb5"),
    ("vivid-green-cyan", "#00d084"),
    ("pale-cyan-blue", "#8ed1fc"),
    ("vivid-cyan-blue", "#0693e3"),
    ("vivid-purple", "#9b51e0"),
];

/// Tags whose text is never rendered as page content
const NON_RENDERED: &[&str] = &[
    "script", "style", "head", "title", "template", "noscript", "svg", "option", "textarea",
];

/// Keywords that defer to the parent value
const DEFERRING: &[&str] = &["inherit", "unset", "revert", "initial", "transparent", "none", "currentcolor"];

/// Result of resolving a background
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Background {
    Color(ColorSample),
    /// A background image with no fallback color, at this element
    ImageNoFallback(NodeId),
    Unknown,
}

/// Color contrast analyzer
pub struct ContrastAnalyzer;

impl Analyzer for ContrastAnalyzer {
    fn name(&self) -> &str {
        "Color Contrast Analyzer"
    }

    fn description(&self) -> &str {
        "Checks text color contrast against its background (WCAG 1.4.3)"
    }

    fn analyze(&self, ctx: &Context<'_>) -> Vec<Issue> {
        let doc = ctx.doc;
        let overrides = compile_overrides(ctx);
        let mut issues = Vec::new();
        let mut image_reported: BTreeSet<NodeId> = BTreeSet::new();

        for node in text_elements(ctx) {
            if is_overridden(doc, node, &overrides) {
                debug!(selector = %doc.locator(node), "Contrast check skipped by color override");
                continue;
            }

            let background = match resolve_background(ctx, node) {
                Background::Color(color) => color,
                Background::ImageNoFallback(at) => {
                    if image_reported.insert(at) {
                        issues.push(
                            Issue::new(
                                IssueType::BackgroundImageNoFallback,
                                "Text sits on a background image with no fallback background color.",
                            )
                            .at(doc, at)
                            .with_suggestion("Declare a background-color close to the image's dominant color"),
                        );
                    }
                    continue;
                }
                Background::Unknown => continue,
            };
            let Some(foreground) = resolve_foreground(ctx, node) else {
                continue;
            };
            let foreground = foreground.over(background);

            let size = font_size_px(ctx, node);
            let weight = font_weight(ctx, node);
            let large = color::is_large_text(size, weight);
            let ratio = color::contrast_ratio(foreground, background);
            if color::meets_aa(ratio, large) {
                continue;
            }

            let required = if large { color::AA_LARGE } else { color::AA_NORMAL };
            issues.push(
                Issue::new(
                    IssueType::LowContrast,
                    format!(
                        "Text contrast ratio {:.2}:1 is below the required {}:1 ({} on {}).",
                        ratio,
                        required,
                        foreground.to_hex(),
                        background.to_hex()
                    ),
                )
                .at(doc, node)
                .with_suggestion(format!(
                    "Darken the text or lighten the background until the ratio reaches {}:1",
                    required
                )),
            );
        }

        issues
    }
}

/// Elements with at least `min_text_chars` non-whitespace characters of
/// their own text
pub fn text_elements<'a>(ctx: &'a Context<'a>) -> impl Iterator<Item = NodeId> + 'a {
    let doc = ctx.doc;
    let min_chars = ctx.config.heuristics.min_text_chars;
    doc.elements().filter(move |id| {
        let Some(tag) = doc.tag(*id) else {
            return false;
        };
        if NON_RENDERED.contains(&tag) || doc.closest_tag(*id, NON_RENDERED).is_some() {
            return false;
        }
        let chars = doc
            .direct_text(*id)
            .chars()
            .filter(|c| !c.is_whitespace())
            .count();
        chars >= min_chars && !is_hidden(doc, *id)
    })
}

/// Compiled color overrides; selectors that fail to compile are matched by
/// exact locator only
fn compile_overrides(ctx: &Context<'_>) -> Vec<(String, Option<Query>)> {
    ctx.config
        .color_overrides
        .iter()
        .map(|o| {
            let query = match selector::compile(&o.selector) {
                Ok(q) => Some(q),
                Err(e) => {
                    warn!(selector = %o.selector, error = %e, "Color override selector does not compile");
                    None
                }
            };
            (o.selector.trim().to_string(), query)
        })
        .collect()
}

/// Whether the element, or an ancestor it inherits from, is covered by a
/// color override
fn is_overridden(doc: &Document, node: NodeId, overrides: &[(String, Option<Query>)]) -> bool {
    if overrides.is_empty() {
        return false;
    }
    let locator = doc.locator(node);
    overrides.iter().any(|(text, query)| {
        *text == locator
            || query
                .as_ref()
                .map(|q| std::iter::once(node).chain(doc.ancestors(node)).any(|n| q.matches(doc, n)))
                .unwrap_or(false)
    })
}

fn is_deferring(value: &str) -> bool {
    DEFERRING.contains(&value.trim().to_ascii_lowercase().as_str())
}

fn preset(name: &str) -> Option<ColorSample> {
    PRESET_COLORS
        .iter()
        .find(|(n, _)| *n == name)
        .and_then(|(_, hex)| color::parse_color(hex))
}

/// Foreground color from utility classes
fn class_foreground(doc: &Document, node: NodeId) -> Option<ColorSample> {
    let el = doc.element(node)?;
    el.classes().find_map(|class| {
        if class.ends_with("-background-color") {
            return None;
        }
        match class {
            "text-white" => color::parse_color("#ffffff"),
            "text-black" => color::parse_color("#000000"),
            _ => class
                .strip_prefix("has-")
                .and_then(|c| c.strip_suffix("-color"))
                .and_then(preset),
        }
    })
}

/// Background color from utility classes
fn class_background(doc: &Document, node: NodeId) -> Option<ColorSample> {
    let el = doc.element(node)?;
    el.classes().find_map(|class| match class {
        "bg-white" => color::parse_color("#ffffff"),
        "bg-black" => color::parse_color("#000000"),
        _ => class
            .strip_prefix("has-")
            .and_then(|c| c.strip_suffix("-background-color"))
            .and_then(preset),
    })
}

fn ua_foreground(doc: &Document, node: NodeId) -> Option<ColorSample> {
    match doc.tag(node)? {
        "a" if doc.has_attr(node, "href") => Some(ColorSample::rgb(0, 0, 0xee)),
        "mark" => Some(ColorSample::rgb(0, 0, 0)),
        _ => None,
    }
}

fn ua_background(doc: &Document, node: NodeId) -> Option<ColorSample> {
    match doc.tag(node)? {
        "mark" => Some(ColorSample::rgb(255, 255, 0)),
        _ => None,
    }
}

/// Walk the element and its ancestors, bounded by the configured depth
fn lineage<'a>(ctx: &'a Context<'a>, node: NodeId) -> impl Iterator<Item = NodeId> + 'a {
    std::iter::once(node)
        .chain(ctx.doc.ancestors(node))
        .take(ctx.config.heuristics.contrast_max_depth)
}

/// Effective text color, or `None` when it cannot be established
pub fn resolve_foreground(ctx: &Context<'_>, node: NodeId) -> Option<ColorSample> {
    let doc = ctx.doc;
    for current in lineage(ctx, node) {
        if let Some(value) = ctx.styles.declared(current, "color") {
            if !is_deferring(&value) {
                return color::parse_color(&value);
            }
        }
        if let Some(found) = class_foreground(doc, current) {
            return Some(found);
        }
        if let Some(found) = ua_foreground(doc, current) {
            return Some(found);
        }
    }
    None
}

/// Split a CSS value on whitespace outside parentheses
fn css_words(value: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut depth = 0usize;
    let mut start: Option<usize> = None;
    for (i, c) in value.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if (c.is_whitespace() || c == ',') && depth == 0 => {
                if let Some(s) = start.take() {
                    words.push(&value[s..i]);
                }
                continue;
            }
            _ => {}
        }
        if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        words.push(&value[s..]);
    }
    words
}

fn has_image(value: &str) -> bool {
    let value = value.to_ascii_lowercase();
    value.contains("url(") || value.contains("gradient(") || value.contains("image-set(")
}

/// What one element declares about its own background
enum Layer {
    Color(ColorSample),
    Image,
    Indeterminate,
    Unset,
}

fn background_layer(ctx: &Context<'_>, node: NodeId) -> Layer {
    let doc = ctx.doc;
    let image = ctx
        .styles
        .declared(node, "background-image")
        .map(|v| has_image(&v))
        .unwrap_or(false);

    if let Some(value) = ctx.styles.declared(node, "background-color") {
        if !is_deferring(&value) {
            return match color::parse_color(&value) {
                Some(c) => Layer::Color(c),
                None => Layer::Indeterminate,
            };
        }
    }

    if let Some(value) = ctx.styles.declared(node, "background") {
        if value.to_ascii_lowercase().contains("var(") {
            return Layer::Indeterminate;
        }
        if let Some(c) = css_words(&value).into_iter().rev().find_map(color::parse_color) {
            return Layer::Color(c);
        }
        if has_image(&value) || image {
            return Layer::Image;
        }
    } else if image {
        return Layer::Image;
    }

    if let Some(c) = class_background(doc, node).or_else(|| ua_background(doc, node)) {
        return Layer::Color(c);
    }
    Layer::Unset
}

/// Effective background, compositing translucent layers over the first
/// opaque one
pub fn resolve_background(ctx: &Context<'_>, node: NodeId) -> Background {
    let mut translucent: Vec<ColorSample> = Vec::new();

    for current in lineage(ctx, node) {
        match background_layer(ctx, current) {
            Layer::Color(c) if c.is_opaque() => {
                let composed = translucent.iter().rev().fold(c, |below, layer| layer.over(below));
                return Background::Color(composed);
            }
            Layer::Color(c) => translucent.push(c),
            Layer::Image => return Background::ImageNoFallback(current),
            Layer::Indeterminate => return Background::Unknown,
            Layer::Unset => {}
        }
    }
    Background::Unknown
}

/// User-agent font sizes of headings
fn heading_size(tag: &str) -> Option<f64> {
    Some(match tag {
        "h1" => 32.0,
        "h2" => 24.0,
        "h3" => 18.72,
        "h4" => 16.0,
        "h5" => 13.28,
        "h6" => 10.72,
        _ => return None,
    })
}

fn keyword_size(value: &str) -> Option<f64> {
    Some(match value {
        "xx-small" => 9.0,
        "x-small" => 10.0,
        "small" => 13.0,
        "medium" => 16.0,
        "large" => 18.0,
        "x-large" => 24.0,
        "xx-large" => 32.0,
        "xxx-large" => 48.0,
        _ => return None,
    })
}

/// Approximate rendered font size in pixels. `em` and `%` compound with
/// the parent size.
pub fn font_size_px(ctx: &Context<'_>, node: NodeId) -> f64 {
    let doc = ctx.doc;
    let mut factor = 1.0;

    for current in std::iter::once(node).chain(doc.ancestors(node)) {
        if let Some(value) = ctx.styles.declared(current, "font-size") {
            let value = value.trim().to_ascii_lowercase();
            if let Some(pct) = value.strip_suffix('%').and_then(|p| p.trim().parse::<f64>().ok()) {
                factor *= pct / 100.0;
                continue;
            }
            if !value.ends_with("rem") {
                if let Some(em) = value.strip_suffix("em").and_then(|e| e.trim().parse::<f64>().ok()) {
                    factor *= em;
                    continue;
                }
            }
            if let Some(px) = css_px(&value).or_else(|| keyword_size(&value)) {
                return px * factor;
            }
        }
        if let Some(size) = doc.tag(current).and_then(heading_size) {
            return size * factor;
        }
    }
    16.0 * factor
}

/// Approximate font weight, 400 or the declared numeric value
pub fn font_weight(ctx: &Context<'_>, node: NodeId) -> u16 {
    let doc = ctx.doc;
    for current in std::iter::once(node).chain(doc.ancestors(node)) {
        if let Some(value) = ctx.styles.declared(current, "font-weight") {
            match value.trim().to_ascii_lowercase().as_str() {
                "bold" | "bolder" => return 700,
                "normal" | "lighter" => return 400,
                other => {
                    if let Ok(n) = other.parse::<u16>() {
                        return n;
                    }
                }
            }
        }
        if matches!(
            doc.tag(current),
            Some("b" | "strong" | "th" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
        ) {
            return 700;
        }
    }
    400
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColorOverride, Config};

    fn run_with(html: &str, config: &Config) -> Vec<Issue> {
        let doc = Document::parse(html);
        ContrastAnalyzer.analyze(&Context::new(&doc, config))
    }

    fn run(html: &str) -> Vec<Issue> {
        run_with(html, &Config::default())
    }

    fn count(issues: &[Issue], t: IssueType) -> usize {
        issues.iter().filter(|i| i.issue_type == t).count()
    }

    #[test]
    fn test_low_contrast_inline() {
        let issues = run(r#"<div style="background:#fff"><p style="color:#777">Light grey text</p></div>"#);
        assert_eq!(count(&issues, IssueType::LowContrast), 1);
        assert!(issues[0].message.contains("#777777 on #ffffff"));
    }

    #[test]
    fn test_sufficient_contrast() {
        let issues = run(
            r#"<div style="background-color:#fff"><p style="color:#333">Dark text</p><a href="/">Link text</a></div>"#,
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn test_unknown_background_is_skipped() {
        assert!(run(r#"<p style="color:#777">No background anywhere</p>"#).is_empty());
        assert!(run(r#"<div style="background:#fff"><p style="color: var(--muted)">Variable</p></div>"#).is_empty());
        assert!(run(r#"<div style="background: var(--bg)"><p style="color:#eee">Variable</p></div>"#).is_empty());
    }

    #[test]
    fn test_stylesheet_rules_take_part() {
        let issues = run(
            r#"<style>.muted { color: #999 } .card { background: white }</style>
               <div class="card"><p class="muted">Muted text</p></div>"#,
        );
        assert_eq!(count(&issues, IssueType::LowContrast), 1);
    }

    #[test]
    fn test_large_text_threshold() {
        let heading = run(r#"<div style="background:#fff"><h1 style="color:#888">Big heading</h1></div>"#);
        assert!(heading.is_empty());

        let paragraph = run(r#"<div style="background:#fff"><p style="color:#888">Small text</p></div>"#);
        assert_eq!(count(&paragraph, IssueType::LowContrast), 1);

        let sized = run(r#"<div style="background:#fff;font-size:2em"><p style="color:#888">Scaled text</p></div>"#);
        assert!(sized.is_empty());
    }

    #[test]
    fn test_translucent_background_is_composited() {
        let issues = run(
            r#"<div style="background:#000"><p style="background: rgba(255,255,255,0.5); color:#fff">Text here</p></div>"#,
        );
        assert_eq!(count(&issues, IssueType::LowContrast), 1);
        assert!(issues[0].message.contains("#808080"));
    }

    #[test]
    fn test_utility_classes() {
        assert!(run(r#"<div class="has-black-background-color"><p class="has-white-color">White on black</p></div>"#).is_empty());
        let amber = run(
            r#"<div class="has-white-background-color"><p class="has-luminous-vivid-amber-color">Amber text</p></div>"#,
        );
        assert_eq!(count(&amber, IssueType::LowContrast), 1);
    }

    #[test]
    fn test_background_image_without_fallback() {
        let issues = run(
            r#"<div style="background-image:url(hero.jpg)"><p style="color:#fff">Hero text</p><p style="color:#fff">More text</p></div>
               <div style="background:#222 url(hero.jpg)"><p style="color:#fff">Fallback present</p></div>"#,
        );
        assert_eq!(count(&issues, IssueType::BackgroundImageNoFallback), 1);
        assert_eq!(count(&issues, IssueType::LowContrast), 0);
    }

    #[test]
    fn test_short_direct_text_is_skipped() {
        assert!(run(r#"<div style="background:#fff;color:#eee"><span>ab</span></div>"#).is_empty());
    }

    #[test]
    fn test_color_override_suppresses() {
        let html = r#"<div style="background:#fff"><p class="brand note" style="color:#aaa">Brand text</p></div>"#;
        let mut config = Config::default();
        assert_eq!(count(&run_with(html, &config), IssueType::LowContrast), 1);

        config.color_overrides.push(ColorOverride {
            selector: "div > .brand".to_string(),
            color: Some("#000".to_string()),
            background: None,
        });
        assert!(run_with(html, &config).is_empty());
    }

    #[test]
    fn test_depth_limit() {
        let html = r#"<div style="background:#fff"><div><div><p style="color:#aaa">Deep text</p></div></div></div>"#;
        let mut config = Config::default();
        assert_eq!(count(&run_with(html, &config), IssueType::LowContrast), 1);

        config.heuristics.contrast_max_depth = 2;
        assert!(run_with(html, &config).is_empty());
    }
}
