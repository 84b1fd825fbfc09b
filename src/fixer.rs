// SPDX-License-Identifier: PMPL-1.0-or-later
//! Auto-fix transformer.
//!
//! Each enabled [`FixKind`] makes a targeted, additive change to the parsed
//! document: attributes are added rather than tags rewritten, so page
//! styling survives. Every fix checks the current state before writing, so
//! running the transformer on its own output changes nothing. Elements a
//! fix touched carry its key in `data-a11y-fixed`.
//!
//! When no safe target exists the fix records [`FixOutcome::NotFound`] and
//! leaves the document alone.

use crate::analyzers::{
    self, accessible_name, alt_text, aria, forms, keyboard, links, media, semantic, Analyzer,
    Context,
};
use crate::color;
use crate::config::{self, Config};
use crate::dom::{Document, NodeId};
use crate::issue::{FixKind, IssueType};
use crate::selector;
use crate::stylesheet::{self, Declaration};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Marker attribute listing the fixes applied to an element
pub const FIXED_MARKER: &str = "data-a11y-fixed";

/// Ids of the style blocks the fixer injects
const SKIP_LINK_STYLE_ID: &str = "a11y-skip-link-style";
const FOCUS_STYLE_ID: &str = "a11y-focus-style";
const REDUCED_MOTION_STYLE_ID: &str = "a11y-reduced-motion";

const SKIP_LINK_CLASS: &str = "a11y-skip-link";

const SKIP_LINK_CSS: &str = ".a11y-skip-link { position: absolute; left: -10000px; top: auto; } \
.a11y-skip-link:focus { left: 1rem; top: 1rem; z-index: 100000; padding: 0.5rem 1rem; color: #000000; background: #ffffff; }";

const FOCUS_CSS: &str =
    ":focus-visible { outline: 2px solid #005fcc !important; outline-offset: 2px !important; }";

const REDUCED_MOTION_CSS: &str = "@media (prefers-reduced-motion: reduce) { *, *::before, *::after { \
animation-duration: 0.01ms !important; animation-iteration-count: 1 !important; \
transition-duration: 0.01ms !important; scroll-behavior: auto !important; } }";

/// Content-container candidates for `role="main"`, best first
const MAIN_CANDIDATES: &[&str] = &[
    "#main",
    "#main-content",
    "#maincontent",
    "#content",
    "#primary",
    ".site-main",
    ".main-content",
    ".content-area",
    "#page-content",
    ".content",
    "article",
];

/// Containers that must never become the main landmark
const NOT_MAIN: &[&str] = &["html", "head", "body", "header", "nav", "footer", "aside", "form"];

/// What happened to one fix attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum FixOutcome {
    Applied,
    /// No safe anchor point exists; nothing was changed
    NotFound(String),
    /// The fix was not attempted, e.g. bad configuration
    Skipped(String),
}

/// One fix applied (or not) to one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixAttempt {
    pub fix: FixKind,
    /// Locator of the element, or a description for page-level fixes
    pub target: String,
    pub outcome: FixOutcome,
}

impl FixAttempt {
    fn applied(fix: FixKind, target: impl Into<String>) -> Self {
        Self {
            fix,
            target: target.into(),
            outcome: FixOutcome::Applied,
        }
    }

    fn not_found(fix: FixKind, target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            fix,
            target: target.into(),
            outcome: FixOutcome::NotFound(reason.into()),
        }
    }

    fn skipped(fix: FixKind, target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            fix,
            target: target.into(),
            outcome: FixOutcome::Skipped(reason.into()),
        }
    }
}

/// Fixed HTML plus the attempt log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixReport {
    pub html: String,
    pub attempts: Vec<FixAttempt>,
}

impl FixReport {
    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, FixOutcome::Applied))
    }

    pub fn not_found(&self) -> usize {
        self.count(|o| matches!(o, FixOutcome::NotFound(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FixOutcome::Skipped(_)))
    }

    fn count(&self, pred: impl Fn(&FixOutcome) -> bool) -> usize {
        self.attempts.iter().filter(|a| pred(&a.outcome)).count()
    }

    /// Applied fixes per kind
    pub fn counts(&self) -> BTreeMap<FixKind, usize> {
        let mut counts = BTreeMap::new();
        for attempt in &self.attempts {
            if attempt.outcome == FixOutcome::Applied {
                *counts.entry(attempt.fix).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Parse, fix and serialize
pub fn fix_html(html: &str, config: &Config) -> FixReport {
    let mut doc = Document::parse(html);
    let attempts = fix_document(&mut doc, config);
    FixReport {
        html: doc.to_html(),
        attempts,
    }
}

/// Apply every enabled fix, in [`FixKind::ALL`] order
pub fn fix_document(doc: &mut Document, config: &Config) -> Vec<FixAttempt> {
    let mut attempts = Vec::new();

    for kind in FixKind::ALL {
        if !config.fix_enabled(kind) {
            continue;
        }
        let before = attempts.len();
        match kind {
            FixKind::PageLanguage => fix_page_language(doc, config, &mut attempts),
            FixKind::MissingAlt => fix_missing_alt(doc, &mut attempts),
            FixKind::MissingLabel => fix_missing_labels(doc, &mut attempts),
            FixKind::HeadingHierarchy => fix_heading_hierarchy(doc, &mut attempts),
            FixKind::MainLandmark => fix_main_landmark(doc, &mut attempts),
            FixKind::SkipLinks => fix_skip_links(doc, &mut attempts),
            FixKind::AriaControls => fix_aria_controls(doc, &mut attempts),
            FixKind::LinkNames => fix_link_names(doc, &mut attempts),
            FixKind::KeyboardAccess => fix_keyboard_access(doc, &mut attempts),
            FixKind::PositiveTabindex => fix_positive_tabindex(doc, &mut attempts),
            FixKind::FocusIndicators => fix_focus_indicators(doc, config, &mut attempts),
            FixKind::VideoAutoplay => fix_video_autoplay(doc, &mut attempts),
            FixKind::DecorativeVideo => fix_decorative_video(doc, config, &mut attempts),
            FixKind::RadioFieldset => fix_fieldsets(doc, &mut attempts),
            FixKind::RequiredAria => fix_required_aria(doc, &mut attempts),
            FixKind::IframeTitle => fix_iframe_titles(doc, &mut attempts),
            FixKind::InputPurpose => fix_input_purpose(doc, &mut attempts),
            FixKind::ReducedMotion => fix_reduced_motion(doc, config, &mut attempts),
            FixKind::AriaRules => apply_aria_rules(doc, config, &mut attempts),
            FixKind::ColorOverrides => apply_color_overrides(doc, config, &mut attempts),
        }
        for attempt in &attempts[before..] {
            match &attempt.outcome {
                FixOutcome::Applied => debug!(fix = %attempt.fix, target = %attempt.target, "Fix applied"),
                FixOutcome::NotFound(reason) | FixOutcome::Skipped(reason) => {
                    warn!(fix = %attempt.fix, target = %attempt.target, reason = %reason, "Fix not applied")
                }
            }
        }
    }

    info!(
        applied = attempts.iter().filter(|a| a.outcome == FixOutcome::Applied).count(),
        total = attempts.len(),
        "Fixer finished"
    );
    attempts
}

/// Add `kind` to the element's marker attribute
fn mark(doc: &mut Document, id: NodeId, kind: FixKind) {
    let current = doc.attr(id, FIXED_MARKER).unwrap_or("").to_string();
    if current.split_whitespace().any(|k| k == kind.as_str()) {
        return;
    }
    let value = if current.trim().is_empty() {
        kind.as_str().to_string()
    } else {
        format!("{} {}", current.trim(), kind.as_str())
    };
    doc.set_attr(id, FIXED_MARKER, &value);
}

/// Set an attribute and mark the element. Returns whether anything changed.
fn set_fixed(doc: &mut Document, id: NodeId, kind: FixKind, name: &str, value: &str) -> bool {
    if !doc.set_attr(id, name, value) {
        return false;
    }
    mark(doc, id, kind);
    true
}

/// `shipping_method` and `firstName` become "Shipping method" and "First name"
pub fn humanize(name: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in name.chars() {
        if matches!(c, '_' | '-' | '.' | '[' | ']') || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }

    let sentence = words.join(" ");
    let mut chars = sentence.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Insert a `<style>` block once, keyed by its id
fn inject_style(doc: &mut Document, style_id: &str, css: &str) -> bool {
    if doc.elements_with_id(style_id).next().is_some() {
        return false;
    }
    let parent = doc.head().or_else(|| doc.body()).unwrap_or_else(|| doc.root());
    let style = doc.create_element("style", &[("id", style_id)]);
    let text = doc.create_text(css);
    doc.append_child(style, text);
    doc.append_child(parent, style);
    true
}

/// An id not used anywhere in the document
fn unused_id(doc: &Document, base: &str) -> String {
    if doc.elements_with_id(base).next().is_none() {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| doc.elements_with_id(candidate).next().is_none())
        .unwrap_or_else(|| base.to_string())
}

fn fix_page_language(doc: &mut Document, config: &Config, attempts: &mut Vec<FixAttempt>) {
    const KIND: FixKind = FixKind::PageLanguage;
    if doc.is_fragment() {
        return;
    }
    let Some(html) = doc.html_element() else {
        return;
    };
    let current = doc.attr(html, "lang").map(str::trim);
    if current.map(config::is_language_tag).unwrap_or(false) {
        return;
    }
    match config.normalized_locale() {
        Some(locale) => {
            set_fixed(doc, html, KIND, "lang", &locale);
            attempts.push(FixAttempt::applied(KIND, "html"));
        }
        None => attempts.push(FixAttempt::skipped(
            KIND,
            "html",
            format!("site_locale \"{}\" is not a language tag", config.site_locale),
        )),
    }
}

fn fix_missing_alt(doc: &mut Document, attempts: &mut Vec<FixAttempt>) {
    const KIND: FixKind = FixKind::MissingAlt;
    let targets: Vec<NodeId> = doc
        .elements_by_tag("img")
        .filter(|img| {
            !alt_text::is_presentational(doc, *img)
                && !doc.has_attr(*img, "alt")
                && doc.non_empty_attr(*img, "aria-label").is_none()
                && doc.non_empty_attr(*img, "aria-labelledby").is_none()
        })
        .collect();

    for img in targets {
        // An author-written title is the only text we trust as a description
        let alt = doc.non_empty_attr(img, "title").unwrap_or("").to_string();
        let target = doc.locator(img);
        set_fixed(doc, img, KIND, "alt", &alt);
        attempts.push(FixAttempt::applied(KIND, target));
    }
}

fn fix_missing_labels(doc: &mut Document, attempts: &mut Vec<FixAttempt>) {
    const KIND: FixKind = FixKind::MissingLabel;
    let targets: Vec<NodeId> = forms::form_controls(doc)
        .filter(|c| forms::needs_label(doc, *c) && !forms::is_labelled(doc, *c))
        .collect();

    for control in targets {
        let target = doc.locator(control);
        let label = doc
            .non_empty_attr(control, "placeholder")
            .or_else(|| doc.non_empty_attr(control, "title"))
            .map(str::to_string)
            .or_else(|| {
                doc.non_empty_attr(control, "name")
                    .or_else(|| doc.non_empty_attr(control, "id"))
                    .map(humanize)
                    .filter(|h| !h.is_empty())
            });
        match label {
            Some(label) => {
                set_fixed(doc, control, KIND, "aria-label", &label);
                attempts.push(FixAttempt::applied(KIND, target));
            }
            None => attempts.push(FixAttempt::not_found(
                KIND,
                target,
                "no placeholder, title, name or id to derive a label from",
            )),
        }
    }
}

fn fix_heading_hierarchy(doc: &mut Document, attempts: &mut Vec<FixAttempt>) {
    const KIND: FixKind = FixKind::HeadingHierarchy;
    let mut previous: Option<u8> = None;
    let mut changes: Vec<(NodeId, u8)> = Vec::new();

    for (heading, level) in semantic::headings(doc) {
        let effective = match previous.map(|prev| prev.saturating_add(1)) {
            Some(expected) if level > expected => {
                changes.push((heading, expected));
                expected
            }
            _ => level,
        };
        previous = Some(effective);
    }

    for (heading, level) in changes {
        let target = doc.locator(heading);
        set_fixed(doc, heading, KIND, "aria-level", &level.to_string());
        attempts.push(FixAttempt::applied(KIND, target));
    }
}

fn fix_main_landmark(doc: &mut Document, attempts: &mut Vec<FixAttempt>) {
    const KIND: FixKind = FixKind::MainLandmark;
    if doc.is_fragment() || semantic::has_main_landmark(doc) {
        return;
    }

    let candidate = MAIN_CANDIDATES.iter().find_map(|sel| {
        let query = selector::compile(sel).ok()?;
        let mut found = query
            .select(doc)
            .into_iter()
            .filter(|id| !doc.tag(*id).map(|t| NOT_MAIN.contains(&t)).unwrap_or(true))
            .filter(|id| !doc.has_attr(*id, "role"));
        let first = found.next()?;
        // Several equal candidates leave the choice ambiguous
        if sel.starts_with('#') || found.next().is_none() {
            Some(first)
        } else {
            None
        }
    });

    match candidate {
        Some(main) => {
            let target = doc.locator(main);
            set_fixed(doc, main, KIND, "role", "main");
            attempts.push(FixAttempt::applied(KIND, target));
        }
        None => attempts.push(FixAttempt::not_found(
            KIND,
            "body",
            "no unambiguous content container found",
        )),
    }
}

fn fix_skip_links(doc: &mut Document, attempts: &mut Vec<FixAttempt>) {
    const KIND: FixKind = FixKind::SkipLinks;
    if doc.is_fragment() || !keyboard::needs_skip_link(doc) {
        return;
    }
    if doc.elements_by_tag("a").any(|a| keyboard::is_skip_link(doc, a)) {
        return;
    }
    let (Some(body), Some(main)) = (doc.body(), keyboard::main_landmark(doc)) else {
        attempts.push(FixAttempt::not_found(KIND, "body", "no main landmark to skip to"));
        return;
    };

    let target_id = match doc.non_empty_attr(main, "id") {
        Some(id) => id.to_string(),
        None => {
            let id = unused_id(doc, "main-content");
            set_fixed(doc, main, KIND, "id", &id);
            id
        }
    };
    let href = format!("#{}", target_id);
    let link = doc.create_element(
        "a",
        &[("href", href.as_str()), ("class", SKIP_LINK_CLASS), (FIXED_MARKER, KIND.as_str())],
    );
    let text = doc.create_text("Skip to main content");
    doc.append_child(link, text);
    doc.prepend_child(body, link);
    inject_style(doc, SKIP_LINK_STYLE_ID, SKIP_LINK_CSS);
    attempts.push(FixAttempt::applied(KIND, "body"));
}

/// The region a disclosure button most plausibly controls: the next
/// element sibling, or the parent's next sibling when the button is
/// wrapped alone (accordion headings)
fn disclosure_panel(doc: &Document, button: NodeId) -> Option<NodeId> {
    let is_panel = |id: NodeId| {
        !doc.is_tag(id, "button")
            && doc.attr(id, "role") != Some("button")
            && !doc.is_tag(id, "script")
            && !doc.is_tag(id, "template")
    };
    if let Some(next) = doc.next_element_sibling(button) {
        return is_panel(next).then_some(next);
    }
    let parent = doc.parent_element(button)?;
    if doc.element_children(parent).count() != 1 {
        return None;
    }
    doc.next_element_sibling(parent).filter(|id| is_panel(*id))
}

fn fix_aria_controls(doc: &mut Document, attempts: &mut Vec<FixAttempt>) {
    const KIND: FixKind = FixKind::AriaControls;
    let targets: Vec<NodeId> = aria::disclosure_buttons(doc)
        .filter(|b| doc.non_empty_attr(*b, "aria-controls").is_none())
        .collect();

    for button in targets {
        let target = doc.locator(button);
        let Some(panel) = disclosure_panel(doc, button) else {
            attempts.push(FixAttempt::not_found(KIND, target, "no adjacent panel to reference"));
            continue;
        };
        let panel_id = match doc.non_empty_attr(panel, "id") {
            Some(id) => id.to_string(),
            None => {
                let id = unused_id(doc, "a11y-panel");
                set_fixed(doc, panel, KIND, "id", &id);
                id
            }
        };
        set_fixed(doc, button, KIND, "aria-controls", &panel_id);
        attempts.push(FixAttempt::applied(KIND, target));
    }
}

fn fix_link_names(doc: &mut Document, attempts: &mut Vec<FixAttempt>) {
    const KIND: FixKind = FixKind::LinkNames;
    let targets: Vec<NodeId> = links::links(doc)
        .filter(|l| accessible_name(doc, *l).is_empty())
        .chain(links::buttons(doc).filter(|b| links::button_name(doc, *b).is_empty()))
        .collect();

    for id in targets {
        let target = doc.locator(id);
        match doc.non_empty_attr(id, "title").map(str::to_string) {
            Some(title) => {
                set_fixed(doc, id, KIND, "aria-label", &title);
                attempts.push(FixAttempt::applied(KIND, target));
            }
            None => attempts.push(FixAttempt::not_found(KIND, target, "no title to use as a name")),
        }
    }
}

fn fix_keyboard_access(doc: &mut Document, attempts: &mut Vec<FixAttempt>) {
    const KIND: FixKind = FixKind::KeyboardAccess;
    let targets: Vec<NodeId> = keyboard::click_only_elements(doc).collect();

    for id in targets {
        let target = doc.locator(id);
        if doc.non_empty_attr(id, "role").is_none() {
            set_fixed(doc, id, KIND, "role", "button");
        }
        if !doc.has_attr(id, "tabindex") {
            set_fixed(doc, id, KIND, "tabindex", "0");
        }
        attempts.push(FixAttempt::applied(KIND, target));
    }
}

fn fix_positive_tabindex(doc: &mut Document, attempts: &mut Vec<FixAttempt>) {
    const KIND: FixKind = FixKind::PositiveTabindex;
    let targets: Vec<NodeId> = doc
        .elements()
        .filter(|id| keyboard::positive_tabindex(doc, *id).is_some())
        .collect();

    for id in targets {
        let target = doc.locator(id);
        set_fixed(doc, id, KIND, "tabindex", "0");
        attempts.push(FixAttempt::applied(KIND, target));
    }
}

/// Whether an analyzer reports `issue_type` on the current document
fn detects(doc: &Document, config: &Config, analyzer: &dyn Analyzer, issue_type: IssueType) -> bool {
    let ctx = Context::new(doc, config);
    analyzer.analyze(&ctx).iter().any(|i| i.issue_type == issue_type)
}

fn fix_focus_indicators(doc: &mut Document, config: &Config, attempts: &mut Vec<FixAttempt>) {
    const KIND: FixKind = FixKind::FocusIndicators;
    if !detects(doc, config, &keyboard::KeyboardAnalyzer, IssueType::FocusIndicatorsRemoved) {
        return;
    }
    if inject_style(doc, FOCUS_STYLE_ID, FOCUS_CSS) {
        attempts.push(FixAttempt::applied(KIND, format!("style#{}", FOCUS_STYLE_ID)));
    }
}

fn fix_video_autoplay(doc: &mut Document, attempts: &mut Vec<FixAttempt>) {
    const KIND: FixKind = FixKind::VideoAutoplay;
    let targets: Vec<NodeId> = doc
        .elements_by_tag("video")
        .filter(|v| doc.has_attr(*v, "autoplay") && !doc.has_attr(*v, "muted"))
        .collect();

    for video in targets {
        let target = doc.locator(video);
        set_fixed(doc, video, KIND, "muted", "");
        attempts.push(FixAttempt::applied(KIND, target));
    }
}

fn fix_decorative_video(doc: &mut Document, config: &Config, attempts: &mut Vec<FixAttempt>) {
    const KIND: FixKind = FixKind::DecorativeVideo;
    let targets: Vec<NodeId> = {
        let ctx = Context::new(doc, config);
        doc.elements_by_tag("video")
            .filter(|v| {
                doc.has_attr(*v, "autoplay")
                    && !analyzers::is_aria_hidden(doc, *v)
                    && media::is_decorative_video(&ctx, *v)
            })
            .collect()
    };

    for video in targets {
        let target = doc.locator(video);
        set_fixed(doc, video, KIND, "aria-hidden", "true");
        attempts.push(FixAttempt::applied(KIND, target));
    }
}

/// Lowest common ancestor of the members
fn common_ancestor(doc: &Document, members: &[NodeId]) -> Option<NodeId> {
    let first = *members.first()?;
    doc.ancestors(first)
        .find(|candidate| members.iter().all(|m| doc.is_inside(*m, *candidate)))
}

/// The child of `container` that holds `node`
fn child_holding(doc: &Document, container: NodeId, node: NodeId) -> Option<NodeId> {
    std::iter::once(node)
        .chain(doc.ancestors(node))
        .find(|n| doc.parent(*n) == Some(container))
}

fn fix_fieldsets(doc: &mut Document, attempts: &mut Vec<FixAttempt>) {
    const KIND: FixKind = FixKind::RadioFieldset;
    let mut groups: Vec<(String, Vec<NodeId>)> = Vec::new();
    for kind in ["radio", "checkbox"] {
        for ((_, name), members) in forms::input_groups(doc, kind) {
            if members.len() > 1 && !forms::is_grouped(doc, &members) {
                groups.push((name, members));
            }
        }
    }
    groups.sort_by_key(|(_, members)| members[0]);

    for (name, members) in groups {
        let target = doc.locator(members[0]);
        let Some(container) = common_ancestor(doc, &members) else {
            attempts.push(FixAttempt::not_found(KIND, target, "group members have no common container"));
            continue;
        };
        let units: Vec<NodeId> = members
            .iter()
            .filter_map(|m| child_holding(doc, container, *m))
            .collect();
        let (Some(&first), Some(&last)) = (units.iter().min(), units.iter().max()) else {
            attempts.push(FixAttempt::not_found(KIND, target, "group members are not in one container"));
            continue;
        };

        // The contiguous run of children from the first unit to the last,
        // plus a trailing label of the last input
        let mut run: Vec<NodeId> = Vec::new();
        let mut in_run = false;
        for child in doc.children(container) {
            if child == first {
                in_run = true;
            }
            if in_run {
                run.push(child);
            }
            if child == last {
                break;
            }
        }
        if let Some(next) = doc.next_element_sibling(last) {
            if doc.is_tag(next, "label") {
                let between: Vec<NodeId> = doc
                    .children(container)
                    .skip_while(|c| *c != last)
                    .skip(1)
                    .take_while(|c| *c != next)
                    .collect();
                run.extend(between);
                run.push(next);
            }
        }

        let fieldset = doc.create_element(
            "fieldset",
            &[("style", "border: 0; margin: 0; padding: 0; min-width: 0"), (FIXED_MARKER, KIND.as_str())],
        );
        let legend = doc.create_element(
            "legend",
            &[(
                "style",
                "position: absolute; width: 1px; height: 1px; overflow: hidden; clip: rect(0 0 0 0); white-space: nowrap",
            )],
        );
        let legend_text = humanize(&name);
        let text = doc.create_text(&legend_text);
        doc.append_child(legend, text);
        doc.insert_before(first, fieldset);
        doc.append_child(fieldset, legend);
        for node in run {
            doc.append_child(fieldset, node);
        }
        attempts.push(FixAttempt::applied(KIND, target));
    }
}

fn fix_required_aria(doc: &mut Document, attempts: &mut Vec<FixAttempt>) {
    const KIND: FixKind = FixKind::RequiredAria;
    let targets: Vec<NodeId> = forms::form_controls(doc)
        .filter(|c| {
            doc.has_attr(*c, "required")
                && !doc.has_attr(*c, "aria-required")
                && forms::input_type(doc, *c) != "hidden"
        })
        .collect();

    for control in targets {
        let target = doc.locator(control);
        set_fixed(doc, control, KIND, "aria-required", "true");
        attempts.push(FixAttempt::applied(KIND, target));
    }
}

/// Host part of an absolute or protocol-relative URL
pub fn url_host(src: &str) -> Option<&str> {
    let rest = src
        .trim()
        .strip_prefix("https://")
        .or_else(|| src.trim().strip_prefix("http://"))
        .or_else(|| src.trim().strip_prefix("//"))?;
    let host = rest
        .split(|c| matches!(c, '/' | '?' | '#' | ':'))
        .next()
        .unwrap_or("");
    let host = host.rsplit('@').next().unwrap_or(host);
    (!host.is_empty()).then_some(host)
}

fn fix_iframe_titles(doc: &mut Document, attempts: &mut Vec<FixAttempt>) {
    const KIND: FixKind = FixKind::IframeTitle;
    let targets: Vec<NodeId> = doc
        .elements_by_tag("iframe")
        .filter(|f| {
            !analyzers::is_hidden(doc, *f)
                && !analyzers::is_aria_hidden(doc, *f)
                && doc.non_empty_attr(*f, "title").is_none()
                && doc.non_empty_attr(*f, "aria-label").is_none()
                && analyzers::labelledby_text(doc, *f).is_empty()
        })
        .collect();

    for frame in targets {
        let target = doc.locator(frame);
        let title = doc
            .non_empty_attr(frame, "name")
            .map(humanize)
            .or_else(|| {
                doc.attr(frame, "src")
                    .and_then(url_host)
                    .map(|host| format!("Embedded content from {}", host.trim_start_matches("www.")))
            });
        match title {
            Some(title) => {
                set_fixed(doc, frame, KIND, "title", &title);
                attempts.push(FixAttempt::applied(KIND, target));
            }
            None => attempts.push(FixAttempt::not_found(KIND, target, "no name or source host to describe the frame")),
        }
    }
}

fn fix_input_purpose(doc: &mut Document, attempts: &mut Vec<FixAttempt>) {
    const KIND: FixKind = FixKind::InputPurpose;
    let targets: Vec<(NodeId, &'static str)> = doc
        .elements_by_tag("input")
        .filter(|i| !doc.has_attr(*i, "autocomplete"))
        .filter_map(|i| forms::derive_autocomplete(doc, i).map(|token| (i, token)))
        .collect();

    for (input, token) in targets {
        let target = doc.locator(input);
        set_fixed(doc, input, KIND, "autocomplete", token);
        attempts.push(FixAttempt::applied(KIND, target));
    }
}

fn fix_reduced_motion(doc: &mut Document, config: &Config, attempts: &mut Vec<FixAttempt>) {
    const KIND: FixKind = FixKind::ReducedMotion;
    if !detects(
        doc,
        config,
        &analyzers::css::CssAnalyzer,
        IssueType::MotionNoReducedPreference,
    ) {
        return;
    }
    if inject_style(doc, REDUCED_MOTION_STYLE_ID, REDUCED_MOTION_CSS) {
        attempts.push(FixAttempt::applied(KIND, format!("style#{}", REDUCED_MOTION_STYLE_ID)));
    }
}

fn apply_aria_rules(doc: &mut Document, config: &Config, attempts: &mut Vec<FixAttempt>) {
    const KIND: FixKind = FixKind::AriaRules;

    for rule in &config.aria_rules {
        let query = match selector::compile(&rule.selector) {
            Ok(q) => q,
            Err(e) => {
                attempts.push(FixAttempt::skipped(KIND, rule.selector.clone(), e.to_string()));
                continue;
            }
        };
        let matches = query.select(doc);
        if matches.is_empty() {
            debug!(selector = %rule.selector, "ARIA rule matched nothing");
            continue;
        }
        for id in matches {
            if doc.attr(id, &rule.attribute) == Some(rule.value.as_str()) {
                continue;
            }
            let target = doc.locator(id);
            set_fixed(doc, id, KIND, &rule.attribute, &rule.value);
            attempts.push(FixAttempt::applied(KIND, target));
        }
    }
}

/// Render declarations back into a `style` attribute value
fn render_declarations(decls: &[Declaration]) -> String {
    decls
        .iter()
        .map(|d| {
            if d.important {
                format!("{}: {} !important", d.property, d.value)
            } else {
                format!("{}: {}", d.property, d.value)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn apply_color_overrides(doc: &mut Document, config: &Config, attempts: &mut Vec<FixAttempt>) {
    const KIND: FixKind = FixKind::ColorOverrides;

    for o in &config.color_overrides {
        let mut wanted: Vec<(&str, &str)> = Vec::new();
        for (property, value) in [("color", &o.color), ("background-color", &o.background)] {
            if let Some(value) = value.as_deref() {
                if color::parse_color(value).is_none() {
                    attempts.push(FixAttempt::skipped(
                        KIND,
                        o.selector.clone(),
                        format!("\"{}\" is not a color", value),
                    ));
                    continue;
                }
                wanted.push((property, value.trim()));
            }
        }
        if wanted.is_empty() {
            continue;
        }

        let query = match selector::compile(&o.selector) {
            Ok(q) => q,
            Err(e) => {
                attempts.push(FixAttempt::skipped(KIND, o.selector.clone(), e.to_string()));
                continue;
            }
        };

        for id in query.select(doc) {
            let existing = doc.attr(id, "style").unwrap_or("").to_string();
            let mut decls: Vec<Declaration> = stylesheet::parse_declarations(&existing)
                .into_iter()
                .filter(|d| !wanted.iter().any(|(p, _)| *p == d.property))
                .collect();
            decls.extend(wanted.iter().map(|(property, value)| Declaration {
                property: property.to_string(),
                value: value.to_string(),
                important: true,
            }));
            let style = render_declarations(&decls);
            if style == existing {
                continue;
            }
            let target = doc.locator(id);
            set_fixed(doc, id, KIND, "style", &style);
            attempts.push(FixAttempt::applied(KIND, target));
        }
    }
}
