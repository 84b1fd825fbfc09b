// SPDX-License-Identifier: PMPL-1.0-or-later
//! Media accessibility analyzer - WCAG 1.2.2 Captions (Level A),
//! 1.4.2 Audio Control (Level A), 2.2.2 Pause, Stop, Hide (Level A),
//! 4.1.2 Name, Role, Value (Level A)
//!
//! Checks media element accessibility:
//! - Auto-playing video does not play sound
//! - Content video has a captions or subtitles track
//! - Decorative background video is hidden from assistive technology
//! - Iframes have a title
//! - No blinking or marquee content

use crate::analyzers::{is_aria_hidden, is_hidden, labelledby_text, Analyzer, Context};
use crate::dom::{Document, NodeId};
use crate::issue::{Issue, IssueType, Severity};
use tracing::debug;

/// Class or id fragments typical of background and hero videos
const DECORATIVE_HINTS: &[&str] = &[
    "background", "bg-", "bg_", "hero", "ambient", "decorative", "backdrop", "cover-video",
];

/// Media accessibility analyzer
pub struct MediaAnalyzer;

impl Analyzer for MediaAnalyzer {
    fn name(&self) -> &str {
        "Media Accessibility Analyzer"
    }

    fn description(&self) -> &str {
        "Checks video captions, autoplay, iframes and blinking content (WCAG 1.2.2, 1.4.2, 2.2.2, 4.1.2)"
    }

    fn analyze(&self, ctx: &Context<'_>) -> Vec<Issue> {
        let mut issues = Vec::new();

        check_videos(ctx, &mut issues);
        check_iframes(ctx.doc, &mut issues);
        check_blinking(ctx, &mut issues);

        issues
    }
}

/// Decorative-video score: class hints, silent looping playback without
/// controls, and background-style positioning each add their configured
/// weight
pub fn decorative_score(ctx: &Context<'_>, video: NodeId) -> u32 {
    let doc = ctx.doc;
    let weights = &ctx.config.heuristics;
    let mut score = 0;

    let hint_source = format!(
        "{} {}",
        doc.attr(video, "class").unwrap_or(""),
        doc.attr(video, "id").unwrap_or("")
    )
    .to_lowercase();
    let parent_hint = doc
        .parent_element(video)
        .and_then(|p| doc.attr(p, "class"))
        .map(|c| c.to_lowercase())
        .unwrap_or_default();
    if DECORATIVE_HINTS
        .iter()
        .any(|h| hint_source.contains(h) || parent_hint.contains(h))
    {
        score += weights.decorative_class_weight;
    }

    if doc.has_attr(video, "muted") && doc.has_attr(video, "loop") && !doc.has_attr(video, "controls") {
        score += weights.decorative_playback_weight;
    }

    let positioned = ctx
        .styles
        .declared(video, "position")
        .map(|p| matches!(p.trim().to_ascii_lowercase().as_str(), "absolute" | "fixed"))
        .unwrap_or(false);
    let behind = ctx
        .styles
        .declared(video, "z-index")
        .and_then(|z| z.trim().parse::<i32>().ok())
        .map(|z| z < 0)
        .unwrap_or(false);
    if positioned || behind {
        score += weights.decorative_position_weight;
    }

    score
}

/// Whether a video reads as decoration rather than content
pub fn is_decorative_video(ctx: &Context<'_>, video: NodeId) -> bool {
    let score = decorative_score(ctx, video);
    debug!(score, "Decorative video score");
    score >= ctx.config.heuristics.decorative_video_threshold
}

fn has_captions(doc: &Document, video: NodeId) -> bool {
    doc.element_children(video).any(|child| {
        doc.is_tag(child, "track")
            && matches!(
                doc.attr(child, "kind").map(|k| k.trim().to_ascii_lowercase()).as_deref(),
                Some("captions") | Some("subtitles")
            )
    })
}

fn check_videos(ctx: &Context<'_>, issues: &mut Vec<Issue>) {
    let doc = ctx.doc;

    for video in doc.elements_by_tag("video") {
        if is_hidden(doc, video) {
            continue;
        }
        let autoplay = doc.has_attr(video, "autoplay");

        if autoplay && !doc.has_attr(video, "muted") {
            issues.push(
                Issue::new(
                    IssueType::VideoAutoplayWithSound,
                    "Video plays automatically with sound. Audio that starts on its own interferes with screen readers.",
                )
                .at(doc, video)
                .with_suggestion("Add the muted attribute, or remove autoplay and let users start playback"),
            );
        }

        if is_decorative_video(ctx, video) {
            if autoplay && !is_aria_hidden(doc, video) {
                issues.push(
                    Issue::new(
                        IssueType::DecorativeVideoNotHidden,
                        "Decorative background video is exposed to assistive technology.",
                    )
                    .at(doc, video)
                    .with_severity(Severity::Low)
                    .with_suggestion("Add aria-hidden=\"true\" to the decorative video"),
                );
            }
            continue;
        }

        if !is_aria_hidden(doc, video) && !has_captions(doc, video) {
            issues.push(
                Issue::new(
                    IssueType::VideoNoCaptions,
                    "Video has no captions or subtitles track. Deaf and hard-of-hearing users cannot access its audio.",
                )
                .at(doc, video)
                .with_suggestion(
                    "Add <track kind=\"captions\" src=\"captions.vtt\" srclang=\"en\" label=\"English\"> inside the <video> element",
                ),
            );
        }
    }
}

fn check_iframes(doc: &Document, issues: &mut Vec<Issue>) {
    for frame in doc.elements_by_tag("iframe") {
        if is_hidden(doc, frame) || is_aria_hidden(doc, frame) {
            continue;
        }
        let named = doc.non_empty_attr(frame, "title").is_some()
            || doc.non_empty_attr(frame, "aria-label").is_some()
            || !labelledby_text(doc, frame).is_empty();
        if named {
            continue;
        }
        issues.push(
            Issue::new(
                IssueType::IframeMissingTitle,
                "Iframe has no title describing its content.",
            )
            .at(doc, frame)
            .with_suggestion("Add a title attribute, e.g. title=\"Embedded map\""),
        );
    }
}

fn check_blinking(ctx: &Context<'_>, issues: &mut Vec<Issue>) {
    let doc = ctx.doc;

    for id in doc.elements() {
        let tag = doc.tag(id).unwrap_or("");
        if tag == "marquee" || tag == "blink" {
            issues.push(
                Issue::new(
                    IssueType::BlinkingContent,
                    format!("<{}> moves or blinks and cannot be paused.", tag),
                )
                .at(doc, id)
                .with_suggestion("Replace it with static content"),
            );
            continue;
        }
        let blinks = ctx
            .styles
            .inline(id)
            .iter()
            .any(|d| d.property.starts_with("text-decoration") && d.value.to_lowercase().contains("blink"));
        if blinks {
            issues.push(
                Issue::new(IssueType::BlinkingContent, "Inline style uses text-decoration: blink.")
                    .at(doc, id)
                    .with_suggestion("Remove the blink decoration"),
            );
        }
    }

    for (selector, decl) in ctx.styles.stylesheet().all_declarations() {
        if decl.property.starts_with("text-decoration") && decl.value.to_lowercase().contains("blink") {
            issues.push(
                Issue::new(
                    IssueType::BlinkingContent,
                    format!("CSS rule \"{}\" uses text-decoration: blink.", selector),
                )
                .with_selector(selector)
                .with_suggestion("Remove the blink decoration"),
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
        MediaAnalyzer.analyze(&Context::new(&doc, &config))
    }

    fn of_type(issues: &[Issue], t: IssueType) -> Vec<&Issue> {
        issues.iter().filter(|i| i.issue_type == t).collect()
    }

    #[test]
    fn test_video_with_captions() {
        let html = r#"
            <video controls>
                <source src="video.mp4" type="video/mp4">
                <track kind="captions" src="captions.vtt" srclang="en" label="English">
            </video>
        "#;
        assert!(run(html).is_empty());
    }

    #[test]
    fn test_video_no_captions() {
        let issues = run(r#"<video controls><source src="video.mp4"></video>"#);
        let captions = of_type(&issues, IssueType::VideoNoCaptions);
        assert_eq!(captions.len(), 1);
        assert_eq!(captions[0].severity, Severity::Critical);
    }

    #[test]
    fn test_autoplay_with_sound() {
        let issues = run(r#"<video autoplay controls src="talk.mp4"><track kind="subtitles" src="s.vtt"></video>"#);
        assert_eq!(of_type(&issues, IssueType::VideoAutoplayWithSound).len(), 1);

        let muted = run(r#"<video autoplay muted controls src="talk.mp4"><track kind="captions" src="c.vtt"></video>"#);
        assert!(of_type(&muted, IssueType::VideoAutoplayWithSound).is_empty());
    }

    #[test]
    fn test_decorative_video_is_not_penalized_for_captions() {
        let issues = run(r#"<video class="hero-background" autoplay muted loop playsinline src="bg.mp4"></video>"#);
        assert!(of_type(&issues, IssueType::VideoNoCaptions).is_empty());
        let hidden = of_type(&issues, IssueType::DecorativeVideoNotHidden);
        assert_eq!(hidden.len(), 1);
        assert_eq!(hidden[0].severity, Severity::Low);

        let fixed = run(r#"<video class="hero-background" autoplay muted loop aria-hidden="true" src="bg.mp4"></video>"#);
        assert!(fixed.is_empty());
    }

    #[test]
    fn test_decorative_threshold_is_configurable() {
        let doc = Document::parse(r#"<video autoplay muted src="clip.mp4" style="position: absolute"></video>"#);
        let video = doc.first_by_tag("video").expect("video element");
        let mut config = Config::default();
        assert!(!is_decorative_video(&Context::new(&doc, &config), video));

        config.heuristics.decorative_video_threshold = 1;
        assert!(is_decorative_video(&Context::new(&doc, &config), video));
    }

    #[test]
    fn test_iframe_title() {
        let issues = run(
            r#"<iframe src="https://maps.example.com"></iframe>
               <iframe src="/a" title="Store map"></iframe>
               <iframe src="/b" aria-hidden="true"></iframe>
               <iframe src="/c" title=" "></iframe>"#,
        );
        assert_eq!(of_type(&issues, IssueType::IframeMissingTitle).len(), 2);
    }

    #[test]
    fn test_blinking_content() {
        let issues = run(
            r#"<style>.sale { text-decoration: blink; }</style>
               <marquee>News</marquee><span style="text-decoration: underline blink">Hot</span>"#,
        );
        assert_eq!(of_type(&issues, IssueType::BlinkingContent).len(), 3);
    }
}
