// SPDX-License-Identifier: PMPL-1.0-or-later
//! Integration tests for wcagfixbot

use std::path::Path;
use wcagfixbot::analyzers::analyze_html;
use wcagfixbot::config::{load_config, write_default_config, Config};
use wcagfixbot::fixer::{fix_html, FixOutcome};
use wcagfixbot::issue::{FixKind, Issue, IssueType, ScanReport, Severity};
use wcagfixbot::report::{generate_comparison_report, generate_report, OutputFormat};
use wcagfixbot::scanner::{self, Page};
use wcagfixbot::scoring;

fn fixture(name: &str) -> String {
    std::fs::read_to_string(Path::new("tests/fixtures").join(name)).expect("fixture should exist")
}

fn count(issues: &[Issue], t: IssueType) -> usize {
    issues.iter().filter(|i| i.issue_type == t).count()
}

fn quick_config() -> Config {
    let mut config = Config::default();
    config.session.pacing_ms = 0;
    config
}

#[test]
fn test_scan_accessible_fixture() {
    let report = scanner::scan_file(Path::new("tests/fixtures/accessible.html"), &Config::default())
        .expect("scan should succeed");

    let blocking: Vec<_> = report.issues.iter().filter(|i| i.severity.is_blocking()).collect();
    assert!(
        blocking.is_empty(),
        "Accessible fixture should have no blocking issues, got {:?}",
        blocking.iter().map(|i| (i.issue_type, &i.selector)).collect::<Vec<_>>()
    );
}

#[test]
fn test_scan_inaccessible_fixture() {
    let report = scanner::scan_file(Path::new("tests/fixtures/inaccessible.html"), &Config::default())
        .expect("scan should succeed");

    assert!(
        report.issues.len() >= 15,
        "Inaccessible fixture should have many issues, got {}",
        report.issues.len()
    );
    assert!(report.has_blocking());
    for t in [
        IssueType::MissingPageLanguage,
        IssueType::MissingPageTitle,
        IssueType::MissingMainLandmark,
        IssueType::MissingSkipLinks,
        IssueType::HeadingHierarchySkip,
        IssueType::LowContrast,
        IssueType::GenericLinkText,
        IssueType::KeyboardInaccessible,
        IssueType::PositiveTabindex,
        IssueType::MissingAriaControls,
        IssueType::RadioNoFieldset,
        IssueType::ButtonNoAccessibleName,
        IssueType::VideoAutoplayWithSound,
        IssueType::IframeMissingTitle,
        IssueType::BlinkingContent,
        IssueType::FocusIndicatorsRemoved,
        IssueType::MotionNoReducedPreference,
    ] {
        assert!(report.count(t) > 0, "expected a {} issue", t);
    }
    assert_eq!(report.count(IssueType::MissingAlt), 2);
    assert_eq!(report.count(IssueType::MissingLabel), 2);
}

#[test]
fn test_scan_partial_fixture() {
    let report = scanner::scan_file(Path::new("tests/fixtures/partial.html"), &Config::default())
        .expect("scan should succeed");

    assert_eq!(report.count(IssueType::MissingAlt), 1);
    assert_eq!(report.count(IssueType::GenericLinkText), 1);
    assert_eq!(report.count(IssueType::MissingLabel), 1);
    assert_eq!(report.count(IssueType::MissingPageLanguage), 0);
}

#[test]
fn test_bare_image_end_to_end() {
    let config = Config::default();
    let issues = analyze_html("<img src=x>", &config);
    assert_eq!(count(&issues, IssueType::MissingAlt), 1);
    let alt = issues
        .iter()
        .find(|i| i.issue_type == IssueType::MissingAlt)
        .expect("missing_alt issue");
    assert_eq!(alt.severity, Severity::High);
    assert!(alt.auto_fixable);

    let fixed = fix_html("<img src=x>", &config);
    assert!(fixed.html.contains(r#"alt="""#));
    assert_eq!(count(&analyze_html(&fixed.html, &config), IssueType::MissingAlt), 0);
}

#[test]
fn test_missing_page_language() {
    let issues = analyze_html(
        "<html><head><title>T</title></head><body><main><p>Hello there</p></main></body></html>",
        &Config::default(),
    );
    assert_eq!(count(&issues, IssueType::MissingPageLanguage), 1);
    assert_eq!(count(&issues, IssueType::InvalidPageLanguage), 0);
}

#[test]
fn test_duplicate_id_reports_first_occurrence() {
    let issues = analyze_html(
        r#"<html lang="en"><body><p id="dup">first</p><span id="dup">second</span></body></html>"#,
        &Config::default(),
    );
    let dups: Vec<&Issue> = issues.iter().filter(|i| i.issue_type == IssueType::DuplicateId).collect();
    assert_eq!(dups.len(), 1);
    let element = dups[0].element.as_ref().expect("element snapshot");
    assert_eq!(element.tag, "p");
    assert_eq!(element.text, "first");
}

#[test]
fn test_score_properties() {
    assert_eq!(scoring::score(&[]), 100);
    let critical = Issue::new(IssueType::VideoNoCaptions, "no captions");
    assert_eq!(critical.severity, Severity::Critical);
    assert_eq!(scoring::score(&[critical]), 90);
}

#[test]
fn test_diff_properties() {
    let config = Config::default();
    let alt = |n: usize| (0..n).map(|_| Issue::new(IssueType::MissingAlt, "alt")).collect::<Vec<_>>();
    let d = scoring::diff(&alt(5), &alt(1), &config);
    assert_eq!(d.fixed_count(IssueType::MissingAlt), 4);
    assert_eq!(d.unfixable.len(), 1);
    assert!(d.remaining.is_empty());

    let contrast = |n: usize| (0..n).map(|_| Issue::new(IssueType::LowContrast, "contrast")).collect::<Vec<_>>();
    let d = scoring::diff(&contrast(2), &contrast(2), &config);
    assert_eq!(d.remaining.len(), 2);
    assert_eq!(d.total_fixed(), 0);
    assert!(d.unfixable.is_empty());
}

#[test]
fn test_fixer_is_idempotent_on_fixtures() {
    let config = Config::default();
    for name in ["inaccessible.html", "partial.html", "accessible.html"] {
        let once = fix_html(&fixture(name), &config);
        let twice = fix_html(&once.html, &config);
        assert_eq!(once.html, twice.html, "{} changed on the second pass", name);
    }
}

#[test]
fn test_fixes_clear_fixable_issues() {
    let config = Config::default();
    let fixed = fix_html(&fixture("inaccessible.html"), &config);
    let after = analyze_html(&fixed.html, &config);

    for t in [
        IssueType::MissingAlt,
        IssueType::MissingLabel,
        IssueType::MissingPageLanguage,
        IssueType::MissingMainLandmark,
        IssueType::MissingSkipLinks,
        IssueType::HeadingHierarchySkip,
        IssueType::KeyboardInaccessible,
        IssueType::PositiveTabindex,
        IssueType::MissingAriaControls,
        IssueType::RadioNoFieldset,
        IssueType::RequiredNoAria,
        IssueType::VideoAutoplayWithSound,
        IssueType::IframeMissingTitle,
        IssueType::FocusIndicatorsRemoved,
        IssueType::MotionNoReducedPreference,
    ] {
        assert_eq!(count(&after, t), 0, "{} should be fixed", t);
    }

    // No title, no text: nothing safe to name these with
    assert_eq!(count(&after, IssueType::ButtonNoAccessibleName), 1);
    assert_eq!(count(&after, IssueType::LinkNoAccessibleName), 1);
    assert!(fixed
        .attempts
        .iter()
        .any(|a| a.fix == FixKind::LinkNames && matches!(a.outcome, FixOutcome::NotFound(_))));
}

#[test]
fn test_fragment_stays_a_fragment() {
    let fixed = fix_html(r#"<div><img src="a.png"></div>"#, &Config::default());
    assert!(!fixed.html.contains("<html"));
    assert!(!fixed.html.contains("<body"));
    assert!(fixed.html.starts_with("<div>"));
}

#[test]
fn test_compare_session_over_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    for name in ["accessible.html", "inaccessible.html", "partial.html"] {
        std::fs::write(dir.path().join(name), fixture(name)).expect("write fixture");
    }

    let pages = Page::load(dir.path()).expect("pages load");
    assert_eq!(pages.len(), 3);

    let session = scanner::run_session(&pages, &quick_config());
    assert!(!session.aborted);
    assert_eq!(session.baseline.len(), 3);
    assert_eq!(session.with_fixes.len(), 3);

    let result = &session.comparison;
    assert!(result.total_fixed() > 10);
    assert!(result.score_diff > 0);
    assert!(result.fixed_score >= result.baseline_score);
    assert!(result
        .unfixable_issues
        .iter()
        .any(|i| i.issue_type == IssueType::ButtonNoAccessibleName));
    assert!(result
        .remaining_issues
        .iter()
        .any(|i| i.issue_type == IssueType::LowContrast));

    let text = generate_comparison_report(result, OutputFormat::Text);
    assert!(text.contains("Issue type"));
    assert!(text.contains("missing_alt"));
}

#[test]
fn test_check_directory_reports() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("index.html"), fixture("partial.html")).expect("write");
    std::fs::write(dir.path().join("notes.txt"), "not html").expect("write");

    let reports = scanner::scan_directory(dir.path(), &Config::default()).expect("scan");
    assert_eq!(reports.len(), 1);

    let sarif = generate_report(&reports, OutputFormat::Sarif);
    let parsed: serde_json::Value = serde_json::from_str(&sarif).expect("valid JSON");
    assert_eq!(parsed["version"], "2.1.0");
    assert!(parsed["runs"][0]["results"].as_array().map(|r| r.len()).unwrap_or(0) >= 3);

    let json = generate_report(&reports, OutputFormat::Json);
    let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
    assert_eq!(parsed["summary"]["total"], reports[0].issues.len());
}

#[test]
fn test_batch_score_ignores_failed_pages() {
    let ok = ScanReport::new("a.html", vec![Issue::new(IssueType::MissingAlt, "alt")]);
    let failed = ScanReport::failed("b.html", "unreadable");
    assert_eq!(scoring::batch_score(&[ok, failed]), 95);
}

#[test]
fn test_yaml_config_disables_fix() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.yml");
    std::fs::write(
        &path,
        r#"
site_locale: fr_FR
fixes:
  missing_alt: false
aria_rules:
  - selector: "nav"
    attribute: aria-label
    value: Principal
"#,
    )
    .expect("write config");

    let config = load_config(&path).expect("config loads");
    assert!(!config.fix_enabled(FixKind::MissingAlt));
    assert!(config.fix_enabled(FixKind::MissingLabel));

    let html = "<html><body><nav><a href=\"/\">Accueil</a></nav><img src=\"x.png\"></body></html>";
    let fixed = fix_html(html, &config);
    assert!(fixed.html.contains(r#"lang="fr-FR""#));
    assert!(fixed.html.contains(r#"aria-label="Principal""#));
    assert!(!fixed.html.contains("alt="));

    let d = scoring::diff(&analyze_html(html, &config), &analyze_html(&fixed.html, &config), &config);
    assert_eq!(d.remaining_count(IssueType::MissingAlt), 1);
    assert_eq!(d.unfixable_count(IssueType::MissingAlt), 0);
}

#[test]
fn test_toml_config_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("wcagfixbot.toml");
    write_default_config(&path).expect("write default");

    let config = load_config(&path).expect("config loads");
    assert_eq!(config.site_locale, "en-US");
    assert_eq!(config.heuristics.decorative_video_threshold, 2);
    assert_eq!(config.session.page_timeout_secs, 30);
}

#[test]
fn test_missing_config_uses_defaults() {
    let config = load_config(Path::new("/nonexistent/wcagfixbot.yml")).expect("defaults");
    assert!(FixKind::ALL.iter().all(|k| config.fix_enabled(*k)));
}

#[test]
fn test_invalid_locale_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.yml");
    std::fs::write(&path, "site_locale: \"english please\"\n").expect("write config");
    assert!(load_config(&path).is_err());
}
