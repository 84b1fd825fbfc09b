// SPDX-License-Identifier: PMPL-1.0-or-later
//! Report generation for scan results.
//!
//! Supports multiple output formats:
//! - Text: human-readable issues with WCAG criterion references
//! - JSON: structured reports for programmatic consumption
//! - SARIF: Static Analysis Results Interchange Format for IDE/CI integration
//!
//! Comparisons render as text or JSON; SARIF output for a comparison lists
//! the issues that survived the fix pass.

use crate::fixer::{FixOutcome, FixReport};
use crate::issue::{Issue, IssueType, ScanReport, Severity};
use crate::scoring::{self, ComparisonResult};
use serde::Serialize;
use std::collections::BTreeSet;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Structured JSON
    Json,
    /// SARIF for IDE/CI integration
    Sarif,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Sarif => write!(f, "sarif"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "sarif" => Ok(OutputFormat::Sarif),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// Generate a report for one or more scanned pages
pub fn generate_report(reports: &[ScanReport], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => generate_text_report(reports),
        OutputFormat::Json => generate_json_report(reports),
        OutputFormat::Sarif => generate_sarif_report(reports),
    }
}

/// Generate a report for a baseline/with-fixes comparison
pub fn generate_comparison_report(result: &ComparisonResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => generate_comparison_text(result),
        OutputFormat::Json => to_json(result, "comparison"),
        OutputFormat::Sarif => {
            let survivors: Vec<Issue> = result
                .remaining_issues
                .iter()
                .chain(result.unfixable_issues.iter())
                .cloned()
                .collect();
            let page = ScanReport::new("comparison", survivors);
            generate_sarif_report(std::slice::from_ref(&page))
        }
    }
}

fn to_json<T: Serialize>(value: &T, what: &str) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize {}: {}\"}}", what, e))
}

fn push_issue(output: &mut String, issue: &Issue) {
    output.push_str(&format!("[{}] {}\n", issue.issue_type, issue.message));

    if !issue.selector.is_empty() {
        output.push_str(&format!("  Element: {}\n", issue.selector));
    }

    if let (Some(criterion), Some(level)) = (&issue.wcag_criterion, &issue.wcag_level) {
        output.push_str(&format!("  WCAG: {} (Level {})\n", criterion, level));
    }

    if let Some(ref suggestion) = issue.suggestion {
        output.push_str(&format!("  Fix: {}\n", suggestion));
    }

    let groups = issue.impact.affected_groups();
    if !groups.is_empty() {
        output.push_str(&format!("  Affects: {}\n", groups.join(", ")));
    }

    if issue.auto_fixable {
        output.push_str("  Auto-fixable\n");
    }

    output.push('\n');
}

/// Generate human-readable text report
fn generate_text_report(reports: &[ScanReport]) -> String {
    let mut output = String::new();

    output.push_str("=== wcagfixbot Accessibility Report ===\n\n");

    for report in reports {
        output.push_str(&format!("## {}\n", report.url));

        if let Some(ref error) = report.error {
            output.push_str(&format!("Scan failed: {}\n\n", error));
            continue;
        }
        if report.parse_warnings > 0 {
            output.push_str(&format!(
                "Note: the parser recovered from {} markup error(s)\n",
                report.parse_warnings
            ));
        }
        if report.issues.is_empty() {
            output.push_str("No accessibility issues found. Score: 100/100\n\n");
            continue;
        }

        let summary = report.summary();
        output.push_str(&format!(
            "Found {} issue(s): {} critical, {} high, {} medium, {} low. Score: {}/100\n\n",
            summary.total, summary.critical, summary.high, summary.medium, summary.low, summary.score
        ));

        for severity in Severity::ALL {
            let issues = report.by_severity(severity);
            if issues.is_empty() {
                continue;
            }
            output.push_str(&format!("--- {} ({}) ---\n", severity, issues.len()));
            for issue in issues {
                push_issue(&mut output, issue);
            }
        }
    }

    if reports.len() > 1 {
        output.push_str(&format!(
            "Pages: {}. Overall score: {}/100\n",
            reports.len(),
            scoring::batch_score(reports)
        ));
    }

    if reports.iter().any(ScanReport::has_blocking) {
        output.push_str("RESULT: FAIL (critical or high issues found)\n");
    } else if reports.iter().any(|r| !r.is_clean()) {
        output.push_str("RESULT: PASS WITH WARNINGS\n");
    } else {
        output.push_str("RESULT: PASS\n");
    }

    output
}

/// Generate JSON report: a single object for one page, an array otherwise
fn generate_json_report(reports: &[ScanReport]) -> String {
    #[derive(Serialize)]
    struct PageJson<'a> {
        #[serde(flatten)]
        report: &'a ScanReport,
        summary: crate::issue::ScanSummary,
    }

    let pages: Vec<PageJson<'_>> = reports
        .iter()
        .map(|report| PageJson {
            report,
            summary: report.summary(),
        })
        .collect();

    match pages.as_slice() {
        [single] => to_json(single, "report"),
        _ => to_json(&pages, "reports"),
    }
}

fn generate_comparison_text(result: &ComparisonResult) -> String {
    let mut output = String::new();

    output.push_str("=== wcagfixbot Baseline vs With-Fixes ===\n\n");
    output.push_str(&format!(
        "Score: {} -> {} ({:+})\n",
        result.baseline_score, result.fixed_score, result.score_diff
    ));
    output.push_str(&format!(
        "Fixed: {}  Remaining: {}  Unfixable: {}\n\n",
        result.total_fixed(),
        result.remaining_issues.len(),
        result.unfixable_issues.len()
    ));

    if !result.by_type.is_empty() {
        output.push_str(&format!("{:<32} {:>7} {:>7} {:>7}\n", "Issue type", "Before", "After", "Fixed"));
        for row in &result.by_type {
            output.push_str(&format!(
                "{:<32} {:>7} {:>7} {:>7}\n",
                row.issue_type.as_str(),
                row.before,
                row.after,
                row.fixed
            ));
        }
        output.push('\n');
    }

    if result.pages.len() > 1 {
        output.push_str("--- Pages ---\n");
        for page in &result.pages {
            match (&page.error, page.fixed_score) {
                (Some(error), _) => output.push_str(&format!("{}: failed ({})\n", page.url, error)),
                (None, Some(fixed)) => {
                    output.push_str(&format!("{}: {} -> {}\n", page.url, page.baseline_score, fixed))
                }
                (None, None) => output.push_str(&format!("{}: {} -> not rescanned\n", page.url, page.baseline_score)),
            }
        }
        output.push('\n');
    }

    if !result.unfixable_issues.is_empty() {
        output.push_str(&format!(
            "--- Unfixable ({}): a fix ran but the issue remains ---\n",
            result.unfixable_issues.len()
        ));
        for issue in &result.unfixable_issues {
            push_issue(&mut output, issue);
        }
    }

    if !result.remaining_issues.is_empty() {
        output.push_str(&format!(
            "--- Remaining ({}): needs manual attention ---\n",
            result.remaining_issues.len()
        ));
        for issue in &result.remaining_issues {
            push_issue(&mut output, issue);
        }
    }

    output
}

/// One-line-per-attempt summary of a fix run
pub fn generate_fix_summary(report: &FixReport) -> String {
    let mut output = format!(
        "Applied {} fix(es), {} without a safe target, {} skipped\n",
        report.applied(),
        report.not_found(),
        report.skipped()
    );
    for attempt in &report.attempts {
        let line = match &attempt.outcome {
            FixOutcome::Applied => format!("  [{}] {}\n", attempt.fix, attempt.target),
            FixOutcome::NotFound(reason) => format!("  [{}] {}: not applied, {}\n", attempt.fix, attempt.target, reason),
            FixOutcome::Skipped(reason) => format!("  [{}] {}: skipped, {}\n", attempt.fix, attempt.target, reason),
        };
        output.push_str(&line);
    }
    output
}

/// SARIF report structure (simplified)
#[derive(Debug, Serialize)]
struct SarifReport {
    #[serde(rename = "$schema")]
    schema: String,
    version: String,
    runs: Vec<SarifRun>,
}

#[derive(Debug, Serialize)]
struct SarifRun {
    tool: SarifTool,
    results: Vec<SarifResult>,
}

#[derive(Debug, Serialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Debug, Serialize)]
struct SarifDriver {
    name: String,
    version: String,
    #[serde(rename = "informationUri")]
    information_uri: String,
    rules: Vec<SarifRule>,
}

#[derive(Debug, Serialize)]
struct SarifRule {
    id: String,
    #[serde(rename = "shortDescription")]
    short_description: SarifMessage,
    #[serde(rename = "helpUri", skip_serializing_if = "Option::is_none")]
    help_uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct SarifResult {
    #[serde(rename = "ruleId")]
    rule_id: String,
    level: String,
    message: SarifMessage,
    locations: Vec<SarifLocation>,
}

#[derive(Debug, Serialize)]
struct SarifMessage {
    text: String,
}

#[derive(Debug, Serialize)]
struct SarifLocation {
    #[serde(rename = "physicalLocation")]
    physical_location: SarifPhysicalLocation,
    #[serde(rename = "logicalLocations", skip_serializing_if = "Vec::is_empty")]
    logical_locations: Vec<SarifLogicalLocation>,
}

#[derive(Debug, Serialize)]
struct SarifPhysicalLocation {
    #[serde(rename = "artifactLocation")]
    artifact_location: SarifArtifactLocation,
}

#[derive(Debug, Serialize)]
struct SarifArtifactLocation {
    uri: String,
}

#[derive(Debug, Serialize)]
struct SarifLogicalLocation {
    #[serde(rename = "fullyQualifiedName")]
    fully_qualified_name: String,
    kind: String,
}

fn sarif_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical | Severity::High => "error",
        Severity::Medium => "warning",
        Severity::Low | Severity::Info => "note",
    }
}

/// Generate SARIF report
fn generate_sarif_report(reports: &[ScanReport]) -> String {
    let mut seen: BTreeSet<IssueType> = BTreeSet::new();
    let mut results = Vec::new();

    for report in reports {
        for issue in &report.issues {
            seen.insert(issue.issue_type);

            let logical_locations = if issue.selector.is_empty() {
                Vec::new()
            } else {
                vec![SarifLogicalLocation {
                    fully_qualified_name: issue.selector.clone(),
                    kind: "element".to_string(),
                }]
            };

            results.push(SarifResult {
                rule_id: issue.issue_type.as_str().to_string(),
                level: sarif_level(issue.severity).to_string(),
                message: SarifMessage { text: issue.message.clone() },
                locations: vec![SarifLocation {
                    physical_location: SarifPhysicalLocation {
                        artifact_location: SarifArtifactLocation { uri: report.url.clone() },
                    },
                    logical_locations,
                }],
            });
        }
    }

    let rules = seen
        .into_iter()
        .map(|t| SarifRule {
            id: t.as_str().to_string(),
            short_description: SarifMessage {
                text: t.meta().description.to_string(),
            },
            help_uri: t.wcag_reference(),
        })
        .collect();

    let report = SarifReport {
        schema: "https://json.schemastore.org/sarif-2.1.0.json".to_string(),
        version: "2.1.0".to_string(),
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: "wcagfixbot".to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    information_uri: "https://www.w3.org/TR/WCAG21/".to_string(),
                    rules,
                },
            },
            results,
        }],
    };

    to_json(&report, "SARIF report")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::fixer::fix_html;
    use crate::scanner::scan_html;

    fn sample_report() -> ScanReport {
        scan_html("index.html", r#"<img src="hero.png"><p>ok</p>"#, &Config::default())
    }

    #[test]
    fn test_text_report_empty() {
        let report = ScanReport::new("index.html", Vec::new());
        let text = generate_report(&[report], OutputFormat::Text);
        assert!(text.contains("No accessibility issues found"));
        assert!(text.contains("RESULT: PASS"));
    }

    #[test]
    fn test_text_report_with_issues() {
        let text = generate_report(&[sample_report()], OutputFormat::Text);
        assert!(text.contains("[missing_alt]"));
        assert!(text.contains("WCAG: 1.1.1 (Level A)"));
        assert!(text.contains("RESULT: FAIL"));
    }

    #[test]
    fn test_json_report() {
        let json = generate_report(&[sample_report()], OutputFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
        assert!(parsed["issues"].is_array());
        assert_eq!(parsed["issues"][0]["type"], "missing_alt");
        assert_eq!(parsed["summary"]["score"], 95);
    }

    #[test]
    fn test_json_report_multiple_pages_is_array() {
        let json = generate_report(&[sample_report(), sample_report()], OutputFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
        assert_eq!(parsed.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_sarif_report() {
        let sarif = generate_report(&[sample_report()], OutputFormat::Sarif);
        let parsed: serde_json::Value = serde_json::from_str(&sarif).expect("valid JSON");
        assert_eq!(parsed["version"], "2.1.0");
        assert_eq!(parsed["runs"][0]["results"][0]["ruleId"], "missing_alt");
        assert_eq!(parsed["runs"][0]["results"][0]["level"], "error");
        assert_eq!(parsed["runs"][0]["tool"]["driver"]["rules"][0]["id"], "missing_alt");
    }

    #[test]
    fn test_comparison_text_has_type_table() {
        let config = Config::default();
        let before = scan_html("p.html", "<img src=x><img src=y>", &config.without_fixes());
        let fixed = fix_html("<img src=x><img src=y>", &config);
        let after = scan_html("p.html", &fixed.html, &config);
        let result = scoring::compare(&[before], &[after], &config);

        let text = generate_comparison_report(&result, OutputFormat::Text);
        assert!(text.contains("Score: 90 -> 100 (+10)"));
        assert!(text.contains("missing_alt"));

        let json = generate_comparison_report(&result, OutputFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
        assert_eq!(parsed["fixed_issues"]["missing_alt"], 2);
    }

    #[test]
    fn test_fix_summary() {
        let fixed = fix_html(r#"<img src=x><a href="/y"></a>"#, &Config::default());
        let summary = generate_fix_summary(&fixed);
        assert!(summary.starts_with("Applied 1 fix(es), 1 without a safe target"));
        assert!(summary.contains("[missing_alt]"));
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("SARIF".parse::<OutputFormat>(), Ok(OutputFormat::Sarif));
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
