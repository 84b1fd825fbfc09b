// SPDX-License-Identifier: PMPL-1.0-or-later
//! Page scanning and the two-pass fix session.
//!
//! A single scan is synchronous. `scan_page` runs it on a worker thread so a
//! pathological document can be abandoned after the page timeout; the
//! session runs pages one at a time, pauses between them, and drops the
//! rest of the queue once the session budget is spent.

use crate::analyzers;
use crate::config::Config;
use crate::dom::Document;
use crate::error::Result;
use crate::fixer::{self, FixReport};
use crate::issue::{Issue, IssueType, ScanReport};
use crate::scoring::{self, ComparisonResult};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// File extensions to scan
const SCANNABLE_EXTENSIONS: &[&str] = &["html", "htm"];

/// Directories to skip
const SKIP_DIRS: &[&str] = &[
    "node_modules", ".git", "target", "dist", "build",
    "_build", "vendor", ".next", ".nuxt", "coverage",
];

/// Why a page produced no regular result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageFailure {
    TimedOut(Duration),
    Panicked,
}

/// Run `job` on a worker thread, waiting at most `timeout` for it.
///
/// A job that overruns is left to finish on its own; its result is
/// discarded.
pub fn run_with_timeout<T, F>(timeout: Duration, job: F) -> std::result::Result<T, PageFailure>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("wcagfixbot-page".to_string())
        .spawn(move || {
            // The receiver is gone once the caller has given up
            let _ = tx.send(job());
        });
    if spawned.is_err() {
        return Err(PageFailure::Panicked);
    }

    match rx.recv_timeout(timeout) {
        Ok(value) => Ok(value),
        Err(RecvTimeoutError::Timeout) => Err(PageFailure::TimedOut(timeout)),
        Err(RecvTimeoutError::Disconnected) => Err(PageFailure::Panicked),
    }
}

/// Analyze HTML source without a time limit
pub fn scan_html(url: &str, html: &str, config: &Config) -> ScanReport {
    let doc = Document::parse(html);
    let issues = analyzers::analyze_document(&doc, config);
    if doc.parse_errors() > 0 {
        debug!(url, errors = doc.parse_errors(), "Parser recovered from markup errors");
    }
    info!(url, issues = issues.len(), "Page scanned");
    ScanReport::new(url, issues).with_parse_warnings(doc.parse_errors())
}

fn timeout_report(url: &str, limit: Duration) -> ScanReport {
    warn!(url, seconds = limit.as_secs_f64(), "Page scan timed out");
    ScanReport::new(
        url,
        vec![Issue::new(
            IssueType::ScanTimeout,
            format!("Scan did not finish within {:.1}s; results for this page are incomplete.", limit.as_secs_f64()),
        )],
    )
}

fn failure_report(url: &str, failure: PageFailure) -> ScanReport {
    match failure {
        PageFailure::TimedOut(limit) => timeout_report(url, limit),
        PageFailure::Panicked => {
            warn!(url, "Page scan failed");
            ScanReport::failed(url, "analysis aborted unexpectedly")
        }
    }
}

/// Analyze HTML source under the configured page timeout
pub fn scan_page(url: &str, html: &str, config: &Config) -> ScanReport {
    scan_page_within(url, html, config, config.session.page_timeout())
}

fn scan_page_within(url: &str, html: &str, config: &Config, limit: Duration) -> ScanReport {
    let (owned_url, owned_html, owned_config) = (url.to_string(), html.to_string(), config.clone());
    run_with_timeout(limit, move || scan_html(&owned_url, &owned_html, &owned_config))
        .unwrap_or_else(|failure| failure_report(url, failure))
}

/// Fix a page then analyze the result, under one timeout
fn fix_and_scan_within(
    url: &str,
    html: &str,
    config: &Config,
    limit: Duration,
) -> (ScanReport, Option<FixReport>) {
    let (owned_url, owned_html, owned_config) = (url.to_string(), html.to_string(), config.clone());
    let outcome = run_with_timeout(limit, move || {
        let fixed = fixer::fix_html(&owned_html, &owned_config);
        let report = scan_html(&owned_url, &fixed.html, &owned_config);
        (report, fixed)
    });
    match outcome {
        Ok((report, fixed)) => (report, Some(fixed)),
        Err(failure) => (failure_report(url, failure), None),
    }
}

/// Scan a single file
pub fn scan_file(path: &Path, config: &Config) -> Result<ScanReport> {
    let content = std::fs::read_to_string(path)?;
    Ok(scan_page(&path.display().to_string(), &content, config))
}

/// HTML files under `dir`, sorted, skipping dependency and build directories
pub fn html_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_str().unwrap_or("");
            if e.file_type().is_dir() && e.depth() > 0 {
                return !SKIP_DIRS.contains(&name) && !name.starts_with('.');
            }
            true
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .map(|e| SCANNABLE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

/// Scan every HTML file in a directory tree
pub fn scan_directory(dir: &Path, config: &Config) -> Result<Vec<ScanReport>> {
    info!("Scanning directory: {}", dir.display());

    let mut reports = Vec::new();
    for path in html_files(dir) {
        match scan_file(&path, config) {
            Ok(report) => reports.push(report),
            Err(e) => {
                info!("Skipping {}: {}", path.display(), e);
            }
        }
    }

    let issues: usize = reports.iter().map(|r| r.issues.len()).sum();
    info!("Scanned {} files, found {} issues", reports.len(), issues);
    Ok(reports)
}

/// One page queued for a session
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub html: String,
}

impl Page {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }

    /// Every HTML file under `path`, or `path` itself when it is a file
    pub fn load(path: &Path) -> Result<Vec<Page>> {
        let files = if path.is_dir() {
            html_files(path)
        } else {
            vec![path.to_path_buf()]
        };
        files
            .into_iter()
            .map(|file| {
                let html = std::fs::read_to_string(&file)?;
                Ok(Page::new(file.display().to_string(), html))
            })
            .collect()
    }
}

/// Everything a two-pass session produced
#[derive(Debug, Clone)]
pub struct SessionResult {
    pub baseline: Vec<ScanReport>,
    pub with_fixes: Vec<ScanReport>,
    /// Fixer output per page, in `with_fixes` order
    pub fixes: Vec<(String, FixReport)>,
    pub comparison: ComparisonResult,
    /// Set when the session budget ran out before every page was scanned
    pub aborted: bool,
}

/// Remaining budget, or `None` once it is spent
fn remaining(started: Instant, budget: Duration) -> Option<Duration> {
    budget.checked_sub(started.elapsed()).filter(|d| !d.is_zero())
}

/// Scan every page with fixes disabled, then again with fixes applied, and
/// compare the two passes
pub fn run_session(pages: &[Page], config: &Config) -> SessionResult {
    let session = &config.session;
    let started = Instant::now();
    let baseline_config = config.without_fixes();
    let mut aborted = false;

    info!(pages = pages.len(), "Starting two-pass session");

    let mut baseline = Vec::new();
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            thread::sleep(session.pacing());
        }
        let Some(left) = remaining(started, session.session_budget()) else {
            aborted = true;
            break;
        };
        let limit = left.min(session.page_timeout());
        baseline.push(scan_page_within(&page.url, &page.html, &baseline_config, limit));
    }

    let mut with_fixes = Vec::new();
    let mut fixes = Vec::new();
    for (i, page) in pages.iter().enumerate().take(baseline.len()) {
        thread::sleep(session.pacing());
        let Some(left) = remaining(started, session.session_budget()) else {
            aborted = true;
            break;
        };
        let limit = left.min(session.page_timeout());
        let (report, fixed) = fix_and_scan_within(&page.url, &page.html, config, limit);
        if let Some(fixed) = fixed {
            debug!(url = %page.url, applied = fixed.applied(), "Fix pass done");
            fixes.push((page.url.clone(), fixed));
        }
        with_fixes.push(report);
        debug!(page = i + 1, "With-fixes scan complete");
    }

    if aborted {
        warn!(
            scanned = baseline.len(),
            fixed = with_fixes.len(),
            total = pages.len(),
            "Session budget exhausted, remaining pages dropped"
        );
        // Mark the first page the session never reached in the fix pass
        if let Some(page) = pages.get(with_fixes.len()) {
            with_fixes.push(ScanReport::new(
                page.url.clone(),
                vec![Issue::new(
                    IssueType::ScanTimeout,
                    "Session budget exhausted before this page was rescanned.",
                )],
            ));
        }
    }

    let comparison = scoring::compare(&baseline, &with_fixes, config);
    info!(
        baseline_score = comparison.baseline_score,
        fixed_score = comparison.fixed_score,
        fixed = comparison.total_fixed(),
        "Session finished"
    );

    SessionResult {
        baseline,
        with_fixes,
        fixes,
        comparison,
        aborted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config() -> Config {
        let mut config = Config::default();
        config.session.pacing_ms = 0;
        config
    }

    #[test]
    fn test_scan_nonexistent_dir() {
        let result = scan_directory(Path::new("/nonexistent/path"), &Config::default());
        assert!(result.is_ok());
        assert!(result.unwrap_or_default().is_empty());
    }

    #[test]
    fn test_scan_html_counts_parse_warnings() {
        let report = scan_html("inline", "<p><b>unclosed</p></i>", &Config::default());
        assert!(report.parse_warnings > 0);
        assert!(report.error.is_none());
    }

    #[test]
    fn test_timeout_yields_marker() {
        let result = run_with_timeout(Duration::from_millis(20), || {
            thread::sleep(Duration::from_millis(500));
            1
        });
        assert_eq!(result, Err(PageFailure::TimedOut(Duration::from_millis(20))));

        let report = failure_report("slow.html", PageFailure::TimedOut(Duration::from_millis(20)));
        assert_eq!(report.count(IssueType::ScanTimeout), 1);
        assert!(report.error.is_none());
    }

    #[test]
    fn test_panic_sets_error() {
        let result: std::result::Result<u32, _> = run_with_timeout(Duration::from_secs(5), || panic!("bad page"));
        assert_eq!(result, Err(PageFailure::Panicked));

        let report = failure_report("bad.html", PageFailure::Panicked);
        assert!(report.error.is_some());
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_session_fixes_missing_alt() {
        let pages = vec![
            Page::new("a.html", "<img src=x>"),
            Page::new("b.html", "<p style=\"color: #777; background-color: #888\">low contrast</p>"),
        ];
        let result = run_session(&pages, &quick_config());

        assert!(!result.aborted);
        assert_eq!(result.baseline.len(), 2);
        assert_eq!(result.with_fixes.len(), 2);
        assert_eq!(result.baseline[0].count(IssueType::MissingAlt), 1);
        assert!(!result.baseline[0].issues[0].auto_fixable);
        assert_eq!(result.with_fixes[0].count(IssueType::MissingAlt), 0);
        assert_eq!(result.comparison.fixed_issues.get(&IssueType::MissingAlt), Some(&1));
        assert_eq!(
            result.comparison.remaining_issues.iter().filter(|i| i.issue_type == IssueType::LowContrast).count(),
            1
        );
        assert!(result.comparison.score_diff > 0);
    }

    #[test]
    fn test_session_budget_aborts_queue() {
        let mut config = quick_config();
        config.session.session_budget_secs = 0;
        let pages = vec![Page::new("a.html", "<img src=x>")];
        let result = run_session(&pages, &config);
        assert!(result.aborted);
        assert!(result.baseline.is_empty());
    }

    #[test]
    fn test_html_files_skips_vendor_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("node_modules/pkg")).expect("mkdir");
        std::fs::write(dir.path().join("index.html"), "<p>x</p>").expect("write");
        std::fs::write(dir.path().join("about.HTM"), "<p>x</p>").expect("write");
        std::fs::write(dir.path().join("style.css"), "p {}").expect("write");
        std::fs::write(dir.path().join("node_modules/pkg/demo.html"), "<p>x</p>").expect("write");

        let files = html_files(dir.path());
        assert_eq!(files.len(), 2);
    }
}
