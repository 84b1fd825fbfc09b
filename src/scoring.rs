// SPDX-License-Identifier: PMPL-1.0-or-later
//! Severity-weighted scoring and baseline/with-fixes comparison.
//!
//! Score ranges:
//! - **100**: no scored issues
//! - **90-99**: a few low or medium findings
//! - **below 70**: several critical or high findings
//!
//! A page scores `max(0, 100 - Σ weight)`. A batch averages the summed
//! weight over the pages that were actually scanned, so many small pages
//! are not penalized like one page with the same absolute issue count.

use crate::config::{self, Config};
use crate::issue::{Issue, IssueType, ScanReport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Score of a single page
pub fn score(issues: &[Issue]) -> u32 {
    let penalty: u32 = issues.iter().map(Issue::weight).sum();
    100u32.saturating_sub(penalty)
}

/// Per-page averaged score of a batch. Pages that failed to scan are left
/// out; a batch with no scanned pages scores 100.
pub fn batch_score(reports: &[ScanReport]) -> u32 {
    let scanned: Vec<&ScanReport> = reports.iter().filter(|r| r.error.is_none()).collect();
    if scanned.is_empty() {
        return 100;
    }
    let penalty: u32 = scanned
        .iter()
        .flat_map(|r| r.issues.iter())
        .map(Issue::weight)
        .sum();
    let average = (penalty as f64 / scanned.len() as f64).round() as u32;
    100u32.saturating_sub(average)
}

/// Classification of two issue lists for the same page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueDiff {
    /// Per type, how many fewer issues the with-fixes scan found
    pub fixed: BTreeMap<IssueType, usize>,
    /// Still present and never auto-fixed under the config
    pub remaining: Vec<Issue>,
    /// Still present although the fix for its type was enabled
    pub unfixable: Vec<Issue>,
}

impl IssueDiff {
    pub fn fixed_count(&self, issue_type: IssueType) -> usize {
        self.fixed.get(&issue_type).copied().unwrap_or(0)
    }

    pub fn total_fixed(&self) -> usize {
        self.fixed.values().sum()
    }

    pub fn remaining_count(&self, issue_type: IssueType) -> usize {
        self.remaining.iter().filter(|i| i.issue_type == issue_type).count()
    }

    pub fn unfixable_count(&self, issue_type: IssueType) -> usize {
        self.unfixable.iter().filter(|i| i.issue_type == issue_type).count()
    }

    fn merge(&mut self, other: IssueDiff) {
        for (issue_type, count) in other.fixed {
            *self.fixed.entry(issue_type).or_insert(0) += count;
        }
        self.remaining.extend(other.remaining);
        self.unfixable.extend(other.unfixable);
    }
}

fn counts_by_type(issues: &[Issue]) -> BTreeMap<IssueType, usize> {
    let mut counts = BTreeMap::new();
    for issue in issues {
        *counts.entry(issue.issue_type).or_insert(0) += 1;
    }
    counts
}

/// Diff two scans of the same page by issue type counts.
///
/// A type whose count dropped contributes the drop to `fixed`. Every issue
/// still present in `with_fixes` is `unfixable` when its type is
/// auto-fixable under `config` (the fix ran and did not help) and
/// `remaining` otherwise.
pub fn diff(baseline: &[Issue], with_fixes: &[Issue], config: &Config) -> IssueDiff {
    let before = counts_by_type(baseline);
    let after = counts_by_type(with_fixes);

    let fixed = before
        .iter()
        .filter_map(|(issue_type, b)| {
            let a = after.get(issue_type).copied().unwrap_or(0);
            (*b > a).then(|| (*issue_type, b - a))
        })
        .collect();

    let (unfixable, remaining): (Vec<Issue>, Vec<Issue>) = with_fixes
        .iter()
        .cloned()
        .partition(|issue| config::auto_fixable(issue.issue_type, config));

    IssueDiff {
        fixed,
        remaining,
        unfixable,
    }
}

/// Before/after counts for one issue type, for tabular display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeComparison {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub before: usize,
    pub after: usize,
    pub fixed: usize,
}

/// Scores of one page in both passes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageComparison {
    pub url: String,
    pub baseline_score: u32,
    pub fixed_score: Option<u32>,
    pub error: Option<String>,
}

/// Baseline scan set paired with its with-fixes scan set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub fixed_issues: BTreeMap<IssueType, usize>,
    pub remaining_issues: Vec<Issue>,
    pub unfixable_issues: Vec<Issue>,
    pub baseline_score: u32,
    pub fixed_score: u32,
    pub score_diff: i32,
    pub by_type: Vec<TypeComparison>,
    pub pages: Vec<PageComparison>,
}

impl ComparisonResult {
    pub fn total_fixed(&self) -> usize {
        self.fixed_issues.values().sum()
    }

    /// Whether any blocking issue survived the fix pass
    pub fn has_blocking(&self) -> bool {
        self.remaining_issues
            .iter()
            .chain(self.unfixable_issues.iter())
            .any(|i| i.severity.is_blocking())
    }
}

/// Compare two scan sets of the same URL list.
///
/// Pages are paired by URL. A baseline page with no usable with-fixes scan
/// (the session was aborted, or the page failed) is listed in `pages` but
/// contributes nothing to the issue buckets.
pub fn compare(baseline: &[ScanReport], with_fixes: &[ScanReport], config: &Config) -> ComparisonResult {
    let mut total = IssueDiff::default();
    let mut before: BTreeMap<IssueType, usize> = BTreeMap::new();
    let mut after: BTreeMap<IssueType, usize> = BTreeMap::new();
    let mut pages = Vec::new();
    let mut paired_fixed: Vec<ScanReport> = Vec::new();
    let mut paired_baseline: Vec<ScanReport> = Vec::new();

    for base in baseline {
        let fixed = with_fixes
            .iter()
            .find(|r| r.url == base.url && r.error.is_none());

        pages.push(PageComparison {
            url: base.url.clone(),
            baseline_score: score(&base.issues),
            fixed_score: fixed.map(|r| score(&r.issues)),
            error: base.error.clone().or_else(|| {
                with_fixes
                    .iter()
                    .find(|r| r.url == base.url)
                    .and_then(|r| r.error.clone())
            }),
        });

        let Some(fixed) = fixed else {
            debug!(url = %base.url, "No with-fixes scan to compare");
            continue;
        };
        if base.error.is_some() {
            continue;
        }

        for (t, n) in counts_by_type(&base.issues) {
            *before.entry(t).or_insert(0) += n;
        }
        for (t, n) in counts_by_type(&fixed.issues) {
            *after.entry(t).or_insert(0) += n;
        }
        total.merge(diff(&base.issues, &fixed.issues, config));
        paired_baseline.push(base.clone());
        paired_fixed.push(fixed.clone());
    }

    let mut types: Vec<IssueType> = before.keys().chain(after.keys()).copied().collect();
    types.sort();
    types.dedup();
    let by_type = types
        .into_iter()
        .map(|t| {
            let b = before.get(&t).copied().unwrap_or(0);
            let a = after.get(&t).copied().unwrap_or(0);
            TypeComparison {
                issue_type: t,
                before: b,
                after: a,
                fixed: b.saturating_sub(a),
            }
        })
        .collect();

    let baseline_score = batch_score(&paired_baseline);
    let fixed_score = batch_score(&paired_fixed);

    ComparisonResult {
        fixed_issues: total.fixed,
        remaining_issues: total.remaining,
        unfixable_issues: total.unfixable,
        baseline_score,
        fixed_score,
        score_diff: fixed_score as i32 - baseline_score as i32,
        by_type,
        pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::Severity;

    fn issues(t: IssueType, n: usize) -> Vec<Issue> {
        (0..n).map(|_| Issue::new(t, "x")).collect()
    }

    #[test]
    fn test_score_empty_is_perfect() {
        assert_eq!(score(&[]), 100);
    }

    #[test]
    fn test_score_single_critical() {
        let critical = Issue::new(IssueType::VideoNoCaptions, "x");
        assert_eq!(critical.severity, Severity::Critical);
        assert_eq!(score(&[critical]), 90);
    }

    #[test]
    fn test_score_floors_at_zero() {
        assert_eq!(score(&issues(IssueType::VideoNoCaptions, 15)), 0);
    }

    #[test]
    fn test_batch_score_averages_per_page() {
        let reports = vec![
            ScanReport::new("a.html", issues(IssueType::MissingAlt, 4)),
            ScanReport::new("b.html", Vec::new()),
        ];
        // 20 points of penalty over two pages
        assert_eq!(batch_score(&reports), 90);
    }

    #[test]
    fn test_batch_score_skips_failed_pages() {
        let reports = vec![
            ScanReport::new("a.html", issues(IssueType::MissingAlt, 2)),
            ScanReport::failed("b.html", "boom"),
        ];
        assert_eq!(batch_score(&reports), 90);
        assert_eq!(batch_score(&[ScanReport::failed("c.html", "boom")]), 100);
    }

    #[test]
    fn test_diff_fixable_residue_is_unfixable() {
        let config = Config::default();
        let d = diff(
            &issues(IssueType::MissingAlt, 5),
            &issues(IssueType::MissingAlt, 1),
            &config,
        );
        assert_eq!(d.fixed_count(IssueType::MissingAlt), 4);
        assert_eq!(d.unfixable_count(IssueType::MissingAlt), 1);
        assert_eq!(d.remaining_count(IssueType::MissingAlt), 0);
    }

    #[test]
    fn test_diff_manual_issues_remain() {
        let config = Config::default();
        let d = diff(
            &issues(IssueType::LowContrast, 2),
            &issues(IssueType::LowContrast, 2),
            &config,
        );
        assert_eq!(d.fixed_count(IssueType::LowContrast), 0);
        assert_eq!(d.remaining_count(IssueType::LowContrast), 2);
        assert!(d.unfixable.is_empty());
    }

    #[test]
    fn test_diff_disabled_fix_counts_as_remaining() {
        let mut config = Config::default();
        config.fixes.insert(crate::issue::FixKind::MissingAlt, false);
        let d = diff(&issues(IssueType::MissingAlt, 1), &issues(IssueType::MissingAlt, 1), &config);
        assert_eq!(d.remaining_count(IssueType::MissingAlt), 1);
        assert!(d.unfixable.is_empty());
    }

    #[test]
    fn test_compare_pairs_by_url() {
        let config = Config::default();
        let baseline = vec![
            ScanReport::new("a.html", issues(IssueType::MissingAlt, 3)),
            ScanReport::new("b.html", issues(IssueType::LowContrast, 1)),
            ScanReport::new("c.html", issues(IssueType::MissingAlt, 1)),
        ];
        let with_fixes = vec![
            ScanReport::new("b.html", issues(IssueType::LowContrast, 1)),
            ScanReport::new("a.html", Vec::new()),
        ];
        let result = compare(&baseline, &with_fixes, &config);

        assert_eq!(result.total_fixed(), 3);
        assert_eq!(result.remaining_issues.len(), 1);
        assert!(result.unfixable_issues.is_empty());
        assert_eq!(result.pages.len(), 3);
        assert_eq!(result.pages[2].fixed_score, None);
        // (15 + 5) / 2 before, 5 / 2 after
        assert_eq!(result.baseline_score, 90);
        assert_eq!(result.fixed_score, 97);
        assert_eq!(result.score_diff, 7);

        let alt = result
            .by_type
            .iter()
            .find(|r| r.issue_type == IssueType::MissingAlt)
            .expect("missing_alt row");
        assert_eq!((alt.before, alt.after, alt.fixed), (3, 0, 3));
    }
}
