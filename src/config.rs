// SPDX-License-Identifier: PMPL-1.0-or-later
//! Configuration handling for wcagfixbot
//!
//! Every detector and fix receives a `&Config`; there is no ambient global
//! state. Missing files and missing keys fall back to defaults.

use crate::error::{Error, Result};
use crate::issue::{FixKind, IssueType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

static LANGUAGE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{2,8})*$").expect("valid regex")
});

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Fix enablement; keys missing here use [`FixKind::default_enabled`]
    #[serde(default = "default_fixes")]
    pub fixes: BTreeMap<FixKind, bool>,

    /// Detector enablement; missing keys are enabled
    #[serde(default)]
    pub checks: BTreeMap<IssueType, bool>,

    /// Locale used when the page language has to be filled in
    #[serde(default = "default_site_locale")]
    pub site_locale: String,

    /// Owner-verified colors; matching elements skip contrast checking
    #[serde(default)]
    pub color_overrides: Vec<ColorOverride>,

    /// Attributes the fixer sets on matching elements
    #[serde(default)]
    pub aria_rules: Vec<AriaRule>,

    #[serde(default)]
    pub heuristics: Heuristics,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fixes: default_fixes(),
            checks: BTreeMap::new(),
            site_locale: default_site_locale(),
            color_overrides: Vec::new(),
            aria_rules: Vec::new(),
            heuristics: Heuristics::default(),
            session: SessionConfig::default(),
            log: LogConfig::default(),
        }
    }
}

fn default_fixes() -> BTreeMap<FixKind, bool> {
    FixKind::ALL
        .iter()
        .map(|kind| (*kind, kind.default_enabled()))
        .collect()
}

fn default_site_locale() -> String {
    "en-US".to_string()
}

impl Config {
    /// Whether a fix is enabled
    pub fn fix_enabled(&self, kind: FixKind) -> bool {
        self.fixes
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_enabled())
    }

    /// Whether a detector's output is kept
    pub fn check_enabled(&self, issue_type: IssueType) -> bool {
        self.checks.get(&issue_type).copied().unwrap_or(true)
    }

    /// Disable every fix, for baseline scans and dry runs
    pub fn without_fixes(&self) -> Self {
        let mut config = self.clone();
        config.fixes = FixKind::ALL.iter().map(|k| (*k, false)).collect();
        config
    }

    /// `site_locale` as a BCP 47 tag (`en_US` becomes `en-US`), or `None`
    /// when it is not a plausible language tag
    pub fn normalized_locale(&self) -> Option<String> {
        normalize_locale(&self.site_locale)
    }
}

/// Whether `tag` has the shape of a BCP 47 language tag
pub fn is_language_tag(tag: &str) -> bool {
    LANGUAGE_TAG.is_match(tag)
}

/// Normalize a POSIX or BCP 47 locale into BCP 47 form
pub fn normalize_locale(locale: &str) -> Option<String> {
    let tag = locale.trim().split('.').next().unwrap_or("").replace('_', "-");
    is_language_tag(&tag).then_some(tag)
}

/// Whether an issue type is fixed automatically under `config`
pub fn auto_fixable(issue_type: IssueType, config: &Config) -> bool {
    issue_type
        .meta()
        .fix
        .map(|kind| config.fix_enabled(kind))
        .unwrap_or(false)
}

/// Site-owner color assertion for elements matching `selector`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorOverride {
    pub selector: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub background: Option<String>,
}

/// Attribute the fixer sets on every element matching `selector`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AriaRule {
    pub selector: String,
    pub attribute: String,
    pub value: String,
}

/// Tunable heuristic thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heuristics {
    /// Score at which a video counts as decorative
    #[serde(default = "default_decorative_video_threshold")]
    pub decorative_video_threshold: u32,

    /// Score for a background/hero/ambient class hint
    #[serde(default = "default_two")]
    pub decorative_class_weight: u32,

    /// Score for muted + loop + no controls
    #[serde(default = "default_two")]
    pub decorative_playback_weight: u32,

    /// Score for absolute/fixed or negative z-index positioning
    #[serde(default = "default_one")]
    pub decorative_position_weight: u32,

    /// Modal confidence at which a missing close control is reported
    #[serde(default = "default_modal_confidence_threshold")]
    pub modal_confidence_threshold: u32,

    /// How far up the tree color resolution walks
    #[serde(default = "default_contrast_max_depth")]
    pub contrast_max_depth: usize,

    /// Direct text characters required before contrast is checked
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,

    /// Minimum interactive target edge in CSS pixels
    #[serde(default = "default_min_target_size_px")]
    pub min_target_size_px: f64,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            decorative_video_threshold: default_decorative_video_threshold(),
            decorative_class_weight: 2,
            decorative_playback_weight: 2,
            decorative_position_weight: 1,
            modal_confidence_threshold: default_modal_confidence_threshold(),
            contrast_max_depth: default_contrast_max_depth(),
            min_text_chars: default_min_text_chars(),
            min_target_size_px: default_min_target_size_px(),
        }
    }
}

fn default_decorative_video_threshold() -> u32 {
    2
}

fn default_one() -> u32 {
    1
}

fn default_two() -> u32 {
    2
}

fn default_modal_confidence_threshold() -> u32 {
    3
}

fn default_contrast_max_depth() -> usize {
    8
}

fn default_min_text_chars() -> usize {
    3
}

fn default_min_target_size_px() -> f64 {
    24.0
}

/// Two-pass session limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Delay between consecutive page scans
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Hard limit for one page scan
    #[serde(default = "default_page_timeout_secs")]
    pub page_timeout_secs: u64,

    /// Budget for a whole session; remaining pages are dropped past it
    #[serde(default = "default_session_budget_secs")]
    pub session_budget_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pacing_ms: default_pacing_ms(),
            page_timeout_secs: default_page_timeout_secs(),
            session_budget_secs: default_session_budget_secs(),
        }
    }
}

impl SessionConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn session_budget(&self) -> Duration {
        Duration::from_secs(self.session_budget_secs)
    }
}

fn default_pacing_ms() -> u64 {
    500
}

fn default_page_timeout_secs() -> u64 {
    30
}

fn default_session_budget_secs() -> u64 {
    90
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level for the wcagfixbot target (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn is_toml(path: &Path) -> bool {
    path.extension().map(|e| e == "toml").unwrap_or(false)
}

/// Load configuration from a path
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        debug!("Config file not found at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)?;

    let config: Config = if is_toml(path) {
        toml::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };

    if config.normalized_locale().is_none() {
        return Err(Error::Config(format!(
            "site_locale '{}' is not a language tag",
            config.site_locale
        )));
    }
    for rule in &config.aria_rules {
        if !(rule.attribute.starts_with("aria-") || rule.attribute == "role") {
            warn!(attribute = %rule.attribute, "ARIA rule sets a non-ARIA attribute");
        }
    }

    debug!(?config, "Loaded configuration");
    Ok(config)
}

/// Get the default config path for a site
pub fn default_config_path() -> PathBuf {
    PathBuf::from(".wcagfixbot/config.yml")
}

/// Write default configuration to a file
pub fn write_default_config(path: &Path) -> Result<()> {
    let config = Config::default();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = if is_toml(path) {
        toml::to_string_pretty(&config).map_err(|e| Error::Config(e.to_string()))?
    } else {
        serde_yaml::to_string(&config)?
    };

    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.fix_enabled(FixKind::MissingAlt));
        assert!(config.check_enabled(IssueType::LowContrast));
        assert_eq!(config.site_locale, "en-US");
        assert_eq!(config.heuristics.modal_confidence_threshold, 3);
        assert_eq!(config.session.page_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_auto_fixable_follows_enabled_fixes() {
        let mut config = Config::default();
        assert!(auto_fixable(IssueType::MissingAlt, &config));
        assert!(!auto_fixable(IssueType::LowContrast, &config));

        config.fixes.insert(FixKind::MissingAlt, false);
        assert!(!auto_fixable(IssueType::MissingAlt, &config));

        config.fixes.clear();
        assert!(auto_fixable(IssueType::MissingAlt, &config));
    }

    #[test]
    fn test_locale_normalization() {
        assert_eq!(normalize_locale("en_US").as_deref(), Some("en-US"));
        assert_eq!(normalize_locale("de_DE.UTF-8").as_deref(), Some("de-DE"));
        assert_eq!(normalize_locale("fr").as_deref(), Some("fr"));
        assert_eq!(normalize_locale(""), None);
        assert_eq!(normalize_locale("not a locale"), None);
    }

    #[test]
    fn test_yaml_config() {
        let yaml = r##"
fixes:
  missing_alt: false
checks:
  multiple_h1: false
site_locale: en_GB
color_overrides:
  - selector: ".hero h1"
    color: "#ffffff"
    background: "#000000"
heuristics:
  decorative_video_threshold: 3
"##;
        let config: Config = serde_yaml::from_str(yaml).expect("valid yaml");
        assert!(!config.fix_enabled(FixKind::MissingAlt));
        assert!(config.fix_enabled(FixKind::SkipLinks));
        assert!(!config.check_enabled(IssueType::MultipleH1));
        assert_eq!(config.normalized_locale().as_deref(), Some("en-GB"));
        assert_eq!(config.color_overrides.len(), 1);
        assert_eq!(config.heuristics.decorative_video_threshold, 3);
        assert_eq!(config.heuristics.min_text_chars, 3);
    }

    #[test]
    fn test_toml_config() {
        let toml_src = r#"
site_locale = "nl-NL"

[session]
pacing_ms = 0

[[aria_rules]]
selector = "nav.primary"
attribute = "aria-label"
value = "Primary"
"#;
        let config: Config = toml::from_str(toml_src).expect("valid toml");
        assert_eq!(config.session.pacing_ms, 0);
        assert_eq!(config.session.session_budget_secs, 90);
        assert_eq!(config.aria_rules[0].value, "Primary");
    }

    #[test]
    fn test_load_missing_config_uses_defaults() {
        let config = load_config(Path::new("/nonexistent/wcagfixbot.yml")).expect("defaults");
        assert_eq!(config.site_locale, "en-US");
    }

    #[test]
    fn test_write_and_reload_default_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/config.yml");
        write_default_config(&path).expect("write");
        let config = load_config(&path).expect("reload");
        assert!(config.fix_enabled(FixKind::ReducedMotion));
        assert_eq!(config.session.pacing_ms, 500);
    }
}
