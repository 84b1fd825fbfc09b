// SPDX-License-Identifier: PMPL-1.0-or-later
//! wcagfixbot - WCAG 2.1 accessibility rule engine with auto-remediation
//!
//! Given an HTML document, wcagfixbot detects WCAG 2.1 violations, optionally
//! rewrites the document to fix the subset that has a safe mechanical repair,
//! and computes a reproducible severity-weighted score. A two-pass session
//! scans every page unmodified, scans it again with fixes applied, and sorts
//! each finding into fixed, remaining (never auto-fixed) or unfixable (a fix
//! ran and the issue is still there).
//!
//! ## Pipeline
//!
//! HTML → [`dom::Document`] → [`analyzers`] → [`issue::Issue`] list →
//! [`scoring::score`], or [`fixer`] then rescan → [`scoring::compare`].
//!
//! ## Analyzers
//!
//! - **Alt Text** (1.1.1): Image alternative text validation
//! - **Forms** (1.3.1/1.3.5/3.3.2): Labels, fieldsets, required state, autocomplete
//! - **Semantic** (1.3.1/2.4.2/2.4.6): Headings, landmarks, title, ids, tables
//! - **ARIA** (4.1.2): ARIA attribute and reference validation
//! - **Language** (3.1.1): Page language
//! - **Links** (2.4.4/4.1.2): Link and button names
//! - **Keyboard** (2.1.1/2.1.2/2.4.1/2.4.3/2.4.7): Keyboard access, traps, skip links, focus
//! - **Media** (1.2.2/1.4.2/2.2.2): Captions, autoplay, iframes, blinking content
//! - **Contrast** (1.4.3): Text contrast with stylesheet-aware color resolution
//! - **CSS** (1.4.12/2.3.3/2.5.8): Text spacing, reduced motion, target size

pub mod analyzers;
pub mod color;
pub mod config;
pub mod dom;
pub mod error;
pub mod fixer;
pub mod issue;
pub mod report;
pub mod scanner;
pub mod scoring;
pub mod selector;
pub mod stylesheet;

pub use config::Config;
pub use error::{Error, Result};
pub use issue::{Issue, IssueType, ScanReport, Severity};
