// SPDX-License-Identifier: PMPL-1.0-or-later
//! Language analyzer - WCAG 3.1.1 Language of Page (Level A)
//!
//! The `<html>` element must carry a `lang` attribute holding a well-formed
//! language tag. Only complete pages are checked.

use crate::analyzers::{Analyzer, Context};
use crate::config::is_language_tag;
use crate::issue::{Issue, IssueType};

/// Language analyzer
pub struct LanguageAnalyzer;

impl Analyzer for LanguageAnalyzer {
    fn name(&self) -> &str {
        "Language Analyzer"
    }

    fn description(&self) -> &str {
        "Checks the page language attribute (WCAG 3.1.1)"
    }

    fn analyze(&self, ctx: &Context<'_>) -> Vec<Issue> {
        if !ctx.is_full_document() {
            return Vec::new();
        }
        let doc = ctx.doc;
        let Some(html) = doc.html_element() else {
            return Vec::new();
        };

        match doc.attr(html, "lang") {
            None => vec![Issue::new(
                IssueType::MissingPageLanguage,
                "The <html> element is missing a lang attribute. Screen readers need this to pick the right pronunciation.",
            )
            .with_selector("html")
            .with_suggestion("Add lang=\"en\" (or the page's language) to <html>")],
            Some(lang) if !is_language_tag(lang.trim()) => vec![Issue::new(
                IssueType::InvalidPageLanguage,
                if lang.trim().is_empty() {
                    "The <html> lang attribute is empty.".to_string()
                } else {
                    format!("The <html> lang attribute \"{}\" is not a valid language tag.", lang)
                },
            )
            .with_selector("html")
            .with_suggestion("Use a BCP 47 tag such as \"en\" or \"en-US\"")],
            Some(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dom::Document;

    fn run(html: &str) -> Vec<Issue> {
        let doc = Document::parse(html);
        let config = Config::default();
        LanguageAnalyzer.analyze(&Context::new(&doc, &config))
    }

    #[test]
    fn test_valid_lang() {
        assert!(run(r#"<html lang="en-GB"><body>x</body></html>"#).is_empty());
        assert!(run(r#"<html lang="zh-Hans-CN"><body>x</body></html>"#).is_empty());
    }

    #[test]
    fn test_missing_lang() {
        let issues = run("<html><body>x</body></html>");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::MissingPageLanguage);
        assert_eq!(issues[0].selector, "html");
    }

    #[test]
    fn test_invalid_lang() {
        for lang in ["", "  ", "english please", "en_US"] {
            let issues = run(&format!(r#"<html lang="{}"><body>x</body></html>"#, lang));
            assert_eq!(issues.len(), 1, "lang={:?}", lang);
            assert_eq!(issues[0].issue_type, IssueType::InvalidPageLanguage);
        }
    }

    #[test]
    fn test_fragment_not_checked() {
        assert!(run("<p>hello</p>").is_empty());
    }
}
