// SPDX-License-Identifier: PMPL-1.0-or-later
//! Issue taxonomy and scan results.
//!
//! `IssueType` is a closed enum: its snake_case name is the join key between
//! detection, fixing, configuration and diffing, so renaming a variant is a
//! breaking change for every consumer of the JSON output. All classification
//! metadata (severity, WCAG criterion, fixability) lives in one table,
//! [`IssueType::meta`].

use crate::dom::{Document, ElementDetails, NodeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issue severity. Declaration order is most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    /// Informational, never scored
    Info,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    /// Score penalty for one issue of this severity
    pub fn weight(&self) -> u32 {
        match self {
            Severity::Critical => 10,
            Severity::High => 5,
            Severity::Medium => 3,
            Severity::Low => 1,
            Severity::Info => 0,
        }
    }

    /// Whether a remaining issue of this severity fails a CI run
    pub fn is_blocking(&self) -> bool {
        matches!(self, Severity::Critical | Severity::High)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::High => write!(f, "HIGH"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::Low => write!(f, "LOW"),
            Severity::Info => write!(f, "INFO"),
        }
    }
}

/// WCAG conformance level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WcagLevel {
    /// Level A - minimum conformance
    A,
    /// Level AA - standard conformance
    AA,
    /// Level AAA - enhanced conformance
    AAA,
}

impl std::fmt::Display for WcagLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WcagLevel::A => write!(f, "A"),
            WcagLevel::AA => write!(f, "AA"),
            WcagLevel::AAA => write!(f, "AAA"),
        }
    }
}

/// Who is affected by an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImpactAssessment {
    /// Screen reader users
    pub blind: bool,
    pub low_vision: bool,
    /// Keyboard and switch users
    pub motor: bool,
    pub cognitive: bool,
    /// Deaf and hard-of-hearing users
    pub deaf: bool,
}

impl ImpactAssessment {
    const NONE: Self = Self {
        blind: false,
        low_vision: false,
        motor: false,
        cognitive: false,
        deaf: false,
    };

    pub const fn blind() -> Self {
        Self { blind: true, ..Self::NONE }
    }

    pub const fn low_vision() -> Self {
        Self { low_vision: true, ..Self::NONE }
    }

    pub const fn motor() -> Self {
        Self { motor: true, ..Self::NONE }
    }

    pub const fn cognitive() -> Self {
        Self { cognitive: true, ..Self::NONE }
    }

    pub const fn deaf() -> Self {
        Self { deaf: true, ..Self::NONE }
    }

    /// Blind and low-vision users
    pub const fn visual() -> Self {
        Self { blind: true, low_vision: true, ..Self::NONE }
    }

    /// Blind and motor-impaired users, the keyboard-only population
    pub const fn keyboard() -> Self {
        Self { blind: true, motor: true, ..Self::NONE }
    }

    pub const fn none() -> Self {
        Self::NONE
    }

    /// Describe affected groups
    pub fn affected_groups(&self) -> Vec<&'static str> {
        let mut groups = Vec::new();
        if self.blind { groups.push("blind"); }
        if self.low_vision { groups.push("low-vision"); }
        if self.motor { groups.push("motor"); }
        if self.cognitive { groups.push("cognitive"); }
        if self.deaf { groups.push("deaf/hard-of-hearing"); }
        groups
    }
}

/// A fix the transformer knows how to apply. Keys of the `fixes` config map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixKind {
    MissingAlt,
    MissingLabel,
    HeadingHierarchy,
    MainLandmark,
    AriaControls,
    PageLanguage,
    LinkNames,
    KeyboardAccess,
    PositiveTabindex,
    SkipLinks,
    FocusIndicators,
    VideoAutoplay,
    DecorativeVideo,
    RadioFieldset,
    RequiredAria,
    IframeTitle,
    InputPurpose,
    ReducedMotion,
    AriaRules,
    ColorOverrides,
}

impl FixKind {
    /// Application order used by the fixer
    pub const ALL: [FixKind; 20] = [
        FixKind::PageLanguage,
        FixKind::MissingAlt,
        FixKind::MissingLabel,
        FixKind::HeadingHierarchy,
        FixKind::MainLandmark,
        FixKind::SkipLinks,
        FixKind::AriaControls,
        FixKind::LinkNames,
        FixKind::KeyboardAccess,
        FixKind::PositiveTabindex,
        FixKind::FocusIndicators,
        FixKind::VideoAutoplay,
        FixKind::DecorativeVideo,
        FixKind::RadioFieldset,
        FixKind::RequiredAria,
        FixKind::IframeTitle,
        FixKind::InputPurpose,
        FixKind::ReducedMotion,
        FixKind::AriaRules,
        FixKind::ColorOverrides,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FixKind::MissingAlt => "missing_alt",
            FixKind::MissingLabel => "missing_label",
            FixKind::HeadingHierarchy => "heading_hierarchy",
            FixKind::MainLandmark => "main_landmark",
            FixKind::AriaControls => "aria_controls",
            FixKind::PageLanguage => "page_language",
            FixKind::LinkNames => "link_names",
            FixKind::KeyboardAccess => "keyboard_access",
            FixKind::PositiveTabindex => "positive_tabindex",
            FixKind::SkipLinks => "skip_links",
            FixKind::FocusIndicators => "focus_indicators",
            FixKind::VideoAutoplay => "video_autoplay",
            FixKind::DecorativeVideo => "decorative_video",
            FixKind::RadioFieldset => "radio_fieldset",
            FixKind::RequiredAria => "required_aria",
            FixKind::IframeTitle => "iframe_title",
            FixKind::InputPurpose => "input_purpose",
            FixKind::ReducedMotion => "reduced_motion",
            FixKind::AriaRules => "aria_rules",
            FixKind::ColorOverrides => "color_overrides",
        }
    }

    /// Enabled state when the config map has no entry
    pub fn default_enabled(&self) -> bool {
        true
    }
}

impl std::fmt::Display for FixKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable issue taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    MissingAlt,
    EmptyAlt,
    MissingLabel,
    EmptyHeading,
    HeadingHierarchySkip,
    MultipleH1,
    MissingMainLandmark,
    InvalidAria,
    MissingAriaControls,
    AriaHiddenFocusable,
    DuplicateId,
    MissingPageLanguage,
    InvalidPageLanguage,
    MissingPageTitle,
    LinkNoAccessibleName,
    GenericLinkText,
    ButtonNoAccessibleName,
    KeyboardInaccessible,
    PositiveTabindex,
    MissingSkipLinks,
    FocusIndicatorsRemoved,
    PotentialKeyboardTrap,
    LowContrast,
    BackgroundImageNoFallback,
    VideoAutoplayWithSound,
    VideoNoCaptions,
    DecorativeVideoNotHidden,
    IframeMissingTitle,
    BlinkingContent,
    RadioNoFieldset,
    CheckboxGroupNoFieldset,
    RequiredNoAria,
    MissingInputPurpose,
    TableNoHeaders,
    TargetSizeTooSmall,
    TextSpacingOverride,
    MotionNoReducedPreference,
    ScanTimeout,
}

/// Constant classification data for one issue type
#[derive(Debug, Clone, Copy)]
pub struct IssueMeta {
    pub severity: Severity,
    /// WCAG success criterion number, empty for operational markers
    pub criterion: &'static str,
    pub level: Option<WcagLevel>,
    /// Slug of the W3C "Understanding" page for the criterion
    pub understanding: &'static str,
    pub fix: Option<FixKind>,
    pub impact: ImpactAssessment,
    pub description: &'static str,
    pub how_to_fix: &'static str,
}

impl IssueType {
    pub const ALL: [IssueType; 38] = [
        IssueType::MissingAlt,
        IssueType::EmptyAlt,
        IssueType::MissingLabel,
        IssueType::EmptyHeading,
        IssueType::HeadingHierarchySkip,
        IssueType::MultipleH1,
        IssueType::MissingMainLandmark,
        IssueType::InvalidAria,
        IssueType::MissingAriaControls,
        IssueType::AriaHiddenFocusable,
        IssueType::DuplicateId,
        IssueType::MissingPageLanguage,
        IssueType::InvalidPageLanguage,
        IssueType::MissingPageTitle,
        IssueType::LinkNoAccessibleName,
        IssueType::GenericLinkText,
        IssueType::ButtonNoAccessibleName,
        IssueType::KeyboardInaccessible,
        IssueType::PositiveTabindex,
        IssueType::MissingSkipLinks,
        IssueType::FocusIndicatorsRemoved,
        IssueType::PotentialKeyboardTrap,
        IssueType::LowContrast,
        IssueType::BackgroundImageNoFallback,
        IssueType::VideoAutoplayWithSound,
        IssueType::VideoNoCaptions,
        IssueType::DecorativeVideoNotHidden,
        IssueType::IframeMissingTitle,
        IssueType::BlinkingContent,
        IssueType::RadioNoFieldset,
        IssueType::CheckboxGroupNoFieldset,
        IssueType::RequiredNoAria,
        IssueType::MissingInputPurpose,
        IssueType::TableNoHeaders,
        IssueType::TargetSizeTooSmall,
        IssueType::TextSpacingOverride,
        IssueType::MotionNoReducedPreference,
        IssueType::ScanTimeout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::MissingAlt => "missing_alt",
            IssueType::EmptyAlt => "empty_alt",
            IssueType::MissingLabel => "missing_label",
            IssueType::EmptyHeading => "empty_heading",
            IssueType::HeadingHierarchySkip => "heading_hierarchy_skip",
            IssueType::MultipleH1 => "multiple_h1",
            IssueType::MissingMainLandmark => "missing_main_landmark",
            IssueType::InvalidAria => "invalid_aria",
            IssueType::MissingAriaControls => "missing_aria_controls",
            IssueType::AriaHiddenFocusable => "aria_hidden_focusable",
            IssueType::DuplicateId => "duplicate_id",
            IssueType::MissingPageLanguage => "missing_page_language",
            IssueType::InvalidPageLanguage => "invalid_page_language",
            IssueType::MissingPageTitle => "missing_page_title",
            IssueType::LinkNoAccessibleName => "link_no_accessible_name",
            IssueType::GenericLinkText => "generic_link_text",
            IssueType::ButtonNoAccessibleName => "button_no_accessible_name",
            IssueType::KeyboardInaccessible => "keyboard_inaccessible",
            IssueType::PositiveTabindex => "positive_tabindex",
            IssueType::MissingSkipLinks => "missing_skip_links",
            IssueType::FocusIndicatorsRemoved => "focus_indicators_removed",
            IssueType::PotentialKeyboardTrap => "potential_keyboard_trap",
            IssueType::LowContrast => "low_contrast",
            IssueType::BackgroundImageNoFallback => "background_image_no_fallback",
            IssueType::VideoAutoplayWithSound => "video_autoplay_with_sound",
            IssueType::VideoNoCaptions => "video_no_captions",
            IssueType::DecorativeVideoNotHidden => "decorative_video_not_hidden",
            IssueType::IframeMissingTitle => "iframe_missing_title",
            IssueType::BlinkingContent => "blinking_content",
            IssueType::RadioNoFieldset => "radio_no_fieldset",
            IssueType::CheckboxGroupNoFieldset => "checkbox_group_no_fieldset",
            IssueType::RequiredNoAria => "required_no_aria",
            IssueType::MissingInputPurpose => "missing_input_purpose",
            IssueType::TableNoHeaders => "table_no_headers",
            IssueType::TargetSizeTooSmall => "target_size_too_small",
            IssueType::TextSpacingOverride => "text_spacing_override",
            IssueType::MotionNoReducedPreference => "motion_no_reduced_preference",
            IssueType::ScanTimeout => "scan_timeout",
        }
    }

    /// Classification table
    pub fn meta(&self) -> IssueMeta {
        use FixKind as F;
        use ImpactAssessment as I;
        use Severity::*;
        use WcagLevel::*;

        match self {
            IssueType::MissingAlt => IssueMeta {
                severity: High, criterion: "1.1.1", level: Some(A),
                understanding: "non-text-content", fix: Some(F::MissingAlt), impact: I::blind(),
                description: "Image has no alt attribute, so screen readers announce the file name or nothing useful.",
                how_to_fix: "Add alt=\"description\" for informative images or alt=\"\" for decorative ones.",
            },
            IssueType::EmptyAlt => IssueMeta {
                severity: Medium, criterion: "1.1.1", level: Some(A),
                understanding: "non-text-content", fix: None, impact: I::blind(),
                description: "Image has an empty alt but does not look decorative; its content is hidden from screen readers.",
                how_to_fix: "Describe the image in its alt attribute, or confirm it is purely decorative.",
            },
            IssueType::MissingLabel => IssueMeta {
                severity: High, criterion: "3.3.2", level: Some(A),
                understanding: "labels-or-instructions", fix: Some(F::MissingLabel), impact: I::blind(),
                description: "Form control has no associated label, aria-label or aria-labelledby.",
                how_to_fix: "Associate a <label for> with the control, wrap it in a <label>, or add aria-label.",
            },
            IssueType::EmptyHeading => IssueMeta {
                severity: Medium, criterion: "2.4.6", level: Some(AA),
                understanding: "headings-and-labels", fix: None, impact: I::blind(),
                description: "Heading element contains no text.",
                how_to_fix: "Give the heading meaningful text or remove the element.",
            },
            IssueType::HeadingHierarchySkip => IssueMeta {
                severity: Medium, criterion: "1.3.1", level: Some(A),
                understanding: "info-and-relationships", fix: Some(F::HeadingHierarchy), impact: I::blind(),
                description: "Heading level skips one or more levels relative to the previous heading.",
                how_to_fix: "Use consecutive heading levels, or set aria-level to the correct outline level.",
            },
            IssueType::MultipleH1 => IssueMeta {
                severity: Low, criterion: "1.3.1", level: Some(A),
                understanding: "info-and-relationships", fix: None, impact: I::blind(),
                description: "Page has more than one level-1 heading.",
                how_to_fix: "Keep a single top-level heading that names the page and demote the others.",
            },
            IssueType::MissingMainLandmark => IssueMeta {
                severity: Medium, criterion: "1.3.1", level: Some(A),
                understanding: "info-and-relationships", fix: Some(F::MainLandmark), impact: I::blind(),
                description: "Page has no <main> element or role=\"main\" landmark.",
                how_to_fix: "Wrap the primary content in <main> or add role=\"main\" to its container.",
            },
            IssueType::InvalidAria => IssueMeta {
                severity: High, criterion: "4.1.2", level: Some(A),
                understanding: "name-role-value", fix: None, impact: I::blind(),
                description: "Element uses an aria-* attribute that does not exist in WAI-ARIA.",
                how_to_fix: "Remove the attribute or replace it with the intended valid ARIA attribute.",
            },
            IssueType::MissingAriaControls => IssueMeta {
                severity: Medium, criterion: "4.1.2", level: Some(A),
                understanding: "name-role-value", fix: Some(F::AriaControls), impact: I::blind(),
                description: "Button exposes aria-expanded but does not reference the region it controls.",
                how_to_fix: "Add aria-controls with the id of the element that is shown or hidden.",
            },
            IssueType::AriaHiddenFocusable => IssueMeta {
                severity: High, criterion: "4.1.2", level: Some(A),
                understanding: "name-role-value", fix: None, impact: I::keyboard(),
                description: "Focusable element is hidden from assistive technology with aria-hidden=\"true\".",
                how_to_fix: "Remove aria-hidden, or take the element out of the tab order with tabindex=\"-1\".",
            },
            IssueType::DuplicateId => IssueMeta {
                severity: Medium, criterion: "4.1.1", level: Some(A),
                understanding: "parsing", fix: None, impact: I::blind(),
                description: "The same id value is used by more than one element, breaking label and ARIA references.",
                how_to_fix: "Give every element a unique id and update references to it.",
            },
            IssueType::MissingPageLanguage => IssueMeta {
                severity: High, criterion: "3.1.1", level: Some(A),
                understanding: "language-of-page", fix: Some(F::PageLanguage), impact: I::blind(),
                description: "The <html> element has no lang attribute.",
                how_to_fix: "Add lang with the page's primary language, for example lang=\"en\".",
            },
            IssueType::InvalidPageLanguage => IssueMeta {
                severity: Medium, criterion: "3.1.1", level: Some(A),
                understanding: "language-of-page", fix: Some(F::PageLanguage), impact: I::blind(),
                description: "The <html> lang attribute is empty or not a valid language tag.",
                how_to_fix: "Use a valid BCP 47 language tag such as \"en\" or \"en-US\".",
            },
            IssueType::MissingPageTitle => IssueMeta {
                severity: High, criterion: "2.4.2", level: Some(A),
                understanding: "page-titled", fix: None, impact: I { cognitive: true, ..I::blind() },
                description: "Page has no <title> or the title is empty.",
                how_to_fix: "Add a <title> in <head> describing the page's topic or purpose.",
            },
            IssueType::LinkNoAccessibleName => IssueMeta {
                severity: High, criterion: "2.4.4", level: Some(A),
                understanding: "link-purpose-in-context", fix: Some(F::LinkNames), impact: I::blind(),
                description: "Link has no text and no accessible name.",
                how_to_fix: "Add link text, an aria-label, or alt text on the image inside the link.",
            },
            IssueType::GenericLinkText => IssueMeta {
                severity: Medium, criterion: "2.4.4", level: Some(A),
                understanding: "link-purpose-in-context", fix: None, impact: I { cognitive: true, ..I::blind() },
                description: "Link text such as \"click here\" does not describe the destination.",
                how_to_fix: "Rewrite the link text to describe its target, or add an aria-label.",
            },
            IssueType::ButtonNoAccessibleName => IssueMeta {
                severity: Critical, criterion: "4.1.2", level: Some(A),
                understanding: "name-role-value", fix: Some(F::LinkNames), impact: I::blind(),
                description: "Button has no text content and no accessible name.",
                how_to_fix: "Add visible text or an aria-label describing the button's action.",
            },
            IssueType::KeyboardInaccessible => IssueMeta {
                severity: High, criterion: "2.1.1", level: Some(A),
                understanding: "keyboard", fix: Some(F::KeyboardAccess), impact: I::keyboard(),
                description: "Element has a click handler but cannot be reached or activated with the keyboard.",
                how_to_fix: "Use a <button>, or add role=\"button\", tabindex=\"0\" and a key handler.",
            },
            IssueType::PositiveTabindex => IssueMeta {
                severity: Medium, criterion: "2.4.3", level: Some(A),
                understanding: "focus-order", fix: Some(F::PositiveTabindex), impact: I::keyboard(),
                description: "Positive tabindex overrides the natural focus order.",
                how_to_fix: "Use tabindex=\"0\" and order the markup to match the visual order.",
            },
            IssueType::MissingSkipLinks => IssueMeta {
                severity: Medium, criterion: "2.4.1", level: Some(A),
                understanding: "bypass-blocks", fix: Some(F::SkipLinks), impact: I::keyboard(),
                description: "Page has no mechanism to skip repeated navigation blocks.",
                how_to_fix: "Add a \"Skip to content\" link as the first focusable element.",
            },
            IssueType::FocusIndicatorsRemoved => IssueMeta {
                severity: High, criterion: "2.4.7", level: Some(AA),
                understanding: "focus-visible", fix: Some(F::FocusIndicators), impact: I { low_vision: true, ..I::motor() },
                description: "Stylesheet removes the focus outline without providing a replacement.",
                how_to_fix: "Keep a visible :focus or :focus-visible style such as an outline or box-shadow.",
            },
            IssueType::PotentialKeyboardTrap => IssueMeta {
                severity: Critical, criterion: "2.1.2", level: Some(A),
                understanding: "no-keyboard-trap", fix: None, impact: I::keyboard(),
                description: "Modal-like element has no visible way to close it, which can trap keyboard focus.",
                how_to_fix: "Provide a close button and close the dialog on Escape.",
            },
            IssueType::LowContrast => IssueMeta {
                severity: High, criterion: "1.4.3", level: Some(AA),
                understanding: "contrast-minimum", fix: None, impact: I::low_vision(),
                description: "Text contrast against its background is below the WCAG AA minimum.",
                how_to_fix: "Darken the text or lighten the background until the ratio reaches 4.5:1 (3:1 for large text).",
            },
            IssueType::BackgroundImageNoFallback => IssueMeta {
                severity: Medium, criterion: "1.4.3", level: Some(AA),
                understanding: "contrast-minimum", fix: None, impact: I::low_vision(),
                description: "Text sits on a background image with no fallback background color.",
                how_to_fix: "Declare a background-color that keeps the text readable if the image fails to load.",
            },
            IssueType::VideoAutoplayWithSound => IssueMeta {
                severity: High, criterion: "1.4.2", level: Some(A),
                understanding: "audio-control", fix: Some(F::VideoAutoplay), impact: I { cognitive: true, ..I::blind() },
                description: "Video plays automatically with sound.",
                how_to_fix: "Add the muted attribute or remove autoplay.",
            },
            IssueType::VideoNoCaptions => IssueMeta {
                severity: Critical, criterion: "1.2.2", level: Some(A),
                understanding: "captions-prerecorded", fix: None, impact: I::deaf(),
                description: "Content video has no captions track.",
                how_to_fix: "Add <track kind=\"captions\"> with a synchronized caption file.",
            },
            IssueType::DecorativeVideoNotHidden => IssueMeta {
                severity: Low, criterion: "1.1.1", level: Some(A),
                understanding: "non-text-content", fix: Some(F::DecorativeVideo), impact: I::blind(),
                description: "Decorative background video is exposed to assistive technology.",
                how_to_fix: "Add aria-hidden=\"true\" to the decorative video.",
            },
            IssueType::IframeMissingTitle => IssueMeta {
                severity: High, criterion: "4.1.2", level: Some(A),
                understanding: "name-role-value", fix: Some(F::IframeTitle), impact: I::blind(),
                description: "Iframe has no title describing its content.",
                how_to_fix: "Add a title attribute describing the embedded content.",
            },
            IssueType::BlinkingContent => IssueMeta {
                severity: High, criterion: "2.2.2", level: Some(A),
                understanding: "pause-stop-hide", fix: None, impact: I { cognitive: true, ..I::low_vision() },
                description: "Page uses <marquee> or <blink>, which move content without a way to pause it.",
                how_to_fix: "Replace the element with static content or a pausable animation.",
            },
            IssueType::RadioNoFieldset => IssueMeta {
                severity: Medium, criterion: "1.3.1", level: Some(A),
                understanding: "info-and-relationships", fix: Some(F::RadioFieldset), impact: I::blind(),
                description: "Radio button group is not grouped in a <fieldset> with a <legend>.",
                how_to_fix: "Wrap the radio buttons in <fieldset> and describe the group in <legend>.",
            },
            IssueType::CheckboxGroupNoFieldset => IssueMeta {
                severity: Low, criterion: "1.3.1", level: Some(A),
                understanding: "info-and-relationships", fix: Some(F::RadioFieldset), impact: I::blind(),
                description: "Group of related checkboxes is not grouped in a <fieldset> with a <legend>.",
                how_to_fix: "Wrap the checkboxes in <fieldset> and describe the group in <legend>.",
            },
            IssueType::RequiredNoAria => IssueMeta {
                severity: Low, criterion: "3.3.2", level: Some(A),
                understanding: "labels-or-instructions", fix: Some(F::RequiredAria), impact: I::blind(),
                description: "Required field does not expose aria-required.",
                how_to_fix: "Add aria-required=\"true\" next to the required attribute.",
            },
            IssueType::MissingInputPurpose => IssueMeta {
                severity: Low, criterion: "1.3.5", level: Some(AA),
                understanding: "identify-input-purpose", fix: Some(F::InputPurpose), impact: I { motor: true, ..I::cognitive() },
                description: "Field collects personal data but has no autocomplete token.",
                how_to_fix: "Add the matching autocomplete value, for example autocomplete=\"email\".",
            },
            IssueType::TableNoHeaders => IssueMeta {
                severity: Medium, criterion: "1.3.1", level: Some(A),
                understanding: "info-and-relationships", fix: None, impact: I::blind(),
                description: "Data table has no <th> header cells.",
                how_to_fix: "Mark header cells with <th scope=\"col\"> or <th scope=\"row\">.",
            },
            IssueType::TargetSizeTooSmall => IssueMeta {
                severity: Low, criterion: "2.5.8", level: Some(AA),
                understanding: "target-size-minimum", fix: None, impact: I::motor(),
                description: "Interactive target is smaller than the minimum target size.",
                how_to_fix: "Make the target at least 24 by 24 CSS pixels or add spacing around it.",
            },
            IssueType::TextSpacingOverride => IssueMeta {
                severity: Medium, criterion: "1.4.12", level: Some(AA),
                understanding: "text-spacing", fix: None, impact: I { cognitive: true, ..I::low_vision() },
                description: "Text spacing is forced with !important, so user style sheets cannot adjust it.",
                how_to_fix: "Drop !important from line-height, letter-spacing and word-spacing declarations.",
            },
            IssueType::MotionNoReducedPreference => IssueMeta {
                severity: Low, criterion: "2.3.3", level: Some(AAA),
                understanding: "animation-from-interactions", fix: Some(F::ReducedMotion), impact: I::cognitive(),
                description: "Page animates content but never honors prefers-reduced-motion.",
                how_to_fix: "Disable or shorten animations inside @media (prefers-reduced-motion: reduce).",
            },
            IssueType::ScanTimeout => IssueMeta {
                severity: Info, criterion: "", level: None,
                understanding: "", fix: None, impact: I::none(),
                description: "The page scan did not finish within the time limit.",
                how_to_fix: "Rescan the page on its own or raise session.page_timeout_secs.",
            },
        }
    }

    pub fn severity(&self) -> Severity {
        self.meta().severity
    }

    /// Link to the W3C explanation of the criterion
    pub fn wcag_reference(&self) -> Option<String> {
        let meta = self.meta();
        if meta.understanding.is_empty() {
            return None;
        }
        Some(format!(
            "https://www.w3.org/WAI/WCAG22/Understanding/{}.html",
            meta.understanding
        ))
    }

    /// Which conformance claim an occurrence breaks
    pub fn compliance_impact(&self) -> Option<String> {
        let meta = self.meta();
        meta.level.map(|level| {
            format!(
                "Fails WCAG {} (Level {}); blocks Level {} conformance",
                meta.criterion, level, level
            )
        })
    }
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IssueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IssueType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown issue type: {}", s))
    }
}

/// One detected violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub severity: Severity,
    /// Locator of the offending element, empty for page-level issues
    pub selector: String,
    #[serde(rename = "element_details")]
    pub element: Option<ElementDetails>,
    pub message: String,
    pub description: String,
    pub suggestion: Option<String>,
    pub how_to_fix: String,
    pub wcag_reference: Option<String>,
    pub wcag_criterion: Option<String>,
    pub wcag_level: Option<WcagLevel>,
    pub compliance_impact: Option<String>,
    /// Set by the rule engine from the configured fixes
    pub auto_fixable: bool,
    pub impact: ImpactAssessment,
}

impl Issue {
    /// Create an issue with the classification metadata of `issue_type`
    pub fn new(issue_type: IssueType, message: impl Into<String>) -> Self {
        let meta = issue_type.meta();
        Self {
            issue_type,
            severity: meta.severity,
            selector: String::new(),
            element: None,
            message: message.into(),
            description: meta.description.to_string(),
            suggestion: None,
            how_to_fix: meta.how_to_fix.to_string(),
            wcag_reference: issue_type.wcag_reference(),
            wcag_criterion: (!meta.criterion.is_empty()).then(|| meta.criterion.to_string()),
            wcag_level: meta.level,
            compliance_impact: issue_type.compliance_impact(),
            auto_fixable: false,
            impact: meta.impact,
        }
    }

    /// Attach the locator and a snapshot of `node`
    pub fn at(mut self, doc: &Document, node: NodeId) -> Self {
        self.selector = doc.locator(node);
        self.element = Some(doc.snapshot(node));
        self
    }

    /// Set a locator without a snapshot
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = selector.into();
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Override the table severity (decorative-video suggestions, for one)
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_impact(mut self, impact: ImpactAssessment) -> Self {
        self.impact = impact;
        self
    }

    pub fn weight(&self) -> u32 {
        self.severity.weight()
    }
}

/// Counts over one report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub auto_fixable: usize,
    pub score: u32,
}

/// Result of analyzing one page once
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub id: Uuid,
    pub url: String,
    pub issues: Vec<Issue>,
    pub timestamp: DateTime<Utc>,
    /// Set when the page could not be scanned at all
    pub error: Option<String>,
    /// Markup errors the parser recovered from
    pub parse_warnings: usize,
}

impl ScanReport {
    pub fn new(url: impl Into<String>, issues: Vec<Issue>) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            issues,
            timestamp: Utc::now(),
            error: None,
            parse_warnings: 0,
        }
    }

    /// A report for a page that failed outright
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(url, Vec::new())
        }
    }

    pub fn with_parse_warnings(mut self, count: usize) -> Self {
        self.parse_warnings = count;
        self
    }

    pub fn by_severity(&self, severity: Severity) -> Vec<&Issue> {
        self.issues.iter().filter(|i| i.severity == severity).collect()
    }

    pub fn by_type(&self, issue_type: IssueType) -> Vec<&Issue> {
        self.issues.iter().filter(|i| i.issue_type == issue_type).collect()
    }

    pub fn count(&self, issue_type: IssueType) -> usize {
        self.issues.iter().filter(|i| i.issue_type == issue_type).count()
    }

    /// Whether any critical or high issue remains
    pub fn has_blocking(&self) -> bool {
        self.issues.iter().any(|i| i.severity.is_blocking())
    }

    pub fn is_clean(&self) -> bool {
        self.error.is_none() && self.issues.is_empty()
    }

    pub fn summary(&self) -> ScanSummary {
        let count = |s: Severity| self.issues.iter().filter(|i| i.severity == s).count();
        ScanSummary {
            total: self.issues.len(),
            critical: count(Severity::Critical),
            high: count(Severity::High),
            medium: count(Severity::Medium),
            low: count(Severity::Low),
            info: count(Severity::Info),
            auto_fixable: self.issues.iter().filter(|i| i.auto_fixable).count(),
            score: crate::scoring::score(&self.issues),
        }
    }
}
