// SPDX-License-Identifier: PMPL-1.0-or-later
//! Form accessibility analyzer - WCAG 3.3.2 Labels (Level A), 1.3.1 Info and
//! Relationships (Level A), 1.3.5 Identify Input Purpose (Level AA)
//!
//! Checks form element accessibility:
//! - Every control has an associated label (for/id, wrapping, or ARIA)
//! - Radio and checkbox groups are grouped in a fieldset
//! - Required fields expose aria-required
//! - Personal-data fields carry an autocomplete token

use crate::analyzers::{labelledby_text, Analyzer, Context};
use crate::dom::{Document, NodeId};
use crate::issue::{Issue, IssueType};
use std::collections::BTreeMap;

/// Input types that do not need a label
const EXEMPT_INPUT_TYPES: &[&str] = &["hidden", "submit", "reset", "button"];

/// Input types where autocomplete tokens make sense
const TEXTUAL_INPUT_TYPES: &[&str] = &["text", "email", "tel", "url", "password", "search", ""];

/// (name/id fragment, autocomplete token). Checked in order, so more
/// specific fragments come first.
const PURPOSE_HINTS: &[(&str, &str)] = &[
    ("email", "email"),
    ("phone", "tel"),
    ("mobile", "tel"),
    ("first_name", "given-name"),
    ("firstname", "given-name"),
    ("first-name", "given-name"),
    ("given", "given-name"),
    ("last_name", "family-name"),
    ("lastname", "family-name"),
    ("last-name", "family-name"),
    ("surname", "family-name"),
    ("family", "family-name"),
    ("full_name", "name"),
    ("fullname", "name"),
    ("username", "username"),
    ("postal", "postal-code"),
    ("postcode", "postal-code"),
    ("zip", "postal-code"),
    ("city", "address-level2"),
    ("country", "country-name"),
    ("street", "street-address"),
    ("address", "street-address"),
    ("organization", "organization"),
    ("company", "organization"),
    ("card_number", "cc-number"),
    ("cardnumber", "cc-number"),
    ("birthday", "bday"),
];

/// Form accessibility analyzer
pub struct FormAnalyzer;

impl Analyzer for FormAnalyzer {
    fn name(&self) -> &str {
        "Form Accessibility Analyzer"
    }

    fn description(&self) -> &str {
        "Checks form controls for labels, grouping, required state and input purpose (WCAG 3.3.2, 1.3.1, 1.3.5)"
    }

    fn analyze(&self, ctx: &Context<'_>) -> Vec<Issue> {
        let doc = ctx.doc;
        let mut issues = Vec::new();

        check_labels(doc, &mut issues);
        check_groups(doc, "radio", IssueType::RadioNoFieldset, &mut issues);
        check_groups(doc, "checkbox", IssueType::CheckboxGroupNoFieldset, &mut issues);
        check_required(doc, &mut issues);
        check_input_purpose(doc, &mut issues);

        issues
    }
}

/// Lowercased `type` of an input, `""` when absent
pub fn input_type(doc: &Document, id: NodeId) -> String {
    doc.attr(id, "type").unwrap_or("").trim().to_ascii_lowercase()
}

/// Form controls in document order
pub fn form_controls(doc: &Document) -> impl Iterator<Item = NodeId> + '_ {
    doc.elements()
        .filter(move |id| matches!(doc.tag(*id), Some("input" | "select" | "textarea")))
}

/// Whether a control needs a label at all
pub fn needs_label(doc: &Document, id: NodeId) -> bool {
    if !doc.is_tag(id, "input") {
        return true;
    }
    let kind = input_type(doc, id);
    if EXEMPT_INPUT_TYPES.contains(&kind.as_str()) {
        return false;
    }
    if kind == "image" {
        return doc.non_empty_attr(id, "alt").is_none();
    }
    true
}

/// Whether a control has a programmatic label
pub fn is_labelled(doc: &Document, id: NodeId) -> bool {
    if doc.non_empty_attr(id, "aria-label").is_some() {
        return true;
    }
    if !labelledby_text(doc, id).is_empty() {
        return true;
    }
    if doc.closest_tag(id, &["label"]).is_some() {
        return true;
    }
    match doc.non_empty_attr(id, "id") {
        Some(control_id) => doc
            .elements_by_tag("label")
            .any(|label| doc.attr(label, "for") == Some(control_id)),
        None => false,
    }
}

fn check_labels(doc: &Document, issues: &mut Vec<Issue>) {
    for control in form_controls(doc) {
        if !needs_label(doc, control) || is_labelled(doc, control) {
            continue;
        }
        let tag = doc.tag(control).unwrap_or("input");
        let message = if tag == "input" {
            format!(
                "<input type=\"{}\"> has no associated label.",
                doc.attr(control, "type").unwrap_or("text")
            )
        } else {
            format!("<{}> has no associated label.", tag)
        };
        issues.push(
            Issue::new(IssueType::MissingLabel, message)
                .at(doc, control)
                .with_suggestion("Add <label for=\"id\">, wrap the control in <label>, or add aria-label"),
        );
    }
}

/// Whether the group is already grouped by a fieldset or ARIA group role
pub fn is_grouped(doc: &Document, members: &[NodeId]) -> bool {
    let container = |id: NodeId| {
        doc.ancestors(id).find(|a| {
            doc.is_tag(*a, "fieldset")
                || matches!(doc.attr(*a, "role"), Some("radiogroup") | Some("group"))
        })
    };
    let Some(first) = members.first().and_then(|m| container(*m)) else {
        return false;
    };
    members.iter().all(|m| container(*m) == Some(first))
}

/// Inputs of `kind` sharing a name, keyed by (form, name)
pub fn input_groups(doc: &Document, kind: &str) -> BTreeMap<(Option<NodeId>, String), Vec<NodeId>> {
    let mut groups: BTreeMap<(Option<NodeId>, String), Vec<NodeId>> = BTreeMap::new();
    for input in doc.elements_by_tag("input") {
        if input_type(doc, input) != kind {
            continue;
        }
        let Some(name) = doc.non_empty_attr(input, "name") else {
            continue;
        };
        let form = doc.closest_tag(input, &["form"]);
        groups.entry((form, name.to_string())).or_default().push(input);
    }
    groups
}

fn check_groups(doc: &Document, kind: &str, issue_type: IssueType, issues: &mut Vec<Issue>) {
    let mut found: Vec<(NodeId, String, usize)> = input_groups(doc, kind)
        .into_iter()
        .filter(|(_, members)| members.len() > 1 && !is_grouped(doc, members))
        .map(|((_, name), members)| (members[0], name, members.len()))
        .collect();
    found.sort_by_key(|(first, _, _)| *first);

    for (first, name, count) in found {
        issues.push(
            Issue::new(
                issue_type,
                format!(
                    "{} {} inputs named \"{}\" are not grouped in a <fieldset> with a <legend>.",
                    count, kind, name
                ),
            )
            .at(doc, first)
            .with_suggestion("Wrap the group in <fieldset> and add a <legend> describing the choice"),
        );
    }
}

fn check_required(doc: &Document, issues: &mut Vec<Issue>) {
    for control in form_controls(doc) {
        if !doc.has_attr(control, "required") || doc.has_attr(control, "aria-required") {
            continue;
        }
        if input_type(doc, control) == "hidden" {
            continue;
        }
        issues.push(
            Issue::new(
                IssueType::RequiredNoAria,
                "Required field does not set aria-required=\"true\".",
            )
            .at(doc, control),
        );
    }
}

/// Autocomplete token implied by a field's type, name or id
pub fn derive_autocomplete(doc: &Document, id: NodeId) -> Option<&'static str> {
    if !doc.is_tag(id, "input") {
        return None;
    }
    let kind = input_type(doc, id);
    match kind.as_str() {
        "email" => return Some("email"),
        "tel" => return Some("tel"),
        "url" => return Some("url"),
        _ => {}
    }
    if !TEXTUAL_INPUT_TYPES.contains(&kind.as_str()) {
        return None;
    }

    let key = format!(
        "{} {}",
        doc.attr(id, "name").unwrap_or(""),
        doc.attr(id, "id").unwrap_or("")
    )
    .to_ascii_lowercase();

    if kind == "password" {
        return Some(if key.contains("new") || key.contains("confirm") {
            "new-password"
        } else {
            "current-password"
        });
    }
    if let Some((_, token)) = PURPOSE_HINTS.iter().find(|(fragment, _)| key.contains(fragment)) {
        return Some(token);
    }
    key.split(|c: char| !c.is_ascii_alphanumeric()).find_map(|w| match w {
        "name" => Some("name"),
        "tel" => Some("tel"),
        _ => None,
    })
}

fn check_input_purpose(doc: &Document, issues: &mut Vec<Issue>) {
    for input in doc.elements_by_tag("input") {
        if doc.has_attr(input, "autocomplete") {
            continue;
        }
        let Some(token) = derive_autocomplete(doc, input) else {
            continue;
        };
        issues.push(
            Issue::new(
                IssueType::MissingInputPurpose,
                format!("Field collects personal data but has no autocomplete; expected \"{}\".", token),
            )
            .at(doc, input)
            .with_suggestion(format!("Add autocomplete=\"{}\"", token)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn run(html: &str) -> Vec<Issue> {
        let doc = Document::parse(html);
        let config = Config::default();
        FormAnalyzer.analyze(&Context::new(&doc, &config))
    }

    fn of_type(issues: &[Issue], t: IssueType) -> usize {
        issues.iter().filter(|i| i.issue_type == t).count()
    }

    #[test]
    fn test_labelled_controls() {
        let html = r#"
            <form>
                <label for="q">Search</label><input id="q" type="search">
                <label>Name <input type="text" autocomplete="name"></label>
                <input type="text" aria-label="Coupon">
                <span id="cap">Notes</span><textarea aria-labelledby="cap"></textarea>
                <input type="submit" value="Go">
                <input type="image" src="go.png" alt="Go">
            </form>
        "#;
        let issues = run(html);
        assert_eq!(of_type(&issues, IssueType::MissingLabel), 0, "{:?}", issues);
    }

    #[test]
    fn test_missing_labels() {
        let html = r#"
            <input type="text" name="coupon" placeholder="Coupon">
            <select><option>a</option></select>
            <input type="image" src="go.png">
            <label for="other">Other</label><input id="mismatch">
        "#;
        let issues = run(html);
        assert_eq!(of_type(&issues, IssueType::MissingLabel), 4);
    }

    #[test]
    fn test_radio_group_without_fieldset() {
        let html = r#"
            <form>
                <label><input type="radio" name="size" value="s"> S</label>
                <label><input type="radio" name="size" value="m"> M</label>
                <fieldset><legend>Color</legend>
                    <label><input type="radio" name="color" value="r"> R</label>
                    <label><input type="radio" name="color" value="g"> G</label>
                </fieldset>
                <label><input type="radio" name="solo"> Only</label>
            </form>
        "#;
        let issues = run(html);
        assert_eq!(of_type(&issues, IssueType::RadioNoFieldset), 1);
        let issue = issues
            .iter()
            .find(|i| i.issue_type == IssueType::RadioNoFieldset)
            .expect("radio issue");
        assert!(issue.message.contains("\"size\""));
    }

    #[test]
    fn test_checkbox_group_in_role_group_is_fine() {
        let html = r#"
            <div role="group" aria-label="Toppings">
                <label><input type="checkbox" name="t" value="a"> A</label>
                <label><input type="checkbox" name="t" value="b"> B</label>
            </div>
            <label><input type="checkbox" name="x"> X</label>
            <label><input type="checkbox" name="x"> Y</label>
        "#;
        let issues = run(html);
        assert_eq!(of_type(&issues, IssueType::CheckboxGroupNoFieldset), 1);
    }

    #[test]
    fn test_required_without_aria() {
        let html = r#"
            <label>A <input required autocomplete="off"></label>
            <label>B <input required aria-required="true" autocomplete="off"></label>
        "#;
        assert_eq!(of_type(&run(html), IssueType::RequiredNoAria), 1);
    }

    #[test]
    fn test_input_purpose() {
        let html = r#"
            <label>E <input type="email" name="contact"></label>
            <label>F <input name="first_name"></label>
            <label>P <input type="password" name="new_password"></label>
            <label>Q <input name="query"></label>
            <label>Z <input name="zip" autocomplete="postal-code"></label>
        "#;
        let issues = run(html);
        let tokens: Vec<_> = issues
            .iter()
            .filter(|i| i.issue_type == IssueType::MissingInputPurpose)
            .filter_map(|i| i.suggestion.clone())
            .collect();
        assert_eq!(
            tokens,
            vec![
                "Add autocomplete=\"email\"",
                "Add autocomplete=\"given-name\"",
                "Add autocomplete=\"new-password\"",
            ]
        );
    }
}
