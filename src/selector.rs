// SPDX-License-Identifier: PMPL-1.0-or-later
//! CSS selector compiler.
//!
//! Compiles the practically-used subset of CSS selectors into a query AST
//! that is evaluated against the arena [`Document`]:
//!
//! - type selectors and `*`
//! - `#id`, `.class` (chained classes compile to a conjunction)
//! - `[attr]`, `[attr=value]`, `[attr^=value]`, `[attr$=value]`,
//!   `[attr*=value]`, `[attr~=value]`, `[attr|=value]`
//! - `:first-child`, `:last-child`, `:only-child`, `:nth-child(An+B)`
//! - combinators: descendant, `>`, `+`, `~`, and `,` lists
//!
//! Other pseudo-classes and pseudo-elements (`:hover`, `:not(..)`,
//! `::before`) are accepted and compile to no constraint at all, so the
//! query over-approximates. Callers treat an empty match set as normal.

use crate::dom::{Document, NodeId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Malformed selector input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("empty selector")]
    Empty,

    #[error("selector starts with a digit")]
    LeadingDigit,

    #[error("forbidden character '{0}' in selector")]
    ForbiddenCharacter(char),

    #[error("doubled whitespace in selector")]
    DoubledWhitespace,

    #[error("unterminated attribute selector")]
    UnterminatedAttribute,

    #[error("unterminated string or parenthesis")]
    UnterminatedString,

    #[error("combinator without a selector on both sides")]
    DanglingCombinator,

    #[error("unexpected character '{0}' at offset {1}")]
    UnexpectedCharacter(char, usize),
}

/// Compiled selector list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub alternatives: Vec<Path>,
}

/// One complex selector, steps ordered left to right
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    pub steps: Vec<Step>,
}

/// A compound selector plus the combinator linking it to the previous step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub combinator: Combinator,
    pub test: NodeTest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Combinator {
    /// Whitespace
    Descendant,
    /// `>`
    Child,
    /// `+`
    Adjacent,
    /// `~`
    Sibling,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTest {
    /// Lowercased tag name, `None` for `*` or no type selector
    pub tag: Option<String>,
    pub predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    Id(String),
    /// Every listed class must be present
    Classes(Vec<String>),
    HasAttr(String),
    Attr {
        name: String,
        op: AttrOp,
        value: String,
        case_insensitive: bool,
    },
    FirstChild,
    LastChild,
    /// No element siblings on either side
    OnlyChild,
    /// `:nth-child(An+B)`
    NthChild { a: i32, b: i32 },
    /// Accepted but unsupported syntax; always matches
    Approximated(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrOp {
    Equals,
    Prefix,
    Suffix,
    Contains,
    Word,
    DashPrefix,
}

/// CSS specificity as (ids, classes/attributes/pseudo-classes, types)
pub type Specificity = (u32, u32, u32);

/// Compile a selector string into a [`Query`]
pub fn compile(selector: &str) -> Result<Query, CompileError> {
    let selector = selector.trim();
    validate(selector)?;

    let mut parser = Parser {
        chars: selector.chars().collect(),
        pos: 0,
    };

    let mut alternatives = vec![parser.parse_path()?];
    while parser.peek() == Some(',') {
        parser.pos += 1;
        alternatives.push(parser.parse_path()?);
    }

    if let Some(c) = parser.peek() {
        return Err(CompileError::UnexpectedCharacter(c, parser.pos));
    }

    Ok(Query { alternatives })
}

/// Cheap rejection of obviously malformed input before parsing
fn validate(selector: &str) -> Result<(), CompileError> {
    let first = selector.chars().next().ok_or(CompileError::Empty)?;
    if first.is_ascii_digit() {
        return Err(CompileError::LeadingDigit);
    }
    if let Some(c) = selector.chars().find(|c| matches!(c, '<' | '{' | '}')) {
        return Err(CompileError::ForbiddenCharacter(c));
    }

    let mut quote: Option<char> = None;
    let mut previous_space = false;
    for c in selector.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => continue,
            None if c == '"' || c == '\'' => quote = Some(c),
            None => {}
        }
        let space = quote.is_none() && c.is_whitespace();
        if space && previous_space {
            return Err(CompileError::DoubledWhitespace);
        }
        previous_space = space;
    }

    Ok(())
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().map(char::is_whitespace).unwrap_or(false) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_path(&mut self) -> Result<Path, CompileError> {
        let mut steps: Vec<Step> = Vec::new();

        loop {
            let had_space = self.skip_whitespace();
            let Some(c) = self.peek() else {
                break;
            };
            if c == ',' {
                break;
            }

            let combinator = match c {
                '>' | '+' | '~' => {
                    if steps.is_empty() {
                        return Err(CompileError::DanglingCombinator);
                    }
                    self.pos += 1;
                    self.skip_whitespace();
                    match c {
                        '>' => Combinator::Child,
                        '+' => Combinator::Adjacent,
                        _ => Combinator::Sibling,
                    }
                }
                _ if steps.is_empty() || had_space => Combinator::Descendant,
                _ => return Err(CompileError::UnexpectedCharacter(c, self.pos)),
            };

            if matches!(self.peek(), None | Some(',' | '>' | '+' | '~')) {
                return Err(CompileError::DanglingCombinator);
            }

            let test = self.parse_compound()?;
            steps.push(Step { combinator, test });
        }

        if steps.is_empty() {
            Err(CompileError::Empty)
        } else {
            Ok(Path { steps })
        }
    }

    fn parse_compound(&mut self) -> Result<NodeTest, CompileError> {
        let start = self.pos;
        let mut test = NodeTest::default();
        let mut classes = Vec::new();

        if self.peek() == Some('*') {
            self.pos += 1;
        } else if self.peek().map(is_ident_char).unwrap_or(false) {
            test.tag = Some(self.ident().to_lowercase());
        }

        while let Some(c) = self.peek() {
            match c {
                '#' => {
                    self.pos += 1;
                    let id = self.required_ident()?;
                    test.predicates.push(Predicate::Id(id));
                }
                '.' => {
                    self.pos += 1;
                    classes.push(self.required_ident()?);
                }
                '[' => {
                    self.pos += 1;
                    let predicate = self.parse_attribute()?;
                    test.predicates.push(predicate);
                }
                ':' => {
                    self.pos += 1;
                    let predicate = self.parse_pseudo()?;
                    test.predicates.push(predicate);
                }
                _ => break,
            }
        }

        if self.pos == start {
            let c = self.peek().unwrap_or(' ');
            return Err(CompileError::UnexpectedCharacter(c, self.pos));
        }
        if !classes.is_empty() {
            test.predicates.push(Predicate::Classes(classes));
        }

        Ok(test)
    }

    fn ident(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                if let Some(escaped) = self.chars.get(self.pos + 1) {
                    out.push(*escaped);
                    self.pos += 2;
                    continue;
                }
            }
            if !is_ident_char(c) {
                break;
            }
            out.push(c);
            self.pos += 1;
        }
        out
    }

    fn required_ident(&mut self) -> Result<String, CompileError> {
        let ident = self.ident();
        if ident.is_empty() {
            let c = self.peek().unwrap_or(' ');
            Err(CompileError::UnexpectedCharacter(c, self.pos))
        } else {
            Ok(ident)
        }
    }

    fn parse_attribute(&mut self) -> Result<Predicate, CompileError> {
        self.skip_whitespace();
        let name = self.ident().to_lowercase();
        if name.is_empty() {
            return Err(CompileError::UnterminatedAttribute);
        }
        self.skip_whitespace();

        let op = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok(Predicate::HasAttr(name));
            }
            Some('=') => {
                self.pos += 1;
                AttrOp::Equals
            }
            Some(c @ ('^' | '$' | '*' | '~' | '|')) if self.chars.get(self.pos + 1) == Some(&'=') => {
                self.pos += 2;
                match c {
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    '*' => AttrOp::Contains,
                    '~' => AttrOp::Word,
                    _ => AttrOp::DashPrefix,
                }
            }
            _ => return Err(CompileError::UnterminatedAttribute),
        };

        self.skip_whitespace();
        let value = match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.peek() {
                        None => return Err(CompileError::UnterminatedString),
                        Some(c) if c == q => {
                            self.pos += 1;
                            break;
                        }
                        Some(c) => {
                            value.push(c);
                            self.pos += 1;
                        }
                    }
                }
                value
            }
            _ => {
                let mut value = String::new();
                while let Some(c) = self.peek() {
                    if c == ']' || c.is_whitespace() {
                        break;
                    }
                    value.push(c);
                    self.pos += 1;
                }
                value
            }
        };

        self.skip_whitespace();
        let mut case_insensitive = false;
        if let Some(flag @ ('i' | 'I' | 's' | 'S')) = self.peek() {
            case_insensitive = flag.eq_ignore_ascii_case(&'i');
            self.pos += 1;
            self.skip_whitespace();
        }

        if self.peek() != Some(']') {
            return Err(CompileError::UnterminatedAttribute);
        }
        self.pos += 1;

        Ok(Predicate::Attr {
            name,
            op,
            value,
            case_insensitive,
        })
    }

    fn parse_pseudo(&mut self) -> Result<Predicate, CompileError> {
        let element = self.peek() == Some(':');
        if element {
            self.pos += 1;
        }
        let name = self.required_ident()?.to_lowercase();

        let mut argument = None;
        if self.peek() == Some('(') {
            self.pos += 1;
            let mut depth = 1;
            let mut arg = String::new();
            loop {
                match self.peek() {
                    None => return Err(CompileError::UnterminatedString),
                    Some('(') => depth += 1,
                    Some(')') => {
                        depth -= 1;
                        if depth == 0 {
                            self.pos += 1;
                            break;
                        }
                    }
                    _ => {}
                }
                if let Some(c) = self.peek() {
                    arg.push(c);
                }
                self.pos += 1;
            }
            argument = Some(arg);
        }

        let raw = match &argument {
            Some(arg) => format!("{}({})", name, arg),
            None => name.clone(),
        };
        if element {
            return Ok(Predicate::Approximated(format!("::{}", raw)));
        }

        Ok(match (name.as_str(), argument.as_deref()) {
            ("first-child", None) => Predicate::FirstChild,
            ("last-child", None) => Predicate::LastChild,
            ("only-child", None) => Predicate::OnlyChild,
            ("nth-child", Some(arg)) => match parse_nth(arg) {
                Some((a, b)) => Predicate::NthChild { a, b },
                None => Predicate::Approximated(format!(":{}", raw)),
            },
            _ => Predicate::Approximated(format!(":{}", raw)),
        })
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

/// Parse `An+B`, `odd`, `even` or an integer
fn parse_nth(arg: &str) -> Option<(i32, i32)> {
    let arg: String = arg
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    match arg.as_str() {
        "odd" => return Some((2, 1)),
        "even" => return Some((2, 0)),
        _ => {}
    }

    match arg.split_once('n') {
        Some((a, b)) => {
            let a = match a {
                "" | "+" => 1,
                "-" => -1,
                other => other.parse().ok()?,
            };
            let b = if b.is_empty() { 0 } else { b.parse().ok()? };
            Some((a, b))
        }
        None => arg.parse().ok().map(|b| (0, b)),
    }
}

impl Query {
    /// Whether `node` matches any alternative
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.alternatives
            .iter()
            .any(|path| matches_steps(doc, &path.steps, node))
    }

    /// All matching elements in document order
    pub fn select(&self, doc: &Document) -> Vec<NodeId> {
        doc.elements().filter(|id| self.matches(doc, *id)).collect()
    }

    /// First matching element in document order
    pub fn select_first(&self, doc: &Document) -> Option<NodeId> {
        doc.elements().find(|id| self.matches(doc, *id))
    }

    /// Highest specificity among the alternatives matching `node`
    pub fn specificity_for(&self, doc: &Document, node: NodeId) -> Option<Specificity> {
        self.alternatives
            .iter()
            .filter(|path| matches_steps(doc, &path.steps, node))
            .map(Path::specificity)
            .max()
    }

    /// Render as an XPath 1.0 expression
    pub fn to_xpath(&self) -> String {
        self.alternatives
            .iter()
            .map(Path::to_xpath)
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl Path {
    pub fn specificity(&self) -> Specificity {
        let mut total = (0, 0, 0);
        for step in &self.steps {
            if step.test.tag.is_some() {
                total.2 += 1;
            }
            for predicate in &step.test.predicates {
                match predicate {
                    Predicate::Id(_) => total.0 += 1,
                    Predicate::Classes(classes) => total.1 += classes.len() as u32,
                    Predicate::Approximated(raw) if raw.starts_with("::") => total.2 += 1,
                    _ => total.1 += 1,
                }
            }
        }
        total
    }

    fn to_xpath(&self) -> String {
        let mut out = String::new();
        for step in &self.steps {
            let name = step.test.tag.as_deref().unwrap_or("*");
            match step.combinator {
                Combinator::Descendant => {
                    out.push_str("//");
                    out.push_str(name);
                }
                Combinator::Child => {
                    out.push('/');
                    out.push_str(name);
                }
                Combinator::Adjacent => {
                    out.push_str("/following-sibling::*[1]");
                    if step.test.tag.is_some() {
                        out.push_str(&format!("[self::{}]", name));
                    }
                }
                Combinator::Sibling => {
                    out.push_str("/following-sibling::");
                    out.push_str(name);
                }
            }
            for predicate in &step.test.predicates {
                out.push_str(&predicate.to_xpath());
            }
        }
        out
    }
}

impl NodeTest {
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(el) = doc.element(node) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if !el.name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        self.predicates.iter().all(|p| p.matches(doc, node))
    }
}

impl Predicate {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(el) = doc.element(node) else {
            return false;
        };
        match self {
            Predicate::Id(id) => el.attr("id") == Some(id.as_str()),
            Predicate::Classes(classes) => classes.iter().all(|c| el.has_class(c)),
            Predicate::HasAttr(name) => el.attr(name).is_some(),
            Predicate::Attr {
                name,
                op,
                value,
                case_insensitive,
            } => {
                let Some(actual) = el.attr(name) else {
                    return false;
                };
                let (actual, value) = if *case_insensitive {
                    (actual.to_lowercase(), value.to_lowercase())
                } else {
                    (actual.to_string(), value.clone())
                };
                match op {
                    AttrOp::Equals => actual == value,
                    AttrOp::Prefix => !value.is_empty() && actual.starts_with(&value),
                    AttrOp::Suffix => !value.is_empty() && actual.ends_with(&value),
                    AttrOp::Contains => !value.is_empty() && actual.contains(&value),
                    AttrOp::Word => actual.split_whitespace().any(|w| w == value),
                    AttrOp::DashPrefix => {
                        actual == value || actual.starts_with(&format!("{}-", value))
                    }
                }
            }
            Predicate::FirstChild => doc.prev_element_sibling(node).is_none(),
            Predicate::LastChild => doc.next_element_sibling(node).is_none(),
            Predicate::OnlyChild => {
                doc.prev_element_sibling(node).is_none() && doc.next_element_sibling(node).is_none()
            }
            Predicate::NthChild { a, b } => {
                // Widened so extreme coefficients cannot overflow
                let (a, b) = (i64::from(*a), i64::from(*b));
                let index = doc.element_index(node) as i64;
                if a == 0 {
                    index == b
                } else {
                    let diff = index - b;
                    diff % a == 0 && diff / a >= 0
                }
            }
            Predicate::Approximated(_) => true,
        }
    }

    fn to_xpath(&self) -> String {
        match self {
            Predicate::Id(id) => format!("[@id={}]", xpath_literal(id)),
            Predicate::Classes(classes) => classes
                .iter()
                .map(|c| {
                    format!(
                        "[contains(concat(' ', normalize-space(@class), ' '), {})]",
                        xpath_literal(&format!(" {} ", c))
                    )
                })
                .collect(),
            Predicate::HasAttr(name) => format!("[@{}]", name),
            Predicate::Attr { name, op, value, .. } => {
                let lit = xpath_literal(value);
                match op {
                    AttrOp::Equals => format!("[@{}={}]", name, lit),
                    AttrOp::Prefix => format!("[starts-with(@{}, {})]", name, lit),
                    AttrOp::Suffix => format!(
                        "[substring(@{n}, string-length(@{n}) - string-length({v}) + 1) = {v}]",
                        n = name,
                        v = lit
                    ),
                    AttrOp::Contains => format!("[contains(@{}, {})]", name, lit),
                    AttrOp::Word => format!(
                        "[contains(concat(' ', normalize-space(@{}), ' '), {})]",
                        name,
                        xpath_literal(&format!(" {} ", value))
                    ),
                    AttrOp::DashPrefix => format!(
                        "[@{n}={v} or starts-with(@{n}, {d})]",
                        n = name,
                        v = lit,
                        d = xpath_literal(&format!("{}-", value))
                    ),
                }
            }
            Predicate::FirstChild => "[not(preceding-sibling::*)]".to_string(),
            Predicate::LastChild => "[not(following-sibling::*)]".to_string(),
            Predicate::OnlyChild => "[not(preceding-sibling::*) and not(following-sibling::*)]".to_string(),
            Predicate::NthChild { a: 0, b } => {
                format!("[count(preceding-sibling::*) = {}]", i64::from(*b) - 1)
            }
            Predicate::NthChild { a, b } => format!(
                "[(count(preceding-sibling::*) + 1 - {b}) mod {a} = 0 and (count(preceding-sibling::*) + 1 - {b}) div {a} >= 0]",
                a = a,
                b = b
            ),
            Predicate::Approximated(_) => String::new(),
        }
    }
}

fn xpath_literal(value: &str) -> String {
    if value.contains('\'') {
        format!("\"{}\"", value)
    } else {
        format!("'{}'", value)
    }
}

fn matches_steps(doc: &Document, steps: &[Step], node: NodeId) -> bool {
    let Some((last, rest)) = steps.split_last() else {
        return false;
    };
    if !last.test.matches(doc, node) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }

    match last.combinator {
        Combinator::Child => doc
            .parent_element(node)
            .map(|p| matches_steps(doc, rest, p))
            .unwrap_or(false),
        Combinator::Descendant => doc.ancestors(node).any(|a| matches_steps(doc, rest, a)),
        Combinator::Adjacent => doc
            .prev_element_sibling(node)
            .map(|s| matches_steps(doc, rest, s))
            .unwrap_or(false),
        Combinator::Sibling => {
            let mut sibling = doc.prev_element_sibling(node);
            while let Some(s) = sibling {
                if matches_steps(doc, rest, s) {
                    return true;
                }
                sibling = doc.prev_element_sibling(s);
            }
            false
        }
    }
}
