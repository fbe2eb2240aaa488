//! Declarative validation schemas
//!
//! A [`Schema`] is configuration, not control flow: an ordered map of dotted
//! field paths to rule lists, plus cross-field refinements. The validation
//! engine executes schemas; steps carry a schema for just the fields they own
//! and the merged whole-object schema runs once at submission.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod path;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"));
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 ().-]{6,19}$").expect("phone regex"));
static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date regex"));

/// Classifies the kind of rule a value violated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCode {
    RequiredMissing,
    TooSmall,
    TooBig,
    InvalidFormat,
    InvalidType,
    InvalidChoice,
    Custom,
}

/// A single schema violation with the dotted path of the offending value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub code: ViolationCode,
    pub message: String,
}

impl Violation {
    fn new(path: impl Into<String>, code: ViolationCode, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            code,
            message: message.into(),
        }
    }
}

/// A constraint on a single field value
#[derive(Debug, Clone)]
pub enum Rule {
    /// Minimum string length in characters
    MinLen(usize),
    /// Maximum string length in characters
    MaxLen(usize),
    /// RFC-ish email shape
    Email,
    /// International phone number shape
    Phone,
    /// ISO date (YYYY-MM-DD)
    DateYmd,
    /// Minimum numeric value (inclusive)
    Min(f64),
    /// Maximum numeric value (inclusive)
    Max(f64),
    /// String must be one of the listed values
    OneOf(Vec<String>),
    /// Array must contain at least one element
    NonEmpty,
    /// Each array element is validated against a nested schema;
    /// violation paths are joined as `parent.<index>.<subpath>`
    Each(Box<Schema>),
}

/// Rules attached to one dotted field path
#[derive(Debug, Clone, Default)]
pub struct FieldRules {
    pub required: bool,
    pub rules: Vec<Rule>,
}

impl FieldRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required() -> Self {
        Self {
            required: true,
            rules: Vec::new(),
        }
    }

    pub fn optional() -> Self {
        Self::new()
    }

    pub fn min_len(mut self, n: usize) -> Self {
        self.rules.push(Rule::MinLen(n));
        self
    }

    pub fn max_len(mut self, n: usize) -> Self {
        self.rules.push(Rule::MaxLen(n));
        self
    }

    pub fn email(mut self) -> Self {
        self.rules.push(Rule::Email);
        self
    }

    pub fn phone(mut self) -> Self {
        self.rules.push(Rule::Phone);
        self
    }

    pub fn date_ymd(mut self) -> Self {
        self.rules.push(Rule::DateYmd);
        self
    }

    pub fn min(mut self, n: f64) -> Self {
        self.rules.push(Rule::Min(n));
        self
    }

    pub fn max(mut self, n: f64) -> Self {
        self.rules.push(Rule::Max(n));
        self
    }

    pub fn one_of(mut self, options: &[&str]) -> Self {
        self.rules
            .push(Rule::OneOf(options.iter().map(|s| (*s).to_string()).collect()));
        self
    }

    pub fn non_empty(mut self) -> Self {
        self.rules.push(Rule::NonEmpty);
        self
    }

    pub fn each(mut self, item_schema: Schema) -> Self {
        self.rules.push(Rule::Each(Box::new(item_schema)));
        self
    }
}

/// A cross-field check over the whole (or step-local) object.
///
/// `check` returns `true` when the object is acceptable. The violation is
/// reported against `path` so the UI can attach it to a concrete field.
#[derive(Debug, Clone)]
pub struct Refinement {
    /// Top-level fields the check reads; used by `pick` to decide whether the
    /// refinement survives subsetting
    pub roots: Vec<String>,
    pub path: String,
    pub code: ViolationCode,
    pub message: String,
    pub check: fn(&Value) -> bool,
}

/// Declarative validation schema: field rules plus cross-field refinements
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: BTreeMap<String, FieldRules>,
    refinements: Vec<Refinement>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach rules to a dotted field path
    pub fn field(mut self, path: impl Into<String>, rules: FieldRules) -> Self {
        self.fields.insert(path.into(), rules);
        self
    }

    /// Attach a cross-field refinement
    pub fn refine(
        mut self,
        roots: &[&str],
        report_path: impl Into<String>,
        message: impl Into<String>,
        check: fn(&Value) -> bool,
    ) -> Self {
        self.refinements.push(Refinement {
            roots: roots.iter().map(|s| (*s).to_string()).collect(),
            path: report_path.into(),
            code: ViolationCode::Custom,
            message: message.into(),
            check,
        });
        self
    }

    /// Rules registered for an exact dotted path, if any
    pub fn field_rules(&self, path: &str) -> Option<&FieldRules> {
        self.fields.get(path)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.refinements.is_empty()
    }

    /// Top-level field names this schema constrains
    pub fn roots(&self) -> Vec<String> {
        let mut roots: Vec<String> = self
            .fields
            .keys()
            .map(|k| path::root_segment(k).to_string())
            .collect();
        roots.dedup();
        roots
    }

    /// Subset of this schema covering only the given top-level fields.
    /// Refinements survive only when every field they read is retained.
    pub fn pick(&self, fields: &[&str]) -> Schema {
        let retained: BTreeMap<String, FieldRules> = self
            .fields
            .iter()
            .filter(|(k, _)| fields.contains(&path::root_segment(k)))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let refinements = self
            .refinements
            .iter()
            .filter(|r| r.roots.iter().all(|root| fields.contains(&root.as_str())))
            .cloned()
            .collect();
        Schema {
            fields: retained,
            refinements,
        }
    }

    /// Union of two schemas. Field rules from `other` win on path collisions.
    pub fn merge(mut self, other: Schema) -> Schema {
        self.fields.extend(other.fields);
        self.refinements.extend(other.refinements);
        self
    }

    /// Run every field rule and refinement against `data`
    pub fn validate(&self, data: &Value) -> Vec<Violation> {
        let mut violations = Vec::new();
        for (field_path, rules) in &self.fields {
            check_field(data, field_path, rules, &mut violations);
        }
        for refinement in &self.refinements {
            if !(refinement.check)(data) {
                violations.push(Violation::new(
                    refinement.path.clone(),
                    refinement.code,
                    refinement.message.clone(),
                ));
            }
        }
        violations
    }

    /// Run only the rules registered at `path` against a standalone value.
    /// Returns the first violation, or `None` when the path has no rules.
    pub fn validate_value(&self, field_path: &str, value: &Value) -> Option<Violation> {
        let rules = self.fields.get(field_path)?;
        let mut violations = Vec::new();
        check_value(field_path, value, rules, &mut violations);
        violations.into_iter().next()
    }
}

fn check_field(data: &Value, field_path: &str, rules: &FieldRules, out: &mut Vec<Violation>) {
    match path::lookup(data, field_path) {
        Some(value) if !path::is_blank(value) => check_value(field_path, value, rules, out),
        _ => {
            if rules.required {
                out.push(Violation::new(
                    field_path,
                    ViolationCode::RequiredMissing,
                    "is required",
                ));
            }
        }
    }
}

fn check_value(field_path: &str, value: &Value, rules: &FieldRules, out: &mut Vec<Violation>) {
    for rule in &rules.rules {
        match rule {
            Rule::MinLen(n) => match value.as_str() {
                Some(s) if s.chars().count() < *n => out.push(Violation::new(
                    field_path,
                    ViolationCode::TooSmall,
                    format!("must be at least {n} characters"),
                )),
                Some(_) => {}
                None => push_type_error(field_path, "a string", out),
            },
            Rule::MaxLen(n) => match value.as_str() {
                Some(s) if s.chars().count() > *n => out.push(Violation::new(
                    field_path,
                    ViolationCode::TooBig,
                    format!("must be at most {n} characters"),
                )),
                Some(_) => {}
                None => push_type_error(field_path, "a string", out),
            },
            Rule::Email => check_format(field_path, value, &EMAIL_RE, "a valid email address", out),
            Rule::Phone => check_format(field_path, value, &PHONE_RE, "a valid phone number", out),
            Rule::DateYmd => check_format(field_path, value, &DATE_RE, "a date (YYYY-MM-DD)", out),
            Rule::Min(n) => match value.as_f64() {
                Some(v) if v < *n => out.push(Violation::new(
                    field_path,
                    ViolationCode::TooSmall,
                    format!("must be at least {n}"),
                )),
                Some(_) => {}
                None => push_type_error(field_path, "a number", out),
            },
            Rule::Max(n) => match value.as_f64() {
                Some(v) if v > *n => out.push(Violation::new(
                    field_path,
                    ViolationCode::TooBig,
                    format!("must be at most {n}"),
                )),
                Some(_) => {}
                None => push_type_error(field_path, "a number", out),
            },
            Rule::OneOf(options) => match value.as_str() {
                Some(s) if !options.iter().any(|o| o == s) => out.push(Violation::new(
                    field_path,
                    ViolationCode::InvalidChoice,
                    format!("must be one of: {}", options.join(", ")),
                )),
                Some(_) => {}
                None => push_type_error(field_path, "a string", out),
            },
            Rule::NonEmpty => match value.as_array() {
                Some(items) if items.is_empty() => out.push(Violation::new(
                    field_path,
                    ViolationCode::TooSmall,
                    "must contain at least one item",
                )),
                Some(_) => {}
                None => push_type_error(field_path, "a list", out),
            },
            Rule::Each(item_schema) => match value.as_array() {
                Some(items) => {
                    for (index, item) in items.iter().enumerate() {
                        for violation in item_schema.validate(item) {
                            let nested =
                                path::join(&path::join(field_path, &index.to_string()), &violation.path);
                            out.push(Violation::new(nested, violation.code, violation.message));
                        }
                    }
                }
                None => push_type_error(field_path, "a list", out),
            },
        }
    }
}

fn check_format(field_path: &str, value: &Value, re: &Regex, expected: &str, out: &mut Vec<Violation>) {
    match value.as_str() {
        Some(s) if !re.is_match(s.trim()) => out.push(Violation::new(
            field_path,
            ViolationCode::InvalidFormat,
            format!("must be {expected}"),
        )),
        Some(_) => {}
        None => push_type_error(field_path, "a string", out),
    }
}

fn push_type_error(field_path: &str, expected: &str, out: &mut Vec<Violation>) {
    out.push(Violation::new(
        field_path,
        ViolationCode::InvalidType,
        format!("must be {expected}"),
    ));
}
