//! Exhaustive schema validation for raw record mappings.
//!
//! The record shape is declared once as a static tree of [`Field`]s. A
//! single generic walker checks a raw JSON mapping against that tree,
//! coerces lenient encodings (numeric strings, integral floats, "yes"/"no"),
//! and collects every defect in one pass instead of stopping at the first.
//!
//! Rejected scalar values are nulled in the normalized record and kept in
//! [`Validation::invalid_values`] so comparators can report them as type
//! errors for that field.

use crate::record::{EsgRecord, Independence};
use crate::synonym::{PolicyTag, default_table, parse_flag};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const ROOT_PATH: &str = "$";

const ASSURANCE_LEVELS: &[&str] = &["Limited", "Reasonable"];

#[derive(Debug, Clone, Copy)]
enum Shape {
    Int,
    /// Non-negative integer.
    Count,
    Float,
    Bool,
    Text,
    Independence,
    Choice(&'static [&'static str]),
    Object(&'static [Field]),
    List(&'static Shape),
    /// Policy flags: canonical keys plus free phrase tags.
    Policies(&'static [Field]),
}

impl Shape {
    fn label(self) -> &'static str {
        match self {
            Self::Int => "an integer",
            Self::Count => "a non-negative integer",
            Self::Float => "a number",
            Self::Bool => "a boolean",
            Self::Text => "a string",
            Self::Independence => "one of Independent, Non-independent, Executive",
            Self::Choice(_) => "one of the allowed labels",
            Self::Object(_) | Self::Policies(_) => "an object",
            Self::List(_) => "a list",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    /// Absent or null reads as null.
    Optional,
    /// Absent or null invalidates the enclosing object.
    Required,
    /// Absent or null reads as the shape's empty value.
    Defaulted,
}

#[derive(Debug, Clone, Copy)]
struct Field {
    name: &'static str,
    shape: Shape,
    presence: Presence,
}

impl Field {
    const fn optional(name: &'static str, shape: Shape) -> Self {
        Self {
            name,
            shape,
            presence: Presence::Optional,
        }
    }

    const fn required(name: &'static str, shape: Shape) -> Self {
        Self {
            name,
            shape,
            presence: Presence::Required,
        }
    }

    const fn defaulted(name: &'static str, shape: Shape) -> Self {
        Self {
            name,
            shape,
            presence: Presence::Defaulted,
        }
    }
}

const MEMBER: Shape = Shape::Object(&[
    Field::required("name", Shape::Text),
    Field::optional("role", Shape::Text),
    Field::optional("independence", Shape::Independence),
]);

const COUNTS: Shape = Shape::Object(&[
    Field::optional("total", Shape::Count),
    Field::optional("independent", Shape::Count),
    Field::optional("women", Shape::Count),
]);

const BOARD: Shape = Shape::Object(&[
    Field::optional("chair", MEMBER),
    Field::defaulted("members", Shape::List(&MEMBER)),
    Field::defaulted("counts", COUNTS),
]);

const GHG: Shape = Shape::Object(&[
    Field::optional("base_year", Shape::Int),
    Field::optional("scope1_tco2e", Shape::Float),
    Field::optional("scope2_market_tco2e", Shape::Float),
    Field::optional("scope2_location_tco2e", Shape::Float),
    Field::optional("scope3_tco2e", Shape::Float),
    Field::optional("total_tco2e", Shape::Float),
    Field::optional("intensity_tco2e_per_eur_m", Shape::Float),
]);

const POLICIES: Shape = Shape::Policies(&[
    Field::optional("anti_corruption", Shape::Bool),
    Field::optional("whistleblowing", Shape::Bool),
    Field::optional("human_rights", Shape::Bool),
    Field::optional("climate_policy", Shape::Bool),
    Field::optional("dei_policy", Shape::Bool),
    Field::optional("assurance", Shape::Choice(ASSURANCE_LEVELS)),
]);

const RECORD: &[Field] = &[
    Field::optional("company", Shape::Text),
    Field::optional("year", Shape::Int),
    Field::defaulted("board", BOARD),
    Field::defaulted("ghg", GHG),
    Field::defaulted("policies", POLICIES),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefectKind {
    /// Present but not of the declared type.
    TypeMismatch,
    /// A required structural node is absent.
    MissingRequired,
    /// A string outside an enumerated label set.
    InvalidEnum,
    /// A policy phrase tag whose value is not a boolean.
    InvalidTag,
    /// The mapping cannot be read as a record at all.
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationDefect {
    pub path: String,
    pub kind: DefectKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found: Option<Value>,
}

impl std::fmt::Display for ValidationDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Outcome of lenient validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validation {
    /// `None` only when the mapping is fatally malformed.
    pub record: Option<EsgRecord>,
    pub defects: Vec<ValidationDefect>,
    /// Non-canonical policy phrases awaiting synonym normalization.
    pub policy_tags: Vec<PolicyTag>,
    /// Raw values rejected by type checks, keyed by field path.
    pub invalid_values: BTreeMap<String, Value>,
}

impl Validation {
    pub fn is_fatal(&self) -> bool {
        self.record.is_none()
    }

    pub fn is_clean(&self) -> bool {
        self.defects.is_empty()
    }

    fn fatal(message: impl Into<String>, found: Option<Value>) -> Self {
        Self {
            record: None,
            defects: vec![ValidationDefect {
                path: ROOT_PATH.to_string(),
                kind: DefectKind::Fatal,
                message: message.into(),
                found,
            }],
            policy_tags: Vec::new(),
            invalid_values: BTreeMap::new(),
        }
    }
}

/// Validate a raw mapping, returning the record only when no defect exists.
///
/// Policy phrase tags are resolved through the default synonym table.
pub fn validate(raw: &Value) -> Result<EsgRecord, Vec<ValidationDefect>> {
    let validation = validate_lenient(raw);
    if !validation.defects.is_empty() {
        return Err(validation.defects);
    }
    let Some(mut record) = validation.record else {
        return Err(validation.defects);
    };
    let normalized = crate::synonym::normalize_policies(&record.policies, &validation.policy_tags);
    record.policies = normalized.policies;
    Ok(record)
}

/// Validate a raw mapping, collecting every defect and keeping whatever
/// parts of the record are well-formed.
pub fn validate_lenient(raw: &Value) -> Validation {
    let Some(root) = raw.as_object() else {
        return Validation::fatal(
            format!("record must be an object, found {}", json_type(raw)),
            Some(raw.clone()),
        );
    };

    let mut walker = Walker::default();
    let normalized = walker.walk_fields("", RECORD, root);
    let record = match serde_json::from_value::<EsgRecord>(Value::Object(normalized)) {
        Ok(record) => record,
        Err(err) => {
            return Validation::fatal(format!("normalized record is unreadable: {err}"), None);
        }
    };

    Validation {
        record: Some(record),
        defects: walker.defects,
        policy_tags: walker.policy_tags,
        invalid_values: walker.invalid_values,
    }
}

#[derive(Default)]
struct Walker {
    defects: Vec<ValidationDefect>,
    policy_tags: Vec<PolicyTag>,
    invalid_values: BTreeMap<String, Value>,
}

impl Walker {
    fn defect(&mut self, path: &str, kind: DefectKind, message: String, found: Option<&Value>) {
        self.defects.push(ValidationDefect {
            path: path.to_string(),
            kind,
            message,
            found: found.cloned(),
        });
    }

    /// Walk declared fields; every declared field appears in the output.
    fn walk_fields(
        &mut self,
        path: &str,
        fields: &'static [Field],
        map: &Map<String, Value>,
    ) -> Map<String, Value> {
        let mut out = Map::new();
        for field in fields {
            let child = join_path(path, field.name);
            let value = match map.get(field.name).filter(|raw| !is_blank(raw)) {
                None => empty_value(field),
                Some(raw) => self
                    .walk_value(&child, field.shape, raw)
                    .unwrap_or_else(|| empty_value(field)),
            };
            out.insert(field.name.to_string(), value);
        }
        out
    }

    /// Walk an object, rejecting it when a required field is unusable.
    fn walk_object(
        &mut self,
        path: &str,
        fields: &'static [Field],
        map: &Map<String, Value>,
    ) -> Option<Value> {
        let mut complete = true;
        for field in fields.iter().filter(|f| f.presence == Presence::Required) {
            if map.get(field.name).is_none_or(is_blank) {
                let child = join_path(path, field.name);
                self.defect(
                    &child,
                    DefectKind::MissingRequired,
                    format!("required field `{}` is missing", field.name),
                    None,
                );
                complete = false;
            }
        }
        let out = self.walk_fields(path, fields, map);
        // A present-but-rejected required value was already reported as a
        // type defect; it still invalidates the object.
        let required_rejected = fields
            .iter()
            .filter(|f| f.presence == Presence::Required)
            .any(|f| out.get(f.name).is_none_or(Value::is_null));
        (complete && !required_rejected).then_some(Value::Object(out))
    }

    fn walk_value(&mut self, path: &str, shape: Shape, raw: &Value) -> Option<Value> {
        match shape {
            Shape::Object(fields) => match raw.as_object() {
                Some(map) => self.walk_object(path, fields, map),
                None => {
                    self.mismatch(path, shape, raw, false);
                    None
                }
            },
            Shape::List(item_shape) => {
                let Some(items) = raw.as_array() else {
                    self.mismatch(path, shape, raw, false);
                    return None;
                };
                let kept = items
                    .iter()
                    .enumerate()
                    .filter_map(|(idx, item)| {
                        self.walk_value(&format!("{path}[{idx}]"), *item_shape, item)
                    })
                    .collect();
                Some(Value::Array(kept))
            }
            Shape::Policies(fields) => self.walk_policies(path, fields, raw),
            scalar => {
                let coerced = coerce_scalar(scalar, raw);
                if coerced.is_none() {
                    self.mismatch(path, scalar, raw, true);
                }
                coerced
            }
        }
    }

    fn mismatch(&mut self, path: &str, shape: Shape, raw: &Value, keep_raw: bool) {
        let kind = match (shape, raw) {
            (Shape::Independence | Shape::Choice(_), Value::String(_)) => DefectKind::InvalidEnum,
            _ => DefectKind::TypeMismatch,
        };
        let message = match shape {
            Shape::Choice(labels) => format!(
                "expected one of {}, found {}",
                labels.join(", "),
                describe(raw)
            ),
            _ => format!("expected {}, found {}", shape.label(), describe(raw)),
        };
        self.defect(path, kind, message, Some(raw));
        if keep_raw {
            self.invalid_values.insert(path.to_string(), raw.clone());
        }
    }

    fn walk_policies(
        &mut self,
        path: &str,
        fields: &'static [Field],
        raw: &Value,
    ) -> Option<Value> {
        match raw {
            Value::Object(map) => {
                let out = self.walk_fields(path, fields, map);
                for (phrase, value) in map {
                    if fields.iter().any(|f| f.name == phrase) || value.is_null() {
                        continue;
                    }
                    let flag = coerce_scalar(Shape::Bool, value).and_then(|v| v.as_bool());
                    match flag {
                        Some(flag) => self.policy_tags.push(PolicyTag::new(phrase.clone(), flag)),
                        // Free-form keys that name no policy are ignored.
                        None if default_table().resolve(phrase).is_none() => {}
                        None => self.defect(
                            &join_path(path, phrase),
                            DefectKind::InvalidTag,
                            format!(
                                "policy phrase `{phrase}` must map to a boolean, found {}",
                                describe(value)
                            ),
                            Some(value),
                        ),
                    }
                }
                Some(Value::Object(out))
            }
            Value::Array(items) => {
                for (idx, item) in items.iter().enumerate() {
                    let item_path = format!("{path}[{idx}]");
                    match item {
                        Value::String(text) => self.push_tag_lines(&item_path, text),
                        Value::Null => {}
                        other => self.defect(
                            &item_path,
                            DefectKind::TypeMismatch,
                            format!("expected a policy tag string, found {}", describe(other)),
                            Some(other),
                        ),
                    }
                }
                Some(Value::Object(self.walk_fields(path, fields, &Map::new())))
            }
            Value::String(text) => {
                self.push_tag_lines(path, text);
                Some(Value::Object(self.walk_fields(path, fields, &Map::new())))
            }
            other => {
                self.mismatch(path, Shape::Policies(fields), other, false);
                None
            }
        }
    }

    fn push_tag_lines(&mut self, path: &str, text: &str) {
        for line in text.split(['\n', ';']) {
            if line.trim().is_empty() {
                continue;
            }
            match PolicyTag::parse(line) {
                Some(tag) => self.policy_tags.push(tag),
                None => self.defect(
                    path,
                    DefectKind::InvalidTag,
                    format!("policy tag `{}` has no boolean value", line.trim()),
                    Some(&Value::String(line.trim().to_string())),
                ),
            }
        }
    }
}

fn empty_value(field: &Field) -> Value {
    match (field.presence, field.shape) {
        (Presence::Defaulted, Shape::List(_)) => Value::Array(Vec::new()),
        (Presence::Defaulted, Shape::Object(fields) | Shape::Policies(fields)) => {
            let mut out = Map::new();
            for child in fields {
                out.insert(child.name.to_string(), empty_value(child));
            }
            Value::Object(out)
        }
        _ => Value::Null,
    }
}

fn coerce_scalar(shape: Shape, raw: &Value) -> Option<Value> {
    match shape {
        Shape::Int => coerce_int(raw).map(Value::from),
        Shape::Count => coerce_int(raw).filter(|n| *n >= 0).map(Value::from),
        Shape::Float => coerce_float(raw)
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        Shape::Bool => match raw {
            Value::Bool(flag) => Some(Value::Bool(*flag)),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Some(Value::Bool(false)),
                Some(1) => Some(Value::Bool(true)),
                _ => None,
            },
            Value::String(text) => parse_flag(text).map(Value::Bool),
            _ => None,
        },
        Shape::Text => raw
            .as_str()
            .map(|text| Value::String(text.trim().to_string())),
        Shape::Independence => raw
            .as_str()
            .and_then(Independence::parse)
            .map(|level| Value::String(level.label().to_string())),
        Shape::Choice(labels) => {
            let text = raw.as_str()?.trim();
            let stem = strip_suffix_ignore_case(text, " assurance");
            labels
                .iter()
                .find(|label| label.eq_ignore_ascii_case(stem))
                .map(|label| Value::String((*label).to_string()))
        }
        Shape::Object(_) | Shape::List(_) | Shape::Policies(_) => None,
    }
}

fn coerce_int(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(integral_f64)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(integral_f64))
        }
        _ => None,
    }
}

fn integral_f64(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
        Some(value as i64)
    } else {
        None
    }
}

fn coerce_float(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn strip_suffix_ignore_case<'a>(text: &'a str, suffix: &str) -> &'a str {
    if text.len() >= suffix.len()
        && text.is_char_boundary(text.len() - suffix.len())
        && text[text.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
    {
        &text[..text.len() - suffix.len()]
    } else {
        text
    }
}

fn is_blank(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn json_type(raw: &Value) -> &'static str {
    match raw {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn describe(raw: &Value) -> String {
    match raw {
        Value::Array(_) | Value::Object(_) => json_type(raw).to_string(),
        other => format!("{} {}", json_type(other), other),
    }
}
