/**
 * Schema Validation
 * Field-by-field checks over raw JSON payloads with a field-keyed error set
 */
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

lazy_static! {
    pub static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9-]+$").unwrap();
    pub static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
}

pub const MAX_EMAIL_LENGTH: usize = 254;

/// Field name to the list of rules that field broke.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Whether required fields must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update,
}

/// Length bounds for a string field, counted in characters after trimming.
#[derive(Debug, Clone, Copy, Default)]
pub struct Text {
    pub min: usize,
    pub max: Option<usize>,
}

impl Text {
    pub const ANY: Text = Text { min: 0, max: None };

    pub const fn min(min: usize) -> Self {
        Text { min, max: None }
    }

    pub const fn max(max: usize) -> Self {
        Text { min: 0, max: Some(max) }
    }

    pub const fn between(min: usize, max: usize) -> Self {
        Text { min, max: Some(max) }
    }

    fn check(&self, value: &str) -> Option<String> {
        let len = value.chars().count();
        if len < self.min {
            return Some(format!("must be at least {} characters", self.min));
        }
        match self.max {
            Some(max) if len > max => Some(format!("must be at most {max} characters")),
            _ => None,
        }
    }
}

/// Reader over a JSON object that records every broken rule instead of
/// stopping at the first one. Call [`Payload::finish`] to get the verdict.
pub struct Payload<'a> {
    fields: &'a Map<String, Value>,
    mode: Mode,
    errors: ValidationErrors,
}

impl<'a> Payload<'a> {
    pub fn parse(value: &'a Value, mode: Mode) -> Result<Self, ValidationErrors> {
        match value {
            Value::Object(fields) => Ok(Self {
                fields,
                mode,
                errors: ValidationErrors::default(),
            }),
            _ => Err(ValidationErrors::single("body", "must be a JSON object")),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn raw(&self, field: &str) -> Option<&'a Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    fn missing(&mut self, field: &str) {
        if self.mode == Mode::Create && !self.errors.contains(field) {
            self.errors.add(field, "is required");
        }
    }

    fn string(&mut self, field: &str) -> Option<&'a str> {
        match self.raw(field)? {
            Value::String(s) => Some(s.trim()),
            _ => {
                self.errors.add(field, "must be a string");
                None
            }
        }
    }

    /// Optional string; absent or null reads as `None`.
    pub fn text(&mut self, field: &str, rule: Text) -> Option<String> {
        let value = self.string(field)?;
        match rule.check(value) {
            Some(message) => {
                self.errors.add(field, message);
                None
            }
            None => Some(value.to_string()),
        }
    }

    /// String that must be present on create.
    pub fn required_text(&mut self, field: &str, rule: Text) -> Option<String> {
        let value = self.text(field, rule);
        if value.is_none() {
            self.missing(field);
        }
        value
    }

    /// String that may be cleared. Absent is `None`, null or blank is
    /// `Some(None)`, anything else is checked against `rule`.
    pub fn nullable_text(&mut self, field: &str, rule: Text) -> Option<Option<String>> {
        if !self.fields.contains_key(field) {
            return None;
        }
        match self.string(field) {
            None if self.errors.contains(field) => None,
            None | Some("") => Some(None),
            Some(value) => match rule.check(value) {
                Some(message) => {
                    self.errors.add(field, message);
                    None
                }
                None => Some(Some(value.to_string())),
            },
        }
    }

    pub fn required_slug(&mut self, field: &str) -> Option<String> {
        let value = self.required_text(field, Text::min(1))?;
        if SLUG_REGEX.is_match(&value) {
            Some(value)
        } else {
            self.errors
                .add(field, "must contain only lowercase letters, digits and hyphens");
            None
        }
    }

    /// Absolute URL or an empty value that normalizes to null.
    pub fn url(&mut self, field: &str) -> Option<Option<String>> {
        let value = self.nullable_text(field, Text::ANY)?;
        match value {
            None => Some(None),
            Some(raw) => match url::Url::parse(&raw) {
                Ok(_) => Some(Some(raw)),
                Err(_) => {
                    self.errors.add(field, "must be a valid URL");
                    None
                }
            },
        }
    }

    pub fn email(&mut self, field: &str) -> Option<String> {
        let value = self.text(field, Text::min(1))?;
        if value.len() <= MAX_EMAIL_LENGTH && EMAIL_REGEX.is_match(&value) {
            Some(value)
        } else {
            self.errors.add(field, "must be a valid email address");
            None
        }
    }

    /// Enum membership. `allowed` is only used for the error message.
    pub fn choice<T: FromStr>(&mut self, field: &str, allowed: &[&str]) -> Option<T> {
        let value = self.string(field)?;
        match value.parse() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                self.errors
                    .add(field, format!("must be one of: {}", allowed.join(", ")));
                None
            }
        }
    }

    pub fn required_choice<T: FromStr>(&mut self, field: &str, allowed: &[&str]) -> Option<T> {
        let value = self.choice(field, allowed);
        if value.is_none() {
            self.missing(field);
        }
        value
    }

    /// Non-empty date string, or empty/null for "no date".
    pub fn nullable_date(&mut self, field: &str) -> Option<Option<String>> {
        self.nullable_text(field, Text::ANY)
    }

    /// JSON array of strings or a comma-separated string. Entries are trimmed
    /// and empty ones dropped.
    pub fn list(&mut self, field: &str) -> Option<Vec<String>> {
        let items = match self.raw(field)? {
            Value::String(s) => s.split(',').map(|item| item.trim().to_string()).collect(),
            Value::Array(values) => {
                let mut items = Vec::with_capacity(values.len());
                for value in values {
                    match value {
                        Value::String(s) => items.push(s.trim().to_string()),
                        _ => {
                            self.errors.add(field, "must be a list of strings");
                            return None;
                        }
                    }
                }
                items
            }
            _ => {
                self.errors.add(field, "must be a list of strings");
                return None;
            }
        };
        Some(
            items
                .into_iter()
                .filter(|item: &String| !item.is_empty())
                .collect(),
        )
    }

    pub fn flag(&mut self, field: &str) -> Option<bool> {
        match self.raw(field)? {
            Value::Bool(b) => Some(*b),
            _ => {
                self.errors.add(field, "must be a boolean");
                None
            }
        }
    }

    pub fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}
