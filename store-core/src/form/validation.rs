use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// Submitted form values keyed by field name.
pub type FormData = BTreeMap<String, String>;

pub const NOT_BLANK_MESSAGE: &str = "This value should not be blank.";
pub const INVALID_MESSAGE: &str = "This value is not valid.";
pub const FLOAT_INVALID_MESSAGE: &str = "form.type.float.invalid";

/// Non-negative decimal such as `8` or `8.5`.
pub static UNSIGNED_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)?$").expect("valid regex"));

#[derive(Debug, Clone)]
pub enum Constraint {
    NotBlank,
    /// Maximum number of characters.
    Length { max: usize },
    Pattern {
        regex: &'static LazyLock<Regex>,
        message: &'static str,
    },
}

impl Constraint {
    /// Returns the violation message, if any. Only `NotBlank` rejects an
    /// empty value.
    pub fn check(&self, value: &str) -> Option<String> {
        match self {
            Self::NotBlank if value.is_empty() => Some(NOT_BLANK_MESSAGE.to_string()),
            Self::NotBlank => None,
            _ if value.is_empty() => None,
            Self::Length { max } if value.chars().count() > *max => Some(format!(
                "This value is too long. It should have {max} character{} or less.",
                if *max == 1 { "" } else { "s" }
            )),
            Self::Length { .. } => None,
            Self::Pattern { regex, message } => {
                (!regex.is_match(value)).then(|| message.to_string())
            }
        }
    }
}

/// Validation messages per field, in field-name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of fields with at least one message.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }
}
