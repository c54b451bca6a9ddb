//! Field-level validation errors shared by the domain models.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

pub const BLANK: &str = "can't be blank";
pub const NOT_INCLUDED: &str = "is not included in the list";
pub const TAKEN: &str = "has already been taken";
pub const INVALID: &str = "is invalid";

/// Validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for a single failure.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Record a "can't be blank" error if the value is missing or whitespace.
    pub fn require(&mut self, field: &str, value: Option<&str>) -> bool {
        let present = value.is_some_and(|v| !v.trim().is_empty());
        if !present {
            self.add(field, BLANK);
        }
        present
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Messages prefixed with a humanized field name, e.g. "Primary url is invalid".
    pub fn full_messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .flat_map(|(field, messages)| {
                let label = humanize(field);
                messages.iter().map(move |m| format!("{} {}", label, m))
            })
            .collect()
    }

    /// `Ok(())` when nothing was recorded, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_messages().join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

fn humanize(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_and_full_messages() {
        let mut errors = ValidationErrors::new();
        assert!(!errors.require("primary_url", Some("  ")));
        assert!(errors.require("name", Some("City Hall")));
        errors.add("primary_url", INVALID);

        assert_eq!(errors.get("primary_url").len(), 2);
        assert!(errors.get("name").is_empty());
        assert_eq!(
            errors.full_messages(),
            vec!["Primary url can't be blank", "Primary url is invalid"]
        );
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn test_serializes_as_field_map() {
        let errors = ValidationErrors::single("name", TAKEN);
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({"name": ["has already been taken"]}));
    }
}
