//! Request validation.
//!
//! Request shapes derive [`validator::Validate`]; the post-specific checks
//! live in [`posts`]. Failures are collected into [`ValidationErrors`], a
//! field to messages map where an empty map means the request is valid. The
//! [`Validated`](crate::api::Validated) extractor runs these before a handler
//! is invoked.

mod posts;


use std::collections::BTreeMap;

use serde::Serialize;

pub use posts::{
    validate_content, validate_post_id, validate_title, PLACEHOLDER, REQUIRED_ID_VERSION,
};

/// Field name to violation messages. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message to `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Messages recorded for `field`.
    pub fn field(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of messages across all fields.
    pub fn len(&self) -> usize {
        self.fields.values().map(Vec::len).sum()
    }
}

/// Field keys are reported the way clients name them (`title` -> `Title`).
fn display_name(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl From<validator::ValidationErrors> for ValidationErrors {
    fn from(report: validator::ValidationErrors) -> Self {
        let mut errors = Self::new();
        for (field, failures) in report.field_errors() {
            let name = display_name(&field);
            for failure in failures {
                let message = failure
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("'{name}' is invalid ({}).", failure.code));
                errors.add(name.clone(), message);
            }
        }
        errors
    }
}
