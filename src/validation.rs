use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use crate::models::{Contact, ContactDraft, Note, NoteDraft, Task, TaskDraft};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+]?[1-9][\d\s\-()]{0,15}$").expect("phone pattern is valid"));

static PHONE_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\-()]").expect("separator pattern is valid"));

/// Per-field validation messages, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.insert(field, message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Something that must be checked before it is written to a collection
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn provided(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Spaces, dashes and parentheses are ignored
pub fn is_valid_phone(phone: &str) -> bool {
    let digits = PHONE_SEPARATORS.replace_all(phone, "");
    PHONE_RE.is_match(&digits)
}

impl Validate for ContactDraft {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if is_blank(&self.name) {
            errors.add("name", "Name is required");
        }
        if let Some(email) = provided(&self.email) {
            if !is_valid_email(email) {
                errors.add("email", "Please enter a valid email address");
            }
        }
        if let Some(phone) = provided(&self.phone) {
            if !is_valid_phone(phone) {
                errors.add("phone", "Please enter a valid phone number");
            }
        }
        errors.into_result()
    }
}

impl Validate for NoteDraft {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if is_blank(&self.title) {
            errors.add("title", "Title is required");
        }
        if is_blank(&self.content) {
            errors.add("content", "Content is required");
        }
        errors.into_result()
    }
}

impl Validate for TaskDraft {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if is_blank(&self.title) {
            errors.add("title", "Title is required");
        }
        if self.due_date.is_none() {
            errors.add("dueDate", "Due date is required");
        }
        errors.into_result()
    }
}

// Stored records, checked when they arrive from outside (imports). Optional
// fields are not re-checked so older data with loose phone numbers still loads.

impl Validate for Contact {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if is_blank(&self.name) {
            errors.add("name", "Name is required");
        }
        errors.into_result()
    }
}

impl Validate for Note {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if is_blank(&self.title) {
            errors.add("title", "Title is required");
        }
        if is_blank(&self.content) {
            errors.add("content", "Content is required");
        }
        errors.into_result()
    }
}

impl Validate for Task {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if is_blank(&self.title) {
            errors.add("title", "Title is required");
        }
        errors.into_result()
    }
}
