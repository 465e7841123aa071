//! Data models for Bookshelf

pub mod author;
pub mod book;

use std::borrow::Cow;

use serde_json::Value;
use validator::{ValidateEmail, ValidationError, ValidationErrors};

// Re-export commonly used types
pub use author::{Author, AuthorWithBooks, AuthorWithBooksCount};
pub use book::{Book, BookWithAuthor};

/// Maximum length of short string columns, in characters
pub const MAX_STRING_LENGTH: usize = 255;

/// `null` and whitespace-only strings count as "not provided".
/// Other JSON types are kept so the type rules can report them.
pub(crate) fn blank_to_none(value: Option<Value>) -> Option<Value> {
    value.filter(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    })
}

/// Same as [`blank_to_none`] for a partial-update field: a blank value becomes an explicit null
pub(crate) fn blank_to_null(value: Option<Option<Value>>) -> Option<Option<Value>> {
    value.map(blank_to_none)
}

/// Owned text of a validated string field
pub(crate) fn into_text(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

fn humanize(field: &str) -> String {
    field.replace('_', " ")
}

fn rule_error(code: &'static str, message: String) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Owned(message));
    error
}

pub(crate) fn required(errors: &mut ValidationErrors, field: &'static str) {
    errors.add(
        field,
        rule_error("required", format!("The {} field is required.", humanize(field))),
    );
}

/// Returns the text of `value`, or records a type error when it is not a JSON string
pub(crate) fn check_string<'a>(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: &'a Value,
) -> Option<&'a str> {
    let text = value.as_str();
    if text.is_none() {
        errors.add(
            field,
            rule_error("string", format!("The {} field must be a string.", humanize(field))),
        );
    }
    text
}

pub(crate) fn check_max_length(errors: &mut ValidationErrors, field: &'static str, value: &str) {
    if value.chars().count() > MAX_STRING_LENGTH {
        errors.add(
            field,
            rule_error(
                "length",
                format!(
                    "The {} field must not be greater than {} characters.",
                    humanize(field),
                    MAX_STRING_LENGTH
                ),
            ),
        );
    }
}

pub(crate) fn check_email(errors: &mut ValidationErrors, field: &'static str, value: &str) {
    if !value.validate_email() {
        errors.add(
            field,
            rule_error(
                "email",
                format!("The {} field must be a valid email address.", humanize(field)),
            ),
        );
    }
}

pub(crate) fn invalid(errors: &mut ValidationErrors, field: &'static str, code: &'static str, message: String) {
    errors.add(field, rule_error(code, message));
}

/// `Ok(())` when no rule failed
pub(crate) fn finish(errors: ValidationErrors) -> Result<(), ValidationErrors> {
    if errors.errors().is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
