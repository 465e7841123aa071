//! Book model and related types

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use super::{
    blank_to_none, blank_to_null, check_max_length, check_string, finish, into_text, invalid,
    required, Author,
};

/// Full book record from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub description: Option<String>,
    /// Calendar date, serialized as YYYY-MM-DD
    pub published_at: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Book with its author eagerly loaded
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookWithAuthor {
    #[serde(flatten)]
    pub book: Book,
    pub author: Author,
}

/// Accepts a JSON integer or a string holding one
pub fn parse_author_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps and `YYYY-MM-DD HH:MM:SS`; keeps the date only
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|d| d.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|d| d.date())
        })
}

fn check_author_id(errors: &mut ValidationErrors, value: &Value) {
    if value.is_null() {
        required(errors, "author_id");
    } else if parse_author_id(value).is_none() {
        invalid(
            errors,
            "author_id",
            "integer",
            "The author id field must be an integer.".to_string(),
        );
    }
}

fn check_title(errors: &mut ValidationErrors, title: Option<&Value>) {
    match title {
        None => required(errors, "title"),
        Some(title) => {
            if let Some(title) = check_string(errors, "title", title) {
                check_max_length(errors, "title", title);
            }
        }
    }
}

fn check_published_at(errors: &mut ValidationErrors, value: &Value) {
    if value.as_str().and_then(parse_date).is_none() {
        invalid(
            errors,
            "published_at",
            "date",
            "The published at field must be a valid date.".to_string(),
        );
    }
}

fn published_date(value: Option<&Value>) -> Option<NaiveDate> {
    value.and_then(Value::as_str).and_then(parse_date)
}

/// Create book request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateBook {
    #[schema(value_type = i64)]
    pub author_id: Option<Value>,
    #[schema(value_type = String)]
    pub title: Option<Value>,
    #[schema(value_type = Option<String>)]
    pub description: Option<Value>,
    /// Any parseable date; stored without time component
    #[schema(value_type = Option<String>)]
    pub published_at: Option<Value>,
}

impl CreateBook {
    pub fn normalized(self) -> Self {
        Self {
            author_id: blank_to_none(self.author_id),
            title: blank_to_none(self.title),
            description: blank_to_none(self.description),
            published_at: blank_to_none(self.published_at),
        }
    }

    /// Referenced author, when `author_id` is a well-formed integer
    pub fn author_id(&self) -> Option<i64> {
        self.author_id.as_ref().and_then(parse_author_id)
    }

    /// Call only after `validate()` succeeded
    pub fn into_new(self) -> NewBook {
        NewBook {
            author_id: self.author_id().unwrap_or_default(),
            published_at: published_date(self.published_at.as_ref()),
            title: into_text(self.title).unwrap_or_default(),
            description: into_text(self.description),
        }
    }
}

impl Validate for CreateBook {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        check_author_id(&mut errors, self.author_id.as_ref().unwrap_or(&Value::Null));
        check_title(&mut errors, self.title.as_ref());
        if let Some(description) = &self.description {
            check_string(&mut errors, "description", description);
        }
        if let Some(published_at) = &self.published_at {
            check_published_at(&mut errors, published_at);
        }

        finish(errors)
    }
}

/// Update book request. Absent fields are left untouched, `null` clears a nullable field.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateBook {
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i64>)]
    pub author_id: Option<Option<Value>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub title: Option<Option<Value>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<Value>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub published_at: Option<Option<Value>>,
}

impl UpdateBook {
    pub fn normalized(self) -> Self {
        Self {
            author_id: blank_to_null(self.author_id),
            title: blank_to_null(self.title),
            description: blank_to_null(self.description),
            published_at: blank_to_null(self.published_at),
        }
    }

    /// Newly referenced author, when the request moves the book
    pub fn author_id(&self) -> Option<i64> {
        self.author_id.as_ref().and_then(|v| v.as_ref()).and_then(parse_author_id)
    }

    /// Call only after `validate()` succeeded
    pub fn into_changes(self) -> BookChanges {
        BookChanges {
            author_id: self.author_id(),
            title: into_text(self.title.flatten()),
            description: self.description.map(into_text),
            published_at: self.published_at.map(|d| published_date(d.as_ref())),
        }
    }
}

impl Validate for UpdateBook {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(author_id) = &self.author_id {
            check_author_id(&mut errors, author_id.as_ref().unwrap_or(&Value::Null));
        }
        if let Some(title) = &self.title {
            check_title(&mut errors, title.as_ref());
        }
        if let Some(Some(description)) = &self.description {
            check_string(&mut errors, "description", description);
        }
        if let Some(Some(published_at)) = &self.published_at {
            check_published_at(&mut errors, published_at);
        }

        finish(errors)
    }
}

/// Validated values for a new book row
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub author_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub published_at: Option<NaiveDate>,
}

/// Validated column changes for an existing book row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookChanges {
    pub author_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub published_at: Option<Option<NaiveDate>>,
}

impl BookChanges {
    pub fn is_empty(&self) -> bool {
        self.author_id.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.published_at.is_none()
    }
}
