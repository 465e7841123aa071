//! Author model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use super::{
    blank_to_none, blank_to_null, check_email, check_max_length, check_string, finish, into_text,
    required, Book,
};

/// Full author record from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i64,
    pub name: String,
    /// Unique across all authors when set
    pub email: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Author list entry, annotated with the number of books it owns
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct AuthorWithBooksCount {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub author: Author,
    pub books_count: i64,
}

/// Author detail with its books eagerly loaded
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorWithBooks {
    #[serde(flatten)]
    pub author: Author,
    pub books: Vec<Book>,
}

/// Create author request. Fields are raw JSON so a wrong type is a field error, not a bad body.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateAuthor {
    #[schema(value_type = String)]
    pub name: Option<Value>,
    #[schema(value_type = Option<String>)]
    pub email: Option<Value>,
    #[schema(value_type = Option<String>)]
    pub bio: Option<Value>,
}

impl CreateAuthor {
    pub fn normalized(self) -> Self {
        Self {
            name: blank_to_none(self.name),
            email: blank_to_none(self.email),
            bio: blank_to_none(self.bio),
        }
    }

    /// Submitted email, when it is a string
    pub fn email(&self) -> Option<&str> {
        self.email.as_ref().and_then(Value::as_str)
    }

    /// Call only after `validate()` succeeded
    pub fn into_new(self) -> NewAuthor {
        NewAuthor {
            name: into_text(self.name).unwrap_or_default(),
            email: into_text(self.email),
            bio: into_text(self.bio),
        }
    }
}

impl Validate for CreateAuthor {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        match &self.name {
            None => required(&mut errors, "name"),
            Some(name) => check_name(&mut errors, name),
        }
        if let Some(email) = &self.email {
            check_email_field(&mut errors, email);
        }
        if let Some(bio) = &self.bio {
            check_string(&mut errors, "bio", bio);
        }

        finish(errors)
    }
}

fn check_name(errors: &mut ValidationErrors, value: &Value) {
    if let Some(name) = check_string(errors, "name", value) {
        check_max_length(errors, "name", name);
    }
}

fn check_email_field(errors: &mut ValidationErrors, value: &Value) {
    if let Some(email) = check_string(errors, "email", value) {
        check_email(errors, "email", email);
        check_max_length(errors, "email", email);
    }
}

/// Update author request. Absent fields are left untouched, `null` clears a nullable field.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateAuthor {
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub name: Option<Option<Value>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub email: Option<Option<Value>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub bio: Option<Option<Value>>,
}

impl UpdateAuthor {
    pub fn normalized(self) -> Self {
        Self {
            name: blank_to_null(self.name),
            email: blank_to_null(self.email),
            bio: blank_to_null(self.bio),
        }
    }

    /// New email value, if the request sets one
    pub fn new_email(&self) -> Option<&str> {
        self.email.as_ref().and_then(Option::as_ref).and_then(Value::as_str)
    }

    /// Call only after `validate()` succeeded
    pub fn into_changes(self) -> AuthorChanges {
        AuthorChanges {
            name: into_text(self.name.flatten()),
            email: self.email.map(into_text),
            bio: self.bio.map(into_text),
        }
    }
}

impl Validate for UpdateAuthor {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        match &self.name {
            None => {}
            Some(None) => required(&mut errors, "name"),
            Some(Some(name)) => check_name(&mut errors, name),
        }
        if let Some(Some(email)) = &self.email {
            check_email_field(&mut errors, email);
        }
        if let Some(Some(bio)) = &self.bio {
            check_string(&mut errors, "bio", bio);
        }

        finish(errors)
    }
}

/// Validated values for a new author row
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuthor {
    pub name: String,
    pub email: Option<String>,
    pub bio: Option<String>,
}

/// Validated column changes for an existing author row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorChanges {
    pub name: Option<String>,
    pub email: Option<Option<String>>,
    pub bio: Option<Option<String>>,
}

impl AuthorChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.bio.is_none()
    }
}
