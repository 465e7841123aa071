//! Authors service

use std::sync::Arc;

use validator::Validate;

use crate::{
    config::AuthorDeletePolicy,
    error::{AppError, AppResult, FieldErrors},
    models::{
        author::{CreateAuthor, UpdateAuthor},
        Author, AuthorWithBooks, AuthorWithBooksCount,
    },
    repository::{AuthorsStore, BooksStore, PageRequest},
};

#[derive(Clone)]
pub struct AuthorsService {
    authors: Arc<dyn AuthorsStore>,
    books: Arc<dyn BooksStore>,
    delete_policy: AuthorDeletePolicy,
}

impl AuthorsService {
    pub fn new(
        authors: Arc<dyn AuthorsStore>,
        books: Arc<dyn BooksStore>,
        delete_policy: AuthorDeletePolicy,
    ) -> Self {
        Self {
            authors,
            books,
            delete_policy,
        }
    }

    /// List authors ordered by name, with book counts
    pub async fn list(&self, page: PageRequest) -> AppResult<(Vec<AuthorWithBooksCount>, i64)> {
        self.authors.list(page).await
    }

    /// Get an author with all of its books
    pub async fn get(&self, id: i64) -> AppResult<AuthorWithBooks> {
        let author = self.authors.get_by_id(id).await?;
        let books = self.books.list_by_author(id).await?;
        Ok(AuthorWithBooks { author, books })
    }

    /// Create an author
    pub async fn create(&self, data: CreateAuthor) -> AppResult<Author> {
        let data = data.normalized();
        let mut errors = FieldErrors::from_rules(data.validate());

        if let Some(email) = data.email() {
            if !errors.has("email") && self.authors.email_exists(email, None).await? {
                errors.add("email", "The email has already been taken.");
            }
        }
        errors.into_result()?;

        let author = self.authors.create(&data.into_new()).await?;
        tracing::info!("Created author {}", author.id);
        Ok(author)
    }

    /// Update the fields present in `data`; the email check ignores the author itself
    pub async fn update(&self, id: i64, data: UpdateAuthor) -> AppResult<Author> {
        self.authors.get_by_id(id).await?;

        let data = data.normalized();
        let mut errors = FieldErrors::from_rules(data.validate());

        if let Some(email) = data.new_email() {
            if !errors.has("email") && self.authors.email_exists(email, Some(id)).await? {
                errors.add("email", "The email has already been taken.");
            }
        }
        errors.into_result()?;

        let author = self.authors.update(id, &data.into_changes()).await?;
        tracing::info!("Updated author {}", id);
        Ok(author)
    }

    /// Delete an author according to the configured policy for its books
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        match self.delete_policy {
            AuthorDeletePolicy::Restrict => {
                self.authors.get_by_id(id).await?;
                let books = self.books.count_by_author(id).await?;
                if books > 0 {
                    return Err(AppError::Conflict(format!(
                        "Cannot delete author {}: {} book(s) still reference it",
                        id, books
                    )));
                }
                self.authors.delete(id).await?;
            }
            AuthorDeletePolicy::Cascade => self.authors.delete_with_books(id).await?,
        }
        tracing::info!("Deleted author {}", id);
        Ok(())
    }
}
