//! Repository layer for database operations

pub mod authors;
pub mod books;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        author::{AuthorChanges, NewAuthor},
        book::{BookChanges, NewBook},
        Author, AuthorWithBooksCount, Book, BookWithAuthor,
    },
};

/// Fixed number of records per list page
pub const PER_PAGE: i64 = 10;

/// 1-based page of a list query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
}

impl PageRequest {
    /// Pages below 1 are clamped to the first page
    pub fn new(page: i64) -> Self {
        Self { page: page.max(1) }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        PER_PAGE
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(PER_PAGE)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Storage operations on the `authors` table
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthorsStore: Send + Sync {
    /// One page ordered by name, with book counts, plus the total number of authors
    async fn list(&self, page: PageRequest) -> AppResult<(Vec<AuthorWithBooksCount>, i64)>;

    async fn get_by_id(&self, id: i64) -> AppResult<Author>;

    async fn exists(&self, id: i64) -> AppResult<bool>;

    /// Whether another author already uses `email`
    async fn email_exists(&self, email: &str, exclude_id: Option<i64>) -> AppResult<bool>;

    async fn create(&self, data: &NewAuthor) -> AppResult<Author>;

    async fn update(&self, id: i64, changes: &AuthorChanges) -> AppResult<Author>;

    /// Fails with `Conflict` while books still reference the author
    async fn delete(&self, id: i64) -> AppResult<()>;

    /// Deletes the author and all of its books in one transaction
    async fn delete_with_books(&self, id: i64) -> AppResult<()>;
}

/// Storage operations on the `books` table
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BooksStore: Send + Sync {
    /// One page ordered by id descending, plus the total number of books
    async fn list(&self, page: PageRequest) -> AppResult<(Vec<BookWithAuthor>, i64)>;

    async fn list_by_author(&self, author_id: i64) -> AppResult<Vec<Book>>;

    async fn count_by_author(&self, author_id: i64) -> AppResult<i64>;

    async fn get_by_id(&self, id: i64) -> AppResult<BookWithAuthor>;

    async fn create(&self, data: &NewBook) -> AppResult<Book>;

    async fn update(&self, id: i64, changes: &BookChanges) -> AppResult<Book>;

    async fn delete(&self, id: i64) -> AppResult<()>;
}

/// Per-table stores sharing one connection pool
#[derive(Clone)]
pub struct Repository {
    pub authors: Arc<dyn AuthorsStore>,
    pub books: Arc<dyn BooksStore>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            authors: Arc::new(authors::AuthorsRepository::new(pool.clone())),
            books: Arc::new(books::BooksRepository::new(pool)),
        }
    }
}

/// Name of the constraint a database error was raised for, if any
pub(crate) fn violated_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db) => db.constraint(),
        _ => None,
    }
}
