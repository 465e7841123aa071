//! Books repository

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, Pool, Postgres, QueryBuilder};

use super::{violated_constraint, BooksStore, PageRequest};
use crate::{
    error::{AppError, AppResult, FieldErrors},
    models::{
        book::{BookChanges, NewBook},
        Author, Book, BookWithAuthor,
    },
};

const BOOKS_AUTHOR_FOREIGN: &str = "books_author_id_foreign";

/// Columns of a book joined with its author
const SELECT_WITH_AUTHOR: &str = r#"
    SELECT b.id, b.author_id, b.title, b.description, b.published_at,
           b.created_at, b.updated_at,
           a.name AS author_name, a.email AS author_email, a.bio AS author_bio,
           a.created_at AS author_created_at, a.updated_at AS author_updated_at
    FROM books b
    JOIN authors a ON a.id = b.author_id
"#;

#[derive(FromRow)]
struct BookAuthorRow {
    id: i64,
    author_id: i64,
    title: String,
    description: Option<String>,
    published_at: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    author_name: String,
    author_email: Option<String>,
    author_bio: Option<String>,
    author_created_at: DateTime<Utc>,
    author_updated_at: DateTime<Utc>,
}

impl From<BookAuthorRow> for BookWithAuthor {
    fn from(row: BookAuthorRow) -> Self {
        BookWithAuthor {
            author: Author {
                id: row.author_id,
                name: row.author_name,
                email: row.author_email,
                bio: row.author_bio,
                created_at: row.author_created_at,
                updated_at: row.author_updated_at,
            },
            book: Book {
                id: row.id,
                author_id: row.author_id,
                title: row.title,
                description: row.description,
                published_at: row.published_at,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

/// The referenced author disappeared between validation and the write
fn map_write_error(err: sqlx::Error) -> AppError {
    if violated_constraint(&err) == Some(BOOKS_AUTHOR_FOREIGN) {
        AppError::Validation(FieldErrors::single("author_id", "The selected author id is invalid."))
    } else {
        AppError::Database(err)
    }
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Book {} not found", id))
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BooksStore for BooksRepository {
    async fn list(&self, page: PageRequest) -> AppResult<(Vec<BookWithAuthor>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;

        let query = format!("{} ORDER BY b.id DESC LIMIT $1 OFFSET $2", SELECT_WITH_AUTHOR);
        let rows = sqlx::query_as::<_, BookAuthorRow>(&query)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    async fn list_by_author(&self, author_id: i64) -> AppResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE author_id = $1 ORDER BY id")
            .bind(author_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count_by_author(&self, author_id: i64) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn get_by_id(&self, id: i64) -> AppResult<BookWithAuthor> {
        let query = format!("{} WHERE b.id = $1", SELECT_WITH_AUTHOR);
        sqlx::query_as::<_, BookAuthorRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Into::into)
            .ok_or_else(|| not_found(id))
    }

    async fn create(&self, data: &NewBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (author_id, title, description, published_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(data.author_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.published_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn update(&self, id: i64, changes: &BookChanges) -> AppResult<Book> {
        if changes.is_empty() {
            return self.get_by_id(id).await.map(|found| found.book);
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE books SET updated_at = NOW()");
        if let Some(author_id) = changes.author_id {
            builder.push(", author_id = ").push_bind(author_id);
        }
        if let Some(title) = &changes.title {
            builder.push(", title = ").push_bind(title);
        }
        if let Some(description) = &changes.description {
            builder.push(", description = ").push_bind(description);
        }
        if let Some(published_at) = changes.published_at {
            builder.push(", published_at = ").push_bind(published_at);
        }
        builder.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

        builder
            .build_query_as::<Book>()
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?
            .ok_or_else(|| not_found(id))
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }
}
