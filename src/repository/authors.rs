//! Authors repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder};

use super::{violated_constraint, AuthorsStore, PageRequest};
use crate::{
    error::{AppError, AppResult, FieldErrors},
    models::{
        author::{AuthorChanges, NewAuthor},
        Author, AuthorWithBooksCount,
    },
};

const EMAIL_UNIQUE: &str = "authors_email_unique";
const BOOKS_AUTHOR_FOREIGN: &str = "books_author_id_foreign";

/// A concurrent insert/update that slipped past the uniqueness check
fn map_write_error(err: sqlx::Error) -> AppError {
    if violated_constraint(&err) == Some(EMAIL_UNIQUE) {
        AppError::Validation(FieldErrors::single("email", "The email has already been taken."))
    } else {
        AppError::Database(err)
    }
}

/// Books still reference the author, e.g. one was added while it was being deleted
fn map_delete_error(id: i64, err: sqlx::Error) -> AppError {
    if violated_constraint(&err) == Some(BOOKS_AUTHOR_FOREIGN) {
        AppError::Conflict(format!("Author {} still has books", id))
    } else {
        AppError::Database(err)
    }
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Author {} not found", id))
}

#[derive(Clone)]
pub struct AuthorsRepository {
    pool: Pool<Postgres>,
}

impl AuthorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorsStore for AuthorsRepository {
    async fn list(&self, page: PageRequest) -> AppResult<(Vec<AuthorWithBooksCount>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM authors")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, AuthorWithBooksCount>(
            r#"
            SELECT a.*,
                   (SELECT COUNT(*) FROM books b WHERE b.author_id = a.id) AS books_count
            FROM authors a
            ORDER BY a.name, a.id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((rows, total))
    }

    async fn get_by_id(&self, id: i64) -> AppResult<Author> {
        sqlx::query_as::<_, Author>("SELECT * FROM authors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn exists(&self, id: i64) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM authors WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn email_exists(&self, email: &str, exclude_id: Option<i64>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM authors WHERE email = $1 AND ($2::bigint IS NULL OR id != $2))",
        )
        .bind(email)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create(&self, data: &NewAuthor) -> AppResult<Author> {
        sqlx::query_as::<_, Author>(
            r#"
            INSERT INTO authors (name, email, bio, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.bio)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn update(&self, id: i64, changes: &AuthorChanges) -> AppResult<Author> {
        if changes.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE authors SET updated_at = NOW()");
        if let Some(name) = &changes.name {
            builder.push(", name = ").push_bind(name);
        }
        if let Some(email) = &changes.email {
            builder.push(", email = ").push_bind(email);
        }
        if let Some(bio) = &changes.bio {
            builder.push(", bio = ").push_bind(bio);
        }
        builder.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

        builder
            .build_query_as::<Author>()
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?
            .ok_or_else(|| not_found(id))
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_delete_error(id, e))?;
        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn delete_with_books(&self, id: i64) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        // Holding the row lock blocks new books for this author until commit
        sqlx::query("SELECT id FROM authors WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| not_found(id))?;

        let removed = sqlx::query("DELETE FROM books WHERE author_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_delete_error(id, e))?;

        tx.commit().await?;
        tracing::debug!("Deleted author {} with {} book(s)", id, removed);
        Ok(())
    }
}
