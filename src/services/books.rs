//! Books service

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::{AppResult, FieldErrors},
    models::{
        book::{CreateBook, UpdateBook},
        BookWithAuthor,
    },
    repository::{AuthorsStore, BooksStore, PageRequest},
};

#[derive(Clone)]
pub struct BooksService {
    books: Arc<dyn BooksStore>,
    authors: Arc<dyn AuthorsStore>,
}

impl BooksService {
    pub fn new(books: Arc<dyn BooksStore>, authors: Arc<dyn AuthorsStore>) -> Self {
        Self { books, authors }
    }

    /// List books, most recently created first, each with its author
    pub async fn list(&self, page: PageRequest) -> AppResult<(Vec<BookWithAuthor>, i64)> {
        self.books.list(page).await
    }

    pub async fn get(&self, id: i64) -> AppResult<BookWithAuthor> {
        self.books.get_by_id(id).await
    }

    /// Create a book for an existing author
    pub async fn create(&self, data: CreateBook) -> AppResult<BookWithAuthor> {
        let data = data.normalized();
        let mut errors = FieldErrors::from_rules(data.validate());
        self.check_author_exists(&mut errors, data.author_id()).await?;
        errors.into_result()?;

        let book = self.books.create(&data.into_new()).await?;
        tracing::info!("Created book {} for author {}", book.id, book.author_id);
        self.books.get_by_id(book.id).await
    }

    /// Update the fields present in `data`
    pub async fn update(&self, id: i64, data: UpdateBook) -> AppResult<BookWithAuthor> {
        self.books.get_by_id(id).await?;

        let data = data.normalized();
        let mut errors = FieldErrors::from_rules(data.validate());
        self.check_author_exists(&mut errors, data.author_id()).await?;
        errors.into_result()?;

        self.books.update(id, &data.into_changes()).await?;
        tracing::info!("Updated book {}", id);
        self.books.get_by_id(id).await
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        self.books.delete(id).await?;
        tracing::info!("Deleted book {}", id);
        Ok(())
    }

    /// Only runs when `author_id` passed the format rules
    async fn check_author_exists(&self, errors: &mut FieldErrors, author_id: Option<i64>) -> AppResult<()> {
        if errors.has("author_id") {
            return Ok(());
        }
        if let Some(author_id) = author_id {
            if !self.authors.exists(author_id).await? {
                errors.add("author_id", "The selected author id is invalid.");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::AppError,
        models::{Author, Book},
        repository::{MockAuthorsStore, MockBooksStore},
    };
    use chrono::{NaiveDate, Utc};
    use serde_json::json;

    fn book_with_author(id: i64, author_id: i64, title: &str) -> BookWithAuthor {
        let now = Utc::now();
        BookWithAuthor {
            book: Book {
                id,
                author_id,
                title: title.to_string(),
                description: None,
                published_at: None,
                created_at: now,
                updated_at: now,
            },
            author: Author {
                id: author_id,
                name: "Ada Lovelace".to_string(),
                email: Some("ada@example.com".to_string()),
                bio: None,
                created_at: now,
                updated_at: now,
            },
        }
    }

    fn service(books: MockBooksStore, authors: MockAuthorsStore) -> BooksService {
        BooksService::new(Arc::new(books), Arc::new(authors))
    }

    #[tokio::test]
    async fn test_create_embeds_author() {
        let mut authors = MockAuthorsStore::new();
        authors.expect_exists().withf(|id| *id == 1).returning(|_| Ok(true));
        let mut books = MockBooksStore::new();
        books
            .expect_create()
            .withf(|data| data.author_id == 1 && data.title == "Notes")
            .returning(|data| Ok(book_with_author(10, data.author_id, &data.title).book));
        books
            .expect_get_by_id()
            .withf(|id| *id == 10)
            .returning(|id| Ok(book_with_author(id, 1, "Notes")));

        let svc = service(books, authors);
        let created = svc
            .create(CreateBook {
                author_id: Some(json!(1)),
                title: Some(json!("Notes")),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(created.book.id, 10);
        assert_eq!(created.author.id, 1);
        assert_eq!(created.author.name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_author() {
        let mut authors = MockAuthorsStore::new();
        authors.expect_exists().returning(|_| Ok(false));
        let mut books = MockBooksStore::new();
        books.expect_create().never();

        let svc = service(books, authors);
        let result = svc
            .create(CreateBook {
                author_id: Some(json!(999)),
                title: Some(json!("Notes")),
                ..Default::default()
            })
            .await;

        match result {
            Err(AppError::Validation(errors)) => {
                assert_eq!(errors.get("author_id").unwrap(), ["The selected author id is invalid."]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_skips_lookup_for_malformed_author_id() {
        let mut authors = MockAuthorsStore::new();
        authors.expect_exists().never();

        let svc = service(MockBooksStore::new(), authors);
        let result = svc
            .create(CreateBook {
                author_id: Some(json!("abc")),
                title: Some(json!("Notes")),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_returns_refreshed_record() {
        let mut books = MockBooksStore::new();
        books
            .expect_get_by_id()
            .times(2)
            .returning(|id| Ok(book_with_author(id, 1, "Notes")));
        books
            .expect_update()
            .withf(|id, changes| {
                *id == 5
                    && changes.author_id.is_none()
                    && changes.published_at == Some(NaiveDate::from_ymd_opt(1843, 10, 5))
            })
            .returning(|id, _| Ok(book_with_author(id, 1, "Notes").book));

        let svc = service(books, MockAuthorsStore::new());
        let data = UpdateBook {
            published_at: Some(Some(json!("1843-10-05"))),
            ..Default::default()
        };
        let updated = svc.update(5, data).await.unwrap();
        assert_eq!(updated.book.id, 5);
    }

    #[tokio::test]
    async fn test_update_checks_new_author() {
        let mut books = MockBooksStore::new();
        books.expect_get_by_id().returning(|id| Ok(book_with_author(id, 1, "Notes")));
        books.expect_update().never();
        let mut authors = MockAuthorsStore::new();
        authors.expect_exists().withf(|id| *id == 2).returning(|_| Ok(false));

        let svc = service(books, authors);
        let data = UpdateBook {
            author_id: Some(Some(json!(2))),
            ..Default::default()
        };
        assert!(matches!(svc.update(5, data).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_book_is_not_found() {
        let mut books = MockBooksStore::new();
        books
            .expect_delete()
            .returning(|id| Err(AppError::NotFound(format!("Book {} not found", id))));

        let svc = service(books, MockAuthorsStore::new());
        assert!(matches!(svc.delete(7).await, Err(AppError::NotFound(_))));
    }
}
