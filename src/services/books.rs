//! Book catalog service

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::book::{Book, CreateBook, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
}

impl BooksService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Add a book to the catalog
    pub async fn create(&self, request: CreateBook) -> AppResult<Book> {
        self.repository.books.create(request).await
    }

    /// Get a book by ID
    pub async fn get(&self, id: Uuid) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// List the catalog ordered by title
    pub async fn list(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list().await
    }

    /// Update catalog fields; inventory moves only through borrowings
    pub async fn update(&self, id: Uuid, request: UpdateBook) -> AppResult<Book> {
        self.repository.books.update(id, request).await
    }

    /// Remove a book; refused while borrowings still reference it
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.repository.books.delete(id).await
    }
}
