//! Books repository for catalog and inventory state

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, CreateBook, UpdateBook},
};

use super::Db;

#[derive(Clone)]
pub struct BooksRepository {
    db: Db,
}

impl BooksRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Add a book to the catalog
    pub async fn create(&self, new: CreateBook) -> AppResult<Book> {
        let book = Book {
            id: Uuid::new_v4(),
            title: new.title,
            author: new.author,
            cover: new.cover,
            inventory: new.inventory,
            daily_fee: new.daily_fee,
        };

        let mut store = self.db.write().await;
        store.books.insert(book.id, book.clone());
        Ok(book)
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Book> {
        let store = self.db.read().await;
        store
            .books
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// List the catalog ordered by title
    pub async fn list(&self) -> AppResult<Vec<Book>> {
        let store = self.db.read().await;
        let mut books: Vec<Book> = store.books.values().cloned().collect();
        books.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(books)
    }

    /// Update catalog fields; inventory is not touched here
    pub async fn update(&self, id: Uuid, update: UpdateBook) -> AppResult<Book> {
        let mut store = self.db.write().await;
        let book = store
            .books
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        if let Some(title) = update.title {
            book.title = title;
        }
        if let Some(author) = update.author {
            book.author = author;
        }
        if let Some(cover) = update.cover {
            book.cover = cover;
        }
        if let Some(daily_fee) = update.daily_fee {
            book.daily_fee = daily_fee;
        }

        Ok(book.clone())
    }

    /// Remove a book; refused while borrowings still reference it
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut store = self.db.write().await;

        if !store.books.contains_key(&id) {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        let borrowed = store
            .borrowings
            .values()
            .any(|b| b.book_id == id && b.is_active());
        if borrowed {
            return Err(AppError::InvalidState(
                "book has active borrowings and cannot be deleted".to_string(),
            ));
        }

        store.books.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Repository;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    fn sample() -> CreateBook {
        CreateBook {
            title: "The Master and Margarita".to_string(),
            author: "Mikhail Bulgakov".to_string(),
            cover: crate::models::CoverType::Hard,
            inventory: 2,
            daily_fee: dec!(1.25),
        }
    }

    #[tokio::test]
    async fn update_changes_catalog_fields_but_not_inventory() {
        let repository = Repository::new();
        let book = repository.books.create(sample()).await.unwrap();

        let updated = repository
            .books
            .update(
                book.id,
                UpdateBook {
                    daily_fee: Some(dec!(3.00)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.daily_fee, dec!(3.00));
        assert_eq!(updated.title, "The Master and Margarita");
        assert_eq!(updated.inventory, 2);
    }

    #[tokio::test]
    async fn delete_is_refused_while_a_borrowing_is_active() {
        let repository = Repository::new();
        let book = repository.books.create(sample()).await.unwrap();

        let today = Utc::now().date_naive();
        let borrowing = repository
            .borrowings
            .create(
                uuid::Uuid::new_v4(),
                book.id,
                today,
                today + Duration::days(7),
            )
            .await
            .unwrap();

        let blocked = repository.books.delete(book.id).await;
        assert!(matches!(blocked, Err(AppError::InvalidState(_))));

        repository
            .borrowings
            .mark_returned(borrowing.id, today)
            .await
            .unwrap();
        assert!(repository.books.delete(book.id).await.is_ok());
        assert!(matches!(
            repository.books.get_by_id(book.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
