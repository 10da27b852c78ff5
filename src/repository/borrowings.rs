//! Borrowings repository
//!
//! The create and return operations pair the borrowing mutation with the
//! inventory mutation under one write guard; a copy can never be lost or
//! lent twice between the two steps.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::borrowing::{Borrowing, BorrowingDetails, BorrowingFilter},
};

use super::Db;

#[derive(Clone)]
pub struct BorrowingsRepository {
    db: Db,
}

impl BorrowingsRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Create a borrowing, taking one copy out of the book's inventory.
    ///
    /// Fails with `Unavailable` when no copy is left; the availability check
    /// and the decrement happen under the same guard.
    pub async fn create(
        &self,
        borrower_id: Uuid,
        book_id: Uuid,
        borrow_date: NaiveDate,
        expected_return_date: NaiveDate,
    ) -> AppResult<Borrowing> {
        let mut store = self.db.write().await;

        let book = store
            .books
            .get_mut(&book_id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        if !book.is_available() {
            return Err(AppError::Unavailable(format!(
                "no copies of \"{}\" are available",
                book.title
            )));
        }
        book.inventory -= 1;

        let borrowing = Borrowing {
            id: Uuid::new_v4(),
            book_id,
            borrower_id,
            borrow_date,
            expected_return_date,
            actual_return_date: None,
        };
        store.borrowings.insert(borrowing.id, borrowing.clone());

        Ok(borrowing)
    }

    /// Mark a borrowing returned, putting the copy back into inventory.
    ///
    /// Fails with `InvalidState` when the borrowing was already returned.
    pub async fn mark_returned(
        &self,
        id: Uuid,
        actual_return_date: NaiveDate,
    ) -> AppResult<Borrowing> {
        let mut store = self.db.write().await;

        let book_id = match store.borrowings.get(&id) {
            None => {
                return Err(AppError::NotFound(format!(
                    "Borrowing with id {} not found",
                    id
                )))
            }
            Some(b) if b.actual_return_date.is_some() => {
                return Err(AppError::InvalidState(
                    "borrowing has already been returned".to_string(),
                ))
            }
            Some(b) => b.book_id,
        };

        // All lookups done; from here both mutations happen under the guard.
        let book = store
            .books
            .get_mut(&book_id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;
        book.inventory += 1;

        let borrowing = store
            .borrowings
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))?;
        borrowing.actual_return_date = Some(actual_return_date);

        Ok(borrowing.clone())
    }

    /// Get borrowing by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Borrowing> {
        let store = self.db.read().await;
        store
            .borrowings
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))
    }

    /// Get borrowing with book details and derived state
    pub async fn get_details(&self, id: Uuid, today: NaiveDate) -> AppResult<BorrowingDetails> {
        let store = self.db.read().await;
        let borrowing = store
            .borrowings
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))?;
        let book = store
            .books
            .get(&borrowing.book_id)
            .cloned()
            .ok_or_else(|| {
                AppError::NotFound(format!("Book with id {} not found", borrowing.book_id))
            })?;
        Ok(BorrowingDetails::new(borrowing, book, today))
    }

    /// List borrowings matching the filter, newest borrow date first
    pub async fn list(
        &self,
        filter: BorrowingFilter,
        today: NaiveDate,
    ) -> AppResult<Vec<BorrowingDetails>> {
        let store = self.db.read().await;

        let mut matches: Vec<&Borrowing> = store
            .borrowings
            .values()
            .filter(|b| match filter.borrower_id {
                Some(borrower_id) => b.borrower_id == borrower_id,
                None => true,
            })
            .filter(|b| match filter.is_active {
                Some(active) => b.is_active() == active,
                None => true,
            })
            .filter(|b| match filter.is_overdue {
                Some(overdue) => b.is_overdue(today) == overdue,
                None => true,
            })
            .collect();
        matches.sort_by(|a, b| b.borrow_date.cmp(&a.borrow_date));

        let mut result = Vec::with_capacity(matches.len());
        for borrowing in matches {
            let book = store
                .books
                .get(&borrowing.book_id)
                .cloned()
                .ok_or_else(|| {
                    AppError::NotFound(format!("Book with id {} not found", borrowing.book_id))
                })?;
            result.push(BorrowingDetails::new(borrowing.clone(), book, today));
        }
        Ok(result)
    }

    /// All active borrowings past their expected return date
    pub async fn find_overdue(&self, today: NaiveDate) -> AppResult<Vec<Borrowing>> {
        let store = self.db.read().await;
        let mut overdue: Vec<Borrowing> = store
            .borrowings
            .values()
            .filter(|b| b.is_overdue(today))
            .cloned()
            .collect();
        overdue.sort_by(|a, b| a.expected_return_date.cmp(&b.expected_return_date));
        Ok(overdue)
    }

    /// Active borrowings due within the next `lead_days` days (excluding today)
    pub async fn find_due_within(
        &self,
        today: NaiveDate,
        lead_days: i64,
    ) -> AppResult<Vec<Borrowing>> {
        let store = self.db.read().await;
        let mut due: Vec<Borrowing> = store
            .borrowings
            .values()
            .filter(|b| {
                if !b.is_active() {
                    return false;
                }
                let days_left = (b.expected_return_date - today).num_days();
                days_left > 0 && days_left <= lead_days
            })
            .cloned()
            .collect();
        due.sort_by(|a, b| a.expected_return_date.cmp(&b.expected_return_date));
        Ok(due)
    }
}
