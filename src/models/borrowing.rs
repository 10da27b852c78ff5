//! Borrowing model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::book::Book;

/// A single loan of one copy of a book.
///
/// A borrowing is ACTIVE until `actual_return_date` is set, which happens at
/// most once; there is no other state transition.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Borrowing {
    pub id: Uuid,
    pub book_id: Uuid,
    pub borrower_id: Uuid,
    pub borrow_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
}

impl Borrowing {
    /// Check if the borrowing is still active (not returned)
    pub fn is_active(&self) -> bool {
        self.actual_return_date.is_none()
    }

    /// Check if the borrowing is overdue as of the given day
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_active() && self.expected_return_date < today
    }

    /// Number of whole days the borrowing is overdue, zero when it is not
    pub fn overdue_days(&self, today: NaiveDate) -> i64 {
        if self.is_overdue(today) {
            (today - self.expected_return_date).num_days()
        } else {
            0
        }
    }
}

/// Create borrowing request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateBorrowing {
    pub book_id: Uuid,
    pub expected_return_date: NaiveDate,
}

/// Return request; the return date defaults to today when omitted
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReturnBorrowing {
    pub actual_return_date: Option<NaiveDate>,
}

/// Query filter for listing borrowings
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
pub struct BorrowingFilter {
    /// Restrict to one borrower (administrators only; others always see their own)
    pub borrower_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub is_overdue: Option<bool>,
}

/// Borrowing with book details and derived state for display
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BorrowingDetails {
    pub id: Uuid,
    pub borrower_id: Uuid,
    pub borrow_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub book: Book,
    pub is_active: bool,
    pub is_overdue: bool,
    pub overdue_days: i64,
}

impl BorrowingDetails {
    /// Join a borrowing with its book and evaluate derived state as of `today`
    pub fn new(borrowing: Borrowing, book: Book, today: NaiveDate) -> Self {
        Self {
            id: borrowing.id,
            borrower_id: borrowing.borrower_id,
            borrow_date: borrowing.borrow_date,
            expected_return_date: borrowing.expected_return_date,
            actual_return_date: borrowing.actual_return_date,
            is_active: borrowing.is_active(),
            is_overdue: borrowing.is_overdue(today),
            overdue_days: borrowing.overdue_days(today),
            book,
        }
    }
}
