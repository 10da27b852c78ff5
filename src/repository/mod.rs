//! Repository layer over the in-process datastore
//!
//! All four logical tables live in one [`Store`] behind a single lock.
//! Compound mutations (inventory decrement plus borrowing insert, fine
//! existence check plus insert, payment transition plus fine settlement)
//! run under one write guard, so they are atomic with respect to every
//! concurrent caller and background sweep.

pub mod books;
pub mod borrowings;
pub mod fines;
pub mod payments;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Book, Borrowing, FineRecord, PaymentRecord};

/// Logical tables, keyed by surrogate id
#[derive(Default)]
pub struct Store {
    pub books: HashMap<Uuid, Book>,
    pub borrowings: HashMap<Uuid, Borrowing>,
    pub fines: HashMap<Uuid, FineRecord>,
    pub payments: HashMap<Uuid, PaymentRecord>,
}

/// Shared handle to the datastore
pub type Db = Arc<RwLock<Store>>;

/// Main repository struct holding the shared datastore
#[derive(Clone)]
pub struct Repository {
    pub db: Db,
    pub books: books::BooksRepository,
    pub borrowings: borrowings::BorrowingsRepository,
    pub fines: fines::FinesRepository,
    pub payments: payments::PaymentsRepository,
}

impl Repository {
    /// Create a repository over a fresh empty store
    pub fn new() -> Self {
        let db: Db = Arc::new(RwLock::new(Store::default()));
        Self {
            books: books::BooksRepository::new(db.clone()),
            borrowings: borrowings::BorrowingsRepository::new(db.clone()),
            fines: fines::FinesRepository::new(db.clone()),
            payments: payments::PaymentsRepository::new(db.clone()),
            db,
        }
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}
