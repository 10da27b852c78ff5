//! Business logic services

pub mod books;
pub mod borrowings;
pub mod fines;
pub mod gateway;
pub mod notifier;
pub mod payments;

use std::sync::Arc;

use crate::{config::LibraryConfig, repository::Repository};

use gateway::PaymentGateway;
use notifier::NotificationSink;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub books: books::BooksService,
    pub borrowings: borrowings::BorrowingsService,
    pub fines: fines::FinesService,
    pub payments: payments::PaymentsService,
}

impl Services {
    /// Create all services with the given repository and collaborators
    pub fn new(
        repository: Repository,
        library: LibraryConfig,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            books: books::BooksService::new(repository.clone()),
            borrowings: borrowings::BorrowingsService::new(repository.clone(), notifier.clone()),
            fines: fines::FinesService::new(
                repository.clone(),
                notifier.clone(),
                library.fine_multiplier,
            ),
            payments: payments::PaymentsService::new(repository, gateway, notifier),
        }
    }
}
