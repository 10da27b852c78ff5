//! Borrowing lifecycle service

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        borrowing::{BorrowingDetails, BorrowingFilter, CreateBorrowing, ReturnBorrowing},
        Actor, Event,
    },
    repository::Repository,
};

use super::notifier::{dispatch, NotificationSink};

#[derive(Clone)]
pub struct BorrowingsService {
    repository: Repository,
    notifier: Arc<dyn NotificationSink>,
}

impl BorrowingsService {
    pub fn new(repository: Repository, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// Borrow a book for the calling user.
    ///
    /// The availability check and the inventory decrement are one atomic
    /// step, so concurrent calls can never lend more copies than exist.
    pub async fn create(
        &self,
        actor: &Actor,
        request: CreateBorrowing,
    ) -> AppResult<BorrowingDetails> {
        let today = Utc::now().date_naive();

        if request.expected_return_date <= today {
            return Err(AppError::InvalidDate(
                "expected return date must be after today".to_string(),
            ));
        }

        let borrowing = self
            .repository
            .borrowings
            .create(
                actor.user_id,
                request.book_id,
                today,
                request.expected_return_date,
            )
            .await?;

        let book = self.repository.books.get_by_id(borrowing.book_id).await?;
        dispatch(
            self.notifier.as_ref(),
            Event::BorrowingCreated {
                borrowing_id: borrowing.id,
                borrower_id: borrowing.borrower_id,
                book_id: book.id,
                book_title: book.title.clone(),
                expected_return_date: borrowing.expected_return_date,
            },
        )
        .await;

        Ok(BorrowingDetails::new(borrowing, book, today))
    }

    /// Return a borrowed book.
    ///
    /// Only the borrower or an administrator may return it; a second return
    /// is rejected, as is a return date in the past.
    pub async fn return_borrowing(
        &self,
        actor: &Actor,
        borrowing_id: Uuid,
        request: ReturnBorrowing,
    ) -> AppResult<BorrowingDetails> {
        let today = Utc::now().date_naive();

        let borrowing = self.repository.borrowings.get_by_id(borrowing_id).await?;
        actor.require_self_or_admin(borrowing.borrower_id)?;

        if borrowing.actual_return_date.is_some() {
            return Err(AppError::InvalidState(
                "borrowing has already been returned".to_string(),
            ));
        }

        let actual_return_date = request.actual_return_date.unwrap_or(today);
        if actual_return_date < today {
            return Err(AppError::InvalidDate(
                "return date cannot be in the past".to_string(),
            ));
        }

        let was_overdue = borrowing.is_overdue(today);
        let returned = self
            .repository
            .borrowings
            .mark_returned(borrowing_id, actual_return_date)
            .await?;

        let book = self.repository.books.get_by_id(returned.book_id).await?;
        dispatch(
            self.notifier.as_ref(),
            Event::BorrowingReturned {
                borrowing_id: returned.id,
                borrower_id: returned.borrower_id,
                book_id: book.id,
                book_title: book.title.clone(),
                actual_return_date,
                was_overdue,
            },
        )
        .await;

        Ok(BorrowingDetails::new(returned, book, today))
    }

    /// Get one borrowing; restricted to its borrower or an administrator
    pub async fn get(&self, actor: &Actor, borrowing_id: Uuid) -> AppResult<BorrowingDetails> {
        let today = Utc::now().date_naive();
        let details = self
            .repository
            .borrowings
            .get_details(borrowing_id, today)
            .await?;
        actor.require_self_or_admin(details.borrower_id)?;
        Ok(details)
    }

    /// List borrowings; non-administrators always see their own only
    pub async fn list(
        &self,
        actor: &Actor,
        mut filter: BorrowingFilter,
    ) -> AppResult<Vec<BorrowingDetails>> {
        if !actor.is_admin {
            filter.borrower_id = Some(actor.user_id);
        }
        let today = Utc::now().date_naive();
        self.repository.borrowings.list(filter, today).await
    }

    /// Emit reminder events for borrowings due within `lead_days` days
    pub async fn send_due_reminders(&self, lead_days: i64) -> AppResult<usize> {
        let today = Utc::now().date_naive();
        let due = self
            .repository
            .borrowings
            .find_due_within(today, lead_days)
            .await?;

        for borrowing in &due {
            let book = self.repository.books.get_by_id(borrowing.book_id).await?;
            dispatch(
                self.notifier.as_ref(),
                Event::ReturnDue {
                    borrowing_id: borrowing.id,
                    borrower_id: borrowing.borrower_id,
                    book_title: book.title,
                    expected_return_date: borrowing.expected_return_date,
                    days_left: (borrowing.expected_return_date - today).num_days(),
                },
            )
            .await;
        }
        Ok(due.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::book::CreateBook;
    use crate::models::CoverType;
    use crate::services::notifier::RecordingSink;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn member() -> Actor {
        Actor::new(Uuid::new_v4(), false)
    }

    fn admin() -> Actor {
        Actor::new(Uuid::new_v4(), true)
    }

    async fn seed_book(repository: &Repository, inventory: u32) -> Uuid {
        let book = repository
            .books
            .create(CreateBook {
                title: "The Left Hand of Darkness".to_string(),
                author: "Ursula K. Le Guin".to_string(),
                cover: CoverType::Soft,
                inventory,
                daily_fee: dec!(2.00),
            })
            .await
            .unwrap();
        book.id
    }

    fn service(repository: &Repository) -> (BorrowingsService, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        (
            BorrowingsService::new(repository.clone(), sink.clone()),
            sink,
        )
    }

    #[tokio::test]
    async fn create_decrements_inventory_and_emits_event() {
        let repository = Repository::new();
        let book_id = seed_book(&repository, 2).await;
        let (service, sink) = service(&repository);
        let actor = member();

        let expected = Utc::now().date_naive() + Duration::days(14);
        let details = service
            .create(
                &actor,
                CreateBorrowing {
                    book_id,
                    expected_return_date: expected,
                },
            )
            .await
            .unwrap();

        assert!(details.is_active);
        assert_eq!(details.book.inventory, 1);
        assert_eq!(
            repository.books.get_by_id(book_id).await.unwrap().inventory,
            1
        );

        let events = sink.events().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::BorrowingCreated { .. }));
    }

    #[tokio::test]
    async fn create_fails_when_no_copies_available() {
        let repository = Repository::new();
        let book_id = seed_book(&repository, 0).await;
        let (service, sink) = service(&repository);

        let expected = Utc::now().date_naive() + Duration::days(7);
        let result = service
            .create(
                &member(),
                CreateBorrowing {
                    book_id,
                    expected_return_date: expected,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Unavailable(_))));
        assert!(sink.events().await.is_empty());
    }

    #[tokio::test]
    async fn create_rejects_expected_return_not_after_today() {
        let repository = Repository::new();
        let book_id = seed_book(&repository, 1).await;
        let (service, _) = service(&repository);

        let result = service
            .create(
                &member(),
                CreateBorrowing {
                    book_id,
                    expected_return_date: Utc::now().date_naive(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::InvalidDate(_))));
        // The failed attempt must not have taken a copy.
        assert_eq!(
            repository.books.get_by_id(book_id).await.unwrap().inventory,
            1
        );
    }

    #[tokio::test]
    async fn return_restores_inventory_and_rejects_second_return() {
        let repository = Repository::new();
        let book_id = seed_book(&repository, 1).await;
        let (service, sink) = service(&repository);
        let actor = member();

        let expected = Utc::now().date_naive() + Duration::days(14);
        let details = service
            .create(
                &actor,
                CreateBorrowing {
                    book_id,
                    expected_return_date: expected,
                },
            )
            .await
            .unwrap();

        let returned = service
            .return_borrowing(&actor, details.id, ReturnBorrowing::default())
            .await
            .unwrap();
        assert!(!returned.is_active);
        assert_eq!(
            repository.books.get_by_id(book_id).await.unwrap().inventory,
            1
        );

        let second = service
            .return_borrowing(&actor, details.id, ReturnBorrowing::default())
            .await;
        assert!(matches!(second, Err(AppError::InvalidState(_))));
        // Inventory is untouched by the rejected second return.
        assert_eq!(
            repository.books.get_by_id(book_id).await.unwrap().inventory,
            1
        );

        let events = sink.events().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], Event::BorrowingReturned { .. }));
    }

    #[tokio::test]
    async fn return_is_restricted_to_borrower_or_admin() {
        let repository = Repository::new();
        let book_id = seed_book(&repository, 1).await;
        let (service, _) = service(&repository);
        let owner = member();

        let expected = Utc::now().date_naive() + Duration::days(14);
        let details = service
            .create(
                &owner,
                CreateBorrowing {
                    book_id,
                    expected_return_date: expected,
                },
            )
            .await
            .unwrap();

        let stranger = member();
        let result = service
            .return_borrowing(&stranger, details.id, ReturnBorrowing::default())
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let by_admin = service
            .return_borrowing(&admin(), details.id, ReturnBorrowing::default())
            .await;
        assert!(by_admin.is_ok());
    }

    #[tokio::test]
    async fn return_rejects_backdating() {
        let repository = Repository::new();
        let book_id = seed_book(&repository, 1).await;
        let (service, _) = service(&repository);
        let actor = member();

        let expected = Utc::now().date_naive() + Duration::days(14);
        let details = service
            .create(
                &actor,
                CreateBorrowing {
                    book_id,
                    expected_return_date: expected,
                },
            )
            .await
            .unwrap();

        let yesterday = Utc::now().date_naive() - Duration::days(1);
        let result = service
            .return_borrowing(
                &actor,
                details.id,
                ReturnBorrowing {
                    actual_return_date: Some(yesterday),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::InvalidDate(_))));
    }

    #[tokio::test]
    async fn return_of_unknown_borrowing_is_not_found() {
        let repository = Repository::new();
        let (service, _) = service(&repository);

        let result = service
            .return_borrowing(&admin(), Uuid::new_v4(), ReturnBorrowing::default())
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn concurrent_creates_never_overdraw_inventory() {
        let repository = Repository::new();
        let book_id = seed_book(&repository, 3).await;
        let (service, _) = service(&repository);

        let expected = Utc::now().date_naive() + Duration::days(14);
        let mut handles = Vec::new();
        for _ in 0..10 {
            let service = service.clone();
            let actor = member();
            handles.push(tokio::spawn(async move {
                service
                    .create(
                        &actor,
                        CreateBorrowing {
                            book_id,
                            expected_return_date: expected,
                        },
                    )
                    .await
            }));
        }

        let mut succeeded = 0;
        let mut unavailable = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(AppError::Unavailable(_)) => unavailable += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(succeeded, 3);
        assert_eq!(unavailable, 7);
        assert_eq!(
            repository.books.get_by_id(book_id).await.unwrap().inventory,
            0
        );
    }

    #[tokio::test]
    async fn reminders_cover_borrowings_inside_the_lead_window() {
        let repository = Repository::new();
        let book_id = seed_book(&repository, 5).await;
        let (service, sink) = service(&repository);
        let today = Utc::now().date_naive();

        // Due tomorrow (inside the window), in five days (outside), and today
        // (not a reminder, it is due now).
        for days in [1, 5] {
            repository
                .borrowings
                .create(
                    Uuid::new_v4(),
                    book_id,
                    today - Duration::days(7),
                    today + Duration::days(days),
                )
                .await
                .unwrap();
        }
        repository
            .borrowings
            .create(Uuid::new_v4(), book_id, today - Duration::days(7), today)
            .await
            .unwrap();

        let sent = service.send_due_reminders(2).await.unwrap();
        assert_eq!(sent, 1);

        let events = sink.events().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::ReturnDue { days_left: 1, .. }));
    }

    #[tokio::test]
    async fn list_scopes_non_admins_to_their_own_borrowings() {
        let repository = Repository::new();
        let book_id = seed_book(&repository, 5).await;
        let (service, _) = service(&repository);
        let alice = member();
        let bob = member();

        let expected = Utc::now().date_naive() + Duration::days(14);
        for actor in [&alice, &alice, &bob] {
            service
                .create(
                    actor,
                    CreateBorrowing {
                        book_id,
                        expected_return_date: expected,
                    },
                )
                .await
                .unwrap();
        }

        let own = service
            .list(&alice, BorrowingFilter::default())
            .await
            .unwrap();
        assert_eq!(own.len(), 2);
        assert!(own.iter().all(|b| b.borrower_id == alice.user_id));

        let all = service
            .list(&admin(), BorrowingFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }
}
