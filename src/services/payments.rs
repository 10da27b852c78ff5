//! Payment ledger
//!
//! Tracks payment intents against gateway checkout sessions. A record is
//! only persisted once the gateway has issued a session, and the stored
//! amount is the one the gateway confirmed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        payment::{CreatePayment, ObligationKind, PaymentFilter, PaymentRecord, PaymentStatus},
        Actor, Event,
    },
    repository::Repository,
};

use super::gateway::{PaymentGateway, SessionMetadata, SessionStatus};
use super::notifier::{dispatch, NotificationSink};

#[derive(Clone)]
pub struct PaymentsService {
    repository: Repository,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn NotificationSink>,
}

impl PaymentsService {
    pub fn new(
        repository: Repository,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            repository,
            gateway,
            notifier,
        }
    }

    /// Open a checkout session for a borrowing's rental or fine.
    ///
    /// Gateway failure aborts the whole operation; no record is persisted
    /// without a valid session.
    pub async fn create_session(
        &self,
        actor: &Actor,
        request: CreatePayment,
    ) -> AppResult<PaymentRecord> {
        let borrowing = self
            .repository
            .borrowings
            .get_by_id(request.borrowing_id)
            .await?;
        actor.require_self_or_admin(borrowing.borrower_id)?;

        let book = self.repository.books.get_by_id(borrowing.book_id).await?;

        let amount = match request.kind {
            ObligationKind::RentalPayment => {
                let days = (borrowing.expected_return_date - borrowing.borrow_date).num_days();
                book.daily_fee * Decimal::from(days)
            }
            ObligationKind::Fine => {
                self.repository
                    .fines
                    .find_pending_by_borrowing(borrowing.id)
                    .await
                    .ok_or_else(|| {
                        AppError::NotFound(format!(
                            "no pending fine exists for borrowing {}",
                            borrowing.id
                        ))
                    })?
                    .amount
            }
        };
        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidState(
                "nothing to pay for this borrowing".to_string(),
            ));
        }

        let metadata = SessionMetadata {
            borrowing_id: borrowing.id,
            user_id: borrowing.borrower_id,
            kind: request.kind,
            description: format!("{} for \"{}\"", request.kind.label(), book.title),
        };
        let session = self.gateway.create_session(amount, metadata).await?;

        let record = PaymentRecord {
            id: Uuid::new_v4(),
            borrowing_id: borrowing.id,
            kind: request.kind,
            amount: session.amount,
            status: PaymentStatus::Pending,
            session_id: session.session_id,
            session_url: session.session_url,
            created_at: Utc::now(),
            refund_ref: None,
            refunded_at: None,
        };
        self.repository.payments.insert(record).await
    }

    /// Settle a payment from the gateway's success callback.
    ///
    /// Idempotent: a payment that is already PAID is returned unchanged.
    pub async fn confirm_by_callback(&self, session_id: &str) -> AppResult<PaymentRecord> {
        let (payment, newly_confirmed) = self
            .repository
            .payments
            .confirm_by_session(session_id)
            .await?;

        if newly_confirmed {
            dispatch(
                self.notifier.as_ref(),
                Event::PaymentConfirmed {
                    payment_id: payment.id,
                    borrowing_id: payment.borrowing_id,
                    kind: payment.kind,
                    amount: payment.amount,
                },
            )
            .await;
        }
        Ok(payment)
    }

    /// Poll the gateway for a session's status as a fallback to the callback.
    ///
    /// Fails with `VerificationFailed` when the gateway still reports the
    /// session unpaid; callers may retry later.
    pub async fn verify_and_confirm(&self, session_id: &str) -> AppResult<PaymentRecord> {
        let payment = self.repository.payments.find_by_session(session_id).await?;
        if payment.status == PaymentStatus::Paid {
            return Ok(payment);
        }

        match self.gateway.get_status(session_id).await? {
            SessionStatus::Paid => self.confirm_by_callback(session_id).await,
            SessionStatus::Unpaid => Err(AppError::VerificationFailed(
                "gateway reports the session as unpaid".to_string(),
            )),
        }
    }

    /// Expire every PENDING payment created before the cutoff
    pub async fn expire_pending(&self, cutoff: DateTime<Utc>) -> AppResult<usize> {
        let count = self.repository.payments.expire_pending(cutoff).await?;
        if count > 0 {
            dispatch(self.notifier.as_ref(), Event::PaymentsExpired { count }).await;
        }
        Ok(count)
    }

    /// Refund a PAID payment through the gateway; `None` refunds in full
    pub async fn refund(
        &self,
        payment_id: Uuid,
        amount: Option<Decimal>,
    ) -> AppResult<PaymentRecord> {
        let payment = self.repository.payments.get_by_id(payment_id).await?;
        if payment.status != PaymentStatus::Paid {
            return Err(AppError::InvalidState(
                "only paid payments can be refunded".to_string(),
            ));
        }
        if let Some(requested) = amount {
            if requested <= Decimal::ZERO || requested > payment.amount {
                return Err(AppError::InvalidState(
                    "refund amount must be positive and at most the paid amount".to_string(),
                ));
            }
        }

        let refund_ref = self.gateway.refund(&payment.session_id, amount).await?;
        self.repository
            .payments
            .record_refund(payment.id, refund_ref, Utc::now())
            .await
    }

    /// Get one payment; restricted to its borrower or an administrator
    pub async fn get(&self, actor: &Actor, payment_id: Uuid) -> AppResult<PaymentRecord> {
        let payment = self.repository.payments.get_by_id(payment_id).await?;
        let borrowing = self
            .repository
            .borrowings
            .get_by_id(payment.borrowing_id)
            .await?;
        actor.require_self_or_admin(borrowing.borrower_id)?;
        Ok(payment)
    }

    /// List payments; non-administrators always see their own only
    pub async fn list(
        &self,
        actor: &Actor,
        mut filter: PaymentFilter,
    ) -> AppResult<Vec<PaymentRecord>> {
        if !actor.is_admin {
            filter.borrower_id = Some(actor.user_id);
        }
        self.repository.payments.list(filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::book::CreateBook;
    use crate::models::borrowing::Borrowing;
    use crate::models::fine::FineStatus;
    use crate::models::CoverType;
    use crate::services::gateway::{CheckoutSession, MockPaymentGateway};
    use crate::services::notifier::RecordingSink;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    async fn seed_book(repository: &Repository) -> Uuid {
        let book = repository
            .books
            .create(CreateBook {
                title: "The Dispossessed".to_string(),
                author: "Ursula K. Le Guin".to_string(),
                cover: CoverType::Hard,
                inventory: 5,
                daily_fee: dec!(2.00),
            })
            .await
            .unwrap();
        book.id
    }

    /// Borrowing spanning 10 days, starting today
    async fn seed_borrowing(repository: &Repository, book_id: Uuid) -> Borrowing {
        let today = Utc::now().date_naive();
        repository
            .borrowings
            .create(Uuid::new_v4(), book_id, today, today + Duration::days(10))
            .await
            .unwrap()
    }

    fn paying_gateway() -> MockPaymentGateway {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_session().returning(|amount, _| {
            Ok(CheckoutSession {
                session_id: "sess_test_1".to_string(),
                session_url: "https://gateway.example.com/pay/sess_test_1".to_string(),
                amount,
            })
        });
        gateway
    }

    fn service(
        repository: &Repository,
        gateway: MockPaymentGateway,
    ) -> (PaymentsService, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        (
            PaymentsService::new(repository.clone(), Arc::new(gateway), sink.clone()),
            sink,
        )
    }

    #[tokio::test]
    async fn create_session_persists_pending_record_with_gateway_amount() {
        let repository = Repository::new();
        let book_id = seed_book(&repository).await;
        let borrowing = seed_borrowing(&repository, book_id).await;

        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_session().returning(|_, _| {
            Ok(CheckoutSession {
                session_id: "sess_test_1".to_string(),
                session_url: "https://gateway.example.com/pay/sess_test_1".to_string(),
                // The gateway's own figure wins over the caller's.
                amount: dec!(19.99),
            })
        });
        let (service, _) = service(&repository, gateway);

        let actor = Actor::new(borrowing.borrower_id, false);
        let payment = service
            .create_session(
                &actor,
                CreatePayment {
                    borrowing_id: borrowing.id,
                    kind: ObligationKind::RentalPayment,
                },
            )
            .await
            .unwrap();

        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.amount, dec!(19.99));
        assert_eq!(payment.session_id, "sess_test_1");
    }

    #[tokio::test]
    async fn gateway_failure_persists_nothing() {
        let repository = Repository::new();
        let book_id = seed_book(&repository).await;
        let borrowing = seed_borrowing(&repository, book_id).await;

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_session()
            .returning(|_, _| Err(AppError::Gateway("connection refused".to_string())));
        let (service, _) = service(&repository, gateway);

        let actor = Actor::new(borrowing.borrower_id, false);
        let result = service
            .create_session(
                &actor,
                CreatePayment {
                    borrowing_id: borrowing.id,
                    kind: ObligationKind::RentalPayment,
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Gateway(_))));

        let admin = Actor::new(Uuid::new_v4(), true);
        let payments = service.list(&admin, PaymentFilter::default()).await.unwrap();
        assert!(payments.is_empty());
    }

    #[tokio::test]
    async fn fine_session_requires_a_pending_fine() {
        let repository = Repository::new();
        let book_id = seed_book(&repository).await;
        let borrowing = seed_borrowing(&repository, book_id).await;
        let (service, _) = service(&repository, paying_gateway());

        let actor = Actor::new(borrowing.borrower_id, false);
        let result = service
            .create_session(
                &actor,
                CreatePayment {
                    borrowing_id: borrowing.id,
                    kind: ObligationKind::Fine,
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn callback_confirmation_is_idempotent() {
        let repository = Repository::new();
        let book_id = seed_book(&repository).await;
        let borrowing = seed_borrowing(&repository, book_id).await;
        let (service, sink) = service(&repository, paying_gateway());

        let actor = Actor::new(borrowing.borrower_id, false);
        service
            .create_session(
                &actor,
                CreatePayment {
                    borrowing_id: borrowing.id,
                    kind: ObligationKind::RentalPayment,
                },
            )
            .await
            .unwrap();

        let first = service.confirm_by_callback("sess_test_1").await.unwrap();
        assert_eq!(first.status, PaymentStatus::Paid);

        let second = service.confirm_by_callback("sess_test_1").await.unwrap();
        assert_eq!(second.status, PaymentStatus::Paid);

        let confirmations: Vec<_> = sink
            .events()
            .await
            .into_iter()
            .filter(|e| matches!(e, Event::PaymentConfirmed { .. }))
            .collect();
        assert_eq!(confirmations.len(), 1);
    }

    #[tokio::test]
    async fn callback_for_unknown_session_is_not_found() {
        let repository = Repository::new();
        let (service, _) = service(&repository, MockPaymentGateway::new());

        let result = service.confirm_by_callback("sess_missing").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn confirming_a_fine_payment_settles_the_fine() {
        let repository = Repository::new();
        let book_id = seed_book(&repository).await;
        let today = Utc::now().date_naive();
        let borrowing = repository
            .borrowings
            .create(
                Uuid::new_v4(),
                book_id,
                today - Duration::days(12),
                today - Duration::days(5),
            )
            .await
            .unwrap();
        let fine = repository
            .fines
            .create(borrowing.id, dec!(20.00))
            .await
            .unwrap();
        let (service, _) = service(&repository, paying_gateway());

        let actor = Actor::new(borrowing.borrower_id, false);
        let payment = service
            .create_session(
                &actor,
                CreatePayment {
                    borrowing_id: borrowing.id,
                    kind: ObligationKind::Fine,
                },
            )
            .await
            .unwrap();
        assert_eq!(payment.amount, dec!(20.00));

        service.confirm_by_callback(&payment.session_id).await.unwrap();

        let settled = repository.fines.get_by_id(fine.id).await.unwrap();
        assert_eq!(settled.status, FineStatus::Paid);
    }

    #[tokio::test]
    async fn verify_confirms_when_gateway_reports_paid() {
        let repository = Repository::new();
        let book_id = seed_book(&repository).await;
        let borrowing = seed_borrowing(&repository, book_id).await;

        let mut gateway = paying_gateway();
        gateway
            .expect_get_status()
            .returning(|_| Ok(SessionStatus::Paid));
        let (service, _) = service(&repository, gateway);

        let actor = Actor::new(borrowing.borrower_id, false);
        let payment = service
            .create_session(
                &actor,
                CreatePayment {
                    borrowing_id: borrowing.id,
                    kind: ObligationKind::RentalPayment,
                },
            )
            .await
            .unwrap();

        let verified = service.verify_and_confirm(&payment.session_id).await.unwrap();
        assert_eq!(verified.status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn verify_fails_retryably_when_gateway_reports_unpaid() {
        let repository = Repository::new();
        let book_id = seed_book(&repository).await;
        let borrowing = seed_borrowing(&repository, book_id).await;

        let mut gateway = paying_gateway();
        gateway
            .expect_get_status()
            .returning(|_| Ok(SessionStatus::Unpaid));
        let (service, _) = service(&repository, gateway);

        let actor = Actor::new(borrowing.borrower_id, false);
        let payment = service
            .create_session(
                &actor,
                CreatePayment {
                    borrowing_id: borrowing.id,
                    kind: ObligationKind::RentalPayment,
                },
            )
            .await
            .unwrap();

        let result = service.verify_and_confirm(&payment.session_id).await;
        assert!(matches!(result, Err(AppError::VerificationFailed(_))));

        // The record stays PENDING for a later retry.
        let admin = Actor::new(Uuid::new_v4(), true);
        let unchanged = service.get(&admin, payment.id).await.unwrap();
        assert_eq!(unchanged.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn verify_after_callback_skips_the_gateway() {
        let repository = Repository::new();
        let book_id = seed_book(&repository).await;
        let borrowing = seed_borrowing(&repository, book_id).await;

        // No get_status expectation: polling an already PAID session would panic.
        let (service, _) = service(&repository, paying_gateway());

        let actor = Actor::new(borrowing.borrower_id, false);
        let payment = service
            .create_session(
                &actor,
                CreatePayment {
                    borrowing_id: borrowing.id,
                    kind: ObligationKind::RentalPayment,
                },
            )
            .await
            .unwrap();

        service.confirm_by_callback(&payment.session_id).await.unwrap();
        let verified = service.verify_and_confirm(&payment.session_id).await.unwrap();
        assert_eq!(verified.status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn expiry_only_touches_stale_pending_records() {
        let repository = Repository::new();
        let book_id = seed_book(&repository).await;
        let borrowing = seed_borrowing(&repository, book_id).await;
        let (service, sink) = service(&repository, paying_gateway());

        let actor = Actor::new(borrowing.borrower_id, false);
        let payment = service
            .create_session(
                &actor,
                CreatePayment {
                    borrowing_id: borrowing.id,
                    kind: ObligationKind::RentalPayment,
                },
            )
            .await
            .unwrap();

        // A cutoff in the past leaves the fresh record alone.
        let stale_cutoff = Utc::now() - chrono::Duration::hours(24);
        assert_eq!(service.expire_pending(stale_cutoff).await.unwrap(), 0);

        // A cutoff in the future sweeps it up.
        let future_cutoff = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(service.expire_pending(future_cutoff).await.unwrap(), 1);

        let admin = Actor::new(Uuid::new_v4(), true);
        let expired = service.get(&admin, payment.id).await.unwrap();
        assert_eq!(expired.status, PaymentStatus::Expired);

        assert!(sink
            .events()
            .await
            .iter()
            .any(|e| matches!(e, Event::PaymentsExpired { count: 1 })));

        // Expired sessions can no longer be confirmed.
        let result = service.confirm_by_callback(&payment.session_id).await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn refund_requires_a_paid_payment() {
        let repository = Repository::new();
        let book_id = seed_book(&repository).await;
        let borrowing = seed_borrowing(&repository, book_id).await;
        let (service, _) = service(&repository, paying_gateway());

        let actor = Actor::new(borrowing.borrower_id, false);
        let payment = service
            .create_session(
                &actor,
                CreatePayment {
                    borrowing_id: borrowing.id,
                    kind: ObligationKind::RentalPayment,
                },
            )
            .await
            .unwrap();

        let result = service.refund(payment.id, None).await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn refund_records_the_gateway_reference() {
        let repository = Repository::new();
        let book_id = seed_book(&repository).await;
        let borrowing = seed_borrowing(&repository, book_id).await;

        let mut gateway = paying_gateway();
        gateway
            .expect_refund()
            .returning(|_, _| Ok("re_test_1".to_string()));
        let (service, _) = service(&repository, gateway);

        let actor = Actor::new(borrowing.borrower_id, false);
        let payment = service
            .create_session(
                &actor,
                CreatePayment {
                    borrowing_id: borrowing.id,
                    kind: ObligationKind::RentalPayment,
                },
            )
            .await
            .unwrap();
        service.confirm_by_callback(&payment.session_id).await.unwrap();

        let refunded = service.refund(payment.id, Some(dec!(5.00))).await.unwrap();
        assert_eq!(refunded.refund_ref.as_deref(), Some("re_test_1"));
        assert!(refunded.refunded_at.is_some());
        assert_eq!(refunded.status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn refund_rejects_amounts_above_the_payment() {
        let repository = Repository::new();
        let book_id = seed_book(&repository).await;
        let borrowing = seed_borrowing(&repository, book_id).await;
        let (service, _) = service(&repository, paying_gateway());

        let actor = Actor::new(borrowing.borrower_id, false);
        let payment = service
            .create_session(
                &actor,
                CreatePayment {
                    borrowing_id: borrowing.id,
                    kind: ObligationKind::RentalPayment,
                },
            )
            .await
            .unwrap();
        service.confirm_by_callback(&payment.session_id).await.unwrap();

        let result = service.refund(payment.id, Some(dec!(1000.00))).await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }
}
