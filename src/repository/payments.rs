//! Payments repository
//!
//! Confirmation settles the matching fine in the same write guard, so a
//! callback and a verification poll racing on one session can only produce
//! a single transition.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        fine::FineStatus,
        payment::{ObligationKind, PaymentFilter, PaymentRecord, PaymentStatus},
    },
};

use super::{Db, Store};

#[derive(Clone)]
pub struct PaymentsRepository {
    db: Db,
}

impl PaymentsRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Persist a payment record already bound to a gateway session
    pub async fn insert(&self, record: PaymentRecord) -> AppResult<PaymentRecord> {
        let mut store = self.db.write().await;
        store.payments.insert(record.id, record.clone());
        Ok(record)
    }

    /// Get payment by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<PaymentRecord> {
        let store = self.db.read().await;
        store
            .payments
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Payment with id {} not found", id)))
    }

    /// Get payment by gateway session reference
    pub async fn find_by_session(&self, session_id: &str) -> AppResult<PaymentRecord> {
        let store = self.db.read().await;
        store
            .payments
            .values()
            .find(|p| p.session_id == session_id)
            .cloned()
            .ok_or_else(|| {
                AppError::NotFound(format!("no payment matches session {}", session_id))
            })
    }

    /// Move the session's payment to PAID.
    ///
    /// Returns the record and whether this call performed the transition;
    /// a payment that is already PAID is reported as-is. A FINE payment
    /// settles the borrowing's PENDING fine in the same transaction.
    pub async fn confirm_by_session(
        &self,
        session_id: &str,
    ) -> AppResult<(PaymentRecord, bool)> {
        let mut store = self.db.write().await;

        let payment = store
            .payments
            .values_mut()
            .find(|p| p.session_id == session_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("no payment matches session {}", session_id))
            })?;

        match payment.status {
            PaymentStatus::Paid => Ok((payment.clone(), false)),
            PaymentStatus::Expired => Err(AppError::InvalidState(
                "payment session has expired".to_string(),
            )),
            PaymentStatus::Pending => {
                payment.status = PaymentStatus::Paid;
                let confirmed = payment.clone();

                if confirmed.kind == ObligationKind::Fine {
                    settle_fine(&mut store, confirmed.borrowing_id);
                }
                Ok((confirmed, true))
            }
        }
    }

    /// Expire every PENDING payment created before the cutoff; returns the
    /// number of records touched
    pub async fn expire_pending(&self, cutoff: DateTime<Utc>) -> AppResult<usize> {
        let mut store = self.db.write().await;
        let mut count = 0;
        for payment in store.payments.values_mut() {
            if payment.status == PaymentStatus::Pending && payment.created_at < cutoff {
                payment.status = PaymentStatus::Expired;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Record a completed gateway refund against a PAID payment
    pub async fn record_refund(
        &self,
        id: Uuid,
        refund_ref: String,
        refunded_at: DateTime<Utc>,
    ) -> AppResult<PaymentRecord> {
        let mut store = self.db.write().await;
        let payment = store
            .payments
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Payment with id {} not found", id)))?;

        if payment.status != PaymentStatus::Paid {
            return Err(AppError::InvalidState(
                "only paid payments can be refunded".to_string(),
            ));
        }

        payment.refund_ref = Some(refund_ref);
        payment.refunded_at = Some(refunded_at);
        Ok(payment.clone())
    }

    /// List payments matching the filter, newest first
    pub async fn list(&self, filter: PaymentFilter) -> AppResult<Vec<PaymentRecord>> {
        let store = self.db.read().await;

        let mut payments: Vec<PaymentRecord> = store
            .payments
            .values()
            .filter(|p| match filter.status {
                Some(status) => p.status == status,
                None => true,
            })
            .filter(|p| match filter.kind {
                Some(kind) => p.kind == kind,
                None => true,
            })
            .filter(|p| match filter.borrower_id {
                Some(borrower_id) => borrower_of(&store, p.borrowing_id) == Some(borrower_id),
                None => true,
            })
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }
}

fn settle_fine(store: &mut Store, borrowing_id: Uuid) {
    if let Some(fine) = store
        .fines
        .values_mut()
        .find(|f| f.borrowing_id == borrowing_id && f.status == FineStatus::Pending)
    {
        fine.status = FineStatus::Paid;
    }
}

fn borrower_of(store: &Store, borrowing_id: Uuid) -> Option<Uuid> {
    store.borrowings.get(&borrowing_id).map(|b| b.borrower_id)
}
