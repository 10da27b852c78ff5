//! Fines repository
//!
//! The uniqueness rule (one PENDING-or-PAID fine per borrowing) is enforced
//! by checking and inserting under the same write guard, so overlapping
//! sweeps cannot both create a fine for the same borrowing.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::fine::{FineFilter, FineRecord, FineStatistics, FineStatus},
};

use super::{Db, Store};

#[derive(Clone)]
pub struct FinesRepository {
    db: Db,
}

impl FinesRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Create a PENDING fine for a borrowing.
    ///
    /// Fails with `Duplicate` when the borrowing already carries a fine that
    /// has not been waived.
    pub async fn create(&self, borrowing_id: Uuid, amount: Decimal) -> AppResult<FineRecord> {
        let mut store = self.db.write().await;

        if !store.borrowings.contains_key(&borrowing_id) {
            return Err(AppError::NotFound(format!(
                "Borrowing with id {} not found",
                borrowing_id
            )));
        }

        let exists = store
            .fines
            .values()
            .any(|f| f.borrowing_id == borrowing_id && f.blocks_reissue());
        if exists {
            return Err(AppError::Duplicate(format!(
                "a fine already exists for borrowing {}",
                borrowing_id
            )));
        }

        let fine = FineRecord {
            id: Uuid::new_v4(),
            borrowing_id,
            amount,
            status: FineStatus::Pending,
            created_at: Utc::now(),
            waive_reason: None,
        };
        store.fines.insert(fine.id, fine.clone());
        Ok(fine)
    }

    /// Get fine by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<FineRecord> {
        let store = self.db.read().await;
        store
            .fines
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Fine with id {} not found", id)))
    }

    /// Check whether a borrowing carries a fine that blocks a new one
    pub async fn has_open_fine(&self, borrowing_id: Uuid) -> bool {
        let store = self.db.read().await;
        store
            .fines
            .values()
            .any(|f| f.borrowing_id == borrowing_id && f.blocks_reissue())
    }

    /// The borrowing's PENDING fine, if any
    pub async fn find_pending_by_borrowing(&self, borrowing_id: Uuid) -> Option<FineRecord> {
        let store = self.db.read().await;
        store
            .fines
            .values()
            .find(|f| f.borrowing_id == borrowing_id && f.status == FineStatus::Pending)
            .cloned()
    }

    /// Waive the borrowing's PENDING fine.
    ///
    /// Fails with `NotFound` when the borrowing has no PENDING fine.
    pub async fn waive(
        &self,
        borrowing_id: Uuid,
        reason: Option<String>,
    ) -> AppResult<FineRecord> {
        let mut store = self.db.write().await;
        let fine = store
            .fines
            .values_mut()
            .find(|f| f.borrowing_id == borrowing_id && f.status == FineStatus::Pending)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "no pending fine exists for borrowing {}",
                    borrowing_id
                ))
            })?;

        fine.status = FineStatus::Waived;
        fine.waive_reason = reason;
        Ok(fine.clone())
    }

    /// List fines matching the filter, newest first
    pub async fn list(&self, filter: FineFilter) -> AppResult<Vec<FineRecord>> {
        let store = self.db.read().await;

        let mut fines: Vec<FineRecord> = store
            .fines
            .values()
            .filter(|f| match filter.status {
                Some(status) => f.status == status,
                None => true,
            })
            .filter(|f| match filter.borrower_id {
                Some(borrower_id) => borrower_of(&store, f.borrowing_id) == Some(borrower_id),
                None => true,
            })
            .cloned()
            .collect();
        fines.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(fines)
    }

    /// Aggregate fine figures as of `today`
    pub async fn statistics(
        &self,
        today: NaiveDate,
        fine_multiplier: Decimal,
    ) -> AppResult<FineStatistics> {
        let store = self.db.read().await;

        let mut pending = 0;
        let mut paid = 0;
        let mut waived = 0;
        let mut paid_revenue = Decimal::ZERO;
        for fine in store.fines.values() {
            match fine.status {
                FineStatus::Pending => pending += 1,
                FineStatus::Paid => {
                    paid += 1;
                    paid_revenue += fine.amount;
                }
                FineStatus::Waived => waived += 1,
            }
        }

        let overdue_without_fine = store
            .borrowings
            .values()
            .filter(|b| b.is_overdue(today))
            .filter(|b| {
                !store
                    .fines
                    .values()
                    .any(|f| f.borrowing_id == b.id && f.blocks_reissue())
            })
            .count();

        Ok(FineStatistics {
            pending,
            paid,
            waived,
            paid_revenue,
            overdue_without_fine,
            fine_multiplier,
        })
    }
}

fn borrower_of(store: &Store, borrowing_id: Uuid) -> Option<Uuid> {
    store.borrowings.get(&borrowing_id).map(|b| b.borrower_id)
}
