//! Fine engine
//!
//! Derives monetary obligations from overdue borrowings. The sweep is safe
//! to re-run at any cadence: borrowings that already carry a fine are
//! skipped, and one borrowing's failure never aborts the rest.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        borrowing::Borrowing,
        fine::{FineFilter, FineRecord, FineStatistics, FineSweepFailure, FineSweepReport},
        Actor, Event,
    },
    repository::Repository,
};

use super::notifier::{dispatch, NotificationSink};

#[derive(Clone)]
pub struct FinesService {
    repository: Repository,
    notifier: Arc<dyn NotificationSink>,
    fine_multiplier: Decimal,
}

impl FinesService {
    pub fn new(
        repository: Repository,
        notifier: Arc<dyn NotificationSink>,
        fine_multiplier: Decimal,
    ) -> Self {
        Self {
            repository,
            notifier,
            fine_multiplier,
        }
    }

    /// Fine amount owed for a borrowing as of `today`; zero when not overdue.
    ///
    /// This is the single place the fine formula lives.
    pub fn calculate_amount(
        &self,
        borrowing: &Borrowing,
        daily_fee: Decimal,
        today: NaiveDate,
    ) -> Decimal {
        let overdue_days = borrowing.overdue_days(today);
        if overdue_days == 0 {
            return Decimal::ZERO;
        }
        daily_fee * Decimal::from(overdue_days) * self.fine_multiplier
    }

    /// Overdue active borrowings; a pure read with no side effects
    pub async fn scan(&self) -> AppResult<Vec<Borrowing>> {
        let today = Utc::now().date_naive();
        self.repository.borrowings.find_overdue(today).await
    }

    /// Issue one fine per overdue borrowing.
    ///
    /// Borrowings that already carry a PENDING or PAID fine are counted as
    /// skipped, including those lost to a concurrent sweep. Failures are
    /// collected per borrowing and reported, never thrown.
    pub async fn issue_fines(&self) -> AppResult<FineSweepReport> {
        let today = Utc::now().date_naive();
        let overdue = self.repository.borrowings.find_overdue(today).await?;

        let mut report = FineSweepReport {
            total_overdue: overdue.len(),
            ..Default::default()
        };

        for borrowing in overdue {
            if self.repository.fines.has_open_fine(borrowing.id).await {
                report.skipped += 1;
                continue;
            }

            match self.issue_one(&borrowing, today).await {
                Ok(_) => report.created += 1,
                Err(AppError::Duplicate(_)) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    report.failures.push(FineSweepFailure {
                        borrowing_id: borrowing.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    async fn issue_one(&self, borrowing: &Borrowing, today: NaiveDate) -> AppResult<FineRecord> {
        let book = self.repository.books.get_by_id(borrowing.book_id).await?;
        let amount = self.calculate_amount(borrowing, book.daily_fee, today);
        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidState(
                "computed fine amount is not positive".to_string(),
            ));
        }

        let fine = self.repository.fines.create(borrowing.id, amount).await?;
        dispatch(
            self.notifier.as_ref(),
            Event::FineIssued {
                fine_id: fine.id,
                borrowing_id: borrowing.id,
                borrower_id: borrowing.borrower_id,
                amount: fine.amount,
                overdue_days: borrowing.overdue_days(today),
            },
        )
        .await;
        Ok(fine)
    }

    /// Waive the borrowing's PENDING fine.
    ///
    /// Fails with `NotFound` when there is nothing to waive.
    pub async fn waive(
        &self,
        borrowing_id: Uuid,
        reason: Option<String>,
    ) -> AppResult<FineRecord> {
        let fine = self
            .repository
            .fines
            .waive(borrowing_id, reason.clone())
            .await?;

        dispatch(
            self.notifier.as_ref(),
            Event::FineWaived {
                fine_id: fine.id,
                borrowing_id,
                amount: fine.amount,
                reason,
            },
        )
        .await;
        Ok(fine)
    }

    /// List fines; non-administrators always see their own only
    pub async fn list(&self, actor: &Actor, mut filter: FineFilter) -> AppResult<Vec<FineRecord>> {
        if !actor.is_admin {
            filter.borrower_id = Some(actor.user_id);
        }
        self.repository.fines.list(filter).await
    }

    /// Aggregate fine figures for administrators
    pub async fn statistics(&self) -> AppResult<FineStatistics> {
        let today = Utc::now().date_naive();
        self.repository
            .fines
            .statistics(today, self.fine_multiplier)
            .await
    }
}
