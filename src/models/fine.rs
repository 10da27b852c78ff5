//! Fine records derived from overdue borrowings

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Status of a fine record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum FineStatus {
    Pending,
    Paid,
    Waived,
}

/// A monetary obligation issued against an overdue borrowing.
///
/// A borrowing carries at most one fine that is PENDING or PAID; a new fine
/// may only be issued once the previous one has been waived.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FineRecord {
    pub id: Uuid,
    pub borrowing_id: Uuid,
    pub amount: Decimal,
    pub status: FineStatus,
    pub created_at: DateTime<Utc>,
    pub waive_reason: Option<String>,
}

impl FineRecord {
    /// A fine blocks re-issuing unless it has been waived
    pub fn blocks_reissue(&self) -> bool {
        matches!(self.status, FineStatus::Pending | FineStatus::Paid)
    }
}

/// Query filter for listing fines
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
pub struct FineFilter {
    pub status: Option<FineStatus>,
    /// Restrict to one borrower (administrators only; others always see their own)
    pub borrower_id: Option<Uuid>,
}

/// Waive request
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct WaiveFine {
    pub reason: Option<String>,
}

/// Outcome of one fine sweep over the overdue borrowings
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct FineSweepReport {
    pub total_overdue: usize,
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<FineSweepFailure>,
}

/// Per-borrowing failure detail from a fine sweep
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FineSweepFailure {
    pub borrowing_id: Uuid,
    pub error: String,
}

/// Aggregated fine figures for administrators
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FineStatistics {
    pub pending: usize,
    pub paid: usize,
    pub waived: usize,
    pub paid_revenue: Decimal,
    pub overdue_without_fine: usize,
    pub fine_multiplier: Decimal,
}
