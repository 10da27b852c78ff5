//! Events emitted to the notification sink

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::payment::ObligationKind;

/// Structured notification emitted at the end of a lifecycle transition.
///
/// Delivery is fire-and-forget; the emitting operation never fails because
/// of the sink.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    BorrowingCreated {
        borrowing_id: Uuid,
        borrower_id: Uuid,
        book_id: Uuid,
        book_title: String,
        expected_return_date: NaiveDate,
    },
    BorrowingReturned {
        borrowing_id: Uuid,
        borrower_id: Uuid,
        book_id: Uuid,
        book_title: String,
        actual_return_date: NaiveDate,
        was_overdue: bool,
    },
    FineIssued {
        fine_id: Uuid,
        borrowing_id: Uuid,
        borrower_id: Uuid,
        amount: Decimal,
        overdue_days: i64,
    },
    FineWaived {
        fine_id: Uuid,
        borrowing_id: Uuid,
        amount: Decimal,
        reason: Option<String>,
    },
    PaymentConfirmed {
        payment_id: Uuid,
        borrowing_id: Uuid,
        kind: ObligationKind,
        amount: Decimal,
    },
    PaymentsExpired {
        count: usize,
    },
    ReturnDue {
        borrowing_id: Uuid,
        borrower_id: Uuid,
        book_title: String,
        expected_return_date: NaiveDate,
        days_left: i64,
    },
}

impl Event {
    /// Short event kind for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Event::BorrowingCreated { .. } => "borrowing_created",
            Event::BorrowingReturned { .. } => "borrowing_returned",
            Event::FineIssued { .. } => "fine_issued",
            Event::FineWaived { .. } => "fine_waived",
            Event::PaymentConfirmed { .. } => "payment_confirmed",
            Event::PaymentsExpired { .. } => "payments_expired",
            Event::ReturnDue { .. } => "return_due",
        }
    }
}
