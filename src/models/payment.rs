//! Payment ledger records backed by gateway checkout sessions

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Status of a payment record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Expired,
}

/// What the payment settles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObligationKind {
    RentalPayment,
    Fine,
}

impl ObligationKind {
    pub fn label(&self) -> &'static str {
        match self {
            ObligationKind::RentalPayment => "rental payment",
            ObligationKind::Fine => "fine",
        }
    }
}

/// A payment intent tracked against a gateway checkout session.
///
/// Status strictly advances PENDING to PAID or EXPIRED. PAID is terminal;
/// a refund is recorded on the side and does not reopen the record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub borrowing_id: Uuid,
    pub kind: ObligationKind,
    /// Amount confirmed by the gateway when the session was created
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub session_id: String,
    pub session_url: String,
    pub created_at: DateTime<Utc>,
    pub refund_ref: Option<String>,
    pub refunded_at: Option<DateTime<Utc>>,
}

/// Create payment session request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreatePayment {
    pub borrowing_id: Uuid,
    pub kind: ObligationKind,
}

/// Refund request; amount defaults to the full payment amount
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RefundPayment {
    pub amount: Option<Decimal>,
}

/// Query filter for listing payments
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
pub struct PaymentFilter {
    pub status: Option<PaymentStatus>,
    pub kind: Option<ObligationKind>,
    /// Restrict to one borrower (administrators only; others always see their own)
    pub borrower_id: Option<Uuid>,
}
