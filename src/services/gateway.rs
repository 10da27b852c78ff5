//! Payment gateway collaborator
//!
//! The gateway owns checkout sessions; the ledger only stores the session
//! reference and the amount the gateway confirmed. Every call runs with a
//! bounded timeout and surfaces failure as `GatewayError`.

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::{
    config::GatewayConfig,
    error::{AppError, AppResult},
    models::payment::ObligationKind,
};

/// Checkout session handed back by the gateway
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub session_id: String,
    pub session_url: String,
    /// Amount the gateway actually charges for the session
    pub amount: Decimal,
}

/// Settlement status reported by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Paid,
    Unpaid,
}

/// Context attached to a checkout session
#[derive(Debug, Clone, Serialize)]
pub struct SessionMetadata {
    pub borrowing_id: Uuid,
    pub user_id: Uuid,
    pub kind: ObligationKind,
    pub description: String,
}

#[mockall::automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a checkout session for the given amount
    async fn create_session(
        &self,
        amount: Decimal,
        metadata: SessionMetadata,
    ) -> AppResult<CheckoutSession>;

    /// Poll the settlement status of a session
    async fn get_status(&self, session_id: &str) -> AppResult<SessionStatus>;

    /// Refund a settled session; `None` refunds the full amount
    async fn refund(&self, session_id: &str, amount: Option<Decimal>) -> AppResult<String>;
}

/// HTTP client for a checkout-style payment gateway
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    amount: i64,
    currency: &'a str,
    description: &'a str,
    success_url: String,
    cancel_url: &'a str,
    metadata: &'a SessionMetadata,
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: String,
    amount_total: i64,
}

#[derive(Deserialize)]
struct StatusResponse {
    payment_status: String,
}

#[derive(Serialize)]
struct RefundRequest<'a> {
    session: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<i64>,
}

#[derive(Deserialize)]
struct RefundResponse {
    id: String,
}

impl HttpPaymentGateway {
    pub fn new(config: GatewayConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build gateway client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_session(
        &self,
        amount: Decimal,
        metadata: SessionMetadata,
    ) -> AppResult<CheckoutSession> {
        let body = CreateSessionRequest {
            amount: to_minor_units(amount)?,
            currency: &self.config.currency,
            description: &metadata.description,
            success_url: format!(
                "{}?session_id={{CHECKOUT_SESSION_ID}}",
                self.config.success_url
            ),
            cancel_url: &self.config.cancel_url,
            metadata: &metadata,
        };

        let response = self
            .client
            .post(self.endpoint("/v1/checkout/sessions"))
            .bearer_auth(&self.config.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("session creation failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Gateway(format!(
                "session creation rejected with status {}",
                response.status()
            )));
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("malformed session response: {}", e)))?;

        Ok(CheckoutSession {
            session_id: session.id,
            session_url: session.url,
            amount: from_minor_units(session.amount_total),
        })
    }

    async fn get_status(&self, session_id: &str) -> AppResult<SessionStatus> {
        let response = self
            .client
            .get(self.endpoint(&format!("/v1/checkout/sessions/{}", session_id)))
            .bearer_auth(&self.config.secret_key)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("status lookup failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Gateway(format!(
                "status lookup rejected with status {}",
                response.status()
            )));
        }

        let status: StatusResponse = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("malformed status response: {}", e)))?;

        if status.payment_status == "paid" {
            Ok(SessionStatus::Paid)
        } else {
            Ok(SessionStatus::Unpaid)
        }
    }

    async fn refund(&self, session_id: &str, amount: Option<Decimal>) -> AppResult<String> {
        let body = RefundRequest {
            session: session_id,
            amount: amount.map(to_minor_units).transpose()?,
        };

        let response = self
            .client
            .post(self.endpoint("/v1/refunds"))
            .bearer_auth(&self.config.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("refund failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Gateway(format!(
                "refund rejected with status {}",
                response.status()
            )));
        }

        let refund: RefundResponse = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("malformed refund response: {}", e)))?;
        Ok(refund.id)
    }
}

/// Convert a decimal amount to gateway minor units (cents)
fn to_minor_units(amount: Decimal) -> AppResult<i64> {
    (amount * Decimal::from(100))
        .round()
        .to_i64()
        .ok_or_else(|| AppError::Gateway(format!("amount {} not representable in cents", amount)))
}

/// Convert gateway minor units (cents) back to a decimal amount
fn from_minor_units(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn minor_unit_conversion_round_trips() {
        assert_eq!(to_minor_units(dec!(20.00)).unwrap(), 2000);
        assert_eq!(to_minor_units(dec!(0.01)).unwrap(), 1);
        assert_eq!(from_minor_units(2000), dec!(20.00));
        assert_eq!(from_minor_units(1), dec!(0.01));
    }

    #[test]
    fn fractional_cents_round_to_nearest() {
        assert_eq!(to_minor_units(dec!(1.005)).unwrap(), 100);
        assert_eq!(to_minor_units(dec!(1.015)).unwrap(), 102);
    }
}
