//! Payment endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        payment::{CreatePayment, PaymentFilter, RefundPayment},
        Actor, PaymentRecord,
    },
    AppState,
};

/// Gateway session reference passed back by redirect or webhook
#[derive(Debug, Deserialize, IntoParams)]
pub struct SessionQuery {
    pub session_id: String,
}

/// Simple status message
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Count of records touched by a batch operation
#[derive(Serialize, ToSchema)]
pub struct ExpireResponse {
    pub count: usize,
}

/// Open a checkout session for a borrowing's rental or fine
#[utoipa::path(
    post,
    path = "/payments",
    tag = "payments",
    request_body = CreatePayment,
    responses(
        (status = 201, description = "Pending payment with checkout URL", body = PaymentRecord),
        (status = 404, description = "Borrowing or pending fine not found"),
        (status = 409, description = "Nothing to pay"),
        (status = 502, description = "Gateway refused the session")
    )
)]
pub async fn create_payment(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreatePayment>,
) -> AppResult<(StatusCode, Json<PaymentRecord>)> {
    let payment = state.services.payments.create_session(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// List payments
#[utoipa::path(
    get,
    path = "/payments",
    tag = "payments",
    params(PaymentFilter),
    responses(
        (status = 200, description = "Payments visible to the caller", body = Vec<PaymentRecord>)
    )
)]
pub async fn list_payments(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<PaymentFilter>,
) -> AppResult<Json<Vec<PaymentRecord>>> {
    let payments = state.services.payments.list(&actor, filter).await?;
    Ok(Json(payments))
}

/// Get a payment by ID
#[utoipa::path(
    get,
    path = "/payments/{id}",
    tag = "payments",
    params(
        ("id" = Uuid, Path, description = "Payment ID")
    ),
    responses(
        (status = 200, description = "The payment", body = PaymentRecord),
        (status = 403, description = "Not the payer or an administrator"),
        (status = 404, description = "Payment not found")
    )
)]
pub async fn get_payment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PaymentRecord>> {
    let payment = state.services.payments.get(&actor, id).await?;
    Ok(Json(payment))
}

/// Success callback target for the gateway redirect
#[utoipa::path(
    get,
    path = "/payments/success",
    tag = "payments",
    params(SessionQuery),
    responses(
        (status = 200, description = "Payment confirmed", body = PaymentRecord),
        (status = 404, description = "Unknown session"),
        (status = 409, description = "Session already expired")
    )
)]
pub async fn payment_success(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> AppResult<Json<PaymentRecord>> {
    let payment = state
        .services
        .payments
        .confirm_by_callback(&query.session_id)
        .await?;
    Ok(Json(payment))
}

/// Cancel target for the gateway redirect
#[utoipa::path(
    get,
    path = "/payments/cancel",
    tag = "payments",
    responses(
        (status = 200, description = "Acknowledgement", body = MessageResponse)
    )
)]
pub async fn payment_cancel() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Payment cancelled; the session stays open for 24 hours".to_string(),
    })
}

/// Poll the gateway for a session's status as a callback fallback
#[utoipa::path(
    post,
    path = "/payments/verify",
    tag = "payments",
    params(SessionQuery),
    responses(
        (status = 200, description = "Payment confirmed", body = PaymentRecord),
        (status = 402, description = "Gateway still reports the session unpaid"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    _actor: Actor,
    Query(query): Query<SessionQuery>,
) -> AppResult<Json<PaymentRecord>> {
    let payment = state
        .services
        .payments
        .verify_and_confirm(&query.session_id)
        .await?;
    Ok(Json(payment))
}

/// Refund a paid payment
#[utoipa::path(
    post,
    path = "/payments/{id}/refund",
    tag = "payments",
    params(
        ("id" = Uuid, Path, description = "Payment ID")
    ),
    request_body = RefundPayment,
    responses(
        (status = 200, description = "Payment with refund recorded", body = PaymentRecord),
        (status = 403, description = "Administrator role required"),
        (status = 404, description = "Payment not found"),
        (status = 409, description = "Payment is not paid")
    )
)]
pub async fn refund_payment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<RefundPayment>,
) -> AppResult<Json<PaymentRecord>> {
    actor.require_admin()?;

    let payment = state.services.payments.refund(id, request.amount).await?;
    Ok(Json(payment))
}

/// Expire stale pending payments now instead of waiting for the sweep
#[utoipa::path(
    post,
    path = "/payments/expire",
    tag = "payments",
    responses(
        (status = 200, description = "Number of payments expired", body = ExpireResponse),
        (status = 403, description = "Administrator role required")
    )
)]
pub async fn expire_payments(
    State(state): State<AppState>,
    actor: Actor,
) -> AppResult<Json<ExpireResponse>> {
    actor.require_admin()?;

    let retention = chrono::Duration::hours(state.config.scheduler.payment_retention_hours);
    let count = state
        .services
        .payments
        .expire_pending(Utc::now() - retention)
        .await?;
    Ok(Json(ExpireResponse { count }))
}
