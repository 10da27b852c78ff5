//! Fine endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        fine::{FineFilter, FineStatistics, FineSweepReport, WaiveFine},
        Actor, FineRecord,
    },
    AppState,
};

/// List fines
#[utoipa::path(
    get,
    path = "/fines",
    tag = "fines",
    params(FineFilter),
    responses(
        (status = 200, description = "Fines visible to the caller", body = Vec<FineRecord>)
    )
)]
pub async fn list_fines(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<FineFilter>,
) -> AppResult<Json<Vec<FineRecord>>> {
    let fines = state.services.fines.list(&actor, filter).await?;
    Ok(Json(fines))
}

/// Run the fine sweep over all overdue borrowings
#[utoipa::path(
    post,
    path = "/fines/process",
    tag = "fines",
    responses(
        (status = 200, description = "Sweep summary", body = FineSweepReport),
        (status = 403, description = "Administrator role required")
    )
)]
pub async fn process_fines(
    State(state): State<AppState>,
    actor: Actor,
) -> AppResult<Json<FineSweepReport>> {
    actor.require_admin()?;

    let report = state.services.fines.issue_fines().await?;
    Ok(Json(report))
}

/// Waive the pending fine of a borrowing
#[utoipa::path(
    post,
    path = "/fines/{borrowing_id}/waive",
    tag = "fines",
    params(
        ("borrowing_id" = Uuid, Path, description = "Borrowing ID")
    ),
    request_body = WaiveFine,
    responses(
        (status = 200, description = "Waived fine", body = FineRecord),
        (status = 403, description = "Administrator role required"),
        (status = 404, description = "No pending fine for this borrowing")
    )
)]
pub async fn waive_fine(
    State(state): State<AppState>,
    actor: Actor,
    Path(borrowing_id): Path<Uuid>,
    Json(request): Json<WaiveFine>,
) -> AppResult<Json<FineRecord>> {
    actor.require_admin()?;

    let fine = state
        .services
        .fines
        .waive(borrowing_id, request.reason)
        .await?;
    Ok(Json(fine))
}

/// Aggregated fine figures
#[utoipa::path(
    get,
    path = "/fines/statistics",
    tag = "fines",
    responses(
        (status = 200, description = "Fine statistics", body = FineStatistics),
        (status = 403, description = "Administrator role required")
    )
)]
pub async fn fine_statistics(
    State(state): State<AppState>,
    actor: Actor,
) -> AppResult<Json<FineStatistics>> {
    actor.require_admin()?;

    let statistics = state.services.fines.statistics().await?;
    Ok(Json(statistics))
}
