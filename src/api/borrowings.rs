//! Borrowing lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        borrowing::{BorrowingFilter, CreateBorrowing, ReturnBorrowing},
        Actor, BorrowingDetails,
    },
    AppState,
};

/// Borrow a book
#[utoipa::path(
    post,
    path = "/borrowings",
    tag = "borrowings",
    request_body = CreateBorrowing,
    responses(
        (status = 201, description = "Borrowing created", body = BorrowingDetails),
        (status = 400, description = "Expected return date not after today"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "No copies available")
    )
)]
pub async fn create_borrowing(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreateBorrowing>,
) -> AppResult<(StatusCode, Json<BorrowingDetails>)> {
    let details = state.services.borrowings.create(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

/// List borrowings
#[utoipa::path(
    get,
    path = "/borrowings",
    tag = "borrowings",
    params(BorrowingFilter),
    responses(
        (status = 200, description = "Borrowings visible to the caller", body = Vec<BorrowingDetails>)
    )
)]
pub async fn list_borrowings(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<BorrowingFilter>,
) -> AppResult<Json<Vec<BorrowingDetails>>> {
    let borrowings = state.services.borrowings.list(&actor, filter).await?;
    Ok(Json(borrowings))
}

/// Get a borrowing by ID
#[utoipa::path(
    get,
    path = "/borrowings/{id}",
    tag = "borrowings",
    params(
        ("id" = Uuid, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "The borrowing", body = BorrowingDetails),
        (status = 403, description = "Not the borrower or an administrator"),
        (status = 404, description = "Borrowing not found")
    )
)]
pub async fn get_borrowing(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BorrowingDetails>> {
    let details = state.services.borrowings.get(&actor, id).await?;
    Ok(Json(details))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/borrowings/{id}/return",
    tag = "borrowings",
    params(
        ("id" = Uuid, Path, description = "Borrowing ID")
    ),
    request_body = ReturnBorrowing,
    responses(
        (status = 200, description = "Book returned", body = BorrowingDetails),
        (status = 400, description = "Return date in the past"),
        (status = 403, description = "Not the borrower or an administrator"),
        (status = 404, description = "Borrowing not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_borrowing(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<ReturnBorrowing>,
) -> AppResult<Json<BorrowingDetails>> {
    let details = state
        .services
        .borrowings
        .return_borrowing(&actor, id, request)
        .await?;
    Ok(Json(details))
}
