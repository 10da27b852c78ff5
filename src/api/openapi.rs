//! OpenAPI documentation

use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use crate::api::{books, borrowings, fines, health, payments};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Libris API",
        version = "1.0.0",
        description = "Library Lending and Payments REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html"),
        contact(name = "Libris Contributors")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::create_book,
        books::get_book,
        books::update_book,
        books::delete_book,
        // Borrowings
        borrowings::create_borrowing,
        borrowings::list_borrowings,
        borrowings::get_borrowing,
        borrowings::return_borrowing,
        // Fines
        fines::list_fines,
        fines::process_fines,
        fines::waive_fine,
        fines::fine_statistics,
        // Payments
        payments::create_payment,
        payments::list_payments,
        payments::get_payment,
        payments::payment_success,
        payments::payment_cancel,
        payments::verify_payment,
        payments::refund_payment,
        payments::expire_payments,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::CoverType,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Borrowings
            crate::models::borrowing::Borrowing,
            crate::models::borrowing::BorrowingDetails,
            crate::models::borrowing::CreateBorrowing,
            crate::models::borrowing::ReturnBorrowing,
            // Fines
            crate::models::fine::FineRecord,
            crate::models::fine::FineStatus,
            crate::models::fine::WaiveFine,
            crate::models::fine::FineSweepReport,
            crate::models::fine::FineSweepFailure,
            crate::models::fine::FineStatistics,
            // Payments
            crate::models::payment::PaymentRecord,
            crate::models::payment::PaymentStatus,
            crate::models::payment::ObligationKind,
            crate::models::payment::CreatePayment,
            crate::models::payment::RefundPayment,
            payments::MessageResponse,
            payments::ExpireResponse,
            // Health
            health::HealthResponse,
            health::ReadyResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Book catalog management"),
        (name = "borrowings", description = "Borrowing lifecycle"),
        (name = "fines", description = "Overdue fines"),
        (name = "payments", description = "Gateway-backed payments")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new().route("/api-docs/openapi.json", get(serve_openapi))
}

async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
