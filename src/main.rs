//! Libris Server - Library Lending and Payments
//!
//! REST API server for the borrowing, fine and payment lifecycle of a
//! lending library.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use libris_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::{
        gateway::HttpPaymentGateway,
        notifier::{NotificationSink, NullNotifier, WebhookNotifier},
        Services,
    },
    tasks, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("libris_server={},tower_http=debug", config.logging.level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Libris Server v{}", env!("CARGO_PKG_VERSION"));

    // External collaborators
    let gateway = Arc::new(
        HttpPaymentGateway::new(config.gateway.clone()).expect("Failed to build payment gateway"),
    );
    let notifier: Arc<dyn NotificationSink> = match &config.notifier.webhook_url {
        Some(url) => {
            tracing::info!("Notifications go to {}", url);
            Arc::new(
                WebhookNotifier::new(url.clone(), &config.notifier)
                    .expect("Failed to build webhook notifier"),
            )
        }
        None => {
            tracing::info!("No notification webhook configured; events are dropped");
            Arc::new(NullNotifier)
        }
    };

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository and services
    let repository = Repository::new();
    let services = Arc::new(Services::new(
        repository,
        config.library.clone(),
        gateway,
        notifier,
    ));

    // Background sweeps (fines, payment expiry, reminders)
    tasks::spawn(config.scheduler.clone(), services.clone());

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Books (catalog)
        .route("/books", get(api::books::list_books))
        .route("/books", post(api::books::create_book))
        .route("/books/:id", get(api::books::get_book))
        .route("/books/:id", put(api::books::update_book))
        .route("/books/:id", delete(api::books::delete_book))
        // Borrowings
        .route("/borrowings", post(api::borrowings::create_borrowing))
        .route("/borrowings", get(api::borrowings::list_borrowings))
        .route("/borrowings/:id", get(api::borrowings::get_borrowing))
        .route("/borrowings/:id/return", post(api::borrowings::return_borrowing))
        // Fines
        .route("/fines", get(api::fines::list_fines))
        .route("/fines/process", post(api::fines::process_fines))
        .route("/fines/statistics", get(api::fines::fine_statistics))
        .route("/fines/:borrowing_id/waive", post(api::fines::waive_fine))
        // Payments
        .route("/payments", post(api::payments::create_payment))
        .route("/payments", get(api::payments::list_payments))
        .route("/payments/success", get(api::payments::payment_success))
        .route("/payments/cancel", get(api::payments::payment_cancel))
        .route("/payments/verify", post(api::payments::verify_payment))
        .route("/payments/expire", post(api::payments::expire_payments))
        .route("/payments/:id", get(api::payments::get_payment))
        .route("/payments/:id/refund", post(api::payments::refund_payment))
        .with_state(state);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
