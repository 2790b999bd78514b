use std::sync::Arc;

use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use styledecor::config::AppConfig;
use styledecor::handlers;
use styledecor::services::bookings::BookingEngine;
use styledecor::services::gateway::stripe::StripeGateway;
use styledecor::services::gateway::PaymentGateway;
use styledecor::services::identity::IdentityVerifier;
use styledecor::services::reconcile::{CheckoutConfig, PaymentReconciler};
use styledecor::state::AppState;
use styledecor::store::memory::MemoryStore;
use styledecor::store::sqlite::SqliteStore;
use styledecor::store::DocumentStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let store: Arc<dyn DocumentStore> = match config.store_backend.as_str() {
        "memory" => {
            tracing::info!("using in-memory document store");
            Arc::new(MemoryStore::new())
        }
        _ => {
            tracing::info!("using sqlite document store (path: {})", config.database_url);
            Arc::new(SqliteStore::open(&config.database_url)?)
        }
    };

    if config.stripe_secret_key.is_empty() {
        tracing::warn!("STRIPE_SECRET_KEY not set; checkout calls will fail");
    }
    let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeGateway::new(
        config.stripe_secret_key.clone(),
        config.stripe_api_base.clone(),
    ));

    let bookings = BookingEngine::new(Arc::clone(&store));
    let payments = PaymentReconciler::new(
        Arc::clone(&store),
        Arc::clone(&gateway),
        CheckoutConfig {
            success_url: config.checkout_success_url.clone(),
            cancel_url: config.checkout_cancel_url.clone(),
            currency: config.currency.clone(),
        },
    );
    let identity = IdentityVerifier::new(config.auth_token_secret.clone());

    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        bookings,
        payments,
        identity,
    });

    let app = Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        .route("/addbooking", post(handlers::bookings::add_booking))
        .route("/allbookings", get(handlers::bookings::all_bookings))
        .route(
            "/booking/decorator",
            get(handlers::bookings::decorator_bookings),
        )
        .route("/booking/:id", get(handlers::bookings::get_booking))
        .route("/booking/:id", patch(handlers::bookings::assign_decorator))
        .route(
            "/booking/:id/status",
            patch(handlers::bookings::update_status),
        )
        .route(
            "/deletebooking/:id",
            delete(handlers::bookings::delete_booking),
        )
        .route(
            "/create-checkout-session",
            post(handlers::payments::create_checkout_session),
        )
        .route(
            "/payment-success",
            patch(handlers::payments::payment_success),
        )
        .route("/payments", get(handlers::payments::list_payments))
        .route("/addservice", post(handlers::catalog::add_service))
        .route("/allservices", get(handlers::catalog::all_services))
        .route("/service/:id", get(handlers::catalog::get_service))
        .route("/deleteservice/:id", delete(handlers::catalog::delete_service))
        .route("/addcategory", post(handlers::catalog::add_category))
        .route("/allcategories", get(handlers::catalog::all_categories))
        .route(
            "/deletecategory/:id",
            delete(handlers::catalog::delete_category),
        )
        .route("/addcoverage", post(handlers::catalog::add_coverage))
        .route("/allcoverage", get(handlers::catalog::all_coverage))
        .route(
            "/deletecoverage/:id",
            delete(handlers::catalog::delete_coverage),
        )
        .route("/adddecorator", post(handlers::decorators::add_decorator))
        .route("/alldecorators", get(handlers::decorators::all_decorators))
        .route(
            "/decorator/:id/status",
            patch(handlers::decorators::set_decorator_status),
        )
        .route(
            "/deletedecorator/:id",
            delete(handlers::decorators::delete_decorator),
        )
        .route("/adduser", post(handlers::users::add_user))
        .route("/user/role", get(handlers::users::get_user_role))
        .route("/user/:id/role", patch(handlers::users::set_user_role))
        .route("/dev/token", post(handlers::dev::issue_token))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
