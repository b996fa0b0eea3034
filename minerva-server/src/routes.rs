//! API routes

use crate::handlers;
use crate::state::AppState;
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub const ENV_CORS_ORIGINS: &str = "MINERVA_CORS_ORIGINS";

/// Default origins allowed during development
const DEV_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
];

/// Build the CORS layer from `MINERVA_CORS_ORIGINS`
///
/// The variable is a comma-separated list of origins, or `*` for any.
fn cors_layer(origins: Option<String>) -> CorsLayer {
    let allow_origin = match origins.as_deref() {
        Some("*") => AllowOrigin::any(),
        Some(origins) => AllowOrigin::list(
            origins
                .split(',')
                .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        ),
        None => AllowOrigin::list(DEV_ORIGINS.iter().filter_map(|s| s.parse::<HeaderValue>().ok())),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Lookup without saving
        .route("/lookup/:isbn", get(handlers::lookup_book))
        // Catalog endpoints
        .route("/library", get(handlers::list_books))
        .route("/library", post(handlers::add_book))
        .route("/library/:id", get(handlers::get_book))
        .route("/library/:id", axum::routing::delete(handlers::delete_book))
        // SSE endpoint
        .route("/logs", get(handlers::log_events));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(handlers::health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(std::env::var(ENV_CORS_ORIGINS).ok())),
        )
        .with_state(state)
}
