//! Route definitions for the Fishing Forecast service

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/forecast", get(handlers::get_forecast))
        .nest("/alerts", alert_routes())
}

/// Alert profile and batch routes
fn alert_routes() -> Router<AppState> {
    Router::new()
        .route("/evaluate", post(handlers::evaluate_profile))
        .route("/run", post(handlers::run_batch))
        .route(
            "/profiles",
            get(handlers::list_profiles).put(handlers::upsert_profile),
        )
        .route("/profiles/:id", get(handlers::get_profile))
}
