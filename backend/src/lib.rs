//! Fishing Forecast service
//!
//! Scores fishing conditions for a location over a multi-day horizon and
//! runs user alert profiles against fresh conditions on a schedule.

use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod routes;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};

use services::{AlertRunner, ForecastService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub forecast: Arc<ForecastService>,
    pub runner: Arc<AlertRunner>,
    /// Flips to true on shutdown; cancels batches started over HTTP
    pub shutdown: watch::Receiver<bool>,
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Fishing Forecast API v1.0"
}
