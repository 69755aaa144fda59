//! Fishing Forecast - Backend Server
//!
//! Serves fishing forecasts over HTTP and evaluates alert profiles on a
//! fixed schedule.

use std::{net::SocketAddr, sync::Arc};

use fishing_forecast_backend::{
    create_app,
    external::OpenMeteoClient,
    services::{
        scheduler::run_scheduler, AlertRunner, ConditionSource, ForecastService,
        InMemoryProfileStore, LogNotificationSink, RunnerSettings,
    },
    AppState, Config,
};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ffc_server=debug,fishing_forecast_backend=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting Fishing Forecast Server");
    tracing::info!("Environment: {}", config.environment);

    // Collaborators
    let source: Arc<dyn ConditionSource> = Arc::new(OpenMeteoClient::new(&config.weather)?);
    let store = match &config.scheduler.profiles_path {
        Some(path) => InMemoryProfileStore::from_json_file(path).await?,
        None => InMemoryProfileStore::new(),
    };
    let runner = Arc::new(AlertRunner::new(
        source.clone(),
        Arc::new(store),
        Arc::new(LogNotificationSink),
        RunnerSettings::from(&config.scheduler),
    ));
    let forecast = Arc::new(ForecastService::new(source, config.scoring.window_size_samples));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Alert scheduler
    let scheduler = if config.scheduler.enabled {
        Some(tokio::spawn(run_scheduler(
            runner.clone(),
            config.scheduler.interval(),
            shutdown_rx.clone(),
        )))
    } else {
        tracing::info!("Alert scheduler disabled");
        None
    };

    // Create application state
    let state = AppState {
        config: Arc::new(config.clone()),
        forecast,
        runner,
        shutdown: shutdown_rx,
    };

    // Build application
    let app = create_app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
            // Cancels any batch still running
            shutdown_tx.send(true).ok();
        })
        .await?;

    if let Some(handle) = scheduler {
        handle.await?;
    }

    Ok(())
}
