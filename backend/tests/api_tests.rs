//! HTTP API tests
//!
//! Drives the router directly with in-process requests:
//! - Health and root endpoints
//! - Forecast query handling and error mapping
//! - Ad-hoc profile evaluation
//! - Profile storage and on-demand batches

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use fishing_forecast_backend::{
    create_app,
    error::AppResult,
    services::{
        AlertRunner, ConditionSource, ForecastService, InMemoryProfileStore, LogNotificationSink,
        RunnerSettings,
    },
    AppState, Config,
};
use serde_json::{json, Value};
use shared::conditions::Conditions;
use shared::models::EnvironmentalSample;
use shared::types::GpsCoordinates;
use tokio::sync::watch;
use tower::ServiceExt;

struct CalmSource;

#[async_trait]
impl ConditionSource for CalmSource {
    async fn fetch_conditions(&self, _coordinates: &GpsCoordinates) -> AppResult<Conditions> {
        // Today's horizon, so runs at the current time find a sample
        let start = Utc::now().date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();
        let samples = (0..96)
            .map(|i| EnvironmentalSample {
                wind_speed_kmh: Some(10.0),
                pressure_hpa: Some(1015.0),
                ..EnvironmentalSample::new(start + Duration::minutes(15 * i))
            })
            .collect();
        Ok(Conditions {
            samples,
            ..Default::default()
        })
    }
}

fn app() -> Router {
    let config = Config::default();
    let source: Arc<dyn ConditionSource> = Arc::new(CalmSource);
    let runner = AlertRunner::new(
        source.clone(),
        Arc::new(InMemoryProfileStore::new()),
        Arc::new(LogNotificationSink),
        RunnerSettings::default(),
    );
    let forecast = ForecastService::new(source, config.scoring.window_size_samples);
    // Sender dropped: batches started here are never cancelled
    let (_, shutdown) = watch::channel(false);

    create_app(AppState {
        config: Arc::new(config),
        forecast: Arc::new(forecast),
        runner: Arc::new(runner),
        shutdown,
    })
}

fn profile_json(id: &str) -> Value {
    json!({
        "id": id,
        "name": "Breakwall",
        "coordinates": {"latitude": "41.36", "longitude": "-71.48"},
        "triggers": [{"kind": "wind", "min_speed_kmh": 5, "max_speed_kmh": 20}],
        "logic": "and",
        "cooldown_hours": 6
    })
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[tokio::test]
    async fn test_root_endpoint() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Fishing Forecast API v1.0");
    }

    #[tokio::test]
    async fn test_health_reports_scheduler() {
        let (status, body) = send(app(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["scheduler"], "every 15 min");

        let (status, _) = send(app(), Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_forecast_endpoint() {
        let (status, body) = send(
            app(),
            Method::GET,
            "/api/v1/forecast?latitude=41.36&longitude=-71.48&species=bass",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["species"], "bass");
        assert_eq!(body["days"].as_array().unwrap().len(), 1);
        assert_eq!(body["ranking"].as_array().unwrap().len(), 1);
        assert_eq!(body["tide_included"], false);
    }

    #[tokio::test]
    async fn test_forecast_rejects_out_of_range_coordinates() {
        let (status, body) = send(
            app(),
            Method::GET,
            "/api/v1/forecast?latitude=120&longitude=10",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_INPUT");
        assert_eq!(body["error"]["field"], "coordinates");
    }

    #[tokio::test]
    async fn test_evaluate_matches_wind_band() {
        let request = json!({
            "profile": profile_json("6f1c1d0e-8a7b-4d3c-9e2f-1a2b3c4d5e6f"),
            "snapshot": {"captured_at": "2024-06-01T06:00:00Z", "wind_speed_kmh": 12.0}
        });
        let (status, body) = send(app(), Method::POST, "/api/v1/alerts/evaluate", Some(request)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["satisfied"], true);
        assert_eq!(body["matched_triggers"], json!(["wind"]));
    }

    #[tokio::test]
    async fn test_evaluate_rejects_profile_without_triggers() {
        let mut profile = profile_json("6f1c1d0e-8a7b-4d3c-9e2f-1a2b3c4d5e6f");
        profile["triggers"] = json!([]);
        let request = json!({
            "profile": profile,
            "snapshot": {"captured_at": "2024-06-01T06:00:00Z"}
        });
        let (status, body) = send(app(), Method::POST, "/api/v1/alerts/evaluate", Some(request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_profile_upsert_then_get() {
        let app = app();
        let id = "0b5e2c4a-1d3f-4a6b-8c9d-0e1f2a3b4c5d";

        let (status, _) = send(
            app.clone(),
            Method::PUT,
            "/api/v1/alerts/profiles",
            Some(profile_json(id)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) =
            send(app.clone(), Method::GET, &format!("/api/v1/alerts/profiles/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Breakwall");

        let (status, body) = send(app, Method::GET, "/api/v1/alerts/profiles", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_profile_is_not_found() {
        let (status, body) = send(
            app(),
            Method::GET,
            "/api/v1/alerts/profiles/9a8b7c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_run_batch_fires_stored_profile() {
        let app = app();
        let id = "0b5e2c4a-1d3f-4a6b-8c9d-0e1f2a3b4c5d";
        send(app.clone(), Method::PUT, "/api/v1/alerts/profiles", Some(profile_json(id))).await;

        let (status, body) = send(app.clone(), Method::POST, "/api/v1/alerts/run", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["decisions"].as_array().unwrap().len(), 1);
        assert_eq!(body["decisions"][0]["decision"]["triggered"], true);
        assert_eq!(body["decisions"][0]["decision"]["matched_triggers"], json!(["wind"]));

        // Second run falls inside the cooldown
        let (_, body) = send(app, Method::POST, "/api/v1/alerts/run", None).await;
        let decision = &body["decisions"][0]["decision"];
        assert_eq!(decision["triggered"], false);
        assert_eq!(decision["skip_reason"]["reason"], "cooldown");
    }
}
