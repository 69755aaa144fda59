//! HTTP handlers for alert profiles and batches

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use shared::models::{AlertProfile, ConditionSnapshot, EvaluationResult};
use shared::triggers::evaluate;
use shared::validation::validate_profile;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::BatchSummary;
use crate::AppState;

/// A profile and the snapshot to test it against
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub profile: AlertProfile,
    pub snapshot: ConditionSnapshot,
}

/// Evaluate a profile against caller-supplied conditions
pub async fn evaluate_profile(Json(input): Json<EvaluateRequest>) -> AppResult<Json<EvaluationResult>> {
    validate_profile(&input.profile)?;
    Ok(Json(evaluate(&input.profile, &input.snapshot)))
}

/// Run one alert batch now
pub async fn run_batch(State(state): State<AppState>) -> AppResult<Json<BatchSummary>> {
    let summary = state.runner.run_batch(Utc::now(), state.shutdown.clone()).await?;
    Ok(Json(summary))
}

/// List stored alert profiles
pub async fn list_profiles(State(state): State<AppState>) -> AppResult<Json<Vec<AlertProfile>>> {
    let profiles = state.runner.store().list_profiles().await?;
    Ok(Json(profiles))
}

/// Get one alert profile
pub async fn get_profile(
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
) -> AppResult<Json<AlertProfile>> {
    let profile = state
        .runner
        .store()
        .list_profiles()
        .await?
        .into_iter()
        .find(|p| p.id == profile_id)
        .ok_or_else(|| AppError::NotFound("Alert profile".to_string()))?;
    Ok(Json(profile))
}

/// Create or replace an alert profile
pub async fn upsert_profile(
    State(state): State<AppState>,
    Json(profile): Json<AlertProfile>,
) -> AppResult<Json<AlertProfile>> {
    validate_profile(&profile)?;
    state.runner.store().upsert_profile(profile.clone()).await?;
    tracing::info!("Stored alert profile {} ({})", profile.id, profile.name);
    Ok(Json(profile))
}
