//! Collaborators injected into the alert runner and forecast service
//!
//! Each is a trait object so the scheduler can run against the live
//! Open-Meteo adapter in production and against fakes in tests.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::conditions::Conditions;
use shared::models::{AlertProfile, ConditionSnapshot, FiringDecision};
use shared::types::GpsCoordinates;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Supplies the environmental horizon for a location
#[async_trait]
pub trait ConditionSource: Send + Sync {
    async fn fetch_conditions(&self, coordinates: &GpsCoordinates) -> AppResult<Conditions>;
}

/// Holds alert profiles and their last-fired times
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn list_profiles(&self) -> AppResult<Vec<AlertProfile>>;

    async fn last_fired(&self, profile_id: Uuid) -> AppResult<Option<DateTime<Utc>>>;

    async fn record_fired(&self, profile_id: Uuid, at: DateTime<Utc>) -> AppResult<()>;

    /// Insert a profile or replace the one with the same id
    async fn upsert_profile(&self, profile: AlertProfile) -> AppResult<()>;
}

/// Delivers a fired alert to the user
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(
        &self,
        profile: &AlertProfile,
        decision: &FiringDecision,
        snapshot: &ConditionSnapshot,
    ) -> AppResult<()>;
}

// ============================================================================
// In-memory profile store
// ============================================================================

/// Profile store kept in process memory
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<Vec<AlertProfile>>,
    last_fired: RwLock<HashMap<Uuid, DateTime<Utc>>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: Vec<AlertProfile>) -> Self {
        Self {
            profiles: RwLock::new(profiles),
            last_fired: RwLock::new(HashMap::new()),
        }
    }

    /// Seed the store from a JSON array of profiles
    pub async fn from_json_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::Configuration(format!("Cannot read profiles from {}: {}", path.display(), e))
        })?;
        let profiles: Vec<AlertProfile> = serde_json::from_str(&raw).map_err(|e| {
            AppError::Configuration(format!("Cannot parse profiles in {}: {}", path.display(), e))
        })?;

        tracing::info!("Loaded {} alert profiles from {}", profiles.len(), path.display());
        Ok(Self::with_profiles(profiles))
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn list_profiles(&self) -> AppResult<Vec<AlertProfile>> {
        Ok(self.profiles.read().await.clone())
    }

    async fn last_fired(&self, profile_id: Uuid) -> AppResult<Option<DateTime<Utc>>> {
        Ok(self.last_fired.read().await.get(&profile_id).copied())
    }

    async fn record_fired(&self, profile_id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        self.last_fired.write().await.insert(profile_id, at);
        Ok(())
    }

    async fn upsert_profile(&self, profile: AlertProfile) -> AppResult<()> {
        let mut profiles = self.profiles.write().await;
        match profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) => *existing = profile,
            None => profiles.push(profile),
        }
        Ok(())
    }
}

// ============================================================================
// Logging notification sink
// ============================================================================

/// Human-readable alert text
pub fn alert_message(profile: &AlertProfile, snapshot: &ConditionSnapshot) -> String {
    let mut parts = vec![format!("matched {}", snapshot.matched_triggers.join(", "))];

    if let Some(score) = snapshot.fishing_score {
        parts.push(format!("score {:.1}/10", score));
    }
    if let Some(speed) = snapshot.wind_speed_kmh {
        parts.push(format!("wind {:.0} km/h", speed));
    }
    if let Some(phase) = snapshot.tide_phase {
        parts.push(format!("{} tide", phase));
    }
    if let Some(trend) = snapshot.pressure_trend {
        parts.push(format!("pressure {:?}", trend).to_lowercase());
    }

    format!("Fishing alert: {} ({})", profile.name, parts.join("; "))
}

/// Sink that records fired alerts as structured log events
#[derive(Debug, Default, Clone)]
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn deliver(
        &self,
        profile: &AlertProfile,
        decision: &FiringDecision,
        snapshot: &ConditionSnapshot,
    ) -> AppResult<()> {
        tracing::info!(
            profile_id = %decision.profile_id,
            matched = ?decision.matched_triggers,
            evaluated_at = %decision.evaluated_at,
            "{}",
            alert_message(profile, snapshot)
        );
        Ok(())
    }
}
