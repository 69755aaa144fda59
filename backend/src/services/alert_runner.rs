//! Alert scheduler/runner
//!
//! One batch evaluates every stored profile against fresh conditions and
//! produces exactly one [`FiringDecision`] per profile. Per profile the order
//! of checks is: inactive, active hours, cooldown, profile validity, then
//! fetch and evaluate. A failure in one profile never aborts the batch.
//!
//! Fetches are shared within a batch by rounded coordinates, bounded by a
//! semaphore and a timeout. Cancellation turns every profile still in
//! flight into `Skipped(cancelled)`; side effects (recording the fire time
//! and notifying) only happen for decisions that were not cancelled.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::conditions::{build_snapshot, Conditions};
use shared::models::{AlertProfile, ConditionSnapshot, FiringDecision, SkipReason};
use shared::triggers::evaluate;
use shared::types::{CoordinateKey, GpsCoordinates};
use shared::validation::validate_profile;
use tokio::sync::{watch, Mutex, OnceCell, Semaphore};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::error::{AppError, AppResult};
use crate::services::collaborators::{ConditionSource, NotificationSink, ProfileStore};

// ============================================================================
// Batch results
// ============================================================================

/// A decision plus the conditions it was made on, when any were fetched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionRecord {
    pub decision: FiringDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<ConditionSnapshot>,
}

/// A failure attributed to one profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileError {
    pub profile_id: Uuid,
    pub message: String,
}

/// Outcome of one scheduler pass
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchSummary {
    pub run_at: DateTime<Utc>,
    pub decisions: Vec<DecisionRecord>,
    pub errors: Vec<ProfileError>,
}

impl BatchSummary {
    pub fn empty(run_at: DateTime<Utc>) -> Self {
        Self {
            run_at,
            decisions: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn fired_count(&self) -> usize {
        self.decisions.iter().filter(|r| r.decision.triggered).count()
    }

    pub fn decision_for(&self, profile_id: Uuid) -> Option<&DecisionRecord> {
        self.decisions.iter().find(|r| r.decision.profile_id == profile_id)
    }

    /// Number of decisions skipped for `reason`
    pub fn skipped_count(&self, reason: &SkipReason) -> usize {
        self.decisions
            .iter()
            .filter(|r| r.decision.skip_reason.as_ref() == Some(reason))
            .count()
    }
}

// ============================================================================
// Gating
// ============================================================================

/// Pre-fetch checks for one profile
///
/// Returns the reason to skip, or `None` when the profile should be
/// evaluated. The cooldown compares against `last_fired`; firing exactly one
/// cooldown after the last fire is allowed.
pub fn gate(
    profile: &AlertProfile,
    last_fired: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<SkipReason> {
    if !profile.is_active {
        return Some(SkipReason::Inactive);
    }
    if let Some(hours) = &profile.active_hours {
        if !hours.contains(now) {
            return Some(SkipReason::OutsideActiveHours);
        }
    }
    if let Some(last) = last_fired {
        if now - last < profile.cooldown() {
            return Some(SkipReason::Cooldown);
        }
    }
    None
}

// ============================================================================
// Runner
// ============================================================================

/// Concurrency and fetch limits for a batch
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub max_concurrency: usize,
    pub fetch_timeout: Duration,
    pub coordinate_precision: u32,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self::from(&SchedulerConfig::default())
    }
}

impl From<&SchedulerConfig> for RunnerSettings {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency.max(1),
            fetch_timeout: config.fetch_timeout(),
            coordinate_precision: config.coordinate_precision,
        }
    }
}

type SharedFetch = Result<Arc<Conditions>, String>;

/// Per-batch fetch cache; concurrent profiles at one key share one fetch
struct FetchCache {
    source: Arc<dyn ConditionSource>,
    timeout: Duration,
    precision: u32,
    cells: Mutex<HashMap<CoordinateKey, Arc<OnceCell<SharedFetch>>>>,
}

impl FetchCache {
    fn new(source: Arc<dyn ConditionSource>, settings: &RunnerSettings) -> Self {
        Self {
            source,
            timeout: settings.fetch_timeout,
            precision: settings.coordinate_precision,
            cells: Mutex::new(HashMap::new()),
        }
    }

    async fn get(&self, coordinates: &GpsCoordinates) -> SharedFetch {
        let key = coordinates.rounded(self.precision);
        let cell = {
            let mut cells = self.cells.lock().await;
            cells.entry(key.clone()).or_default().clone()
        };

        cell.get_or_init(|| async {
            let target = key.to_coordinates();
            tracing::debug!("Fetching conditions for {}", key);
            match tokio::time::timeout(self.timeout, self.source.fetch_conditions(&target)).await {
                Ok(Ok(conditions)) => Ok(Arc::new(conditions)),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err(AppError::UpstreamTimeout(self.timeout.as_secs()).to_string()),
            }
        })
        .await
        .clone()
    }
}

/// State shared by every profile task in one batch
struct BatchContext {
    store: Arc<dyn ProfileStore>,
    sink: Arc<dyn NotificationSink>,
    fetches: FetchCache,
    permits: Arc<Semaphore>,
    fired_this_run: Mutex<HashSet<Uuid>>,
    now: DateTime<Utc>,
}

struct ProfileOutcome {
    record: DecisionRecord,
    error: Option<String>,
}

impl ProfileOutcome {
    fn skipped(profile_id: Uuid, reason: SkipReason, at: DateTime<Utc>) -> Self {
        Self {
            record: DecisionRecord {
                decision: FiringDecision::skipped(profile_id, reason, at),
                snapshot: None,
            },
            error: None,
        }
    }

    fn failed(profile_id: Uuid, message: String, at: DateTime<Utc>) -> Self {
        Self {
            record: DecisionRecord {
                decision: FiringDecision::skipped(profile_id, SkipReason::Error(message.clone()), at),
                snapshot: None,
            },
            error: Some(message),
        }
    }
}

/// Resolves once cancellation is signalled; never if the sender is gone
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Evaluates alert profiles in batches
#[derive(Clone)]
pub struct AlertRunner {
    source: Arc<dyn ConditionSource>,
    store: Arc<dyn ProfileStore>,
    sink: Arc<dyn NotificationSink>,
    settings: RunnerSettings,
}

impl AlertRunner {
    pub fn new(
        source: Arc<dyn ConditionSource>,
        store: Arc<dyn ProfileStore>,
        sink: Arc<dyn NotificationSink>,
        settings: RunnerSettings,
    ) -> Self {
        Self {
            source,
            store,
            sink,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn ProfileStore> {
        &self.store
    }

    /// Evaluate every stored profile once
    ///
    /// Only a failure to list profiles fails the whole batch; everything else
    /// is reported per profile in the summary.
    pub async fn run_batch(
        &self,
        now: DateTime<Utc>,
        cancel: watch::Receiver<bool>,
    ) -> AppResult<BatchSummary> {
        let profiles = self.store.list_profiles().await?;
        if !profiles.iter().any(|p| p.is_active) {
            tracing::debug!("No active alert profiles to evaluate");
            return Ok(BatchSummary::empty(now));
        }

        tracing::info!("Starting alert batch for {} profiles", profiles.len());

        let context = Arc::new(BatchContext {
            store: self.store.clone(),
            sink: self.sink.clone(),
            fetches: FetchCache::new(self.source.clone(), &self.settings),
            permits: Arc::new(Semaphore::new(self.settings.max_concurrency)),
            fired_this_run: Mutex::new(HashSet::new()),
            now,
        });

        let handles: Vec<_> = profiles
            .into_iter()
            .map(|profile| {
                let id = profile.id;
                let task = tokio::spawn(evaluate_profile(context.clone(), profile, cancel.clone()));
                (id, task)
            })
            .collect();

        let mut summary = BatchSummary::empty(now);
        for (profile_id, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!("Evaluation task for profile {} failed: {}", profile_id, e);
                    ProfileOutcome::failed(profile_id, "evaluation task failed".to_string(), now)
                }
            };

            if let Some(message) = outcome.error {
                summary.errors.push(ProfileError {
                    profile_id,
                    message,
                });
            }
            summary.decisions.push(outcome.record);
        }

        tracing::info!(
            "Alert batch finished: {} fired, {} skipped, {} errors",
            summary.fired_count(),
            summary.decisions.len() - summary.fired_count(),
            summary.errors.len()
        );
        Ok(summary)
    }
}

async fn evaluate_profile(
    context: Arc<BatchContext>,
    profile: AlertProfile,
    mut cancel: watch::Receiver<bool>,
) -> ProfileOutcome {
    let id = profile.id;
    let now = context.now;

    if *cancel.borrow() {
        return ProfileOutcome::skipped(id, SkipReason::Cancelled, now);
    }

    let last_fired = match context.store.last_fired(id).await {
        Ok(last) => last,
        Err(e) => {
            tracing::warn!("Cannot read last fire time of profile {}: {}", id, e);
            return ProfileOutcome::failed(id, e.to_string(), now);
        }
    };

    let fired_earlier = context.fired_this_run.lock().await.contains(&id);
    let skip = gate(&profile, last_fired, now).or(fired_earlier.then_some(SkipReason::Cooldown));
    if let Some(reason) = skip {
        tracing::debug!("Profile {} skipped: {}", id, reason);
        return ProfileOutcome::skipped(id, reason, now);
    }

    if let Err(e) = validate_profile(&profile) {
        tracing::warn!("Profile {} is invalid: {}", id, e);
        return ProfileOutcome::failed(id, e.to_string(), now);
    }

    let _permit = tokio::select! {
        biased;
        _ = cancelled(&mut cancel) => return ProfileOutcome::skipped(id, SkipReason::Cancelled, now),
        permit = context.permits.clone().acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(e) => return ProfileOutcome::failed(id, e.to_string(), now),
        },
    };

    let conditions = tokio::select! {
        biased;
        _ = cancelled(&mut cancel) => return ProfileOutcome::skipped(id, SkipReason::Cancelled, now),
        fetched = context.fetches.get(&profile.coordinates) => match fetched {
            Ok(conditions) => conditions,
            Err(message) => {
                tracing::warn!("Conditions unavailable for profile {}: {}", id, message);
                return ProfileOutcome::failed(id, message, now);
            }
        },
    };

    let mut snapshot = build_snapshot(&conditions, &profile.coordinates, now, profile.species);
    let result = evaluate(&profile, &snapshot);
    snapshot.matched_triggers = result.matched_triggers.clone();

    if !result.satisfied {
        tracing::debug!("Profile {} skipped: no-match ({:?})", id, result.matched_triggers);
        return ProfileOutcome {
            record: DecisionRecord {
                decision: FiringDecision::skipped(id, SkipReason::NoMatch, now),
                snapshot: Some(snapshot),
            },
            error: None,
        };
    }

    if *cancel.borrow() {
        return ProfileOutcome::skipped(id, SkipReason::Cancelled, now);
    }

    // Claim the fire for this run before any side effect
    if !context.fired_this_run.lock().await.insert(id) {
        return ProfileOutcome::skipped(id, SkipReason::Cooldown, now);
    }

    if let Err(e) = context.store.record_fired(id, now).await {
        tracing::warn!("Cannot record fire time of profile {}: {}", id, e);
        return ProfileOutcome::failed(id, e.to_string(), now);
    }

    let decision = FiringDecision::fired(id, result.matched_triggers, now);
    tracing::info!("Profile {} fired on {:?}", id, decision.matched_triggers);

    let error = match context.sink.deliver(&profile, &decision, &snapshot).await {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!("Delivery failed for profile {}: {}", id, e);
            Some(format!("delivery failed: {}", e))
        }
    };

    ProfileOutcome {
        record: DecisionRecord {
            decision,
            snapshot: Some(snapshot),
        },
        error,
    }
}
